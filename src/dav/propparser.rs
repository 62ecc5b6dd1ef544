//! Event-driven parser for WebDAV PROPFIND multi-status responses.
//!
//! Reconstructs one [`FileProperties`] record per `<response>` entry,
//! tracking nested element scope with strict open/close validation. The
//! document may be fed whole or in chunks split at arbitrary byte
//! boundaries; scope state and the partially built record persist across
//! chunks of the same logical document.

use crate::base::date::{parse_iso8601, parse_rfc1123};
use crate::base::error::DavError;
use crate::dav::fileprops::FileProperties;
use quick_xml::events::Event;
use quick_xml::Reader;

/// The element kinds the parser reacts to, matched by local
/// (namespace-stripped) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DavElement {
    Prop,
    Propstat,
    Response,
    GetLastModified,
    CreationDate,
    GetContentLength,
    Mode,
    Href,
}

impl DavElement {
    fn from_local_name(name: &str) -> Option<DavElement> {
        match name {
            "prop" => Some(DavElement::Prop),
            "propstat" => Some(DavElement::Propstat),
            "response" => Some(DavElement::Response),
            "getlastmodified" => Some(DavElement::GetLastModified),
            "creationdate" => Some(DavElement::CreationDate),
            "getcontentlength" => Some(DavElement::GetContentLength),
            "mode" => Some(DavElement::Mode),
            "href" => Some(DavElement::Href),
            _ => None,
        }
    }
}

/// Which of the known elements are currently open.
///
/// Opening an already-open element or closing an already-closed one signals
/// malformed input and fails the current document.
#[derive(Debug, Default, Clone, Copy)]
struct ScopeSet(u8);

impl ScopeSet {
    fn open(&mut self, element: DavElement, origin: &str) -> Result<(), DavError> {
        let bit = 1u8 << element as u8;
        if self.0 & bit != 0 {
            return Err(DavError::XmlScopeDuplicated { element: origin.to_string() });
        }
        self.0 |= bit;
        Ok(())
    }

    fn close(&mut self, element: DavElement, origin: &str) -> Result<(), DavError> {
        let bit = 1u8 << element as u8;
        if self.0 & bit == 0 {
            return Err(DavError::XmlScopeNotOpen { element: origin.to_string() });
        }
        self.0 &= !bit;
        Ok(())
    }

    fn contains(&self, element: DavElement) -> bool {
        self.0 & (1u8 << element as u8) != 0
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Streaming WebDAV property parser.
///
/// One instance processes one logical document's events in arrival order;
/// it holds no internal concurrency and must not be shared across threads
/// mid-document.
#[derive(Default)]
pub struct WebdavPropParser {
    scopes: ScopeSet,
    props: Vec<FileProperties>,
    current: FileProperties,
    last_filename: String,
    pending: Vec<u8>,
    in_document: bool,
}

impl WebdavPropParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a complete multi-status document, replacing any previously
    /// accumulated records.
    pub fn parse_from_memory(&mut self, xml: &str) -> Result<&[FileProperties], DavError> {
        self.begin_document();
        self.in_document = false;
        self.props.clear();
        self.pending.extend_from_slice(xml.as_bytes());
        self.feed(true)?;
        Ok(&self.props)
    }

    /// Feeds one chunk of a document, accumulating records across calls.
    ///
    /// A document split at any byte boundary parses identically to one fed
    /// whole; incomplete trailing tokens are carried over to the next call.
    pub fn parse_from_chunk(&mut self, chunk: &[u8]) -> Result<&[FileProperties], DavError> {
        if !self.in_document {
            self.begin_document();
            self.in_document = true;
        }
        self.pending.extend_from_slice(chunk);
        self.feed(false)?;
        Ok(&self.props)
    }

    /// Discards accumulated records and resets all document state, readying
    /// the instance for the next logical document.
    pub fn clear(&mut self) {
        self.props.clear();
        self.begin_document();
        self.in_document = false;
    }

    /// Records accumulated so far.
    pub fn current_properties(&self) -> &[FileProperties] {
        &self.props
    }

    fn begin_document(&mut self) {
        tracing::debug!("parse request for properties");
        self.scopes.reset();
        self.current = FileProperties::default();
        self.last_filename.clear();
        self.pending.clear();
    }

    fn feed(&mut self, at_eof: bool) -> Result<(), DavError> {
        let buf = std::mem::take(&mut self.pending);
        match self.feed_events(&buf, at_eof) {
            Ok(consumed) => {
                self.pending = buf[consumed..].to_vec();
                Ok(())
            }
            // Document aborted; pending input is dropped. The instance is
            // reusable after clear() or parse_from_memory().
            Err(e) => Err(e),
        }
    }

    /// Runs the event loop over `buf`, returning how many bytes were fully
    /// consumed. In chunk mode a token truncated at the end of the buffer is
    /// left unconsumed so the next chunk can complete it; the same applies to
    /// a text run touching the buffer end, which may continue in the next
    /// chunk.
    fn feed_events(&mut self, buf: &[u8], at_eof: bool) -> Result<usize, DavError> {
        let mut reader = Reader::from_reader(buf);
        let config = reader.config_mut();
        config.trim_text(true);
        // Tag balance is tracked by ScopeSet; a close tag whose open element
        // arrived in an earlier chunk must not fail the lexer.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut event_buf = Vec::new();
        let mut consumed = 0usize;
        loop {
            match reader.read_event_into(&mut event_buf) {
                Ok(Event::Eof) => break,
                Ok(event) => {
                    let pos = reader.buffer_position() as usize;
                    if !at_eof
                        && pos >= buf.len()
                        && matches!(event, Event::Text(_) | Event::CData(_))
                    {
                        break;
                    }
                    self.handle_event(&event)?;
                    consumed = pos;
                }
                Err(e) => {
                    if !at_eof && reader.buffer_position() as usize >= buf.len() {
                        break;
                    }
                    return Err(DavError::XmlSyntax(e.to_string()));
                }
            }
            event_buf.clear();
        }
        Ok(consumed)
    }

    fn handle_event(&mut self, event: &Event<'_>) -> Result<(), DavError> {
        match event {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref())?;
                self.on_start_element(&name)
            }
            Event::End(e) => {
                let name = local_name(e.local_name().as_ref())?;
                self.on_end_element(&name)
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref())?;
                self.on_start_element(&name)?;
                self.on_end_element(&name)
            }
            Event::Text(t) => {
                let text = std::str::from_utf8(t.as_ref())
                    .map_err(|e| DavError::XmlSyntax(e.to_string()))?;
                if text.is_empty() {
                    Ok(())
                } else {
                    self.on_characters(text)
                }
            }
            Event::CData(t) => {
                let text = std::str::from_utf8(t.as_ref())
                    .map_err(|e| DavError::XmlSyntax(e.to_string()))?;
                self.on_characters(text)
            }
            _ => Ok(()),
        }
    }

    fn on_start_element(&mut self, name: &str) -> Result<(), DavError> {
        let Some(element) = DavElement::from_local_name(name) else {
            return Ok(());
        };
        self.scopes.open(element, name)?;

        if element == DavElement::Prop
            && self.scopes.contains(DavElement::Propstat)
            && self.scopes.contains(DavElement::Response)
        {
            tracing::debug!("properties detected");
            self.current = FileProperties::default();
            self.current.filename = self.last_filename.clone();
        }
        Ok(())
    }

    fn on_end_element(&mut self, name: &str) -> Result<(), DavError> {
        let Some(element) = DavElement::from_local_name(name) else {
            return Ok(());
        };
        self.scopes.close(element, name)?;

        if element == DavElement::Prop
            && self.scopes.contains(DavElement::Propstat)
            && self.scopes.contains(DavElement::Response)
        {
            tracing::debug!("end of properties");
            self.props.push(std::mem::take(&mut self.current));
        }
        Ok(())
    }

    fn on_characters(&mut self, text: &str) -> Result<(), DavError> {
        self.check_last_modified(text)?;
        self.check_creation_date(text)?;
        self.check_content_length(text)?;
        self.check_mode_ext(text)?;
        self.check_href(text);
        Ok(())
    }

    fn in_prop_field(&self, field: DavElement) -> bool {
        self.scopes.contains(DavElement::Response)
            && self.scopes.contains(DavElement::Prop)
            && self.scopes.contains(DavElement::Propstat)
            && self.scopes.contains(field)
    }

    fn check_last_modified(&mut self, text: &str) -> Result<(), DavError> {
        if self.in_prop_field(DavElement::GetLastModified) {
            let t = parse_rfc1123(text)?;
            tracing::debug!(value = t, "getlastmodified found");
            self.current.mtime = Some(t);
        }
        Ok(())
    }

    fn check_creation_date(&mut self, text: &str) -> Result<(), DavError> {
        if self.in_prop_field(DavElement::CreationDate) {
            let t = parse_iso8601(text)?;
            tracing::debug!(value = t, "creationdate found");
            self.current.ctime = Some(t);
        }
        Ok(())
    }

    fn check_content_length(&mut self, text: &str) -> Result<(), DavError> {
        if self.in_prop_field(DavElement::GetContentLength) {
            let size = text.trim().parse::<u64>().map_err(|_| DavError::InvalidFieldValue {
                field: "getcontentlength",
                text: text.to_string(),
            })?;
            tracing::debug!(size, "content length found");
            self.current.size = size;
        }
        Ok(())
    }

    // Non-standard extension carrying POSIX mode bits in octal. Absence is
    // fine; malformed presence is not.
    fn check_mode_ext(&mut self, text: &str) -> Result<(), DavError> {
        if self.in_prop_field(DavElement::Mode) {
            let mode = u32::from_str_radix(text.trim(), 8).map_err(|_| {
                DavError::InvalidFieldValue { field: "mode", text: text.to_string() }
            })?;
            tracing::debug!(mode = format!("0{mode:o}"), "mode extension found");
            self.current.mode = Some(mode);
        }
        Ok(())
    }

    // The href precedes the prop section in every observed response
    // ordering; its basename becomes the filename of the next record opened.
    fn check_href(&mut self, text: &str) {
        if self.scopes.contains(DavElement::Response) && self.scopes.contains(DavElement::Href) {
            let trimmed = text.trim_end_matches('/');
            let basename = match trimmed.rfind('/') {
                Some(idx) => &trimmed[idx + 1..],
                None => trimmed,
            };
            tracing::debug!(filename = basename, "href/filename found");
            self.last_filename = basename.to_string();
        }
    }
}

fn local_name(bytes: &[u8]) -> Result<String, DavError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| DavError::XmlSyntax(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRY_DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/data/report.txt</D:href>
    <D:propstat>
      <D:prop>
        <D:getlastmodified>Mon, 12 Jan 2015 15:30:00 GMT</D:getlastmodified>
        <D:getcontentlength>2048</D:getcontentlength>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/data/archive/</D:href>
    <D:propstat>
      <D:prop>
        <D:getlastmodified>Mon, 12 Jan 2015 16:30:00 GMT</D:getlastmodified>
        <D:getcontentlength>0</D:getcontentlength>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    #[test]
    fn two_entries_in_document_order() {
        let mut parser = WebdavPropParser::new();
        let props = parser.parse_from_memory(TWO_ENTRY_DOC).unwrap();
        assert_eq!(props.len(), 2);

        assert_eq!(props[0].filename, "report.txt");
        assert_eq!(props[0].mtime, Some(1421076600));
        assert_eq!(props[0].size, 2048);

        assert_eq!(props[1].filename, "archive");
        assert_eq!(props[1].mtime, Some(1421080200));
        assert_eq!(props[1].size, 0);
    }

    #[test]
    fn chunked_feeding_matches_whole_document() {
        let mut whole = WebdavPropParser::new();
        let expected = whole.parse_from_memory(TWO_ENTRY_DOC).unwrap().to_vec();

        // Splits landing inside a tag, inside text content, and between
        // elements.
        let mid_tag = TWO_ENTRY_DOC.find("getlastmodified").unwrap() + 4;
        let mid_text = TWO_ENTRY_DOC.find("Jan 2015").unwrap() + 2;
        let between = TWO_ENTRY_DOC.find("</D:response>").unwrap() + 13;

        for split in [mid_tag, mid_text, between] {
            let mut parser = WebdavPropParser::new();
            parser.parse_from_chunk(&TWO_ENTRY_DOC.as_bytes()[..split]).unwrap();
            let props = parser.parse_from_chunk(&TWO_ENTRY_DOC.as_bytes()[split..]).unwrap();
            assert_eq!(props, expected.as_slice(), "split at byte {split}");
        }
    }

    #[test]
    fn close_tag_opening_a_chunk() {
        let mut whole = WebdavPropParser::new();
        let expected = whole.parse_from_memory(TWO_ENTRY_DOC).unwrap().to_vec();

        // The first close tag of the document is the first token of the
        // second chunk; its open element was consumed by the first feed.
        let split = TWO_ENTRY_DOC.find("</D:").unwrap();
        let mut parser = WebdavPropParser::new();
        parser.parse_from_chunk(&TWO_ENTRY_DOC.as_bytes()[..split]).unwrap();
        let props = parser.parse_from_chunk(&TWO_ENTRY_DOC.as_bytes()[split..]).unwrap();
        assert_eq!(props, expected.as_slice());
    }

    #[test]
    fn three_way_chunk_split() {
        let mut whole = WebdavPropParser::new();
        let expected = whole.parse_from_memory(TWO_ENTRY_DOC).unwrap().to_vec();

        let bytes = TWO_ENTRY_DOC.as_bytes();
        let (a, b) = (bytes.len() / 3, 2 * bytes.len() / 3);
        let mut parser = WebdavPropParser::new();
        parser.parse_from_chunk(&bytes[..a]).unwrap();
        parser.parse_from_chunk(&bytes[a..b]).unwrap();
        let props = parser.parse_from_chunk(&bytes[b..]).unwrap();
        assert_eq!(props, expected.as_slice());
    }

    #[test]
    fn creationdate_and_mode_extension() {
        let doc = r#"<d:multistatus xmlns:d="DAV:" xmlns:lp="LCGDM:">
  <d:response>
    <d:href>/grid/file.dat</d:href>
    <d:propstat>
      <d:prop>
        <d:creationdate>2015-01-12T15:30:00Z</d:creationdate>
        <lp:mode>0644</lp:mode>
      </d:prop>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        let mut parser = WebdavPropParser::new();
        let props = parser.parse_from_memory(doc).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].filename, "file.dat");
        assert_eq!(props[0].ctime, Some(1421076600));
        assert_eq!(props[0].mode, Some(0o644));
    }

    #[test]
    fn href_basename_extraction() {
        for (href, expected) in
            [("/a/b/c/", "c"), ("/onlyroot/", "onlyroot"), ("/x/deep/name.bin", "name.bin")]
        {
            let doc = format!(
                "<response><href>{href}</href><propstat><prop>\
                 <getcontentlength>1</getcontentlength>\
                 </prop></propstat></response>"
            );
            let mut parser = WebdavPropParser::new();
            let props = parser.parse_from_memory(&doc).unwrap();
            assert_eq!(props[0].filename, expected, "href {href}");
        }
    }

    #[test]
    fn stray_close_raises_scope_error() {
        let doc = "<response><propstat></prop></propstat></response>";
        let mut parser = WebdavPropParser::new();
        let err = parser.parse_from_memory(doc).unwrap_err();
        assert!(matches!(err, DavError::XmlScopeNotOpen { .. }), "got {err:?}");
        assert!(parser.current_properties().is_empty());
    }

    #[test]
    fn duplicate_open_raises_scope_error() {
        let doc = "<response><response>";
        let mut parser = WebdavPropParser::new();
        let err = parser.parse_from_memory(doc).unwrap_err();
        assert!(matches!(err, DavError::XmlScopeDuplicated { .. }), "got {err:?}");
    }

    #[test]
    fn non_numeric_content_length_is_fatal() {
        let doc = r#"<multistatus>
  <response>
    <href>/good.txt</href>
    <propstat><prop><getcontentlength>17</getcontentlength></prop></propstat>
  </response>
  <response>
    <href>/bad.txt</href>
    <propstat><prop><getcontentlength>abc</getcontentlength></prop></propstat>
  </response>
</multistatus>"#;
        let mut parser = WebdavPropParser::new();
        let err = parser.parse_from_memory(doc).unwrap_err();
        assert!(
            matches!(&err, DavError::InvalidFieldValue { field: "getcontentlength", text } if text == "abc"),
            "got {err:?}"
        );
        // Records completed before the failure are untouched.
        assert_eq!(parser.current_properties().len(), 1);
        assert_eq!(parser.current_properties()[0].filename, "good.txt");
    }

    #[test]
    fn bad_mode_is_fatal_but_absence_is_not() {
        let good = "<response><href>/f</href><propstat><prop>\
                    <getcontentlength>5</getcontentlength></prop></propstat></response>";
        let mut parser = WebdavPropParser::new();
        let props = parser.parse_from_memory(good).unwrap();
        assert_eq!(props[0].mode, None);

        let bad = "<response><href>/f</href><propstat><prop>\
                   <mode>9z</mode></prop></propstat></response>";
        let mut parser = WebdavPropParser::new();
        assert!(parser.parse_from_memory(bad).is_err());
    }

    #[test]
    fn bad_date_is_fatal() {
        let doc = "<response><href>/f</href><propstat><prop>\
                   <getlastmodified>not a date</getlastmodified></prop></propstat></response>";
        let mut parser = WebdavPropParser::new();
        let err = parser.parse_from_memory(doc).unwrap_err();
        assert!(matches!(err, DavError::InvalidFieldValue { field: "getlastmodified", .. }));
    }

    #[test]
    fn instance_is_reusable_after_error() {
        let mut parser = WebdavPropParser::new();
        assert!(parser.parse_from_memory("<response><response>").is_err());
        let props = parser.parse_from_memory(TWO_ENTRY_DOC).unwrap();
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn clear_resets_between_documents() {
        let mut parser = WebdavPropParser::new();
        parser.parse_from_chunk(TWO_ENTRY_DOC.as_bytes()).unwrap();
        assert_eq!(parser.current_properties().len(), 2);

        parser.clear();
        assert!(parser.current_properties().is_empty());

        let props = parser.parse_from_chunk(TWO_ENTRY_DOC.as_bytes()).unwrap();
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn last_write_wins_within_a_scope() {
        let doc = "<response><href>/f</href><propstat><prop>\
                   <getcontentlength>1</getcontentlength></prop></propstat></response>\
                   <response><href>/g</href><propstat><prop>\
                   <getcontentlength>2</getcontentlength></prop></propstat></response>";
        let mut parser = WebdavPropParser::new();
        let props = parser.parse_from_memory(doc).unwrap();
        assert_eq!(props[0].size, 1);
        assert_eq!(props[1].size, 2);
    }
}
