//! Date parsing collaborators for WebDAV property values.
//!
//! WebDAV servers report `getlastmodified` in the RFC 1123 format used by
//! HTTP (`Mon, 12 Jan 2015 15:30:00 GMT`) and `creationdate` as ISO 8601
//! (RFC 3339 profile). Both parse to Unix timestamps in seconds.

use crate::base::error::DavError;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

static RFC1123: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Parses an RFC 1123 HTTP date into a Unix timestamp.
pub fn parse_rfc1123(text: &str) -> Result<i64, DavError> {
    let parsed = PrimitiveDateTime::parse(text.trim(), RFC1123).map_err(|_| {
        DavError::InvalidFieldValue { field: "getlastmodified", text: text.to_string() }
    })?;
    Ok(parsed.assume_utc().unix_timestamp())
}

/// Parses an ISO 8601 date into a Unix timestamp.
///
/// RFC 3339 is tried first (the form WebDAV servers actually emit); the
/// generic ISO 8601 grammar is the fallback, with a missing offset read as
/// UTC.
pub fn parse_iso8601(text: &str) -> Result<i64, DavError> {
    let text = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(parsed.unix_timestamp());
    }
    if let Ok(parsed) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
        return Ok(parsed.unix_timestamp());
    }
    PrimitiveDateTime::parse(text, &Iso8601::DEFAULT)
        .map(|dt| dt.assume_utc().unix_timestamp())
        .map_err(|_| DavError::InvalidFieldValue { field: "creationdate", text: text.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1123_roundtrip() {
        // 2015-01-12 is a Monday
        let ts = parse_rfc1123("Mon, 12 Jan 2015 15:30:00 GMT").unwrap();
        assert_eq!(ts, 1421076600);
    }

    #[test]
    fn rfc1123_rejects_garbage() {
        assert!(parse_rfc1123("yesterday-ish").is_err());
        assert!(parse_rfc1123("").is_err());
    }

    #[test]
    fn iso8601_with_offset() {
        let ts = parse_iso8601("2015-01-12T15:30:00Z").unwrap();
        assert_eq!(ts, 1421076600);
        let ts = parse_iso8601("2015-01-12T16:30:00+01:00").unwrap();
        assert_eq!(ts, 1421076600);
    }

    #[test]
    fn iso8601_rejects_garbage() {
        assert!(parse_iso8601("12/01/2015").is_err());
    }
}
