use std::io;
use thiserror::Error;

/// Boxed error type used for type-erased response body errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the session layer, the URL parser and the WebDAV
/// property parser.
///
/// Malformed-input variants carry the offending input and are never
/// retryable. Transport variants are propagated unchanged from the
/// collaborator that produced them; no retry logic lives at this layer.
#[derive(Debug, Error)]
pub enum DavError {
    // URL parsing
    #[error("invalid url format: {url}")]
    UrlParse { url: String },

    // Session / transport
    #[error("name resolution failed for {host}: {source}")]
    NameResolution { host: String, source: io::Error },
    #[error("connection to {host}:{port} failed")]
    ConnectionFailed { host: String, port: u16 },
    #[error("tls handshake with {host} failed: {reason}")]
    TlsHandshake { host: String, reason: String },
    #[error("session closed")]
    SessionClosed,
    #[error("http exchange failed: {0}")]
    Http(#[from] hyper::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),
    #[error("invalid http method: {verb}")]
    InvalidMethod { verb: String },
    #[error("response body read failed: {0}")]
    Body(String),
    #[error("unexpected http response code {status}")]
    UnexpectedResponse { status: u16 },

    // WebDAV multi-status parsing
    #[error("parsing error in the webdav request result, <{element}> duplicated")]
    XmlScopeDuplicated { element: String },
    #[error("parsing error in the webdav request result, </{element}> not open before")]
    XmlScopeNotOpen { element: String },
    #[error("xml syntax error in webdav response: {0}")]
    XmlSyntax(String),
    #[error("invalid {field} value in dav response: {text}")]
    InvalidFieldValue { field: &'static str, text: String },

    // Cloud credential / signing glue
    #[error("credential parsing error: {0}")]
    CredentialParse(String),
    #[error("signing error: {0}")]
    Crypto(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl From<boring::error::ErrorStack> for DavError {
    fn from(e: boring::error::ErrorStack) -> Self {
        DavError::Crypto(e.to_string())
    }
}
