//! URL parsing for the protocols the session layer can route.
//!
//! Only the schemes on the allow-list are accepted; anything else is a hard,
//! non-retryable parse failure carrying the offending input.

use crate::base::error::DavError;
use std::fmt;

/// Supported transport schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Case-exact match against the scheme allow-list.
    pub fn from_exact(s: &str) -> Option<Scheme> {
        match s {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Well-known port substituted when a URL carries none.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL decomposed into its connection-routing components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    pub scheme: Scheme,
    pub host: String,
    pub path: String,
    pub port: u16,
}

impl HttpUrl {
    /// `host` or `host:port`, with the port omitted when it is the scheme
    /// default.
    pub fn authority(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority(), self.path)
    }
}

/// Splits a URL into `(scheme, host, path, port)`.
///
/// The scheme must case-exactly match the allow-list. Any run of `/` after
/// the `:` is absorbed as the separator; the next `/` starts the path, which
/// defaults to `/`. An explicit port must be a non-zero integer that fits in
/// 16 bits; an absent port falls back to the scheme default.
pub fn parse_http_url(url: &str) -> Result<HttpUrl, DavError> {
    let fail = || DavError::UrlParse { url: url.to_string() };

    let colon = url.find(':').ok_or_else(fail)?;
    let scheme = Scheme::from_exact(&url[..colon]).ok_or_else(fail)?;

    let rest = url[colon + 1..].trim_start_matches('/');
    if rest.is_empty() {
        return Err(fail());
    }

    let (host_port, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], rest[slash..].to_string()),
        None => (rest, String::from("/")),
    };

    let (host, port) = match host_port.find(':') {
        Some(sep) => {
            let port: u16 = host_port[sep + 1..].parse().map_err(|_| fail())?;
            if port == 0 {
                return Err(fail());
            }
            (&host_port[..sep], port)
        }
        None => (host_port, scheme.default_port()),
    };

    Ok(HttpUrl { scheme, host: host.to_string(), path, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_url() {
        let parsed = parse_http_url("https://dav.example.org:8443/data/file.txt").unwrap();
        assert_eq!(parsed.scheme, Scheme::Https);
        assert_eq!(parsed.host, "dav.example.org");
        assert_eq!(parsed.port, 8443);
        assert_eq!(parsed.path, "/data/file.txt");
    }

    #[test]
    fn substitutes_default_ports() {
        let parsed = parse_http_url("http://example.org/a").unwrap();
        assert_eq!(parsed.port, 80);
        let parsed = parse_http_url("https://example.org/a").unwrap();
        assert_eq!(parsed.port, 443);
    }

    #[test]
    fn path_defaults_to_root() {
        let parsed = parse_http_url("http://example.org").unwrap();
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.host, "example.org");
    }

    #[test]
    fn absorbs_extra_scheme_slashes() {
        let parsed = parse_http_url("http:///example.org/a").unwrap();
        assert_eq!(parsed.host, "example.org");
        assert_eq!(parsed.path, "/a");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse_http_url("ftp://example.org/a").is_err());
        assert!(parse_http_url("HTTP://example.org/a").is_err());
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_http_url("example.org/a").is_err());
    }

    #[test]
    fn rejects_empty_host_segment() {
        assert!(parse_http_url("http://").is_err());
        assert!(parse_http_url("http:").is_err());
    }

    #[test]
    fn rejects_bad_ports() {
        assert!(parse_http_url("http://example.org:0/a").is_err());
        assert!(parse_http_url("http://example.org:99999/a").is_err());
        assert!(parse_http_url("http://example.org:http/a").is_err());
    }

    #[test]
    fn authority_omits_default_port() {
        let parsed = parse_http_url("https://example.org/a").unwrap();
        assert_eq!(parsed.authority(), "example.org");
        let parsed = parse_http_url("https://example.org:8443/a").unwrap();
        assert_eq!(parsed.authority(), "example.org:8443");
    }
}
