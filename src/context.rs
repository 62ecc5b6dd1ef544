//! Main entry point.
//!
//! A [`Context`] owns one session-reuse pool and the parameters applied to
//! requests built through it. Cloning a context shares the pool; create a
//! new context for an isolated pool.

use crate::base::error::DavError;
use crate::dav::fileprops::FileProperties;
use crate::dav::propparser::WebdavPropParser;
use crate::dav::Depth;
use crate::request::httprequest::HttpRequest;
use crate::session::connector::SessionConnector;
use crate::session::factory::{AuthCallback, SessionFactory};
use crate::session::url::parse_http_url;
use http::{Method, StatusCode};
use std::sync::Arc;

const PROPFIND_ALLPROP_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?><D:propfind xmlns:D="DAV:"><D:allprop/></D:propfind>"#;

/// Thread-safe entry point carrying a session pool and request parameters.
#[derive(Clone)]
pub struct Context {
    factory: Arc<SessionFactory>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context { factory: Arc::new(SessionFactory::new()) }
    }

    /// Context backed by a custom transport connector.
    pub fn with_connector(connector: Arc<dyn SessionConnector>) -> Self {
        Context { factory: Arc::new(SessionFactory::with_connector(connector)) }
    }

    /// Registers the callback consulted on authentication challenges.
    pub fn set_auth_callback(&self, callback: AuthCallback) {
        self.factory.set_auth_callback(callback);
    }

    /// Enables or disables TLS certificate-authority validation for new
    /// sessions.
    pub fn set_ssl_ca_check(&self, check: bool) {
        self.factory.set_ssl_ca_check(check);
    }

    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }

    /// Builds a request for `url`, acquiring a pooled session for its
    /// endpoint. The request inherits the current authentication callback.
    pub async fn create_request(
        &self,
        method: Method,
        url: &str,
    ) -> Result<HttpRequest, DavError> {
        let parsed = parse_http_url(url)?;
        let session =
            self.factory.acquire_session(parsed.scheme, &parsed.host, parsed.port).await?;
        Ok(HttpRequest::new(
            self.factory.clone(),
            session,
            method,
            parsed.path,
            self.factory.auth_callback(),
        ))
    }

    /// Lists the properties of `url` via PROPFIND, parsing the multi-status
    /// body into one record per response entry.
    pub async fn propfind(
        &self,
        url: &str,
        depth: Depth,
    ) -> Result<Vec<FileProperties>, DavError> {
        let mut request = self.create_request(Method::GET, url).await?;
        request.set_request_custom("PROPFIND")?;
        request.add_header_field("Depth", depth.as_str());
        request.add_header_field("Content-Type", "application/xml; charset=utf-8");
        request.set_body(PROPFIND_ALLPROP_BODY);

        let response = request.execute().await?;
        if response.status() != StatusCode::MULTI_STATUS {
            return Err(DavError::UnexpectedResponse { status: response.status().as_u16() });
        }

        let text = std::str::from_utf8(response.body())
            .map_err(|e| DavError::XmlSyntax(e.to_string()))?;
        let mut parser = WebdavPropParser::new();
        Ok(parser.parse_from_memory(text)?.to_vec())
    }
}
