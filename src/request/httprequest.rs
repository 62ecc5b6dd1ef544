use crate::base::error::DavError;
use crate::session::factory::{AuthCallback, AuthChallenge, SessionFactory};
use crate::session::session::Session;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http::header::{AUTHORIZATION, HOST};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::sync::Arc;

/// A fully collected HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// One protocol exchange over one pooled session.
///
/// Built by [`Context::create_request`](crate::context::Context::create_request)
/// with the authentication callback the factory held at creation time.
/// [`execute`](HttpRequest::execute) consumes the request: the session goes
/// back to the pool after the exchange completes, or is dropped on a
/// session-level transport error. Move semantics make double-release
/// impossible.
pub struct HttpRequest {
    factory: Arc<SessionFactory>,
    session: Session,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    auth: Option<AuthCallback>,
}

impl HttpRequest {
    pub(crate) fn new(
        factory: Arc<SessionFactory>,
        session: Session,
        method: Method,
        path: String,
        auth: Option<AuthCallback>,
    ) -> Self {
        HttpRequest { factory, session, method, path, headers: Vec::new(), body: None, auth }
    }

    /// Adds a header field, replacing an existing one with the same name.
    /// An empty value removes the field.
    pub fn add_header_field(&mut self, field: &str, value: &str) {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(field));
        if !value.is_empty() {
            self.headers.push((field.to_string(), value.to_string()));
        }
    }

    /// Sets a custom request verb (PROPFIND, MKCOL, ...).
    pub fn set_request_custom(&mut self, verb: &str) -> Result<(), DavError> {
        self.method = Method::from_bytes(verb.as_bytes())
            .map_err(|_| DavError::InvalidMethod { verb: verb.to_string() })?;
        Ok(())
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Runs the exchange and collects the response.
    ///
    /// On a 401, if the inherited authentication callback yields credentials
    /// for this endpoint, the request is retried once with Basic
    /// authorization. Any completed exchange (whatever the status) returns
    /// the session to the pool; transport failures drop it.
    pub async fn execute(mut self) -> Result<HttpResponse, DavError> {
        let mut authenticated = false;
        loop {
            let response = match self.send_once().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(id = self.session.id(), error = %e, "exchange failed, discarding session");
                    return Err(e);
                }
            };

            if response.status == StatusCode::UNAUTHORIZED && !authenticated {
                if let Some(credentials) = self.challenge_credentials() {
                    let token =
                        BASE64.encode(format!("{}:{}", credentials.user, credentials.password));
                    self.add_header_field(AUTHORIZATION.as_str(), &format!("Basic {token}"));
                    authenticated = true;
                    continue;
                }
            }

            self.factory.release_session(self.session);
            return Ok(response);
        }
    }

    fn challenge_credentials(&self) -> Option<crate::session::factory::UserCredentials> {
        let callback = self.auth.as_ref()?;
        let challenge = AuthChallenge {
            scheme: self.session.scheme(),
            host: self.session.host().to_string(),
            port: self.session.port(),
        };
        callback(&challenge)
    }

    async fn send_once(&mut self) -> Result<HttpResponse, DavError> {
        let host = if self.session.port() == self.session.scheme().default_port() {
            self.session.host().to_string()
        } else {
            format!("{}:{}", self.session.host(), self.session.port())
        };

        let mut builder =
            Request::builder().method(self.method.clone()).uri(&self.path).header(HOST, host);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = self.body.clone().unwrap_or_default();
        let request = builder.body(Full::new(body))?;

        let response = self.session.send_request(request).await?;
        let (parts, body) = response.into_parts();
        let collected =
            body.collect().await.map_err(|e| DavError::Body(e.to_string()))?.to_bytes();

        tracing::debug!(status = parts.status.as_u16(), bytes = collected.len(), "exchange complete");
        Ok(HttpResponse { status: parts.status, headers: parts.headers, body: collected })
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("session", &self.session)
            .finish()
    }
}
