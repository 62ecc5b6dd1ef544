use crate::base::error::{BoxError, DavError};
use crate::session::url::Scheme;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Type-erased response body flowing out of a session.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

/// One protocol exchange over an established connection.
///
/// The production implementation drives a hyper HTTP/1.1 sender; tests
/// substitute scripted transports.
pub trait SessionTransport: Send {
    fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> BoxFuture<'_, Result<Response<ResponseBody>, DavError>>;

    /// Whether the underlying connection can still carry requests.
    fn is_open(&self) -> bool;
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A reusable transport session bound to one `scheme+host+port`.
///
/// The session records the endpoint it was actually established against;
/// [`SessionFactory`](crate::session::factory::SessionFactory) files it back
/// into the pool under a key derived from these recorded values, not from
/// whatever string the original caller requested.
pub struct Session {
    id: u64,
    scheme: Scheme,
    host: String,
    port: u16,
    transport: Box<dyn SessionTransport>,
}

impl Session {
    pub fn new(scheme: Scheme, host: String, port: u16, transport: Box<dyn SessionTransport>) -> Self {
        Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            scheme,
            host,
            port,
            transport,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Negotiated scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Negotiated host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Negotiated port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub(crate) async fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<ResponseBody>, DavError> {
        self.transport.send_request(req).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Hyper HTTP/1.1 sender over a TCP or TLS stream.
pub(crate) struct HyperTransport {
    sender: http1::SendRequest<Full<Bytes>>,
}

impl HyperTransport {
    pub(crate) fn new(sender: http1::SendRequest<Full<Bytes>>) -> Self {
        HyperTransport { sender }
    }
}

impl SessionTransport for HyperTransport {
    fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> BoxFuture<'_, Result<Response<ResponseBody>, DavError>> {
        Box::pin(async move {
            if self.sender.is_closed() {
                return Err(DavError::SessionClosed);
            }
            let response = self.sender.send_request(req).await?;
            Ok(response.map(|body| body.map_err(|e| Box::new(e) as BoxError).boxed()))
        })
    }

    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}
