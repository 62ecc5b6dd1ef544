//! Session establishment: DNS -> TCP -> optional TLS -> HTTP/1.1 handshake.

use crate::base::error::DavError;
use crate::session::session::{HyperTransport, Session};
use crate::session::url::Scheme;
use boring::ssl::{SslConnector, SslMethod, SslVerifyMode};
use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Creates new transport sessions on pool misses.
///
/// The factory never connects on its own; everything network-adjacent goes
/// through this seam so tests can substitute a mock.
pub trait SessionConnector: Send + Sync {
    fn connect<'a>(
        &'a self,
        scheme: Scheme,
        host: &'a str,
        port: u16,
        verify_peer: bool,
    ) -> BoxFuture<'a, Result<Session, DavError>>;
}

/// Production connector: direct connections over tokio, BoringSSL for
/// `https`.
#[derive(Debug, Default)]
pub struct DirectConnector;

impl DirectConnector {
    async fn open_tcp(host: &str, port: u16) -> Result<TcpStream, DavError> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| DavError::NameResolution { host: host.to_string(), source })?;

        for addr in addrs {
            if let Ok(stream) = TcpStream::connect(addr).await {
                return Ok(stream);
            }
        }
        Err(DavError::ConnectionFailed { host: host.to_string(), port })
    }

    async fn handshake<S>(io: S) -> Result<http1::SendRequest<Full<Bytes>>, DavError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, conn) = http1::handshake(TokioIo::new(io)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("session connection terminated: {e}");
            }
        });
        Ok(sender)
    }
}

impl SessionConnector for DirectConnector {
    fn connect<'a>(
        &'a self,
        scheme: Scheme,
        host: &'a str,
        port: u16,
        verify_peer: bool,
    ) -> BoxFuture<'a, Result<Session, DavError>> {
        Box::pin(async move {
            let stream = Self::open_tcp(host, port).await?;

            let sender = match scheme {
                Scheme::Http => Self::handshake(stream).await?,
                Scheme::Https => {
                    let mut builder = SslConnector::builder(SslMethod::tls())?;
                    builder.set_alpn_protos(b"\x08http/1.1")?;
                    if !verify_peer {
                        builder.set_verify(SslVerifyMode::NONE);
                    }
                    let config = builder.build().configure()?;
                    let tls = tokio_boring::connect(config, host, stream).await.map_err(|e| {
                        DavError::TlsHandshake { host: host.to_string(), reason: format!("{e:?}") }
                    })?;
                    Self::handshake(tls).await?
                }
            };

            tracing::debug!(%scheme, host, port, "established new session");
            Ok(Session::new(scheme, host.to_string(), port, Box::new(HyperTransport::new(sender))))
        })
    }
}
