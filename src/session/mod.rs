//! Session management and connection reuse.
//!
//! A [`factory::SessionFactory`] owns a keyed pool of reusable transport
//! sessions, one physical connection per `scheme+host[:port]`. Callers
//! acquire a session, run one protocol exchange over it, and return it for
//! reuse. [`url::parse_http_url`] turns URL strings into the routing tuples
//! the pool is keyed by.

pub mod connector;
pub mod factory;
pub mod session;
pub mod url;
