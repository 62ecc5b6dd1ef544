//! # davnet
//!
//! An HTTP and WebDAV client library for remote storage endpoints.
//!
//! `davnet` provides the building blocks of a storage client: a
//! connection-reusing session pool keyed by endpoint, a strict HTTP URL
//! parser, a streaming WebDAV PROPFIND property parser, and signed-URL
//! helpers for S3 and Google Cloud Storage gateways.
//!
//! ## Features
//!
//! - **Session Pooling**: sessions keyed by `scheme+host+port`, reused
//!   across requests and returned under their negotiated endpoint
//! - **HTTP/1.1**: hyper-backed transport over TCP or BoringSSL TLS
//! - **WebDAV Parsing**: incremental multi-status property extraction
//!   tolerant of arbitrary chunk boundaries
//! - **Authentication**: callback-driven Basic credentials on challenge
//! - **Cloud Signing**: AWS signature v2 headers and GCS signed URLs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use davnet::context::Context;
//! use davnet::dav::Depth;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Context::new();
//!     let entries = context
//!         .propfind("https://dav.example.org/files/", Depth::One)
//!         .await
//!         .unwrap();
//!     for entry in entries {
//!         println!("{} ({} bytes)", entry.filename, entry.size);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and date parsing
//! - [`session`] - URL parsing, session factory, pool, and connectors
//! - [`request`] - Single-exchange request objects over pooled sessions
//! - [`dav`] - WebDAV property parser and file property records
//! - [`cloud`] - S3 and Google Cloud Storage request signing
//! - [`context`] - Entry point tying the pool and request layers together

pub mod base;
pub mod cloud;
pub mod context;
pub mod dav;
pub mod request;
pub mod session;

pub use base::error::DavError;
pub use context::Context;
