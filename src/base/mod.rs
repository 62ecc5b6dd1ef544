//! Base types and error handling.
//!
//! Provides foundational types shared by every layer:
//! - [`error::DavError`]: the crate-wide error taxonomy
//! - [`date`]: RFC 1123 / ISO 8601 date parsing for WebDAV property values

pub mod date;
pub mod error;
