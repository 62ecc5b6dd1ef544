//! Request objects: one pooled session wrapped for one protocol exchange.

pub mod httprequest;

pub use httprequest::{HttpRequest, HttpResponse};
