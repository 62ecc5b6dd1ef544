//! Signed-URL and header-signing glue for cloud object stores.

pub mod gcloud;
pub mod s3;
