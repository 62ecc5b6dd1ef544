//! WebDAV support: multi-status property parsing and listing types.

pub mod fileprops;
pub mod propparser;

/// Value of the `Depth` header on PROPFIND requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}
