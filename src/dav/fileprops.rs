/// Metadata for one remote resource, extracted from a WebDAV multi-status
/// response entry.
///
/// `filename` is the basename of the entry's `href` with trailing slashes
/// stripped. Timestamps are Unix seconds; `mode` carries the POSIX
/// permission bits from the non-standard `mode` extension element when the
/// server provides it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileProperties {
    pub filename: String,
    pub mtime: Option<i64>,
    pub ctime: Option<i64>,
    pub size: u64,
    pub mode: Option<u32>,
}
