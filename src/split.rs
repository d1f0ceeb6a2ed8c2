use std::hash::{Hash, Hasher};

/// A unit of scan work over a byte range of one data file.
///
/// Equality and hashing use the split's identity `(catalog, path, start)`.
/// `length` and `last_modified` are observations made when the split was
/// enumerated and do not take part in set operations.
#[derive(Clone, Debug)]
pub struct Split {
    catalog: String,
    path: String,
    start: u64,
    length: u64,
    last_modified: i64,
}

impl Split {
    pub fn new(
        catalog: impl Into<String>,
        path: impl Into<String>,
        start: u64,
        length: u64,
        last_modified: i64,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            path: path.into(),
            start,
            length,
            last_modified,
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// File location as enumerated, usually a URI (`hdfs://nn/warehouse/f.orc`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Last-modified time (epoch millis) of the file when the split was created.
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    /// Whether a stripe starting at `offset` is read by this split.
    pub fn covers(&self, offset: u64) -> bool {
        offset >= self.start && offset - self.start < self.length
    }

    /// Path component of [`path`](Self::path) with scheme and authority removed.
    ///
    /// `hdfs://nn:8020/warehouse/f.orc` becomes `/warehouse/f.orc`; plain paths
    /// are returned unchanged.
    pub fn file_path(&self) -> &str {
        uri_path(&self.path)
    }

    /// Stable string identity used in logs: `catalog:path`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.catalog, self.path)
    }
}

impl PartialEq for Split {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.path == other.path && self.catalog == other.catalog
    }
}

impl Eq for Split {}

impl Hash for Split {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.catalog.hash(state);
        self.path.hash(state);
        self.start.hash(state);
    }
}

fn uri_path(uri: &str) -> &str {
    let Some(scheme_end) = uri.find("://") else {
        return uri;
    };
    let rest = &uri[scheme_end + 3..];
    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    };
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}
