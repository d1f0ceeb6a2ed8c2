use std::{collections::BTreeSet, fmt};

use crate::index::IndexKind;

/// Identity of one cache slot.
///
/// Two keys that differ only in `last_modified` are different slots, so a
/// rewritten data file never shares a slot with its previous version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexCacheKey {
    path: String,
    last_modified: i64,
    kinds: BTreeSet<IndexKind>,
}

impl IndexCacheKey {
    pub fn new(
        path: impl Into<String>,
        last_modified: i64,
        kinds: impl IntoIterator<Item = IndexKind>,
    ) -> Self {
        Self {
            path: path.into(),
            last_modified,
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Key for the indexes of `column` over the file at `file_path`.
    ///
    /// The logical path is `<table_fqn>/<column>/<file_path>` with table and
    /// column lowercased.
    pub fn for_column(
        table_fqn: &str,
        column: &str,
        file_path: &str,
        last_modified: i64,
        kinds: impl IntoIterator<Item = IndexKind>,
    ) -> Self {
        let path = format!(
            "{}/{}/{}",
            table_fqn.to_lowercase(),
            column.to_lowercase(),
            file_path.trim_start_matches('/')
        );
        Self::new(path, last_modified, kinds)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    pub fn kinds(&self) -> &BTreeSet<IndexKind> {
        &self.kinds
    }
}

impl fmt::Display for IndexCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} [", self.path, self.last_modified)?;
        for (i, kind) in self.kinds.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(kind.as_str())?;
        }
        f.write_str("]")
    }
}
