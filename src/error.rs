use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The unit's input directory does not exist. Fatal for the unit,
    /// harmless for every other one.
    #[error("missing input directory {}", .0.display())]
    MissingInputDir(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: epoch record is not a JSON object", path.display())]
    NotARecord { path: PathBuf },

    /// A field the record's declared measurement count promises is absent
    /// (or not a number). Unmatched measurements never trip this.
    #[error("{}: expected field {field} is missing or not a number", path.display())]
    MissingField { path: PathBuf, field: String },

    #[error("{}: cannot parse record stamp {stamp:?}", path.display())]
    BadStamp { path: PathBuf, stamp: String },

    /// The four navigation-solution file groups must hold the same epochs.
    #[error("navigation-solution groups misaligned: {group} holds {found} epoch(s), expected {expected}")]
    GroupCountMismatch {
        group: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("navigation-solution groups misaligned at epoch {index}: {group} reports {found:?}, expected {expected:?}")]
    GroupStampMismatch {
        group: &'static str,
        index: usize,
        expected: String,
        found: String,
    },

    /// A series fell behind the rest of its bundle: an epoch was dropped.
    #[error("series {name} holds {len} epoch(s), bundle expects {expected}")]
    RaggedBundle {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} aggregation unit(s) failed")]
    Batch { failed: usize },
}
