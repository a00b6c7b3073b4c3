use std::path::PathBuf;

use crate::option::ResourceKind;

/// Failure of a single resource source.
///
/// The catalog absorbs these by falling back to the next source; they only
/// surface in logs.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The source does not provide this kind.
    #[error("{source_name} does not provide {kind} resources")]
    Unsupported {
        source_name: String,
        kind: ResourceKind,
    },
    /// Reading from the filesystem failed.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Catalog data could not be decoded.
    #[error("invalid {kind} data in {source_name}: {source}")]
    Parse {
        source_name: String,
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },
    /// The source answered with no options.
    #[error("{source_name} returned no {kind} resources")]
    Empty {
        source_name: String,
        kind: ResourceKind,
    },
    /// The source is unreachable.
    #[error("{0} is unavailable")]
    Unavailable(String),
}
