//! Theme, highlight and template catalogs.
//!
//! [`ResourceCatalog`] answers from a chain of [`ResourceSource`]s: dynamic
//! sources such as a template directory first, the catalogs bundled into the
//! binary next, and a minimal built-in list last. Source failures are logged
//! and never reach the caller.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lovpen_resources::{DirectorySource, ResourceCatalog};
//!
//! let catalog = ResourceCatalog::new()
//!     .with_dynamic_source(Arc::new(DirectorySource::templates("templates")));
//! let templates = catalog.load_templates().await;
//! assert_eq!(templates[0].identifier, "none");
//! ```

mod catalog;
mod error;
mod option;
mod source;

pub use catalog::ResourceCatalog;
pub use error::ResourceError;
pub use option::{NO_TEMPLATE, ResourceKind, ResourceOption, minimal_options};
#[cfg(any(test, feature = "mock"))]
pub use source::FailingSource;
pub use source::{BundledSource, DirectorySource, ListSource, ResourceSource};
