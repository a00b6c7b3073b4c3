//! Tiered persistence for Lovpen plugin configuration.
//!
//! The in-memory [`PluginManager`](lovpen_renderer::PluginManager) is the
//! authoritative copy of every plugin's config. This crate persists it to a
//! prioritized list of tiers and reconciles loads against concurrent local
//! edits.
//!
//! # Tiers
//!
//! - [`FsBackend`]: durable, one JSON file per plugin
//! - [`CacheBackend`]: local fast cache over a [`lovpen_cache`] bucket
//! - `MockBackend` (feature `mock`): in-memory with injectable delay and
//!   failure
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lovpen_renderer::plugins::builtin_manager;
//! use lovpen_store::{ConfigStore, FsBackend, SettingsSurface, TieredBackends};
//!
//! let tiers = TieredBackends::new().with_tier(Arc::new(FsBackend::new(".lovpen/config")));
//! let store = ConfigStore::new(Arc::new(builtin_manager()), tiers);
//! store.hydrate().await;
//!
//! let settings = SettingsSurface::new(store);
//! settings.on_toggle("math", true)?.wait().await?;
//! ```

mod backend;
mod cache;
mod error;
mod fs;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod record;
mod settings;
mod store;
mod tiered;

pub use backend::ConfigBackend;
pub use cache::{CONFIG_BUCKET, CacheBackend};
pub use error::{StoreError, StoreErrorKind};
pub use fs::FsBackend;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockBackend;
pub use record::PersistedConfigRecord;
pub use settings::SettingsSurface;
pub use store::{ConfigStore, LoadOutcome, PendingSave, SaveStatus};
pub use tiered::{TieredBackends, WriteReport};
