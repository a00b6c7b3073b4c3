//! Persistence tier contract.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::PersistedConfigRecord;

/// One persistence tier for plugin config records.
///
/// Implementations hold at most one record per plugin name; `put` overwrites.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Short tier name used in logs and errors.
    fn name(&self) -> &str;

    /// Read the record for `plugin`, `Ok(None)` when the tier has none.
    async fn get(&self, plugin: &str) -> Result<Option<PersistedConfigRecord>, StoreError>;

    /// Write `record`, replacing any previous record for the same plugin.
    async fn put(&self, record: &PersistedConfigRecord) -> Result<(), StoreError>;
}
