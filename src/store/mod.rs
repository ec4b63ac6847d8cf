//! Record store abstraction over the external ledger.

use crate::core::record::{PositionRecord, PropertyPatch};
use anyhow::Result;
use async_trait::async_trait;

pub mod notion;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All ledger rows, read fresh. Rows that fail to parse are skipped.
    async fn query_records(&self) -> Result<Vec<PositionRecord>>;

    /// Apply a merge-patch to one record's properties.
    async fn update_record(&self, id: &str, patch: &PropertyPatch) -> Result<()>;
}
