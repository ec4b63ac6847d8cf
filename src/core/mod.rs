//! Core business logic: ledger records, currency normalization, valuation
//! and the threshold-alert state machine.

pub mod currency;
pub mod monitor;
pub mod record;
pub mod symbol;
pub mod valuation;

// Re-export main types for cleaner imports
pub use monitor::Breach;
pub use record::{PositionRecord, PropertyPatch, PropertyValue, RecordKind};
