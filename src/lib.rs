//! OpenSASE Variants
//!
//! Variant resolution and multi-channel inventory bookkeeping for the
//! storefront.
//!
//! ## Features
//! - Variant schema built from a catalog snapshot
//! - Selection resolver that only offers values completing to a real SKU
//! - Per-SKU inventory ledger with channel reservations and an audit trail
//! - Bulk and channel-sync reconciliation with per-item failure reporting
//!
//! The crate performs no I/O. Catalog fetching, persistence and transport
//! belong to the services embedding it.

pub mod catalog_cache;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod reconciler;
pub mod telemetry;

use thiserror::Error;

pub use catalog_cache::{load_schema, CatalogCache, TtlCatalogCache};
pub use config::{ConfigError, LedgerConfig};
pub use domain::aggregates::{
    AdjustMode, AdjustmentEntry, AdjustmentRequest, AdjustmentTarget, ChangeType, InventoryRecord, LedgerError, StockStatus,
    StockView, ValidationError,
};
pub use domain::events::InventoryEvent;
pub use domain::value_objects::{Channel, ImageRef, Money, SkuId, ValueId};
pub use domain::variants::{
    clamp_purchase_quantity, CatalogInput, Outcome, Resolution, SchemaError, Selection, SelectionError, SelectionMachine,
    SelectionResolver, SelectionState, Sku, VariantDimension, VariantSchema, VariantValue,
};
pub use ledger::InventoryLedger;
pub use reconciler::{AllocationReconciler, BulkFailure, BulkOutcome, ChannelFeed};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum Error {
    #[error("catalog error: {0}")]
    Schema(#[from] SchemaError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
