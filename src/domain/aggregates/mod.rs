//! Aggregates module
pub mod adjustment;
pub mod inventory;

pub use adjustment::{check_quantity, parse_quantity, AdjustMode, Adjustment, AdjustmentEntry, AdjustmentRequest, AdjustmentTarget, ChangeType, ValidationError};
pub use inventory::{InventoryRecord, LedgerError, StockStatus, StockView};
