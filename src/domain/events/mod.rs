//! Domain events
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{AdjustmentEntry, StockStatus};
use crate::domain::value_objects::SkuId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InventoryEvent {
    Adjusted(AdjustmentEntry),
    StatusChanged { sku_id: SkuId, from: StockStatus, to: StockStatus },
    /// Reservations now exceed on-hand stock. Raised on the transition only.
    Oversold { sku_id: SkuId, qty_on_hand: u32, total_reserved: u64 },
}

impl InventoryEvent {
    pub fn sku_id(&self) -> &SkuId {
        match self {
            Self::Adjusted(entry) => &entry.sku_id,
            Self::StatusChanged { sku_id, .. } | Self::Oversold { sku_id, .. } => sku_id,
        }
    }
}
