//! Inventory Aggregate

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::adjustment::{AdjustMode, Adjustment, AdjustmentEntry, AdjustmentTarget, ChangeType, ValidationError};
use crate::domain::events::InventoryEvent;
use crate::domain::value_objects::{Channel, SkuId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus { OutOfStock, LowStock, InStock }

impl StockStatus {
    pub fn classify(truly_available: u32, reorder_threshold: u32) -> Self {
        if truly_available == 0 { Self::OutOfStock }
        else if truly_available <= reorder_threshold { Self::LowStock }
        else { Self::InStock }
    }
}

/// Per-SKU ledger record. Reservations may exceed on-hand stock (oversold);
/// that is reported, never rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryRecord {
    sku_id: SkuId,
    qty_on_hand: u32,
    qty_on_order: u32,
    #[serde(default)]
    reserved: BTreeMap<Channel, u32>,
    reorder_threshold: u32,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    archived: bool,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<InventoryEvent>,
}

/// What the inventory screen renders for one SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockView {
    pub sku_id: SkuId,
    pub qty_on_hand: u32,
    pub qty_on_order: u32,
    pub reserved: BTreeMap<Channel, u32>,
    pub total_reserved: u64,
    pub truly_available: u32,
    pub reorder_threshold: u32,
    pub status: StockStatus,
    pub oversold: bool,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("SKU {0} is archived")]
    Archived(SkuId),
    #[error("adjustment did not complete: {0}")]
    Interrupted(String),
}

impl InventoryRecord {
    /// Zeroed record, as materialized on first access.
    pub fn new(sku_id: SkuId) -> Self {
        Self {
            sku_id, qty_on_hand: 0, qty_on_order: 0, reserved: BTreeMap::new(), reorder_threshold: 0,
            version: 0, archived: false, updated_at: Utc::now(), events: vec![],
        }
    }

    /// Rebuilds a record read back from persistence.
    pub fn restore(sku_id: SkuId, qty_on_hand: u32, qty_on_order: u32, reserved: BTreeMap<Channel, u32>, reorder_threshold: u32) -> Self {
        Self { qty_on_hand, qty_on_order, reserved, reorder_threshold, ..Self::new(sku_id) }
    }

    pub fn sku_id(&self) -> &SkuId { &self.sku_id }
    pub fn qty_on_hand(&self) -> u32 { self.qty_on_hand }
    pub fn qty_on_order(&self) -> u32 { self.qty_on_order }
    pub fn reserved(&self) -> &BTreeMap<Channel, u32> { &self.reserved }
    pub fn reservation(&self, channel: &Channel) -> u32 { self.reserved.get(channel).copied().unwrap_or(0) }
    pub fn reorder_threshold(&self) -> u32 { self.reorder_threshold }
    pub fn version(&self) -> u64 { self.version }
    pub fn is_archived(&self) -> bool { self.archived }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn total_reserved(&self) -> u64 { self.reserved.values().map(|&q| u64::from(q)).sum() }
    pub fn is_oversold(&self) -> bool { self.total_reserved() > u64::from(self.qty_on_hand) }

    /// `max(0, on_hand - total reserved)`.
    pub fn truly_available(&self) -> u32 {
        // never exceeds qty_on_hand, so the narrowing is lossless
        u64::from(self.qty_on_hand).saturating_sub(self.total_reserved()) as u32
    }

    pub fn status(&self) -> StockStatus { StockStatus::classify(self.truly_available(), self.reorder_threshold) }

    pub fn view(&self) -> StockView {
        StockView {
            sku_id: self.sku_id.clone(),
            qty_on_hand: self.qty_on_hand,
            qty_on_order: self.qty_on_order,
            reserved: self.reserved.clone(),
            total_reserved: self.total_reserved(),
            truly_available: self.truly_available(),
            reorder_threshold: self.reorder_threshold,
            status: self.status(),
            oversold: self.is_oversold(),
            archived: self.archived,
        }
    }

    /// `subtract` clamps at zero; the entry records the delta actually applied.
    pub fn adjust_on_hand(&mut self, adjustment: &Adjustment, change_type: ChangeType) -> Result<AdjustmentEntry, LedgerError> {
        self.ensure_active()?;
        let next = match adjustment.mode {
            AdjustMode::Set => adjustment.value,
            AdjustMode::Add => self
                .qty_on_hand
                .checked_add(adjustment.value)
                .ok_or_else(|| ValidationError::OutOfRange(format!("{} + {}", self.qty_on_hand, adjustment.value)))?,
            AdjustMode::Subtract => self.qty_on_hand.saturating_sub(adjustment.value),
        };
        Ok(self.apply(AdjustmentTarget::OnHand, adjustment.mode, adjustment.value, next, change_type, &adjustment.reason, &adjustment.actor))
    }

    /// Replaces one channel's reservation. Applies to archived records too:
    /// channels keep reporting until they delist. `None` when the channel
    /// already holds `qty`; repeated syncs leave no trace.
    pub fn set_reservation(&mut self, channel: Channel, qty: u32, reason: &str, actor: &str) -> Option<AdjustmentEntry> {
        if self.reservation(&channel) == qty { return None; }
        let target = AdjustmentTarget::Reservation { channel };
        Some(self.apply(target, AdjustMode::Set, qty, qty, ChangeType::ChannelSync, reason, actor))
    }

    pub fn set_on_order(&mut self, qty: u32, reason: &str, actor: &str) -> Result<AdjustmentEntry, LedgerError> {
        self.ensure_active()?;
        Ok(self.apply(AdjustmentTarget::OnOrder, AdjustMode::Set, qty, qty, ChangeType::Manual, reason, actor))
    }

    pub fn set_reorder_threshold(&mut self, qty: u32, reason: &str, actor: &str) -> Result<AdjustmentEntry, LedgerError> {
        self.ensure_active()?;
        Ok(self.apply(AdjustmentTarget::ReorderThreshold, AdjustMode::Set, qty, qty, ChangeType::Manual, reason, actor))
    }

    /// Soft-archives a discontinued SKU. Returns false if it already was.
    pub fn archive(&mut self) -> bool {
        if self.archived { return false; }
        self.archived = true;
        self.version += 1;
        self.touch();
        true
    }

    pub fn take_events(&mut self) -> Vec<InventoryEvent> { std::mem::take(&mut self.events) }

    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.archived { Err(LedgerError::Archived(self.sku_id.clone())) } else { Ok(()) }
    }

    fn quantity(&self, target: &AdjustmentTarget) -> u32 {
        match target {
            AdjustmentTarget::OnHand => self.qty_on_hand,
            AdjustmentTarget::OnOrder => self.qty_on_order,
            AdjustmentTarget::ReorderThreshold => self.reorder_threshold,
            AdjustmentTarget::Reservation { channel } => self.reservation(channel),
        }
    }

    fn write(&mut self, target: &AdjustmentTarget, qty: u32) {
        match target {
            AdjustmentTarget::OnHand => self.qty_on_hand = qty,
            AdjustmentTarget::OnOrder => self.qty_on_order = qty,
            AdjustmentTarget::ReorderThreshold => self.reorder_threshold = qty,
            AdjustmentTarget::Reservation { channel } if qty == 0 => { self.reserved.remove(channel); }
            AdjustmentTarget::Reservation { channel } => { self.reserved.insert(channel.clone(), qty); }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(&mut self, target: AdjustmentTarget, mode: AdjustMode, requested: u32, next: u32, change_type: ChangeType, reason: &str, actor: &str) -> AdjustmentEntry {
        let status_before = self.status();
        let oversold_before = self.is_oversold();
        let previous = self.quantity(&target);

        self.write(&target, next);
        self.version += 1;
        self.touch();

        let entry = AdjustmentEntry {
            id: Uuid::now_v7(),
            sku_id: self.sku_id.clone(),
            target,
            change_type,
            mode,
            requested,
            previous_qty: previous,
            delta_applied: i64::from(next) - i64::from(previous),
            resulting_qty: next,
            resulting_qty_on_hand: self.qty_on_hand,
            reason: reason.to_string(),
            actor: actor.to_string(),
            timestamp: self.updated_at,
        };
        self.raise_event(InventoryEvent::Adjusted(entry.clone()));

        let status_after = self.status();
        if status_after != status_before {
            self.raise_event(InventoryEvent::StatusChanged { sku_id: self.sku_id.clone(), from: status_before, to: status_after });
        }
        if self.is_oversold() && !oversold_before {
            self.raise_event(InventoryEvent::Oversold {
                sku_id: self.sku_id.clone(),
                qty_on_hand: self.qty_on_hand,
                total_reserved: self.total_reserved(),
            });
        }
        entry
    }

    fn raise_event(&mut self, e: InventoryEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
