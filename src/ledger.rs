//! Inventory ledger
//!
//! Holds one record per SKU together with its audit history. Each SKU sits
//! behind its own mutex, so writes to one SKU are serialized while writes to
//! different SKUs never contend. The map lock is only held to find or insert
//! a slot.
//!
//! History is kept in memory for the life of the ledger. Persisting it and
//! dropping old entries is up to the embedding service; unchanged channel
//! syncs write nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::domain::aggregates::{
    AdjustmentEntry, AdjustmentRequest, ChangeType, InventoryRecord, LedgerError, StockStatus, StockView,
};
use crate::domain::events::InventoryEvent;
use crate::domain::value_objects::{Channel, SkuId};

struct Slot {
    record: InventoryRecord,
    history: Vec<AdjustmentEntry>,
}

impl Slot {
    fn new(sku_id: SkuId) -> Self { Self { record: InventoryRecord::new(sku_id), history: vec![] } }
}

#[derive(Default)]
pub struct InventoryLedger {
    config: LedgerConfig,
    slots: RwLock<HashMap<SkuId, Arc<Mutex<Slot>>>>,
    outbox: Mutex<Vec<InventoryEvent>>,
}

impl InventoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config, slots: RwLock::new(HashMap::new()), outbox: Mutex::new(vec![]) }
    }

    pub fn config(&self) -> &LedgerConfig { &self.config }

    // -------------------------------------------------------------------------
    // Reads. Unknown SKUs are materialized as zeroed records.
    // -------------------------------------------------------------------------

    pub fn get(&self, sku_id: &SkuId) -> InventoryRecord { self.with_slot(sku_id, |slot| slot.record.clone()) }
    pub fn view(&self, sku_id: &SkuId) -> StockView { self.with_slot(sku_id, |slot| slot.record.view()) }
    pub fn status_of(&self, sku_id: &SkuId) -> StockStatus { self.with_slot(sku_id, |slot| slot.record.status()) }
    pub fn truly_available(&self, sku_id: &SkuId) -> u32 { self.with_slot(sku_id, |slot| slot.record.truly_available()) }

    /// Newest first, capped at the configured history limit.
    pub fn history(&self, sku_id: &SkuId, limit: Option<usize>) -> Vec<AdjustmentEntry> {
        let limit = limit.unwrap_or(self.config.history_limit).min(self.config.history_limit);
        self.with_slot(sku_id, |slot| slot.history.iter().rev().take(limit).cloned().collect())
    }

    /// SKUs with a record, sorted.
    pub fn sku_ids(&self) -> Vec<SkuId> {
        let mut ids: Vec<SkuId> = self.slots.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Records whose reservations exceed on-hand stock.
    pub fn oversold(&self) -> Vec<StockView> {
        self.sku_ids().iter().map(|id| self.view(id)).filter(|view| view.oversold).collect()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Manual on-hand adjustment. Invalid input is rejected before anything,
    /// including the lazy record, is written.
    pub fn adjust_on_hand(&self, sku_id: &SkuId, request: &AdjustmentRequest) -> Result<AdjustmentEntry, LedgerError> {
        self.adjust_on_hand_as(sku_id, request, ChangeType::Manual)
    }

    pub fn adjust_on_hand_as(&self, sku_id: &SkuId, request: &AdjustmentRequest, change_type: ChangeType) -> Result<AdjustmentEntry, LedgerError> {
        let mut adjustment = request.validated()?;
        if adjustment.reason.is_empty() {
            adjustment.reason = match change_type {
                ChangeType::Bulk => self.config.bulk_reason.clone(),
                _ => self.config.manual_reason.clone(),
            };
        }
        self.mutate(sku_id, |record| record.adjust_on_hand(&adjustment, change_type))
    }

    /// Replaces one channel's reservation. Used by channel sync only.
    /// Returns `None` when the reservation already had that quantity.
    pub fn set_reservation(&self, sku_id: &SkuId, channel: Channel, qty: u32, actor: &str) -> Option<AdjustmentEntry> {
        let reason = format!("{channel} allocation sync");
        self.with_slot(sku_id, |slot| {
            let entry = slot.record.set_reservation(channel, qty, &reason, actor)?;
            Self::commit(slot, &entry);
            Some(entry)
        })
    }

    pub fn set_on_order(&self, sku_id: &SkuId, qty: u32, actor: &str) -> Result<AdjustmentEntry, LedgerError> {
        self.mutate(sku_id, |record| record.set_on_order(qty, "On-order quantity update", actor))
    }

    pub fn set_reorder_threshold(&self, sku_id: &SkuId, qty: u32, actor: &str) -> Result<AdjustmentEntry, LedgerError> {
        self.mutate(sku_id, |record| record.set_reorder_threshold(qty, "Reorder threshold update", actor))
    }

    /// Soft-archives a discontinued SKU's record. Records are never deleted.
    pub fn archive(&self, sku_id: &SkuId) -> bool {
        let archived = self.with_slot(sku_id, |slot| slot.record.archive());
        if archived { info!(sku = %sku_id, "inventory record archived"); }
        archived
    }

    /// Loads a record read from persistence. Writes no audit entries.
    pub fn hydrate(&self, record: InventoryRecord) {
        let sku_id = record.sku_id().clone();
        let slot = self.slot(&sku_id);
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.record = record;
        debug!(sku = %sku_id, "inventory record hydrated");
    }

    /// Drains events raised since the last call.
    pub fn take_events(&self) -> Vec<InventoryEvent> {
        std::mem::take(&mut *self.outbox.lock().unwrap_or_else(PoisonError::into_inner))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn slot(&self, sku_id: &SkuId) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self.slots.read().unwrap_or_else(PoisonError::into_inner).get(sku_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(sku_id.clone()).or_insert_with(|| {
            debug!(sku = %sku_id, "materialized zeroed inventory record");
            Arc::new(Mutex::new(Slot::new(sku_id.clone())))
        });
        Arc::clone(slot)
    }

    /// Runs `f` under the SKU's lock. Events the record raised are moved to
    /// the outbox before the lock is released, so per-SKU order is kept.
    fn with_slot<T>(&self, sku_id: &SkuId, f: impl FnOnce(&mut Slot) -> T) -> T {
        let slot = self.slot(sku_id);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut guard);
        let events = guard.record.take_events();
        if !events.is_empty() {
            self.outbox.lock().unwrap_or_else(PoisonError::into_inner).extend(events);
        }
        out
    }

    fn mutate(
        &self,
        sku_id: &SkuId,
        f: impl FnOnce(&mut InventoryRecord) -> Result<AdjustmentEntry, LedgerError>,
    ) -> Result<AdjustmentEntry, LedgerError> {
        self.with_slot(sku_id, |slot| {
            let entry = f(&mut slot.record)?;
            Self::commit(slot, &entry);
            Ok(entry)
        })
    }

    fn commit(slot: &mut Slot, entry: &AdjustmentEntry) {
        slot.history.push(entry.clone());
        info!(
            sku = %entry.sku_id,
            target = ?entry.target,
            change_type = ?entry.change_type,
            delta = entry.delta_applied,
            resulting = entry.resulting_qty,
            actor = %entry.actor,
            "inventory adjusted"
        );
        if slot.record.is_oversold() {
            warn!(
                sku = %entry.sku_id,
                qty_on_hand = slot.record.qty_on_hand(),
                total_reserved = slot.record.total_reserved(),
                "reservations exceed on-hand stock"
            );
        }
    }
}
