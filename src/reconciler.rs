//! Allocation reconciler: the only writer of ledger state.
//!
//! Bulk updates are atomic per item, not per batch. Each SKU is adjusted on
//! its own; one SKU failing neither blocks nor rolls back the others, and
//! every failure is returned next to the successes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::aggregates::{check_quantity, AdjustmentEntry, AdjustmentRequest, ChangeType, LedgerError, ValidationError};
use crate::domain::value_objects::{Channel, SkuId};
use crate::ledger::InventoryLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure { pub sku_id: String, pub error: LedgerError }

#[derive(Debug, Clone, Default)]
pub struct BulkOutcome { pub applied: Vec<AdjustmentEntry>, pub failed: Vec<BulkFailure> }

/// Reservation snapshot pushed by a marketplace sync. May be partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelFeed { pub channel: String, pub allocations: BTreeMap<String, i64> }

pub struct AllocationReconciler {
    ledger: Arc<InventoryLedger>,
}

impl AllocationReconciler {
    pub fn new(ledger: Arc<InventoryLedger>) -> Self { Self { ledger } }
    pub fn ledger(&self) -> &Arc<InventoryLedger> { &self.ledger }

    pub fn apply_single(&self, sku_id: &SkuId, request: &AdjustmentRequest) -> Result<AdjustmentEntry, LedgerError> {
        self.ledger.adjust_on_hand(sku_id, request)
    }

    /// Applies `request` to every SKU concurrently, bounded by the configured
    /// bulk concurrency. Results keep input order; repeated ids are applied once.
    ///
    /// `reason_template` may use `{sku}`, `{n}` (1-based position) and
    /// `{total}`. An empty template falls back to the request's own reason.
    pub async fn apply_bulk(&self, sku_ids: &[String], request: &AdjustmentRequest, reason_template: &str) -> BulkOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = sku_ids.iter().filter(|id| seen.insert(id.trim().to_string())).collect();
        let total = unique.len();
        let concurrency = self.ledger.config().bulk_concurrency.max(1);

        let jobs = unique.into_iter().enumerate().map(|(index, raw)| {
            let ledger = Arc::clone(&self.ledger);
            let mut request = request.clone();
            if !reason_template.trim().is_empty() {
                request.reason = render_reason(reason_template, raw.trim(), index + 1, total);
            }
            let raw = raw.clone();
            async move {
                let label = raw.clone();
                let result = tokio::task::spawn_blocking(move || -> Result<AdjustmentEntry, LedgerError> {
                    let sku_id = SkuId::new(raw).map_err(ValidationError::from)?;
                    ledger.adjust_on_hand_as(&sku_id, &request, ChangeType::Bulk)
                })
                .await
                .unwrap_or_else(|join_error| Err(LedgerError::Interrupted(join_error.to_string())));
                (label, result)
            }
        });

        let results: Vec<(String, Result<AdjustmentEntry, LedgerError>)> = stream::iter(jobs).buffered(concurrency).collect().await;

        let mut outcome = BulkOutcome::default();
        for (sku_id, result) in results {
            match result {
                Ok(entry) => outcome.applied.push(entry),
                Err(error) => {
                    warn!(sku = %sku_id, %error, "bulk adjustment failed");
                    outcome.failed.push(BulkFailure { sku_id, error });
                }
            }
        }
        info!(applied = outcome.applied.len(), failed = outcome.failed.len(), "bulk adjustment finished");
        outcome
    }

    /// Sets the reservation of every SKU in the snapshot. SKUs the snapshot
    /// does not mention keep their reservation: feeds may be paginated.
    /// Returns entries for the reservations that actually changed.
    pub fn reconcile_channel_snapshot(&self, channel: &Channel, allocations: &BTreeMap<SkuId, u32>) -> Vec<AdjustmentEntry> {
        let actor = format!("{channel}-sync");
        let entries: Vec<AdjustmentEntry> = allocations
            .iter()
            .filter_map(|(sku_id, &qty)| self.ledger.set_reservation(sku_id, channel.clone(), qty, &actor))
            .collect();
        info!(channel = %channel, skus = allocations.len(), changed = entries.len(), "channel allocations reconciled");
        entries
    }

    /// Validates a raw feed item by item, then reconciles the valid part.
    /// A feed with an unusable channel name is rejected whole.
    pub fn reconcile_feed(&self, feed: &ChannelFeed) -> Result<BulkOutcome, ValidationError> {
        let channel = Channel::new(feed.channel.clone()).map_err(|e| ValidationError::InvalidChannel(e.to_string()))?;

        let mut valid = BTreeMap::new();
        let mut failed = Vec::new();
        for (raw, &qty) in &feed.allocations {
            let parsed = SkuId::new(raw.clone()).map_err(ValidationError::from).and_then(|id| check_quantity(qty).map(|qty| (id, qty)));
            match parsed {
                Ok((sku_id, qty)) => { valid.insert(sku_id, qty); }
                Err(error) => {
                    warn!(channel = %channel, sku = %raw, %error, "rejected channel allocation");
                    failed.push(BulkFailure { sku_id: raw.clone(), error: error.into() });
                }
            }
        }
        Ok(BulkOutcome { applied: self.reconcile_channel_snapshot(&channel, &valid), failed })
    }
}

fn render_reason(template: &str, sku_id: &str, position: usize, total: usize) -> String {
    template.replace("{sku}", sku_id).replace("{n}", &position.to_string()).replace("{total}", &total.to_string())
}
