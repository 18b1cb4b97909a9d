//! Adjustment requests and the append-only audit entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{Channel, SkuId, SkuIdError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode { Set, Add, Subtract }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType { Manual, ChannelSync, Bulk }

/// Which quantity of the record an entry changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentTarget {
    OnHand,
    OnOrder,
    ReorderThreshold,
    Reservation { channel: Channel },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("value {0} is not a whole number")]
    NotNumeric(String),
    #[error("value {0} is negative")]
    Negative(i64),
    #[error("value {0} is out of range")]
    OutOfRange(String),
    #[error("invalid SKU id: {0}")]
    InvalidSkuId(#[from] SkuIdError),
    #[error("invalid channel: {0}")]
    InvalidChannel(String),
    #[error("invalid fields: {0}")]
    Fields(String),
}

/// Adjustment as received from a collaborator. `value` stays raw JSON until
/// validated so that form input such as `"12"` or `"abc"` reaches the core.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct AdjustmentRequest {
    pub mode: AdjustMode,
    pub value: Value,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: String,
    #[validate(length(min = 1, max = 128))]
    pub actor: String,
}

impl AdjustmentRequest {
    pub fn new(mode: AdjustMode, value: impl Into<Value>, actor: impl Into<String>) -> Self {
        Self { mode, value: value.into(), reason: String::new(), actor: actor.into() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn validated(&self) -> Result<Adjustment, ValidationError> {
        self.validate().map_err(|e| ValidationError::Fields(e.to_string()))?;
        let actor = self.actor.trim();
        if actor.is_empty() { return Err(ValidationError::Fields("actor: blank".into())); }
        Ok(Adjustment {
            mode: self.mode,
            value: parse_quantity(&self.value)?,
            reason: self.reason.trim().to_string(),
            actor: actor.to_string(),
        })
    }
}

/// A validated on-hand adjustment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment { pub mode: AdjustMode, pub value: u32, pub reason: String, pub actor: String }

/// Accepts JSON integers and numeric strings; negatives are rejected for every mode.
pub fn parse_quantity(value: &Value) -> Result<u32, ValidationError> {
    let parsed = match value {
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i,
            (None, Some(u)) => return Err(ValidationError::OutOfRange(u.to_string())),
            (None, None) => return Err(ValidationError::NotNumeric(n.to_string())),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| ValidationError::NotNumeric(s.clone()))?,
        other => return Err(ValidationError::NotNumeric(other.to_string())),
    };
    check_quantity(parsed)
}

pub fn check_quantity(value: i64) -> Result<u32, ValidationError> {
    if value < 0 { return Err(ValidationError::Negative(value)); }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange(value.to_string()))
}

/// Audit trail entry. Written once per ledger mutation, never edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    pub id: Uuid,
    pub sku_id: SkuId,
    pub target: AdjustmentTarget,
    pub change_type: ChangeType,
    pub mode: AdjustMode,
    pub requested: u32,
    pub previous_qty: u32,
    pub delta_applied: i64,
    pub resulting_qty: u32,
    pub resulting_qty_on_hand: u32,
    pub reason: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl AdjustmentEntry {
    /// Net change of the adjusted quantity, as the history screen shows it.
    pub fn quantity_change(&self) -> i64 { i64::from(self.resulting_qty) - i64::from(self.previous_qty) }

    /// True when a subtract removed less than was asked for.
    pub fn was_clamped(&self) -> bool {
        self.mode == AdjustMode::Subtract && self.delta_applied != -i64::from(self.requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!(12)), Ok(12));
        assert_eq!(parse_quantity(&json!(" 7 ")), Ok(7));
        assert_eq!(parse_quantity(&json!(-1)), Err(ValidationError::Negative(-1)));
        assert_eq!(parse_quantity(&json!("-3")), Err(ValidationError::Negative(-3)));
        assert!(matches!(parse_quantity(&json!("abc")), Err(ValidationError::NotNumeric(_))));
        assert!(matches!(parse_quantity(&json!("")), Err(ValidationError::NotNumeric(_))));
        assert!(matches!(parse_quantity(&json!(2.5)), Err(ValidationError::NotNumeric(_))));
        assert!(matches!(parse_quantity(&json!(null)), Err(ValidationError::NotNumeric(_))));
        assert!(matches!(parse_quantity(&json!(5_000_000_000i64)), Err(ValidationError::OutOfRange(_))));
        assert!(matches!(parse_quantity(&json!(u64::MAX)), Err(ValidationError::OutOfRange(_))));
    }

    #[test]
    fn test_request_requires_actor() {
        let request = AdjustmentRequest::new(AdjustMode::Add, 3, "");
        assert!(matches!(request.validated(), Err(ValidationError::Fields(_))));
        let request = AdjustmentRequest::new(AdjustMode::Add, 3, "ops").with_reason("x".repeat(501));
        assert!(matches!(request.validated(), Err(ValidationError::Fields(_))));
    }

    #[test]
    fn test_request_from_form_json() {
        let request: AdjustmentRequest =
            serde_json::from_value(json!({"mode": "subtract", "value": "4", "actor": "vendor-9"})).unwrap();
        let adjustment = request.validated().unwrap();
        assert_eq!(adjustment.mode, AdjustMode::Subtract);
        assert_eq!(adjustment.value, 4);
        assert_eq!(adjustment.reason, "");
        assert!(serde_json::from_value::<AdjustmentRequest>(json!({"mode": "multiply", "value": 1, "actor": "a"})).is_err());
    }

    #[test]
    fn test_quantity_change_follows_clamp() {
        let entry = AdjustmentEntry {
            id: Uuid::now_v7(),
            sku_id: SkuId::new("TEE-1").unwrap(),
            target: AdjustmentTarget::OnHand,
            change_type: ChangeType::Manual,
            mode: AdjustMode::Subtract,
            requested: 8,
            previous_qty: 2,
            delta_applied: -2,
            resulting_qty: 0,
            resulting_qty_on_hand: 0,
            reason: "Manual adjustment".into(),
            actor: "ops".into(),
            timestamp: Utc::now(),
        };
        assert_eq!(entry.quantity_change(), -2);
        assert!(entry.was_clamped());
    }

    #[test]
    fn test_target_json() {
        let json = serde_json::to_value(AdjustmentTarget::Reservation { channel: Channel::etsy() }).unwrap();
        assert_eq!(json, json!({"kind": "reservation", "channel": "etsy"}));
        assert_eq!(serde_json::to_value(ChangeType::ChannelSync).unwrap(), json!("channel_sync"));
    }
}
