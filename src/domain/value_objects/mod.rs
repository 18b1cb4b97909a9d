//! Value Objects for variants and inventory

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Catalog ids arrive as strings or as integer keys; both normalize to text.
#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId { Text(String), Number(i64) }

impl From<OpaqueId> for String {
    fn from(id: OpaqueId) -> Self {
        match id { OpaqueId::Text(s) => s, OpaqueId::Number(n) => n.to_string() }
    }
}

/// SKU (Stock Keeping Unit) identifier. Opaque: trimmed, never case-folded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "OpaqueId")]
pub struct SkuId(String);

impl SkuId {
    pub const MAX_LEN: usize = 64;

    pub fn new(value: impl Into<String>) -> Result<Self, SkuIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SkuIdError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(SkuIdError::TooLong(value.len())); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<OpaqueId> for SkuId {
    type Error = SkuIdError;
    fn try_from(id: OpaqueId) -> Result<Self, Self::Error> { Self::new(String::from(id)) }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuIdError {
    #[error("SKU id is empty")]
    Empty,
    #[error("SKU id is {0} bytes, limit is 64")]
    TooLong(usize),
}

/// Id of one admissible value within a dimension. Unique per `(dimension, id)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "OpaqueId")]
pub struct ValueId(String);

impl ValueId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<OpaqueId> for ValueId {
    fn from(id: OpaqueId) -> Self { Self(id.into()) }
}

impl From<&str> for ValueId {
    fn from(value: &str) -> Self { Self(value.to_string()) }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// External sales channel holding reservations against on-hand stock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Result<Self, ChannelError> {
        let name = name.into().trim().to_lowercase();
        if name.is_empty() { return Err(ChannelError::Empty); }
        Ok(Self(name))
    }
    pub fn tiktok() -> Self { Self("tiktok".into()) }
    pub fn amazon() -> Self { Self("amazon".into()) }
    pub fn etsy() -> Self { Self("etsy".into()) }
    pub fn walmart() -> Self { Self("walmart".into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Channel {
    type Error = ChannelError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self { channel.0 }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel name is empty")]
    Empty,
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

/// Product image, resolved once from whatever shape the catalog sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef { pub url: String, pub is_primary: bool }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_id_is_trimmed_not_case_folded() {
        let sku = SkuId::new("  tee-red-s ").unwrap();
        assert_eq!(sku.as_str(), "tee-red-s");
        assert_eq!(SkuId::new("   "), Err(SkuIdError::Empty));
        assert!(matches!(SkuId::new("x".repeat(65)), Err(SkuIdError::TooLong(65))));
    }

    #[test]
    fn test_ids_accept_numbers() {
        let sku: SkuId = serde_json::from_str("1042").unwrap();
        assert_eq!(sku.as_str(), "1042");
        let value: ValueId = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(value, ValueId::from("red"));
        assert!(serde_json::from_str::<SkuId>("\"\"").is_err());
    }

    #[test]
    fn test_channel_normalized() {
        assert_eq!(Channel::new(" TikTok ").unwrap(), Channel::tiktok());
        assert!(Channel::new("").is_err());
        let json = serde_json::to_string(&Channel::amazon()).unwrap();
        assert_eq!(json, "\"amazon\"");
    }

    #[test]
    fn test_money() {
        let m = Money::usd(Decimal::new(1999, 2));
        assert_eq!(m.currency(), "USD");
        assert_eq!(m.amount(), Decimal::new(1999, 2));
        assert_eq!(Money::default().amount(), Decimal::ZERO);
    }
}
