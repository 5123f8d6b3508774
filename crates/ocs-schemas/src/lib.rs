//! Canonical order entity shared by the store, the cache and the bus.
//!
//! Field names match the JSON published on the `order` subject exactly, so
//! the serde derives are the wire encoding. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Payload is not a well-formed order document.
    #[error("order payload decode failed: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("order encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    /// The order cannot be keyed.
    #[error("order_uid is empty")]
    EmptyOrderUid,
}

// ---------------------------------------------------------------------------
// OrderRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Upstream-assigned identifier. Never generated or rewritten here.
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Amounts are integer minor units; `payment_dt` is epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// Sale percentage.
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

impl OrderRecord {
    /// Decode a bus payload. Unknown fields are ignored, missing ones are not.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(ModelError::Decode)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(ModelError::Encode)
    }

    /// Decode and reject orders that cannot be keyed.
    pub fn from_json_validated(bytes: &[u8]) -> Result<Self, ModelError> {
        let order = Self::from_json(bytes)?;
        order.validate()?;
        Ok(order)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.order_uid.trim().is_empty() {
            return Err(ModelError::EmptyOrderUid);
        }
        Ok(())
    }

    /// Representation stored in the lookup cache and shown to operators.
    pub fn render(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(ModelError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> OrderRecord {
        OrderRecord {
            order_uid: "b563feb7b2b84b6test".to_string(),
            track_number: "WBILMTESTTRACK".to_string(),
            entry: "WBIL".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                transaction: "b563feb7b2b84b6test".to_string(),
                request_id: String::new(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817,
                payment_dt: 1637907727,
                bank: "alpha".to_string(),
                delivery_cost: 1500,
                goods_total: 317,
                custom_fee: 0,
            },
            items: vec![Item {
                chrt_id: 9934930,
                track_number: "WBILMTESTTRACK".to_string(),
                price: 453,
                rid: "ab4219087a764ae0btest".to_string(),
                name: "Mascaras".to_string(),
                sale: 30,
                size: "0".to_string(),
                total_price: 317,
                nm_id: 2389212,
                brand: "Vivienne Sabo".to_string(),
                status: 202,
            }],
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
            oof_shard: "1".to_string(),
        }
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let order = sample();
        let bytes = order.to_json().unwrap();
        let back = OrderRecord::from_json(&bytes).unwrap();
        assert_eq!(back, order);
        assert_eq!(back.items[0].brand, "Vivienne Sabo");
        assert_eq!(back.payment.delivery_cost, 1500);
    }

    #[test]
    fn decode_accepts_offset_timestamps_and_normalizes_to_utc() {
        let mut v = serde_json::to_value(sample()).unwrap();
        v["date_created"] = serde_json::json!("2021-11-26T09:22:19+03:00");
        let order = OrderRecord::from_json(v.to_string().as_bytes()).unwrap();
        assert_eq!(order.date_created, sample().date_created);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let mut v = serde_json::to_value(sample()).unwrap();
        v["extra_field"] = serde_json::json!("ignored");
        assert!(OrderRecord::from_json(v.to_string().as_bytes()).is_ok());
    }

    #[test]
    fn decode_rejects_missing_fields_and_garbage() {
        let mut v = serde_json::to_value(sample()).unwrap();
        v.as_object_mut().unwrap().remove("payment");
        assert!(matches!(
            OrderRecord::from_json(v.to_string().as_bytes()),
            Err(ModelError::Decode(_))
        ));
        assert!(matches!(
            OrderRecord::from_json(b"not json"),
            Err(ModelError::Decode(_))
        ));
    }

    #[test]
    fn blank_order_uid_fails_validation() {
        let mut order = sample();
        order.order_uid = "   ".to_string();
        let bytes = order.to_json().unwrap();
        assert!(matches!(
            OrderRecord::from_json_validated(&bytes),
            Err(ModelError::EmptyOrderUid)
        ));
    }

    #[test]
    fn render_is_json_carrying_the_identifier() {
        let rendered = sample().render().unwrap();
        assert!(rendered.contains("\"order_uid\": \"b563feb7b2b84b6test\""));
        let back: OrderRecord = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back, sample());
    }
}
