use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Upstream fines API --

/// A fine exactly as the marketplace API returns it.
///
/// Every field is optional on the wire; the reconciler decides what a usable
/// record needs. A field of the wrong type still fails, so entries are
/// decoded one at a time with [`RawRecord::from_entry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawRecord {
    /// Decode one element of the `data` array.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(entry)
    }
}

/// Body of `GET /api/v3/fines`. Readers keep `data` as untyped entries so a
/// single malformed row cannot fail the body; the mock upstream writes
/// `FinesResponse<RawRecord>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinesResponse<T = Value> {
    #[serde(default)]
    pub data: Vec<T>,
}

/// Body of the mock upstream's `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_accepts_numeric_amount() {
        let json = r#"{
            "id": "F1",
            "date": "2024-01-01T00:00:00Z",
            "type": "Late delivery",
            "amount": 1500,
            "status": "charged"
        }"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id.as_deref(), Some("F1"));
        assert_eq!(raw.kind.as_deref(), Some("Late delivery"));
        assert_eq!(raw.amount, Some(Decimal::from(1500)));
        assert!(raw.order_id.is_none());
    }

    #[test]
    fn raw_record_tolerates_missing_fields() {
        let body = r#"{"data": [{"id": "F2", "amount": 12.5}, {}]}"#;
        let resp: FinesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.len(), 2);
        let first = RawRecord::from_entry(&resp.data[0]).unwrap();
        assert_eq!(first.amount, Some(Decimal::new(125, 1)));
        assert!(first.status.is_none());
        assert_eq!(RawRecord::from_entry(&resp.data[1]).unwrap(), RawRecord::default());
    }

    #[test]
    fn wrong_typed_entry_fails_alone() {
        let body = r#"{"data": [
            {"id": "F1", "type": "Late delivery", "amount": 1500, "status": "charged"},
            {"id": "F2", "type": "Late delivery", "amount": "n/a", "status": "charged"},
            {"id": 3, "type": "Late delivery", "amount": 10, "status": "charged"}
        ]}"#;
        let resp: FinesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.len(), 3);

        let decoded: Vec<_> = resp.data.iter().map(RawRecord::from_entry).collect();
        assert_eq!(decoded[0].as_ref().unwrap().id.as_deref(), Some("F1"));
        assert!(decoded[1].is_err());
        assert!(decoded[2].is_err());
    }

    #[test]
    fn data_that_is_not_an_array_fails_the_body() {
        assert!(serde_json::from_str::<FinesResponse>(r#"{"data": {"id": "F1"}}"#).is_err());
    }

    #[test]
    fn fines_response_without_data_is_empty() {
        let resp: FinesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.data.is_empty());
    }
}
