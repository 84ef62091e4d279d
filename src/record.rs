//! Records produced for the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::Exchange;

/// Links a record back to the input item it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One output record: a JSON object, optionally paired with its input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<PairedItem>,
}

impl OutputRecord {
    pub fn new(json: Map<String, Value>) -> Self {
        Self {
            json,
            paired_item: None,
        }
    }

    /// Record for a payload, with the raw exchange attached when given.
    ///
    /// Objects are used as-is, `null` becomes an empty object and any other
    /// value is wrapped as `{"data": value}`.
    pub fn from_payload(payload: Value, raw: Option<&Exchange>) -> Self {
        let mut json = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        if let Some(exchange) = raw {
            json.insert("raw_request".to_string(), exchange.request.clone());
            json.insert("raw_response".to_string(), exchange.response.clone());
        }

        Self::new(json)
    }

    /// In-band error record emitted when failures are collected.
    pub fn error(message: String, item_index: usize) -> Self {
        let mut json = Map::new();
        json.insert("error".to_string(), Value::String(message));
        Self {
            json,
            paired_item: Some(PairedItem { item: item_index }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange() -> Exchange {
        Exchange {
            response: json!({"id": "INV2-1"}),
            request: json!({"method": "GET", "url": "https://api.paypal.com/x", "headers": {}}),
        }
    }

    #[test]
    fn test_from_payload_object() {
        let record = OutputRecord::from_payload(json!({"id": "INV2-1", "status": "SENT"}), None);
        assert_eq!(Value::Object(record.json), json!({"id": "INV2-1", "status": "SENT"}));
        assert_eq!(record.paired_item, None);
    }

    #[test]
    fn test_from_payload_with_raw_data() {
        let record = OutputRecord::from_payload(json!({"id": "INV2-1"}), Some(&exchange()));
        assert_eq!(record.json["raw_response"], json!({"id": "INV2-1"}));
        assert_eq!(record.json["raw_request"]["method"], "GET");
    }

    #[test]
    fn test_from_payload_non_object() {
        let record = OutputRecord::from_payload(Value::Null, None);
        assert!(record.json.is_empty());

        let record = OutputRecord::from_payload(json!("accepted"), None);
        assert_eq!(record.json["data"], "accepted");
    }

    #[test]
    fn test_error_record_serialization() {
        let record = OutputRecord::error("boom".into(), 4);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"json": {"error": "boom"}, "pairedItem": {"item": 4}})
        );
    }
}
