//! Query result handling

use serde_json::Value;

use crate::api::error::RequestError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub records: Vec<Value>,
    pub total_size: Option<u64>,
    pub done: bool,
    /// Relative URL of the next batch when `done` is false
    pub next_records_url: Option<String>,
}

impl QueryResponse {
    /// Parse the `{totalSize, done, records, nextRecordsUrl}` envelope
    pub fn from_json(json: &Value) -> Result<Self, RequestError> {
        let records = json
            .get("records")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                RequestError::Decode("missing or invalid 'records' array in response".to_string())
            })?
            .clone();

        let total_size = json.get("totalSize").and_then(|t| t.as_u64());

        let next_records_url = json
            .get("nextRecordsUrl")
            .and_then(|n| n.as_str())
            .map(|s| s.to_string());

        let done = json
            .get("done")
            .and_then(|d| d.as_bool())
            .unwrap_or(next_records_url.is_none());

        Ok(Self {
            records,
            total_size,
            done,
            next_records_url,
        })
    }

    pub fn has_more(&self) -> bool {
        !self.done && self.next_records_url.is_some()
    }

    pub fn first(&self) -> Option<&Value> {
        self.records.first()
    }

    /// Get a specific field from all records
    pub fn field_values(&self, field_name: &str) -> Vec<Option<&Value>> {
        self.records.iter().map(|record| record.get(field_name)).collect()
    }
}
