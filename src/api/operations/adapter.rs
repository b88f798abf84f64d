//! List data adapter
//!
//! Serves a list view from the remote API: reads go through the query
//! encoder, writes go one record at a time since the API has no atomic
//! multi-record endpoint.

use serde_json::Value;

use super::operation::{ListState, Operation, OperationResult, Record, RecordSchema};
use crate::api::client::ForceClient;
use crate::api::constants;
use crate::api::error::RequestError;
use crate::api::query::QueryResponse;
use crate::api::request::RequestDescriptor;

#[derive(Clone)]
pub struct ListDataAdapter {
    client: ForceClient,
    schema: RecordSchema,
}

impl ListDataAdapter {
    pub fn new(client: ForceClient, schema: RecordSchema) -> Self {
        Self { client, schema }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub async fn execute(&self, operation: Operation) -> Result<OperationResult, RequestError> {
        let records = operation.records();
        if records.len() > 1 {
            log::warn!(
                "Rejecting {} of {} records, only one record can be handled at once",
                operation.action(),
                records.len()
            );
            return Err(RequestError::TooManyRecords {
                action: operation.action(),
                count: records.len(),
            });
        }

        match operation {
            Operation::Read(state) => self.read(&state).await,
            Operation::Create(records) => match records.into_iter().next() {
                Some(record) => self.create(record).await,
                None => Ok(OperationResult::default()),
            },
            Operation::Update(records) => match records.into_iter().next() {
                Some(record) => self.update(record).await,
                None => Ok(OperationResult::default()),
            },
            Operation::Destroy(records) => match records.into_iter().next() {
                Some(record) => self.destroy(record).await,
                None => Ok(OperationResult::default()),
            },
        }
    }

    /// Read one page of the list
    pub async fn read(&self, state: &ListState) -> Result<OperationResult, RequestError> {
        let statement = self.schema.descriptor(state).encode()?;
        let version = self.api_version().await;
        let descriptor = RequestDescriptor::get(constants::query_endpoint(&version, &statement));
        let response = self.client.send(descriptor).await?;
        unwrap_envelope(&response.body, &self.schema.id_field, None)
    }

    async fn create(&self, record: Record) -> Result<OperationResult, RequestError> {
        let version = self.api_version().await;
        let body = Value::Object(record.without_id(&self.schema.id_field));
        let path = constants::sobject_endpoint(&version, &self.schema.collection);
        let descriptor = RequestDescriptor::post(path, body);
        let response = self.client.send(descriptor).await?;
        unwrap_envelope(&response.body, &self.schema.id_field, None)
    }

    async fn update(&self, record: Record) -> Result<OperationResult, RequestError> {
        let id = self.require_id(&record, "update")?;
        let changes = record.changes();
        if changes.is_empty() {
            log::debug!("Record {} has no changed fields, nothing to update", id);
            return Ok(OperationResult::single(record));
        }

        let version = self.api_version().await;
        let descriptor = RequestDescriptor::post(
            constants::patch_endpoint(&version, &self.schema.collection, &id),
            Value::Object(changes),
        );
        let response = self.client.send(descriptor).await?;
        if response.body.is_null() {
            // 204: the record as written is the result
            let mut record = record;
            record.mark_clean();
            return Ok(OperationResult::single(record));
        }
        unwrap_envelope(&response.body, &self.schema.id_field, None)
    }

    async fn destroy(&self, record: Record) -> Result<OperationResult, RequestError> {
        let id = self.require_id(&record, "destroy")?;
        let version = self.api_version().await;
        let path = constants::record_endpoint(&version, &self.schema.collection, &id);
        let descriptor = RequestDescriptor::delete(path);
        let response = self.client.send(descriptor).await?;
        unwrap_envelope(&response.body, &self.schema.id_field, Some(id.as_str()))
    }

    fn require_id(&self, record: &Record, action: &str) -> Result<String, RequestError> {
        record.id(&self.schema.id_field).ok_or_else(|| {
            RequestError::Malformed(format!(
                "cannot {} a record without {}",
                action, self.schema.id_field
            ))
        })
    }

    async fn api_version(&self) -> String {
        self.client.session().get().await.api_version
    }
}

/// Records out of a response envelope
///
/// A query answer carries `records`; a create answers with the new `id`; a
/// successful destroy has no body, so the destroyed id stands in for it.
/// Any other body is returned as a single record.
pub fn unwrap_envelope(
    body: &Value,
    id_field: &str,
    destroyed_id: Option<&str>,
) -> Result<OperationResult, RequestError> {
    if body.get("records").is_some() {
        let response = QueryResponse::from_json(body)?;
        return Ok(OperationResult {
            records: response.records.into_iter().map(Record::from_value).collect(),
            total_size: response.total_size,
            done: response.done,
            next_records_url: response.next_records_url,
        });
    }

    if let Some(id) = body.get("id").and_then(|id| id.as_str()) {
        return Ok(OperationResult::single(id_record(id_field, id)));
    }

    if let Some(id) = destroyed_id {
        return Ok(OperationResult::single(id_record(id_field, id)));
    }

    match body {
        Value::Null => Ok(OperationResult {
            done: true,
            ..Default::default()
        }),
        other => Ok(OperationResult::single(Record::from_value(other.clone()))),
    }
}

fn id_record(id_field: &str, id: &str) -> Record {
    let mut values = serde_json::Map::new();
    values.insert(id_field.to_string(), Value::String(id.to_string()));
    Record::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_query_envelope() {
        let body = json!({
            "totalSize": 2,
            "done": true,
            "records": [{"Id": "003A", "Name": "Ann"}, {"Id": "003B", "Name": "Bo"}]
        });
        let result = unwrap_envelope(&body, "Id", None).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.total_size, Some(2));
        assert_eq!(result.records[1].get("Name"), Some(&json!("Bo")));
    }

    #[test]
    fn test_unwrap_created_id() {
        let body = json!({"id": "003C", "success": true, "errors": []});
        let result = unwrap_envelope(&body, "Id", None).unwrap();
        assert_eq!(result.records, vec![id_record("Id", "003C")]);
    }

    #[test]
    fn test_unwrap_destroy_confirmation() {
        let result = unwrap_envelope(&Value::Null, "Id", Some("003D")).unwrap();
        assert_eq!(result.records, vec![id_record("Id", "003D")]);
    }

    #[test]
    fn test_unwrap_other_bodies() {
        assert!(unwrap_envelope(&Value::Null, "Id", None).unwrap().is_empty());

        let result = unwrap_envelope(&json!({"Name": "Ann"}), "Id", None).unwrap();
        assert_eq!(result.records[0].get("Name"), Some(&json!("Ann")));
    }
}
