//! Core operation types for list reads and single-record writes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::api::query::{FieldDef, FieldKind, FilterTerm, Page, QueryDescriptor, SortTerm};

/// Default identifier field of every object type
pub const DEFAULT_ID_FIELD: &str = "Id";

/// Shape of the records a list works on
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub collection: String,
    pub id_field: String,
    fields: Vec<FieldDef>,
}

impl RecordSchema {
    /// The id field is always projected; it is prepended when `fields` omits it
    pub fn new(collection: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::with_id_field(collection, DEFAULT_ID_FIELD, fields)
    }

    pub fn with_id_field(
        collection: impl Into<String>,
        id_field: impl Into<String>,
        mut fields: Vec<FieldDef>,
    ) -> Self {
        let id_field = id_field.into();
        if !fields.iter().any(|field| field.name == id_field) {
            fields.insert(0, FieldDef::new(id_field.clone(), FieldKind::String));
        }
        Self {
            collection: collection.into(),
            id_field,
            fields,
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Query for the list view's current state
    pub fn descriptor(&self, state: &ListState) -> QueryDescriptor {
        QueryDescriptor {
            collection: self.collection.clone(),
            fields: self.fields.clone(),
            filters: state.filters.clone(),
            sorters: state.sorters.clone(),
            page: state.page,
        }
    }
}

/// Filter, sort and paging state of a list view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    pub filters: Vec<FilterTerm>,
    pub sorters: Vec<SortTerm>,
    pub page: Option<Page>,
}

/// A record as held by a list view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Map<String, Value>,
    /// Fields changed since the record was loaded
    #[serde(default)]
    pub dirty: BTreeSet<String>,
}

impl Record {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            dirty: BTreeSet::new(),
        }
    }

    /// Record from a JSON object; anything else yields an empty record
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self::new(values),
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Change a field and mark it dirty
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.values.insert(field.clone(), value.into());
        self.dirty.insert(field);
    }

    /// Identifier as a string, if present and non-empty
    pub fn id(&self, id_field: &str) -> Option<String> {
        match self.values.get(id_field)? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Every field except the identifier
    pub fn without_id(&self, id_field: &str) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(name, _)| name.as_str() != id_field)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Changed fields only
    pub fn changes(&self) -> Map<String, Value> {
        self.dirty
            .iter()
            .filter_map(|name| self.values.get(name).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }
}

/// What a list asks of the remote side
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Fetch the list for its current state
    Read(ListState),
    /// Insert the given records
    Create(Vec<Record>),
    /// Write the dirty fields of the given records
    Update(Vec<Record>),
    /// Delete the given records
    Destroy(Vec<Record>),
}

impl Operation {
    /// Lower-case action name, as used in log lines and errors
    pub fn action(&self) -> &'static str {
        match self {
            Operation::Read(_) => "read",
            Operation::Create(_) => "create",
            Operation::Update(_) => "update",
            Operation::Destroy(_) => "destroy",
        }
    }

    /// Records carried by a write; a read carries none
    pub fn records(&self) -> &[Record] {
        match self {
            Operation::Read(_) => &[],
            Operation::Create(records)
            | Operation::Update(records)
            | Operation::Destroy(records) => records,
        }
    }
}

/// Records produced by one operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationResult {
    pub records: Vec<Record>,
    pub total_size: Option<u64>,
    pub done: bool,
    pub next_records_url: Option<String>,
}

impl OperationResult {
    pub fn single(record: Record) -> Self {
        Self {
            records: vec![record],
            total_size: Some(1),
            done: true,
            next_records_url: None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
