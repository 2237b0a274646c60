use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::field_value::FieldValue;

/// Field name that reads and writes the record id.
pub const ID_FIELD: &str = "id";
/// Field name that reads and writes the soft-delete flag.
pub const DELETED_FIELD: &str = "deleted";

/// A persisted CRM entity: a module (record type), an id chosen by the
/// caller, named scalar fields and a soft-delete flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub module: String,
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub deleted: bool,
    /// Set on records built in memory for an id that has no row yet.
    pub new_with_id: bool,
}

impl Record {
    /// A record with no backing row. Saving it always creates the row.
    pub fn new_with_id(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            id: id.into(),
            fields: BTreeMap::new(),
            deleted: false,
            new_with_id: true,
        }
    }

    /// A record hydrated from an existing row.
    pub fn existing(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            new_with_id: false,
            ..Self::new_with_id(module, id)
        }
    }

    #[cfg(test)]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(&name.into(), value.into());
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Reads a field by name. Unset fields read as `Null`.
    pub fn get(&self, name: &str) -> FieldValue {
        match name {
            ID_FIELD => FieldValue::String(self.id.clone()),
            DELETED_FIELD => FieldValue::from(i64::from(self.deleted)),
            _ => self.fields.get(name).cloned().unwrap_or(FieldValue::Null),
        }
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        match name {
            ID_FIELD => self.id = value.to_string(),
            DELETED_FIELD => self.deleted = value.is_truthy(),
            _ => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }

    /// The record as a definition document: `id` followed by every field.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (name, value) in &self.fields {
            doc.insert(name.clone(), value.to_json());
        }
        doc
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with id {}", self.module, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_with_id_is_marked_new() {
        let record = Record::new_with_id("WorkFlow", "wf-1");
        assert!(record.new_with_id);
        assert!(!record.deleted);
        assert!(record.fields.is_empty());

        let existing = Record::existing("WorkFlow", "wf-1");
        assert!(!existing.new_with_id);
    }

    #[test]
    fn test_unset_field_reads_null() {
        let record = Record::existing("WorkFlow", "wf-1");
        assert_eq!(record.get("name"), FieldValue::Null);
    }

    #[test]
    fn test_reserved_fields() {
        let mut record = Record::existing("WorkFlow", "wf-1").with_deleted(true);
        assert_eq!(record.get("id"), FieldValue::from("wf-1"));
        assert!(record.get("deleted").loose_eq(&FieldValue::from(1)));

        record.set("deleted", FieldValue::from(0));
        assert!(!record.deleted);
        assert!(!record.fields.contains_key("deleted"));
    }

    #[test]
    fn test_to_document() {
        let record = Record::existing("WorkFlow", "wf-1")
            .with_field("name", "Escalate")
            .with_field("status", true);

        let doc = record.to_document();
        assert_eq!(
            Value::Object(doc),
            json!({"id": "wf-1", "name": "Escalate", "status": true})
        );
    }

    #[test]
    fn test_display() {
        let record = Record::existing("WorkFlowAlertShells", "a-1");
        assert_eq!(record.to_string(), "WorkFlowAlertShells with id a-1");
    }
}
