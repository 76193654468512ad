//! Record store boundary: where a query is turned into SQL or run.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use dashmap::DashMap;
use log::debug;
use parking_lot::RwLock;

use crate::query::Query;
use crate::schema::{Record, RecordDefinition};
use crate::types::Value;

/// Parameterized SQL plus its values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.parameters.is_empty() {
            write!(f, " [")?;
            for (i, parameter) in self.parameters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", parameter)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Something that owns record definitions and can answer queries.
pub trait RecordStore: Send + Sync {
    fn record_definition(&self, path: &str) -> Option<Arc<RecordDefinition>>;

    fn query(&self, query: &Query) -> Result<Vec<Record>>;
}

/// In-memory store that evaluates query conditions directly.
#[derive(Default)]
pub struct MemoryRecordStore {
    definitions: DashMap<String, Arc<RecordDefinition>>,
    records: DashMap<String, Arc<RwLock<Vec<Record>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_definition(&self, definition: Arc<RecordDefinition>) {
        let path = definition.path().to_string();
        debug!("Registering record definition {}", path);
        self.records.entry(path.clone()).or_default();
        self.definitions.insert(path, definition);
    }

    /// Stores `record` under its definition's path after validating it.
    pub fn insert(&self, record: Record) -> Result<()> {
        let path = record.definition().path().to_string();
        if !self.definitions.contains_key(&path) {
            bail!("No record definition registered for {}", path);
        }
        record.validate()?;
        let table = self.table(&path);
        table.write().push(record);
        Ok(())
    }

    pub fn len(&self, path: &str) -> usize {
        self.records.get(path).map(|table| table.read().len()).unwrap_or(0)
    }

    pub fn is_empty(&self, path: &str) -> bool {
        self.len(path) == 0
    }

    fn table(&self, path: &str) -> Arc<RwLock<Vec<Record>>> {
        Arc::clone(self.records.entry(path.to_string()).or_default().value())
    }
}

impl RecordStore for MemoryRecordStore {
    fn record_definition(&self, path: &str) -> Option<Arc<RecordDefinition>> {
        self.definitions.get(path).map(|entry| Arc::clone(entry.value()))
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let Some(definition) = self.record_definition(query.path()) else {
            bail!("No record definition registered for {}", query.path());
        };
        let bound;
        let query = match query.definition() {
            Some(_) => query,
            None => {
                bound = query.new_query(definition);
                &bound
            }
        };
        debug!("Running {}", query);
        let table = self.table(query.path());
        let records = table.read().clone();
        let matches = query.filter_records(records);

        match (query.type_name_alias(), query.definition()) {
            (Some(alias), Some(definition)) => {
                let renamed = Arc::new(definition.renamed(alias));
                Ok(matches
                    .into_iter()
                    .map(|record| Record::from_values(Arc::clone(&renamed), record.values().to_vec()))
                    .collect())
            }
            _ => Ok(matches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FilterBuilder;
    use crate::schema::FieldDefinition;
    use crate::types::DataType;

    fn store() -> (MemoryRecordStore, Arc<RecordDefinition>) {
        let definition = Arc::new(RecordDefinition::with_fields(
            "/TEST/CITY",
            [
                FieldDefinition::new("name", DataType::String).with_length(10),
                FieldDefinition::new("population", DataType::Long),
            ],
        ));
        let store = MemoryRecordStore::new();
        store.add_definition(Arc::clone(&definition));
        for (name, population) in [("Victoria", 92_000i64), ("Nelson", 11_000), ("Surrey", 568_000)] {
            let mut record = definition.new_record();
            record.set_value("name", name).unwrap();
            record.set_value("population", population).unwrap();
            store.insert(record).unwrap();
        }
        (store, definition)
    }

    #[test]
    fn test_query_unbound_path() {
        let (store, _) = store();
        let mut query = Query::new("/TEST/CITY");
        query.and(FilterBuilder::greater_than(
            FilterBuilder::column("population"),
            FilterBuilder::value("50000"),
        ));
        query.add_order_by("name", true);
        let names: Vec<Value> = store
            .query(&query)
            .unwrap()
            .iter()
            .map(|r| r.value("name").clone())
            .collect();
        assert_eq!(names, vec![Value::from("Surrey"), Value::from("Victoria")]);
    }

    #[test]
    fn test_type_name_alias_relabels_records() {
        let (store, definition) = store();
        let mut query = Query::for_definition(definition);
        query.set_type_name_alias(Some("/TEST/TOWN".to_string()));
        query.set_where("name = 'Nelson'").unwrap();
        let records = store.query(&query).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].definition().path(), "/TEST/TOWN");
        assert_eq!(records[0].value("population"), &Value::Long(11_000));
    }

    #[test]
    fn test_insert_validates() {
        let (store, definition) = store();
        let mut record = definition.new_record();
        record.set_value("name", "Port Coquitlam").unwrap();
        assert!(store.insert(record).is_err());
        assert_eq!(store.len("/TEST/CITY"), 3);
    }

    #[test]
    fn test_unknown_path() {
        let (store, _) = store();
        assert!(store.record_definition("/NOPE").is_none());
        assert!(store.query(&Query::new("/NOPE")).is_err());
        assert!(store.is_empty("/NOPE"));
    }

    #[test]
    fn test_statement_display() {
        let statement = SqlStatement {
            sql: "SELECT * FROM T WHERE a = ? AND b = ?".to_string(),
            parameters: vec![Value::Int(1), Value::from("x")],
        };
        assert_eq!(statement.to_string(), "SELECT * FROM T WHERE a = ? AND b = ? [1, 'x']");
    }
}
