use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::types::Value;

/// Bidirectional lookup between stored identifiers and display values.
pub trait CodeTable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Identifier for a (possibly multi-part) display value. An identifier
    /// passed on its own resolves to itself.
    fn identifier(&self, values: &[Value]) -> Option<Value>;

    /// Display values for an identifier.
    fn values(&self, id: &Value) -> Option<Vec<Value>>;

    fn identifier_for(&self, value: &Value) -> Option<Value> {
        self.identifier(std::slice::from_ref(value))
    }

    /// First display value for an identifier.
    fn value(&self, id: &Value) -> Option<Value> {
        self.values(id).and_then(|values| values.into_iter().next())
    }
}

/// Code table held in memory, filled with [`MemoryCodeTable::add_code`].
///
/// Display values match case-insensitively and numeric ids match
/// regardless of integer width.
pub struct MemoryCodeTable {
    name: String,
    codes: RwLock<Codes>,
}

#[derive(Default)]
struct Codes {
    entries: Vec<(Value, Vec<Value>)>,
    by_id: HashMap<String, usize>,
    by_values: HashMap<String, usize>,
}

impl MemoryCodeTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            codes: RwLock::new(Codes::default()),
        }
    }

    /// Adds or replaces the code for `id`.
    pub fn add_code(&self, id: impl Into<Value>, values: Vec<Value>) {
        let id = id.into();
        let mut codes = self.codes.write();
        let id_key = lookup_key(std::slice::from_ref(&id));
        let values_key = lookup_key(&values);
        let existing = codes.by_id.get(&id_key).copied();
        let index = match existing {
            Some(index) => {
                let old_key = lookup_key(&codes.entries[index].1);
                codes.by_values.remove(&old_key);
                codes.entries[index] = (id, values);
                index
            }
            None => {
                codes.entries.push((id, values));
                codes.entries.len() - 1
            }
        };
        codes.by_id.insert(id_key, index);
        codes.by_values.insert(values_key, index);
    }

    pub fn len(&self) -> usize {
        self.codes.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn identifiers(&self) -> Vec<Value> {
        self.codes
            .read()
            .entries
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl CodeTable for MemoryCodeTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn identifier(&self, values: &[Value]) -> Option<Value> {
        if values.is_empty() || values.iter().all(Value::is_null) {
            return None;
        }
        let codes = self.codes.read();
        let key = lookup_key(values);
        if values.len() == 1 {
            if let Some(&index) = codes.by_id.get(&key) {
                return Some(codes.entries[index].0.clone());
            }
        }
        codes
            .by_values
            .get(&key)
            .map(|&index| codes.entries[index].0.clone())
    }

    fn values(&self, id: &Value) -> Option<Vec<Value>> {
        let codes = self.codes.read();
        codes
            .by_id
            .get(&lookup_key(std::slice::from_ref(id)))
            .map(|&index| codes.entries[index].1.clone())
    }
}

impl fmt::Debug for MemoryCodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCodeTable")
            .field("name", &self.name)
            .field("codes", &self.len())
            .finish()
    }
}

fn lookup_key(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| match value.to_decimal() {
            Some(decimal) => decimal.normalize().to_string(),
            None => value.to_plain_string().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_codes() -> MemoryCodeTable {
        let table = MemoryCodeTable::new("STATUS_CODE");
        table.add_code(1, vec![Value::from("Active")]);
        table.add_code(2, vec![Value::from("Retired")]);
        table
    }

    #[test]
    fn test_lookup_both_directions() {
        let table = status_codes();
        assert_eq!(table.identifier_for(&Value::from("Active")), Some(Value::Int(1)));
        assert_eq!(table.value(&Value::Int(2)), Some(Value::from("Retired")));
        assert_eq!(table.identifier_for(&Value::from("Missing")), None);
    }

    #[test]
    fn test_case_insensitive_and_width_independent() {
        let table = status_codes();
        assert_eq!(table.identifier_for(&Value::from("ACTIVE")), Some(Value::Int(1)));
        assert_eq!(table.value(&Value::Long(1)), Some(Value::from("Active")));
    }

    #[test]
    fn test_identifier_resolves_to_itself() {
        let table = status_codes();
        assert_eq!(table.identifier_for(&Value::Long(2)), Some(Value::Int(2)));
        assert_eq!(table.identifier_for(&Value::from("2")), Some(Value::Int(2)));
    }

    #[test]
    fn test_multi_part_values() {
        let table = MemoryCodeTable::new("REGION");
        table.add_code(10, vec![Value::from("BC"), Value::from("North")]);
        let id = table.identifier(&[Value::from("bc"), Value::from("north")]);
        assert_eq!(id, Some(Value::Int(10)));
    }

    #[test]
    fn test_add_code_replaces_existing() {
        let table = status_codes();
        table.add_code(1, vec![Value::from("Enabled")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.identifier_for(&Value::from("Active")), None);
        assert_eq!(table.identifier_for(&Value::from("enabled")), Some(Value::Int(1)));
    }
}
