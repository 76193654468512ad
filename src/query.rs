//! Query: a condition tree plus projection, ordering and paging over one
//! record definition.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::ExpressionResult;
use crate::expression::{self, quote_name, FilterBuilder, QueryValue, QueryValueRef};
use crate::geometry::BoundingBox;
use crate::schema::{FieldDefinition, Record, RecordDefinition};
use crate::sql::parse_where;
use crate::store::SqlStatement;
use crate::types::{compare_values, Value};

/// Row locking requested for the selected records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    #[default]
    None,
    Share,
    Update,
}

impl LockMode {
    fn sql_suffix(&self) -> &'static str {
        match self {
            LockMode::None => "",
            LockMode::Share => " FOR SHARE",
            LockMode::Update => " FOR UPDATE",
        }
    }
}

/// A select against one record definition.
///
/// The condition is never absent; the always-true marker stands in for
/// "no filter". Conditions added while a definition is bound are resolved
/// against it.
#[derive(Debug)]
pub struct Query {
    path: String,
    definition: Option<Arc<RecordDefinition>>,
    field_names: Vec<String>,
    condition: QueryValueRef,
    order_by: Vec<(String, bool)>,
    limit: Option<usize>,
    offset: usize,
    lock_mode: LockMode,
    distinct: bool,
    from_clause: Option<String>,
    sql: Option<String>,
    parameters: Vec<Value>,
    type_name_alias: Option<String>,
}

impl Query {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            definition: None,
            field_names: Vec::new(),
            condition: FilterBuilder::all(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            lock_mode: LockMode::None,
            distinct: false,
            from_clause: None,
            sql: None,
            parameters: Vec::new(),
            type_name_alias: None,
        }
    }

    /// Unfiltered query on `path` sorted ascending by `names`.
    pub fn order_by<S: Into<String>>(path: impl Into<String>, names: impl IntoIterator<Item = S>) -> Self {
        let mut query = Self::new(path);
        query.set_order_by_field_names(names);
        query
    }

    pub fn for_definition(definition: Arc<RecordDefinition>) -> Self {
        let mut query = Self::new(definition.path());
        query.definition = Some(definition);
        query
    }

    /// `name = value` with the value coerced through the field; `None` when
    /// the definition has no such field.
    pub fn equal(definition: &Arc<RecordDefinition>, name: &str, value: impl Into<Value>) -> Option<Self> {
        let field = definition.field(name)?;
        let mut query = Self::for_definition(Arc::clone(definition));
        query.condition = FilterBuilder::field_equals(field, value);
        Some(query)
    }

    /// Envelope intersection with the primary geometry field; `None` when
    /// the definition has no geometry field.
    pub fn intersects(definition: &Arc<RecordDefinition>, bbox: BoundingBox) -> Option<Self> {
        let field = definition.geometry_field()?;
        let mut query = Self::for_definition(Arc::clone(definition));
        query.condition = FilterBuilder::envelope_intersects(FilterBuilder::field(field), FilterBuilder::value(bbox));
        Some(query)
    }

    /// Conjunction of name/value conditions; see [`FilterBuilder::name_value`].
    pub fn and_filter<S: AsRef<str>>(
        definition: &Arc<RecordDefinition>,
        filter: impl IntoIterator<Item = (S, Value)>,
    ) -> Self {
        let mut query = Self::for_definition(Arc::clone(definition));
        query.condition = FilterBuilder::and_map(Some(definition.as_ref()), filter);
        query
    }

    /// Disjunction of name/value conditions; see [`FilterBuilder::name_value`].
    pub fn or_filter<S: AsRef<str>>(
        definition: &Arc<RecordDefinition>,
        filter: impl IntoIterator<Item = (S, Value)>,
    ) -> Self {
        let mut query = Self::for_definition(Arc::clone(definition));
        query.condition = FilterBuilder::or_map(Some(definition.as_ref()), filter);
        query
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn definition(&self) -> Option<&Arc<RecordDefinition>> {
        self.definition.as_ref()
    }

    /// Binds this query, and its condition, to `definition`.
    pub fn set_definition(&mut self, definition: Arc<RecordDefinition>) -> &mut Self {
        self.path = definition.path().to_string();
        debug!("Binding query to {}", definition.path());
        self.condition = self.condition.bind(&definition);
        self.definition = Some(definition);
        self
    }

    /// Copy of this query re-bound to `definition`; this query is untouched.
    pub fn new_query(&self, definition: Arc<RecordDefinition>) -> Self {
        let mut query = self.clone();
        query.set_definition(definition);
        query
    }

    pub fn where_condition(&self) -> &QueryValueRef {
        &self.condition
    }

    pub fn set_where_condition(&mut self, condition: QueryValueRef) -> &mut Self {
        self.condition = self.bind(condition);
        self
    }

    /// Parses `clause` against the bound definition.
    pub fn set_where(&mut self, clause: &str) -> ExpressionResult<&mut Self> {
        let condition = parse_where(self.definition.as_deref(), clause)?;
        self.condition = condition;
        Ok(self)
    }

    /// ANDs `condition` onto the current one, appending to an existing
    /// conjunction instead of nesting.
    pub fn and(&mut self, condition: QueryValueRef) -> &mut Self {
        let condition = self.bind(condition);
        let current = std::mem::replace(&mut self.condition, FilterBuilder::all());
        self.condition = expression::and(current, condition);
        self
    }

    /// ORs `condition` onto the current one, appending to an existing
    /// disjunction instead of nesting.
    pub fn or(&mut self, condition: QueryValueRef) -> &mut Self {
        let condition = self.bind(condition);
        let current = std::mem::replace(&mut self.condition, FilterBuilder::all());
        self.condition = expression::or(current, condition);
        self
    }

    fn bind(&self, condition: QueryValueRef) -> QueryValueRef {
        match &self.definition {
            Some(definition) => condition.bind(definition),
            None => condition,
        }
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Adds a projected field; names already present are ignored.
    pub fn add_field_name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.field_names.contains(&name) {
            self.field_names.push(name);
        }
        self
    }

    pub fn set_field_names<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        self.field_names.clear();
        for name in names {
            self.add_field_name(name);
        }
        self
    }

    /// Projected fields of the bound definition; all of them when no names
    /// were given or for `*`. Names the definition lacks are skipped.
    pub fn fields(&self) -> Vec<Arc<FieldDefinition>> {
        let Some(definition) = &self.definition else {
            return Vec::new();
        };
        if self.field_names.is_empty() {
            return definition.fields().to_vec();
        }
        let mut fields = Vec::new();
        for name in &self.field_names {
            if name == "*" {
                fields.extend(definition.fields().iter().cloned());
            } else if let Some(field) = definition.field(name) {
                fields.push(Arc::clone(field));
            } else {
                debug!("Skipping unknown field {} for {}", name, definition.path());
            }
        }
        fields
    }

    pub fn order_by_fields(&self) -> &[(String, bool)] {
        &self.order_by
    }

    /// Replaces the sort keys with `names`, all ascending.
    pub fn set_order_by_field_names<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        self.order_by.clear();
        for name in names {
            self.add_order_by(name, true);
        }
        self
    }

    /// Adds a sort key; adding a name again updates its direction in place.
    pub fn add_order_by(&mut self, name: impl Into<String>, ascending: bool) -> &mut Self {
        let name = name.into();
        match self.order_by.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = ascending,
            None => self.order_by.push((name, ascending)),
        }
        self
    }

    /// Orders by every id field, ascending.
    pub fn add_order_by_id(&mut self) -> &mut Self {
        let names: Vec<String> = match &self.definition {
            Some(definition) => definition
                .id_fields()
                .iter()
                .map(|field| field.name().to_string())
                .collect(),
            None => Vec::new(),
        };
        for name in names {
            self.add_order_by(name, true);
        }
        self
    }

    pub fn clear_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// `None` means unlimited.
    pub fn set_limit(&mut self, limit: Option<usize>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    pub fn set_lock_mode(&mut self, lock_mode: LockMode) -> &mut Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    /// Table expression used in place of the table name after FROM.
    pub fn from_clause(&self) -> Option<&str> {
        self.from_clause.as_deref()
    }

    pub fn set_from_clause(&mut self, from_clause: Option<String>) -> &mut Self {
        self.from_clause = from_clause;
        self
    }

    /// Explicit statement text used instead of the generated select.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn set_sql(&mut self, sql: Option<String>) -> &mut Self {
        self.sql = sql;
        self
    }

    /// Values bound ahead of the condition's parameters, for placeholders
    /// in explicit SQL or a FROM clause.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parameters.push(value.into());
        self
    }

    /// Path the returned records are labelled with instead of this
    /// query's path.
    pub fn type_name_alias(&self) -> Option<&str> {
        self.type_name_alias.as_deref()
    }

    pub fn set_type_name_alias(&mut self, alias: Option<String>) -> &mut Self {
        self.type_name_alias = alias;
        self
    }

    /// Full parameterized select statement for this query.
    ///
    /// Explicit SQL is used as given, with `SELECT * FROM` expanded to the
    /// column list and the ORDER BY keys appended.
    pub fn select_sql(&self) -> String {
        if let Some(explicit) = &self.sql {
            return self.explicit_sql(explicit);
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.column_list());
        sql.push_str(" FROM ");
        match &self.from_clause {
            Some(from_clause) => sql.push_str(from_clause),
            None => sql.push_str(&qualified_table_name(&self.path)),
        }

        if !self.condition.is_empty_condition() {
            sql.push_str(" WHERE ");
            self.condition.render_to(&mut sql);
        }
        self.push_order_by(&mut sql);

        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql.push_str(self.lock_mode.sql_suffix());
        sql
    }

    fn explicit_sql(&self, explicit: &str) -> String {
        const SELECT_ALL: &str = "SELECT * FROM ";
        let mut sql = match explicit.get(..SELECT_ALL.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(SELECT_ALL) => {
                format!("SELECT {} FROM {}", self.column_list(), &explicit[SELECT_ALL.len()..])
            }
            _ => explicit.to_string(),
        };
        self.push_order_by(&mut sql);
        sql
    }

    fn push_order_by(&self, sql: &mut String) {
        if self.order_by.is_empty() {
            return;
        }
        let keys: Vec<String> = self
            .order_by
            .iter()
            .map(|(name, ascending)| {
                if *ascending {
                    quote_name(name).into_owned()
                } else {
                    format!("{} DESC", quote_name(name))
                }
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    fn column_list(&self) -> String {
        let all_fields = || match &self.definition {
            Some(definition) if definition.field_count() > 0 => definition
                .field_names()
                .into_iter()
                .map(|name| quote_name(name).into_owned())
                .collect::<Vec<_>>(),
            _ => vec!["*".to_string()],
        };
        if self.field_names.is_empty() {
            return all_fields().join(", ");
        }
        let mut columns = Vec::new();
        for name in &self.field_names {
            if name == "*" {
                columns.extend(all_fields());
            } else {
                columns.push(quote_name(name).into_owned());
            }
        }
        columns.join(", ")
    }

    /// Select statement with its parameters in placeholder order: the
    /// added parameters, then the condition's.
    pub fn sql_statement(&self) -> SqlStatement {
        let mut parameters = self.parameters.clone();
        if self.sql.is_none() {
            self.condition.bind_parameters(parameters.len() + 1, &mut parameters);
        }
        SqlStatement {
            sql: self.select_sql(),
            parameters,
        }
    }

    /// Records passing the condition, sorted and paged as this query asks.
    pub fn filter_records(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut matches: Vec<Record> = records
            .into_iter()
            .filter(|record| self.condition.test(record))
            .collect();
        self.sort(&mut matches);
        matches
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Sorts by the order-by keys; nulls sort first.
    pub fn sort(&self, records: &mut [Record]) {
        if self.order_by.is_empty() {
            return;
        }
        records.sort_by(|a, b| {
            for (name, ascending) in &self.order_by {
                let ordering = compare_for_sort(a.value(name), b.value(name));
                let ordering = if *ascending { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Spatial extent of the condition, snapped to the definition's
    /// precision grid when it has a geometry factory.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let bbox = self.condition.bounding_box()?;
        match self.definition.as_ref().and_then(|d| d.geometry_factory()) {
            Some(factory) => Some(factory.snap_bbox(&bbox)),
            None => Some(bbox),
        }
    }
}

impl Clone for Query {
    /// Deep copy: the clone shares no condition node with this query.
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            definition: self.definition.clone(),
            field_names: self.field_names.clone(),
            condition: Arc::new(self.condition.deep_clone()),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            lock_mode: self.lock_mode,
            distinct: self.distinct,
            from_clause: self.from_clause.clone(),
            sql: self.sql.clone(),
            parameters: self.parameters.clone(),
            type_name_alias: self.type_name_alias.clone(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_statement())
    }
}

/// `/SCHEMA/TABLE` becomes `SCHEMA.TABLE`
fn qualified_table_name(path: &str) -> String {
    path.trim_start_matches('/').replace('/', ".")
}

fn compare_for_sort(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

impl QueryValue {
    /// Shorthand for `Query::new(path)` filtered by this condition.
    pub fn into_query(self: QueryValueRef, path: impl Into<String>) -> Query {
        let mut query = Query::new(path);
        query.condition = self;
        query
    }
}
