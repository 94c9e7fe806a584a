use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::MySqlPool;
use std::str::FromStr;

use crate::error::HrmError;

/// ===============================
/// Column kinds a patch may touch
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Text,
    Integer,
    Money,
    Date,
}

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
    /// Columns in SET order, for callers that react to specific fields
    pub columns: Vec<&'static str>,
}

fn convert(column: &str, kind: ColumnKind, value: &Value) -> Result<SqlValue, HrmError> {
    let invalid = |expected: &str| HrmError::Validation(format!("{column} must be {expected}"));

    match (kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::String(s.trim().to_string())),
        (ColumnKind::Integer, Value::Number(n)) => {
            n.as_u64().map(SqlValue::U64).ok_or_else(|| invalid("a positive integer"))
        }
        (ColumnKind::Money, Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map(SqlValue::Decimal)
            .map_err(|_| invalid("a decimal amount")),
        (ColumnKind::Money, Value::String(s)) => Decimal::from_str(s.trim())
            .map(SqlValue::Decimal)
            .map_err(|_| invalid("a decimal amount")),
        (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(SqlValue::Date)
            .map_err(|_| invalid("a YYYY-MM-DD date")),
        (ColumnKind::Text, _) => Err(invalid("a string")),
        (ColumnKind::Integer, _) => Err(invalid("a positive integer")),
        (ColumnKind::Money, _) => Err(invalid("a decimal amount")),
        (ColumnKind::Date, _) => Err(invalid("a YYYY-MM-DD date")),
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` become columns; anything else is rejected so
/// payload keys never reach the SQL text unchecked.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[(&'static str, ColumnKind)],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, HrmError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| HrmError::Validation("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(HrmError::Validation("No fields provided for update".into()));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let (column, kind) = allowed
            .iter()
            .find(|(name, _)| *name == key.as_str())
            .copied()
            .ok_or_else(|| HrmError::Validation(format!("Field {key} cannot be updated")))?;

        values.push(convert(column, kind, value)?);
        columns.push(column);
    }

    let set_clause = columns
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate {
        sql,
        values,
        columns,
    })
}

/// Binds each value in order onto a `query`, `query_as` or `query_scalar`.
macro_rules! bind_all {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                $crate::utils::db_utils::SqlValue::String(v) => query.bind(v.clone()),
                $crate::utils::db_utils::SqlValue::U64(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::I64(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::Decimal(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::Date(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }};
}

pub(crate) use bind_all;

/// `WHERE` conditions and their bindings, collected from optional filters.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    pub values: Vec<SqlValue>,
}

impl Filters {
    pub fn push(&mut self, condition: &'static str, value: SqlValue) {
        self.conditions.push(condition);
        self.values.push(value);
    }

    /// Same value bound to every placeholder of a multi-placeholder condition.
    pub fn push_repeated(&mut self, condition: &'static str, value: &str) {
        self.conditions.push(condition);
        for _ in 0..condition.matches('?').count() {
            self.values.push(SqlValue::String(value.to_string()));
        }
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let query = bind_all!(sqlx::query(&update.sql), &update.values);
    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Normalized pagination: 1-based page, `per_page` clamped to `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32, max: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(default_per_page).clamp(1, max);
        Self {
            page,
            per_page,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[(&str, ColumnKind)] = &[
        ("first_name", ColumnKind::Text),
        ("department_id", ColumnKind::Integer),
        ("salary", ColumnKind::Money),
        ("hire_date", ColumnKind::Date),
    ];

    #[test]
    fn builds_set_clause_for_allowed_columns() {
        let update = build_update_sql(
            "employees",
            &json!({"first_name": " Ana ", "salary": "6100.50"}),
            COLUMNS,
            "id",
            9,
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET first_name = ?, salary = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Ana".into()),
                SqlValue::Decimal(Decimal::new(610_050, 2)),
                SqlValue::U64(9),
            ]
        );
        assert_eq!(update.columns, vec!["first_name", "salary"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = build_update_sql(
            "employees",
            &json!({"id = 1; DROP TABLE employees; --": "x"}),
            COLUMNS,
            "id",
            9,
        )
        .unwrap_err();
        assert!(matches!(err, HrmError::Validation(_)));
    }

    #[test]
    fn values_must_match_the_column_kind() {
        for payload in [
            json!({"department_id": -3}),
            json!({"hire_date": "01/02/2026"}),
            json!({"salary": "lots"}),
            json!({"first_name": 12}),
        ] {
            assert!(build_update_sql("employees", &payload, COLUMNS, "id", 1).is_err());
        }
    }

    #[test]
    fn null_clears_a_column_and_empty_payload_fails() {
        let update =
            build_update_sql("employees", &json!({"department_id": null}), COLUMNS, "id", 1).unwrap();
        assert_eq!(update.values[0], SqlValue::Null);

        assert!(build_update_sql("employees", &json!({}), COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn filters_build_a_where_clause() {
        let mut filters = Filters::default();
        assert_eq!(filters.where_clause(), "");

        filters.push("department_id = ?", SqlValue::U64(4));
        filters.push_repeated("(first_name LIKE ? OR email LIKE ?)", "%ana%");

        assert_eq!(
            filters.where_clause(),
            "WHERE department_id = ? AND (first_name LIKE ? OR email LIKE ?)"
        );
        assert_eq!(filters.values.len(), 3);
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(
            Page::new(None, None, 20, 100),
            Page { page: 1, per_page: 20, offset: 0 }
        );
        assert_eq!(
            Page::new(Some(3), Some(500), 20, 100),
            Page { page: 3, per_page: 100, offset: 200 }
        );
        assert_eq!(Page::new(Some(0), Some(0), 20, 100).per_page, 1);
    }
}
