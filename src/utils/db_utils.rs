use chrono::NaiveDate;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{PgPool, Postgres};

use crate::error::ApiError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may appear in the payload. Columns in
/// `date_columns` must be `YYYY-MM-DD` strings; other strings bind as text.
/// JSON `null` is written as a literal `NULL`.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    date_columns: &[&str],
    id_column: &str,
    id_value: i64,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!("Field '{unknown}' cannot be updated")));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for (column, value) in obj {
        let bound = match value {
            Value::Null => None,
            _ if date_columns.contains(&column.as_str()) => Some(SqlValue::Date(
                value
                    .as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .ok_or_else(|| ApiError::bad_request(format!("{column} must be YYYY-MM-DD")))?,
            )),
            Value::String(s) => Some(SqlValue::String(s.clone())),
            Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::I64(i),
                (None, Some(f)) => SqlValue::F64(f),
                (None, None) => return Err(ApiError::bad_request("Number out of range")),
            }),
            Value::Bool(b) => Some(SqlValue::Bool(*b)),
            _ => return Err(ApiError::bad_request("Unsupported JSON value type")),
        };

        match bound {
            Some(v) => {
                values.push(v);
                assignments.push(format!("{} = ${}", column, values.len()));
            }
            None => assignments.push(format!("{} = NULL", column)),
        }
    }

    // WHERE id = $n
    values.push(SqlValue::I64(id_value));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table,
        assignments.join(", "),
        id_column,
        values.len()
    );

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &PgPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Typed value for a dynamic `WHERE` clause
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    I64(i64),
    Str(String),
    Date(NaiveDate),
}

/// Accumulates `AND`-joined conditions with `$n` placeholders.
#[derive(Debug, Default)]
pub struct Filters {
    clauses: Vec<String>,
    values: Vec<FilterValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self, value: FilterValue) -> usize {
        self.values.push(value);
        self.values.len()
    }

    /// `column <op> $n`
    pub fn cmp(&mut self, column: &str, op: &str, value: FilterValue) -> &mut Self {
        let n = self.next(value);
        self.clauses.push(format!("{column} {op} ${n}"));
        self
    }

    pub fn eq(&mut self, column: &str, value: FilterValue) -> &mut Self {
        self.cmp(column, "=", value)
    }

    /// Case-insensitive substring match over several columns, one placeholder.
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let n = self.next(FilterValue::Str(format!("%{}%", term.trim())));
        let any = columns
            .iter()
            .map(|c| format!("{c} ILIKE ${n}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.clauses.push(format!("({any})"));
        self
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Placeholder number following the filter values (for LIMIT/OFFSET).
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }

    pub fn bind_query_as<'q, O>(
        &self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for value in &self.values {
            query = match value.clone() {
                FilterValue::I64(v) => query.bind(v),
                FilterValue::Str(v) => query.bind(v),
                FilterValue::Date(v) => query.bind(v),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for value in &self.values {
            query = match value.clone() {
                FilterValue::I64(v) => query.bind(v),
                FilterValue::Str(v) => query.bind(v),
                FilterValue::Date(v) => query.bind(v),
            };
        }
        query
    }
}

/// Pagination as used by every list endpoint: 1-based page, capped page size.
pub fn paginate(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    let offset = i64::from(page - 1) * i64::from(per_page);
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["first_name", "hire_date", "team_lead_id", "phone"];
    const DATES: &[&str] = &["hire_date"];

    #[test]
    fn builds_numbered_placeholders() {
        let update = build_update_sql(
            "employees",
            &json!({"first_name": "Ada", "hire_date": "2024-02-01"}),
            ALLOWED,
            DATES,
            "id",
            7,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET first_name = $1, hire_date = $2 WHERE id = $3"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Ada".into()),
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
                SqlValue::I64(7),
            ]
        );
    }

    #[test]
    fn null_is_inlined() {
        let update = build_update_sql(
            "employees",
            &json!({"phone": null, "team_lead_id": 3}),
            ALLOWED,
            DATES,
            "id",
            1,
        )
        .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE employees SET phone = NULL, team_lead_id = $1 WHERE id = $2"
        );
        assert_eq!(update.values, vec![SqlValue::I64(3), SqlValue::I64(1)]);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = build_update_sql("employees", &json!({"id": 5}), ALLOWED, DATES, "id", 1).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("'id'")));
    }

    #[test]
    fn empty_and_non_object_payloads_are_rejected() {
        assert!(build_update_sql("employees", &json!({}), ALLOWED, DATES, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), ALLOWED, DATES, "id", 1).is_err());
    }

    #[test]
    fn date_columns_must_be_iso_dates() {
        let err = build_update_sql("employees", &json!({"hire_date": "01/02/2026"}), ALLOWED, DATES, "id", 1)
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "hire_date must be YYYY-MM-DD"));
        assert!(build_update_sql("employees", &json!({"hire_date": 20260102}), ALLOWED, DATES, "id", 1).is_err());

        let update =
            build_update_sql("employees", &json!({"hire_date": null}), ALLOWED, DATES, "id", 1).unwrap();
        assert_eq!(update.sql, "UPDATE employees SET hire_date = NULL WHERE id = $1");
    }

    #[test]
    fn date_like_text_stays_text() {
        let update =
            build_update_sql("employees", &json!({"first_name": "2024-02-01"}), ALLOWED, DATES, "id", 1)
                .unwrap();
        assert_eq!(update.values[0], SqlValue::String("2024-02-01".into()));
    }

    #[test]
    fn filters_number_placeholders_in_order() {
        let mut filters = Filters::new();
        filters
            .eq("status", FilterValue::Str("active".into()))
            .search(&["first_name", "email"], " ada ")
            .cmp("hire_date", ">=", FilterValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));

        assert_eq!(
            filters.where_sql(),
            " WHERE status = $1 AND (first_name ILIKE $2 OR email ILIKE $2) AND hire_date >= $3"
        );
        assert_eq!(filters.next_placeholder(), 4);
        assert_eq!(filters.values[1], FilterValue::Str("%ada%".into()));
    }

    #[test]
    fn no_filters_no_where() {
        let filters = Filters::new();
        assert_eq!(filters.where_sql(), "");
        assert_eq!(filters.next_placeholder(), 1);
    }

    #[test]
    fn paginate_clamps() {
        assert_eq!(paginate(None, None, 20), (1, 20, 0));
        assert_eq!(paginate(Some(0), Some(500), 20), (1, 100, 0));
        assert_eq!(paginate(Some(3), Some(10), 20), (3, 10, 20));
    }
}
