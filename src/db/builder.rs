//! SQL statement builders
//!
//! Column and table names passed here come from the resource registry;
//! request data only ever reaches the database as positional parameters.

use crate::content::SqlValue;
use crate::error::{validation_error, AppError};
use postgres_types::ToSql;

/// Positional parameter list (`$1`, `$2`, ...)
#[derive(Debug, Default, Clone)]
pub struct SqlParams {
    values: Vec<SqlValue>,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value and return its placeholder
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    #[cfg(test)]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(SqlValue::as_param).collect()
    }
}

/// `INSERT ... RETURNING to_jsonb(t)` builder
#[derive(Debug)]
pub struct InsertBuilder {
    table: &'static str,
    columns: Vec<&'static str>,
    exprs: Vec<String>,
    params: SqlParams,
}

impl InsertBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            exprs: Vec::new(),
            params: SqlParams::new(),
        }
    }

    pub fn value(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        let placeholder = self.params.push(value);
        self.columns.push(column);
        self.exprs.push(placeholder);
        self
    }

    /// Column set from a SQL expression such as `NOW()`
    pub fn raw(&mut self, column: &'static str, expr: &str) -> &mut Self {
        self.columns.push(column);
        self.exprs.push(expr.to_string());
        self
    }

    pub fn build(self) -> (String, SqlParams) {
        if self.columns.is_empty() {
            let sql = format!(
                "INSERT INTO {} AS t DEFAULT VALUES RETURNING to_jsonb(t) AS data",
                self.table
            );
            return (sql, self.params);
        }
        let sql = format!(
            "INSERT INTO {table} AS t ({columns}) VALUES ({values}) RETURNING to_jsonb(t) AS data",
            table = self.table,
            columns = self.columns.join(", "),
            values = self.exprs.join(", "),
        );
        (sql, self.params)
    }
}

/// Dynamic `UPDATE` builder: only the columns that were set are touched
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<String>,
    params: SqlParams,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            params: SqlParams::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        let placeholder = self.params.push(value);
        self.sets.push(format!("{} = {}", column, placeholder));
        self
    }

    /// `column = <expr>` where `{}` in `template` is replaced by the placeholder of `value`
    pub fn set_with(&mut self, column: &'static str, template: &str, value: SqlValue) -> &mut Self {
        let placeholder = self.params.push(value);
        self.sets
            .push(format!("{} = {}", column, template.replace("{}", &placeholder)));
        self
    }

    /// Build `UPDATE ... WHERE t.id = $n`, always bumping `updated_at`
    pub fn build_by_id(mut self, id: i32) -> Result<(String, SqlParams), AppError> {
        if self.sets.is_empty() {
            return Err(validation_error("No updatable fields provided"));
        }
        self.sets.push("updated_at = NOW()".to_string());
        let id_placeholder = self.params.push(SqlValue::Integer(Some(id)));
        let sql = format!(
            "UPDATE {table} AS t SET {sets} WHERE t.id = {id} RETURNING to_jsonb(t) AS data",
            table = self.table,
            sets = self.sets.join(", "),
            id = id_placeholder,
        );
        Ok((sql, self.params))
    }
}

/// Conjunction of `WHERE` conditions sharing one parameter list
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: SqlParams,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition; `{}` is replaced by the placeholder of `value`
    pub fn push(&mut self, template: &str, value: SqlValue) -> &mut Self {
        let placeholder = self.params.push(value);
        self.conditions.push(template.replace("{}", &placeholder));
        self
    }

    pub fn push_raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn into_params(self) -> SqlParams {
        self.params
    }

    #[cfg(test)]
    pub fn params(&self) -> &SqlParams {
        &self.params
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
