use chrono::{DateTime, Utc};
use rusqlite::ToSql;

use crate::{StoreError, StoreResult};

/// Collects `column = value` pairs for a partial update.
///
/// Only present fields are recorded; `updated_at` is appended when the
/// statement is built. Column names come from code, never from input.
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<(&'static str, Box<dyn ToSql>)>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
        }
    }

    pub fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: T) -> &mut Self {
        self.sets.push((column, Box::new(value)));
        self
    }

    pub fn set_opt<T: ToSql + 'static>(
        &mut self,
        column: &'static str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[cfg(test)]
    fn columns(&self) -> Vec<&'static str> {
        self.sets.iter().map(|(column, _)| *column).collect()
    }

    /// Emits `UPDATE <table> SET … WHERE id = ? AND deleted_at IS NULL
    /// RETURNING <returning>` and its positional parameters.
    pub fn build(
        mut self,
        id: i64,
        now: DateTime<Utc>,
        returning: &str,
    ) -> StoreResult<UpdateStatement> {
        if self.sets.is_empty() {
            return Err(StoreError::NoFieldsToUpdate);
        }

        self.set("updated_at", now);

        let assignments: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();
        let id_param = self.sets.len() + 1;

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND deleted_at IS NULL RETURNING {}",
            self.table,
            assignments.join(", "),
            id_param,
            returning
        );

        let mut params: Vec<Box<dyn ToSql>> = self.sets.into_iter().map(|(_, v)| v).collect();
        params.push(Box::new(id));

        Ok(UpdateStatement { sql, params })
    }
}

pub struct UpdateStatement {
    pub sql: String,
    params: Vec<Box<dyn ToSql>>,
}

impl UpdateStatement {
    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_is_rejected() {
        let builder = UpdateBuilder::new("users");
        let err = builder.build(1, Utc::now(), "id").err().unwrap();
        assert!(matches!(err, StoreError::NoFieldsToUpdate));
    }

    #[test]
    fn only_present_fields_are_written() {
        let mut builder = UpdateBuilder::new("users");
        builder
            .set_opt("name", Some("Ada".to_string()))
            .set_opt::<String>("email", None);
        assert_eq!(builder.columns(), vec!["name"]);

        let stmt = builder.build(7, Utc::now(), "id, name").unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL RETURNING id, name"
        );
        assert_eq!(stmt.params().len(), 3);
    }
}
