use thiserror::Error;

use crate::store::RowKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlGenerationError {
    #[error("table name cannot be empty")]
    EmptyTableName,
    #[error("column name cannot be empty")]
    EmptyColumnName,
    #[error("at least one column is required")]
    NoColumns,
    #[error("{columns} columns but {values} values")]
    ValueCountMismatch { columns: usize, values: usize },
}

/// SQL text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

fn checked_table(table: &str) -> Result<String, SqlGenerationError> {
    if table.trim().is_empty() {
        return Err(SqlGenerationError::EmptyTableName);
    }
    Ok(quote_identifier(table))
}

fn quoted_columns(columns: &[String]) -> Result<Vec<String>, SqlGenerationError> {
    if columns.is_empty() {
        return Err(SqlGenerationError::NoColumns);
    }
    columns
        .iter()
        .map(|column| {
            if column.trim().is_empty() {
                Err(SqlGenerationError::EmptyColumnName)
            } else {
                Ok(quote_identifier(column))
            }
        })
        .collect()
}

fn check_value_count(columns: &[String], values: &[String]) -> Result<(), SqlGenerationError> {
    if columns.len() != values.len() {
        return Err(SqlGenerationError::ValueCountMismatch {
            columns: columns.len(),
            values: values.len(),
        });
    }
    Ok(())
}

/// Column names of `table` in the current database, in declaration order.
#[must_use]
pub fn table_columns_sql() -> &'static str {
    "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION"
}

pub fn select_all_sql(table: &str, columns: &[String]) -> Result<String, SqlGenerationError> {
    let table = checked_table(table)?;
    let columns = quoted_columns(columns)?;
    Ok(format!("SELECT {} FROM {table}", columns.join(", ")))
}

pub fn insert_sql(
    table: &str,
    columns: &[String],
    values: &[String],
) -> Result<Statement, SqlGenerationError> {
    check_value_count(columns, values)?;
    let table = checked_table(table)?;
    let quoted = quoted_columns(columns)?;
    let placeholders = vec!["?"; quoted.len()].join(", ");

    Ok(Statement {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            quoted.join(", ")
        ),
        params: values.to_vec(),
    })
}

pub fn update_sql(
    table: &str,
    columns: &[String],
    values: &[String],
    key: &RowKey,
) -> Result<Statement, SqlGenerationError> {
    check_value_count(columns, values)?;
    let table = checked_table(table)?;
    let assignments = quoted_columns(columns)?
        .into_iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let key_column = quoted_columns(std::slice::from_ref(&key.column))?.remove(0);

    let mut params = values.to_vec();
    params.push(key.value.clone());
    Ok(Statement {
        sql: format!("UPDATE {table} SET {assignments} WHERE {key_column} = ?"),
        params,
    })
}

pub fn delete_sql(table: &str, key: &RowKey) -> Result<Statement, SqlGenerationError> {
    let table = checked_table(table)?;
    let key_column = quoted_columns(std::slice::from_ref(&key.column))?.remove(0);

    Ok(Statement {
        sql: format!("DELETE FROM {table} WHERE {key_column} = ?"),
        params: vec![key.value.clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::{
        delete_sql, insert_sql, quote_identifier, select_all_sql, update_sql,
        SqlGenerationError,
    };
    use crate::store::RowKey;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn quotes_identifiers_with_backticks() {
        assert_eq!(quote_identifier("Books"), "`Books`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn select_lists_columns_explicitly() {
        let sql = select_all_sql("Genres", &strings(&["GenreID", "Name"])).expect("valid select");
        assert_eq!(sql, "SELECT `GenreID`, `Name` FROM `Genres`");
    }

    #[test]
    fn insert_binds_every_value() {
        let statement = insert_sql(
            "Books",
            &strings(&["BookID", "Title", "AuthorID"]),
            &strings(&["7", "Dune", "999"]),
        )
        .expect("valid insert");

        assert_eq!(
            statement.sql,
            "INSERT INTO `Books` (`BookID`, `Title`, `AuthorID`) VALUES (?, ?, ?)"
        );
        assert_eq!(statement.params, strings(&["7", "Dune", "999"]));
    }

    #[test]
    fn update_binds_key_after_assignments() {
        let statement = update_sql(
            "Books",
            &strings(&["Title", "AuthorID"]),
            &strings(&["Dune Messiah", "3"]),
            &RowKey::new("BookID", "7"),
        )
        .expect("valid update");

        assert_eq!(
            statement.sql,
            "UPDATE `Books` SET `Title` = ?, `AuthorID` = ? WHERE `BookID` = ?"
        );
        assert_eq!(statement.params, strings(&["Dune Messiah", "3", "7"]));
    }

    #[test]
    fn key_values_never_reach_sql_text() {
        let statement = delete_sql("Loans", &RowKey::new("LoanID", "42 OR 1=1"))
            .expect("valid delete");
        assert_eq!(statement.sql, "DELETE FROM `Loans` WHERE `LoanID` = ?");
        assert_eq!(statement.params, strings(&["42 OR 1=1"]));
    }

    #[test]
    fn rejects_malformed_requests() {
        assert_eq!(
            insert_sql("Books", &strings(&["BookID"]), &strings(&["1", "2"])),
            Err(SqlGenerationError::ValueCountMismatch {
                columns: 1,
                values: 2
            })
        );
        assert_eq!(
            select_all_sql(" ", &strings(&["BookID"])),
            Err(SqlGenerationError::EmptyTableName)
        );
        assert_eq!(
            update_sql("Books", &[], &[], &RowKey::new("BookID", "1")),
            Err(SqlGenerationError::NoColumns)
        );
        assert_eq!(
            delete_sql("Books", &RowKey::new("", "1")),
            Err(SqlGenerationError::EmptyColumnName)
        );
    }
}
