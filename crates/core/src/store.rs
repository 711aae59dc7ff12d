use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub values: Vec<String>,
}

impl Record {
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl TableData {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Index and width of the first row whose width differs from the column count.
    #[must_use]
    pub fn first_misaligned_row(&self) -> Option<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
            .map(|(index, row)| (index, row.len()))
    }
}

/// Identifies exactly one row; the value is always sent as a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub column: String,
    pub value: String,
}

impl RowKey {
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A referenced parent row does not exist.
    ForeignKey,
    /// The row is still referenced by a child row.
    Referenced,
    Duplicate,
    NotNull,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub column: Option<String>,
    /// Parent table a foreign key points at.
    pub referenced_table: Option<String>,
    /// Child table still pointing at the row being removed.
    pub referencing_table: Option<String>,
    /// Offending value, when the store reports one.
    pub value: Option<String>,
    pub message: String,
}

impl ConstraintViolation {
    #[must_use]
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            referenced_table: None,
            referencing_table: None,
            value: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_referenced_table(mut self, table: impl Into<String>) -> Self {
        self.referenced_table = Some(table.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_referencing_table(mut self, table: impl Into<String>) -> Self {
        self.referencing_table = Some(table.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Constraint(ConstraintViolation),
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

impl From<ConstraintViolation> for StoreError {
    fn from(violation: ConstraintViolation) -> Self {
        Self::Constraint(violation)
    }
}

#[async_trait]
pub trait RecordStore {
    async fn fetch_all(&self, table: &str) -> Result<TableData, StoreError>;

    async fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> Result<(), StoreError>;

    /// Returns the number of rows the store reports as affected.
    async fn update(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
        key: &RowKey,
    ) -> Result<u64, StoreError>;

    async fn delete(&self, table: &str, key: &RowKey) -> Result<u64, StoreError>;

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConstraintKind, ConstraintViolation, Record, RowKey, StoreError, TableData};

    #[test]
    fn misaligned_rows_are_reported_with_their_width() {
        let data = TableData::new(
            vec!["GenreID".to_string(), "Name".to_string()],
            vec![
                ["1", "Sci-Fi"].into_iter().collect::<Record>(),
                ["2"].into_iter().collect::<Record>(),
            ],
        );

        assert_eq!(data.first_misaligned_row(), Some((1, 1)));
    }

    #[test]
    fn aligned_rows_pass_shape_check() {
        let data = TableData::new(
            vec!["GenreID".to_string()],
            vec![["1"].into_iter().collect::<Record>()],
        );
        assert_eq!(data.first_misaligned_row(), None);
    }

    #[test]
    fn store_errors_display_the_underlying_message() {
        let violation = ConstraintViolation::new(ConstraintKind::ForeignKey, "fk failed")
            .with_column("AuthorID")
            .with_referenced_table("Authors");
        assert_eq!(StoreError::from(violation).to_string(), "fk failed");
        assert_eq!(StoreError::backend("gone away").to_string(), "gone away");
        assert_eq!(RowKey::new("LoanID", "42").to_string(), "LoanID = 42");
    }
}
