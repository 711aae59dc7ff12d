use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::TableCatalog;
use crate::form::ValidationError;
use crate::store::{ConstraintKind, ConstraintViolation, RecordStore, RowKey, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    fn failure_prefix(self) -> Option<&'static str> {
        match self {
            Self::Create => None,
            Self::Update => Some("Failed to update record"),
            Self::Delete => Some("Failed to delete record"),
        }
    }
}

/// Progress of one mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
    Rejected,
}

impl MutationPhase {
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Validating, Self::Submitting | Self::Rejected)
                | (Self::Submitting, Self::Succeeded | Self::Failed)
                | (Self::Succeeded | Self::Failed | Self::Rejected, Self::Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{columns} columns but {values} values")]
    ValueCountMismatch { columns: usize, values: usize },
    #[error("key index {index} is outside {columns} columns")]
    KeyOutOfRange { index: usize, columns: usize },
}

/// An update with the primary key pulled out of the assigned columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub columns: Vec<String>,
    pub values: Vec<String>,
    pub key: RowKey,
}

impl UpdatePlan {
    pub fn split(
        columns: &[String],
        values: &[String],
        key_index: usize,
    ) -> Result<Self, PlanError> {
        if columns.len() != values.len() {
            return Err(PlanError::ValueCountMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }
        if key_index >= columns.len() {
            return Err(PlanError::KeyOutOfRange {
                index: key_index,
                columns: columns.len(),
            });
        }

        let key = RowKey::new(columns[key_index].clone(), values[key_index].clone());
        let (columns, values) = columns
            .iter()
            .zip(values)
            .enumerate()
            .filter(|(index, _)| *index != key_index)
            .map(|(_, (column, value))| (column.clone(), value.clone()))
            .unzip();

        Ok(Self {
            columns,
            values,
            key,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Constraint {
        violation: ConstraintViolation,
        message: String,
    },
    #[error("Please select a record first.")]
    NoSelection,
    #[error("{0}")]
    Unknown(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl MutationError {
    /// Text shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug)]
pub struct RecordMutator<'a, S: RecordStore> {
    store: &'a S,
    catalog: &'a TableCatalog,
}

impl<'a, S: RecordStore> RecordMutator<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, catalog: &'a TableCatalog) -> Self {
        Self { store, catalog }
    }

    /// Inserts `values` in column order; values are trimmed first.
    pub async fn create(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> Result<(), MutationError> {
        let trimmed = values
            .iter()
            .map(|value| value.trim().to_string())
            .collect::<Vec<_>>();
        debug!(table, columns = columns.len(), "inserting record");
        self.store
            .insert(table, columns, &trimmed)
            .await
            .map_err(|error| self.map_store_error(table, MutationKind::Create, error))
    }

    pub async fn update(&self, table: &str, plan: &UpdatePlan) -> Result<u64, MutationError> {
        debug!(table, key = %plan.key, "updating record");
        self.store
            .update(table, &plan.columns, &plan.values, &plan.key)
            .await
            .map_err(|error| self.map_store_error(table, MutationKind::Update, error))
    }

    pub async fn delete(&self, table: &str, key: &RowKey) -> Result<u64, MutationError> {
        debug!(table, %key, "deleting record");
        self.store
            .delete(table, key)
            .await
            .map_err(|error| self.map_store_error(table, MutationKind::Delete, error))
    }

    fn map_store_error(
        &self,
        table: &str,
        kind: MutationKind,
        error: StoreError,
    ) -> MutationError {
        warn!(table, ?kind, %error, "store rejected mutation");
        match error {
            StoreError::Constraint(violation) => {
                let message = describe_violation(self.catalog, table, &violation)
                    .unwrap_or_else(|| with_prefix(kind, &violation.message));
                MutationError::Constraint { violation, message }
            }
            StoreError::Backend(message) => MutationError::Unknown(with_prefix(kind, &message)),
        }
    }
}

fn with_prefix(kind: MutationKind, message: &str) -> String {
    match kind.failure_prefix() {
        Some(prefix) => format!("{prefix}: {message}"),
        None => message.to_string(),
    }
}

/// A friendlier message for recognised violations; `None` keeps the store's wording.
#[must_use]
pub fn describe_violation(
    catalog: &TableCatalog,
    table: &str,
    violation: &ConstraintViolation,
) -> Option<String> {
    match violation.kind {
        ConstraintKind::ForeignKey => {
            let (column, referenced) = foreign_key_target(catalog, table, violation)?;
            Some(format!(
                "The specified {column} does not exist in the {referenced} table."
            ))
        }
        ConstraintKind::Referenced => violation
            .referencing_table
            .as_deref()
            .map(|child| format!("This record is still referenced by the {child} table.")),
        ConstraintKind::Duplicate => {
            match (violation.column.as_deref(), violation.value.as_deref()) {
                (Some(column), Some(value)) => {
                    Some(format!("A record with {column} {value} already exists."))
                }
                (None, Some(value)) => Some(format!("A record with key {value} already exists.")),
                (Some(column), None) => {
                    Some(format!("A record with this {column} already exists."))
                }
                (None, None) => None,
            }
        }
        ConstraintKind::NotNull => violation
            .column
            .as_deref()
            .map(|column| format!("{column} cannot be empty.")),
    }
}

// Reference columns every library table shares, for tables the catalog does not describe.
const CONVENTIONAL_REFERENCES: [(&str, &str); 3] = [
    ("AuthorID", "Authors"),
    ("GenreID", "Genres"),
    ("PublisherID", "Publishers"),
];

// Column and parent table of a failed reference: from the violation itself, then the
// catalog, then the conventional columns; the store's message is scanned when the
// violation names no usable column.
fn foreign_key_target(
    catalog: &TableCatalog,
    table: &str,
    violation: &ConstraintViolation,
) -> Option<(String, String)> {
    if let Some(column) = violation.column.as_deref() {
        let referenced = violation
            .referenced_table
            .as_deref()
            .or_else(|| catalog.referenced_table(table, column))
            .or_else(|| conventional_reference(column));
        if let Some(referenced) = referenced {
            return Some((column.to_string(), referenced.to_string()));
        }
    }

    let lowered = violation.message.to_lowercase();
    let declared = catalog.table(table).and_then(|definition| {
        definition
            .references
            .iter()
            .find(|reference| lowered.contains(&reference.column.to_lowercase()))
            .map(|reference| {
                (
                    reference.column.clone(),
                    reference.referenced_table.clone(),
                )
            })
    });
    declared.or_else(|| {
        CONVENTIONAL_REFERENCES
            .iter()
            .find(|(column, _)| lowered.contains(&column.to_lowercase()))
            .map(|(column, referenced)| ((*column).to_string(), (*referenced).to_string()))
    })
}

fn conventional_reference(column: &str) -> Option<&'static str> {
    CONVENTIONAL_REFERENCES
        .iter()
        .find(|(conventional, _)| conventional.eq_ignore_ascii_case(column))
        .map(|(_, referenced)| *referenced)
}
