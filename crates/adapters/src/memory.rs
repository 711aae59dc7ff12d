use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use shelf_core::catalog::{TableCatalog, TableDefinition};
use shelf_core::store::{
    ConstraintKind, ConstraintViolation, Record, RecordStore, RowKey, StoreError, TableData,
};
use tracing::debug;

/// A store held entirely in memory that enforces the catalog's keys and references.
#[derive(Debug)]
pub struct InMemoryStore {
    catalog: TableCatalog,
    tables: Mutex<BTreeMap<String, TableData>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(catalog: TableCatalog) -> Self {
        Self {
            catalog,
            tables: Mutex::new(BTreeMap::new()),
        }
    }

    /// Adds or replaces a table's contents without checking constraints.
    #[must_use]
    pub fn with_table(self, name: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        let data = TableData::new(
            columns.iter().map(|column| (*column).to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().copied().collect::<Record>())
                .collect(),
        );
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(name.to_string(), data);
        }
        self
    }

    /// A small library covering every table of the library catalog.
    #[must_use]
    pub fn library_demo() -> Self {
        Self::new(TableCatalog::library())
            .with_table(
                "Admins",
                &["AdminID", "Name", "Email"],
                &[&["1", "Ada Park", "ada@library.test"]],
            )
            .with_table(
                "Members",
                &["MemberID", "Name", "Email", "JoinedOn"],
                &[
                    &["1", "Grace Hopper", "grace@example.test", "2023-01-14"],
                    &["2", "Alan Turing", "alan@example.test", "2023-06-02"],
                    &["3", "Mary Shelley", "mary@example.test", "2024-02-19"],
                ],
            )
            .with_table(
                "Authors",
                &["AuthorID", "Name", "Country"],
                &[
                    &["1", "Frank Herbert", "USA"],
                    &["2", "Ursula K. Le Guin", "USA"],
                    &["3", "Jane Austen", "England"],
                ],
            )
            .with_table(
                "Publishers",
                &["PublisherID", "Name", "City"],
                &[&["1", "Chilton Books", "Philadelphia"], &["2", "Ace", "New York"]],
            )
            .with_table(
                "Genres",
                &["GenreID", "Name"],
                &[&["1", "Sci-Fi"], &["2", "Mystery"], &["3", "Romance"]],
            )
            .with_table(
                "Books",
                &["BookID", "Title", "AuthorID", "GenreID", "PublisherID", "Year"],
                &[
                    &["1", "Dune", "1", "1", "1", "1965"],
                    &["2", "The Left Hand of Darkness", "2", "1", "2", "1969"],
                    &["3", "Emma", "3", "3", "2", "1815"],
                ],
            )
            .with_table(
                "Loans",
                &["LoanID", "BookID", "MemberID", "LoanedOn", "DueOn"],
                &[
                    &["1", "1", "1", "2024-03-01", "2024-03-15"],
                    &["2", "3", "2", "2024-03-04", "2024-03-18"],
                ],
            )
            .with_table(
                "Reservations",
                &["ReservationID", "BookID", "MemberID", "ReservedOn"],
                &[&["1", "1", "3", "2024-03-05"]],
            )
            .with_table(
                "Fines",
                &["FineID", "LoanID", "MemberID", "Amount"],
                &[&["1", "2", "2", "1.50"]],
            )
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, TableData>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }

    fn key_index(&self, table: &str, data: &TableData) -> usize {
        self.catalog
            .resolve_primary_key(table, &data.columns)
            .index()
    }

    // Every declared reference from `table` must point at an existing parent key.
    fn check_references(
        &self,
        tables: &BTreeMap<String, TableData>,
        definition: Option<&TableDefinition>,
        assigned: &[(usize, String)],
        data: &TableData,
    ) -> Result<(), StoreError> {
        let Some(definition) = definition else {
            return Ok(());
        };
        for (index, value) in assigned {
            let column = &data.columns[*index];
            let Some(reference) = definition.reference_for(column) else {
                continue;
            };
            let exists = tables.get(&reference.referenced_table).is_some_and(|parent| {
                let parent_key = self.key_index(&reference.referenced_table, parent);
                parent
                    .rows
                    .iter()
                    .any(|row| row.get(parent_key) == Some(value.as_str()))
            });
            if !exists {
                return Err(ConstraintViolation::new(
                    ConstraintKind::ForeignKey,
                    format!(
                        "no {} row has {} = {value}",
                        reference.referenced_table, reference.column
                    ),
                )
                .with_column(column.clone())
                .with_referenced_table(reference.referenced_table.clone())
                .into());
            }
        }
        Ok(())
    }
}

fn table_mut<'a>(
    tables: &'a mut BTreeMap<String, TableData>,
    table: &str,
) -> Result<&'a mut TableData, StoreError> {
    tables.get_mut(table).ok_or_else(|| missing_table(table))
}

fn missing_table(table: &str) -> StoreError {
    StoreError::backend(format!("Table '{table}' doesn't exist"))
}

fn column_index(data: &TableData, column: &str) -> Result<usize, StoreError> {
    data.columns
        .iter()
        .position(|candidate| candidate == column)
        .ok_or_else(|| StoreError::backend(format!("Unknown column '{column}'")))
}

fn assignments(
    data: &TableData,
    columns: &[String],
    values: &[String],
) -> Result<Vec<(usize, String)>, StoreError> {
    if columns.len() != values.len() {
        return Err(StoreError::backend(format!(
            "{} columns but {} values",
            columns.len(),
            values.len()
        )));
    }
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| Ok((column_index(data, column)?, value.clone())))
        .collect()
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch_all(&self, table: &str) -> Result<TableData, StoreError> {
        let tables = self.lock()?;
        tables.get(table).cloned().ok_or_else(|| missing_table(table))
    }

    async fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let data = tables.get(table).ok_or_else(|| missing_table(table))?;
        let assigned = assignments(data, columns, values)?;

        let mut row = vec![String::new(); data.columns.len()];
        for (index, value) in &assigned {
            row[*index].clone_from(value);
        }
        if let Some(index) = row.iter().position(String::is_empty) {
            return Err(ConstraintViolation::new(
                ConstraintKind::NotNull,
                format!("Column '{}' cannot be null", data.columns[index]),
            )
            .with_column(data.columns[index].clone())
            .into());
        }

        let key_index = self.key_index(table, data);
        if data
            .rows
            .iter()
            .any(|existing| existing.get(key_index) == Some(row[key_index].as_str()))
        {
            let key_column = data.columns[key_index].clone();
            let key_value = row[key_index].clone();
            return Err(ConstraintViolation::new(
                ConstraintKind::Duplicate,
                format!("Duplicate entry '{key_value}' for key '{key_column}'"),
            )
            .with_column(key_column)
            .with_value(key_value)
            .into());
        }

        self.check_references(&tables, self.catalog.table(table), &assigned, data)?;

        table_mut(&mut tables, table)?.rows.push(Record::new(row));
        debug!(table, "inserted in-memory row");
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
        key: &RowKey,
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let data = tables.get(table).ok_or_else(|| missing_table(table))?;
        let assigned = assignments(data, columns, values)?;
        let key_index = column_index(data, &key.column)?;
        self.check_references(&tables, self.catalog.table(table), &assigned, data)?;

        let data = table_mut(&mut tables, table)?;
        let mut affected = 0;
        for row in &mut data.rows {
            if row.get(key_index) != Some(key.value.as_str()) {
                continue;
            }
            for (index, value) in &assigned {
                row.values[*index].clone_from(value);
            }
            affected += 1;
        }
        debug!(table, %key, affected, "updated in-memory rows");
        Ok(affected)
    }

    async fn delete(&self, table: &str, key: &RowKey) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let data = tables.get(table).ok_or_else(|| missing_table(table))?;
        let key_index = column_index(data, &key.column)?;
        let declared_key = self.key_index(table, data);
        let doomed = data
            .rows
            .iter()
            .filter(|row| row.get(key_index) == Some(key.value.as_str()))
            .filter_map(|row| row.get(declared_key))
            .collect::<Vec<_>>();

        for (child, column) in self.catalog.referencing_tables(table) {
            let Some(child_data) = tables.get(&child.name) else {
                continue;
            };
            let Ok(child_column) = column_index(child_data, column) else {
                continue;
            };
            let still_referenced = child_data.rows.iter().any(|row| {
                row.get(child_column)
                    .is_some_and(|value| doomed.contains(&value))
            });
            if still_referenced {
                return Err(ConstraintViolation::new(
                    ConstraintKind::Referenced,
                    format!("{} rows still reference {table}", child.name),
                )
                .with_column(column)
                .with_referencing_table(child.name.clone())
                .into());
            }
        }

        let data = table_mut(&mut tables, table)?;
        let before = data.rows.len();
        data.rows
            .retain(|row| row.get(key_index) != Some(key.value.as_str()));
        let affected = (before - data.rows.len()) as u64;
        debug!(table, %key, affected, "deleted in-memory rows");
        Ok(affected)
    }
}
