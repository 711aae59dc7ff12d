use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub column: String,
    pub referenced_table: String,
}

impl ForeignKeyReference {
    #[must_use]
    pub fn new(column: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub category: String,
    pub primary_key: String,
    #[serde(default)]
    pub references: Vec<ForeignKeyReference>,
}

impl TableDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            primary_key: primary_key.into(),
            references: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_reference(mut self, column: &str, referenced_table: &str) -> Self {
        self.references
            .push(ForeignKeyReference::new(column, referenced_table));
        self
    }

    #[must_use]
    pub fn reference_for(&self, column: &str) -> Option<&ForeignKeyReference> {
        self.references
            .iter()
            .find(|reference| reference.column.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCategory<'a> {
    pub name: &'a str,
    pub tables: Vec<&'a TableDefinition>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("table `{0}` is declared more than once")]
    DuplicateTable(String),
    #[error("table `{0}` has an empty primary key declaration")]
    MissingPrimaryKey(String),
}

/// Which column identifies a row, and how that was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution {
    Declared(usize),
    /// The table is undeclared or its declared key was not among the columns.
    Positional,
}

impl KeyResolution {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Declared(index) => index,
            Self::Positional => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableCatalog {
    tables: Vec<TableDefinition>,
}

impl TableCatalog {
    pub fn new(tables: Vec<TableDefinition>) -> Result<Self, CatalogError> {
        for (index, table) in tables.iter().enumerate() {
            if table.primary_key.trim().is_empty() {
                return Err(CatalogError::MissingPrimaryKey(table.name.clone()));
            }
            if tables[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&table.name))
            {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
        }
        Ok(Self { tables })
    }

    /// The library schema: users, content and transaction tables.
    #[must_use]
    pub fn library() -> Self {
        Self {
            tables: vec![
                TableDefinition::new("Admins", "Users", "AdminID"),
                TableDefinition::new("Members", "Users", "MemberID"),
                TableDefinition::new("Books", "Content", "BookID")
                    .with_reference("AuthorID", "Authors")
                    .with_reference("GenreID", "Genres")
                    .with_reference("PublisherID", "Publishers"),
                TableDefinition::new("Authors", "Content", "AuthorID"),
                TableDefinition::new("Publishers", "Content", "PublisherID"),
                TableDefinition::new("Genres", "Content", "GenreID"),
                TableDefinition::new("Loans", "Transactions", "LoanID")
                    .with_reference("BookID", "Books")
                    .with_reference("MemberID", "Members"),
                TableDefinition::new("Reservations", "Transactions", "ReservationID")
                    .with_reference("BookID", "Books")
                    .with_reference("MemberID", "Members"),
                TableDefinition::new("Fines", "Transactions", "FineID")
                    .with_reference("LoanID", "Loans")
                    .with_reference("MemberID", "Members"),
            ],
        }
    }

    #[must_use]
    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    /// Categories in order of first appearance, tables in declaration order.
    #[must_use]
    pub fn categories(&self) -> Vec<TableCategory<'_>> {
        let mut categories: Vec<TableCategory<'_>> = Vec::new();
        for table in &self.tables {
            if let Some(category) = categories
                .iter_mut()
                .find(|category| category.name == table.category)
            {
                category.tables.push(table);
            } else {
                categories.push(TableCategory {
                    name: &table.category,
                    tables: vec![table],
                });
            }
        }
        categories
    }

    #[must_use]
    pub fn resolve_primary_key(&self, table: &str, columns: &[String]) -> KeyResolution {
        self.table(table)
            .and_then(|definition| {
                columns
                    .iter()
                    .position(|column| column.eq_ignore_ascii_case(&definition.primary_key))
            })
            .map_or(KeyResolution::Positional, KeyResolution::Declared)
    }

    #[must_use]
    pub fn referenced_table(&self, table: &str, column: &str) -> Option<&str> {
        self.table(table)
            .and_then(|definition| definition.reference_for(column))
            .map(|reference| reference.referenced_table.as_str())
    }

    /// Declared tables holding a reference to `table`, with the referencing column.
    #[must_use]
    pub fn referencing_tables(&self, table: &str) -> Vec<(&TableDefinition, &str)> {
        self.tables
            .iter()
            .flat_map(|candidate| {
                candidate
                    .references
                    .iter()
                    .filter(move |reference| {
                        reference.referenced_table.eq_ignore_ascii_case(table)
                    })
                    .map(move |reference| (candidate, reference.column.as_str()))
            })
            .collect()
    }
}
