use thiserror::Error;

use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("All fields must be filled")]
pub struct ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record has {actual} values but the table has {expected} columns")]
pub struct ShapeError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: String,
    pub value: String,
    pub locked: bool,
}

/// Labeled text fields in column order, with one focused field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<FormField>,
    focused: usize,
}

impl FieldSet {
    #[must_use]
    pub fn for_create(columns: &[String]) -> Self {
        Self {
            fields: columns
                .iter()
                .map(|column| FormField {
                    label: column.clone(),
                    value: String::new(),
                    locked: false,
                })
                .collect(),
            focused: 0,
        }
    }

    /// Pre-populates every field from `record`; the field at `locked_index` cannot be edited.
    pub fn for_edit(
        columns: &[String],
        record: &Record,
        locked_index: Option<usize>,
    ) -> Result<Self, ShapeError> {
        if record.len() != columns.len() {
            return Err(ShapeError {
                expected: columns.len(),
                actual: record.len(),
            });
        }

        let fields = columns
            .iter()
            .zip(&record.values)
            .enumerate()
            .map(|(index, (column, value))| FormField {
                label: column.clone(),
                value: value.clone(),
                locked: locked_index == Some(index),
            })
            .collect::<Vec<_>>();

        let mut field_set = Self { fields, focused: 0 };
        if field_set.fields.first().is_some_and(|field| field.locked) {
            field_set.focus_next();
        }
        Ok(field_set)
    }

    pub fn collect(&self) -> Result<Vec<String>, ValidationError> {
        if self
            .fields
            .iter()
            .any(|field| field.value.trim().is_empty())
        {
            return Err(ValidationError);
        }
        Ok(self.fields.iter().map(|field| field.value.clone()).collect())
    }

    #[must_use]
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.label.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn focused_index(&self) -> usize {
        self.focused
    }

    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_previous(&mut self) {
        self.step_focus(self.fields.len().saturating_sub(1));
    }

    pub fn push_char(&mut self, ch: char) {
        if let Some(field) = self.focused_field_mut() {
            field.value.push(ch);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.value.pop();
        }
    }

    /// Returns false when the index is out of range or the field is locked.
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.fields.get_mut(index) {
            Some(field) if !field.locked => {
                field.value = value.into();
                true
            }
            _ => false,
        }
    }

    fn focused_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields
            .get_mut(self.focused)
            .filter(|field| !field.locked)
    }

    // Skips locked fields; stays put when every field is locked.
    fn step_focus(&mut self, offset: usize) {
        let len = self.fields.len();
        if len == 0 {
            return;
        }
        let mut candidate = self.focused;
        for _ in 0..len {
            candidate = (candidate + offset) % len;
            if !self.fields[candidate].locked {
                self.focused = candidate;
                return;
            }
        }
    }
}
