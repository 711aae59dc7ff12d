use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::catalog::{KeyResolution, TableCatalog};
use crate::form::{FieldSet, ShapeError};
use crate::mutator::{MutationError, MutationPhase, RecordMutator, UpdatePlan};
use crate::notice::{
    DeferredAction, DeferredQueue, FormId, Notice, NoticeId, NoticeIds, NoticeScope, Severity,
};
use crate::record_filter::filter;
use crate::settings::BrowserSettings;
use crate::store::{Record, RecordStore, RowKey, StoreError, TableData};

/// The presentation layer the browser drives.
///
/// Every `show_rows` replaces whatever was displayed before; nothing accumulates.
pub trait DisplaySurface {
    fn show_rows(&mut self, view: &TableView);
    fn show_selection(&mut self, index: Option<usize>);
    fn show_form(&mut self, form: &FormSession);
    fn close_form(&mut self);
    fn show_notice(&mut self, notice: &Notice);
    fn dismiss_notice(&mut self, id: NoticeId);
    fn show_delete_prompt(&mut self, prompt: Option<&DeletePrompt>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub search_term: Option<String>,
    /// Rows in the table before any search was applied.
    pub total_rows: usize,
}

impl TableView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// What to draw instead of rows when there are none.
    #[must_use]
    pub fn empty_message(&self) -> Option<String> {
        if !self.rows.is_empty() {
            return None;
        }
        Some(match &self.search_term {
            Some(term) => format!("No records in {} match \"{term}\".", self.table),
            None => format!("{} has no records.", self.table),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSession {
    pub id: FormId,
    pub table: String,
    pub mode: FormMode,
    pub fields: FieldSet,
    pub key_index: usize,
    pub phase: MutationPhase,
    pub notice: Option<Notice>,
    /// Set once the mutation succeeded; the form only waits to close.
    pub settled: bool,
}

impl FormSession {
    #[must_use]
    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => format!("Create Record for {}", self.table),
            FormMode::Edit => format!("Update Record in {}", self.table),
        }
    }

    fn advance(&mut self, next: MutationPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal mutation phase change {:?} -> {next:?}",
            self.phase
        );
        trace!(form = self.id.0, from = ?self.phase, to = ?next, "mutation phase");
        self.phase = next;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub table: String,
    pub key: RowKey,
}

impl DeletePrompt {
    #[must_use]
    pub fn question(&self) -> String {
        format!("Delete the {} record where {}?", self.table, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded(String),
    /// Validation failed; nothing reached the store.
    Rejected(String),
    Failed(String),
    /// The form already succeeded and is waiting to close.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    AwaitingConfirmation,
    Deleted(u64),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Select a table first.")]
    NoActiveTable,
    #[error("Please select a record first.")]
    NoSelection,
    #[error("row {index} is not displayed ({len} rows shown)")]
    SelectionOutOfRange { index: usize, len: usize },
    #[error("no form is open")]
    NoOpenForm,
    #[error("no delete is awaiting confirmation")]
    NoPendingDelete,
    #[error("Failed to load {table}: {source}")]
    Load {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("{table} returned a row with {actual} values for {expected} columns")]
    Misaligned {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl BrowserError {
    fn severity(&self) -> Severity {
        match self {
            Self::NoActiveTable | Self::NoSelection => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// Owns the store, the surface and every piece of browsing state.
#[derive(Debug)]
pub struct TableBrowser<S: RecordStore, D: DisplaySurface> {
    store: S,
    surface: D,
    catalog: TableCatalog,
    settings: BrowserSettings,
    active_table: Option<String>,
    view: Option<TableView>,
    selection: Option<usize>,
    form: Option<FormSession>,
    pending_delete: Option<DeletePrompt>,
    deferred: DeferredQueue<DeferredAction>,
    notice_ids: NoticeIds,
    browser_notice: Option<NoticeId>,
    next_form_id: u64,
}

impl<S: RecordStore, D: DisplaySurface> TableBrowser<S, D> {
    #[must_use]
    pub fn new(store: S, surface: D, catalog: TableCatalog, settings: BrowserSettings) -> Self {
        Self {
            store,
            surface,
            catalog,
            settings,
            active_table: None,
            view: None,
            selection: None,
            form: None,
            pending_delete: None,
            deferred: DeferredQueue::new(),
            notice_ids: NoticeIds::default(),
            browser_notice: None,
            next_form_id: 0,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    #[must_use]
    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    #[must_use]
    pub fn active_table(&self) -> Option<&str> {
        self.active_table.as_deref()
    }

    #[must_use]
    pub fn view(&self) -> Option<&TableView> {
        self.view.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    #[must_use]
    pub fn selected_record(&self) -> Option<&Record> {
        let index = self.selection?;
        self.view.as_ref()?.rows.get(index)
    }

    #[must_use]
    pub fn form(&self) -> Option<&FormSession> {
        self.form.as_ref()
    }

    #[must_use]
    pub fn pending_delete(&self) -> Option<&DeletePrompt> {
        self.pending_delete.as_ref()
    }

    #[must_use]
    pub fn has_scheduled_actions(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub async fn open_default_table(&mut self) -> Result<(), BrowserError> {
        let table = self.settings.default_table.clone();
        self.show_table(&table).await
    }

    /// Fetches `name` and replaces the displayed rows with it.
    pub async fn show_table(&mut self, name: &str) -> Result<(), BrowserError> {
        let result = self.load_table(name).await;
        self.report(result)
    }

    /// Shows the rows of the active table containing `term`; an empty term shows them all.
    pub async fn search(&mut self, term: &str) -> Result<usize, BrowserError> {
        let result = self.apply_search(term).await;
        self.report(result)
    }

    pub async fn clear_search(&mut self) -> Result<(), BrowserError> {
        let result = match self.active_table.clone() {
            Some(table) => self.load_table(&table).await,
            None => Err(BrowserError::NoActiveTable),
        };
        self.report(result)
    }

    pub fn select(&mut self, index: usize) -> Result<(), BrowserError> {
        let result = match &self.view {
            None => Err(BrowserError::NoActiveTable),
            Some(view) if index >= view.rows.len() => Err(BrowserError::SelectionOutOfRange {
                index,
                len: view.rows.len(),
            }),
            Some(_) => Ok(()),
        };
        if result.is_ok() {
            self.selection = Some(index);
            self.surface.show_selection(self.selection);
        }
        self.report(result)
    }

    /// Moves the selection by one row, starting from the top when nothing is selected.
    pub fn step_selection(&mut self, forward: bool) -> Option<usize> {
        let len = self.view.as_ref().map_or(0, |view| view.rows.len());
        if len == 0 {
            return None;
        }
        let next = match (self.selection, forward) {
            (None, _) => 0,
            (Some(current), true) => (current + 1).min(len - 1),
            (Some(current), false) => current.saturating_sub(1),
        };
        self.selection = Some(next);
        self.surface.show_selection(self.selection);
        self.selection
    }

    pub fn open_create_form(&mut self) -> Result<(), BrowserError> {
        let result = self.build_create_form();
        let result = result.map(|form| self.install_form(form));
        self.report(result)
    }

    pub fn open_edit_form(&mut self) -> Result<(), BrowserError> {
        let result = self.build_edit_form();
        let result = result.map(|form| self.install_form(form));
        self.report(result)
    }

    /// Applies an edit to the open form's fields and redraws it.
    pub fn edit_form(&mut self, edit: impl FnOnce(&mut FieldSet)) -> Result<(), BrowserError> {
        let Some(form) = self.form.as_mut() else {
            return self.report(Err(BrowserError::NoOpenForm));
        };
        edit(&mut form.fields);
        self.surface.show_form(form);
        Ok(())
    }

    pub fn close_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        let closed = form.id;
        self.deferred
            .retain(|action| *action != DeferredAction::CloseForm(closed));
        self.surface.close_form();
        debug!(form = closed.0, "form closed");
    }

    pub async fn submit_form(&mut self) -> Result<SubmitOutcome, BrowserError> {
        self.submit_form_at(Instant::now()).await
    }

    pub async fn submit_form_at(&mut self, now: Instant) -> Result<SubmitOutcome, BrowserError> {
        let Some(form) = self.form.as_mut() else {
            return self.report(Err(BrowserError::NoOpenForm));
        };
        if form.settled {
            return Ok(SubmitOutcome::Ignored);
        }

        form.advance(MutationPhase::Validating);
        let values = match form.fields.collect() {
            Ok(values) => values,
            Err(error) => {
                form.advance(MutationPhase::Rejected);
                let message = error.to_string();
                self.settle_form(Severity::Error, message.clone(), now);
                return Ok(SubmitOutcome::Rejected(message));
            }
        };

        form.advance(MutationPhase::Submitting);
        let table = form.table.clone();
        let columns = form.fields.labels();
        let mode = form.mode;
        let key_index = form.key_index;

        let mutator = RecordMutator::new(&self.store, &self.catalog);
        let result = match mode {
            FormMode::Create => mutator
                .create(&table, &columns, &values)
                .await
                .map(|()| "Record created successfully!".to_string()),
            FormMode::Edit => match UpdatePlan::split(&columns, &values, key_index) {
                Ok(plan) => mutator
                    .update(&table, &plan)
                    .await
                    .map(|_| "Record updated successfully!".to_string()),
                Err(error) => Err(MutationError::from(error)),
            },
        };

        match result {
            Ok(message) => {
                info!(table, ?mode, "record saved");
                self.advance_form(MutationPhase::Succeeded);
                self.settle_form(Severity::Info, message.clone(), now);
                let reloaded = self.load_table(&table).await;
                let _ = self.report(reloaded);
                Ok(SubmitOutcome::Succeeded(message))
            }
            Err(error) => {
                self.advance_form(MutationPhase::Failed);
                let message = error.user_message();
                self.settle_form(Severity::Error, message.clone(), now);
                Ok(SubmitOutcome::Failed(message))
            }
        }
    }

    /// Deletes the selected record, or asks for confirmation first when configured to.
    pub async fn request_delete(&mut self) -> Result<DeleteOutcome, BrowserError> {
        let (table, key) = match self.selected_key() {
            Ok(target) => target,
            Err(error) => return self.report(Err(error)),
        };

        if self.settings.confirm_delete {
            let prompt = DeletePrompt { table, key };
            self.surface.show_delete_prompt(Some(&prompt));
            self.pending_delete = Some(prompt);
            return Ok(DeleteOutcome::AwaitingConfirmation);
        }

        let result = self.perform_delete(&table, &key).await;
        self.report(result).map(DeleteOutcome::Deleted)
    }

    pub async fn confirm_delete(&mut self) -> Result<u64, BrowserError> {
        let Some(prompt) = self.pending_delete.take() else {
            return self.report(Err(BrowserError::NoPendingDelete));
        };
        self.surface.show_delete_prompt(None);
        let result = self.perform_delete(&prompt.table, &prompt.key).await;
        self.report(result)
    }

    pub fn cancel_delete(&mut self) {
        if self.pending_delete.take().is_some() {
            self.surface.show_delete_prompt(None);
        }
    }

    /// Runs every deferred action due at `now`; actions whose target is gone do nothing.
    pub fn tick(&mut self, now: Instant) {
        for action in self.deferred.drain_due(now) {
            match action {
                DeferredAction::DismissNotice(id) => {
                    if self.browser_notice == Some(id) {
                        self.browser_notice = None;
                        self.surface.dismiss_notice(id);
                    }
                }
                DeferredAction::CloseForm(id) => {
                    if self.form.as_ref().is_some_and(|form| form.id == id) {
                        self.close_form();
                    } else {
                        trace!(form = id.0, "deferred close for a form that is gone");
                    }
                }
            }
        }
    }

    async fn load_table(&mut self, name: &str) -> Result<(), BrowserError> {
        let data = self.fetch(name).await?;
        let total_rows = data.rows.len();
        self.active_table = Some(name.to_string());
        self.render(TableView {
            table: name.to_string(),
            columns: data.columns,
            rows: data.rows,
            search_term: None,
            total_rows,
        });
        Ok(())
    }

    async fn apply_search(&mut self, term: &str) -> Result<usize, BrowserError> {
        let table = self
            .active_table
            .clone()
            .ok_or(BrowserError::NoActiveTable)?;
        let term = term.trim();
        if term.is_empty() {
            self.load_table(&table).await?;
            return Ok(self.view.as_ref().map_or(0, |view| view.rows.len()));
        }

        let data = self.fetch(&table).await?;
        let total_rows = data.rows.len();
        let rows = filter(&data.rows, term);
        let matches = rows.len();
        debug!(table, term, matches, total_rows, "search applied");
        self.render(TableView {
            table,
            columns: data.columns,
            rows,
            search_term: Some(term.to_string()),
            total_rows,
        });
        Ok(matches)
    }

    async fn fetch(&self, table: &str) -> Result<TableData, BrowserError> {
        let data = self
            .store
            .fetch_all(table)
            .await
            .map_err(|source| BrowserError::Load {
                table: table.to_string(),
                source,
            })?;
        if let Some((row, actual)) = data.first_misaligned_row() {
            warn!(table, row, actual, expected = data.columns.len(), "misaligned row");
            return Err(BrowserError::Misaligned {
                table: table.to_string(),
                expected: data.columns.len(),
                actual,
            });
        }
        debug!(table, rows = data.rows.len(), "table fetched");
        Ok(data)
    }

    // Every rebuild of the displayed set drops the selection and any pending delete.
    fn render(&mut self, view: TableView) {
        self.selection = None;
        if self.pending_delete.take().is_some() {
            self.surface.show_delete_prompt(None);
        }
        self.surface.show_rows(&view);
        self.surface.show_selection(None);
        self.view = Some(view);
    }

    fn key_index(&self, table: &str, columns: &[String]) -> usize {
        let resolution = self.catalog.resolve_primary_key(table, columns);
        if resolution == KeyResolution::Positional {
            warn!(table, "no declared primary key among the columns, using the first column");
        }
        resolution.index()
    }

    fn selected_key(&self) -> Result<(String, RowKey), BrowserError> {
        let view = self.view.as_ref().ok_or(BrowserError::NoActiveTable)?;
        let index = self.selection.ok_or(BrowserError::NoSelection)?;
        let record = view
            .rows
            .get(index)
            .ok_or(BrowserError::SelectionOutOfRange {
                index,
                len: view.rows.len(),
            })?;
        let key_index = self.key_index(&view.table, &view.columns);
        let (Some(column), Some(value)) = (view.columns.get(key_index), record.get(key_index))
        else {
            return Err(BrowserError::Misaligned {
                table: view.table.clone(),
                expected: view.columns.len(),
                actual: record.len(),
            });
        };
        Ok((view.table.clone(), RowKey::new(column.clone(), value)))
    }

    fn build_create_form(&mut self) -> Result<FormSession, BrowserError> {
        let view = self.view.as_ref().ok_or(BrowserError::NoActiveTable)?;
        let key_index = self.key_index(&view.table, &view.columns);
        let table = view.table.clone();
        let fields = FieldSet::for_create(&view.columns);
        Ok(FormSession {
            id: self.issue_form_id(),
            table,
            mode: FormMode::Create,
            fields,
            key_index,
            phase: MutationPhase::Idle,
            notice: None,
            settled: false,
        })
    }

    fn build_edit_form(&mut self) -> Result<FormSession, BrowserError> {
        let view = self.view.as_ref().ok_or(BrowserError::NoActiveTable)?;
        let index = self.selection.ok_or(BrowserError::NoSelection)?;
        let record = view
            .rows
            .get(index)
            .ok_or(BrowserError::SelectionOutOfRange {
                index,
                len: view.rows.len(),
            })?;
        let key_index = self.key_index(&view.table, &view.columns);
        let fields = FieldSet::for_edit(&view.columns, record, Some(key_index))?;
        let table = view.table.clone();
        Ok(FormSession {
            id: self.issue_form_id(),
            table,
            mode: FormMode::Edit,
            fields,
            key_index,
            phase: MutationPhase::Idle,
            notice: None,
            settled: false,
        })
    }

    fn issue_form_id(&mut self) -> FormId {
        self.next_form_id = self.next_form_id.saturating_add(1);
        FormId(self.next_form_id)
    }

    fn install_form(&mut self, form: FormSession) {
        self.close_form();
        debug!(form = form.id.0, table = form.table, mode = ?form.mode, "form opened");
        self.surface.show_form(&form);
        self.form = Some(form);
    }

    fn advance_form(&mut self, next: MutationPhase) {
        if let Some(form) = self.form.as_mut() {
            form.advance(next);
        }
    }

    // Shows the attempt's outcome inside the form and returns it to Idle.
    fn settle_form(&mut self, severity: Severity, text: String, now: Instant) {
        let notice = self.notice_ids.issue(severity, NoticeScope::Form, text);
        let Some(form) = self.form.as_mut() else {
            return;
        };
        form.advance(MutationPhase::Idle);
        if severity == Severity::Info {
            form.settled = true;
            self.deferred.schedule(
                now + self.settings.notice_delay(),
                DeferredAction::CloseForm(form.id),
            );
        }
        form.notice = Some(notice);
        self.surface.show_form(form);
    }

    fn notify(&mut self, severity: Severity, text: String) {
        let notice = self.notice_ids.issue(severity, NoticeScope::Browser, text);
        if severity == Severity::Info {
            self.deferred.schedule(
                Instant::now() + self.settings.notice_delay(),
                DeferredAction::DismissNotice(notice.id),
            );
        }
        self.browser_notice = Some(notice.id);
        self.surface.show_notice(&notice);
    }

    fn report<T>(&mut self, result: Result<T, BrowserError>) -> Result<T, BrowserError> {
        if let Err(error) = &result {
            debug!(%error, "browser operation failed");
            self.notify(error.severity(), error.to_string());
        }
        result
    }

    async fn perform_delete(&mut self, table: &str, key: &RowKey) -> Result<u64, BrowserError> {
        let affected = RecordMutator::new(&self.store, &self.catalog)
            .delete(table, key)
            .await?;
        self.load_table(table).await?;
        if affected == 0 {
            self.notify(Severity::Info, format!("No record matched {key}."));
        } else {
            info!(table, %key, "record deleted");
            self.notify(Severity::Info, "Record deleted successfully!".to_string());
        }
        Ok(affected)
    }
}
