use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeScope {
    Browser,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoticeId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub severity: Severity,
    pub scope: NoticeScope,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Default)]
pub struct NoticeIds {
    next: u64,
}

impl NoticeIds {
    pub fn issue(
        &mut self,
        severity: Severity,
        scope: NoticeScope,
        text: impl Into<String>,
    ) -> Notice {
        self.next = self.next.saturating_add(1);
        Notice {
            id: NoticeId(self.next),
            severity,
            scope,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    DismissNotice(NoticeId),
    CloseForm(FormId),
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due_at: Instant,
    action: T,
}

/// One-shot actions run by the event loop once their deadline passes.
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    entries: Vec<Scheduled<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, due_at: Instant, action: T) {
        self.entries.push(Scheduled { due_at, action });
    }

    /// Removes and returns due actions, earliest first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.due_at <= now);
        self.entries = pending;
        due.sort_by_key(|entry| entry.due_at);
        due.into_iter().map(|entry| entry.action).collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|entry| keep(&entry.action));
    }
}
