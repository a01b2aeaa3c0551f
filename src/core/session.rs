use serde::Serialize;

use super::models::{CanonicalRecord, SelectedFile};

pub const NO_FILE_SELECTED: &str = "No file selected";
pub const UPLOAD_FAILED: &str = "Upload failed";
pub const DETAIL_FAILED: &str = "Could not load details";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Upload,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    FileSelected(SelectedFile),
    Submitting(SelectedFile),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailModal {
    Closed,
    Open(CanonicalRecord),
}

/// Monotonic ticket handed out for every notice and every async request.
/// A completion carrying anything but the newest ticket for its slot is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    Files(Vec<SelectedFile>),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    Start(SelectedFile),
    NoFile(Ticket),
    AlreadySubmitting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub upload: UploadPhase,
    pub tab: Tab,
    pub active_result: Option<CanonicalRecord>,
    pub detail: DetailModal,
    pub notice: Option<Notice>,
    pub history: Vec<CanonicalRecord>,
    /// Why the latest listing fetch failed; cleared when a new one starts.
    pub history_error: Option<String>,
    next_ticket: u64,
    pending_detail: Option<Ticket>,
    pending_history: Option<Ticket>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            upload: UploadPhase::Idle,
            tab: Tab::Upload,
            active_result: None,
            detail: DetailModal::Closed,
            notice: None,
            history: Vec::new(),
            history_error: None,
            next_ticket: 0,
            pending_detail: None,
            pending_history: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        match &self.upload {
            UploadPhase::Idle => None,
            UploadPhase::FileSelected(file) | UploadPhase::Submitting(file) => Some(file),
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.upload, UploadPhase::Submitting(_))
    }

    pub fn is_loading_history(&self) -> bool {
        self.pending_history.is_some()
    }

    /// Picker or drop selection. Ignored while an upload is in flight.
    pub fn select_file(&mut self, file: SelectedFile) -> bool {
        if self.is_submitting() {
            return false;
        }

        self.upload = UploadPhase::FileSelected(file);
        true
    }

    /// Only the first file of a file drop is taken; anything else is a no-op.
    pub fn drop_payload(&mut self, payload: DropPayload) -> bool {
        match payload {
            DropPayload::Files(files) => match files.into_iter().next() {
                Some(file) => self.select_file(file),
                None => false,
            },
            DropPayload::Text(_) | DropPayload::Empty => false,
        }
    }

    pub fn begin_submit(&mut self) -> SubmitDecision {
        match std::mem::replace(&mut self.upload, UploadPhase::Idle) {
            UploadPhase::Idle => SubmitDecision::NoFile(self.raise_notice(NO_FILE_SELECTED)),
            UploadPhase::Submitting(file) => {
                self.upload = UploadPhase::Submitting(file);
                SubmitDecision::AlreadySubmitting
            }
            UploadPhase::FileSelected(file) => {
                self.upload = UploadPhase::Submitting(file.clone());
                SubmitDecision::Start(file)
            }
        }
    }

    /// Clears the selection and shows the result; the active tab is untouched.
    pub fn finish_submit_ok(&mut self, record: CanonicalRecord) {
        self.upload = UploadPhase::Idle;
        self.active_result = Some(record);
    }

    pub fn finish_submit_err(&mut self) -> Ticket {
        if let UploadPhase::Submitting(file) = std::mem::replace(&mut self.upload, UploadPhase::Idle)
        {
            self.upload = UploadPhase::FileSelected(file);
        }

        self.raise_notice(UPLOAD_FAILED)
    }

    /// Replaces any visible notice; the previous notice's expiry becomes stale.
    pub fn raise_notice(&mut self, message: impl Into<String>) -> Ticket {
        let ticket = self.issue_ticket();
        self.notice = Some(Notice {
            message: message.into(),
            ticket,
        });
        ticket
    }

    pub fn expire_notice(&mut self, ticket: Ticket) -> bool {
        if self.notice.as_ref().is_some_and(|n| n.ticket == ticket) {
            self.notice = None;
            return true;
        }

        false
    }

    pub fn begin_detail(&mut self) -> Ticket {
        let ticket = self.issue_ticket();
        self.pending_detail = Some(ticket);
        ticket
    }

    pub fn finish_detail(&mut self, ticket: Ticket, record: CanonicalRecord) -> bool {
        if self.pending_detail != Some(ticket) {
            return false;
        }

        self.pending_detail = None;
        self.detail = DetailModal::Open(record);
        true
    }

    /// Returns whether the failed request was still the one being waited on.
    pub fn fail_detail(&mut self, ticket: Ticket) -> bool {
        if self.pending_detail != Some(ticket) {
            return false;
        }

        self.pending_detail = None;
        true
    }

    pub fn close_detail(&mut self) {
        self.pending_detail = None;
        self.detail = DetailModal::Closed;
    }

    /// Dismisses the inline result, optionally jumping to the history view.
    pub fn close_result(&mut self, to_history: bool) -> Option<Ticket> {
        self.active_result = None;
        if to_history {
            self.switch_tab(Tab::History)
        } else {
            None
        }
    }

    /// Entering the history view starts a fresh listing fetch; leaving it
    /// abandons any listing still in flight.
    pub fn switch_tab(&mut self, tab: Tab) -> Option<Ticket> {
        if self.tab == tab {
            return None;
        }

        self.tab = tab;
        match tab {
            Tab::History => Some(self.begin_history_fetch()),
            Tab::Upload => {
                self.leave_history_view();
                None
            }
        }
    }

    pub fn begin_history_fetch(&mut self) -> Ticket {
        let ticket = self.issue_ticket();
        self.pending_history = Some(ticket);
        self.history_error = None;
        ticket
    }

    pub fn finish_history(&mut self, ticket: Ticket, rows: Vec<CanonicalRecord>) -> bool {
        if self.pending_history != Some(ticket) {
            return false;
        }

        self.pending_history = None;
        self.history = rows;
        true
    }

    /// Keeps the previous rows; the failure is recorded next to them.
    pub fn fail_history(&mut self, ticket: Ticket, reason: impl Into<String>) -> bool {
        if self.pending_history != Some(ticket) {
            return false;
        }

        self.pending_history = None;
        self.history_error = Some(reason.into());
        true
    }

    pub fn leave_history_view(&mut self) {
        self.pending_history = None;
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }
}
