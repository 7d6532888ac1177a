use chrono::NaiveDate;

use crate::date_label::{entry_heading, entry_label, long_date};
use crate::diary_entry::{DiaryEntry, EntryIndex};
use crate::save_status::SaveStatus;

pub const NO_ENTRIES_NOTICE: &str = "No entries yet. Start writing!";
pub const ENTRY_LOAD_ERROR: &str = "Error loading entry";
pub const INDEX_LOAD_ERROR: &str = "Error loading entries";

/// What the entry-list region currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryList {
    Loading,
    Loaded(Vec<NaiveDate>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub date: NaiveDate,
    pub label: String,
    pub active: bool,
}

/// Text above the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateHeading {
    /// Today's entry: the current date, re-read on every render.
    Live,
    Entry(NaiveDate),
}

/// Everything the page renders. Mutated only by the controller.
#[derive(Debug, Clone)]
pub struct DiaryState {
    current_date: Option<NaiveDate>,
    content: String,
    content_revision: u64,
    list: EntryList,
    list_revision: u64,
    status: SaveStatus,
    heading: DateHeading,
    notice: Option<String>,
}

impl Default for DiaryState {
    fn default() -> Self {
        DiaryState::new()
    }
}

impl DiaryState {
    pub fn new() -> Self {
        DiaryState {
            current_date: None,
            content: String::new(),
            content_revision: 0,
            list: EntryList::Loading,
            list_revision: 0,
            status: SaveStatus::Ready,
            heading: DateHeading::Live,
            notice: None,
        }
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Bumped whenever the content is replaced by a load rather than an edit,
    /// so the editor knows to reload its buffer.
    pub fn content_revision(&self) -> u64 {
        self.content_revision
    }

    /// Bumped whenever the entry list is replaced.
    pub fn list_revision(&self) -> u64 {
        self.list_revision
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn list(&self) -> &EntryList {
        &self.list
    }

    pub fn heading(&self) -> DateHeading {
        self.heading
    }

    /// The open entry, if one has been loaded.
    pub fn open_entry_snapshot(&self) -> Option<DiaryEntry> {
        self.current_date
            .map(|date| DiaryEntry::new(date, self.content.clone()))
    }

    pub fn is_known(&self, date: NaiveDate) -> bool {
        match &self.list {
            EntryList::Loaded(dates) => dates.contains(&date),
            _ => false,
        }
    }

    pub(crate) fn open(&mut self, entry: DiaryEntry, today: NaiveDate) {
        self.heading = if entry.date == today {
            DateHeading::Live
        } else {
            DateHeading::Entry(entry.date)
        };
        self.current_date = Some(entry.date);
        self.content = entry.content;
        self.content_revision += 1;
        self.notice = None;
    }

    pub(crate) fn edit(&mut self, content: String) {
        self.content = content;
    }

    pub(crate) fn set_status(&mut self, status: SaveStatus) {
        self.status = status;
    }

    pub(crate) fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub(crate) fn set_index(&mut self, index: EntryIndex) {
        self.list = EntryList::Loaded(index.entries);
        self.list_revision += 1;
    }

    pub(crate) fn index_failed(&mut self, message: impl Into<String>) {
        self.list = EntryList::Failed(message.into());
        self.list_revision += 1;
    }

    pub fn heading_text(&self, today: NaiveDate) -> String {
        match self.heading {
            DateHeading::Live => long_date(today),
            DateHeading::Entry(date) => entry_heading(date, today),
        }
    }

    /// One row per known entry, the open one marked active.
    pub fn rows(&self, today: NaiveDate) -> Vec<EntryRow> {
        let EntryList::Loaded(dates) = &self.list else {
            return Vec::new();
        };
        dates
            .iter()
            .map(|&date| EntryRow {
                date,
                label: entry_label(date, today),
                active: Some(date) == self.current_date,
            })
            .collect()
    }

    /// Message shown in place of the rows, if any.
    pub fn list_placeholder(&self) -> Option<&str> {
        match &self.list {
            EntryList::Loading => Some("Loading entries..."),
            EntryList::Loaded(dates) if dates.is_empty() => Some(NO_ENTRIES_NOTICE),
            EntryList::Loaded(_) => None,
            EntryList::Failed(message) => Some(message.as_str()),
        }
    }
}
