//! The auto-save controller.
//!
//! Keeps one diary entry open, pushes edits to the store after a quiet
//! period, and tracks save status. All state changes go through
//! [`AutoSaveController::dispatch`], one event at a time; timers and
//! background saves report back by queueing further events.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::DiaryConfig;
use crate::date_label::local_today;
use crate::diary_entry::{DiaryEntry, EntryIndex};
use crate::diary_state::{DiaryState, ENTRY_LOAD_ERROR, INDEX_LOAD_ERROR};
use crate::save_status::SaveStatus;
use crate::store::{EntryStore, StoreError};

const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum ControllerEvent {
    /// The editor text changed; carries the full new text.
    ContentEdited(String),
    EntrySelected(NaiveDate),
    /// The debounce timer for `generation` expired.
    SaveDue { generation: u64 },
    SaveFinished {
        ticket: SaveTicket,
        outcome: Result<(), StoreError>,
    },
    /// The "saved" indicator for save `sequence` has been shown long enough.
    StatusResetDue { sequence: u64 },
    /// A background re-fetch of the entry index completed.
    IndexLoaded(Result<EntryIndex, StoreError>),
    Exit,
}

/// A save that has been sent: what was sent and in which order.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub sequence: u64,
    pub entry: DiaryEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub save_delay: Duration,
    pub saved_reset: Duration,
    pub save_retries: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings::from(&DiaryConfig::default())
    }
}

impl From<&DiaryConfig> for ControllerSettings {
    fn from(config: &DiaryConfig) -> Self {
        ControllerSettings {
            save_delay: config.save_delay(),
            saved_reset: config.saved_reset(),
            save_retries: config.save_retries,
        }
    }
}

struct PendingSave {
    generation: u64,
    task: JoinHandle<()>,
}

pub struct AutoSaveController<S: EntryStore> {
    store: Arc<S>,
    settings: ControllerSettings,
    state: DiaryState,
    pending_save: Option<PendingSave>,
    in_flight: Vec<JoinHandle<()>>,
    /// The last save of the open entry failed and nothing newer is queued.
    save_failed: bool,
    refreshing_index: bool,
    timer_generation: u64,
    save_sequence: u64,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: UnboundedReceiver<ControllerEvent>,
    today: fn() -> NaiveDate,
}

impl<S: EntryStore> AutoSaveController<S> {
    pub fn new(store: Arc<S>, settings: ControllerSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        AutoSaveController {
            store,
            settings,
            state: DiaryState::new(),
            pending_save: None,
            in_flight: Vec::new(),
            save_failed: false,
            refreshing_index: false,
            timer_generation: 0,
            save_sequence: 0,
            events_tx,
            events_rx,
            today: local_today,
        }
    }

    /// Replaces the clock used to decide which entry is "today".
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> &DiaryState {
        &self.state
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending_save.is_some()
    }

    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    /// Loads today's entry and the entry index.
    pub async fn initialize(&mut self) {
        match self.store.today().await {
            Ok(entry) => {
                info!(date = %entry.date, "opened today's entry");
                let today = self.today();
                self.state.open(entry, today);
                self.state.set_status(SaveStatus::Ready);
            }
            Err(err) => {
                error!(error = %err, "failed to load today's entry");
                self.state.set_status(SaveStatus::Error);
                self.state.set_notice(ENTRY_LOAD_ERROR);
            }
        }

        let index = self.store.entries().await;
        if !self.apply_index(index) {
            self.state.set_status(SaveStatus::Error);
        }
    }

    pub async fn dispatch(&mut self, event: ControllerEvent) -> Flow {
        match event {
            ControllerEvent::ContentEdited(text) => self.on_content_edited(text),
            ControllerEvent::EntrySelected(date) => self.switch_to_entry(date).await,
            ControllerEvent::SaveDue { generation } => self.on_save_due(generation),
            ControllerEvent::SaveFinished { ticket, outcome } => self.finish_save(ticket, outcome),
            ControllerEvent::StatusResetDue { sequence } => self.on_status_reset(sequence),
            ControllerEvent::IndexLoaded(index) => {
                self.refreshing_index = false;
                self.apply_index(index);
            }
            ControllerEvent::Exit => {
                self.flush_on_exit().await;
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    pub fn on_content_edited(&mut self, text: String) {
        self.state.edit(text);
        self.state.set_status(SaveStatus::Saving);
        self.schedule_save();
    }

    /// Saves the open entry and waits for the outcome. Returns whether the
    /// store accepted it.
    pub async fn persist_current_entry(&mut self) -> bool {
        let Some(ticket) = self.issue_ticket() else {
            return false;
        };
        let outcome = save_with_retries(
            self.store.as_ref(),
            &ticket.entry,
            self.settings.save_retries,
        )
        .await;
        let saved = outcome.is_ok();
        self.finish_save(ticket, outcome);
        saved
    }

    /// Opens the entry for `date`. Unsaved edits are flushed first; if that
    /// flush fails the current entry stays open with the error shown.
    pub async fn switch_to_entry(&mut self, date: NaiveDate) {
        let unsaved = self.cancel_pending_save() || self.save_failed;
        if unsaved && self.state.current_date().is_some() {
            debug!("flushing unsaved edits before switching entries");
            if !self.persist_current_entry().await {
                warn!(%date, "unsaved edits could not be flushed, staying on current entry");
                return;
            }
        }

        if self.state.current_date() == Some(date) {
            debug!(%date, "entry already open");
            return;
        }

        match self.store.entry(date).await {
            Ok(entry) => {
                info!(date = %entry.date, "switched entry");
                let today = self.today();
                self.state.open(entry, today);
                self.state.set_status(SaveStatus::Ready);
                self.save_failed = false;
            }
            Err(err) => {
                error!(%date, error = %err, "failed to load entry");
            }
        }
    }

    /// Waits for saves already in flight, then sends any unsaved edit
    /// before shutdown.
    pub async fn flush_on_exit(&mut self) {
        let in_flight = std::mem::take(&mut self.in_flight);
        if !in_flight.is_empty() {
            info!(count = in_flight.len(), "waiting for in-flight saves");
        }
        for task in in_flight {
            if let Err(err) = task.await {
                error!(error = %err, "save task did not complete");
            }
        }
        while let Ok(event) = self.events_rx.try_recv() {
            if let ControllerEvent::SaveFinished { ticket, outcome } = event {
                self.finish_save(ticket, outcome);
            }
        }

        if self.cancel_pending_save() || self.save_failed {
            info!("flushing unsaved edits on exit");
            self.persist_current_entry().await;
        }
    }

    fn schedule_save(&mut self) {
        self.cancel_pending_save();
        self.timer_generation += 1;
        let generation = self.timer_generation;
        let deadline = Instant::now() + self.settings.save_delay;
        let events = self.events_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = events.send(ControllerEvent::SaveDue { generation });
        });
        self.pending_save = Some(PendingSave { generation, task });
    }

    fn cancel_pending_save(&mut self) -> bool {
        match self.pending_save.take() {
            Some(pending) => {
                pending.task.abort();
                true
            }
            None => false,
        }
    }

    fn on_save_due(&mut self, generation: u64) {
        if self.pending_save.as_ref().map(|pending| pending.generation) != Some(generation) {
            debug!(generation, "ignoring superseded save timer");
            return;
        }
        self.pending_save = None;

        let Some(ticket) = self.issue_ticket() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();
        let retries = self.settings.save_retries;
        let task = tokio::spawn(async move {
            let outcome = save_with_retries(store.as_ref(), &ticket.entry, retries).await;
            let _ = events.send(ControllerEvent::SaveFinished { ticket, outcome });
        });
        self.in_flight.retain(|task| !task.is_finished());
        self.in_flight.push(task);
    }

    fn issue_ticket(&mut self) -> Option<SaveTicket> {
        let Some(entry) = self.state.open_entry_snapshot() else {
            warn!("no entry open, nothing to save");
            self.state.set_status(SaveStatus::Error);
            return None;
        };
        self.save_sequence += 1;
        debug!(sequence = self.save_sequence, date = %entry.date, "sending save");
        Some(SaveTicket {
            sequence: self.save_sequence,
            entry,
        })
    }

    fn finish_save(&mut self, ticket: SaveTicket, outcome: Result<(), StoreError>) {
        // Older saves and saves overtaken by a newer edit don't own the indicator.
        let owns_status = ticket.sequence == self.save_sequence && self.pending_save.is_none();
        if owns_status {
            self.save_failed =
                outcome.is_err() && self.state.current_date() == Some(ticket.entry.date);
        }

        match outcome {
            Ok(()) => {
                info!(date = %ticket.entry.date, sequence = ticket.sequence, "entry saved");
                if owns_status {
                    self.state.set_status(SaveStatus::Saved);
                    self.schedule_status_reset(ticket.sequence);
                }
                if !self.state.is_known(ticket.entry.date) && !ticket.entry.is_blank() {
                    self.refresh_index();
                }
            }
            Err(err) => {
                error!(
                    date = %ticket.entry.date,
                    sequence = ticket.sequence,
                    error = %err,
                    "failed to save entry"
                );
                if owns_status {
                    self.state.set_status(SaveStatus::Error);
                }
            }
        }
    }

    fn schedule_status_reset(&self, sequence: u64) {
        let deadline = Instant::now() + self.settings.saved_reset;
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = events.send(ControllerEvent::StatusResetDue { sequence });
        });
    }

    fn on_status_reset(&mut self, sequence: u64) {
        if self.state.status() == SaveStatus::Saved && sequence == self.save_sequence {
            self.state.set_status(SaveStatus::Ready);
        }
    }

    /// Re-fetches the entry index in the background; the result comes back
    /// as [`ControllerEvent::IndexLoaded`].
    fn refresh_index(&mut self) {
        if self.refreshing_index {
            return;
        }
        self.refreshing_index = true;
        debug!("refreshing entry index");
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let index = store.entries().await;
            let _ = events.send(ControllerEvent::IndexLoaded(index));
        });
    }

    fn apply_index(&mut self, index: Result<EntryIndex, StoreError>) -> bool {
        match index {
            Ok(index) => {
                debug!(count = index.entries.len(), "loaded entry index");
                self.state.set_index(index);
                true
            }
            Err(err) => {
                error!(error = %err, "failed to load entry index");
                self.state.index_failed(INDEX_LOAD_ERROR);
                false
            }
        }
    }
}

impl<S: EntryStore> Drop for AutoSaveController<S> {
    fn drop(&mut self) {
        self.cancel_pending_save();
    }
}

async fn save_with_retries<S: EntryStore + ?Sized>(
    store: &S,
    entry: &DiaryEntry,
    retries: u32,
) -> Result<(), StoreError> {
    let mut attempt = 0;
    loop {
        match store.save(entry).await {
            Ok(()) => return Ok(()),
            Err(err) if attempt < retries => {
                attempt += 1;
                warn!(date = %entry.date, attempt, error = %err, "save failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }
}
