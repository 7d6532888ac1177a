//! Terminal diary client with debounced auto-save against a remote entry store.

pub mod app;
pub mod config;
pub mod controller;
pub mod date_label;
pub mod diary_entry;
pub mod diary_state;
pub mod editor;
pub mod save_status;
pub mod store;
pub mod telemetry;
pub mod ui;

pub use controller::{AutoSaveController, ControllerEvent, ControllerSettings, Flow};
pub use diary_entry::{DiaryEntry, EntryIndex};
pub use save_status::SaveStatus;
pub use store::{EntryStore, HttpEntryStore, StoreError};
