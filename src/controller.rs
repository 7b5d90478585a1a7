//! Selection state and view snapshots for the machine list and detail panel.
//!
//! The controller is the only place that knows which machine is shown. Every
//! action runs to completion against the store before the snapshots it
//! affects are replaced, and every failure ends up as a [`Notice`] instead of
//! propagating into the UI code.
use std::path::Path;
use std::time::{Duration, Instant};

use crate::chart::ChartSeries;
use crate::entry_log::{self, EntryInput, NumberPolicy};
use crate::errors::AppError;
use crate::export::{self, ExportFormat};
use crate::registry;
use crate::store::{Entry, LocalStore, Machine};

/// Which machine the detail panel is bound to. There is no way back to
/// `NoSelection` once something has been picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    NoSelection,
    Selected(i64),
}

#[derive(Debug, Clone)]
pub struct MachineSummary {
    pub machine: Machine,
    pub entry_count: usize,
}

/// Everything the detail panel draws for the selected machine.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub machine: Machine,
    pub entries: Vec<Entry>,
    pub chart: ChartSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub shown_at: Instant,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }
}

pub struct ViewController {
    store: LocalStore,
    selection: Selection,
    machines: Vec<MachineSummary>,
    detail: Option<DetailView>,
    notice: Option<Notice>,
}

impl ViewController {
    pub fn new(store: LocalStore) -> Self {
        let mut controller = Self {
            store,
            selection: Selection::NoSelection,
            machines: Vec::new(),
            detail: None,
            notice: None,
        };
        controller.refresh_machine_list();
        controller
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn machines(&self) -> &[MachineSummary] {
        &self.machines
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Drop info notices older than `ttl`. Warnings and errors stay until
    /// dismissed.
    pub fn expire_notice(&mut self, ttl: Duration) {
        if let Some(n) = &self.notice {
            if n.level == NoticeLevel::Info && n.shown_at.elapsed() >= ttl {
                self.notice = None;
            }
        }
    }

    /// Re-read every machine and its entry count. Returns `false` when the
    /// read failed and an error notice was raised instead.
    pub fn refresh_machine_list(&mut self) -> bool {
        match self.load_summaries() {
            Ok(machines) => {
                self.machines = machines;
                true
            }
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    /// Show `id` in the detail panel.
    ///
    /// A missing machine clears the panel rather than leaving the previous
    /// machine's data on screen. Returns whether the detail view was loaded.
    pub fn select_machine(&mut self, id: i64) -> bool {
        self.selection = Selection::Selected(id);
        match self.load_detail(id) {
            Ok(detail) => {
                log::info!(
                    "Selected machine {id} ({}) with {} entries",
                    detail.machine.label,
                    detail.entries.len()
                );
                self.detail = Some(detail);
                true
            }
            Err(err) => {
                self.detail = None;
                self.report(err);
                false
            }
        }
    }

    /// Register a machine from the add-machine form. Returns the new id, or
    /// `None` when the input was cancelled or the operation failed.
    pub fn add_machine(&mut self, label: Option<&str>, image_path: Option<&Path>) -> Option<i64> {
        match registry::add_machine(&self.store, label, image_path) {
            Ok(Some(id)) => {
                if self.refresh_machine_list() {
                    self.notify(NoticeLevel::Info, "Machine added");
                }
                Some(id)
            }
            Ok(None) => {
                log::debug!("Add machine cancelled");
                None
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    /// Log an entry for the machine in the detail panel, then reload it.
    ///
    /// Only reachable with a loaded detail view; otherwise this is a no-op.
    pub fn add_entry(&mut self, input: &EntryInput, policy: NumberPolicy) -> Option<i64> {
        let Some(machine_id) = self.detail.as_ref().map(|d| d.machine.id) else {
            log::warn!("Add entry requested without a selected machine");
            return None;
        };
        match entry_log::add_entry(&self.store, machine_id, input, policy) {
            Ok(Some(id)) => {
                // The entry is stored either way; a failed reload keeps its
                // error notice.
                let shown = self.select_machine(machine_id);
                let listed = self.refresh_machine_list();
                if shown && listed {
                    self.notify(NoticeLevel::Info, "Entry saved");
                }
                Some(id)
            }
            Ok(None) => {
                log::debug!("Add entry cancelled");
                None
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    /// Export the selected machine's entries; the format follows the file
    /// extension.
    pub fn export_entries(&mut self, path: &Path) {
        let Some(detail) = &self.detail else {
            return;
        };
        let result = match ExportFormat::from_path(path) {
            ExportFormat::Csv => {
                export::save_entries_csv(path, &detail.entries).map_err(|e| e.to_string())
            }
            ExportFormat::Json => {
                export::save_entries_json(path, &detail.entries).map_err(|e| e.to_string())
            }
        };
        self.finish_export(path, result);
    }

    pub fn export_chart(&mut self, path: &Path) {
        let Some(detail) = &self.detail else {
            return;
        };
        let result = export::save_chart_png(path, &detail.machine.label, &detail.chart)
            .map_err(|e| e.to_string());
        self.finish_export(path, result);
    }

    fn finish_export(&mut self, path: &Path, result: Result<(), String>) {
        match result {
            Ok(()) => {
                log::info!("Exported to {}", path.display());
                self.notify(NoticeLevel::Info, format!("Saved {}", path.display()));
            }
            Err(msg) => self.report(AppError::Export(msg)),
        }
    }

    fn load_summaries(&self) -> Result<Vec<MachineSummary>, AppError> {
        registry::list_machines(&self.store)?
            .into_iter()
            .map(|machine| -> Result<MachineSummary, AppError> {
                let entry_count = self.store.count_entries_for_machine(machine.id)?;
                Ok(MachineSummary {
                    machine,
                    entry_count,
                })
            })
            .collect()
    }

    fn load_detail(&self, id: i64) -> Result<DetailView, AppError> {
        let machine = self.store.get_machine(id)?.ok_or(AppError::NotFound(id))?;
        let entries = entry_log::entries_for(&self.store, id)?;
        let chart = ChartSeries::from_entries(&entries);
        Ok(DetailView {
            machine,
            entries,
            chart,
        })
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notice = Some(Notice::new(level, message));
    }

    fn report(&mut self, err: AppError) {
        let level = if err.is_warning() {
            log::warn!("{err}");
            NoticeLevel::Warning
        } else {
            log::error!("{err}");
            NoticeLevel::Error
        };
        self.notify(level, err.to_string());
    }
}
