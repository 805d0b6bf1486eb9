//! Keyed display model
//!
//! The controller does not draw anything itself. Each `display()` pass
//! reconciles a [`DisplayModel`] against the current state: entries are keyed
//! by a stable id, new ids *enter*, existing ids are *updated* in place and ids
//! that disappeared *exit*. A pass over unchanged state therefore enters and
//! exits nothing, and the frontend can keep per-entry widget state keyed by
//! the same ids.
//!
//! # Main Types
//!
//! - [`KeyedList`] - Ordered, id-keyed list with enter/update/exit reconciliation
//! - [`DisplayModel`] - Stat blocks, detail blocks, preview entries and run toggles
//! - [`RenderReport`] - What the last reconciliation pass changed

use crate::state::RunStatus;

// ==================== Keyed List ====================

/// What one reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl Reconciled {
    fn add(&mut self, other: Reconciled) {
        self.entered += other.entered;
        self.updated += other.updated;
        self.exited += other.exited;
    }
}

/// Ordered list of entries keyed by id
#[derive(Debug, Clone)]
pub struct KeyedList<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> KeyedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against `data`, keeping the order of `data`.
    ///
    /// `enter` builds an entry for a new key; `update` refreshes an entry whose
    /// key already existed. Entries whose key is absent from `data` are dropped.
    pub fn reconcile<D, K, E, U>(&mut self, data: &[D], key: K, mut enter: E, mut update: U) -> Reconciled
    where
        K: Fn(&D) -> String,
        E: FnMut(&D) -> T,
        U: FnMut(&mut T, &D),
    {
        let mut report = Reconciled::default();
        let mut previous = std::mem::take(&mut self.entries);

        for item in data {
            let k = key(item);
            if self.entries.iter().any(|(existing, _)| *existing == k) {
                continue;
            }
            match previous.iter().position(|(existing, _)| *existing == k) {
                Some(index) => {
                    let (_, mut entry) = previous.swap_remove(index);
                    update(&mut entry, item);
                    report.updated += 1;
                    self.entries.push((k, entry));
                }
                None => {
                    report.entered += 1;
                    self.entries.push((k, enter(item)));
                }
            }
        }

        report.exited = previous.len();
        report
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==================== Display Entries ====================

/// Summary stats of one loaded run
#[derive(Debug, Clone, PartialEq)]
pub struct StatBlock {
    pub run_id: String,
    pub label: String,
    pub color: Option<String>,
    /// `(field, formatted value)` for the allow-listed fields the run has
    pub fields: Vec<(String, String)>,
}

/// One detail chart
#[derive(Debug, Clone, PartialEq)]
pub struct DetailBlock {
    pub chart_id: String,
    pub label: String,
    pub disabled: bool,
    /// `(run id, message)` for runs that failed to load
    pub errors: Vec<(String, String)>,
    pub series_count: usize,
}

/// One preview list entry
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEntry {
    pub chart_id: String,
    pub label: String,
    pub disabled: bool,
}

/// One run toggle
#[derive(Debug, Clone, PartialEq)]
pub struct RunToggle {
    pub run_id: String,
    pub label: String,
    pub color: Option<String>,
    pub status: RunStatus,
}

impl RunToggle {
    pub fn checked(&self) -> bool {
        self.status.is_active()
    }

    pub fn loading(&self) -> bool {
        self.status == RunStatus::Loading
    }
}

/// Counters of the last `display()` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub stats: Reconciled,
    pub details: Reconciled,
    pub previews: Reconciled,
    pub toggles: Reconciled,
}

impl RenderReport {
    /// Sum over every list
    pub fn total(&self) -> Reconciled {
        let mut total = Reconciled::default();
        for part in [self.stats, self.details, self.previews, self.toggles] {
            total.add(part);
        }
        total
    }
}

/// What the frontend draws
#[derive(Debug, Clone, Default)]
pub struct DisplayModel {
    /// Page message, e.g. when no runs exist or the index failed to load
    pub message: Option<String>,
    pub stats: KeyedList<StatBlock>,
    pub details: KeyedList<DetailBlock>,
    pub previews: KeyedList<PreviewEntry>,
    pub toggles: KeyedList<RunToggle>,
    /// Chart the detail area should scroll to
    pub scroll_to: Option<String>,
    /// Number of completed `display()` passes
    pub renders: u64,
    pub last_report: RenderReport,
}

/// Format a stat value the way it is shown next to the run label
pub fn format_stat(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{:.4}", f)
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string(),
            None => n.to_string(),
        },
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
