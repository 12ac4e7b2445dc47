//! Rotation tracking for the file watch loop.
//!
//! The external rotation process writes the three credential files one after
//! another with no cross-file transaction. Reading after only one or two of
//! them changed would pair a new access key with an old secret, so the loop
//! waits until all three have been touched.
//!
//! ```text
//!   Idle ──touch──▶ PartiallyTouched ──touch last──▶ FullyTouched
//!    ▲                                                   │
//!    └──────────────── refresh (ok or error) ◀──────────┘
//! ```

use std::path::Path;

use notify::{Event, EventKind};

use super::CredentialField;
use crate::config::{FileSourceConfig, is_valid_file_name};

/// Set of credential files touched since the last refresh.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TouchedFiles(u8);

impl TouchedFiles {
    const COMPLETE: u8 = 0b111;

    fn bit(field: CredentialField) -> u8 {
        match field {
            CredentialField::AccessKey => 0b001,
            CredentialField::Secret => 0b010,
            CredentialField::Token => 0b100,
        }
    }

    pub fn insert(&mut self, field: CredentialField) {
        self.0 |= Self::bit(field);
    }

    pub fn contains(&self, field: CredentialField) -> bool {
        self.0 & Self::bit(field) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == Self::COMPLETE
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Where the watch loop stands in the current rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PartiallyTouched(TouchedFiles),
    FullyTouched,
}

/// Whether a filesystem event can signal a new credential file.
pub fn is_rotation_event(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Accumulates file touches until a full rotation has been observed.
#[derive(Debug, Default)]
pub struct RotationTracker {
    touched: TouchedFiles,
}

impl RotationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WatchState {
        if self.touched.is_empty() {
            WatchState::Idle
        } else if self.touched.is_complete() {
            WatchState::FullyTouched
        } else {
            WatchState::PartiallyTouched(self.touched)
        }
    }

    pub fn touch(&mut self, field: CredentialField) -> WatchState {
        self.touched.insert(field);
        self.state()
    }

    /// Mark every configured file whose name occurs in the final component
    /// of `path`, so temp siblings like `.role_token.tmp` count but the
    /// directory names above them do not.
    ///
    /// Returns true if at least one file was marked.
    pub fn observe_path(&mut self, path: &Path, config: &FileSourceConfig) -> bool {
        let Some(event_name) = path.file_name() else {
            return false;
        };
        let event_name = event_name.to_string_lossy();
        let mut matched = false;
        for field in CredentialField::ALL {
            let name = config.file_name(field);
            if !is_valid_file_name(name) {
                continue;
            }
            let name = Path::new(name)
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            if !name.is_empty() && event_name.contains(&*name) {
                self.touched.insert(field);
                matched = true;
            }
        }
        matched
    }

    /// Feed one filesystem event. Only create and modify events count.
    pub fn observe(&mut self, event: &Event, config: &FileSourceConfig) -> WatchState {
        if is_rotation_event(&event.kind) {
            for path in &event.paths {
                self.observe_path(path, config);
            }
        }
        self.state()
    }

    /// Back to idle after a refresh attempt.
    pub fn clear(&mut self) {
        self.touched = TouchedFiles::default();
    }
}
