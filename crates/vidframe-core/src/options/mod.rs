pub mod capture_panel;
pub mod sheet_panel;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use capture_panel::CaptureOptionsPanel;
pub use sheet_panel::SheetOptionsPanel;
pub use store::{Preferences, PreferencesStore};

/// Lifecycle of a settings-editing unit.
///
/// `load` refreshes the panel's in-memory values from durable settings;
/// `store` writes them back. Calling `load` then `store` with no edits in
/// between leaves the durable settings unchanged.
pub trait OptionsPanel {
    /// Persist the panel's current values.
    fn store(&self) -> Result<(), OptionsError>;

    /// Replace the panel's current values with the persisted ones.
    fn load(&mut self) -> Result<(), OptionsError>;

    /// Check the current values are acceptable for `store`.
    fn validate(&self) -> Result<(), OptionsError> {
        Ok(())
    }

    fn valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Store several panels as one edit: every panel is validated before any of
/// them writes, so a rejected value leaves the durable settings untouched.
pub fn store_all(panels: &[&dyn OptionsPanel]) -> Result<(), OptionsError> {
    for panel in panels {
        panel.validate()?;
    }
    for panel in panels {
        panel.store()?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to access preferences at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed preferences at {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_all_writes_nothing_when_any_panel_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("prefs.json"));

        let mut capture = CaptureOptionsPanel::new(store.clone());
        let mut sheet = SheetOptionsPanel::new(store.clone());
        capture.set_frame_count(7);
        sheet.set_columns(0);

        let err = store_all(&[&capture, &sheet]).unwrap_err();
        assert!(matches!(err, OptionsError::Invalid(_)));
        assert!(!store.path().exists());

        sheet.set_columns(3);
        store_all(&[&capture, &sheet]).unwrap();
        let prefs = store.read().unwrap();
        assert_eq!((prefs.frame_count, prefs.sheet_columns), (7, 3));
    }
}
