use tracing::debug;

use super::{OptionsError, OptionsPanel, Preferences, PreferencesStore};

/// Upper bound on contact sheet columns.
pub const MAX_SHEET_COLUMNS: u32 = 16;

/// Layout settings for rendered contact sheets.
pub struct SheetOptionsPanel {
    store: PreferencesStore,
    columns: u32,
}

impl SheetOptionsPanel {
    pub fn new(store: PreferencesStore) -> Self {
        Self {
            store,
            columns: Preferences::default().sheet_columns,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn set_columns(&mut self, columns: u32) {
        self.columns = columns;
    }
}

impl OptionsPanel for SheetOptionsPanel {
    fn store(&self) -> Result<(), OptionsError> {
        self.validate()?;
        self.store.update(|prefs| prefs.sheet_columns = self.columns)?;
        Ok(())
    }

    fn load(&mut self) -> Result<(), OptionsError> {
        let columns = self.store.read()?.sheet_columns;
        check_columns(columns)?;
        self.columns = columns;
        debug!(columns, "sheet options loaded");
        Ok(())
    }

    fn validate(&self) -> Result<(), OptionsError> {
        check_columns(self.columns)
    }
}

fn check_columns(columns: u32) -> Result<(), OptionsError> {
    if !(1..=MAX_SHEET_COLUMNS).contains(&columns) {
        return Err(OptionsError::Invalid(format!(
            "sheet columns must be between 1 and {MAX_SHEET_COLUMNS}, got {columns}"
        )));
    }
    Ok(())
}
