//! Theme preference persisted alongside the session.

use serde::{Deserialize, Serialize};

use crate::store::{KEY_THEME, SessionStore};

/// UI color scheme. Dark is the product default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// The persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Loads the saved preference; unknown or absent values fall back to
    /// the default.
    pub fn load(store: &SessionStore) -> Self {
        match store.get(KEY_THEME).as_deref() {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    /// Persists this preference.
    pub fn save(self, store: &SessionStore) {
        store.set(KEY_THEME, self.as_str());
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}
