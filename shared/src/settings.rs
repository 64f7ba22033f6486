use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemePreference {
    #[default]
    FollowSystem,
    Light,
    Dark,
}

/// Persisted user preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: ThemePreference,
}

impl Preferences {
    /// The system scheme only applies while the user has not chosen one.
    #[must_use]
    pub const fn dark_mode(&self, system_dark: bool) -> bool {
        match self.theme {
            ThemePreference::FollowSystem => system_dark,
            ThemePreference::Light => false,
            ThemePreference::Dark => true,
        }
    }

    /// Flips whatever is currently shown and pins it as an explicit choice.
    pub fn toggle_dark_mode(&mut self, system_dark: bool) {
        self.theme = if self.dark_mode(system_dark) {
            ThemePreference::Light
        } else {
            ThemePreference::Dark
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_system_tracks_system_scheme() {
        let prefs = Preferences::default();
        assert!(prefs.dark_mode(true));
        assert!(!prefs.dark_mode(false));
    }

    #[test]
    fn test_explicit_choice_ignores_system() {
        let prefs = Preferences {
            theme: ThemePreference::Dark,
        };
        assert!(prefs.dark_mode(false));
        let prefs = Preferences {
            theme: ThemePreference::Light,
        };
        assert!(!prefs.dark_mode(true));
    }

    #[test]
    fn test_toggle_pins_opposite_of_visible_theme() {
        let mut prefs = Preferences::default();
        prefs.toggle_dark_mode(true);
        assert_eq!(prefs.theme, ThemePreference::Light);
        prefs.toggle_dark_mode(true);
        assert_eq!(prefs.theme, ThemePreference::Dark);
    }
}
