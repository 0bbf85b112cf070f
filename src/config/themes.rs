use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

impl ThemeName {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    names: HashSet<ThemeName>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.names.contains(theme)
    }

    /// Looks up a theme by its config name.
    pub fn resolve(&self, raw: &str) -> Option<ThemeName> {
        ThemeName::from_str(raw.trim())
            .ok()
            .filter(|theme| self.contains(theme))
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self {
            names: ThemeName::iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names_case_insensitively() {
        let registry = ThemeRegistry::default();
        assert_eq!(registry.resolve("dark"), Some(ThemeName::Dark));
        assert_eq!(registry.resolve(" Light "), Some(ThemeName::Light));
        assert_eq!(registry.resolve("solarized"), None);
    }

    #[test]
    fn toggling_flips_between_light_and_dark() {
        assert_eq!(ThemeName::Light.toggled(), ThemeName::Dark);
        assert!(ThemeName::Light.toggled().is_dark());
        assert_eq!(ThemeName::Dark.toggled(), ThemeName::Light);
    }
}
