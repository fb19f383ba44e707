//! Lookback window configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named trailing span of observations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub name: String,
    /// Number of trailing observations the window covers
    pub observations: usize,
}

impl LookbackWindow {
    pub fn new(name: impl Into<String>, observations: usize) -> Self {
        Self {
            name: name.into(),
            observations,
        }
    }
}

/// Ordered, validated set of lookback windows.
///
/// The default assumes quarterly sampling. Other sampling frequencies only
/// need a different mapping, no code change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LookbackWindow>", into = "Vec<LookbackWindow>")]
pub struct WindowSet {
    windows: Vec<LookbackWindow>,
}

impl WindowSet {
    pub fn new(windows: Vec<LookbackWindow>) -> Result<Self, ConfigError> {
        if windows.is_empty() {
            return Err(ConfigError::EmptyWindowSet);
        }

        for (i, window) in windows.iter().enumerate() {
            if window.observations == 0 {
                return Err(ConfigError::ZeroLengthWindow {
                    name: window.name.clone(),
                });
            }
            if windows[..i].iter().any(|w| w.name == window.name) {
                return Err(ConfigError::DuplicateWindow {
                    name: window.name.clone(),
                });
            }
        }

        Ok(Self { windows })
    }

    /// Build from `(name, observations)` pairs
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, usize)>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, observations)| LookbackWindow::new(name, observations))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &LookbackWindow> {
        self.windows.iter()
    }

    pub fn get(&self, name: &str) -> Option<&LookbackWindow> {
        self.windows.iter().find(|w| w.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Default for WindowSet {
    fn default() -> Self {
        Self {
            windows: vec![
                LookbackWindow::new("Last Quarter", 1),
                LookbackWindow::new("Last Year", 4),
                LookbackWindow::new("3 Years", 12),
                LookbackWindow::new("5 Years", 20),
            ],
        }
    }
}

impl TryFrom<Vec<LookbackWindow>> for WindowSet {
    type Error = ConfigError;

    fn try_from(windows: Vec<LookbackWindow>) -> Result<Self, Self::Error> {
        Self::new(windows)
    }
}

impl From<WindowSet> for Vec<LookbackWindow> {
    fn from(set: WindowSet) -> Self {
        set.windows
    }
}
