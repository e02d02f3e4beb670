// lib/src/scheduling/slots.rs

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{ScheduleConfig, DEFAULT_SLOT_CATALOG};

/// The fixed, ordered list of daily slot labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCatalog {
    labels: Vec<String>,
}

/// Free slots of one date, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub date: String,
    pub total_slots: usize,
    pub booked_slots: usize,
    pub available_slots: Vec<String>,
}

impl SlotCatalog {
    /// Blank labels are dropped and repeated labels keep their first position.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let labels = labels
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        Self { labels }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.slots.iter().cloned())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Removes `held` from the catalog. `booked_slots` counts every held
    /// label, including ones the catalog does not list.
    pub fn availability<S: AsRef<str>>(&self, date: &str, held: &[S]) -> SlotAvailability {
        let held: HashSet<&str> = held.iter().map(AsRef::as_ref).collect();
        SlotAvailability {
            date: date.to_string(),
            total_slots: self.labels.len(),
            booked_slots: held.len(),
            available_slots: self
                .labels
                .iter()
                .filter(|label| !held.contains(label.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_CATALOG)
    }
}
