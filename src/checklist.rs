use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::constants::{ChecklistCategory, OPERATIONS_PER_DAY, other_checkbox_key, other_text_key};

/// A single stored checklist value. Items and "other" checkboxes are flags, the
/// "other" description is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecklistEntry {
    Flag(bool),
    Text(String),
}

/// The checklist portion of a daily report, persisted as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistData(BTreeMap<String, ChecklistEntry>);

impl ChecklistData {
    /// Every item unchecked and every "other" slot empty.
    pub fn empty(taxonomy: &[ChecklistCategory]) -> Self {
        let mut entries = BTreeMap::new();
        for category in taxonomy {
            for item in category.items {
                entries.insert(item.to_string(), ChecklistEntry::Flag(false));
            }
            entries.insert(other_checkbox_key(category.name), ChecklistEntry::Flag(false));
            entries.insert(
                other_text_key(category.name),
                ChecklistEntry::Text(String::new()),
            );
        }
        Self(entries)
    }

    /// Builds checklist data from submitted form fields. Checkboxes count as set only
    /// when the browser sent `on`; anything not in the taxonomy is dropped.
    pub fn from_form(taxonomy: &[ChecklistCategory], fields: &HashMap<String, String>) -> Self {
        let is_on = |key: &str| fields.get(key).is_some_and(|v| v == "on");

        let mut data = Self::empty(taxonomy);
        for category in taxonomy {
            for item in category.items {
                data.set_flag(item, is_on(item));
            }
            let checkbox = other_checkbox_key(category.name);
            data.set_flag(&checkbox, is_on(&checkbox));

            let text_key = other_text_key(category.name);
            let text = fields.get(&text_key).map(String::as_str).unwrap_or_default();
            data.set_text(&text_key, text);
        }
        data
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_string(), ChecklistEntry::Flag(value));
    }

    pub fn set_text(&mut self, key: &str, value: &str) {
        self.0
            .insert(key.to_string(), ChecklistEntry::Text(value.to_string()));
    }

    pub fn is_checked(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(ChecklistEntry::Flag(true)))
    }

    pub fn other_checked(&self, category: &str) -> bool {
        self.is_checked(&other_checkbox_key(category))
    }

    pub fn other_text(&self, category: &str) -> &str {
        match self.0.get(&other_text_key(category)) {
            Some(ChecklistEntry::Text(text)) => text,
            _ => "",
        }
    }

    /// The "other" slot of a category only counts when its description is not blank.
    pub fn has_other(&self, category: &str) -> bool {
        !self.other_text(category).trim().is_empty()
    }
}

/// Satisfied and total slots of one checklist against the taxonomy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCount {
    pub checked: u32,
    pub total: u32,
}

impl SlotCount {
    pub fn percentage(&self) -> f64 {
        percentage(self.checked as f64, self.total as f64)
    }
}

pub fn count_slots(data: &ChecklistData, taxonomy: &[ChecklistCategory]) -> SlotCount {
    let mut count = SlotCount::default();
    for category in taxonomy {
        for item in category.items {
            count.total += 1;
            if data.is_checked(item) {
                count.checked += 1;
            }
        }

        if data.has_other(category.name) {
            count.total += 1;
            if data.other_checked(category.name) {
                count.checked += 1;
            }
        }
    }
    count
}

/// Completion percentage of a single checklist, 0 for an empty taxonomy.
pub fn compute_completion(data: &ChecklistData, taxonomy: &[ChecklistCategory]) -> f64 {
    count_slots(data, taxonomy).percentage()
}

/// Operations attributed to one report. A met goal always stands for the full daily
/// quota, whatever count was stored alongside it.
pub fn resolve_operations_for_day(
    met_goal: Option<bool>,
    operations_performed: Option<i64>,
    operations_per_day: i64,
) -> Option<i64> {
    if met_goal == Some(true) {
        Some(operations_per_day)
    } else {
        operations_performed
    }
}

/// `resolve_operations_for_day` with the standard quota, missing counts as zero.
pub fn effective_operations(met_goal: Option<bool>, operations_performed: Option<i64>) -> i64 {
    resolve_operations_for_day(met_goal, operations_performed, OPERATIONS_PER_DAY).unwrap_or(0)
}

pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
