use serde::Serialize;

use crate::checklist::{ChecklistData, compute_completion, round1};
use crate::constants::{ChecklistCategory, MAX_OPERATIONS_PER_DAY, hospital_name};
use crate::models::Report;

use super::{CategoryView, category_views};

/// Everything the checklist page needs, built from the stored report of the day or
/// from an empty checklist.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub hospital_id: String,
    pub hospital_name: String,
    pub today: String,
    pub categories: Vec<CategoryView>,
    pub observations: String,
    pub met_goal: Option<bool>,
    pub operations_performed: Option<i64>,
    pub max_operations: i64,
    pub completion: f64,
    pub submitted_at: Option<String>,
}

impl ChecklistView {
    pub fn build(
        hospital_id: &str,
        today: &str,
        report: Option<&Report>,
        taxonomy: &[ChecklistCategory],
    ) -> Self {
        let empty = ChecklistData::empty(taxonomy);
        let data = report.map(|r| &r.checklist_data).unwrap_or(&empty);

        Self {
            hospital_id: hospital_id.to_string(),
            hospital_name: hospital_name(hospital_id),
            today: today.to_string(),
            categories: category_views(data, taxonomy),
            observations: report.map(|r| r.observations.clone()).unwrap_or_default(),
            met_goal: report.and_then(|r| r.met_goal),
            operations_performed: report.and_then(|r| r.operations_performed),
            max_operations: MAX_OPERATIONS_PER_DAY,
            completion: round1(compute_completion(data, taxonomy)),
            submitted_at: report.and_then(|r| r.submitted_at.clone()),
        }
    }
}
