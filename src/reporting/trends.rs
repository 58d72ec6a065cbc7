use std::collections::HashMap;

use serde::Serialize;

use crate::checklist::{ChecklistData, compute_completion, round1};
use crate::constants::ChecklistCategory;
use crate::models::Report;

use super::ChartSeries;

#[derive(Debug, Clone, Serialize)]
pub struct TrendRow {
    pub date: String,
    pub met_goal: Option<bool>,
    pub operations_performed: Option<i64>,
    pub effective_operations: i64,
    pub completion: f64,
    pub observations: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemCount {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendsView {
    pub rows: Vec<TrendRow>,
    pub completion_chart: ChartSeries<f64>,
    pub met_goal_chart: ChartSeries<i64>,
    pub recurring_problems: Vec<ProblemCount>,
}

/// Problems visible in one report: unchecked items, unchecked "other" slots that
/// carry a description, and known keywords mentioned in the observations.
pub fn report_problems(
    data: &ChecklistData,
    observations: &str,
    taxonomy: &[ChecklistCategory],
    keywords: &[&str],
) -> Vec<String> {
    let mut problems = Vec::new();

    for category in taxonomy {
        for item in category.items {
            if !data.is_checked(item) {
                problems.push(format!("{}: {}", category.name, item));
            }
        }

        if data.has_other(category.name) && !data.other_checked(category.name) {
            problems.push(format!(
                "{}: Otro ({})",
                category.name,
                data.other_text(category.name)
            ));
        }
    }

    let observations = observations.to_lowercase();
    for keyword in keywords {
        if observations.contains(&keyword.to_lowercase()) {
            problems.push(format!("Observación: {}", keyword));
        }
    }

    problems
}

/// Trend data of a single hospital. `reports` must be ordered by date.
pub fn build_trends(
    reports: &[Report],
    taxonomy: &[ChecklistCategory],
    keywords: &[&str],
) -> TrendsView {
    let mut view = TrendsView::default();
    let mut problems: HashMap<String, u32> = HashMap::new();

    for report in reports {
        let completion = round1(compute_completion(&report.checklist_data, taxonomy));

        view.rows.push(TrendRow {
            date: report.date.clone(),
            met_goal: report.met_goal,
            operations_performed: report.operations_performed,
            effective_operations: report.effective_operations(),
            completion,
            observations: report.observations.clone(),
        });

        view.completion_chart.push(report.date.clone(), completion);
        view.met_goal_chart
            .push(report.date.clone(), i64::from(report.met_goal == Some(true)));

        for problem in report_problems(
            &report.checklist_data,
            &report.observations,
            taxonomy,
            keywords,
        ) {
            *problems.entry(problem).or_default() += 1;
        }
    }

    let mut recurring: Vec<ProblemCount> = problems
        .into_iter()
        .map(|(label, count)| ProblemCount { label, count })
        .collect();
    recurring.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    view.recurring_problems = recurring;

    view
}
