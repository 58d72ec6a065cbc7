use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::checklist::{ChecklistData, compute_completion, percentage, round1};
use crate::constants::{
    ChecklistCategory, Hospital, OTHER_CHECKBOX_SUFFIX, hospital_name, other_checkbox_key,
};
use crate::models::Report;

use super::ChartSeries;

pub const MET_GOAL_DATASET_LABEL: &str = "Veces Meta Cumplida";

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub hospital_id: String,
    pub hospital_name: String,
    pub date: String,
    pub met_goal: Option<bool>,
    pub operations: i64,
    pub completion: f64,
    pub observations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// How often one checklist slot was satisfied across the scanned reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPercentage {
    pub item: String,
    pub percentage: f64,
    pub checked_count: u32,
    pub total_count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct ItemTally {
    checked: u32,
    total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub reports: Vec<ReportRow>,
    pub total_operations: i64,
    pub operations_chart: ChartSeries<i64>,
    pub completion_chart: ChartSeries<f64>,
    pub met_goal_chart: BarChart,
    pub item_percentages: Vec<ItemPercentage>,
}

/// Human readable label for a checklist key: "Tics_otro_checkbox" becomes
/// "Tics (otro)", "maquina de anestesia" becomes "Maquina de anestesia".
pub fn item_display_name(key: &str) -> String {
    let label = key
        .replace(OTHER_CHECKBOX_SUFFIX, " (Otro)")
        .replace('_', " ");

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn tally_items(
    tallies: &mut BTreeMap<String, ItemTally>,
    data: &ChecklistData,
    taxonomy: &[ChecklistCategory],
) {
    for category in taxonomy {
        for item in category.items {
            let tally = tallies.entry(item.to_string()).or_default();
            tally.total += 1;
            if data.is_checked(item) {
                tally.checked += 1;
            }
        }

        if data.has_other(category.name) {
            let tally = tallies
                .entry(other_checkbox_key(category.name))
                .or_default();
            tally.total += 1;
            if data.other_checked(category.name) {
                tally.checked += 1;
            }
        }
    }
}

/// Checklist items ranked by how often they were checked, highest first. Equal
/// percentages are ordered by label.
fn rank_items(tallies: BTreeMap<String, ItemTally>) -> Vec<ItemPercentage> {
    let mut ranked: Vec<ItemPercentage> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.total > 0)
        .map(|(key, tally)| ItemPercentage {
            item: item_display_name(&key),
            percentage: round1(percentage(tally.checked as f64, tally.total as f64)),
            checked_count: tally.checked,
            total_count: tally.total,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item.cmp(&b.item))
    });
    ranked
}

/// Aggregates the reports of a date range. `reports` is expected in the order
/// returned by `db::get_reports_between`.
pub fn build_statistics(
    reports: &[Report],
    roster: &[Hospital],
    taxonomy: &[ChecklistCategory],
) -> StatisticsView {
    let mut rows = Vec::with_capacity(reports.len());
    let mut daily_operations: BTreeMap<String, i64> = BTreeMap::new();
    let mut daily_completion: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    let mut met_goal_counts: BTreeMap<String, i64> =
        roster.iter().map(|h| (h.id.to_string(), 0)).collect();
    let mut tallies: BTreeMap<String, ItemTally> = BTreeMap::new();

    for report in reports {
        let completion = compute_completion(&report.checklist_data, taxonomy);
        let operations = report.effective_operations();

        *daily_operations.entry(report.date.clone()).or_default() += operations;

        let day = daily_completion.entry(report.date.clone()).or_default();
        day.0 += completion;
        day.1 += 1;

        if report.met_goal == Some(true) {
            *met_goal_counts.entry(report.hospital_id.clone()).or_default() += 1;
        }

        tally_items(&mut tallies, &report.checklist_data, taxonomy);

        rows.push(ReportRow {
            hospital_id: report.hospital_id.clone(),
            hospital_name: hospital_name(&report.hospital_id),
            date: report.date.clone(),
            met_goal: report.met_goal,
            operations,
            completion: round1(completion),
            observations: report.observations.clone(),
        });
    }

    let mut operations_chart = ChartSeries::default();
    for (date, total) in &daily_operations {
        operations_chart.push(date.clone(), *total);
    }

    let mut completion_chart = ChartSeries::default();
    for (date, (sum, count)) in &daily_completion {
        let mean = if *count > 0 { sum / *count as f64 } else { 0.0 };
        completion_chart.push(date.clone(), round1(mean));
    }

    let met_goal_chart = BarChart {
        labels: met_goal_counts.keys().map(|id| hospital_name(id)).collect(),
        datasets: vec![Dataset {
            label: MET_GOAL_DATASET_LABEL.to_string(),
            data: met_goal_counts.values().copied().collect(),
        }],
    };

    StatisticsView {
        total_operations: daily_operations.values().sum(),
        reports: rows,
        operations_chart,
        completion_chart,
        met_goal_chart,
        item_percentages: rank_items(tallies),
    }
}
