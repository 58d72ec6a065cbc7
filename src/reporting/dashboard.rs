use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::checklist::{compute_completion, percentage, round1};
use crate::constants::{
    ChecklistCategory, Hospital, OPERATIONS_PER_DAY, OPERATIONS_PER_FORTNIGHT, OPERATIONS_PER_WEEK,
};
use crate::models::Report;

use super::{CategoryView, DateRange, category_views, format_date};

pub const WEEK_DAYS: u64 = 7;
pub const FORTNIGHT_DAYS: u64 = 14;

/// Traffic light for how many units have reported today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Green,
    Yellow,
    Red,
}

impl ProgressStatus {
    pub fn from_percentage(progress: f64) -> Self {
        if progress >= 100.0 {
            ProgressStatus::Green
        } else if progress >= 50.0 {
            ProgressStatus::Yellow
        } else {
            ProgressStatus::Red
        }
    }
}

/// The most recent report of a unit, whatever its date.
#[derive(Debug, Clone, Serialize)]
pub struct LatestReport {
    pub date: String,
    pub observations: String,
    pub met_goal: Option<bool>,
    pub operations_performed: Option<i64>,
    pub completion: f64,
    pub categories: Vec<CategoryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HospitalStatus {
    pub id: String,
    pub name: String,
    pub submitted_today: bool,
    pub met_goal_today: Option<bool>,
    pub operations_today: Option<i64>,
    pub fortnight_operations: i64,
    pub latest: Option<LatestReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub today: String,
    pub hospitals: Vec<HospitalStatus>,
    pub missing_reports: Vec<Hospital>,
    pub completed_reports: usize,
    pub total_hospitals: usize,
    pub progress_percentage: f64,
    pub progress_status: ProgressStatus,
    pub total_daily_operations: i64,
    pub total_weekly_operations: i64,
    pub total_fortnight_operations: i64,
    pub fortnight_goal_percentage: f64,
    pub operations_day: i64,
    pub operations_week: i64,
    pub operations_fortnight: i64,
}

fn sum_effective<'a>(reports: impl Iterator<Item = &'a Report>) -> i64 {
    reports.map(Report::effective_operations).sum()
}

/// Builds the administrator dashboard.
///
/// `window_reports` must hold every report of the fortnight ending `today`; today's
/// and this week's figures are derived from it. `latest` maps hospital ids to their
/// most recent report.
pub fn build_dashboard(
    today: NaiveDate,
    roster: &[Hospital],
    taxonomy: &[ChecklistCategory],
    window_reports: &[Report],
    latest: &HashMap<String, Report>,
) -> DashboardView {
    let today_str = format_date(today);
    let week = DateRange::last_days(today, WEEK_DAYS);
    let fortnight = DateRange::last_days(today, FORTNIGHT_DAYS);

    let fortnight_reports: Vec<&Report> = window_reports
        .iter()
        .filter(|r| fortnight.contains(&r.date))
        .collect();
    let today_reports: Vec<&Report> = fortnight_reports
        .iter()
        .copied()
        .filter(|r| r.date == today_str)
        .collect();

    let mut hospitals = Vec::with_capacity(roster.len());
    let mut missing_reports = Vec::new();

    for hospital in roster {
        let report_today = today_reports.iter().find(|r| r.hospital_id == hospital.id);
        if report_today.is_none() {
            missing_reports.push(*hospital);
        }

        let fortnight_operations = sum_effective(
            fortnight_reports
                .iter()
                .copied()
                .filter(|r| r.hospital_id == hospital.id),
        );

        let latest = latest.get(hospital.id).map(|report| LatestReport {
            date: report.date.clone(),
            observations: report.observations.clone(),
            met_goal: report.met_goal,
            operations_performed: report.operations_performed,
            completion: round1(compute_completion(&report.checklist_data, taxonomy)),
            categories: category_views(&report.checklist_data, taxonomy),
        });

        hospitals.push(HospitalStatus {
            id: hospital.id.to_string(),
            name: hospital.name.to_string(),
            submitted_today: report_today.is_some(),
            met_goal_today: report_today.and_then(|r| r.met_goal),
            operations_today: report_today.and_then(|r| r.operations_performed),
            fortnight_operations,
            latest,
        });
    }

    let completed_reports = roster.len() - missing_reports.len();
    let progress = percentage(completed_reports as f64, roster.len() as f64);

    let total_fortnight_operations = sum_effective(fortnight_reports.iter().copied());

    DashboardView {
        today: today_str,
        hospitals,
        missing_reports,
        completed_reports,
        total_hospitals: roster.len(),
        progress_percentage: round1(progress),
        progress_status: ProgressStatus::from_percentage(progress),
        total_daily_operations: sum_effective(today_reports.iter().copied()),
        total_weekly_operations: sum_effective(
            fortnight_reports
                .iter()
                .copied()
                .filter(|r| week.contains(&r.date)),
        ),
        total_fortnight_operations,
        fortnight_goal_percentage: round1(percentage(
            total_fortnight_operations as f64,
            OPERATIONS_PER_FORTNIGHT as f64,
        )),
        operations_day: OPERATIONS_PER_DAY,
        operations_week: OPERATIONS_PER_WEEK,
        operations_fortnight: OPERATIONS_PER_FORTNIGHT,
    }
}
