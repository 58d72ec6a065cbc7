use serde::Serialize;

use crate::checklist::{ChecklistData, effective_operations};
use crate::error::AppError;

/// One daily submission of a hospital unit.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub hospital_id: String,
    pub date: String,
    pub checklist_data: ChecklistData,
    pub observations: String,
    pub met_goal: Option<bool>,
    pub operations_performed: Option<i64>,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<String>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbReport {
    pub id: Option<i64>,
    pub hospital_id: Option<String>,
    pub date: Option<String>,
    pub checklist_data: Option<String>,
    pub observations: Option<String>,
    pub met_goal: Option<i64>,
    pub operations_performed: Option<i64>,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<String>,
}

impl TryFrom<DbReport> for Report {
    type Error = AppError;

    fn try_from(report: DbReport) -> Result<Self, Self::Error> {
        let checklist_data = match report.checklist_data.as_deref() {
            Some(raw) if !raw.trim().is_empty() => ChecklistData::from_json(raw)?,
            _ => ChecklistData::default(),
        };

        Ok(Self {
            id: report.id.unwrap_or_default(),
            hospital_id: report.hospital_id.unwrap_or_default(),
            date: report.date.unwrap_or_default(),
            checklist_data,
            observations: report.observations.unwrap_or_default(),
            met_goal: report.met_goal.map(|v| v != 0),
            operations_performed: report.operations_performed,
            submitted_by: report.submitted_by,
            submitted_at: report.submitted_at,
        })
    }
}

impl Report {
    pub fn effective_operations(&self) -> i64 {
        effective_operations(self.met_goal, self.operations_performed)
    }
}

/// Content of a checklist submission, before it is stored.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub hospital_id: String,
    pub date: String,
    pub checklist_data: ChecklistData,
    pub observations: String,
    pub met_goal: bool,
    pub operations_performed: Option<i64>,
    pub submitted_by: i64,
}

/// Outcome of a report upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(i64),
    Updated(i64),
}

impl SubmitOutcome {
    pub fn report_id(&self) -> i64 {
        match self {
            SubmitOutcome::Created(id) | SubmitOutcome::Updated(id) => *id,
        }
    }
}

/// An audit entry joined with the username of its author, when there is one.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub username: Option<String>,
    pub action: String,
    pub timestamp: String,
    pub ip_address: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLogEntry {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<String>,
    pub ip_address: Option<String>,
}

impl From<DbLogEntry> for LogEntry {
    fn from(entry: DbLogEntry) -> Self {
        Self {
            id: entry.id.unwrap_or_default(),
            username: entry.username,
            action: entry.action.unwrap_or_default(),
            timestamp: entry.timestamp.unwrap_or_default(),
            ip_address: entry.ip_address,
        }
    }
}
