use thiserror::Error;
use tracing::instrument;

use crate::constants::MAX_OPERATIONS_PER_DAY;

/// Reasons a checklist submission is sent back to the operator. Checked in
/// declaration order, the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Por favor, indique si se cumplió con la meta.")]
    MissingGoal,

    #[error("Por favor, ingrese el número de operaciones realizadas si la meta no se cumplió.")]
    MissingOperations,

    #[error("El número de operaciones debe ser un valor numérico.")]
    NonNumericOperations,

    #[error("El número de operaciones no puede ser mayor a 7 ni negativo.")]
    OperationsOutOfRange,
}

/// The goal fields of a submission once they passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalInput {
    pub met_goal: bool,
    /// Only kept when the goal was not met.
    pub operations_performed: Option<i64>,
}

#[instrument]
pub fn validate_goal(
    met_goal: Option<&str>,
    operations_performed: Option<&str>,
) -> Result<GoalInput, SubmissionError> {
    // Only the literal radio values count; padded tokens are treated as missing.
    let met_goal = match met_goal {
        Some("true") => true,
        Some("false") => false,
        _ => return Err(SubmissionError::MissingGoal),
    };

    if met_goal {
        return Ok(GoalInput {
            met_goal,
            operations_performed: None,
        });
    }

    let raw = operations_performed
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SubmissionError::MissingOperations)?;

    let operations = raw
        .parse::<i64>()
        .map_err(|_| SubmissionError::NonNumericOperations)?;

    if !(0..=MAX_OPERATIONS_PER_DAY).contains(&operations) {
        return Err(SubmissionError::OperationsOutOfRange);
    }

    Ok(GoalInput {
        met_goal,
        operations_performed: Some(operations),
    })
}

/// First message of a set of `validator` errors, for display next to a form.
pub fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid value".to_string())
}
