use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("activity title is required")]
    EmptyTitle,

    #[error("day not found: {0}")]
    DayNotFound(NaiveDate),

    #[error("activity not found: {0}")]
    ActivityNotFound(String),

    #[error("trip ends ({end}) before it starts ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Why a cross-day move was refused. The day list is unchanged in every case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("source day not found: {0}")]
    SourceDayMissing(NaiveDate),

    #[error("target day not found: {0}")]
    TargetDayMissing(NaiveDate),

    #[error("activity {activity_id} is not on {day}")]
    ActivityMissing { activity_id: String, day: NaiveDate },

    #[error("activity is already on {0}")]
    SameDay(NaiveDate),
}
