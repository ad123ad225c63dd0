//! Day timeline engine: ordering, start-time suggestion, the one-step
//! cascade and cross-day moves.
//!
//! Every function takes the current values and returns new ones; callers swap
//! the result in with a single assignment.

use chrono::NaiveDate;

use crate::clock::ClockTime;
use crate::domain::{Activity, Day};
use crate::error::MoveError;

pub const SUGGESTION_TRANSIT_BUFFER_MINUTES: u32 = 30;
pub const SUGGESTION_STEP_MINUTES: u32 = 10;
pub const CASCADE_TRANSIT_DEFAULT_MINUTES: u32 = 0;

/// Stable ascending sort by start time.
pub fn order_activities(activities: &[Activity]) -> Vec<Activity> {
    let mut ordered = activities.to_vec();
    ordered.sort_by_key(|activity| activity.start);
    ordered
}

/// Start time for a new activity appended to `day`.
///
/// Uses the last activity in list order plus its stay and transit estimate
/// (30 minutes when there is none), rounded up to ten minutes.
pub fn suggest_next_start(day: &Day) -> ClockTime {
    let Some(last) = day.activities.last() else {
        return ClockTime::default();
    };

    let transit = last.transit.minutes().unwrap_or(SUGGESTION_TRANSIT_BUFFER_MINUTES);
    last.start
        .add_stay(last.stay)
        .add_minutes(transit)
        .round_up_to(SUGGESTION_STEP_MINUTES)
}

/// When the activity after `activity` should start. No rounding, and a
/// missing transit estimate counts as zero.
pub fn cascade_start(activity: &Activity) -> ClockTime {
    let transit = activity.transit.minutes().unwrap_or(CASCADE_TRANSIT_DEFAULT_MINUTES);
    activity.start.add_stay(activity.stay).add_minutes(transit)
}

/// Inserts or replaces `activity` and retimes only its immediate successor.
///
/// Activities further down are never touched, even when they now overlap.
pub fn save_activity(day: &Day, activity: Activity) -> Day {
    let mut activities = day.activities.clone();
    match activities.iter_mut().find(|existing| existing.id == activity.id) {
        Some(existing) => *existing = activity.clone(),
        None => activities.push(activity.clone()),
    }

    let mut activities = order_activities(&activities);
    let successor = activities
        .iter()
        .position(|existing| existing.id == activity.id)
        .map(|position| position + 1);
    if let Some(next) = successor.and_then(|index| activities.get_mut(index)) {
        next.start = cascade_start(&activity);
    }

    Day {
        date: day.date,
        activities: order_activities(&activities),
    }
}

#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub activity_id: String,
    pub source: NaiveDate,
    pub target: NaiveDate,
    /// Replaces the moved activity, e.g. when it was edited in the same step.
    pub updated: Option<Activity>,
}

/// Moves an activity between days and re-sorts the target day.
///
/// The returned list is built in full before anything is handed back, so an
/// error always means the caller's days are still valid as they were.
pub fn move_activity(days: &[Day], request: &MoveRequest) -> Result<Vec<Day>, MoveError> {
    if request.source == request.target {
        return Err(MoveError::SameDay(request.source));
    }

    let source_index = find_day(days, request.source).ok_or(MoveError::SourceDayMissing(request.source))?;
    let target_index = find_day(days, request.target).ok_or(MoveError::TargetDayMissing(request.target))?;

    let moving = days[source_index]
        .activity(&request.activity_id)
        .cloned()
        .ok_or_else(|| MoveError::ActivityMissing {
            activity_id: request.activity_id.clone(),
            day: request.source,
        })?;
    let moving = request.updated.clone().unwrap_or(moving);

    let mut next = days.to_vec();
    next[source_index]
        .activities
        .retain(|activity| activity.id != request.activity_id);

    let target = &mut next[target_index];
    target.activities.push(moving);
    target.activities = order_activities(&target.activities);

    Ok(next)
}

fn find_day(days: &[Day], date: NaiveDate) -> Option<usize> {
    days.iter().position(|day| day.date == date)
}
