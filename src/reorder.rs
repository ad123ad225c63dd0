//! Manual ordering of a day's activities.
//!
//! Nothing here sorts by time. Whatever order is produced lasts only until the
//! next save or re-sort, which puts the day back into start-time order.

use std::collections::HashMap;

use thiserror::Error;

use crate::clock::ClockTime;
use crate::domain::{Activity, Day};

const MIN_ROUTE_STOPS: usize = 2;

pub fn swap_up(activities: &[Activity], index: usize) -> Vec<Activity> {
    let mut reordered = activities.to_vec();
    if index > 0 && index < reordered.len() {
        reordered.swap(index - 1, index);
    }
    reordered
}

pub fn swap_down(activities: &[Activity], index: usize) -> Vec<Activity> {
    let mut reordered = activities.to_vec();
    if index + 1 < reordered.len() {
        reordered.swap(index, index + 1);
    }
    reordered
}

/// What a route advisor sees of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStop {
    pub id: String,
    pub location: String,
    pub start: ClockTime,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("route advisor unavailable: {0}")]
    Unavailable(String),

    #[error("route advisor returned an unusable answer: {0}")]
    InvalidAnswer(String),
}

/// External source of a visiting order, answered as activity ids.
pub trait RouteAdvisor {
    fn suggest_order(&self, stops: &[RouteStop]) -> Result<Vec<String>, AdvisorError>;
}

/// Advisor that answers with an order chosen up front.
#[derive(Debug, Clone, Default)]
pub struct FixedOrder {
    ids: Vec<String>,
}

impl FixedOrder {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl RouteAdvisor for FixedOrder {
    /// Hands back the chosen order once every id is known to be a located stop.
    fn suggest_order(&self, stops: &[RouteStop]) -> Result<Vec<String>, AdvisorError> {
        if self.ids.is_empty() {
            return Err(AdvisorError::Unavailable("no order given".to_string()));
        }
        if let Some(unknown) = self.ids.iter().find(|id| !stops.iter().any(|stop| &stop.id == *id)) {
            return Err(AdvisorError::InvalidAnswer(format!("{unknown} is not a located activity")));
        }
        Ok(self.ids.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied,
    NotEnoughStops,
    NoSuggestion,
}

#[derive(Debug, Clone)]
pub struct RouteResult {
    pub day: Day,
    pub outcome: RouteOutcome,
}

/// Puts listed ids first, in the listed order; the rest keep their order after them.
///
/// Unknown ids are ignored and an empty list changes nothing.
pub fn apply_route_order(activities: &[Activity], ordered_ids: &[String]) -> Vec<Activity> {
    let mut rank: HashMap<&str, usize> = HashMap::new();
    for (position, id) in ordered_ids.iter().enumerate() {
        rank.entry(id.as_str()).or_insert(position);
    }

    let mut reordered = activities.to_vec();
    reordered.sort_by_key(|activity| rank.get(activity.id.as_str()).copied().unwrap_or(usize::MAX));
    reordered
}

/// Asks `advisor` for a visiting order over the day's located activities.
///
/// Advisor failures are logged and leave the day as it was.
pub fn smart_route(day: &Day, advisor: &dyn RouteAdvisor) -> RouteResult {
    let stops = day
        .activities
        .iter()
        .filter(|activity| !activity.location.trim().is_empty())
        .map(|activity| RouteStop {
            id: activity.id.clone(),
            location: activity.location.clone(),
            start: activity.start,
        })
        .collect::<Vec<_>>();

    if stops.len() < MIN_ROUTE_STOPS {
        return unchanged(day, RouteOutcome::NotEnoughStops);
    }
    for stop in &stops {
        tracing::debug!(id = %stop.id, location = %stop.location, start = %stop.start, "route stop");
    }

    let ordered_ids = match advisor.suggest_order(&stops) {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(%err, date = %day.date, "route suggestion failed");
            return unchanged(day, RouteOutcome::NoSuggestion);
        }
    };
    if ordered_ids.is_empty() {
        return unchanged(day, RouteOutcome::NoSuggestion);
    }

    RouteResult {
        day: Day {
            date: day.date,
            activities: apply_route_order(&day.activities, &ordered_ids),
        },
        outcome: RouteOutcome::Applied,
    }
}

fn unchanged(day: &Day, outcome: RouteOutcome) -> RouteResult {
    RouteResult {
        day: day.clone(),
        outcome,
    }
}
