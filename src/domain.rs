use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{ClockTime, StayDuration, first_integer};
use crate::error::PlannerError;
use crate::reorder::{RouteAdvisor, RouteOutcome, smart_route, swap_down, swap_up};
use crate::schedule::{MoveRequest, move_activity, order_activities, save_activity, suggest_next_start};

const ID_LEN: usize = 8;
const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walk,
    Train,
    Bus,
    Taxi,
    Flight,
    Boat,
}

impl TransportMode {
    pub const ALL: [TransportMode; 6] = [
        TransportMode::Walk,
        TransportMode::Train,
        TransportMode::Bus,
        TransportMode::Taxi,
        TransportMode::Flight,
        TransportMode::Boat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
            TransportMode::Taxi => "taxi",
            TransportMode::Flight => "flight",
            TransportMode::Boat => "boat",
        }
    }

    /// Travel mode for a maps directions link.
    pub fn travel_mode(self) -> &'static str {
        match self {
            TransportMode::Walk => "walking",
            TransportMode::Train | TransportMode::Bus => "transit",
            TransportMode::Taxi | TransportMode::Flight | TransportMode::Boat => "driving",
        }
    }
}

impl Display for TransportMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let needle = input.trim().to_ascii_lowercase();
        TransportMode::ALL
            .into_iter()
            .find(|mode| mode.label() == needle)
            .ok_or_else(|| format!("unknown transport mode: {input}"))
    }
}

/// Travel from an activity to the one after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitToNext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl TransitToNext {
    /// Minutes in the free-text estimate, if it contains a number at all.
    pub fn minutes(&self) -> Option<u32> {
        self.duration.as_deref().and_then(first_integer)
    }

    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.duration.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub start: ClockTime,
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub stay: StayDuration,
    #[serde(default, skip_serializing_if = "TransitToNext::is_empty")]
    pub transit: TransitToNext,
}

impl Activity {
    pub fn new(id: impl Into<String>, start: ClockTime, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start,
            title: title.into(),
            location: String::new(),
            notes: None,
            stay: StayDuration::default(),
            transit: TransitToNext::default(),
        }
    }

    pub fn end(&self) -> ClockTime {
        self.start.add_stay(self.stay)
    }
}

/// Raw field values as typed into the CLI or the dashboard.
#[derive(Debug, Clone, Default)]
pub struct ActivityForm {
    pub title: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub time: Option<String>,
    pub stay: Option<String>,
    pub transport: Option<String>,
    pub transit_duration: Option<String>,
}

impl ActivityForm {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            title: activity.title.clone(),
            location: Some(activity.location.clone()),
            notes: activity.notes.clone(),
            time: Some(activity.start.to_string()),
            stay: Some(activity.stay.to_string()),
            transport: activity.transit.mode.map(|mode| mode.label().to_string()),
            transit_duration: activity.transit.duration.clone(),
        }
    }

    /// Normalizes the form; only an empty title is rejected.
    ///
    /// A blank time takes `default_start`, a malformed one `09:00`. Stay falls
    /// back to 1h30m and an unknown transport tag is dropped.
    pub fn into_activity(self, id: String, default_start: ClockTime) -> Result<Activity, PlannerError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(PlannerError::EmptyTitle);
        }

        let start = non_blank(self.time)
            .map(|raw| ClockTime::parse_lenient(&raw))
            .unwrap_or(default_start);
        let stay = non_blank(self.stay)
            .map(|raw| StayDuration::parse_lenient(&raw))
            .unwrap_or_default();
        let mode = non_blank(self.transport).and_then(|raw| raw.parse::<TransportMode>().ok());

        let mut activity = Activity::new(id, start, title);
        activity.location = non_blank(self.location).unwrap_or_default();
        activity.notes = non_blank(self.notes);
        activity.stay = stay;
        activity.transit = TransitToNext {
            mode,
            duration: non_blank(self.transit_duration),
        };
        Ok(activity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            activities: Vec::new(),
        }
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }

    /// Maps link for reaching the activity at `index` from the one listed before it.
    ///
    /// `None` when that activity has no location. Without a located predecessor
    /// the link only names the destination.
    pub fn directions_to(&self, index: usize) -> Option<String> {
        let destination = self.activities.get(index)?.location.trim();
        if destination.is_empty() {
            return None;
        }

        let mut url = format!("{DIRECTIONS_BASE_URL}&destination={}", urlencoding::encode(destination));
        let previous = index.checked_sub(1).and_then(|before| self.activities.get(before));
        if let Some(previous) = previous.filter(|previous| !previous.location.trim().is_empty()) {
            let mode = previous
                .transit
                .mode
                .map(TransportMode::travel_mode)
                .unwrap_or("driving");
            url.push_str(&format!(
                "&origin={}&travelmode={mode}",
                urlencoding::encode(previous.location.trim())
            ));
        }
        Some(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSettings {
    pub schema_version: u32,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TripSettings {
    pub fn new(name: String, destinations: Vec<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: generate_id(),
            name,
            destinations,
            start_date,
            end_date,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    pub settings: TripSettings,
    pub days: Vec<Day>,
}

impl Itinerary {
    pub fn new(settings: TripSettings) -> Result<Self, PlannerError> {
        let days = date_range(settings.start_date, settings.end_date)?
            .into_iter()
            .map(Day::new)
            .collect();
        Ok(Self { settings, days })
    }

    pub fn day(&self, date: NaiveDate) -> Option<&Day> {
        self.days.iter().find(|day| day.date == date)
    }

    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|day| day.activities.len()).sum()
    }

    /// Applies new trip dates, keeping every existing day that is still in range.
    pub fn reschedule(&mut self, start_date: NaiveDate, end_date: NaiveDate) -> Result<(), PlannerError> {
        let dates = date_range(start_date, end_date)?;
        let days = dates
            .into_iter()
            .map(|date| self.day(date).cloned().unwrap_or_else(|| Day::new(date)))
            .collect::<Vec<_>>();

        let dropped = self.days.iter().filter(|day| day.date < start_date || day.date > end_date).count();
        if dropped > 0 {
            warn!(dropped, "reschedule dropped days outside the new range");
        }

        self.settings.start_date = start_date;
        self.settings.end_date = end_date;
        self.days = days;
        info!(%start_date, %end_date, "trip rescheduled");
        Ok(())
    }

    pub fn suggest_start(&self, date: NaiveDate) -> Result<ClockTime, PlannerError> {
        let index = self.day_index(date)?;
        Ok(suggest_next_start(&self.days[index]))
    }

    pub fn add_activity(&mut self, date: NaiveDate, form: ActivityForm) -> Result<String, PlannerError> {
        let index = self.day_index(date)?;
        let suggested = suggest_next_start(&self.days[index]);
        let activity = form.into_activity(generate_id(), suggested)?;
        let id = activity.id.clone();
        self.days[index] = save_activity(&self.days[index], activity);
        info!(%date, activity_id = %id, "activity added");
        Ok(id)
    }

    /// Overwrites an activity with the edited form.
    ///
    /// When `target` names another day the edited activity moves there;
    /// otherwise it is saved in place with the one-step cascade.
    pub fn update_activity(
        &mut self,
        date: NaiveDate,
        activity_id: &str,
        form: ActivityForm,
        target: Option<NaiveDate>,
    ) -> Result<(), PlannerError> {
        let index = self.day_index(date)?;
        let current = self.days[index]
            .activity(activity_id)
            .ok_or_else(|| PlannerError::ActivityNotFound(activity_id.to_string()))?;
        let updated = form.into_activity(current.id.clone(), current.start)?;

        match target.filter(|target| *target != date) {
            Some(target) => {
                let request = MoveRequest {
                    activity_id: activity_id.to_string(),
                    source: date,
                    target,
                    updated: Some(updated),
                };
                self.days = move_activity(&self.days, &request).inspect_err(|err| {
                    warn!(%err, "edit with day change rejected");
                })?;
                info!(activity_id, from = %date, to = %target, "activity edited and moved");
            }
            None => {
                self.days[index] = save_activity(&self.days[index], updated);
                debug!(%date, activity_id, "activity edited");
            }
        }
        Ok(())
    }

    pub fn delete_activity(&mut self, date: NaiveDate, activity_id: &str) -> Result<Activity, PlannerError> {
        let index = self.day_index(date)?;
        let day = &mut self.days[index];
        let position = day
            .activities
            .iter()
            .position(|activity| activity.id == activity_id)
            .ok_or_else(|| PlannerError::ActivityNotFound(activity_id.to_string()))?;
        let removed = day.activities.remove(position);
        info!(%date, activity_id, "activity deleted");
        Ok(removed)
    }

    pub fn move_activity(&mut self, activity_id: &str, source: NaiveDate, target: NaiveDate) -> Result<(), PlannerError> {
        let request = MoveRequest {
            activity_id: activity_id.to_string(),
            source,
            target,
            updated: None,
        };
        match move_activity(&self.days, &request) {
            Ok(days) => {
                self.days = days;
                info!(activity_id, from = %source, to = %target, "activity moved");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "move rejected, itinerary unchanged");
                Err(err.into())
            }
        }
    }

    pub fn swap_up(&mut self, date: NaiveDate, index: usize) -> Result<(), PlannerError> {
        let day_index = self.day_index(date)?;
        let day = &mut self.days[day_index];
        day.activities = swap_up(&day.activities, index);
        Ok(())
    }

    pub fn swap_down(&mut self, date: NaiveDate, index: usize) -> Result<(), PlannerError> {
        let day_index = self.day_index(date)?;
        let day = &mut self.days[day_index];
        day.activities = swap_down(&day.activities, index);
        Ok(())
    }

    /// Back to time order; any manual arrangement is discarded.
    pub fn resort_day(&mut self, date: NaiveDate) -> Result<(), PlannerError> {
        let index = self.day_index(date)?;
        let day = &mut self.days[index];
        day.activities = order_activities(&day.activities);
        Ok(())
    }

    pub fn apply_smart_route(&mut self, date: NaiveDate, advisor: &dyn RouteAdvisor) -> Result<RouteOutcome, PlannerError> {
        let index = self.day_index(date)?;
        let result = smart_route(&self.days[index], advisor);
        debug!(%date, outcome = ?result.outcome, "smart route evaluated");
        self.days[index] = result.day;
        Ok(result.outcome)
    }

    fn day_index(&self, date: NaiveDate) -> Result<usize, PlannerError> {
        self.days
            .iter()
            .position(|day| day.date == date)
            .ok_or(PlannerError::DayNotFound(date))
    }
}

fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, PlannerError> {
    if end < start {
        return Err(PlannerError::InvalidDateRange { start, end });
    }
    Ok(start.iter_days().take_while(|date| *date <= end).collect())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::clock::ClockTime;
    use crate::error::{MoveError, PlannerError};
    use crate::reorder::{FixedOrder, RouteOutcome};

    use super::{Activity, ActivityForm, Day, Itinerary, TransportMode, TripSettings};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    fn trip() -> Itinerary {
        let settings = TripSettings::new("Kyoto".to_string(), vec!["Kyoto".to_string()], date(1), date(3));
        Itinerary::new(settings).expect("itinerary should be created")
    }

    fn form(title: &str, time: Option<&str>) -> ActivityForm {
        ActivityForm {
            title: title.to_string(),
            time: time.map(str::to_string),
            ..ActivityForm::default()
        }
    }

    fn starts(itinerary: &Itinerary, day: NaiveDate) -> Vec<String> {
        itinerary
            .day(day)
            .expect("day exists")
            .activities
            .iter()
            .map(|activity| activity.start.to_string())
            .collect()
    }

    #[test]
    fn creates_one_day_per_date() {
        let itinerary = trip();
        assert_eq!(itinerary.days.len(), 3);
        assert_eq!(itinerary.days[0].date, date(1));
        assert_eq!(itinerary.days[2].date, date(3));
    }

    #[test]
    fn rejects_inverted_date_range() {
        let settings = TripSettings::new("Back".to_string(), Vec::new(), date(3), date(1));
        assert_eq!(
            Itinerary::new(settings).err(),
            Some(PlannerError::InvalidDateRange {
                start: date(3),
                end: date(1)
            })
        );
    }

    #[test]
    fn add_uses_suggestion_when_time_is_blank() {
        let mut itinerary = trip();
        itinerary.add_activity(date(1), form("Temple", None)).expect("add");
        itinerary.add_activity(date(1), form("Lunch", Some(" "))).expect("add");
        // 09:00 + 01:30 + 30 min buffer
        assert_eq!(starts(&itinerary, date(1)), vec!["09:00", "11:00"]);
    }

    #[test]
    fn add_rejects_blank_title() {
        let mut itinerary = trip();
        assert_eq!(
            itinerary.add_activity(date(1), form("   ", None)),
            Err(PlannerError::EmptyTitle)
        );
        assert!(itinerary.days[0].activities.is_empty());
    }

    #[test]
    fn add_to_unknown_day_fails() {
        let mut itinerary = trip();
        assert_eq!(
            itinerary.add_activity(date(9), form("Nowhere", None)),
            Err(PlannerError::DayNotFound(date(9)))
        );
    }

    #[test]
    fn form_normalizes_missing_and_malformed_fields() {
        let activity = ActivityForm {
            title: "  Market ".to_string(),
            time: Some("late".to_string()),
            stay: Some("??".to_string()),
            transport: Some("Train".to_string()),
            transit_duration: Some("".to_string()),
            notes: Some("  ".to_string()),
            ..ActivityForm::default()
        }
        .into_activity("abc".to_string(), ClockTime::from_hm(15, 0))
        .expect("form should normalize");

        assert_eq!(activity.title, "Market");
        assert_eq!(activity.start.to_string(), "09:00");
        assert_eq!(activity.stay.to_string(), "01:30");
        assert_eq!(activity.transit.mode, Some(TransportMode::Train));
        assert_eq!(activity.transit.duration, None);
        assert_eq!(activity.notes, None);
    }

    #[test]
    fn edit_cascades_into_successor() {
        let mut itinerary = trip();
        let first = itinerary.add_activity(date(1), form("Castle", Some("09:00"))).expect("add");
        itinerary.add_activity(date(1), form("Garden", Some("11:00"))).expect("add");

        let mut edited = form("Castle", Some("09:00"));
        edited.stay = Some("02:00".to_string());
        edited.transit_duration = Some("20 mins".to_string());
        itinerary.update_activity(date(1), &first, edited, None).expect("edit");

        assert_eq!(starts(&itinerary, date(1)), vec!["09:00", "11:20"]);
    }

    #[test]
    fn edit_with_new_day_moves_without_cascade() {
        let mut itinerary = trip();
        let id = itinerary.add_activity(date(1), form("Ferry", Some("10:00"))).expect("add");
        itinerary.add_activity(date(2), form("Museum", Some("09:00"))).expect("add");

        itinerary
            .update_activity(date(1), &id, form("Ferry", Some("08:00")), Some(date(2)))
            .expect("edit and move");

        assert!(itinerary.day(date(1)).expect("day 1").activities.is_empty());
        assert_eq!(starts(&itinerary, date(2)), vec!["08:00", "09:00"]);
    }

    #[test]
    fn move_to_unknown_day_leaves_itinerary_untouched() {
        let mut itinerary = trip();
        let id = itinerary.add_activity(date(1), form("Onsen", Some("18:00"))).expect("add");
        let before = itinerary.clone();

        let result = itinerary.move_activity(&id, date(1), date(20));
        assert_eq!(result, Err(PlannerError::Move(MoveError::TargetDayMissing(date(20)))));
        assert_eq!(itinerary, before);
    }

    #[test]
    fn delete_removes_only_the_named_activity() {
        let mut itinerary = trip();
        let keep = itinerary.add_activity(date(2), form("Keep", Some("09:00"))).expect("add");
        let drop = itinerary.add_activity(date(2), form("Drop", Some("12:00"))).expect("add");

        let removed = itinerary.delete_activity(date(2), &drop).expect("delete");
        assert_eq!(removed.title, "Drop");
        let remaining = &itinerary.day(date(2)).expect("day").activities;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep);
        assert_eq!(
            itinerary.delete_activity(date(2), &drop),
            Err(PlannerError::ActivityNotFound(drop))
        );
    }

    #[test]
    fn manual_order_reverts_on_resort() {
        let mut itinerary = trip();
        itinerary.add_activity(date(1), form("A", Some("09:00"))).expect("add");
        itinerary.add_activity(date(1), form("B", Some("12:00"))).expect("add");

        itinerary.swap_down(date(1), 0).expect("swap");
        assert_eq!(starts(&itinerary, date(1)), vec!["12:00", "09:00"]);

        itinerary.resort_day(date(1)).expect("resort");
        assert_eq!(starts(&itinerary, date(1)), vec!["09:00", "12:00"]);
    }

    #[test]
    fn reschedule_keeps_days_still_in_range() {
        let mut itinerary = trip();
        itinerary.add_activity(date(2), form("Hike", Some("07:00"))).expect("add");
        itinerary.add_activity(date(1), form("Arrive", Some("15:00"))).expect("add");

        itinerary.reschedule(date(2), date(5)).expect("reschedule");

        assert_eq!(itinerary.days.len(), 4);
        assert_eq!(itinerary.days[0].date, date(2));
        assert_eq!(itinerary.days[0].activities[0].title, "Hike");
        assert_eq!(itinerary.activity_count(), 1);
        assert_eq!(itinerary.settings.start_date, date(2));
    }

    #[test]
    fn smart_route_applies_advisor_order() {
        let mut itinerary = trip();
        let mut first = form("Shrine", Some("09:00"));
        first.location = Some("Fushimi".to_string());
        let mut second = form("Bamboo", Some("10:00"));
        second.location = Some("Arashiyama".to_string());
        let a = itinerary.add_activity(date(1), first).expect("add");
        let b = itinerary.add_activity(date(1), second).expect("add");

        let advisor = FixedOrder::new(vec![b.clone(), a.clone()]);
        let outcome = itinerary.apply_smart_route(date(1), &advisor).expect("route");

        assert_eq!(outcome, RouteOutcome::Applied);
        let ids = itinerary.days[0]
            .activities
            .iter()
            .map(|activity| activity.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn directions_follow_previous_stop_and_transport() {
        let mut hotel = Activity::new("h", ClockTime::default(), "Hotel");
        hotel.location = "Gion Hotel".to_string();
        hotel.transit.mode = Some(TransportMode::Train);
        let mut shrine = Activity::new("s", ClockTime::default(), "Shrine");
        shrine.location = "Fushimi Inari".to_string();
        let lunch = Activity::new("l", ClockTime::default(), "Lunch");
        let day = Day {
            date: date(1),
            activities: vec![hotel, shrine, lunch],
        };

        assert_eq!(
            day.directions_to(0).as_deref(),
            Some("https://www.google.com/maps/dir/?api=1&destination=Gion%20Hotel")
        );
        assert_eq!(
            day.directions_to(1).as_deref(),
            Some(
                "https://www.google.com/maps/dir/?api=1&destination=Fushimi%20Inari&origin=Gion%20Hotel&travelmode=transit"
            )
        );
        assert_eq!(day.directions_to(2), None);
        assert_eq!(day.directions_to(9), None);
        assert_eq!(TransportMode::Walk.travel_mode(), "walking");
        assert_eq!(TransportMode::Taxi.travel_mode(), "driving");
    }
}
