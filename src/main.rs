mod clock;
mod config;
mod domain;
mod error;
mod logging;
mod reorder;
mod schedule;
mod storage;
mod trips;
mod ui;

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

use crate::clock::ClockTime;
use crate::config::Config;
use crate::domain::{ActivityForm, Day, Itinerary, TripSettings};
use crate::logging::init_logging;
use crate::reorder::{FixedOrder, RouteOutcome};
use crate::storage::{load_itinerary, save_itinerary};
use crate::trips::{RecentTrips, resolve_trip_path, state_dir};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "trip-itinerary", about = "Terminal trip planner with a self-scheduling day timeline")]
struct Cli {
	#[arg(long)]
	trip: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Create a trip file with one empty day per date
	Init {
		#[arg(long)]
		name: String,
		#[arg(long)]
		start: String,
		#[arg(long)]
		end: String,
		#[arg(long = "destination")]
		destinations: Vec<String>,
	},
	/// Change the trip dates, keeping days still in range
	Reschedule {
		#[arg(long)]
		start: String,
		#[arg(long)]
		end: String,
	},
	Dashboard,
	Days,
	Show {
		#[arg(long)]
		day: Option<String>,
	},
	/// Print the start time a new activity would get
	Suggest {
		#[arg(long)]
		day: String,
	},
	Add {
		#[arg(long)]
		day: String,
		#[arg(long)]
		title: String,
		#[command(flatten)]
		fields: ActivityFields,
	},
	Edit {
		#[arg(long)]
		day: String,
		#[arg(long)]
		id: String,
		#[arg(long)]
		title: Option<String>,
		#[command(flatten)]
		fields: ActivityFields,
		/// Move the edited activity to this day
		#[arg(long)]
		to_day: Option<String>,
	},
	Delete {
		#[arg(long)]
		day: String,
		#[arg(long)]
		id: String,
	},
	Move {
		#[arg(long)]
		id: String,
		#[arg(long)]
		from: String,
		#[arg(long)]
		to: String,
	},
	/// Swap an activity with the one above it (not kept after the next save)
	Up {
		#[arg(long)]
		day: String,
		#[arg(long)]
		index: usize,
	},
	/// Swap an activity with the one below it (not kept after the next save)
	Down {
		#[arg(long)]
		day: String,
		#[arg(long)]
		index: usize,
	},
	/// Put a day back into start-time order
	Resort {
		#[arg(long)]
		day: String,
	},
	/// Apply a visiting order, given as comma separated activity ids
	Route {
		#[arg(long)]
		day: String,
		#[arg(long)]
		order: String,
	},
	Trips {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

#[derive(Debug, Args)]
struct ActivityFields {
	#[arg(long)]
	time: Option<String>,
	#[arg(long)]
	stay: Option<String>,
	#[arg(long)]
	location: Option<String>,
	#[arg(long)]
	notes: Option<String>,
	#[arg(long)]
	transport: Option<String>,
	#[arg(long)]
	transit: Option<String>,
}

impl ActivityFields {
	fn apply(self, form: &mut ActivityForm) -> Result<(), Box<dyn Error>> {
		if let Some(time) = self.time {
			let start = ClockTime::parse(&time).ok_or_else(|| format!("--time must be HH:MM, got `{time}`"))?;
			form.time = Some(start.to_string());
		}
		if let Some(stay) = self.stay {
			form.stay = Some(stay);
		}
		if let Some(location) = self.location {
			form.location = Some(location);
		}
		if let Some(notes) = self.notes {
			form.notes = Some(notes);
		}
		if let Some(transport) = self.transport {
			form.transport = Some(transport);
		}
		if let Some(transit) = self.transit {
			form.transit_duration = Some(transit);
		}
		Ok(())
	}
}

fn main() {
	if let Err(err) = run() {
		tracing::error!(%err, "command failed");
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let state_dir = state_dir();
	let config = Config::load(&state_dir)?;
	if let Err(err) = init_logging(&state_dir, &config.log_level) {
		eprintln!("warning: logging disabled: {err}");
	}

	if let Some(Command::Trips { limit }) = &cli.command {
		print_recent_trips(&RecentTrips::new(&state_dir, *limit))?;
		return Ok(());
	}

	let recent = RecentTrips::new(&state_dir, config.max_recent_trips);
	let resolved = resolve_trip_path(cli.trip, config.default_trip.clone(), &recent)?;
	tracing::info!(path = %resolved.path.display(), source = ?resolved.source, "trip selected");
	let mut trip_path = resolved.path;

	if let Some(Command::Init {
		name,
		start,
		end,
		destinations,
	}) = &cli.command
	{
		let settings = TripSettings::new(name.clone(), destinations.clone(), parse_day(start)?, parse_day(end)?);
		let itinerary = Itinerary::new(settings)?;
		save_itinerary(&trip_path, &itinerary)?;
		remember(&recent, &trip_path);
		println!(
			"initialized {} ({} days) at {}",
			itinerary.settings.name,
			itinerary.days.len(),
			trip_path.display()
		);
		return Ok(());
	}

	let mut itinerary = load_itinerary(&trip_path)?.ok_or_else(|| {
		format!(
			"no trip at {}: run `init --name <name> --start <date> --end <date>` first",
			trip_path.display()
		)
	})?;
	remember(&recent, &trip_path);

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init { .. } | Command::Trips { .. } => {}
		Command::Dashboard => {
			run_dashboard(&mut itinerary, &mut trip_path, &recent)?;
		}
		Command::Reschedule { start, end } => {
			itinerary.reschedule(parse_day(&start)?, parse_day(&end)?)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("trip now runs {start} to {end}");
		}
		Command::Days => print_days(&itinerary),
		Command::Show { day } => {
			let date = match day {
				Some(raw) => parse_day(&raw)?,
				None => itinerary.settings.start_date,
			};
			let day = itinerary.day(date).ok_or_else(|| format!("day not in trip: {date}"))?;
			print_day(day);
		}
		Command::Suggest { day } => {
			println!("{}", itinerary.suggest_start(parse_day(&day)?)?);
		}
		Command::Add { day, title, fields } => {
			let mut form = ActivityForm {
				title,
				..ActivityForm::default()
			};
			fields.apply(&mut form)?;
			let id = itinerary.add_activity(parse_day(&day)?, form)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("created activity {id}");
		}
		Command::Edit {
			day,
			id,
			title,
			fields,
			to_day,
		} => {
			let date = parse_day(&day)?;
			let current = itinerary
				.day(date)
				.and_then(|day| day.activity(&id))
				.ok_or_else(|| format!("activity {id} is not on {date}"))?;
			let mut form = ActivityForm::from_activity(current);
			if let Some(title) = title {
				form.title = title;
			}
			fields.apply(&mut form)?;
			let target = to_day.as_deref().map(parse_day).transpose()?;
			itinerary.update_activity(date, &id, form, target)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("updated activity {id}");
		}
		Command::Delete { day, id } => {
			let removed = itinerary.delete_activity(parse_day(&day)?, &id)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("deleted {}", removed.title);
		}
		Command::Move { id, from, to } => {
			itinerary.move_activity(&id, parse_day(&from)?, parse_day(&to)?)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("moved {id} to {to}");
		}
		Command::Up { day, index } => {
			itinerary.swap_up(parse_day(&day)?, index)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("manual order saved; the next edit or `resort` restores time order");
		}
		Command::Down { day, index } => {
			itinerary.swap_down(parse_day(&day)?, index)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("manual order saved; the next edit or `resort` restores time order");
		}
		Command::Resort { day } => {
			itinerary.resort_day(parse_day(&day)?)?;
			save_itinerary(&trip_path, &itinerary)?;
			println!("{day} sorted by start time");
		}
		Command::Route { day, order } => {
			let outcome = itinerary.apply_smart_route(parse_day(&day)?, &FixedOrder::parse(&order))?;
			match outcome {
				RouteOutcome::Applied => {
					save_itinerary(&trip_path, &itinerary)?;
					println!("route order applied to {day}");
				}
				RouteOutcome::NotEnoughStops => println!("need at least 2 activities with a location"),
				RouteOutcome::NoSuggestion => println!("no route suggestion; order unchanged"),
			}
		}
	}

	Ok(())
}

fn remember(recent: &RecentTrips, trip_path: &Path) {
	if let Err(err) = recent.remember(trip_path) {
		eprintln!("warning: failed to store recent trip: {err}");
	}
}

fn print_recent_trips(recent: &RecentTrips) -> Result<(), Box<dyn Error>> {
	let rows = recent.list()?;
	if rows.is_empty() {
		println!("no recent trips");
		return Ok(());
	}

	for (index, trip) in rows.iter().enumerate() {
		println!(
			"{:>2}. {} | opened {}",
			index + 1,
			trip.path.display(),
			trip.opened_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
		);
	}

	Ok(())
}

fn parse_day(input: &str) -> Result<NaiveDate, Box<dyn Error>> {
	Ok(NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")?)
}

fn print_days(itinerary: &Itinerary) {
	println!(
		"{} | {} | {} to {} | {} activities",
		itinerary.settings.name,
		if itinerary.settings.destinations.is_empty() {
			"(no destinations)".to_string()
		} else {
			itinerary.settings.destinations.join(", ")
		},
		itinerary.settings.start_date,
		itinerary.settings.end_date,
		itinerary.activity_count()
	);
	for day in &itinerary.days {
		println!(
			"{} | {} | {} activities",
			day.date.format("%Y-%m-%d"),
			day.date.format("%a"),
			day.activities.len()
		);
	}
}

fn print_day(day: &Day) {
	println!("{}", day.date.format("%A, %d %B %Y"));
	if day.activities.is_empty() {
		println!("no activities planned");
		return;
	}

	for (index, activity) in day.activities.iter().enumerate() {
		let mut line = format!(
			"{index:>2}. {}-{} | {} | {}",
			activity.start,
			activity.end(),
			activity.id,
			activity.title
		);
		if !activity.location.is_empty() {
			line.push_str(&format!(" @ {}", activity.location));
		}
		if let Some(notes) = &activity.notes {
			line.push_str(&format!(" | {notes}"));
		}
		println!("{line}");

		if !activity.transit.is_empty() {
			println!(
				"      -> {} {}",
				activity
					.transit
					.mode
					.map(|mode| mode.label())
					.unwrap_or("transit"),
				activity.transit.duration.as_deref().unwrap_or("")
			);
		}
		if let Some(url) = day.directions_to(index) {
			println!("      map: {url}");
		}
	}
}
