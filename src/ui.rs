use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::NaiveDate;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::clock::{ClockTime, StayDuration};
use crate::domain::{Activity, ActivityForm, Day, Itinerary, TransportMode};
use crate::error::PlannerError;
use crate::storage::{load_itinerary, save_itinerary};
use crate::trips::RecentTrips;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const REORDER_PANEL_BORDER_COLOR: Color = Color::LightMagenta;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

pub fn run_dashboard(
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	recent: &RecentTrips,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, itinerary, trip_path, recent);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	recent: &RecentTrips,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	loop {
		app.clamp_selection(itinerary);
		let view = build_view(&app, itinerary);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, itinerary, trip_path),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, itinerary, trip_path, recent),
					InputMode::Normal => handle_normal_key(&mut app, key.code, itinerary, trip_path, recent),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(10), Constraint::Length(5)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(24),
			Constraint::Percentage(46),
			Constraint::Percentage(30),
		])
		.split(layout[0]);

	render_days_panel(frame, body[0], app, view);
	render_timeline_panel(frame, body[1], app, view);
	render_details_panel(frame, body[2], view);
	render_footer(frame, layout[1], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_days_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.day_rows
		.iter()
		.map(|row| ListItem::new(row.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.day_rows.is_empty() {
		state.select(Some(app.day_index.min(view.day_rows.len() - 1)));
	}

	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(no days)")]
	} else {
		items
	})
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title(view.trip_title.clone())
			.border_style(border_style(app.focus == FocusPane::Days)),
	)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_timeline_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let mut items = view
		.timeline_rows
		.iter()
		.map(|row| ListItem::new(row.clone()))
		.collect::<Vec<_>>();
	if items.is_empty() {
		items.push(ListItem::new("(nothing planned, press a to add)"));
	}

	let mut state = ListState::default();
	if !view.timeline_rows.is_empty() {
		state.select(Some(app.activity_index.min(view.timeline_rows.len() - 1)));
	}

	let border = if app.reorder_mode {
		Style::default()
			.fg(REORDER_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		border_style(app.focus == FocusPane::Timeline)
	};
	let title = if app.reorder_mode {
		format!("{} | reorder mode", view.day_title)
	} else {
		view.day_title.clone()
	};

	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title(title).border_style(border))
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_details_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let panel = Paragraph::new(view.detail_lines.clone())
		.block(Block::default().borders(Borders::ALL).title("Details"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal if app.reorder_mode => vec![
			Line::from("J/K swap selected activity down/up | j/k move | e leave reorder mode (re-sorts by time)"),
			Line::from("Manual order is kept only until the next save or re-sort"),
			Line::from(app.status.clone()),
		],
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/jk navigate | q quit | g switch trip"),
			Line::from("a add | t retime (cascades) | m move to day | x delete | e reorder mode"),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(56, 50, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()))
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	recent: &RecentTrips,
) -> bool {
	match code {
		KeyCode::Char('q') => {
			if let Err(err) = finish_reorder(app, itinerary, trip_path) {
				tracing::warn!(%err, "failed to restore time order on quit");
			}
			return true;
		}
		KeyCode::Tab => app.focus = app.focus.toggle(),
		KeyCode::Down | KeyCode::Char('j') => navigate(app, itinerary, trip_path, 1),
		KeyCode::Up | KeyCode::Char('k') => navigate(app, itinerary, trip_path, -1),
		KeyCode::Char('J') if app.reorder_mode => swap_selected(app, itinerary, trip_path, 1),
		KeyCode::Char('K') if app.reorder_mode => swap_selected(app, itinerary, trip_path, -1),
		KeyCode::Char('e') => toggle_reorder_mode(app, itinerary, trip_path),
		KeyCode::Char('a') => {
			if app.selected_date(itinerary).is_some() {
				app.mode = InputMode::Prompt(PromptState::new("Activity title", PromptKind::AddTitle));
			} else {
				app.status = "trip has no days".to_string();
			}
		}
		KeyCode::Char('t') => match app.selected_activity(itinerary) {
			Some((date, activity)) => {
				app.mode = InputMode::Prompt(PromptState::prefilled(
					format!("New start for {} (HH:MM)", activity.title),
					activity.start.to_string(),
					PromptKind::Retime {
						date,
						activity_id: activity.id.clone(),
					},
				));
			}
			None => app.status = "select an activity first".to_string(),
		},
		KeyCode::Char('m') => match app.selected_activity(itinerary) {
			Some((date, activity)) => {
				app.mode = InputMode::Select(build_move_target_select(itinerary, date, activity));
			}
			None => app.status = "select an activity first".to_string(),
		},
		KeyCode::Char('x') => match app.selected_activity(itinerary) {
			Some((date, activity)) => {
				app.mode = InputMode::Select(build_delete_confirm_select(date, activity));
			}
			None => app.status = "select an activity first".to_string(),
		},
		KeyCode::Char('g') => {
			let opened = finish_reorder(app, itinerary, trip_path)
				.and_then(|_| build_trip_switch_select(trip_path, recent));
			match opened {
				Ok(select) => app.mode = InputMode::Select(select),
				Err(err) => app.status = format!("error: {err}"),
			}
		}
		_ => {}
	}

	false
}

fn toggle_reorder_mode(app: &mut App, itinerary: &mut Itinerary, trip_path: &Path) {
	if !app.reorder_mode {
		app.reorder_mode = true;
		app.focus = FocusPane::Timeline;
		app.status = "Reorder mode: manual order lasts until the next save or re-sort".to_string();
		return;
	}

	app.status = match finish_reorder(app, itinerary, trip_path) {
		Ok(_) => "Back to time order".to_string(),
		Err(err) => format!("error: {err}"),
	};
}

/// Ends reorder mode, saving the selected day back in start-time order.
///
/// Returns whether a re-sort happened.
fn finish_reorder(app: &mut App, itinerary: &mut Itinerary, trip_path: &Path) -> Result<bool, String> {
	let resorted = app.leave_reorder_mode(itinerary).map_err(|err| err.to_string())?;
	if resorted {
		persist(trip_path, itinerary)?;
	}
	Ok(resorted)
}

fn navigate(app: &mut App, itinerary: &mut Itinerary, trip_path: &Path, delta: i32) {
	match app.move_selection(delta, itinerary) {
		Ok(false) => {}
		Ok(true) => {
			app.status = match persist(trip_path, itinerary) {
				Ok(()) => "Left reorder mode; previous day is back in time order".to_string(),
				Err(err) => format!("error: {err}"),
			};
		}
		Err(err) => app.status = format!("error: {err}"),
	}
}

fn after_change(app: &mut App, itinerary: &mut Itinerary, trip_path: &Path, message: String) {
	app.status = match finish_reorder(app, itinerary, trip_path) {
		Ok(_) => message,
		Err(err) => format!("{message} (error: {err})"),
	};
}

fn swap_selected(app: &mut App, itinerary: &mut Itinerary, trip_path: &Path, delta: i32) {
	let Some(date) = app.selected_date(itinerary) else {
		return;
	};
	let index = app.activity_index;
	let len = itinerary.day(date).map(|day| day.activities.len()).unwrap_or(0);

	let result = if delta > 0 {
		itinerary.swap_down(date, index)
	} else {
		itinerary.swap_up(date, index)
	};
	if let Err(err) = result {
		app.status = format!("error: {err}");
		return;
	}

	if delta > 0 && index + 1 < len {
		app.activity_index += 1;
	} else if delta < 0 && index > 0 && index < len {
		app.activity_index -= 1;
	}
	app.status = match persist(trip_path, itinerary) {
		Ok(()) => "Order changed (not kept after the next save)".to_string(),
		Err(err) => format!("error: {err}"),
	};
}

fn handle_prompt_key(app: &mut App, code: KeyCode, itinerary: &mut Itinerary, trip_path: &Path) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};
			let Some(date) = app.selected_date(itinerary) else {
				return false;
			};

			match submit_prompt(prompt.clone(), date, itinerary, trip_path) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					after_change(app, itinerary, trip_path, message);
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(
	app: &mut App,
	code: KeyCode,
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	recent: &RecentTrips,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), itinerary, trip_path, recent) {
				Ok(SelectOutcome::Done(message)) => after_change(app, itinerary, trip_path, message),
				Ok(SelectOutcome::SwitchedTrip(message)) => {
					*app = App {
						status: message,
						..App::default()
					};
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(
	prompt: PromptState,
	date: NaiveDate,
	itinerary: &mut Itinerary,
	trip_path: &Path,
) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::AddTitle => {
			let title = required_text(&prompt.input, "title")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Location (optional)",
				PromptKind::AddLocation {
					draft: ActivityForm {
						title,
						..ActivityForm::default()
					},
				},
			)))
		}
		PromptKind::AddLocation { mut draft } => {
			draft.location = optional_text(&prompt.input);
			let suggested = itinerary.suggest_start(date).map_err(|err| err.to_string())?;
			Ok(PromptOutcome::NextPrompt(PromptState::prefilled(
				"Start time (HH:MM, suggested from the previous activity)",
				suggested.to_string(),
				PromptKind::AddTime { draft },
			)))
		}
		PromptKind::AddTime { mut draft } => {
			draft.time = optional_text(&prompt.input).map(|raw| strict_time(&raw)).transpose()?;
			Ok(PromptOutcome::NextPrompt(PromptState::prefilled(
				"Stay (HH:MM)",
				StayDuration::default().to_string(),
				PromptKind::AddStay { draft },
			)))
		}
		PromptKind::AddStay { mut draft } => {
			draft.stay = optional_text(&prompt.input);
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Transit to the next stop, e.g. \"20 mins\" (optional)",
				PromptKind::AddTransit { draft },
			)))
		}
		PromptKind::AddTransit { mut draft } => {
			draft.transit_duration = optional_text(&prompt.input);
			Ok(PromptOutcome::Select(build_transport_select(date, draft)))
		}
		PromptKind::Retime { date, activity_id } => {
			let current = itinerary
				.day(date)
				.and_then(|day| day.activity(&activity_id))
				.ok_or_else(|| format!("activity not found: {activity_id}"))?;
			let mut form = ActivityForm::from_activity(current);
			form.time = Some(strict_time(&required_text(&prompt.input, "start time")?)?);
			let title = current.title.clone();
			itinerary
				.update_activity(date, &activity_id, form, None)
				.map_err(|err| err.to_string())?;
			persist(trip_path, itinerary)?;
			Ok(PromptOutcome::Done(format!("retimed {title}; the next activity follows it")))
		}
	}
}

fn submit_select(
	select: SelectState,
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	recent: &RecentTrips,
) -> Result<SelectOutcome, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::Transport { date, mut draft } => {
			draft.transport = selected_value;
			let title = draft.title.clone();
			itinerary.add_activity(date, draft).map_err(|err| err.to_string())?;
			persist(trip_path.as_path(), itinerary)?;
			Ok(SelectOutcome::Done(format!("added {title}")))
		}
		SelectKind::MoveTarget { date, activity_id } => {
			let target = selected_value
				.as_deref()
				.ok_or_else(|| "selected day is missing".to_string())
				.and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| err.to_string()))?;
			itinerary
				.move_activity(&activity_id, date, target)
				.map_err(|err| err.to_string())?;
			persist(trip_path.as_path(), itinerary)?;
			Ok(SelectOutcome::Done(format!("moved to {}", target.format("%a %d %b"))))
		}
		SelectKind::DeleteConfirm {
			date,
			activity_id,
			title,
		} => {
			if selected_value.as_deref() == Some("delete") {
				itinerary
					.delete_activity(date, &activity_id)
					.map_err(|err| err.to_string())?;
				persist(trip_path.as_path(), itinerary)?;
				Ok(SelectOutcome::Done(format!("deleted {title}")))
			} else {
				Ok(SelectOutcome::Done("Delete cancelled".to_string()))
			}
		}
		SelectKind::TripSwitch => {
			let selected_path = selected_value
				.map(PathBuf::from)
				.ok_or_else(|| "selected trip path is missing".to_string())?;
			switch_trip(itinerary, trip_path, selected_path, recent).map(SelectOutcome::SwitchedTrip)
		}
	}
}

fn build_transport_select(date: NaiveDate, draft: ActivityForm) -> SelectState {
	let mut options = vec![SelectOption::new("(none)", None)];
	options.extend(
		TransportMode::ALL
			.into_iter()
			.map(|mode| SelectOption::new(mode.label(), Some(mode.label().to_string()))),
	);
	SelectState::new("Transport to the next stop", SelectKind::Transport { date, draft }, options)
}

fn build_move_target_select(itinerary: &Itinerary, date: NaiveDate, activity: &Activity) -> SelectState {
	let options = itinerary
		.days
		.iter()
		.filter(|day| day.date != date)
		.map(|day| {
			SelectOption::new(
				format!("{} ({} planned)", day.date.format("%a %d %b"), day.activities.len()),
				Some(day.date.format("%Y-%m-%d").to_string()),
			)
		})
		.collect();
	SelectState::new(
		format!("Move {} to", activity.title),
		SelectKind::MoveTarget {
			date,
			activity_id: activity.id.clone(),
		},
		options,
	)
}

fn build_delete_confirm_select(date: NaiveDate, activity: &Activity) -> SelectState {
	SelectState::new(
		format!("Delete {}?", activity.title),
		SelectKind::DeleteConfirm {
			date,
			activity_id: activity.id.clone(),
			title: activity.title.clone(),
		},
		vec![
			SelectOption::new("Cancel", Some("cancel".to_string())),
			SelectOption::new("Delete", Some("delete".to_string())),
		],
	)
}

fn build_trip_switch_select(current_path: &Path, recent: &RecentTrips) -> Result<SelectState, String> {
	let options = recent
		.paths()
		.map_err(|err| err.to_string())?
		.into_iter()
		.map(|path| {
			let marker = if path == current_path { " (current)" } else { "" };
			SelectOption::new(
				format!("{}{marker}", path.display()),
				Some(path.display().to_string()),
			)
		})
		.collect::<Vec<_>>();

	if options.is_empty() {
		return Err("no recent trips".to_string());
	}
	Ok(SelectState::new("Switch trip", SelectKind::TripSwitch, options))
}

fn switch_trip(
	itinerary: &mut Itinerary,
	trip_path: &mut PathBuf,
	next_path: PathBuf,
	recent: &RecentTrips,
) -> Result<String, String> {
	let next = load_itinerary(&next_path)
		.map_err(|err| err.to_string())?
		.ok_or_else(|| format!("no trip at {}", next_path.display()))?;
	*itinerary = next;
	*trip_path = next_path;

	match recent.remember(trip_path) {
		Ok(()) => Ok(format!("switched trip: {}", itinerary.settings.name)),
		Err(err) => Ok(format!(
			"switched trip: {} (warning: failed to store recents: {err})",
			itinerary.settings.name
		)),
	}
}

fn build_view(app: &App, itinerary: &Itinerary) -> ViewModel {
	let day_rows = itinerary.days.iter().map(day_row_line).collect();
	let selected_day = itinerary.days.get(app.day_index);

	let (day_title, timeline_rows) = match selected_day {
		Some(day) => (
			day.date.format("%A, %d %B %Y").to_string(),
			day.activities
				.iter()
				.map(|activity| timeline_row_line(activity, app.reorder_mode))
				.collect(),
		),
		None => ("No day selected".to_string(), Vec::new()),
	};

	let detail_lines = match selected_day {
		Some(day) => detail_lines(day, app.activity_index),
		None => vec![Line::from("(empty trip)")],
	};

	ViewModel {
		trip_title: itinerary.settings.name.clone(),
		day_rows,
		day_title,
		timeline_rows,
		detail_lines,
	}
}

fn day_row_line(day: &Day) -> Line<'static> {
	let count_style = if day.activities.is_empty() {
		Style::default().fg(Color::DarkGray)
	} else {
		Style::default().fg(Color::LightYellow)
	};
	Line::from(vec![
		Span::raw(day.date.format("%a %d %b").to_string()),
		Span::styled(format!("  {}", day.activities.len()), count_style),
	])
}

fn timeline_row_line(activity: &Activity, reorder_mode: bool) -> Line<'static> {
	let time_style = if reorder_mode {
		Style::default().fg(Color::DarkGray)
	} else {
		Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
	};

	let mut spans = vec![
		Span::styled(activity.start.to_string(), time_style),
		Span::styled(format!("-{} ", activity.end()), Style::default().fg(Color::DarkGray)),
		Span::raw(activity.title.clone()),
	];
	if !activity.location.is_empty() {
		spans.push(Span::styled(
			format!(" @ {}", activity.location),
			Style::default().fg(Color::Cyan),
		));
	}
	if let Some(transit) = transit_label(activity) {
		spans.push(Span::styled(format!("  -> {transit}"), Style::default().fg(Color::DarkGray)));
	}
	Line::from(spans)
}

fn detail_lines(day: &Day, index: usize) -> Vec<Line<'static>> {
	let mut lines = Vec::new();
	match day.activities.get(index) {
		Some(activity) => {
			lines.push(Line::from(Span::styled(
				activity.title.clone(),
				Style::default().add_modifier(Modifier::BOLD),
			)));
			lines.push(Line::from(format!("Start: {}", activity.start)));
			lines.push(Line::from(format!("Stay: {}", activity.stay)));
			lines.push(Line::from(format!("Ends: {}", activity.end())));
			lines.push(Line::from(format!(
				"Location: {}",
				if activity.location.is_empty() { "-" } else { activity.location.as_str() }
			)));
			lines.push(Line::from(format!(
				"Transit: {}",
				transit_label(activity).unwrap_or_else(|| "-".to_string())
			)));
			if let Some(notes) = &activity.notes {
				lines.push(Line::from(""));
				lines.push(Line::from(notes.clone()));
			}
			let legs = [
				("Directions here", day.directions_to(index)),
				("Directions onward", day.directions_to(index + 1)),
			];
			for (label, url) in legs {
				if let Some(url) = url {
					lines.push(Line::from(""));
					lines.push(Line::from(format!("{label}:")));
					lines.push(Line::from(Span::styled(url, Style::default().fg(Color::Cyan))));
				}
			}
			lines.push(Line::from(""));
			lines.push(Line::from(Span::styled(
				format!("id {}", activity.id),
				Style::default().fg(Color::DarkGray),
			)));
		}
		None => lines.push(Line::from("(no activity selected)")),
	}

	lines.push(Line::from(""));
	lines.push(Line::from(format!(
		"Next suggested start: {}",
		crate::schedule::suggest_next_start(day)
	)));
	lines
}

fn transit_label(activity: &Activity) -> Option<String> {
	let mode = activity.transit.mode.map(|mode| mode.label().to_string());
	let duration = activity.transit.duration.clone();
	match (mode, duration) {
		(Some(mode), Some(duration)) => Some(format!("{mode} {duration}")),
		(Some(mode), None) => Some(mode),
		(None, Some(duration)) => Some(duration),
		(None, None) => None,
	}
}

fn persist(path: &Path, itinerary: &Itinerary) -> Result<(), String> {
	save_itinerary(path, itinerary).map_err(|err| err.to_string())
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn strict_time(raw: &str) -> Result<String, String> {
	ClockTime::parse(raw)
		.map(|time| time.to_string())
		.ok_or_else(|| format!("start time must be HH:MM, got `{raw}`"))
}

fn optional_text(input: &str) -> Option<String> {
	let value = input.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
enum SelectOutcome {
	Done(String),
	SwitchedTrip(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::prefilled(title, String::new(), kind)
	}

	fn prefilled(title: impl Into<String>, input: String, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: Option<String>,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: Option<String>) -> Self {
		Self {
			label: label.into(),
			value,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	AddTitle,
	AddLocation { draft: ActivityForm },
	AddTime { draft: ActivityForm },
	AddStay { draft: ActivityForm },
	AddTransit { draft: ActivityForm },
	Retime { date: NaiveDate, activity_id: String },
}

#[derive(Debug, Clone)]
enum SelectKind {
	Transport {
		date: NaiveDate,
		draft: ActivityForm,
	},
	MoveTarget {
		date: NaiveDate,
		activity_id: String,
	},
	DeleteConfirm {
		date: NaiveDate,
		activity_id: String,
		title: String,
	},
	TripSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Days,
	Timeline,
}

impl FocusPane {
	fn toggle(self) -> Self {
		match self {
			FocusPane::Days => FocusPane::Timeline,
			FocusPane::Timeline => FocusPane::Days,
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	focus: FocusPane,
	day_index: usize,
	activity_index: usize,
	reorder_mode: bool,
	mode: InputMode,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			focus: FocusPane::Days,
			day_index: 0,
			activity_index: 0,
			reorder_mode: false,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn clamp_selection(&mut self, itinerary: &Itinerary) {
		self.day_index = clamp_index(self.day_index, itinerary.days.len());
		let activities = itinerary
			.days
			.get(self.day_index)
			.map(|day| day.activities.len())
			.unwrap_or(0);
		self.activity_index = clamp_index(self.activity_index, activities);
	}

	/// Moves the cursor in the focused pane. Changing day ends reorder mode;
	/// the result tells whether the day left behind was re-sorted.
	fn move_selection(&mut self, delta: i32, itinerary: &mut Itinerary) -> Result<bool, PlannerError> {
		match self.focus {
			FocusPane::Days => {
				let next = step_index(self.day_index, delta, itinerary.days.len());
				if next == self.day_index {
					return Ok(false);
				}
				let resorted = self.leave_reorder_mode(itinerary)?;
				self.day_index = next;
				self.activity_index = 0;
				Ok(resorted)
			}
			FocusPane::Timeline => {
				let len = itinerary
					.days
					.get(self.day_index)
					.map(|day| day.activities.len())
					.unwrap_or(0);
				self.activity_index = step_index(self.activity_index, delta, len);
				Ok(false)
			}
		}
	}

	fn leave_reorder_mode(&mut self, itinerary: &mut Itinerary) -> Result<bool, PlannerError> {
		if !self.reorder_mode {
			return Ok(false);
		}
		self.reorder_mode = false;
		match self.selected_date(itinerary) {
			Some(date) => itinerary.resort_day(date).map(|()| true),
			None => Ok(false),
		}
	}

	fn selected_date(&self, itinerary: &Itinerary) -> Option<NaiveDate> {
		itinerary.days.get(self.day_index).map(|day| day.date)
	}

	fn selected_activity<'a>(&self, itinerary: &'a Itinerary) -> Option<(NaiveDate, &'a Activity)> {
		let day = itinerary.days.get(self.day_index)?;
		day.activities
			.get(self.activity_index)
			.map(|activity| (day.date, activity))
	}
}

fn clamp_index(index: usize, len: usize) -> usize {
	if len == 0 { 0 } else { index.min(len - 1) }
}

fn step_index(index: usize, delta: i32, len: usize) -> usize {
	if len == 0 {
		return 0;
	}
	if delta > 0 {
		(index + delta as usize).min(len - 1)
	} else {
		index.saturating_sub(delta.unsigned_abs() as usize)
	}
}

struct ViewModel {
	trip_title: String,
	day_rows: Vec<Line<'static>>,
	day_title: String,
	timeline_rows: Vec<Line<'static>>,
	detail_lines: Vec<Line<'static>>,
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use crate::domain::{ActivityForm, Itinerary, TripSettings};
	use crate::storage::load_itinerary;

	use super::{App, FocusPane, clamp_index, finish_reorder, step_index, strict_time};

	fn titles(itinerary: &Itinerary, day: usize) -> Vec<String> {
		itinerary.days[day]
			.activities
			.iter()
			.map(|activity| activity.title.clone())
			.collect()
	}

	fn itinerary() -> Itinerary {
		let start = NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date");
		let end = NaiveDate::from_ymd_opt(2026, 9, 2).expect("valid date");
		let mut itinerary =
			Itinerary::new(TripSettings::new("Test".to_string(), Vec::new(), start, end)).expect("itinerary");
		for title in ["A", "B"] {
			itinerary
				.add_activity(
					start,
					ActivityForm {
						title: title.to_string(),
						..ActivityForm::default()
					},
				)
				.expect("add");
		}
		itinerary
	}

	#[test]
	fn step_index_stays_in_bounds() {
		assert_eq!(step_index(0, -1, 3), 0);
		assert_eq!(step_index(2, 1, 3), 2);
		assert_eq!(step_index(1, 1, 3), 2);
		assert_eq!(step_index(4, 1, 0), 0);
		assert_eq!(clamp_index(9, 2), 1);
	}

	#[test]
	fn typed_times_must_be_clock_values() {
		assert_eq!(strict_time(" 7:05 ").expect("valid"), "07:05");
		assert!(strict_time("25:00").is_err());
		assert!(strict_time("noon").is_err());
	}

	#[test]
	fn changing_day_leaves_reorder_mode() {
		let mut itinerary = itinerary();
		let first_day = itinerary.days[0].date;
		itinerary.swap_down(first_day, 0).expect("swap");
		assert_eq!(titles(&itinerary, 0), vec!["B", "A"]);

		let mut app = App {
			reorder_mode: true,
			activity_index: 1,
			..App::default()
		};
		app.focus = FocusPane::Days;
		let resorted = app.move_selection(1, &mut itinerary).expect("move");

		assert!(resorted);
		assert_eq!(app.day_index, 1);
		assert_eq!(app.activity_index, 0);
		assert!(!app.reorder_mode);
		assert_eq!(titles(&itinerary, 0), vec!["A", "B"]);
	}

	#[test]
	fn finishing_reorder_saves_time_order() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("reorder.trip");
		let mut itinerary = itinerary();
		let first_day = itinerary.days[0].date;
		itinerary.swap_down(first_day, 0).expect("swap");

		let mut app = App {
			reorder_mode: true,
			..App::default()
		};
		assert!(finish_reorder(&mut app, &mut itinerary, &path).expect("finish"));
		assert!(!app.reorder_mode);

		let saved = load_itinerary(&path).expect("load").expect("trip");
		assert_eq!(titles(&saved, 0), vec!["A", "B"]);
		assert!(!finish_reorder(&mut app, &mut itinerary, &path).expect("finish again"));
	}

	#[test]
	fn selected_activity_follows_timeline_cursor() {
		let mut itinerary = itinerary();
		let mut app = App {
			focus: FocusPane::Timeline,
			..App::default()
		};
		assert!(!app.move_selection(1, &mut itinerary).expect("move"));

		let (_, activity) = app.selected_activity(&itinerary).expect("selected");
		assert_eq!(activity.title, "B");
	}
}
