//! Keyboard event handling and the command line.

use crate::app::{App, AppState, Tab};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hbscan_core::models::FACILITY_LEVELS;
use hbscan_core::{
    Level, ProcurementStatus, Resolution, SearchFilters, SearchQuery, TaskFilter,
};

/// A parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Enter(usize),
    /// Breadcrumb entry, 1-based.
    Up(usize),
    Show(Level),
    Filter(String),
    Search(SearchQuery),
    Refine(SearchFilters),
    Page(String),
    PageSize(usize),
    Open(i64),
    Back,
    ExitSearch,
    History,
    HistoryPick(usize),
    HistoryClear,
    Close,
    Remove(i64),
    Refresh,
    Tasks(Option<TaskFilter>),
    Scan,
    Settings,
    SettingsReset,
    Help,
    Quit,
}

impl Command {
    /// Whether the command acts on the directory tab.
    fn is_directory(&self) -> bool {
        !matches!(
            self,
            Self::Tasks(_) | Self::Scan | Self::Settings | Self::SettingsReset | Self::Help | Self::Quit
        )
    }
}

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {}", what))?;
    arg.parse()
        .map_err(|_| format!("'{}' is not a valid {}", arg, what))
}

/// Split `--level`/`--status` flags from the free text.
fn parse_search_args<'a>(
    mut args: impl Iterator<Item = &'a str>,
) -> Result<(String, SearchFilters), String> {
    let mut words = Vec::new();
    let mut filters = SearchFilters::default();

    while let Some(arg) = args.next() {
        match arg {
            "--level" => {
                let level = args.next().ok_or("--level needs a value")?;
                if !FACILITY_LEVELS.iter().any(|(value, _)| *value == level) {
                    let known: Vec<&str> = FACILITY_LEVELS.iter().map(|(value, _)| *value).collect();
                    return Err(format!("unknown level '{}' (one of {})", level, known.join(", ")));
                }
                filters.levels.insert(level.to_string());
            }
            "--status" => {
                let status = args.next().ok_or("--status needs a value")?;
                filters.procurement_status = ProcurementStatus::parse(status).ok_or_else(|| {
                    format!("unknown status '{}' (verified, unconfirmed, none)", status)
                })?;
            }
            word => words.push(word),
        }
    }
    Ok((words.join(" "), filters))
}

/// Breadcrumb position by number or by name.
fn parse_crumb(arg: Option<&str>) -> Result<usize, String> {
    match arg {
        Some("national") => Ok(1),
        Some("province") => Ok(2),
        Some("city") => Ok(3),
        Some(n) => number(Some(n), "breadcrumb position (or national, province, city)"),
        None => Err("missing breadcrumb position".to_string()),
    }
}

/// Parse one command line. Blank lines list the current view.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(Command::List);
    };

    let command = match name {
        "ls" => Command::List,
        "cd" => Command::Enter(number(parts.next(), "item number")?),
        "up" => Command::Up(parse_crumb(parts.next())?),
        "show" => {
            let arg = parts.next().ok_or("missing list name")?;
            Command::Show(Level::parse(arg).ok_or_else(|| {
                format!("unknown list '{}' (provinces, cities, districts, facilities)", arg)
            })?)
        }
        "filter" => Command::Filter(parts.collect::<Vec<_>>().join(" ")),
        "search" => {
            let (text, filters) = parse_search_args(parts)?;
            Command::Search(SearchQuery { text, filters })
        }
        "refine" => {
            let (text, filters) = parse_search_args(parts)?;
            if !text.is_empty() {
                return Err("refine only takes --level and --status".to_string());
            }
            Command::Refine(filters)
        }
        "page" => Command::Page(parts.next().ok_or("missing page number")?.to_string()),
        "pagesize" => Command::PageSize(number(parts.next(), "page size")?),
        "open" => Command::Open(number(parts.next(), "facility id")?),
        "back" => Command::Back,
        "exit-search" => Command::ExitSearch,
        "history" => match parts.next() {
            None => Command::History,
            Some("clear") => Command::HistoryClear,
            Some(n) => Command::HistoryPick(number(Some(n), "history number")?),
        },
        "close" => Command::Close,
        "rm" => Command::Remove(number(parts.next(), "facility id")?),
        "refresh" => Command::Refresh,
        "tasks" => Command::Tasks(match parts.next() {
            None => None,
            Some(arg) => Some(TaskFilter::parse(arg).ok_or_else(|| {
                format!("unknown task tab '{}' (all, running, completed, failed)", arg)
            })?),
        }),
        "scan" => Command::Scan,
        "settings" => match parts.next() {
            None => Command::Settings,
            Some("reset") => Command::SettingsReset,
            Some(other) => return Err(format!("unknown settings action '{}'", other)),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(command)
}

/// Handle one command line. Returns true if the app should quit.
pub async fn handle_line(app: &mut App, line: &str) -> bool {
    app.message = None;
    app.show_help = false;
    match parse_command(line) {
        Ok(command) => handle_command(app, command).await,
        Err(message) => {
            app.message = Some(message);
            false
        }
    }
}

/// Handle a command. Returns true if the app should quit.
pub async fn handle_command(app: &mut App, command: Command) -> bool {
    if command.is_directory() && app.tab != Tab::Directory {
        app.tab = Tab::Directory;
        app.selected_index = 0;
    }

    let result = match command {
        Command::List => Ok(Resolution::Applied),
        Command::Enter(n) => app.enter(n).await,
        Command::Up(n) => app.up(n),
        Command::Show(level) => app.navigator.show_level(level).map(|()| Resolution::Applied),
        Command::Filter(text) => {
            app.navigator.set_facility_filter(text);
            Ok(Resolution::Applied)
        }
        Command::Search(query) => app.search(query).await,
        Command::Refine(filters) => app.refine(filters).await,
        Command::Page(input) => app.jump_to_page(&input),
        Command::PageSize(size) => app.navigator.set_page_size(size).map(|()| Resolution::Applied),
        Command::Open(id) => app.open(id),
        Command::Back => app.back(),
        Command::ExitSearch => app.navigator.exit_search().map(|()| Resolution::Applied),
        Command::History => app.navigator.show_history().map(|()| Resolution::Applied),
        Command::HistoryPick(n) => app.pick_history(n).await,
        Command::HistoryClear => {
            app.navigator.clear_history();
            app.message = Some("Search history cleared".to_string());
            Ok(Resolution::Applied)
        }
        Command::Close => app.navigator.close_history().map(|()| Resolution::Applied),
        Command::Remove(id) => {
            let result = app.navigator.delete_facility(id).await;
            if result.is_ok() {
                app.message = Some(format!("Deleted facility {}", id));
            }
            result
        }
        Command::Refresh => app.navigator.refresh_current_level_list().await,
        Command::Tasks(filter) => {
            let filter = filter.unwrap_or_else(|| app.navigator.tasks().filter());
            app.show_tasks(filter).await
        }
        Command::Scan => app.start_scan().await,
        Command::Settings => {
            app.describe_settings();
            Ok(Resolution::Applied)
        }
        Command::SettingsReset => {
            app.navigator.reset_settings();
            app.message = Some("Settings restored to defaults".to_string());
            Ok(Resolution::Applied)
        }
        Command::Help => {
            app.show_help = true;
            Ok(Resolution::Applied)
        }
        Command::Quit => {
            app.state = AppState::Quit;
            return true;
        }
    };
    app.report(result);
    if app.selected_index >= app.item_count() {
        app.selected_index = 0;
    }
    false
}

/// Handle a key event. Returns true if the app should quit.
pub async fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    // Ctrl+C to quit
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.state = AppState::Quit;
        return true;
    }

    match key.code {
        KeyCode::Enter => {
            if app.command_input.trim().is_empty() {
                app.command_input.clear();
                app.message = None;
                let result = app.select_current_item().await;
                app.report(result);
                false
            } else {
                let line = std::mem::take(&mut app.command_input);
                handle_line(app, &line).await
            }
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else if app.command_input.is_empty() {
                app.message = None;
                let result = app.back();
                app.report(result);
            } else {
                app.command_input.clear();
            }
            false
        }
        KeyCode::Up => {
            app.move_up();
            false
        }
        KeyCode::Down => {
            app.move_down();
            false
        }
        KeyCode::PageUp => {
            if app.tab == Tab::Directory {
                let result = app.jump_to_page("prev");
                app.report(result);
            }
            false
        }
        KeyCode::PageDown => {
            if app.tab == Tab::Directory {
                let result = app.jump_to_page("next");
                app.report(result);
            }
            false
        }
        KeyCode::Tab => {
            app.toggle_tab().await;
            false
        }
        KeyCode::Char(c) => {
            app.command_input.push(c);
            false
        }
        KeyCode::Backspace => {
            app.command_input.pop();
            false
        }
        _ => false,
    }
}
