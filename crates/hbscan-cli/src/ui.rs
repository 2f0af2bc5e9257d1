//! UI rendering with Ratatui.

use crate::app::{App, Tab};
use hbscan_core::{
    Facility, HierarchyCursor, Level, LinkStatus, NavigationMode, PageItem, PageWindow,
    SearchHistory, SearchSession, Task, TaskBoard, TaskFilter, TaskStatus,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

const HELP: &[(&str, &str)] = &[
    ("Enter", "open the highlighted row, or run the typed command"),
    ("Esc", "clear the command line, or go back"),
    ("Up/Down", "move the highlight"),
    ("PgUp/PgDn", "previous / next results page"),
    ("Tab", "switch between directory and tasks"),
    ("cd <n>", "open row n"),
    ("up <n>|national|province|city", "jump to breadcrumb entry n"),
    ("show <list>", "provinces, cities, districts or facilities"),
    ("filter <text>", "filter the facility list by name or address"),
    ("search <text> [--level L] [--status S]", "search all facilities"),
    ("refine [--level L] [--status S]", "re-run the search with new filters"),
    ("page <n>|next|prev", "change results page"),
    ("pagesize <n>", "results per page"),
    ("exit-search", "back to browsing"),
    ("history [<n>|clear]", "recent searches"),
    ("open <id> / rm <id>", "show or delete a facility"),
    ("refresh", "reload the current list"),
    ("tasks [all|running|completed|failed]", "crawl tasks"),
    ("scan", "start a nationwide scan"),
    ("settings [reset]", "show or reset settings"),
    ("quit", "leave hbscan (also Ctrl+C)"),
];

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tabs
            Constraint::Min(3),    // Current view
            Constraint::Length(1), // Status / page picker
            Constraint::Length(1), // Message
            Constraint::Length(3), // Command line
        ])
        .split(area);

    frame.render_widget(Paragraph::new(tab_line(app)), chunks[0]);
    match app.tab {
        Tab::Directory => render_directory(frame, app, chunks[1]),
        Tab::Tasks => render_tasks(frame, app, chunks[1]),
    }
    frame.render_widget(Paragraph::new(status_line(app)), chunks[2]);

    if let Some(ref message) = app.message {
        let message = Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow));
        frame.render_widget(message, chunks[3]);
    }

    let input_line = Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Magenta)),
        Span::raw(app.command_input.as_str()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]);
    let input = Paragraph::new(input_line).block(
        Block::default()
            .title(" Command (help: ?) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(input, chunks[4]);

    if app.show_help {
        render_help(frame, area);
    }
}

fn tab_line(app: &App) -> Line<'static> {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(
                format!(" {} ", label),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(Color::DarkGray))
        }
    };
    Line::from(vec![
        tab("Directory", app.tab == Tab::Directory),
        Span::raw(" "),
        tab("Tasks", app.tab == Tab::Tasks),
        Span::styled(
            format!("  {}", app.navigator.mode().name()),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn render_directory(frame: &mut Frame, app: &App, area: Rect) {
    let navigator = &app.navigator;
    let (title, items) = match navigator.mode() {
        NavigationMode::Browsing => {
            let cursor = navigator.cursor();
            (breadcrumb_title(cursor), browse_items(cursor))
        }
        NavigationMode::Searching => {
            let session = navigator.search();
            (search_title(session), result_items(session))
        }
        NavigationMode::ViewingHistory { .. } => (
            " Recent searches ".to_string(),
            history_items(navigator.history()),
        ),
        NavigationMode::ViewingDetail { facility, .. } => {
            let block = Block::default()
                .title(format!(" {} ", facility.name))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan));
            let detail = Paragraph::new(detail_lines(facility))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(detail, area);
            return;
        }
    };

    let placeholder = empty_text(app);
    render_list(frame, app, area, title, items, placeholder);
}

fn render_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let board = app.navigator.tasks();
    let title = format!(" Tasks: {} ", board.filter().as_param());
    render_list(frame, app, area, title, task_items(board), empty_text(app));
}

fn render_list(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    title: String,
    items: Vec<Line<'static>>,
    placeholder: String,
) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if items.is_empty() {
        let empty = Paragraph::new(placeholder)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items.into_iter().map(ListItem::new))
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(60, 60, 80))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    let mut state = ListState::default().with_selected(Some(app.selected_index));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Text shown in place of an empty list.
fn empty_text(app: &App) -> String {
    if app.tab == Tab::Tasks {
        return match app.navigator.tasks().filter() {
            TaskFilter::All => "(no tasks)".to_string(),
            filter => format!("(no {} tasks)", filter.as_param()),
        };
    }
    match app.navigator.mode() {
        NavigationMode::Browsing => format!("(no {})", app.navigator.cursor().active_level()),
        NavigationMode::Searching if app.navigator.search().has_searched() => {
            "No facilities match.".to_string()
        }
        NavigationMode::Searching => String::new(),
        _ => "(no search history)".to_string(),
    }
}

/// Loading state, last error, or the page picker.
fn status_line(app: &App) -> Line<'static> {
    let navigator = &app.navigator;
    let (loading, error) = match (app.tab, navigator.mode()) {
        (Tab::Tasks, _) => (
            navigator.tasks().is_loading(),
            navigator.tasks().last_error().map(ToString::to_string),
        ),
        (Tab::Directory, NavigationMode::Browsing) => (
            navigator.cursor().is_loading(),
            navigator.cursor().last_error().map(ToString::to_string),
        ),
        (Tab::Directory, NavigationMode::Searching) => (
            navigator.search().is_loading(),
            navigator.search().last_error().map(ToString::to_string),
        ),
        _ => (false, None),
    };

    if let Some(error) = error {
        return Line::from(Span::styled(
            format!("error: {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    if loading {
        return Line::from(Span::styled("loading...", Style::default().fg(Color::DarkGray)));
    }
    if app.tab == Tab::Directory && navigator.mode() == &NavigationMode::Searching {
        let window = navigator.search().page_window();
        if window.shows_controls() {
            return page_picker(&window);
        }
    }
    Line::default()
}

fn breadcrumb_title(cursor: &HierarchyCursor) -> String {
    let trail: Vec<String> = cursor
        .breadcrumb()
        .into_iter()
        .enumerate()
        .map(|(i, crumb)| format!("{}:{}", i + 1, crumb.label))
        .collect();
    let mut title = format!(" {} ", trail.join(" > "));
    if cursor.active_level() == Level::Facilities && !cursor.facility_filter().is_empty() {
        title.push_str(&format!("[filter: {}] ", cursor.facility_filter()));
    }
    title
}

fn numbered(n: usize, text: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:>3}. ", n), Style::default().fg(Color::DarkGray)),
        Span::raw(text),
    ])
}

fn browse_items(cursor: &HierarchyCursor) -> Vec<Line<'static>> {
    let names: Vec<String> = match cursor.active_level() {
        Level::Provinces => cursor.provinces().iter().map(|p| p.name.clone()).collect(),
        Level::Cities => cursor.cities().iter().map(|c| c.name.clone()).collect(),
        Level::Districts => cursor.districts().iter().map(|d| d.name.clone()).collect(),
        Level::Facilities => {
            return cursor
                .visible_facilities()
                .into_iter()
                .enumerate()
                .map(|(i, facility)| facility_line(i + 1, facility))
                .collect()
        }
    };
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| numbered(i + 1, name))
        .collect()
}

fn search_title(session: &SearchSession) -> String {
    let query = session.query();
    let mut title = if query.text.trim().is_empty() {
        " Search (all facilities)".to_string()
    } else {
        format!(" Search \"{}\"", query.text)
    };
    if !query.filters.levels.is_empty() {
        let levels: Vec<&str> = query.filters.levels.iter().map(String::as_str).collect();
        title.push_str(&format!(" level={}", levels.join(",")));
    }
    if let Some(status) = query.filters.procurement_status.as_param() {
        title.push_str(&format!(" status={}", status));
    }
    if let Some(results) = session.results() {
        title.push_str(&format!(" - {} results", results.len()));
    }
    title.push(' ');
    title
}

/// Rows of the current results page, numbered from 1 on every page.
fn result_items(session: &SearchSession) -> Vec<Line<'static>> {
    session
        .current_page_items()
        .iter()
        .enumerate()
        .map(|(i, facility)| facility_line(i + 1, facility))
        .collect()
}

fn history_items(history: &SearchHistory) -> Vec<Line<'static>> {
    history
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| numbered(i + 1, entry.clone()))
        .collect()
}

fn facility_line(n: usize, facility: &Facility) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{:>3}. ", n), Style::default().fg(Color::DarkGray)),
        Span::raw(facility.name.clone()),
        Span::styled(format!(" #{}", facility.id), Style::default().fg(Color::DarkGray)),
    ];
    if !facility.grade.is_empty() {
        spans.push(Span::styled(
            format!(" [{}]", facility.grade),
            Style::default().fg(Color::Yellow),
        ));
    }
    if !facility.address.is_empty() {
        spans.push(Span::styled(
            format!(" {}", facility.address),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn detail_lines(facility: &Facility) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("#{}", facility.id),
        Style::default().fg(Color::DarkGray),
    ))];
    let mut field = |label: &str, value: String, color: Color| {
        if !value.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<12} ", label), Style::default().fg(Color::DarkGray)),
                Span::styled(value, Style::default().fg(color)),
            ]));
        }
    };
    field("grade", facility.grade.clone(), Color::Yellow);
    field("address", facility.address.clone(), Color::White);
    field("phone", facility.phone.clone(), Color::Green);
    if let Some(beds) = facility.beds_count {
        field("beds", beds.to_string(), Color::White);
    }
    field("departments", facility.departments.join(", "), Color::White);
    field(
        "website",
        link_text(facility.website_status(), facility.website.as_deref()),
        Color::Blue,
    );
    field(
        "procurement",
        link_text(
            facility.procurement_status(),
            facility.base_procurement_link.as_deref(),
        ),
        Color::Blue,
    );
    lines
}

fn link_text(status: LinkStatus, link: Option<&str>) -> String {
    match status {
        LinkStatus::Available => link.unwrap_or_default().trim().to_string(),
        LinkStatus::Unverified => "(not verified)".to_string(),
        LinkStatus::ConfirmedNone => "(none)".to_string(),
    }
}

fn task_items(board: &TaskBoard) -> Vec<Line<'static>> {
    board
        .visible_tasks()
        .into_iter()
        .map(task_line)
        .collect()
}

fn task_line(task: &Task) -> Line<'static> {
    let color = match task.status {
        TaskStatus::Pending => Color::DarkGray,
        TaskStatus::Running => Color::Cyan,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Failed => Color::Red,
    };
    let mut spans = vec![
        Span::styled(format!("{:<9} ", task.status.label()), Style::default().fg(color)),
        Span::raw(format!("{} {}", task.kind.label(), task.task_id)),
    ];
    if !task.progress.is_empty() {
        spans.push(Span::raw(format!(" ({})", task.progress)));
    }
    spans.push(Span::styled(
        format!(" updated {}", format_timestamp(&task.updated_at)),
        Style::default().fg(Color::DarkGray),
    ));
    if let Some(error) = &task.error {
        spans.push(Span::styled(
            format!(" {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

/// Service timestamps come with or without an offset.
fn format_timestamp(raw: &str) -> String {
    const SHOWN: &str = "%Y-%m-%d %H:%M";
    if raw.is_empty() {
        return "-".to_string();
    }
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(raw) {
        return at.format(SHOWN).to_string();
    }
    if let Ok(at) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return at.format(SHOWN).to_string();
    }
    raw.to_string()
}

/// Page picker, e.g. `< 1 2 [3] 4 5 ... 21 22 23 24 25 >`.
pub fn page_picker(window: &PageWindow) -> Line<'static> {
    let mut spans = Vec::new();
    let mut push = |text: String, style: Style| {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(text, style));
    };
    let plain = Style::default().fg(Color::DarkGray);

    if window.has_previous() {
        push("<".to_string(), plain);
    }
    for item in window.visible_pages() {
        match item {
            PageItem::Page(page) if page == window.current_page => push(
                format!("[{}]", page),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            PageItem::Page(page) => push(page.to_string(), plain),
            PageItem::Ellipsis => push("...".to_string(), plain),
        }
    }
    if window.has_next() {
        push(">".to_string(), plain);
    }
    Line::from(spans)
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = 76.min(area.width.saturating_sub(2));
    let height = (HELP.len() as u16 + 2).min(area.height.saturating_sub(2));
    let dialog_area = centered_rect(width, height, area);

    // Clear background
    frame.render_widget(Clear, dialog_area);

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{:<40}", keys), Style::default().fg(Color::Cyan)),
                Span::raw(*action),
            ])
        })
        .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .title(" Commands (Esc to close) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    frame.render_widget(help, dialog_area);
}

/// Helper to create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
