use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Margin, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap,
};

use crate::format::{episode_label, format_count, format_date, format_date_time, truncate};
use crate::outline::{NavEntry, NavigatorView, PanelState};
use crate::render::{LayoutRow, SpanStyle};

use super::super::pages::{about_page, episode_heading};
use super::{
    AboutScreen, HistoryScreen, HomeScreen, Load, ReaderScreen, Screen, WorkScreen,
};

const PANEL_WIDTH: u16 = 34;
const ACCENT: Color = Color::Rgb(110, 170, 255);
const TEXT: Color = Color::Rgb(230, 230, 230);
const MUTED: Color = Color::Rgb(185, 195, 210);

/// Where each part of the reader goes for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReaderAreas {
    pub(super) header: Rect,
    pub(super) content: Rect,
    pub(super) panel: Option<Rect>,
    pub(super) overlay: bool,
    pub(super) controls: Rect,
    pub(super) status: Rect,
}

impl ReaderAreas {
    /// Inside of the content border: the episode viewport.
    pub(super) fn body(&self) -> Rect {
        self.content.inner(Margin::new(1, 1))
    }

    pub(super) fn panel_contains(&self, column: u16, row: u16) -> bool {
        self.panel
            .is_some_and(|panel| panel.contains(Position::new(column, row)))
    }
}

fn screen_chunks(area: Rect) -> [Rect; 4] {
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(area)
}

pub(super) fn reader_areas(area: Rect, state: PanelState, has_outline: bool) -> ReaderAreas {
    let [header, body, controls, status] = screen_chunks(area);
    let mut areas = ReaderAreas {
        header,
        content: body,
        panel: None,
        overlay: false,
        controls,
        status,
    };
    if !has_outline {
        return areas;
    }
    match state {
        PanelState::Docked => {
            let [content, panel] =
                Layout::horizontal([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
                    .areas(body);
            areas.content = content;
            areas.panel = Some(panel);
        }
        PanelState::OverlayShown => {
            let width = PANEL_WIDTH.min(body.width);
            areas.panel = Some(Rect::new(
                body.x + body.width - width,
                body.y,
                width,
                body.height,
            ));
            areas.overlay = true;
        }
        PanelState::OverlayHidden => {}
    }
    areas
}

/// First outline entry shown in a panel of `height` rows, keeping `focus`
/// near the middle.
pub(super) fn outline_offset(len: usize, height: usize, focus: Option<usize>) -> usize {
    if height == 0 || len <= height {
        return 0;
    }
    let focus = focus.unwrap_or(0).min(len - 1);
    focus.saturating_sub(height / 2).min(len - height)
}

/// Outline entry under a mouse position, if the panel is showing one there.
pub(super) fn outline_hit(reader: &ReaderScreen, column: u16, row: u16) -> Option<usize> {
    let inner = reader.areas.panel?.inner(Margin::new(1, 1));
    if !inner.contains(Position::new(column, row)) {
        return None;
    }
    let len = reader.tracker.outline().len();
    let offset = outline_offset(len, usize::from(inner.height), reader.outline_focus());
    let index = offset + usize::from(row - inner.y);
    (index < len).then_some(index)
}

pub(super) fn draw_tui(
    frame: &mut Frame,
    screens: &mut [Screen],
    status: &str,
    image_domain: &str,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let Some(screen) = screens.last_mut() else {
        return;
    };
    match screen {
        Screen::Home(home) => draw_home(frame, home, status),
        Screen::Work(work) => draw_work(frame, work, status),
        Screen::Reader(reader) => draw_reader(frame, reader, status),
        Screen::About(about) => draw_about(frame, about, status, image_domain),
        Screen::History(history) => draw_history(frame, history, status),
    }
}

fn draw_home(frame: &mut Frame, home: &mut HomeScreen, status: &str) {
    let [header, body, controls, status_area] = screen_chunks(frame.area());
    let works = home.works.as_ref().and_then(Load::ready);
    let count = works.map_or(0, Vec::len);
    draw_header(frame, header, "Home", &format!("{count} works"));

    let [list_area, details_area] =
        Layout::horizontal([Constraint::Percentage(64), Constraint::Percentage(36)]).areas(body);

    match home.works.as_ref() {
        Some(Load::Ready(works)) => {
            let rows: Vec<Row> = works
                .iter()
                .map(|work| {
                    Row::new(vec![
                        Cell::from(work.title.clone()),
                        Cell::from(work.author.clone()),
                        Cell::from(
                            work.published_at
                                .map(format_date)
                                .unwrap_or_else(|| "-".to_string()),
                        ),
                    ])
                })
                .collect();
            let table = list_table(
                rows,
                [
                    Constraint::Percentage(55),
                    Constraint::Percentage(25),
                    Constraint::Length(12),
                ],
                ["Title", "Author", "Published"],
                "Works",
            );
            frame.render_stateful_widget(table, list_area, &mut home.table);
        }
        other => draw_placeholder(frame, list_area, "Works", other.map(load_message)),
    }

    let selected = works.and_then(|works| home.table.selected().and_then(|idx| works.get(idx)));
    let details = match selected {
        Some(work) => {
            let mut text = format!("{}\n\n", work.title);
            if let Some(description) = work.description.as_deref() {
                text.push_str(description.trim());
                text.push_str("\n\n");
            }
            let tags = work.tags();
            if !tags.is_empty() {
                text.push_str(&format!("Tags\n{}\n\n", tags.join(", ")));
            }
            text.push_str(&format!("Slug\n{}", work.slug));
            text
        }
        None => "No published works yet.".to_string(),
    };
    frame.render_widget(
        Paragraph::new(details)
            .style(Style::default().fg(TEXT))
            .wrap(Wrap { trim: false })
            .block(panel_block("Selected")),
        details_area,
    );

    draw_controls(
        frame,
        controls,
        &[
            ("↑/↓", "move"),
            ("Enter", "open"),
            ("r", "reload"),
            ("h", "history"),
            ("a", "about"),
            ("q", "quit"),
        ],
    );
    draw_status(frame, status_area, status);
}

fn draw_work(frame: &mut Frame, screen: &mut WorkScreen, status: &str) {
    let [header, body, controls, status_area] = screen_chunks(frame.area());
    let title = screen
        .data
        .ready()
        .map(|(work, _)| work.title.clone())
        .unwrap_or_else(|| screen.slug.clone());
    draw_header(frame, header, "Work", &title);

    let [list_area, details_area] =
        Layout::horizontal([Constraint::Percentage(64), Constraint::Percentage(36)]).areas(body);

    match &screen.data {
        Load::Ready((work, episodes)) => {
            let rows: Vec<Row> = episodes
                .iter()
                .map(|episode| {
                    Row::new(vec![
                        Cell::from(episode_label(episode.episode_number)),
                        Cell::from(episode.title.clone()),
                        Cell::from(format_count(episode.view_count)),
                        Cell::from(
                            episode
                                .published_at
                                .map(format_date)
                                .unwrap_or_else(|| "-".to_string()),
                        ),
                    ])
                })
                .collect();
            let table = list_table(
                rows,
                [
                    Constraint::Length(12),
                    Constraint::Percentage(50),
                    Constraint::Length(8),
                    Constraint::Length(12),
                ],
                ["No.", "Title", "Views", "Published"],
                "Episodes",
            );
            frame.render_stateful_widget(table, list_area, &mut screen.table);

            let total_views: i64 = episodes.iter().map(|episode| episode.view_count).sum();
            let mut text = format!("{}\nby {}\n\n", work.title, work.author);
            if let Some(description) = work.description.as_deref() {
                text.push_str(description.trim());
                text.push_str("\n\n");
            }
            text.push_str(&format!(
                "Episodes\n{}\n\nTotal views\n{}",
                episodes.len(),
                format_count(total_views)
            ));
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(TEXT))
                    .wrap(Wrap { trim: false })
                    .block(panel_block("Work")),
                details_area,
            );
        }
        other => draw_placeholder(frame, body, "Episodes", Some(load_message(other))),
    }

    draw_controls(
        frame,
        controls,
        &[("↑/↓", "move"), ("Enter", "read"), ("Esc", "back"), ("q", "quit")],
    );
    draw_status(frame, status_area, status);
}

fn draw_reader(frame: &mut Frame, reader: &ReaderScreen, status: &str) {
    let areas = reader.areas;
    let view = reader.tracker.navigator_view();

    let crumb = match reader.data.ready() {
        Some(data) => format!("{} / {}", data.work.title, episode_heading(&data.episode)),
        None => format!("{} / {}", reader.work_slug, reader.episode_slug),
    };
    let active = view
        .as_ref()
        .and_then(|view| view.entries.iter().find(|entry| entry.active))
        .map(|entry| entry.text.clone());
    draw_reader_header(frame, areas.header, &crumb, active.as_deref());

    let dim = view.as_ref().is_some_and(|view| view.backdrop);
    let body_height = u32::from(areas.body().height);
    let (lines, position) = match (&reader.layout, &reader.data) {
        (Some(layout), _) => {
            let lines: Vec<Line> = layout
                .rows(reader.scroll.top(), body_height)
                .iter()
                .map(|row| row_line(row, dim))
                .collect();
            let max = layout.max_scroll(body_height);
            let percent = if max == 0 {
                100
            } else {
                reader.scroll.top().min(max) * 100 / max
            };
            (lines, format!(" {percent}%"))
        }
        (None, Load::Failed(err)) => (
            vec![Line::styled(err.clone(), error_style())],
            String::new(),
        ),
        (None, _) => (
            vec![Line::styled("Loading...", Style::default().fg(MUTED))],
            String::new(),
        ),
    };
    let title = reader
        .data
        .ready()
        .map(|data| data.episode.title.clone())
        .unwrap_or_else(|| "Episode".to_string());
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(format!("{title}{position}"))),
        areas.content,
    );

    if let (Some(panel), Some(view)) = (areas.panel, view.as_ref()) {
        draw_outline_panel(frame, panel, view, reader, areas.overlay);
    }

    let mut hints = vec![("↑/↓", "scroll"), ("PgUp/PgDn", "page")];
    if view.is_some() {
        hints.push(("Tab", "outline"));
        hints.push(("Enter", "jump"));
    }
    if view.as_ref().is_some_and(|view| view.toggle_visible) {
        hints.push(("t", "toggle"));
    }
    hints.extend([("n/p", "episode"), ("Esc", "back"), ("q", "quit")]);
    draw_controls(frame, areas.controls, &hints);
    draw_status(frame, areas.status, status);
}

fn draw_outline_panel(
    frame: &mut Frame,
    panel: Rect,
    view: &NavigatorView,
    reader: &ReaderScreen,
    overlay: bool,
) {
    if overlay {
        render_popup_shadow(frame, panel);
        frame.render_widget(Clear, panel);
    }
    let inner_height = usize::from(panel.height.saturating_sub(2));
    let text_width = usize::from(panel.width.saturating_sub(4));
    let offset = outline_offset(view.entries.len(), inner_height, reader.outline_focus());
    let lines: Vec<Line> = view
        .entries
        .iter()
        .enumerate()
        .skip(offset)
        .take(inner_height)
        .map(|(idx, entry)| outline_line(entry, reader.cursor == Some(idx), text_width))
        .collect();

    let mut block = panel_block(truncate(&view.title, text_width.max(4)));
    if overlay {
        block = block.border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        );
    }
    frame.render_widget(Paragraph::new(lines).block(block), panel);
}

fn outline_line(entry: &NavEntry, under_cursor: bool, width: usize) -> Line<'static> {
    let marker = if under_cursor { "▸ " } else { "  " };
    let text = truncate(
        &format!("{:indent$}{}", "", entry.text, indent = entry.indent),
        width.saturating_sub(marker.chars().count()).max(1),
    );
    let style = if entry.active {
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else if entry.level == 1 {
        Style::default().fg(TEXT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Yellow)),
        Span::styled(text, style),
    ])
}

fn row_line(row: &LayoutRow, dim: bool) -> Line<'static> {
    Line::from(
        row.spans
            .iter()
            .map(|span| Span::styled(span.text.clone(), span_style(span.style, dim)))
            .collect::<Vec<_>>(),
    )
}

fn span_style(style: SpanStyle, dim: bool) -> Style {
    let mut out = Style::default().fg(TEXT);
    if let Some(level) = style.heading {
        let color = match level {
            1 => ACCENT,
            2 => Color::Rgb(130, 190, 255),
            3 => Color::Rgb(205, 165, 255),
            _ => MUTED,
        };
        out = out.fg(color).add_modifier(Modifier::BOLD);
    }
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.strike {
        out = out.add_modifier(Modifier::CROSSED_OUT);
    }
    if style.code {
        out = out.fg(Color::Rgb(255, 200, 120));
    }
    if style.link {
        out = out.fg(ACCENT).add_modifier(Modifier::UNDERLINED);
    }
    if style.muted {
        out = out.fg(Color::Rgb(140, 150, 165));
    }
    if dim {
        out = out.add_modifier(Modifier::DIM);
    }
    out
}

fn draw_about(frame: &mut Frame, about: &AboutScreen, status: &str, image_domain: &str) {
    let [header, body, controls, status_area] = screen_chunks(frame.area());
    draw_header(frame, header, "About", "the author");
    match &about.author {
        Load::Ready(author) => frame.render_widget(
            Paragraph::new(about_page(author, image_domain))
                .style(Style::default().fg(TEXT))
                .wrap(Wrap { trim: false })
                .block(panel_block("Author")),
            body,
        ),
        other => draw_placeholder(frame, body, "Author", Some(load_message(other))),
    }
    draw_controls(frame, controls, &[("Esc", "back"), ("q", "quit")]);
    draw_status(frame, status_area, status);
}

fn draw_history(frame: &mut Frame, history: &mut HistoryScreen, status: &str) {
    let [header, body, controls, status_area] = screen_chunks(frame.area());
    draw_header(
        frame,
        header,
        "History",
        &format!("{} works", history.entries.len()),
    );
    if history.entries.is_empty() {
        draw_placeholder(frame, body, "Recently read", Some("Nothing read yet."));
    } else {
        let rows: Vec<Row> = history
            .entries
            .iter()
            .map(|entry| {
                Row::new(vec![
                    Cell::from(entry.work_title.clone()),
                    Cell::from(format!(
                        "{}: {}",
                        episode_label(entry.episode_number),
                        entry.episode_title
                    )),
                    Cell::from(format_date_time(entry.read_at)),
                ])
            })
            .collect();
        let table = list_table(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(40),
                Constraint::Length(18),
            ],
            ["Work", "Last episode", "Read at"],
            "Recently read",
        );
        frame.render_stateful_widget(table, body, &mut history.table);
    }
    draw_controls(
        frame,
        controls,
        &[("↑/↓", "move"), ("Enter", "continue"), ("Esc", "back"), ("q", "quit")],
    );
    draw_status(frame, status_area, status);
}

fn load_message<T>(load: &Load<T>) -> &str {
    match load {
        Load::Loading | Load::Ready(_) => "Loading...",
        Load::Failed(err) => err.as_str(),
    }
}

fn draw_placeholder(frame: &mut Frame, area: Rect, title: &'static str, message: Option<&str>) {
    let message = message.unwrap_or("Loading...");
    let style = if message == "Loading..." {
        Style::default().fg(MUTED)
    } else {
        error_style()
    };
    frame.render_widget(
        Paragraph::new(message.to_string())
            .style(style)
            .wrap(Wrap { trim: true })
            .block(panel_block(title)),
        area,
    );
}

fn list_table<'a, const N: usize>(
    rows: Vec<Row<'a>>,
    widths: [Constraint; N],
    columns: [&'static str; N],
    title: &'static str,
) -> Table<'a> {
    Table::new(rows, widths)
        .header(
            Row::new(columns.to_vec()).style(
                Style::default()
                    .fg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(panel_block(title))
        .row_highlight_style(
            Style::default()
                .bg(ACCENT)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ")
}

fn draw_header(frame: &mut Frame, area: Rect, screen: &'static str, detail: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "UNBELONG",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(detail.to_string(), Style::default().fg(MUTED)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block(screen));
    frame.render_widget(header, area);
}

fn draw_reader_header(frame: &mut Frame, area: Rect, crumb: &str, active: Option<&str>) {
    let mut spans = vec![
        Span::styled(
            "UNBELONG",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(crumb.to_string(), Style::default().fg(MUTED)),
    ];
    if let Some(active) = active {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("§ {active}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(panel_block("Reader")),
        area,
    );
}

fn draw_controls(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {key} "), pill_inactive()));
        spans.push(Span::styled(
            format!(" {label}  "),
            Style::default().fg(MUTED),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(panel_block("Controls")),
        area,
    );
}

fn draw_status(frame: &mut Frame, area: Rect, status: &str) {
    frame.render_widget(
        Paragraph::new(status.to_string())
            .style(status_style(status))
            .block(panel_block("Status")),
        area,
    );
}

fn panel_block<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn pill_inactive() -> Style {
    Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242))
}

fn error_style() -> Style {
    Style::default()
        .fg(Color::Rgb(255, 145, 120))
        .add_modifier(Modifier::BOLD)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        error_style()
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        popup_area.x.saturating_sub(1),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width,
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}
