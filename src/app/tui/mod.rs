mod actions;
mod render;
mod session;
#[cfg(test)]
mod tests;

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::TableState;

use crate::api::{ApiClient, AuthorProfile, Episode, Work};
use crate::config::Config;
use crate::db::{Database, ReadEntry};
use crate::outline::{Generation, OutlineTracker, PanelState, ScrollRequest};
use crate::render::{DocumentLayout, RenderedDocument};

use super::pages::neighbors;

use self::actions::{
    drain_fetch_results, drain_render_results, request_author, request_episode, request_work,
    request_works, status_error, status_info, update_reader,
};
use self::render::{ReaderAreas, draw_tui, outline_hit};
use self::session::TuiSession;

const IDLE_POLL: Duration = Duration::from_millis(200);
const ANIMATION_POLL: Duration = Duration::from_millis(16);
const WHEEL_ROWS: i64 = 3;

#[derive(Debug, Clone)]
pub(super) enum Load<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Load<T> {
    pub(super) fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Failed(_) => None,
        }
    }
}

impl<T> From<Result<T, String>> for Load<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Scroll position of the episode body, animated toward a target row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScrollState {
    top: u32,
    target: u32,
}

impl ScrollState {
    pub(crate) fn top(&self) -> u32 {
        self.top
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> u32 {
        self.target
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.top != self.target
    }

    pub(crate) fn jump_to(&mut self, top: u32) {
        self.top = top;
        self.target = top;
    }

    pub(crate) fn request(&mut self, request: ScrollRequest) {
        if request.smooth {
            self.target = request.top;
        } else {
            self.jump_to(request.top);
        }
    }

    pub(crate) fn scroll_by(&mut self, delta: i64, max: u32) {
        let next = (i64::from(self.top) + delta).clamp(0, i64::from(max));
        self.jump_to(next as u32);
    }

    pub(crate) fn clamp(&mut self, max: u32) {
        self.top = self.top.min(max);
        self.target = self.target.min(max);
    }

    /// Advances one animation frame: a third of the remaining distance, at
    /// least one row.
    pub(crate) fn step(&mut self) -> bool {
        if !self.is_animating() {
            return false;
        }
        let step = (self.top.abs_diff(self.target) / 3).max(1);
        if self.top < self.target {
            self.top += step;
        } else {
            self.top -= step;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub(super) struct ReaderData {
    pub(super) work: Work,
    pub(super) episode: Episode,
    pub(super) episodes: Vec<Episode>,
}

pub(super) struct ReaderScreen {
    pub(super) id: u64,
    pub(super) request: u64,
    pub(super) work_slug: String,
    pub(super) episode_slug: String,
    pub(super) data: Load<ReaderData>,
    pub(super) document: Option<RenderedDocument>,
    pub(super) layout: Option<DocumentLayout>,
    pub(super) tracker: OutlineTracker,
    pub(super) scroll: ScrollState,
    pub(super) cursor: Option<usize>,
    pub(super) areas: ReaderAreas,
}

impl ReaderScreen {
    fn body_height(&self) -> u32 {
        u32::from(self.areas.body().height)
    }

    fn max_scroll(&self) -> u32 {
        self.layout
            .as_ref()
            .map(|layout| layout.max_scroll(self.body_height()))
            .unwrap_or(0)
    }

    fn active_index(&self) -> Option<usize> {
        let active = self.tracker.active_id()?;
        self.tracker
            .outline()
            .iter()
            .position(|entry| &entry.id == active)
    }

    /// Entry the outline panel keeps in view: the cursor, else the active heading.
    pub(super) fn outline_focus(&self) -> Option<usize> {
        self.cursor.or_else(|| self.active_index())
    }

    fn move_cursor(&mut self, forward: bool) {
        let len = self.tracker.outline().len();
        if len == 0 {
            return;
        }
        let start = self.cursor.or_else(|| self.active_index());
        self.cursor = Some(match (start, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(idx), true) => (idx + 1) % len,
            (Some(idx), false) => (idx + len - 1) % len,
        });
    }

    fn select_entry(&mut self, index: usize) -> bool {
        let Some(id) = self.tracker.outline().get(index).map(|entry| entry.id.clone()) else {
            return false;
        };
        let Some(layout) = self.layout.as_ref() else {
            return false;
        };
        let Some(request) = self.tracker.select(&id, layout) else {
            return false;
        };
        let max = self.max_scroll();
        self.scroll.request(ScrollRequest {
            top: request.top.min(max),
            smooth: request.smooth,
        });
        self.cursor = Some(index);
        true
    }
}

#[derive(Debug, Default)]
pub(super) struct HomeScreen {
    pub(super) works: Option<Load<Vec<Work>>>,
    pub(super) table: TableState,
}

#[derive(Debug)]
pub(super) struct WorkScreen {
    pub(super) slug: String,
    pub(super) data: Load<(Work, Vec<Episode>)>,
    pub(super) table: TableState,
}

#[derive(Debug)]
pub(super) struct AboutScreen {
    pub(super) author: Load<AuthorProfile>,
}

#[derive(Debug)]
pub(super) struct HistoryScreen {
    pub(super) entries: Vec<ReadEntry>,
    pub(super) table: TableState,
}

pub(super) enum Screen {
    Home(HomeScreen),
    Work(WorkScreen),
    Reader(Box<ReaderScreen>),
    About(AboutScreen),
    History(HistoryScreen),
}

pub(super) enum Fetched {
    Works(Result<Vec<Work>, String>),
    Work {
        slug: String,
        result: Result<(Work, Vec<Episode>), String>,
    },
    Episode {
        reader: u64,
        request: u64,
        result: Result<ReaderData, String>,
    },
    Author(Result<AuthorProfile, String>),
}

pub(super) struct Rendered {
    pub(super) reader: u64,
    pub(super) generation: Generation,
    pub(super) document: RenderedDocument,
}

pub(super) struct TuiContext<'a> {
    pub(super) client: &'a ApiClient,
    pub(super) config: &'a Config,
    pub(super) db: &'a Database,
    pub(super) fetch_tx: mpsc::Sender<Fetched>,
    pub(super) render_tx: mpsc::Sender<Rendered>,
    next_id: u64,
}

impl TuiContext<'_> {
    pub(super) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub(crate) fn run_tui(client: &ApiClient, config: &Config, db: &Database) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let (fetch_tx, fetch_rx) = mpsc::channel::<Fetched>();
    let (render_tx, render_rx) = mpsc::channel::<Rendered>();
    let mut ctx = TuiContext {
        client,
        config,
        db,
        fetch_tx,
        render_tx,
        next_id: 0,
    };
    let mut screens = vec![Screen::Home(HomeScreen::default())];
    let mut status = status_info("Loading works...");

    loop {
        if let Some(Screen::Home(home)) = screens.last_mut()
            && home.works.is_none()
        {
            home.works = Some(Load::Loading);
            request_works(&ctx);
        }
        drain_fetch_results(&fetch_rx, &mut screens, &mut ctx, &mut status);
        drain_render_results(&render_rx, &mut screens, &mut status);

        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        if let Some(Screen::Reader(reader)) = screens.last_mut() {
            update_reader(reader, area);
        }
        terminal.draw(|frame| draw_tui(frame, &mut screens, &status, &config.image_domain))?;

        let animating = matches!(
            screens.last(),
            Some(Screen::Reader(reader)) if reader.scroll.is_animating()
        );
        let timeout = if animating { ANIMATION_POLL } else { IDLE_POLL };
        if !event::poll(timeout)? {
            continue;
        }

        let flow = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                handle_key(key, &mut screens, &mut ctx, &mut status)
            }
            Event::Mouse(mouse) => {
                handle_mouse(mouse, &mut screens);
                Flow::Continue
            }
            _ => Flow::Continue,
        };
        if flow == Flow::Quit {
            break;
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}

fn handle_key(
    key: KeyEvent,
    screens: &mut Vec<Screen>,
    ctx: &mut TuiContext<'_>,
    status: &mut String,
) -> Flow {
    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char('a') if !matches!(screens.last(), Some(Screen::About(_))) => {
            screens.push(Screen::About(AboutScreen {
                author: Load::Loading,
            }));
            request_author(ctx);
            return Flow::Continue;
        }
        KeyCode::Char('h') if !matches!(screens.last(), Some(Screen::History(_))) => {
            match ctx.db.list_history() {
                Ok(entries) => {
                    let mut table = TableState::default();
                    table.select((!entries.is_empty()).then_some(0));
                    screens.push(Screen::History(HistoryScreen { entries, table }));
                }
                Err(err) => *status = status_error(&format!("History unavailable: {err}")),
            }
            return Flow::Continue;
        }
        _ => {}
    }

    let Some(screen) = screens.last_mut() else {
        return Flow::Quit;
    };
    let mut pop = false;
    let mut push = None::<Screen>;

    match screen {
        Screen::Home(home) => {
            let works = home.works.as_ref().and_then(Load::ready);
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Char('r') => {
                    home.works = Some(Load::Loading);
                    request_works(ctx);
                    *status = status_info("Reloading works...");
                }
                KeyCode::Enter => {
                    if let Some(work) = works.and_then(|works| selected(works, &home.table)) {
                        let slug = work.slug.clone();
                        request_work(ctx, &slug);
                        push = Some(Screen::Work(WorkScreen {
                            slug,
                            data: Load::Loading,
                            table: TableState::default(),
                        }));
                    }
                }
                code => move_selection(code, works.map_or(0, Vec::len), &mut home.table),
            }
        }
        Screen::Work(work_screen) => {
            let episodes = work_screen.data.ready().map(|(_, episodes)| episodes);
            match key.code {
                KeyCode::Esc => pop = true,
                KeyCode::Enter => {
                    if let Some(episode) =
                        episodes.and_then(|episodes| selected(episodes, &work_screen.table))
                    {
                        push = Some(Screen::Reader(Box::new(open_reader(
                            ctx,
                            work_screen.slug.clone(),
                            episode.slug.clone(),
                        ))));
                    }
                }
                code => move_selection(
                    code,
                    episodes.map_or(0, Vec::len),
                    &mut work_screen.table,
                ),
            }
        }
        Screen::History(history) => match key.code {
            KeyCode::Esc => pop = true,
            KeyCode::Enter => {
                if let Some(entry) = selected(&history.entries, &history.table) {
                    push = Some(Screen::Reader(Box::new(open_reader(
                        ctx,
                        entry.work_slug.clone(),
                        entry.episode_slug.clone(),
                    ))));
                }
            }
            code => move_selection(code, history.entries.len(), &mut history.table),
        },
        Screen::About(_) => {
            if key.code == KeyCode::Esc {
                pop = true;
            }
        }
        Screen::Reader(reader) => pop = handle_reader_key(key, reader, ctx, status),
    }

    if let Some(screen) = push {
        screens.push(screen);
    } else if pop
        && screens.len() > 1
        && let Some(Screen::Reader(mut reader)) = screens.pop()
    {
        reader.tracker.teardown();
        log::debug!("closed reader {}", reader.id);
    }
    Flow::Continue
}

/// Returns whether the reader should be closed.
fn handle_reader_key(
    key: KeyEvent,
    reader: &mut ReaderScreen,
    ctx: &mut TuiContext<'_>,
    status: &mut String,
) -> bool {
    let page = i64::from(reader.body_height().saturating_sub(1).max(1));
    let max = reader.max_scroll();
    match key.code {
        KeyCode::Esc => return !reader.tracker.dismiss_panel(),
        KeyCode::Up | KeyCode::Char('k') => reader.scroll.scroll_by(-1, max),
        KeyCode::Down | KeyCode::Char('j') => reader.scroll.scroll_by(1, max),
        KeyCode::PageUp => reader.scroll.scroll_by(-page, max),
        KeyCode::PageDown | KeyCode::Char(' ') => reader.scroll.scroll_by(page, max),
        KeyCode::Home => reader.scroll.jump_to(0),
        KeyCode::End => reader.scroll.jump_to(max),
        KeyCode::Char('t') => {
            if reader.tracker.toggle_panel() == PanelState::Docked {
                *status = status_info("Outline is docked at this width.");
            }
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if reader.tracker.panel_state() == PanelState::OverlayHidden {
                reader.tracker.toggle_panel();
            }
            reader.move_cursor(key.code == KeyCode::Tab);
        }
        KeyCode::Enter => {
            if let Some(index) = reader.cursor
                && !reader.select_entry(index)
            {
                *status = status_info("That heading is not on screen yet.");
            }
        }
        KeyCode::Char('n') | KeyCode::Char('p') => {
            let forward = key.code == KeyCode::Char('n');
            let target = reader.data.ready().and_then(|data| {
                let around = neighbors(&data.episodes, &data.episode.id);
                let episode = if forward { around.next } else { around.previous };
                episode.map(|episode| episode.slug.clone())
            });
            match target {
                Some(slug) => {
                    reader.episode_slug = slug;
                    request_episode(ctx, reader);
                }
                None if forward => *status = status_info("This is the latest episode."),
                None => *status = status_info("This is the first episode."),
            }
        }
        _ => {}
    }
    false
}

fn handle_mouse(mouse: MouseEvent, screens: &mut [Screen]) {
    let Some(Screen::Reader(reader)) = screens.last_mut() else {
        return;
    };
    let reader: &mut ReaderScreen = reader;
    let max = reader.max_scroll();
    match mouse.kind {
        MouseEventKind::ScrollUp => reader.scroll.scroll_by(-WHEEL_ROWS, max),
        MouseEventKind::ScrollDown => reader.scroll.scroll_by(WHEEL_ROWS, max),
        MouseEventKind::Down(MouseButton::Left) => {
            match outline_hit(reader, mouse.column, mouse.row) {
                Some(index) => {
                    reader.select_entry(index);
                }
                None if reader.tracker.panel_state() == PanelState::OverlayShown
                    && !reader.areas.panel_contains(mouse.column, mouse.row) =>
                {
                    reader.tracker.dismiss_panel();
                }
                None => {}
            }
        }
        _ => {}
    }
}

fn open_reader(ctx: &mut TuiContext<'_>, work_slug: String, episode_slug: String) -> ReaderScreen {
    let mut reader = ReaderScreen {
        id: ctx.next_id(),
        request: 0,
        work_slug,
        episode_slug,
        data: Load::Loading,
        document: None,
        layout: None,
        tracker: ctx.config.outline_tracker(),
        scroll: ScrollState::default(),
        cursor: None,
        areas: ReaderAreas::default(),
    };
    request_episode(ctx, &mut reader);
    reader
}

fn selected<'a, T>(items: &'a [T], table: &TableState) -> Option<&'a T> {
    table.selected().and_then(|idx| items.get(idx))
}

fn move_selection(code: KeyCode, len: usize, table: &mut TableState) {
    if len == 0 {
        table.select(None);
        return;
    }
    let current = table.selected().unwrap_or(0).min(len - 1);
    let next = match code {
        KeyCode::Up | KeyCode::Char('k') => current.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => (current + 1).min(len - 1),
        KeyCode::Home => 0,
        KeyCode::End => len - 1,
        _ => current,
    };
    table.select(Some(next));
}
