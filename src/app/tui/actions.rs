use std::sync::mpsc;

use ratatui::layout::Rect;

use crate::outline::Viewport;
use crate::render::{DocumentLayout, render_markdown};

use super::super::{fetch_episode, fetch_episodes, fetch_work, record_read};
use super::render::reader_areas;
use super::{Fetched, Load, ReaderData, ReaderScreen, Rendered, Screen, TuiContext};

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(super) fn request_works(ctx: &TuiContext<'_>) {
    let client = ctx.client.clone();
    let tx = ctx.fetch_tx.clone();
    std::thread::spawn(move || {
        let result = client.list_works().map_err(|err| err.to_string());
        let _ = tx.send(Fetched::Works(result));
    });
}

pub(super) fn request_work(ctx: &TuiContext<'_>, slug: &str) {
    let client = ctx.client.clone();
    let tx = ctx.fetch_tx.clone();
    let slug = slug.to_string();
    std::thread::spawn(move || {
        let result = fetch_work(&client, &slug)
            .map(|work| {
                let episodes = fetch_episodes(&client, &work);
                (work, episodes)
            })
            .map_err(|err| format!("{err:#}"));
        let _ = tx.send(Fetched::Work { slug, result });
    });
}

pub(super) fn request_author(ctx: &TuiContext<'_>) {
    let client = ctx.client.clone();
    let tx = ctx.fetch_tx.clone();
    std::thread::spawn(move || {
        let result = client.author().map_err(|err| err.to_string());
        let _ = tx.send(Fetched::Author(result));
    });
}

/// Loads the reader's current episode slug. Earlier requests for the same
/// reader are superseded and dropped when they arrive.
pub(super) fn request_episode(ctx: &mut TuiContext<'_>, reader: &mut ReaderScreen) {
    reader.request = ctx.next_id();
    reader.data = Load::Loading;

    let client = ctx.client.clone();
    let tx = ctx.fetch_tx.clone();
    let (reader_id, request) = (reader.id, reader.request);
    let work_slug = reader.work_slug.clone();
    let episode_slug = reader.episode_slug.clone();
    std::thread::spawn(move || {
        let result = fetch_work(&client, &work_slug)
            .and_then(|work| {
                let episode = fetch_episode(&client, &work_slug, &episode_slug)?;
                let episodes = fetch_episodes(&client, &work);
                Ok(ReaderData {
                    work,
                    episode,
                    episodes,
                })
            })
            .map_err(|err| format!("{err:#}"));
        let _ = tx.send(Fetched::Episode {
            reader: reader_id,
            request,
            result,
        });
    });
}

fn request_render(ctx: &TuiContext<'_>, reader: &ReaderScreen, content: &str) {
    let Some(generation) = reader.tracker.pending_generation() else {
        return;
    };
    let tx = ctx.render_tx.clone();
    let options = ctx.config.render_options();
    let content = content.to_string();
    let reader_id = reader.id;
    std::thread::spawn(move || {
        let document = render_markdown(&content, &options);
        let _ = tx.send(Rendered {
            reader: reader_id,
            generation,
            document,
        });
    });
}

pub(super) fn drain_fetch_results(
    rx: &mpsc::Receiver<Fetched>,
    screens: &mut [Screen],
    ctx: &mut TuiContext<'_>,
    status: &mut String,
) {
    while let Ok(fetched) = rx.try_recv() {
        match fetched {
            Fetched::Works(result) => {
                if let Err(err) = &result {
                    *status = status_error(&format!("Failed to load works: {err}"));
                } else {
                    *status = status_info("Ready.");
                }
                for screen in screens.iter_mut() {
                    if let Screen::Home(home) = screen {
                        let load = Load::from(result.clone());
                        if let Load::Ready(works) = &load {
                            home.table.select((!works.is_empty()).then_some(0));
                        }
                        home.works = Some(load);
                    }
                }
            }
            Fetched::Work { slug, result } => {
                if let Err(err) = &result {
                    *status = status_error(err);
                }
                for screen in screens.iter_mut() {
                    if let Screen::Work(work) = screen
                        && work.slug == slug
                        && matches!(work.data, Load::Loading)
                    {
                        let load = Load::from(result.clone());
                        if let Load::Ready((_, episodes)) = &load {
                            work.table.select((!episodes.is_empty()).then_some(0));
                        }
                        work.data = load;
                    }
                }
            }
            Fetched::Author(result) => {
                if let Err(err) = &result {
                    *status = status_error(&format!("Failed to load author: {err}"));
                }
                for screen in screens.iter_mut() {
                    if let Screen::About(about) = screen
                        && matches!(about.author, Load::Loading)
                    {
                        about.author = Load::from(result.clone());
                    }
                }
            }
            Fetched::Episode {
                reader,
                request,
                result,
            } => {
                let Some(target) = screens.iter_mut().find_map(|screen| match screen {
                    Screen::Reader(candidate)
                        if candidate.id == reader && candidate.request == request =>
                    {
                        Some(candidate)
                    }
                    _ => None,
                }) else {
                    log::debug!("dropping superseded episode load {request}");
                    continue;
                };
                apply_episode(ctx, target, result, status);
            }
        }
    }
}

fn apply_episode(
    ctx: &TuiContext<'_>,
    reader: &mut ReaderScreen,
    result: Result<ReaderData, String>,
    status: &mut String,
) {
    let data = match result {
        Ok(data) => data,
        Err(err) => {
            *status = status_error(&err);
            reader.data = Load::Failed(err);
            return;
        }
    };

    record_read(ctx.db, &data.work, &data.episode);
    reader.episode_slug = data.episode.slug.clone();
    if reader
        .tracker
        .set_content(&data.episode.title, &data.episode.content)
        .is_some()
    {
        reader.document = None;
        reader.layout = None;
        reader.cursor = None;
        reader.scroll.jump_to(0);
        request_render(ctx, reader, &data.episode.content);
    }
    *status = status_info(&format!("Reading {}", data.episode.title));
    reader.data = Load::Ready(data);
}

pub(super) fn drain_render_results(
    rx: &mpsc::Receiver<Rendered>,
    screens: &mut [Screen],
    status: &mut String,
) {
    while let Ok(rendered) = rx.try_recv() {
        let reader = screens.iter_mut().find_map(|screen| match screen {
            Screen::Reader(reader) if reader.id == rendered.reader => Some(reader),
            _ => None,
        });
        let Some(reader) = reader else {
            log::debug!("dropping render for closed reader {}", rendered.reader);
            continue;
        };
        if !reader
            .tracker
            .commit_render(rendered.generation, &rendered.document)
        {
            continue;
        }
        let headings = reader.tracker.outline().len();
        if headings > 0 {
            *status = status_info(&format!(
                "{headings} heading(s). Tab moves through the outline, Enter jumps."
            ));
        }
        reader.document = Some(rendered.document);
        reader.layout = None;
        reader.cursor = None;
    }
}

/// Lays the reader out for `area`, advances scroll animation, and feeds the
/// visible window to the outline tracker.
pub(super) fn update_reader(reader: &mut ReaderScreen, area: Rect) {
    reader.tracker.on_layout_width(area.width);
    let has_outline = !reader.tracker.outline().is_empty();
    reader.areas = reader_areas(area, reader.tracker.panel_state(), has_outline);

    let Some(document) = reader.document.as_ref() else {
        return;
    };
    let body = reader.areas.body();
    if reader
        .layout
        .as_ref()
        .is_none_or(|layout| layout.width() != body.width)
    {
        reader.layout = Some(DocumentLayout::compute(document, body.width));
    }
    let Some(layout) = reader.layout.as_ref() else {
        return;
    };

    let height = u32::from(body.height);
    reader.scroll.clamp(layout.max_scroll(height));
    reader.scroll.step();
    let viewport = Viewport {
        scroll_top: reader.scroll.top(),
        height,
    };
    if reader.tracker.on_viewport(viewport, layout) {
        log::debug!(
            "active heading is now {:?}",
            reader.tracker.active_id().map(|id| id.as_str())
        );
    }
}
