mod pages;
mod tui;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::api::{ApiClient, ApiError, Episode, Work};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::Database;
use crate::paths::database_file_path;
use crate::render::render_markdown;

use self::pages::{
    EpisodePage, about_page, comments_page, episode_heading, episode_page, history_page,
    home_page, neighbors, work_page,
};

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_args(&cli.global);
    let client = ApiClient::new(&config.api_url);
    log::info!("using content API at {}", config.api_url);

    match cli.command {
        Some(Command::Works) => run_works(&client, &config)?,
        Some(Command::Work { slug }) => run_work(&client, &config, &slug)?,
        Some(Command::Read {
            work,
            episode,
            width,
        }) => run_read(&client, &config, &open_db()?, &work, &episode, width)?,
        Some(Command::Comments {
            episode_id,
            page,
            limit,
        }) => run_comments(&client, &episode_id, page, limit)?,
        Some(Command::About) => run_about(&client, &config)?,
        Some(Command::History) => run_history(&open_db()?)?,
        Some(Command::Tui) | None => tui::run_tui(&client, &config, &open_db()?)?,
    }

    Ok(())
}

fn run_works(client: &ApiClient, config: &Config) -> Result<()> {
    let works = client.list_works().context("failed to list works")?;
    print!("{}", home_page(&works, &config.image_domain, &config.card_variant()));
    Ok(())
}

fn run_work(client: &ApiClient, config: &Config, slug: &str) -> Result<()> {
    let work = fetch_work(client, slug)?;
    let episodes = fetch_episodes(client, &work);
    let last_read = match open_db().and_then(|db| db.last_read(&work.slug)) {
        Ok(entry) => entry,
        Err(err) => {
            log::warn!("reading history unavailable: {err:#}");
            None
        }
    };
    print!(
        "{}",
        work_page(&work, &episodes, &config.image_domain, last_read.as_ref())
    );
    Ok(())
}

fn run_read(
    client: &ApiClient,
    config: &Config,
    db: &Database,
    work_slug: &str,
    episode_slug: &str,
    width: u16,
) -> Result<()> {
    let work = fetch_work(client, work_slug)?;
    let episode = fetch_episode(client, work_slug, episode_slug)?;
    let episodes = fetch_episodes(client, &work);

    let document = render_markdown(&episode.content, &config.render_options());
    let mut tracker = config.outline_tracker();
    if let Some(generation) = tracker.set_content(&episode.title, &episode.content) {
        tracker.commit_render(generation, &document);
    }

    let page = EpisodePage {
        work: &work,
        episode: &episode,
        neighbors: neighbors(&episodes, &episode.id),
        document: &document,
        outline: tracker.navigator_view(),
    };
    print!("{}", episode_page(&page, &config.site_url, width));

    record_read(db, &work, &episode);
    Ok(())
}

fn run_comments(client: &ApiClient, episode_id: &str, page: u32, limit: u32) -> Result<()> {
    let comments = client
        .comments_by_episode(episode_id, page, limit)
        .with_context(|| format!("failed to load comments for episode {episode_id}"))?;
    let heading = comments_heading(client, episode_id);
    print!(
        "{}",
        comments_page(&comments, heading.as_deref(), Utc::now().timestamp())
    );
    Ok(())
}

/// `Work / Episode N: title` for an episode id; the listing prints without it.
fn comments_heading(client: &ApiClient, episode_id: &str) -> Option<String> {
    let episode = client
        .episode(episode_id)
        .inspect_err(|err| log::warn!("failed to load episode {episode_id}: {err}"))
        .ok()?;
    match client.work(&episode.work_id) {
        Ok(work) => Some(format!("{} / {}", work.title, episode_heading(&episode))),
        Err(err) => {
            log::warn!("failed to load work {}: {err}", episode.work_id);
            Some(episode_heading(&episode))
        }
    }
}

fn run_about(client: &ApiClient, config: &Config) -> Result<()> {
    let author = client.author().context("failed to load author profile")?;
    print!("{}", about_page(&author, &config.image_domain));
    Ok(())
}

fn run_history(db: &Database) -> Result<()> {
    let entries = db.list_history()?;
    print!("{}", history_page(&entries));
    Ok(())
}

pub(crate) fn fetch_work(client: &ApiClient, slug: &str) -> Result<Work> {
    client.work_by_slug(slug).map_err(|err| not_found_or(err, || format!("work `{slug}`")))
}

pub(crate) fn fetch_episode(
    client: &ApiClient,
    work_slug: &str,
    episode_slug: &str,
) -> Result<Episode> {
    client
        .episode_by_slug(work_slug, episode_slug)
        .map_err(|err| not_found_or(err, || format!("episode `{episode_slug}` of `{work_slug}`")))
}

/// The episode list only feeds navigation, so a failure leaves it empty.
pub(crate) fn fetch_episodes(client: &ApiClient, work: &Work) -> Vec<Episode> {
    match client.episodes_by_work(&work.id) {
        Ok(episodes) => episodes,
        Err(err) => {
            log::warn!("failed to list episodes of {}: {err}", work.slug);
            Vec::new()
        }
    }
}

pub(crate) fn record_read(db: &Database, work: &Work, episode: &Episode) {
    if let Err(err) = db.record_read(
        &work.slug,
        &work.title,
        &episode.slug,
        &episode.title,
        episode.episode_number,
    ) {
        log::warn!("failed to record reading history: {err:#}");
    }
}

fn not_found_or(err: ApiError, what: impl FnOnce() -> String) -> anyhow::Error {
    if err.is_not_found() {
        anyhow::anyhow!("{} not found", what())
    } else {
        anyhow::Error::new(err).context(format!("failed to load {}", what()))
    }
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}
