use std::fmt::Write as _;

use crate::api::{AuthorProfile, Comment, Episode, Page, Work};
use crate::db::ReadEntry;
use crate::format::{
    ImageVariant, episode_label, episode_url, format_count, format_date, format_date_time,
    image_url, relative_time, share_intent_url, truncate,
};
use crate::outline::NavigatorView;
use crate::render::{DocumentLayout, RenderedDocument};

const RULE: &str = "----------------------------------------";

/// Episodes adjacent to the current one in the work's published listing.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Neighbors<'a> {
    pub(crate) previous: Option<&'a Episode>,
    pub(crate) next: Option<&'a Episode>,
}

pub(crate) fn neighbors<'a>(episodes: &'a [Episode], current_id: &str) -> Neighbors<'a> {
    let Some(index) = episodes.iter().position(|episode| episode.id == current_id) else {
        return Neighbors::default();
    };
    Neighbors {
        previous: index.checked_sub(1).and_then(|idx| episodes.get(idx)),
        next: episodes.get(index + 1),
    }
}

pub(crate) fn episode_heading(episode: &Episode) -> String {
    format!("{}: {}", episode_label(episode.episode_number), episode.title)
}

pub(crate) fn share_text(work: &Work, episode: &Episode) -> String {
    format!("{} {}", work.title, episode_heading(episode))
}

pub(crate) fn home_page(works: &[Work], image_domain: &str, card: &ImageVariant) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "unbelong - published works\n");
    if works.is_empty() {
        let _ = writeln!(out, "No works have been published yet.");
        return out;
    }

    let _ = writeln!(out, "{:<24} {:<36} {:<12}", "SLUG", "TITLE", "PUBLISHED");
    for work in works {
        let _ = writeln!(
            out,
            "{:<24} {:<36} {:<12}",
            truncate(&work.slug, 24),
            truncate(&work.title, 36),
            work.published_at.map(format_date).unwrap_or_else(|| "-".to_string())
        );
        if let Some(description) = work.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(out, "    {}", truncate(description.trim(), 72));
        }
        let tags = work.tags();
        if !tags.is_empty() {
            let _ = writeln!(out, "    tags: {}", tags.join(", "));
        }
        if let Some(image_id) = work.thumbnail_image_id.as_deref() {
            let _ = writeln!(
                out,
                "    cover: {}",
                image_url(image_domain, image_id, card)
            );
        }
    }
    out
}


pub(crate) fn work_page(
    work: &Work,
    episodes: &[Episode],
    image_domain: &str,
    last_read: Option<&ReadEntry>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", work.title);
    let _ = writeln!(out, "{} by {}\n", work.work_type.label(), work.author);
    if let Some(description) = work.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "{}\n", description.trim());
    }
    if let Some(image_id) = work.thumbnail_image_id.as_deref() {
        let _ = writeln!(
            out,
            "Cover: {}",
            image_url(image_domain, image_id, &ImageVariant::Named("public".to_string()))
        );
    }
    let total_views: i64 = episodes.iter().map(|episode| episode.view_count).sum();
    let _ = writeln!(
        out,
        "Episodes: {}   Total views: {}",
        episodes.len(),
        format_count(total_views)
    );
    if let Some(latest) = episodes.first() {
        let _ = writeln!(
            out,
            "Latest: unbelong read {} {}",
            work.slug, latest.slug
        );
    }
    if let Some(entry) = last_read {
        let _ = writeln!(
            out,
            "Continue: unbelong read {} {}   ({}: {})",
            work.slug,
            entry.episode_slug,
            episode_label(entry.episode_number),
            entry.episode_title
        );
    }

    let _ = writeln!(out, "\n{RULE}");
    if episodes.is_empty() {
        let _ = writeln!(out, "No episodes yet.");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<6} {:<20} {:<36} {:>8} {:<12}",
        "NO", "SLUG", "TITLE", "VIEWS", "PUBLISHED"
    );
    for episode in episodes {
        let _ = writeln!(
            out,
            "{:<6} {:<20} {:<36} {:>8} {:<12}",
            episode.episode_number,
            truncate(&episode.slug, 20),
            truncate(&episode.title, 36),
            format_count(episode.view_count),
            episode
                .published_at
                .map(format_date)
                .unwrap_or_else(|| "-".to_string())
        );
    }
    out
}

pub(crate) struct EpisodePage<'a> {
    pub(crate) work: &'a Work,
    pub(crate) episode: &'a Episode,
    pub(crate) neighbors: Neighbors<'a>,
    pub(crate) document: &'a RenderedDocument,
    pub(crate) outline: Option<NavigatorView>,
}

pub(crate) fn episode_page(page: &EpisodePage<'_>, site_url: &str, width: u16) -> String {
    let EpisodePage {
        work,
        episode,
        neighbors,
        document,
        outline,
    } = page;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Home / {} / {}\n",
        work.title,
        episode_label(episode.episode_number)
    );
    let _ = writeln!(out, "{}", episode_heading(episode));
    if let Some(description) = episode.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "{}", description.trim());
    }
    let mut meta = format!("{} views", format_count(episode.view_count));
    if let Some(published_at) = episode.published_at {
        let _ = write!(meta, "   {}", format_date(published_at));
    }
    let _ = writeln!(out, "{meta}\n{RULE}");

    if let Some(outline) = outline {
        let _ = writeln!(out, "Contents");
        for entry in &outline.entries {
            let _ = writeln!(out, "{:indent$}- {}", "", entry.text, indent = entry.indent);
        }
        let _ = writeln!(out, "{RULE}");
    }

    let layout = DocumentLayout::compute(document, width);
    for row in layout.rows(0, layout.row_count()) {
        let _ = writeln!(out, "{}", row.text().trim_end());
    }

    let _ = writeln!(out, "{RULE}");
    if let Some(previous) = neighbors.previous {
        let _ = writeln!(out, "<- Previous: {}", episode_heading(previous));
    }
    let _ = writeln!(out, "   Back to {}", work.title);
    if let Some(next) = neighbors.next {
        let _ = writeln!(out, "-> Next: {}", episode_heading(next));
    }

    let url = episode_url(site_url, &work.slug, &episode.slug);
    let _ = writeln!(out, "\nLink:  {url}");
    let _ = writeln!(out, "Share: {}", share_intent_url(&share_text(work, episode), &url));
    out
}

pub(crate) fn about_page(author: &AuthorProfile, image_domain: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", author.name);
    if let Some(image_id) = author.avatar_image_id.as_deref() {
        let _ = writeln!(
            out,
            "Avatar: {}",
            image_url(image_domain, image_id, &ImageVariant::Named("thumbnail".to_string()))
        );
    }
    if let Some(bio) = author.bio.as_deref().filter(|bio| !bio.trim().is_empty()) {
        let _ = writeln!(out, "\n{}", bio.trim());
    }
    let links = author.social_links();
    if !links.is_empty() {
        let _ = writeln!(out, "\nLinks");
        for (service, url) in links {
            let _ = writeln!(out, "  {service:<12} {url}");
        }
    }
    out
}

/// `heading` names the episode the comments belong to, when it could be resolved.
pub(crate) fn comments_page(page: &Page<Comment>, heading: Option<&str>, now: i64) -> String {
    let mut out = String::new();
    if let Some(heading) = heading {
        let _ = writeln!(out, "Comments on {heading}\n{RULE}");
    }
    if page.items.is_empty() {
        let _ = writeln!(out, "No comments yet.");
    }
    for comment in &page.items {
        let author = comment
            .author_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Anonymous");
        let _ = writeln!(
            out,
            "{author} - {}",
            relative_time(comment.created_at, now)
        );
        for line in comment.content.lines() {
            let _ = writeln!(out, "  {line}");
        }
        let _ = writeln!(out);
    }
    if let Some(pagination) = page.pagination {
        let _ = writeln!(
            out,
            "Page {} of {} ({} comments, {} per page)",
            pagination.page,
            pagination.total_pages.max(1),
            pagination.total,
            pagination.limit
        );
    }
    out
}

pub(crate) fn history_page(entries: &[ReadEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        let _ = writeln!(out, "Nothing read yet. Open an episode with `unbelong read`.");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<32} {:<36} {:<18}",
        "WORK", "LAST EPISODE", "READ AT"
    );
    for entry in entries {
        let episode = format!(
            "{}: {}",
            episode_label(entry.episode_number),
            entry.episode_title
        );
        let _ = writeln!(
            out,
            "{:<32} {:<36} {:<18}",
            truncate(&entry.work_title, 32),
            truncate(&episode, 36),
            format_date_time(entry.read_at)
        );
    }
    out
}
