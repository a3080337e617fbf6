use crate::api::{AuthorProfile, Comment, Episode, Page, Pagination, Work};
use crate::config::Config;
use crate::db::ReadEntry;
use crate::format::{ImageFit, ImageFormat};
use crate::outline::{ActivationPolicy, ScrollRequest};
use crate::render::{RenderOptions, render_markdown};

use super::pages::*;
use super::tui::ScrollState;

fn work() -> Work {
    serde_json::from_str(
        r#"{"id":"w1","type":"comic","title":"Night Shift","slug":"night-shift","description":"Robots at work.","author":"Mika","status":"published","thumbnail_image_id":"cover1","tags":"[\"sf\",\"slice of life\"]","created_at":1,"updated_at":2,"published_at":1700000000}"#,
    )
    .expect("work json")
}

fn episode(number: i64, title: &str, views: i64) -> Episode {
    serde_json::from_value(serde_json::json!({
        "id": format!("e{number}"),
        "work_id": "w1",
        "episode_number": number,
        "title": title,
        "slug": format!("ep-{number}"),
        "content": "",
        "status": "published",
        "view_count": views,
        "published_at": null,
    }))
    .expect("episode json")
}

fn config() -> Config {
    Config {
        api_url: "http://localhost:8787".to_string(),
        image_domain: "img.test".to_string(),
        site_url: "https://comic.test".to_string(),
        header_offset: 2,
        wide_threshold: 100,
        activation: ActivationPolicy::LastReported,
        cover_fit: ImageFit::Cover,
        cover_format: ImageFormat::Auto,
    }
}

#[test]
fn neighbors_follow_listing_order() {
    let episodes = vec![episode(1, "One", 0), episode(2, "Two", 0), episode(3, "Three", 0)];

    let middle = neighbors(&episodes, "e2");
    assert_eq!(middle.previous.map(|e| e.id.as_str()), Some("e1"));
    assert_eq!(middle.next.map(|e| e.id.as_str()), Some("e3"));

    let first = neighbors(&episodes, "e1");
    assert!(first.previous.is_none());
    assert_eq!(first.next.map(|e| e.id.as_str()), Some("e2"));

    let last = neighbors(&episodes, "e3");
    assert!(last.next.is_none());

    let unknown = neighbors(&episodes, "e9");
    assert!(unknown.previous.is_none() && unknown.next.is_none());
}

#[test]
fn episode_page_shows_breadcrumb_outline_neighbors_and_share_link() {
    let work = work();
    let mut current = episode(2, "Two", 1500);
    current.content = "# Intro\n\nSome text.\n\n## Part".to_string();
    let episodes = vec![episode(1, "One", 0), current.clone(), episode(3, "Three", 0)];

    let config = config();
    let document = render_markdown(&current.content, &config.render_options());
    let mut tracker = config.outline_tracker();
    let generation = tracker
        .set_content(&current.title, &current.content)
        .expect("generation");
    assert!(tracker.commit_render(generation, &document));

    let page = EpisodePage {
        work: &work,
        episode: &current,
        neighbors: neighbors(&episodes, &current.id),
        document: &document,
        outline: tracker.navigator_view(),
    };
    let text = episode_page(&page, &config.site_url, 40);

    assert!(text.starts_with("Home / Night Shift / Episode 2\n"));
    assert!(text.contains("Episode 2: Two\n1,500 views"));
    assert!(text.contains("Contents\n- Intro\n  - Part\n"));
    assert!(text.contains("Some text."));
    assert!(text.contains("<- Previous: Episode 1: One"));
    assert!(text.contains("-> Next: Episode 3: Three"));
    assert!(text.contains("Link:  https://comic.test/works/night-shift/episodes/ep-2"));
    assert!(text.contains(
        "Share: https://twitter.com/intent/tweet?text=Night%20Shift%20Episode%202%3A%20Two&url="
    ));
}

#[test]
fn episode_page_without_headings_has_no_contents() {
    let work = work();
    let current = episode(1, "One", 0);
    let document = render_markdown(
        "just a paragraph",
        &RenderOptions {
            image_domain: "img.test".to_string(),
        },
    );
    let page = EpisodePage {
        work: &work,
        episode: &current,
        neighbors: Neighbors::default(),
        document: &document,
        outline: None,
    };
    let text = episode_page(&page, "https://comic.test", 80);
    assert!(!text.contains("Contents"));
    assert!(!text.contains("Previous"));
    assert!(!text.contains("Next"));
}

#[test]
fn work_page_totals_views_and_points_at_latest_episode() {
    let episodes = vec![episode(2, "Two", 1000), episode(1, "One", 234)];
    let text = work_page(&work(), &episodes, "img.test", None);
    assert!(text.contains("Comic by Mika"));
    assert!(text.contains("Cover: https://img.test/cover1/public"));
    assert!(text.contains("Episodes: 2   Total views: 1,234"));
    assert!(text.contains("Latest: unbelong read night-shift ep-2"));
}

#[test]
fn work_page_offers_to_continue_from_history() {
    let entry = ReadEntry {
        work_slug: "night-shift".to_string(),
        work_title: "Night Shift".to_string(),
        episode_slug: "ep-1".to_string(),
        episode_title: "One".to_string(),
        episode_number: 1,
        read_at: 1_700_000_000,
    };
    let episodes = vec![episode(2, "Two", 0), episode(1, "One", 0)];
    let text = work_page(&work(), &episodes, "img.test", Some(&entry));
    assert!(text.contains("Continue: unbelong read night-shift ep-1   (Episode 1: One)"));
}

#[test]
fn work_page_without_episodes() {
    let text = work_page(&work(), &[], "img.test", None);
    assert!(text.contains("No episodes yet."));
    assert!(!text.contains("Latest:"));
    assert!(!text.contains("Continue:"));
}

#[test]
fn home_page_lists_works_with_tags() {
    let text = home_page(&[work()], "img.test", &config().card_variant());
    assert!(text.contains("night-shift"));
    assert!(text.contains("tags: sf, slice of life"));
    assert!(text.contains(
        "cover: https://img.test/cover1/public?width=400&height=300&fit=cover&quality=85&format=auto"
    ));
    let empty = home_page(&[], "img.test", &config().card_variant());
    assert!(empty.contains("No works have been published yet."));
}

#[test]
fn about_page_lists_avatar_and_links() {
    let author: AuthorProfile = serde_json::from_str(
        r#"{"id":1,"name":"Mika","bio":"Draws robots.","avatar_image_id":"av1","social_links":"{\"twitter\":\"https://x.com/mika\",\"pixiv\":\"\"}","created_at":0,"updated_at":0}"#,
    )
    .expect("author json");
    let text = about_page(&author, "img.test");
    assert!(text.starts_with("Mika\nAvatar: https://img.test/av1/thumbnail\n"));
    assert!(text.contains("Draws robots."));
    assert!(text.contains("twitter"));
    assert!(!text.contains("pixiv"));
}

#[test]
fn comments_page_names_anonymous_authors_and_paginates() {
    let comment: Comment = serde_json::from_str(
        r#"{"id":"c1","content":"Great page!","status":"approved","created_at":1000}"#,
    )
    .expect("comment json");
    let page = Page {
        items: vec![comment],
        pagination: Some(Pagination {
            page: 1,
            limit: 20,
            total: 1,
            total_pages: 1,
        }),
    };
    let text = comments_page(&page, Some("Night Shift / Episode 2: Two"), 1000 + 7200);
    assert!(text.starts_with("Comments on Night Shift / Episode 2: Two\n"));
    assert!(text.contains("Anonymous - 2 hours ago"));
    assert!(text.contains("  Great page!"));
    assert!(text.ends_with("Page 1 of 1 (1 comments, 20 per page)\n"));
}

#[test]
fn history_page_handles_empty_and_filled_history() {
    assert!(history_page(&[]).contains("Nothing read yet."));
    let text = history_page(&[ReadEntry {
        work_slug: "night-shift".to_string(),
        work_title: "Night Shift".to_string(),
        episode_slug: "ep-3".to_string(),
        episode_title: "Three".to_string(),
        episode_number: 3,
        read_at: 1_700_000_000,
    }]);
    assert!(text.contains("Night Shift"));
    assert!(text.contains("Episode 3: Three"));
}

#[test]
fn smooth_scroll_converges_without_overshooting() {
    let mut scroll = ScrollState::default();
    scroll.request(ScrollRequest {
        top: 30,
        smooth: true,
    });
    assert_eq!(scroll.top(), 0);
    assert_eq!(scroll.target(), 30);

    let mut frames = 0;
    let mut last = scroll.top();
    while scroll.step() {
        assert!(scroll.top() > last && scroll.top() <= 30);
        last = scroll.top();
        frames += 1;
    }
    assert_eq!(scroll.top(), 30);
    assert!(frames < 30, "animation took {frames} frames");
    assert!(!scroll.is_animating());
}

#[test]
fn manual_scroll_cancels_animation_and_clamps() {
    let mut scroll = ScrollState::default();
    scroll.request(ScrollRequest {
        top: 50,
        smooth: true,
    });
    scroll.scroll_by(-5, 40);
    assert_eq!((scroll.top(), scroll.target()), (0, 0));

    scroll.scroll_by(100, 40);
    assert_eq!(scroll.top(), 40);

    scroll.request(ScrollRequest {
        top: 12,
        smooth: false,
    });
    assert_eq!((scroll.top(), scroll.target()), (12, 12));

    scroll.clamp(5);
    assert_eq!(scroll.top(), 5);
}
