use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::render::RenderedDocument;

use super::{
    ActivationPolicy, AnchorMap, Generation, Geometry, HeadingEntry, HeadingId,
    IntersectionBatch, Navigator, NavigatorView, ObservationBand, PanelState, PositionTracker,
    ScrollRequest, Viewport, ViewportObserver, extract_outline,
};

/// Opaque marker that changes whenever episode content changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContentVersion(u64);

impl ContentVersion {
    pub(crate) fn of(content: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Outline, reading position, and navigator for one rendered episode.
///
/// Every content change starts a new generation. The pending extraction,
/// the viewport observer, the outline, and the active heading all belong to
/// one generation and are released together; anything tagged with an older
/// generation is dropped on arrival.
#[derive(Debug)]
pub(crate) struct OutlineTracker {
    title: String,
    version: Option<ContentVersion>,
    generation: Generation,
    pending: Option<Generation>,
    outline: Vec<HeadingEntry>,
    anchors: AnchorMap,
    observer: Option<ViewportObserver>,
    band: ObservationBand,
    tracker: PositionTracker,
    navigator: Navigator,
}

impl OutlineTracker {
    pub(crate) fn new(
        navigator: Navigator,
        band: ObservationBand,
        policy: ActivationPolicy,
    ) -> Self {
        Self {
            title: String::new(),
            version: None,
            generation: Generation::default(),
            pending: None,
            outline: Vec::new(),
            anchors: AnchorMap::default(),
            observer: None,
            band,
            tracker: PositionTracker::new(policy),
            navigator,
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn outline(&self) -> &[HeadingEntry] {
        &self.outline
    }

    pub(crate) fn active_id(&self) -> Option<&HeadingId> {
        self.tracker.active()
    }

    /// Generation awaiting a render commit, if any.
    pub(crate) fn pending_generation(&self) -> Option<Generation> {
        self.pending
    }

    #[cfg(test)]
    pub(crate) fn is_observing(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(ViewportObserver::is_connected)
    }

    /// Starts a new generation when `content` differs from the current one.
    ///
    /// Returns the generation a render must be committed under, or `None`
    /// when the content is unchanged.
    pub(crate) fn set_content(&mut self, title: &str, content: &str) -> Option<Generation> {
        self.title = title.to_string();
        let version = ContentVersion::of(content);
        if self.version == Some(version) {
            return None;
        }
        self.release();
        self.generation = self.generation.next();
        self.version = Some(version);
        self.pending = Some(self.generation);
        self.tracker.reset(self.generation);
        log::debug!("outline {} scheduled for new content", self.generation);
        Some(self.generation)
    }

    /// Extracts the outline from a finished render of `generation`.
    ///
    /// Returns `false` when the render belongs to a superseded generation.
    pub(crate) fn commit_render(
        &mut self,
        generation: Generation,
        document: &RenderedDocument,
    ) -> bool {
        if self.pending != Some(generation) {
            log::debug!(
                "discarding render for {generation}; current is {}",
                self.generation
            );
            return false;
        }
        self.pending = None;
        let (outline, anchors) = extract_outline(document);
        self.outline = outline;
        self.anchors = anchors;
        self.subscribe();
        log::debug!(
            "outline {} built with {} heading(s)",
            self.generation,
            self.outline.len()
        );
        true
    }

    fn subscribe(&mut self) {
        let mut observer = ViewportObserver::new(self.generation, self.band);
        for entry in &self.outline {
            match self.anchors.get(&entry.id) {
                Some(anchor) => observer.observe(entry.id.clone(), anchor),
                None => log::debug!("{} has no anchor; not observed", entry.id),
            }
        }
        self.tracker.reset(self.generation);
        self.observer = Some(observer);
    }

    fn release(&mut self) {
        self.pending = None;
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
        }
        self.outline.clear();
        self.anchors = AnchorMap::default();
    }

    /// Polls the observer for band crossings; returns whether the active
    /// heading changed.
    pub(crate) fn on_viewport(&mut self, viewport: Viewport, geometry: &dyn Geometry) -> bool {
        let Some(batch) = self
            .observer
            .as_mut()
            .and_then(|observer| observer.poll(viewport, geometry))
        else {
            return false;
        };
        self.apply_batch(&batch)
    }

    pub(crate) fn apply_batch(&mut self, batch: &IntersectionBatch) -> bool {
        let current = self
            .observer
            .as_ref()
            .is_some_and(|observer| observer.generation() == batch.generation);
        if !current || batch.generation != self.tracker.generation() {
            return false;
        }
        if batch
            .entries
            .iter()
            .any(|entry| !self.anchors.contains(&entry.target))
        {
            let known = IntersectionBatch {
                generation: batch.generation,
                entries: batch
                    .entries
                    .iter()
                    .filter(|entry| self.anchors.contains(&entry.target))
                    .cloned()
                    .collect(),
            };
            return self.tracker.apply(&known);
        }
        self.tracker.apply(batch)
    }

    pub(crate) fn select(
        &mut self,
        id: &HeadingId,
        geometry: &dyn Geometry,
    ) -> Option<ScrollRequest> {
        let top = self
            .anchors
            .get(id)
            .and_then(|anchor| geometry.top_of(anchor));
        if top.is_none() {
            log::debug!("{id} cannot be placed; selection ignored");
        }
        self.navigator.select(top)
    }

    pub(crate) fn on_layout_width(&mut self, width: u16) {
        self.navigator.on_layout_width(width);
    }

    pub(crate) fn toggle_panel(&mut self) -> PanelState {
        self.navigator.toggle()
    }

    pub(crate) fn dismiss_panel(&mut self) -> bool {
        self.navigator.dismiss()
    }

    pub(crate) fn panel_state(&self) -> PanelState {
        self.navigator.state()
    }

    pub(crate) fn navigator_view(&self) -> Option<NavigatorView> {
        self.navigator
            .view(&self.title, &self.outline, self.tracker.active())
    }

    pub(crate) fn teardown(&mut self) {
        self.release();
        self.version = None;
        self.generation = self.generation.next();
        self.tracker.reset(self.generation);
    }
}

impl Drop for OutlineTracker {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::outline::tracker::IntersectionEntry;
    use crate::render::{NodeId, RenderOptions, render_markdown};

    struct FixedTops(HashMap<NodeId, u32>);

    impl Geometry for FixedTops {
        fn top_of(&self, anchor: NodeId) -> Option<u32> {
            self.0.get(&anchor).copied()
        }
    }

    fn render(markdown: &str) -> RenderedDocument {
        render_markdown(
            markdown,
            &RenderOptions {
                image_domain: "img.example.test".to_string(),
            },
        )
    }

    fn component() -> OutlineTracker {
        OutlineTracker::new(
            Navigator::new(100, 100),
            ObservationBand::default(),
            ActivationPolicy::LastReported,
        )
    }

    fn loaded(markdown: &str) -> (OutlineTracker, RenderedDocument) {
        let mut tracker = component();
        let doc = render(markdown);
        let generation = tracker.set_content("Episode", markdown).expect("new content");
        assert!(tracker.commit_render(generation, &doc));
        (tracker, doc)
    }

    fn batch(generation: Generation, index: usize) -> IntersectionBatch {
        IntersectionBatch {
            generation,
            entries: vec![IntersectionEntry {
                target: HeadingId::from_index(index),
                is_intersecting: true,
                band_offset: 0,
            }],
        }
    }

    fn anchor_of(tracker: &OutlineTracker, index: usize) -> NodeId {
        tracker
            .anchors
            .get(&HeadingId::from_index(index))
            .expect("anchor")
    }

    #[test]
    fn outline_is_empty_until_render_commits() {
        let mut tracker = component();
        let generation = tracker.set_content("Ep", "# A").expect("generation");
        assert_eq!(tracker.pending_generation(), Some(tracker.generation()));
        assert!(tracker.outline().is_empty());
        assert!(tracker.navigator_view().is_none());

        assert!(tracker.commit_render(generation, &render("# A")));
        assert_eq!(tracker.outline().len(), 1);
        assert!(tracker.is_observing());
    }

    #[test]
    fn unchanged_content_does_not_rebuild() {
        let (mut tracker, _) = loaded("# A\n\n## B");
        let generation = tracker.generation();
        assert_eq!(tracker.set_content("Ep", "# A\n\n## B"), None);
        assert_eq!(tracker.generation(), generation);
        assert_eq!(tracker.outline().len(), 2);
    }

    #[test]
    fn stale_render_commit_is_discarded() {
        let mut tracker = component();
        let first = tracker.set_content("Ep", "# Old").expect("first");
        let second = tracker.set_content("Ep", "# New\n\n# Newer").expect("second");

        assert!(!tracker.commit_render(first, &render("# Old")));
        assert!(tracker.outline().is_empty());
        assert!(tracker.commit_render(second, &render("# New\n\n# Newer")));
        assert_eq!(tracker.outline().len(), 2);
        assert!(!tracker.commit_render(second, &render("# New\n\n# Newer")));
    }

    #[test]
    fn zero_headings_render_no_navigator() {
        let (tracker, _) = loaded("plain text only");
        assert!(tracker.outline().is_empty());
        assert!(tracker.navigator_view().is_none());
        assert_eq!(tracker.active_id(), None);
    }

    #[test]
    fn scrolling_activates_exactly_one_heading() {
        let (mut tracker, _) = loaded("# A\n\n# B\n\n# C");
        let geometry = FixedTops(
            (0..3)
                .map(|idx| (anchor_of(&tracker, idx), idx as u32 * 30))
                .collect(),
        );

        assert!(tracker.on_viewport(Viewport { scroll_top: 0, height: 50 }, &geometry));
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(1)));

        assert!(tracker.on_viewport(Viewport { scroll_top: 50, height: 50 }, &geometry));
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(2)));

        let view = tracker.navigator_view().expect("view");
        let active: Vec<&str> = view
            .entries
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(active, ["heading-2"]);
    }

    #[test]
    fn active_heading_survives_scrolling_out_of_band() {
        let (mut tracker, _) = loaded("# A\n\ntext");
        let geometry = FixedTops(HashMap::from([(anchor_of(&tracker, 0), 20)]));
        tracker.on_viewport(Viewport { scroll_top: 0, height: 50 }, &geometry);
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(0)));

        tracker.on_viewport(Viewport { scroll_top: 500, height: 50 }, &geometry);
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(0)));
    }

    #[test]
    fn rebuild_clears_active_heading_even_when_ids_repeat() {
        let (mut tracker, _) = loaded("# A\n\n# B\n\n# C");
        let old_generation = tracker.generation();
        assert!(tracker.apply_batch(&batch(old_generation, 2)));
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(2)));

        let content = "# X\n\n# Y\n\n# Z\n\n# W";
        let generation = tracker.set_content("Ep", content).expect("new content");
        assert_eq!(tracker.active_id(), None);
        assert!(tracker.commit_render(generation, &render(content)));
        assert_eq!(tracker.active_id(), None);

        assert!(!tracker.apply_batch(&batch(old_generation, 2)));
        assert_eq!(tracker.active_id(), None);

        assert!(tracker.apply_batch(&batch(generation, 2)));
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(2)));
    }

    #[test]
    fn ids_outside_the_outline_never_become_active() {
        let (mut tracker, _) = loaded("# Only");
        assert!(!tracker.apply_batch(&batch(tracker.generation(), 7)));
        assert_eq!(tracker.active_id(), None);
    }

    #[test]
    fn teardown_releases_observation() {
        let (mut tracker, _) = loaded("# A\n\n# B");
        let generation = tracker.generation();
        let geometry = FixedTops(HashMap::from([(anchor_of(&tracker, 0), 10)]));
        tracker.teardown();

        assert!(!tracker.is_observing());
        assert!(tracker.outline().is_empty());
        assert!(!tracker.apply_batch(&batch(generation, 0)));
        assert!(!tracker.on_viewport(Viewport { scroll_top: 0, height: 50 }, &geometry));
        assert_eq!(tracker.active_id(), None);
        assert!(!tracker.commit_render(generation, &render("# A\n\n# B")));
    }

    #[test]
    fn content_change_cancels_pending_extraction_and_observer() {
        let (mut tracker, _) = loaded("# A");
        assert!(tracker.is_observing());
        tracker.set_content("Ep", "# B").expect("new content");
        assert!(!tracker.is_observing());
        assert_eq!(tracker.pending_generation(), Some(tracker.generation()));
    }

    #[test]
    fn selection_scrolls_to_heading_minus_offset() {
        let (mut tracker, _) = loaded("# A\n\n## B");
        let geometry = FixedTops(HashMap::from([(anchor_of(&tracker, 1), 500)]));
        let request = tracker
            .select(&HeadingId::from_index(1), &geometry)
            .expect("scroll request");
        assert_eq!(request.top, 400);
        assert!(request.smooth);
    }

    #[test]
    fn selection_of_unplaceable_heading_is_ignored() {
        let (mut tracker, _) = loaded("# A");
        tracker.on_layout_width(40);
        tracker.toggle_panel();
        let geometry = FixedTops(HashMap::new());
        assert_eq!(tracker.select(&HeadingId::from_index(0), &geometry), None);
        assert_eq!(tracker.select(&HeadingId::from_index(9), &geometry), None);
        assert_eq!(tracker.panel_state(), PanelState::OverlayShown);
    }

    #[test]
    fn unplaceable_headings_stay_in_outline_but_never_activate() {
        let (mut tracker, _) = loaded("# A\n\n# B");
        let geometry = FixedTops(HashMap::from([(anchor_of(&tracker, 1), 12)]));
        tracker.on_viewport(Viewport { scroll_top: 0, height: 50 }, &geometry);
        assert_eq!(tracker.outline().len(), 2);
        assert_eq!(tracker.active_id(), Some(&HeadingId::from_index(1)));
    }
}
