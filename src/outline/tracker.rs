use crate::render::NodeId;

use super::{Generation, Geometry, HeadingId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Viewport {
    pub(crate) scroll_top: u32,
    pub(crate) height: u32,
}

/// Horizontal band of the viewport, as fractions of its height, inside which
/// a heading's top edge counts as "in focus".
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ObservationBand {
    top: f32,
    bottom: f32,
}

impl Default for ObservationBand {
    fn default() -> Self {
        Self {
            top: 0.2,
            bottom: 0.8,
        }
    }
}

impl ObservationBand {
    /// Document rows `[start, end)` covered by the band.
    pub(crate) fn bounds(&self, viewport: Viewport) -> (u32, u32) {
        let height = viewport.height as f32;
        let start = viewport.scroll_top + (height * self.top).floor() as u32;
        let end = viewport.scroll_top + (height * self.bottom).floor() as u32;
        (start, end)
    }

    pub(crate) fn contains(&self, viewport: Viewport, top: u32) -> bool {
        let (start, end) = self.bounds(viewport);
        (start..end).contains(&top)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntersectionEntry {
    pub(crate) target: HeadingId,
    pub(crate) is_intersecting: bool,
    /// Rows between the band's top edge and the target's top edge.
    pub(crate) band_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntersectionBatch {
    pub(crate) generation: Generation,
    pub(crate) entries: Vec<IntersectionEntry>,
}

#[derive(Debug, Clone)]
struct ObservedTarget {
    id: HeadingId,
    anchor: NodeId,
    intersecting: Option<bool>,
}

/// Watches a set of heading anchors and reports when they enter or leave the
/// observation band.
///
/// The first poll after a target is observed reports its state regardless of
/// change; later polls only report transitions.
#[derive(Debug)]
pub(crate) struct ViewportObserver {
    generation: Generation,
    band: ObservationBand,
    targets: Vec<ObservedTarget>,
    connected: bool,
}

impl ViewportObserver {
    pub(crate) fn new(generation: Generation, band: ObservationBand) -> Self {
        Self {
            generation,
            band,
            targets: Vec::new(),
            connected: true,
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn observe(&mut self, id: HeadingId, anchor: NodeId) {
        if !self.connected {
            return;
        }
        self.targets.push(ObservedTarget {
            id,
            anchor,
            intersecting: None,
        });
    }

    #[cfg(test)]
    pub(crate) fn observed_count(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn disconnect(&mut self) {
        self.targets.clear();
        self.connected = false;
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn poll(
        &mut self,
        viewport: Viewport,
        geometry: &dyn Geometry,
    ) -> Option<IntersectionBatch> {
        if !self.connected {
            return None;
        }
        let (band_start, _) = self.band.bounds(viewport);
        let mut entries = Vec::new();
        for target in &mut self.targets {
            let Some(top) = geometry.top_of(target.anchor) else {
                continue;
            };
            let now = self.band.contains(viewport, top);
            if target.intersecting == Some(now) {
                continue;
            }
            target.intersecting = Some(now);
            entries.push(IntersectionEntry {
                target: target.id.clone(),
                is_intersecting: now,
                band_offset: top.saturating_sub(band_start),
            });
        }
        (!entries.is_empty()).then_some(IntersectionBatch {
            generation: self.generation,
            entries,
        })
    }
}

/// How one batch of intersection reports picks the active heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ActivationPolicy {
    /// The last intersecting entry in the batch wins.
    #[default]
    LastReported,
    /// The intersecting entry closest to the band's top edge wins.
    NearestBandTop,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PositionTracker {
    generation: Generation,
    active: Option<HeadingId>,
    policy: ActivationPolicy,
}

impl PositionTracker {
    pub(crate) fn new(policy: ActivationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub(crate) fn reset(&mut self, generation: Generation) {
        self.generation = generation;
        self.active = None;
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn active(&self) -> Option<&HeadingId> {
        self.active.as_ref()
    }

    /// Applies one batch; returns whether the active heading changed.
    pub(crate) fn apply(&mut self, batch: &IntersectionBatch) -> bool {
        if batch.generation != self.generation {
            return false;
        }
        let mut intersecting = batch.entries.iter().filter(|entry| entry.is_intersecting);
        let chosen = match self.policy {
            ActivationPolicy::LastReported => intersecting.next_back(),
            ActivationPolicy::NearestBandTop => intersecting.min_by_key(|entry| entry.band_offset),
        };
        let Some(chosen) = chosen else {
            return false;
        };
        if self.active.as_ref() == Some(&chosen.target) {
            return false;
        }
        self.active = Some(chosen.target.clone());
        true
    }
}
