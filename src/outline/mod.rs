//! Reading-position outline for rendered episodes.
//!
//! The outline is rebuilt from a committed render, observed against the
//! scrolling viewport to find the heading at the reader's position, and
//! presented by a navigator panel whose entries scroll the document.

mod extract;
mod navigator;
mod tracker;
mod viewer;

use std::fmt;

use crate::render::NodeId;

pub(crate) use extract::{AnchorMap, extract_outline};
pub(crate) use navigator::{NavEntry, Navigator, NavigatorView, PanelState, ScrollRequest};
pub(crate) use tracker::{
    ActivationPolicy, IntersectionBatch, ObservationBand, PositionTracker, Viewport,
    ViewportObserver,
};
pub(crate) use viewer::OutlineTracker;

/// Resolves a structural anchor to its current top row in the document.
pub(crate) trait Geometry {
    fn top_of(&self, anchor: NodeId) -> Option<u32>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HeadingId(String);

impl HeadingId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(format!("heading-{index}"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeadingEntry {
    pub(crate) id: HeadingId,
    pub(crate) text: String,
    pub(crate) level: u8,
}

/// Counter distinguishing successive outline builds of one component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Generation(u64);

impl Generation {
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}
