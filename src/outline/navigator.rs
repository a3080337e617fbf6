use super::{HeadingEntry, HeadingId};

const INDENT_PER_LEVEL: usize = 2;

/// Presentation state of the outline panel.
///
/// Wide layouts dock the panel beside the content; narrow layouts hide it
/// behind a toggle and show it as a dismissible overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PanelState {
    Docked,
    OverlayHidden,
    OverlayShown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScrollRequest {
    pub(crate) top: u32,
    pub(crate) smooth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavEntry {
    pub(crate) id: HeadingId,
    pub(crate) text: String,
    pub(crate) level: u8,
    pub(crate) indent: usize,
    pub(crate) active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavigatorView {
    pub(crate) title: String,
    pub(crate) state: PanelState,
    pub(crate) panel_visible: bool,
    pub(crate) toggle_visible: bool,
    pub(crate) backdrop: bool,
    pub(crate) entries: Vec<NavEntry>,
}

#[derive(Debug, Clone)]
pub(crate) struct Navigator {
    state: PanelState,
    wide_threshold: u16,
    header_offset: u32,
}

impl Navigator {
    pub(crate) fn new(wide_threshold: u16, header_offset: u32) -> Self {
        Self {
            state: PanelState::OverlayHidden,
            wide_threshold,
            header_offset,
        }
    }

    pub(crate) fn state(&self) -> PanelState {
        self.state
    }

    pub(crate) fn on_layout_width(&mut self, width: u16) {
        self.state = if width >= self.wide_threshold {
            PanelState::Docked
        } else if self.state == PanelState::Docked {
            PanelState::OverlayHidden
        } else {
            self.state
        };
    }

    pub(crate) fn toggle(&mut self) -> PanelState {
        self.state = match self.state {
            PanelState::Docked => PanelState::Docked,
            PanelState::OverlayHidden => PanelState::OverlayShown,
            PanelState::OverlayShown => PanelState::OverlayHidden,
        };
        self.state
    }

    pub(crate) fn dismiss(&mut self) -> bool {
        if self.state != PanelState::OverlayShown {
            return false;
        }
        self.state = PanelState::OverlayHidden;
        true
    }

    pub(crate) fn scroll_target(&self, element_top: u32) -> u32 {
        element_top.saturating_sub(self.header_offset)
    }

    /// Turns a selected heading's top row into a scroll request.
    ///
    /// A heading that cannot be placed is a no-op and leaves the panel as is.
    pub(crate) fn select(&mut self, element_top: Option<u32>) -> Option<ScrollRequest> {
        let top = element_top?;
        self.dismiss();
        Some(ScrollRequest {
            top: self.scroll_target(top),
            smooth: true,
        })
    }

    pub(crate) fn view(
        &self,
        title: &str,
        outline: &[HeadingEntry],
        active: Option<&HeadingId>,
    ) -> Option<NavigatorView> {
        if outline.is_empty() {
            return None;
        }
        let entries = outline
            .iter()
            .map(|heading| NavEntry {
                id: heading.id.clone(),
                text: heading.text.clone(),
                level: heading.level,
                indent: usize::from(heading.level.saturating_sub(1)) * INDENT_PER_LEVEL,
                active: active == Some(&heading.id),
            })
            .collect();
        Some(NavigatorView {
            title: title.to_string(),
            state: self.state,
            panel_visible: self.state != PanelState::OverlayHidden,
            toggle_visible: self.state != PanelState::Docked,
            backdrop: self.state == PanelState::OverlayShown,
            entries,
        })
    }
}
