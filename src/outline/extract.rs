use std::collections::HashMap;

use crate::render::{NodeId, NodeKind, RenderedDocument};

use super::{HeadingEntry, HeadingId};

const MAX_OUTLINE_LEVEL: u8 = 3;

/// Owned mapping from outline ids to the structural nodes they name.
#[derive(Debug, Clone, Default)]
pub(crate) struct AnchorMap {
    anchors: HashMap<HeadingId, NodeId>,
}

impl AnchorMap {
    pub(crate) fn get(&self, id: &HeadingId) -> Option<NodeId> {
        self.anchors.get(id).copied()
    }

    pub(crate) fn contains(&self, id: &HeadingId) -> bool {
        self.anchors.contains_key(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.anchors.len()
    }
}

/// Walks the document in order and collects level 1-3 headings.
///
/// Ids are positional (`heading-0`, `heading-1`, ...) so repeated heading
/// text stays distinguishable.
pub(crate) fn extract_outline(document: &RenderedDocument) -> (Vec<HeadingEntry>, AnchorMap) {
    let mut outline = Vec::new();
    let mut anchors = AnchorMap::default();
    let mut stack: Vec<NodeId> = document.roots().iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let Some(node) = document.node(id) else {
            continue;
        };
        if let NodeKind::Heading(level) = node.kind
            && (1..=MAX_OUTLINE_LEVEL).contains(&level)
        {
            let heading_id = HeadingId::from_index(outline.len());
            anchors.anchors.insert(heading_id.clone(), id);
            outline.push(HeadingEntry {
                id: heading_id,
                text: node.text.clone(),
                level,
            });
        }
        stack.extend(node.children.iter().rev().copied());
    }

    (outline, anchors)
}
