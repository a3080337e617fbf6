use unicode_width::UnicodeWidthChar;

use crate::outline::Geometry;

use super::{NodeId, RenderedDocument, SpanStyle, StyledSpan};

#[derive(Debug, Clone, Default)]
pub(crate) struct LayoutRow {
    pub(crate) spans: Vec<StyledSpan>,
}

impl LayoutRow {
    pub(crate) fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

/// A rendered document wrapped to a fixed column width.
///
/// Rows are the unit of scrolling: every logical line takes at least one row,
/// and a node's top is the first row of its first line.
#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentLayout {
    width: u16,
    rows: Vec<LayoutRow>,
    node_tops: Vec<u32>,
}

impl DocumentLayout {
    pub(crate) fn compute(document: &RenderedDocument, width: u16) -> Self {
        let columns = usize::from(width.max(1));
        let mut rows = Vec::new();
        let mut line_tops = Vec::with_capacity(document.lines().len());

        for line in document.lines() {
            line_tops.push(rows.len() as u32);
            let mut current = LayoutRow::default();
            let mut used = 0usize;
            for span in &line.spans {
                let mut chunk = String::new();
                for ch in span.text.chars() {
                    let ch_width = ch.width().unwrap_or(0);
                    if used + ch_width > columns && used > 0 {
                        push_chunk(&mut current, &mut chunk, span.style);
                        rows.push(std::mem::take(&mut current));
                        used = 0;
                    }
                    chunk.push(ch);
                    used += ch_width;
                }
                push_chunk(&mut current, &mut chunk, span.style);
            }
            rows.push(current);
        }

        let node_tops = document
            .node_first_lines()
            .map(|line| {
                line_tops
                    .get(line)
                    .copied()
                    .unwrap_or(rows.len() as u32)
            })
            .collect();

        Self {
            width,
            rows,
            node_tops,
        }
    }

    pub(crate) fn width(&self) -> u16 {
        self.width
    }

    pub(crate) fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    pub(crate) fn rows(&self, start: u32, count: u32) -> &[LayoutRow] {
        let start = (start as usize).min(self.rows.len());
        let end = start.saturating_add(count as usize).min(self.rows.len());
        &self.rows[start..end]
    }

    pub(crate) fn max_scroll(&self, viewport_height: u32) -> u32 {
        self.row_count().saturating_sub(viewport_height)
    }
}

impl Geometry for DocumentLayout {
    fn top_of(&self, anchor: NodeId) -> Option<u32> {
        let top = *self.node_tops.get(anchor)?;
        (top < self.row_count()).then_some(top)
    }
}

fn push_chunk(row: &mut LayoutRow, chunk: &mut String, style: SpanStyle) {
    if chunk.is_empty() {
        return;
    }
    row.spans.push(StyledSpan {
        text: std::mem::take(chunk),
        style,
    });
}
