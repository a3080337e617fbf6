mod layout;

pub(crate) use layout::{DocumentLayout, LayoutRow};

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::format::{ImageVariant, image_url};

pub(crate) type NodeId = usize;

const RULE_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Heading(u8),
    Paragraph,
    BlockQuote,
    List,
    Item,
    CodeBlock,
    Table,
    Image,
    Rule,
}

/// One structural element of a rendered episode.
///
/// `first_line` is the index of the first logical line the element occupies;
/// layout maps it to a row once a width is known.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) first_line: usize,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SpanStyle {
    pub(crate) heading: Option<u8>,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
    pub(crate) strike: bool,
    pub(crate) code: bool,
    pub(crate) link: bool,
    pub(crate) muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StyledSpan {
    pub(crate) text: String,
    pub(crate) style: SpanStyle,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RenderedLine {
    pub(crate) spans: Vec<StyledSpan>,
    pub(crate) plain: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RenderedDocument {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    lines: Vec<RenderedLine>,
}

impl RenderedDocument {
    pub(crate) fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn lines(&self) -> &[RenderedLine] {
        &self.lines
    }

    pub(crate) fn node_first_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().map(|node| node.first_line)
    }

    #[cfg(test)]
    pub(crate) fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.plain.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RenderOptions {
    /// Domain used to resolve bare image identifiers in `![alt](id)`.
    pub(crate) image_domain: String,
}

pub(crate) fn render_markdown(markdown: &str, options: &RenderOptions) -> RenderedDocument {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(options);
    for event in Parser::new_ext(markdown, md_options) {
        match event {
            Event::Start(tag) => renderer.handle_start(tag),
            Event::End(tag) => renderer.handle_end(tag),
            Event::Text(text) => renderer.add_text(&text),
            Event::Code(code) => renderer.add_inline_code(&code),
            Event::SoftBreak => renderer.add_text(" "),
            Event::HardBreak => renderer.flush_line(false),
            Event::Rule => renderer.add_rule(),
            Event::TaskListMarker(done) => {
                renderer.push_text(if done { "[x] " } else { "[ ] " }, SpanStyle::default());
            }
            // Raw HTML is not rendered, matching the site's markdown pipeline.
            _ => {}
        }
    }
    renderer.finish()
}

fn heading_level_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[derive(Default)]
struct InlineState {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
    link_depth: usize,
}

#[derive(Debug, Clone)]
struct ListState {
    ordered: bool,
    next_index: u64,
}

#[derive(Default)]
struct TableBuffer {
    in_head: bool,
    header_cells: usize,
    current_row: Vec<String>,
    current_cell: String,
}

struct PendingImage {
    node: NodeId,
    target: String,
    alt: String,
}

struct Renderer<'a> {
    options: &'a RenderOptions,

    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    open: Vec<NodeId>,
    lines: Vec<RenderedLine>,

    current_spans: Vec<StyledSpan>,
    current_plain: String,

    inline: InlineState,
    heading: Option<(NodeId, u8)>,
    heading_text: String,
    blockquote_depth: usize,
    list_stack: Vec<ListState>,
    code_block: Option<String>,
    table: Option<TableBuffer>,
    image: Option<PendingImage>,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            roots: Vec::new(),
            open: Vec::new(),
            lines: Vec::new(),
            current_spans: Vec::new(),
            current_plain: String::new(),
            inline: InlineState::default(),
            heading: None,
            heading_text: String::new(),
            blockquote_depth: 0,
            list_stack: Vec::new(),
            code_block: None,
            table: None,
            image: None,
        }
    }

    fn finish(mut self) -> RenderedDocument {
        self.flush_line(false);
        // Trailing blank lines go, but never a heading's own line.
        let keep = self
            .nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Heading(_)))
            .map(|node| node.first_line + 1)
            .max()
            .unwrap_or(0);
        while self.lines.len() > keep
            && self.lines.last().is_some_and(|line| line.plain.is_empty())
        {
            self.lines.pop();
        }
        RenderedDocument {
            nodes: self.nodes,
            roots: self.roots,
            lines: self.lines,
        }
    }

    fn open_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
            first_line: self.lines.len(),
            text: String::new(),
        });
        match self.open.last() {
            Some(&parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }
        self.open.push(id);
        id
    }

    fn close_node(&mut self) -> Option<NodeId> {
        self.open.pop()
    }

    fn style(&self) -> SpanStyle {
        SpanStyle {
            heading: self.heading.map(|(_, level)| level),
            bold: self.inline.strong > 0,
            italic: self.inline.emphasis > 0,
            strike: self.inline.strikethrough > 0,
            code: false,
            link: self.inline.link_depth > 0,
            muted: false,
        }
    }

    fn push_text(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        self.current_plain.push_str(text);
        self.current_spans.push(StyledSpan {
            text: text.to_string(),
            style,
        });
    }

    fn push_prefix_if_needed(&mut self) {
        if !self.current_plain.is_empty() || self.blockquote_depth == 0 {
            return;
        }
        let prefix = "> ".repeat(self.blockquote_depth);
        self.push_text(
            &prefix,
            SpanStyle {
                muted: true,
                ..SpanStyle::default()
            },
        );
    }

    fn flush_line(&mut self, force_empty: bool) {
        if !force_empty && self.current_spans.is_empty() && self.current_plain.is_empty() {
            return;
        }
        self.lines.push(RenderedLine {
            spans: std::mem::take(&mut self.current_spans),
            plain: std::mem::take(&mut self.current_plain),
        });
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_none_or(|line| line.plain.is_empty()) {
            return;
        }
        self.flush_line(true);
    }

    fn add_text(&mut self, text: &str) {
        if let Some(buf) = self.code_block.as_mut() {
            buf.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.current_cell.push_str(text);
            return;
        }
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
            return;
        }
        if self.heading.is_some() {
            self.heading_text.push_str(text);
        }
        self.push_prefix_if_needed();
        let style = self.style();
        self.push_text(text, style);
    }

    fn add_inline_code(&mut self, code: &str) {
        if let Some(table) = self.table.as_mut() {
            table.current_cell.push_str(code);
            return;
        }
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(code);
            return;
        }
        if self.heading.is_some() {
            self.heading_text.push_str(code);
        }
        self.push_prefix_if_needed();
        let style = SpanStyle {
            code: true,
            ..self.style()
        };
        self.push_text(code, style);
    }

    fn add_rule(&mut self) {
        self.flush_line(false);
        self.open_node(NodeKind::Rule);
        self.close_node();
        self.push_text(
            &"─".repeat(RULE_WIDTH),
            SpanStyle {
                muted: true,
                ..SpanStyle::default()
            },
        );
        self.flush_line(false);
        self.blank_line();
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        if let Some(table) = self.table.as_mut() {
            match tag {
                Tag::TableHead => {
                    table.in_head = true;
                    table.current_row.clear();
                    return;
                }
                Tag::TableRow => {
                    table.current_row.clear();
                    return;
                }
                Tag::TableCell => {
                    table.current_cell.clear();
                    return;
                }
                _ => {}
            }
        }

        match tag {
            Tag::Paragraph => {
                self.flush_line(false);
                self.open_node(NodeKind::Paragraph);
            }
            Tag::Heading { level, .. } => {
                self.flush_line(false);
                let level = heading_level_u8(level);
                let id = self.open_node(NodeKind::Heading(level));
                self.heading = Some((id, level));
                self.heading_text.clear();
            }
            Tag::BlockQuote(_) => {
                self.flush_line(false);
                self.open_node(NodeKind::BlockQuote);
                self.blockquote_depth = self.blockquote_depth.saturating_add(1);
            }
            Tag::CodeBlock(kind) => {
                self.flush_line(false);
                self.open_node(NodeKind::CodeBlock);
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.is_empty()
                {
                    self.push_text(
                        &format!("[{lang}]"),
                        SpanStyle {
                            muted: true,
                            ..SpanStyle::default()
                        },
                    );
                    self.flush_line(false);
                }
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line(false);
                self.open_node(NodeKind::List);
                self.list_stack.push(match start {
                    Some(index) => ListState {
                        ordered: true,
                        next_index: index,
                    },
                    None => ListState {
                        ordered: false,
                        next_index: 1,
                    },
                });
            }
            Tag::Item => {
                self.flush_line(false);
                self.open_node(NodeKind::Item);
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let bullet = match self.list_stack.last_mut() {
                    Some(list) if list.ordered => {
                        let bullet = format!("{}. ", list.next_index);
                        list.next_index = list.next_index.saturating_add(1);
                        bullet
                    }
                    _ => "- ".to_string(),
                };
                self.push_prefix_if_needed();
                self.push_text(
                    &format!("{indent}{bullet}"),
                    SpanStyle {
                        muted: true,
                        ..SpanStyle::default()
                    },
                );
            }
            Tag::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_add(1),
            Tag::Strong => self.inline.strong = self.inline.strong.saturating_add(1),
            Tag::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_add(1);
            }
            Tag::Link { .. } => self.inline.link_depth = self.inline.link_depth.saturating_add(1),
            Tag::Image { dest_url, .. } => {
                self.flush_line(false);
                let node = self.open_node(NodeKind::Image);
                self.image = Some(PendingImage {
                    node,
                    target: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Table(_) => {
                self.flush_line(false);
                self.open_node(NodeKind::Table);
                self.table = Some(TableBuffer::default());
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: TagEnd) {
        if let Some(table) = self.table.as_mut() {
            match tag {
                TagEnd::TableCell => {
                    let cell = std::mem::take(&mut table.current_cell);
                    table.current_row.push(cell.trim().to_string());
                    return;
                }
                TagEnd::TableHead | TagEnd::TableRow => {
                    let row = std::mem::take(&mut table.current_row);
                    let in_head = std::mem::replace(&mut table.in_head, false);
                    if in_head {
                        table.header_cells = row.len();
                    }
                    self.push_table_row(&row, in_head);
                    return;
                }
                TagEnd::Table => {
                    self.table = None;
                    self.close_node();
                    self.blank_line();
                    return;
                }
                _ => {}
            }
        }

        match tag {
            TagEnd::Paragraph => {
                self.flush_line(false);
                self.close_node();
                self.blank_line();
            }
            TagEnd::Heading(_) => {
                // Headings always occupy a line so they can be scrolled to.
                self.flush_line(true);
                if let Some((id, _)) = self.heading.take() {
                    self.nodes[id].text = self.heading_text.trim().to_string();
                }
                self.heading_text.clear();
                self.close_node();
                self.blank_line();
            }
            TagEnd::BlockQuote => {
                self.flush_line(false);
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.close_node();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                self.push_code_lines(&code);
                self.close_node();
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_line(false);
                self.list_stack.pop();
                self.close_node();
                self.blank_line();
            }
            TagEnd::Item => {
                self.flush_line(false);
                self.close_node();
            }
            TagEnd::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_sub(1),
            TagEnd::Strong => self.inline.strong = self.inline.strong.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_sub(1);
            }
            TagEnd::Link => self.inline.link_depth = self.inline.link_depth.saturating_sub(1),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.push_image_line(image);
                }
                self.close_node();
            }
            _ => {}
        }
    }

    fn push_table_row(&mut self, row: &[String], header: bool) {
        self.push_prefix_if_needed();
        let style = SpanStyle {
            bold: header,
            ..SpanStyle::default()
        };
        self.push_text(&format!("| {} |", row.join(" | ")), style);
        self.flush_line(false);
        if header {
            let separator = vec!["---"; self.table.as_ref().map_or(row.len(), |t| t.header_cells)];
            self.push_prefix_if_needed();
            self.push_text(
                &format!("|{}|", separator.join("|")),
                SpanStyle {
                    muted: true,
                    ..SpanStyle::default()
                },
            );
            self.flush_line(false);
        }
    }

    fn push_code_lines(&mut self, code: &str) {
        let style = SpanStyle {
            code: true,
            ..SpanStyle::default()
        };
        for line in code.trim_end_matches('\n').split('\n') {
            self.push_prefix_if_needed();
            self.push_text(&format!("    {line}"), style);
            self.flush_line(true);
        }
    }

    fn push_image_line(&mut self, image: PendingImage) {
        let url = self.resolve_image(&image.target);
        let alt = image.alt.trim();
        let label = if alt.is_empty() {
            "[image]".to_string()
        } else {
            format!("[image: {alt}]")
        };
        self.nodes[image.node].text = alt.to_string();
        self.push_prefix_if_needed();
        self.push_text(
            &label,
            SpanStyle {
                italic: true,
                ..self.style()
            },
        );
        self.push_text(
            &format!(" <{url}>"),
            SpanStyle {
                muted: true,
                ..SpanStyle::default()
            },
        );
        self.flush_line(false);
    }

    fn resolve_image(&self, target: &str) -> String {
        let target = target.trim();
        if target.contains("://") || target.starts_with('/') || target.starts_with("data:") {
            return target.to_string();
        }
        image_url(
            &self.options.image_domain,
            target,
            &ImageVariant::Named("public".to_string()),
        )
    }
}
