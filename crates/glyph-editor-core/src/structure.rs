//! Structural analyzer: a typed, derived view of the markdown syntax tree.
//!
//! `SyntaxTree::parse` drives pulldown-cmark's offset iterator once and
//! produces a flat, document-ordered list of `StructuralNode`s with char
//! ranges and nesting depth. Node kinds are a closed enum so structural
//! matching is exhaustive and compiler-checked. Trees are recomputed per
//! document version and never retained across a transaction.
//!
//! Parsing is budgeted: oversized documents are parsed up to a byte limit
//! (cut at a line boundary) and the tree is marked incomplete, in
//! preference to blocking on arbitrarily large input.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag};
use smol_str::{SmolStr, ToSmolStr};

/// Side preference when a query offset sits exactly on a node boundary.
///
/// `Right` treats an offset at a node's start as inside it; `Left` treats
/// an offset at a node's end as inside it. Used to distinguish a caret
/// just inside vs just outside a code span.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Bias {
    Left,
    Right,
}

/// Kind tag of a structural node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    /// Ordered list container with its literal start number.
    OrderedList { start: u64 },
    BulletList,
    /// Ordered list item with its position-derived ordinal (1-based within
    /// the list) and the delimiter following the digits (`.` or `)`).
    OrderedItem { ordinal: u64, delim: char },
    BulletItem,
    TaskItem { checked: bool },
    FencedCode { lang: SmolStr },
    IndentedCode,
    InlineCode,
    Table,
    TableCell,
    Link { target: SmolStr },
    /// Raw URL / email autolink.
    Autolink { target: SmolStr },
    Image { target: SmolStr },
    HorizontalRule,
    HtmlBlock,
    InlineHtml,
}

impl NodeKind {
    /// Whether this is any flavor of list item.
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Self::OrderedItem { .. } | Self::BulletItem | Self::TaskItem { .. }
        )
    }

    /// Whether this is a code context (block or inline).
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            Self::FencedCode { .. } | Self::IndentedCode | Self::InlineCode
        )
    }
}

/// A transient, derived view of one syntax-tree element.
///
/// `range` is a half-open char range in the document this tree was parsed
/// from. Sibling ranges at the same depth are non-overlapping and ordered
/// by start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuralNode {
    pub kind: NodeKind,
    pub range: Range<usize>,
    /// Nesting depth; 0 for top-level blocks.
    pub depth: usize,
}

impl StructuralNode {
    fn contains(&self, offset: usize, bias: Bias) -> bool {
        if offset > self.range.start && offset < self.range.end {
            true
        } else if offset == self.range.start {
            bias == Bias::Right && !self.range.is_empty()
        } else if offset == self.range.end {
            bias == Bias::Left && !self.range.is_empty()
        } else {
            false
        }
    }
}

/// Byte budget for one parse.
///
/// `None` parses the whole document. With a limit, documents over the
/// limit are parsed only up to the last line boundary within it and the
/// resulting tree reports `is_complete() == false`.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct ParseBudget {
    pub max_bytes: Option<usize>,
}

impl Default for ParseBudget {
    fn default() -> Self {
        Self {
            max_bytes: Some(1 << 20),
        }
    }
}

impl ParseBudget {
    /// No limit; parse everything.
    pub fn unbounded() -> Self {
        Self { max_bytes: None }
    }
}

/// Flat, document-ordered structural view of one document version.
#[derive(Clone, Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<StructuralNode>,
    complete: bool,
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Per-open-list bookkeeping for ordinal assignment.
struct ListState {
    /// Next expected ordinal for an ordered list; None for bullet lists.
    next_ordinal: Option<u64>,
}

impl SyntaxTree {
    /// Parse `text` into a structural view, honoring the byte budget.
    pub fn parse(text: &str, budget: ParseBudget) -> Self {
        let (slice, complete) = match budget.max_bytes {
            Some(max) if text.len() > max => {
                // Cut at the last line boundary within budget so the tail
                // never starts mid-construct.
                let mut cut = max;
                while cut > 0 && !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                match text[..cut].rfind('\n') {
                    Some(nl) => (&text[..nl + 1], false),
                    None => (&text[..cut], false),
                }
            }
            _ => (text, true),
        };

        let mut nodes: Vec<StructuralNode> = Vec::new();
        // One entry per currently open Start event; Some(idx) when the
        // Start produced a node.
        let mut open: Vec<Option<usize>> = Vec::new();
        let mut lists: Vec<ListState> = Vec::new();

        for (event, byte_range) in Parser::new_ext(slice, parser_options()).into_offset_iter() {
            match event {
                Event::Start(tag) => {
                    let depth = open.len();
                    let kind = match tag {
                        Tag::Paragraph => Some(NodeKind::Paragraph),
                        Tag::Heading { level, .. } => {
                            Some(NodeKind::Heading(heading_level(level)))
                        }
                        Tag::BlockQuote(_) => Some(NodeKind::BlockQuote),
                        Tag::CodeBlock(CodeBlockKind::Fenced(lang)) => {
                            Some(NodeKind::FencedCode {
                                lang: lang.to_smolstr(),
                            })
                        }
                        Tag::CodeBlock(CodeBlockKind::Indented) => Some(NodeKind::IndentedCode),
                        Tag::HtmlBlock => Some(NodeKind::HtmlBlock),
                        Tag::List(start) => {
                            lists.push(ListState {
                                next_ordinal: start.map(|_| 1),
                            });
                            Some(match start {
                                Some(start) => NodeKind::OrderedList { start },
                                None => NodeKind::BulletList,
                            })
                        }
                        Tag::Item => Some(Self::item_kind(slice, &byte_range, &mut lists)),
                        Tag::Table(_) => Some(NodeKind::Table),
                        Tag::TableCell => Some(NodeKind::TableCell),
                        Tag::Link {
                            link_type,
                            dest_url,
                            ..
                        } => Some(match link_type {
                            LinkType::Autolink | LinkType::Email => NodeKind::Autolink {
                                target: dest_url.to_smolstr(),
                            },
                            _ => NodeKind::Link {
                                target: dest_url.to_smolstr(),
                            },
                        }),
                        Tag::Image { dest_url, .. } => Some(NodeKind::Image {
                            target: dest_url.to_smolstr(),
                        }),
                        _ => None,
                    };

                    let idx = kind.map(|kind| {
                        nodes.push(StructuralNode {
                            kind,
                            range: byte_range.clone(),
                            depth,
                        });
                        nodes.len() - 1
                    });
                    open.push(idx);
                }
                Event::End(_) => {
                    if let Some(Some(idx)) = open.pop() {
                        if matches!(
                            nodes[idx].kind,
                            NodeKind::OrderedList { .. } | NodeKind::BulletList
                        ) {
                            lists.pop();
                        }
                    }
                }
                Event::Code(_) => nodes.push(StructuralNode {
                    kind: NodeKind::InlineCode,
                    range: byte_range,
                    depth: open.len(),
                }),
                Event::Rule => nodes.push(StructuralNode {
                    kind: NodeKind::HorizontalRule,
                    range: byte_range,
                    depth: open.len(),
                }),
                Event::InlineHtml(_) => nodes.push(StructuralNode {
                    kind: NodeKind::InlineHtml,
                    range: byte_range,
                    depth: open.len(),
                }),
                Event::TaskListMarker(checked) => {
                    // Promote the innermost open list item to a task item.
                    if let Some(idx) = open
                        .iter()
                        .rev()
                        .flatten()
                        .copied()
                        .find(|&i| nodes[i].kind.is_list_item())
                    {
                        nodes[idx].kind = NodeKind::TaskItem { checked };
                    }
                }
                _ => {}
            }
        }

        convert_ranges_to_chars(slice, &mut nodes);

        Self { nodes, complete }
    }

    /// Classify a list item from its literal marker and assign ordinals.
    fn item_kind(text: &str, byte_range: &Range<usize>, lists: &mut [ListState]) -> NodeKind {
        let ordered = lists.last_mut().and_then(|l| l.next_ordinal.as_mut());
        match ordered {
            Some(next) => {
                let ordinal = *next;
                *next += 1;
                // The item range starts at the marker digits.
                let marker = &text[byte_range.start..byte_range.end.min(text.len())];
                let delim = marker
                    .chars()
                    .find(|c| !c.is_ascii_digit())
                    .filter(|c| *c == '.' || *c == ')')
                    .unwrap_or('.');
                NodeKind::OrderedItem { ordinal, delim }
            }
            None => NodeKind::BulletItem,
        }
    }

    /// Whether the whole document was parsed (false after a budget cut).
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// All nodes in document order, outer blocks before their children.
    pub fn nodes(&self) -> impl Iterator<Item = &StructuralNode> {
        self.nodes.iter()
    }

    /// Innermost node containing `offset`, honoring boundary bias.
    pub fn node_at(&self, offset: usize, bias: Bias) -> Option<&StructuralNode> {
        let mut best: Option<&StructuralNode> = None;
        for node in &self.nodes {
            if node.range.start > offset {
                break;
            }
            if node.contains(offset, bias) {
                match best {
                    Some(b) if node.depth < b.depth => {}
                    _ => best = Some(node),
                }
            }
        }
        best
    }

    /// Innermost inline-code span touching `offset` (boundaries inclusive
    /// on both sides, since a caret press on the closing backtick still
    /// belongs to the span).
    pub fn inline_code_at(&self, offset: usize) -> Option<&StructuralNode> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::InlineCode)
            .find(|n| offset >= n.range.start && offset <= n.range.end)
    }

    /// Indices of all ordered-list containers, in document order.
    pub fn ordered_lists(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::OrderedList { .. }))
            .map(|(i, _)| i)
    }

    /// Direct list-item children of the container at `list_idx`.
    pub fn direct_items(&self, list_idx: usize) -> impl Iterator<Item = &StructuralNode> {
        let list = &self.nodes[list_idx];
        let child_depth = list.depth + 1;
        let end = list.range.end;
        self.nodes[list_idx + 1..]
            .iter()
            .take_while(move |n| n.range.start < end)
            .filter(move |n| n.depth == child_depth && n.kind.is_list_item())
    }

    /// All heading nodes in document order.
    pub fn headings(&self) -> impl Iterator<Item = &StructuralNode> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Heading(_)))
    }

    /// Whether `offset` has an ancestor (or is itself) a node whose kind
    /// matches `pred`.
    pub fn has_enclosing(&self, offset: usize, pred: impl Fn(&NodeKind) -> bool) -> bool {
        self.nodes.iter().any(|n| {
            pred(&n.kind) && offset >= n.range.start && offset <= n.range.end && !n.range.is_empty()
        })
    }
}

/// Rewrite node byte ranges to char ranges in one pass over the text.
fn convert_ranges_to_chars(text: &str, nodes: &mut [StructuralNode]) {
    if text.is_ascii() {
        return;
    }

    let mut boundaries: Vec<usize> = nodes
        .iter()
        .flat_map(|n| [n.range.start, n.range.end])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    // Map each byte boundary to its char index.
    let mut mapped: Vec<(usize, usize)> = Vec::with_capacity(boundaries.len());
    let mut next = boundaries.iter().copied().peekable();
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        while next.peek() == Some(&byte_idx) {
            mapped.push((byte_idx, char_idx));
            next.next();
        }
    }
    let total_chars = text.chars().count();
    for byte_idx in next {
        mapped.push((byte_idx, total_chars));
    }

    let lookup = |byte: usize| -> usize {
        match mapped.binary_search_by_key(&byte, |&(b, _)| b) {
            Ok(i) => mapped[i].1,
            Err(_) => total_chars,
        }
    };

    for node in nodes {
        node.range = lookup(node.range.start)..lookup(node.range.end);
    }
}
