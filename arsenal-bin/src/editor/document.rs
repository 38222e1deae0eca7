use select::{document::Document as HtmlDocument, node::Node, predicate::Name};

/// A link mark on a run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub new_tab: bool,
}

/// Inline formatting of a run of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
}

impl Marks {
    // Outermost first
    fn tags(&self) -> Vec<&'static str> {
        [
            (self.bold, "strong"),
            (self.italic, "em"),
            (self.underline, "u"),
            (self.strike, "s"),
            (self.code, "code"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, tag)| *tag)
        .collect()
    }
}

/// What a paragraph is rendered as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Block {
    #[default]
    Paragraph,
    Heading(u8),
    Bullet,
    Numbered,
    Quote,
    Code,
}

impl Block {
    fn label(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading(_) => "heading",
            Self::Bullet | Self::Numbered => "list item",
            Self::Quote => "quote",
            Self::Code => "code block",
        }
    }

    fn list_tag(&self) -> Option<&'static str> {
        match self {
            Self::Bullet => Some("ul"),
            Self::Numbered => Some("ol"),
            _ => None,
        }
    }
}

/// The pieces of a post. Every character of a text run, every image and every
/// paragraph break takes up exactly one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text {
        text: String,
        link: Option<Link>,
        marks: Marks,
    },
    Image {
        src: String,
        alt: String,
    },
    Break,
}

impl Inline {
    pub fn text(text: impl ToString) -> Self {
        Self::Text {
            text: text.to_string(),
            link: None,
            marks: Marks::default(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Text { text, .. } => text.chars().count(),
            _ => 1,
        }
    }
}

/// A line of the position outline shown next to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub position: usize,
    pub label: String,
}

// Containers whose whitespace-only text is layout, not content
const CONTAINERS: &[&str] = &["html", "body", "div", "ul", "ol", "blockquote"];

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The content of the blog editor.
///
/// `blocks[i]` is the kind of the i-th paragraph, so there is always one more
/// block than there are breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Inline>,
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Document {
    /// A document of plain paragraphs
    pub fn new(nodes: Vec<Inline>) -> Self {
        let breaks = nodes.iter().filter(|n| **n == Inline::Break).count();
        Self::with_blocks(nodes, vec![Block::Paragraph; breaks + 1])
    }

    fn with_blocks(nodes: Vec<Inline>, blocks: Vec<Block>) -> Self {
        let mut doc = Self { nodes, blocks };
        doc.normalize();
        doc
    }

    pub fn from_html(html: &str) -> Self {
        let parsed = HtmlDocument::from(html);
        let mut builder = Builder {
            nodes: Vec::new(),
            blocks: vec![Block::Paragraph],
        };
        if let Some(body) = parsed.find(Name("body")).next() {
            builder.walk(body, &Context::default());
        }
        // Trailing breaks carry no content
        while matches!(builder.nodes.last(), Some(Inline::Break)) {
            builder.nodes.pop();
            builder.blocks.pop();
        }
        Self::with_blocks(builder.nodes, builder.blocks)
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;
        for (i, paragraph) in self.nodes.split(|n| *n == Inline::Break).enumerate() {
            if paragraph.is_empty() {
                continue;
            }
            let block = self.block(i);
            if open_list != block.list_tag() {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                open_list = block.list_tag();
                if let Some(tag) = open_list {
                    html.push_str(&format!("<{}>", tag));
                }
            }
            let tag = match block {
                Block::Paragraph => "p".to_string(),
                Block::Heading(level) => format!("h{}", level),
                Block::Bullet | Block::Numbered => "li".to_string(),
                Block::Quote => "blockquote".to_string(),
                Block::Code => "pre".to_string(),
            };
            html.push_str(&format!("<{}>", tag));
            for node in paragraph {
                render_inline(node, &mut html);
            }
            html.push_str(&format!("</{}>", tag));
        }
        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }
        html
    }

    pub fn nodes(&self) -> &[Inline] {
        &self.nodes
    }

    /// The kind of the paragraph with the given index
    pub fn block(&self, paragraph: usize) -> Block {
        self.blocks.get(paragraph).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().map(Inline::len).sum()
    }

    /// No text worth keeping and no image
    pub fn is_empty(&self) -> bool {
        !self.nodes.iter().any(|n| match n {
            Inline::Text { text, .. } => !text.trim().is_empty(),
            Inline::Image { .. } => true,
            Inline::Break => false,
        })
    }

    /// The image occupying `position`, as `(src, alt)`
    pub fn image_at(&self, position: usize) -> Option<(&str, &str)> {
        let mut start = 0;
        for node in &self.nodes {
            if let Inline::Image { src, alt } = node {
                if start == position {
                    return Some((src, alt));
                }
            }
            start += node.len();
            if start > position {
                break;
            }
        }
        None
    }

    // Split the text run containing `position` so that a node starts there.
    // Returns the index of that node.
    fn split_at(&mut self, position: usize) -> usize {
        let mut start = 0;
        for i in 0..self.nodes.len() {
            if start == position {
                return i;
            }
            let len = self.nodes[i].len();
            if position < start + len {
                if let Inline::Text { text, link, marks } = &self.nodes[i] {
                    let offset = position - start;
                    let head: String = text.chars().take(offset).collect();
                    let tail: String = text.chars().skip(offset).collect();
                    let (link, marks) = (link.clone(), *marks);
                    self.nodes[i] = Inline::Text {
                        text: head,
                        link: link.clone(),
                        marks,
                    };
                    self.nodes.insert(
                        i + 1,
                        Inline::Text {
                            text: tail,
                            link,
                            marks,
                        },
                    );
                    return i + 1;
                }
                return i + 1;
            }
            start += len;
        }
        self.nodes.len()
    }

    pub fn insert_image(&mut self, position: usize, src: impl ToString, alt: impl ToString) {
        let index = self.split_at(position);
        self.nodes.insert(
            index,
            Inline::Image {
                src: src.to_string(),
                alt: alt.to_string(),
            },
        );
        self.normalize();
    }

    /// Replace the alt text of the image at `position`. Returns whether there was one.
    pub fn set_image_alt(&mut self, position: usize, new_alt: impl ToString) -> bool {
        let mut start = 0;
        for node in self.nodes.iter_mut() {
            let len = node.len();
            if start == position {
                if let Inline::Image { alt, .. } = node {
                    *alt = new_alt.to_string();
                    return true;
                }
            }
            start += len;
            if start > position {
                break;
            }
        }
        false
    }

    /// Plain text within `[start, end)`
    pub fn text_between(&self, start: usize, end: usize) -> String {
        let mut text = String::new();
        let mut pos = 0;
        for node in &self.nodes {
            match node {
                Inline::Text { text: t, .. } => {
                    for c in t.chars() {
                        if pos >= start && pos < end {
                            text.push(c);
                        }
                        pos += 1;
                    }
                }
                Inline::Break => {
                    if pos >= start && pos < end {
                        text.push('\n');
                    }
                    pos += 1;
                }
                Inline::Image { .. } => pos += 1,
            }
        }
        text
    }

    // Apply `f` to every text run fully inside `[start, end)`
    fn map_text(&mut self, start: usize, end: usize, f: impl Fn(&mut Option<Link>)) {
        let first = self.split_at(start);
        let last = self.split_at(end);
        for node in &mut self.nodes[first..last] {
            if let Inline::Text { link, .. } = node {
                f(link);
            }
        }
        self.normalize();
    }

    pub fn apply_link(&mut self, start: usize, end: usize, new_link: Link) {
        self.map_text(start, end, |link| *link = Some(new_link.clone()));
    }

    pub fn remove_link(&mut self, start: usize, end: usize) {
        self.map_text(start, end, |link| *link = None);
    }

    /// Where things are, for positioning the cursor without a script
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        let mut position = 0;
        let mut paragraph = 0;
        for node in &self.nodes {
            let label = match node {
                Inline::Text { text, link, .. } => {
                    let mut snippet: String = text.chars().take(48).collect();
                    if text.chars().count() > 48 {
                        snippet.push('…');
                    }
                    match link {
                        Some(link) => format!("{} [link: {}]", snippet, link.href),
                        None => snippet,
                    }
                }
                Inline::Image { alt, .. } => format!("[image: {}]", alt),
                Inline::Break => {
                    paragraph += 1;
                    format!("[new {}]", self.block(paragraph).label())
                }
            };
            entries.push(OutlineEntry { position, label });
            position += node.len();
        }
        entries
    }

    // Drop empty runs and merge neighbours that carry the same link and marks.
    fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            match node {
                Inline::Text { ref text, .. } if text.is_empty() => {}
                Inline::Text { text, link, marks } => match merged.last_mut() {
                    Some(Inline::Text {
                        text: prev,
                        link: prev_link,
                        marks: prev_marks,
                    }) if *prev_link == link && *prev_marks == marks => prev.push_str(&text),
                    _ => merged.push(Inline::Text { text, link, marks }),
                },
                other => merged.push(other),
            }
        }
        self.nodes = merged;
        let breaks = self.nodes.iter().filter(|n| **n == Inline::Break).count();
        self.blocks.resize(breaks + 1, Block::Paragraph);
    }
}

fn render_inline(node: &Inline, html: &mut String) {
    match node {
        Inline::Text { text, link, marks } => {
            if let Some(link) = link {
                html.push_str(&format!("<a href=\"{}\"", escape(&link.href)));
                if link.new_tab {
                    html.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
                }
                html.push('>');
            }
            let tags = marks.tags();
            for tag in &tags {
                html.push_str(&format!("<{}>", tag));
            }
            html.push_str(&escape(text));
            for tag in tags.iter().rev() {
                html.push_str(&format!("</{}>", tag));
            }
            if link.is_some() {
                html.push_str("</a>");
            }
        }
        Inline::Image { src, alt } => html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape(src),
            escape(alt)
        )),
        Inline::Break => {}
    }
}

// What the parser knows about the elements around a node
#[derive(Clone, Default)]
struct Context {
    link: Option<Link>,
    marks: Marks,
    // Whether the innermost list is ordered
    list: Option<bool>,
    quote: bool,
    pre: bool,
}

struct Builder {
    nodes: Vec<Inline>,
    blocks: Vec<Block>,
}

impl Builder {
    fn at_paragraph_start(&self) -> bool {
        matches!(self.nodes.last(), None | Some(Inline::Break))
    }

    fn paragraph_break(&mut self, next: Block) {
        self.nodes.push(Inline::Break);
        self.blocks.push(next);
    }

    // Start a paragraph of the given kind, reusing the current one if nothing was written to it
    fn open_block(&mut self, block: Block) {
        if self.at_paragraph_start() {
            if let Some(last) = self.blocks.last_mut() {
                *last = block;
            }
        } else {
            self.paragraph_break(block);
        }
    }

    // Whatever follows a block goes into a fresh paragraph
    fn close_block(&mut self, ctx: &Context) {
        if !self.at_paragraph_start() {
            let next = if ctx.quote { Block::Quote } else { Block::Paragraph };
            self.paragraph_break(next);
        }
    }

    fn walk(&mut self, node: Node<'_>, ctx: &Context) {
        let tag = match node.name() {
            Some(tag) => tag,
            None => {
                if let Some(text) = node.as_text() {
                    self.nodes.push(Inline::Text {
                        text: text.to_string(),
                        link: ctx.link.clone(),
                        marks: ctx.marks,
                    });
                }
                return;
            }
        };

        let mut inner = ctx.clone();
        let block = match tag {
            "br" => {
                let current = self.blocks.last().copied().unwrap_or_default();
                self.paragraph_break(current);
                return;
            }
            "img" => {
                if let Some(src) = node.attr("src") {
                    self.nodes.push(Inline::Image {
                        src: src.to_string(),
                        alt: node.attr("alt").unwrap_or_default().to_string(),
                    });
                }
                return;
            }
            "script" | "style" | "head" | "template" => return,
            "a" => {
                if let Some(href) = node.attr("href") {
                    inner.link = Some(Link {
                        href: href.to_string(),
                        new_tab: node.attr("target") == Some("_blank"),
                    });
                }
                None
            }
            "strong" | "b" => {
                inner.marks.bold = true;
                None
            }
            "em" | "i" => {
                inner.marks.italic = true;
                None
            }
            "u" => {
                inner.marks.underline = true;
                None
            }
            "s" | "strike" | "del" => {
                inner.marks.strike = true;
                None
            }
            "code" if !ctx.pre => {
                inner.marks.code = true;
                None
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                Some(Block::Heading(tag[1..].parse().unwrap_or(2)))
            }
            "ul" | "ol" => {
                inner.list = Some(tag == "ol");
                Some(Block::Paragraph)
            }
            "li" => Some(match ctx.list {
                Some(true) => Block::Numbered,
                _ => Block::Bullet,
            }),
            "blockquote" => {
                inner.quote = true;
                Some(Block::Quote)
            }
            "pre" => {
                inner.pre = true;
                Some(Block::Code)
            }
            "p" | "div" => Some(if ctx.quote { Block::Quote } else { Block::Paragraph }),
            _ => None,
        };

        if let Some(block) = block {
            self.open_block(block);
        }
        let container = CONTAINERS.contains(&tag);
        for child in node.children() {
            match child.as_text() {
                Some(text) if container && text.trim().is_empty() => {}
                _ => self.walk(child, &inner),
            }
        }
        if block.is_some() {
            self.close_block(ctx);
        }
    }
}
