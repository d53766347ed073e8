//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! Templates are a controlled dialect, so this is a small recursive-descent
//! parser rather than a full HTML5 tree builder:
//! - `style` and `script` bodies are kept as raw text
//! - void elements (`br`, `hr`, `img`, `meta`, ...) never take children
//! - comments, doctype and processing instructions are dropped
//! - a closing tag that matches no open element is skipped

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element. Tags the layout engine has no special rule
/// for are kept as [`Tag::Unknown`] and rendered inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Title,
    Body,
    Style,
    Script,
    Main,
    Section,
    Article,
    Header,
    Footer,
    Aside,
    Nav,
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Span,
    Strong,
    B,
    Br,
    Hr,
    Img,
    Unknown(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "title" => Tag::Title,
            "body" => Tag::Body,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "main" => Tag::Main,
            "section" => Tag::Section,
            "article" => Tag::Article,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "aside" => Tag::Aside,
            "nav" => Tag::Nav,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "span" => Tag::Span,
            "strong" => Tag::Strong,
            "b" => Tag::B,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "img" => Tag::Img,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Block-level tags get their margins applied as vertical gaps.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Html
                | Tag::Body
                | Tag::Main
                | Tag::Section
                | Tag::Article
                | Tag::Header
                | Tag::Footer
                | Tag::Aside
                | Tag::Nav
                | Tag::Div
                | Tag::P
                | Tag::H1
                | Tag::H2
                | Tag::H3
                | Tag::H4
                | Tag::H5
                | Tag::H6
                | Tag::Ul
                | Tag::Ol
                | Tag::Li
        )
    }

    /// Tags whose content is never drawn.
    pub fn is_non_content(&self) -> bool {
        matches!(self, Tag::Head | Tag::Title | Tag::Style | Tag::Script)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Tag::Ul | Tag::Ol)
    }

    fn is_void(&self) -> bool {
        match self {
            Tag::Br | Tag::Hr | Tag::Img => true,
            Tag::Unknown(name) => matches!(
                name.as_str(),
                "meta" | "link" | "input" | "wbr" | "col" | "area" | "base" | "source"
            ),
            _ => false,
        }
    }

    fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script)
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

impl DomNode {
    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        match self {
            DomNode::Text(t) => t.clone(),
            DomNode::Element(e) => e.text_content(),
        }
    }
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of top-level DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let mut nodes = Vec::new();
    loop {
        nodes.extend(parser.parse_nodes());
        if parser.eof() {
            break;
        }
        // Only a stray closing tag can stop parse_nodes at the top level.
        parser.skip_closing_tag();
    }
    nodes
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Lower-cased names of the elements currently open, outermost first.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.starts_with("</") {
                let name = self.peek_closing_name();
                if self.open.iter().any(|open| *open == name) {
                    break;
                }
                if self.open.is_empty() {
                    break;
                }
                self.skip_closing_tag();
                continue;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past(">");
            return None;
        }
        if self.starts_with("<") && self.next_is_name_start() {
            return Some(self.parse_element());
        }
        Some(self.parse_text())
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is plain text.
        if self.starts_with("<") {
            self.advance(1);
        }
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(1); // '<'
        let tag_name = self.parse_name().to_ascii_lowercase();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if !key.is_empty() {
                elem.attributes.insert(key.to_ascii_lowercase(), value);
            }
            if self.pos == before {
                // Junk such as a stray quote; step over it.
                self.advance(1);
            }
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let start = self.pos;
            let end = self.find_ci(&format!("</{tag_name}")).unwrap_or(self.input.len());
            let raw = &self.input[start..end];
            if !raw.is_empty() {
                elem.children.push(DomNode::Text(raw.to_string()));
            }
            self.pos = end;
            if !self.eof() {
                self.skip_closing_tag();
            }
            return DomNode::Element(elem);
        }

        self.open.push(tag_name.clone());
        elem.children = self.parse_nodes();
        self.open.pop();

        // Only consume our own closing tag; anything else closes an ancestor.
        if self.starts_with("</") && self.peek_closing_name() == tag_name {
            self.skip_closing_tag();
        }

        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> &'a str {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name().to_string();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance(1);
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            if c == '/' && self.input[self.pos..].starts_with("/>") {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    /// Name of the closing tag at the cursor, lower-cased, without consuming it.
    fn peek_closing_name(&self) -> String {
        self.input[self.pos + 2..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == ':')
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn skip_closing_tag(&mut self) {
        self.skip_past(">");
    }

    fn skip_past(&mut self, marker: &str) {
        match self.input[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    /// Case-insensitive search for `needle` from the cursor.
    fn find_ci(&self, needle: &str) -> Option<usize> {
        let hay = self.input[self.pos..].to_ascii_lowercase();
        hay.find(&needle.to_ascii_lowercase()).map(|i| self.pos + i)
    }

    fn next_is_name_start(&self) -> bool {
        self.input[self.pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

/// Decode the named entities templates actually use plus numeric references.
/// Unknown entities are left as written.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                "bull" => Some('\u{2022}'),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                "euro" => Some('\u{20AC}'),
                "copy" => Some('\u{00A9}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    fn find_body(nodes: &[DomNode]) -> Option<&ElementNode> {
        nodes.iter().find_map(|node| match node {
            DomNode::Element(e) if e.tag == Tag::Body => Some(e),
            DomNode::Element(e) if e.tag == Tag::Html => find_body(&e.children),
            _ => None,
        })
    }
    match find_body(nodes) {
        Some(body) => body.children.clone(),
        None => nodes.to_vec(),
    }
}

/// Concatenated text of every `<style>` element in the document, in source
/// order, wherever it appears.
pub fn style_sheet_text(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&style_sheet_text(&e.children));
            }
        }
    }
    css
}
