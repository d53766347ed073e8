//! Style sheet parsing – turns the text of `<style>` blocks into a rule list
//! and folds the class selectors into a [`ClassStyleMap`].
//!
//! This is deliberately not a CSS parser. It understands comments, rule
//! blocks, and at-rule blocks (whose inner rules are read like top-level
//! ones), which is all templates need to attach declarations to classes.

use std::collections::HashMap;

use crate::style::{parse_declarations, PartialStyle};

/// One `selectors { declarations }` block, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: PartialStyle,
}

#[derive(Debug, Clone, Default)]
struct ClassEntry {
    style: PartialStyle,
    /// Index of the first rule that mentioned the class.
    order: usize,
}

/// Class name → declared properties, merged property-by-property across
/// every rule that names the class.
#[derive(Debug, Clone, Default)]
pub struct ClassStyleMap {
    entries: HashMap<String, ClassEntry>,
}

impl ClassStyleMap {
    pub fn from_rules(rules: &[Rule]) -> Self {
        let mut map = Self::default();
        for (order, rule) in rules.iter().enumerate() {
            for selector in &rule.selectors {
                if let Some(class) = class_of_selector(selector) {
                    map.entries
                        .entry(class.to_string())
                        .or_insert_with(|| ClassEntry {
                            style: PartialStyle::default(),
                            order,
                        })
                        .style
                        .merge(&rule.declarations);
                }
            }
        }
        map
    }

    pub fn get(&self, class: &str) -> Option<&PartialStyle> {
        self.entries.get(class).map(|e| &e.style)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of the rules for `classes`, applied in the order the classes
    /// were first declared in the style sheet (not attribute order).
    pub fn matching(&self, classes: &[&str]) -> PartialStyle {
        let mut found: Vec<&ClassEntry> = classes
            .iter()
            .filter_map(|c| self.entries.get(*c))
            .collect();
        found.sort_by_key(|e| e.order);
        let mut out = PartialStyle::default();
        for entry in found {
            out.merge(&entry.style);
        }
        out
    }
}

/// Parse style sheet text straight into a class map.
pub fn parse_style_sheet(css: &str) -> ClassStyleMap {
    ClassStyleMap::from_rules(&parse_rules(css))
}

/// The class a selector is credited to: the first class of a selector that
/// starts with `.`. `.card p` and `.card:hover` both count as `card`.
fn class_of_selector(selector: &str) -> Option<&str> {
    let rest = selector.trim().strip_prefix('.')?;
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ':' | '>' | '.' | '[' | '+' | '~'))
        .unwrap_or(rest.len());
    let class = &rest[..end];
    (!class.is_empty()).then_some(class)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split style sheet text into rules. Malformed input ends the rule list
/// early instead of failing.
pub fn parse_rules(css: &str) -> Vec<Rule> {
    let cleaned = strip_comments(css);
    let mut rules = Vec::new();
    let mut cursor = RuleCursor {
        src: &cleaned,
        pos: 0,
    };
    cursor.parse_block_body(&mut rules, 0);
    rules
}

/// Nesting limit for at-rule blocks.
const MAX_DEPTH: usize = 8;

struct RuleCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl RuleCursor<'_> {
    /// Read rules until end of input or the `}` closing the current block.
    fn parse_block_body(&mut self, rules: &mut Vec<Rule>, depth: usize) {
        loop {
            let rest = &self.src[self.pos..];
            let Some(stop) = rest.find(['{', '}', ';']) else {
                self.pos = self.src.len();
                return;
            };
            let prelude = rest[..stop].trim();
            let stop_char = rest.as_bytes()[stop];
            self.pos += stop + 1;
            match stop_char {
                b'}' => return,
                // Statement at-rule (`@import ...;`) or a stray semicolon.
                b';' => continue,
                _ => {}
            }
            if prelude.starts_with('@') {
                if depth >= MAX_DEPTH {
                    self.skip_block();
                } else {
                    self.parse_block_body(rules, depth + 1);
                }
                continue;
            }
            let Some(body) = self.read_declarations() else {
                return;
            };
            let selectors = prelude
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();
            if !selectors.is_empty() {
                rules.push(Rule {
                    selectors,
                    declarations: parse_declarations(body),
                });
            }
        }
    }

    /// Declarations up to the matching `}`. `None` if the block never closes
    /// or contains a nested block.
    fn read_declarations(&mut self) -> Option<&str> {
        let rest = &self.src[self.pos..];
        let end = rest.find(['{', '}'])?;
        if rest.as_bytes()[end] == b'{' {
            // A nested block where declarations belong; drop the whole rule.
            self.skip_block();
            return Some("");
        }
        self.pos += end + 1;
        Some(&rest[..end])
    }

    /// Skip to just past the `}` balancing an already-consumed `{`.
    fn skip_block(&mut self) {
        let mut depth = 1usize;
        for (i, b) in self.src.as_bytes()[self.pos..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += i + 1;
                        return;
                    }
                }
                _ => {}
            }
        }
        self.pos = self.src.len();
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
