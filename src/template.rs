//! Mustache-style placeholder substitution.
//!
//! `{{name}}`, `{{ name }}`, `{{{name}}}` and dotted paths such as
//! `{{customer.name}}` are replaced with values from a JSON data record.
//! Values are inserted verbatim: there is NO HTML escaping, so data must come
//! from a trusted source or be escaped by the caller before rendering.
//! `{{! ... }}` is a comment and renders as nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

use crate::error::{PressError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(Vec<String>),
}

/// A template split into literal text and placeholder paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            literal.push_str(&rest[..open]);
            let after = &rest[open..];
            let (inner, consumed) = match split_tag(after) {
                Some(tag) => tag,
                None => {
                    // Unterminated tag: the remainder is literal text.
                    literal.push_str(after);
                    rest = "";
                    break;
                }
            };
            rest = &after[consumed..];

            let inner = inner.trim();
            if inner.starts_with('!') {
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(
                inner.split('.').map(|p| p.trim().to_string()).collect(),
            ));
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    pub fn render(&self, data: &Value) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    if let Some(value) = lookup(data, path) {
                        write_value(&mut out, value);
                    }
                }
            }
        }
        out
    }

    /// Placeholder names in first-seen order, without duplicates.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(path) = segment {
                let name = path.join(".");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Locate the tag at the start of `s` (which begins with `{{`). Returns the
/// text between the braces and the number of bytes the tag spans.
fn split_tag(s: &str) -> Option<(&str, usize)> {
    if let Some(body) = s.strip_prefix("{{{") {
        let end = body.find("}}}")?;
        return Some((&body[..end], 3 + end + 3));
    }
    let body = &s[2..];
    let end = body.find("}}")?;
    Some((&body[..end], 2 + end + 2))
}

fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = data;
    for key in path {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
        }
        Value::Null | Value::Object(_) => {}
    }
}

/// Compile and render in one step.
pub fn render(template: &str, data: &Value) -> String {
    Template::compile(template).render(data)
}

/// Unique placeholder names used by `template`.
pub fn list_placeholders(template: &str) -> Vec<String> {
    Template::compile(template).placeholders()
}

// ---------------------------------------------------------------------------
// File cache
// ---------------------------------------------------------------------------

struct CachedTemplate {
    modified: SystemTime,
    template: Template,
}

/// Compiled templates keyed by canonical file path. An entry is recompiled
/// when the file's modification time no longer matches.
#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<PathBuf, CachedTemplate>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_file(&self, path: impl AsRef<Path>, data: &Value) -> Result<String> {
        let path = path.as_ref();
        let template_err = |source| PressError::Template {
            path: path.to_path_buf(),
            source,
        };
        let key = path.canonicalize().map_err(template_err)?;
        let modified = std::fs::metadata(&key)
            .and_then(|m| m.modified())
            .map_err(template_err)?;

        if let Some(entry) = self.lock().get(&key) {
            if entry.modified == modified {
                return Ok(entry.template.render(data));
            }
        }

        log::debug!("compiling template {}", key.display());
        let source = std::fs::read_to_string(&key).map_err(template_err)?;
        let template = Template::compile(&source);
        let rendered = template.render(data);
        self.lock()
            .insert(key, CachedTemplate { modified, template });
        Ok(rendered)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CachedTemplate>> {
        // The map stays consistent even if a holder panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_are_inserted_unescaped() {
        let out = render("<p>{{msg}}</p>", &json!({ "msg": "<b>Tom & Jerry</b>" }));
        assert_eq!(out, "<p><b>Tom & Jerry</b></p>");
    }

    #[test]
    fn spacing_triple_braces_and_paths() {
        let data = json!({
            "customer": { "name": "Ada", "tags": ["a", "b"] },
            "total": 12.5,
            "paid": false
        });
        let out = render(
            "{{ customer.name }}|{{{customer.name}}}|{{customer.tags}}|{{customer.tags.1}}|{{total}}|{{paid}}",
            &data,
        );
        assert_eq!(out, "Ada|Ada|a,b|b|12.5|false");
    }

    #[test]
    fn missing_null_and_objects_render_empty() {
        let out = render("[{{nope}}][{{n}}][{{o}}]", &json!({ "n": null, "o": {} }));
        assert_eq!(out, "[][][]");
    }

    #[test]
    fn comments_and_unterminated_tags() {
        assert_eq!(render("a{{! note }}b", &json!({})), "ab");
        assert_eq!(render("a {{oops", &json!({})), "a {{oops");
    }

    #[test]
    fn placeholders_are_listed_once() {
        let names = list_placeholders("{{a}} {{ b.c }} {{a}} {{! x }}");
        assert_eq!(names, vec!["a", "b.c"]);
    }
}
