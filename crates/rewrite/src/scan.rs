//! A forgiving tag scanner that reports byte spans instead of building a tree.
//!
//! Rewriting only ever touches a handful of attributes, and the hosted
//! framework is sensitive to everything else staying exactly as it was
//! (attribute order, quoting, whitespace, even malformed markup). So rather
//! than parse-and-serialize, we locate tags and attributes in the original
//! text and splice replacements in at those offsets.

use memchr::{memchr, memmem};
use std::ops::Range;

/// Elements whose content is raw text; tags inside them are not markup.
const RAW_TEXT: [&str; 4] = ["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    /// Tag name, lowercased.
    pub name: String,
    /// `<` through `>` inclusive.
    pub span: Range<usize>,
    pub closing: bool,
    /// Offset just past the tag name, where new attributes can be inserted.
    pub name_end: usize,
    pub attrs: Vec<Attr>,
    /// For raw-text elements: start of the matching end tag (or end of input).
    pub content_end: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attr {
    /// Attribute name, lowercased.
    pub name: String,
    /// Leading whitespace through the end of the value.
    pub outer: Range<usize>,
    pub value: Option<AttrValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrValue {
    /// The value itself, excluding quotes.
    pub span: Range<usize>,
    pub quote: Option<u8>,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn attr_value<'a>(&self, html: &'a str, name: &str) -> Option<&'a str> {
        self.attr(name).and_then(|a| a.value.as_ref()).map(|v| &html[v.span.clone()])
    }

    pub fn is(&self, name: &str) -> bool {
        !self.closing && self.name == name
    }

    /// End of the whole element for raw-text elements: past the end tag's `>`.
    pub fn element_end(&self, html: &str) -> usize {
        let Some(content_end) = self.content_end else {
            return self.span.end;
        };
        match memchr(b'>', &html.as_bytes()[content_end..]) {
            Some(offset) => content_end + offset + 1,
            None => html.len(),
        }
    }
}

/// Every start and end tag in `html`, in document order. Comments, doctype
/// and processing instructions are skipped, as is the content of raw-text
/// elements.
pub(crate) fn tags(html: &str) -> Vec<Tag> {
    let bytes = html.as_bytes();
    let lower = html.to_ascii_lowercase();
    let lower = lower.as_bytes();
    let mut tags = Vec::new();
    let mut pos = 0;
    while let Some(offset) = memchr(b'<', &bytes[pos..]) {
        let start = pos + offset;
        let rest = &bytes[start..];
        if rest.starts_with(b"<!--") {
            pos = match memmem::find(&bytes[start + 4..], b"-->") {
                Some(end) => start + 4 + end + 3,
                None => bytes.len(),
            };
            continue;
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            pos = skip_to_close(bytes, start);
            continue;
        }
        let closing = rest.get(1) == Some(&b'/');
        let name_start = start + if closing { 2 } else { 1 };
        if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
            pos = start + 1;
            continue;
        }
        let mut cursor = name_start;
        while cursor < bytes.len() && !is_name_terminator(bytes[cursor]) {
            cursor += 1;
        }
        let name = String::from_utf8_lossy(&lower[name_start..cursor]).into_owned();
        let name_end = cursor;
        let (attrs, end) = if closing {
            (Vec::new(), skip_to_close(bytes, cursor))
        } else {
            attributes(bytes, lower, cursor)
        };
        let content_end = (!closing && RAW_TEXT.contains(&name.as_str())).then(|| {
            let needle = format!("</{name}");
            memmem::find(&lower[end..], needle.as_bytes()).map_or(bytes.len(), |found| end + found)
        });
        pos = content_end.unwrap_or(end);
        tags.push(Tag {
            name,
            span: start..end,
            closing,
            name_end,
            attrs,
            content_end,
        });
    }
    tags
}

fn is_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Offset just past the next `>` (or end of input).
fn skip_to_close(bytes: &[u8], from: usize) -> usize {
    memchr(b'>', &bytes[from..]).map_or(bytes.len(), |end| from + end + 1)
}

/// Parse attributes starting right after a tag name. Returns the attributes
/// and the offset just past the closing `>`.
fn attributes(bytes: &[u8], lower: &[u8], mut cursor: usize) -> (Vec<Attr>, usize) {
    let mut attrs = Vec::new();
    loop {
        let outer_start = cursor;
        while cursor < bytes.len() && (bytes[cursor].is_ascii_whitespace() || bytes[cursor] == b'/') {
            cursor += 1;
        }
        match bytes.get(cursor) {
            None => return (attrs, bytes.len()),
            Some(b'>') => return (attrs, cursor + 1),
            Some(_) => {},
        }
        let name_start = cursor;
        while cursor < bytes.len() && !matches!(bytes[cursor], b'=' | b'>' | b'/') && !bytes[cursor].is_ascii_whitespace()
        {
            cursor += 1;
        }
        // A stray `/` or `=` at an attribute position; step over it.
        if cursor == name_start {
            cursor += 1;
            continue;
        }
        let name = String::from_utf8_lossy(&lower[name_start..cursor]).into_owned();
        let mut lookahead = cursor;
        while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }
        let mut value = None;
        if bytes.get(lookahead) == Some(&b'=') {
            lookahead += 1;
            while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
                lookahead += 1;
            }
            match bytes.get(lookahead) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = lookahead + 1;
                    let value_end = memchr(quote, &bytes[value_start..]).map_or(bytes.len(), |end| value_start + end);
                    value = Some(AttrValue {
                        span: value_start..value_end,
                        quote: Some(quote),
                    });
                    cursor = (value_end + 1).min(bytes.len());
                },
                Some(_) => {
                    let value_start = lookahead;
                    let value_end = bytes[value_start..]
                        .iter()
                        .position(|b| b.is_ascii_whitespace() || *b == b'>')
                        .map_or(bytes.len(), |end| value_start + end);
                    value = Some(AttrValue {
                        span: value_start..value_end,
                        quote: None,
                    });
                    cursor = value_end;
                },
                None => cursor = lookahead,
            }
        }
        attrs.push(Attr {
            name,
            outer: outer_start..cursor,
            value,
        });
    }
}

/// Decode the handful of character references that show up in URL-bearing
/// attributes.
pub(crate) fn decode_attr(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Escape a value for writing back inside the given quote character.
pub(crate) fn encode_attr(value: &str, quote: Option<u8>) -> String {
    let value = value.replace('&', "&amp;");
    match quote {
        Some(b'\'') => value.replace('\'', "&#39;"),
        _ => value.replace('"', "&quot;"),
    }
}

/// Accumulates replacements against the original text and applies them in
/// one pass. Ranges must not overlap.
#[derive(Default)]
pub(crate) struct Splice {
    edits: Vec<(Range<usize>, String)>,
}

impl Splice {
    pub fn replace(&mut self, range: Range<usize>, with: impl Into<String>) {
        self.edits.push((range, with.into()));
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at..at, text);
    }

    pub fn remove(&mut self, range: Range<usize>) {
        self.replace(range, String::new());
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(mut self, html: &str) -> String {
        self.edits.sort_by_key(|(range, _)| (range.start, range.end));
        let mut out = String::with_capacity(html.len());
        let mut pos = 0;
        for (range, text) in self.edits {
            if range.start < pos {
                tracing::warn!(start = range.start, end = range.end, "Dropping overlapping edit");
                continue;
            }
            out.push_str(&html[pos..range.start]);
            out.push_str(&text);
            pos = range.end;
        }
        out.push_str(&html[pos..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_and_attributes() {
        let html = r#"<html><head><base href='/a/'><script src="app.js" defer></script></head></html>"#;
        let tags = tags(html);
        let names: Vec<_> = tags.iter().map(|t| (t.name.as_str(), t.closing)).collect();
        assert_eq!(
            names,
            vec![
                ("html", false),
                ("head", false),
                ("base", false),
                ("script", false),
                ("script", true),
                ("head", true),
                ("html", true)
            ]
        );
        let base = &tags[2];
        assert_eq!(base.attr_value(html, "href"), Some("/a/"));
        assert_eq!(base.attr("href").unwrap().value.as_ref().unwrap().quote, Some(b'\''));
        let script = &tags[3];
        assert_eq!(script.attr_value(html, "src"), Some("app.js"));
        assert!(script.attr("defer").unwrap().value.is_none());
        assert_eq!(&html[script.span.clone()], r#"<script src="app.js" defer>"#);
    }

    #[test]
    fn test_case_and_unquoted_values() {
        let html = "<IMG SRC=logo.png ALT = x/>";
        let tags = tags(html);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "img");
        assert_eq!(tags[0].attr_value(html, "src"), Some("logo.png"));
        assert_eq!(tags[0].attr_value(html, "alt"), Some("x/"));
    }

    #[test]
    fn test_raw_text_and_comments_are_skipped() {
        let html = r#"<!DOCTYPE html><!-- <img src="a.png"> --><script>if (a<b) { x = "<img src='b.png'>"; }</script><img src="c.png">"#;
        let tags = tags(html);
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["script", "script", "img"]);
        assert_eq!(tags[2].attr_value(html, "src"), Some("c.png"));
        assert_eq!(&html[tags[0].element_end(html)..], r#"<img src="c.png">"#);
    }

    #[test]
    fn test_unterminated_input_does_not_panic() {
        for html in ["<", "<a", "<a href=", "<a href=\"x", "<script>never closed", "<!-- open", "</"] {
            let _ = tags(html);
        }
    }

    #[test]
    fn test_attribute_outer_span_covers_whitespace() {
        let html = r#"<script src="a.js"  integrity="sha-1"></script>"#;
        let tags = tags(html);
        let outer = tags[0].attr("integrity").unwrap().outer.clone();
        assert_eq!(&html[outer], r#"  integrity="sha-1""#);
    }

    #[test]
    fn test_entities() {
        assert_eq!(decode_attr("a.js?x=1&amp;y=2"), "a.js?x=1&y=2");
        assert_eq!(encode_attr("a.js?x=1&y=2", Some(b'"')), "a.js?x=1&amp;y=2");
        assert_eq!(encode_attr("it's", Some(b'\'')), "it&#39;s");
    }

    #[test]
    fn test_splice() {
        let mut splice = Splice::default();
        splice.insert(5, "!");
        splice.replace(0..1, "J");
        splice.remove(5..11);
        assert_eq!(splice.apply("hello world"), "Jello!");
    }
}
