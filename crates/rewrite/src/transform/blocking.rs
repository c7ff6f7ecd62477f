use super::{RewriteContext, Transform};
use crate::scan::{Splice, decode_attr, tags};

/// Attributes that make the browser refuse resources served from local
/// storage.
const BLOCKING_ATTRIBUTES: [&str; 2] = ["integrity", "crossorigin"];

/// Removes content-security-policy `<meta>` declarations and subresource
/// integrity / CORS attributes.
pub struct StripBlocking;

impl Transform for StripBlocking {
    fn name(&self) -> &'static str {
        "strip-blocking"
    }

    fn apply(&self, html: &str, _context: &RewriteContext<'_>) -> String {
        let mut splice = Splice::default();
        for tag in tags(html).iter().filter(|t| !t.closing) {
            if tag.name == "meta"
                && tag
                    .attr_value(html, "http-equiv")
                    .is_some_and(|v| decode_attr(v).trim().to_ascii_lowercase().starts_with("content-security-policy"))
            {
                splice.remove(tag.span.clone());
                continue;
            }
            for attr in tag.attrs.iter().filter(|a| BLOCKING_ATTRIBUTES.contains(&a.name.as_str())) {
                splice.remove(attr.outer.clone());
            }
        }
        if splice.is_empty() {
            return html.to_string();
        }
        splice.apply(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RewritePolicy;
    use haven_mirror::UrlMap;
    use rstest::rstest;
    use url::Url;

    #[rstest]
    #[case(
        r#"<head><meta http-equiv="Content-Security-Policy" content="default-src 'self'"><title>t</title></head>"#,
        "<head><title>t</title></head>"
    )]
    #[case(
        r#"<head><META HTTP-EQUIV='content-security-policy-report-only' CONTENT="x"></head>"#,
        "<head></head>"
    )]
    #[case(
        r#"<head><meta http-equiv="refresh" content="5"></head>"#,
        r#"<head><meta http-equiv="refresh" content="5"></head>"#
    )]
    #[case(
        r#"<script src="/a/app.js" integrity="sha384-abc" crossorigin="anonymous" defer></script>"#,
        r#"<script src="/a/app.js" defer></script>"#
    )]
    #[case(
        r#"<link rel=stylesheet href=/a/app.css crossorigin>"#,
        r#"<link rel=stylesheet href=/a/app.css>"#
    )]
    fn test_strip_blocking(#[case] input: &str, #[case] expected: &str) {
        let policy = RewritePolicy::new(Url::parse("https://x").unwrap(), "/", Url::parse("file:///m/").unwrap())
            .unwrap();
        let document_url = Url::parse("https://x/index.html").unwrap();
        let url_map = UrlMap::new();
        let context = RewriteContext {
            document_url: &document_url,
            url_map: &url_map,
            policy: &policy,
        };
        let once = StripBlocking.apply(input, &context);
        assert_eq!(once, expected);
        assert_eq!(StripBlocking.apply(&once, &context), once);
    }
}
