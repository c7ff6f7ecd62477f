use super::{RewriteContext, Transform};
use crate::scan::{Splice, decode_attr, encode_attr, tags};

/// Attributes holding a single URL.
pub const REFERENCE_ATTRIBUTES: [&str; 7] = ["src", "href", "data-src", "poster", "action", "formaction", "background"];

/// Points URL-bearing attributes at the mirror.
///
/// `<base>` is exempt: its `href` deliberately stays on the network origin.
/// Only the attribute value changes; its quoting is kept as written.
pub struct RewriteReferences;

impl Transform for RewriteReferences {
    fn name(&self) -> &'static str {
        "references"
    }

    fn apply(&self, html: &str, context: &RewriteContext<'_>) -> String {
        let mut splice = Splice::default();
        let mut rewritten = 0usize;
        for tag in tags(html).iter().filter(|t| !t.closing && t.name != "base") {
            for attr in tag.attrs.iter().filter(|a| REFERENCE_ATTRIBUTES.contains(&a.name.as_str())) {
                let Some(value) = &attr.value else {
                    continue;
                };
                let raw = decode_attr(&html[value.span.clone()]);
                let Some(local) = context.policy.map_reference(&raw, context.document_url, Some(context.url_map)) else {
                    continue;
                };
                tracing::trace!(tag = %tag.name, from = %raw, to = %local, "Rewriting reference");
                splice.replace(value.span.clone(), encode_attr(local.as_str(), value.quote));
                rewritten += 1;
            }
        }
        tracing::debug!(rewritten, "Rewrote document references");
        splice.apply(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RewritePolicy;
    use haven_mirror::{LocalAsset, UrlMap};
    use rstest::rstest;
    use std::path::PathBuf;
    use url::Url;

    fn rewrite(input: &str) -> String {
        let policy =
            RewritePolicy::new(Url::parse("https://x").unwrap(), "/a/", Url::parse("file:///m/").unwrap()).unwrap();
        let document_url = Url::parse("https://x/a/index.html").unwrap();
        let mut url_map = UrlMap::new();
        url_map.insert(
            &Url::parse("https://x/a/app.js").unwrap(),
            LocalAsset {
                path: PathBuf::from("mirror/a/app.js"),
                url: Url::parse("file:///m/a/app.js").unwrap(),
            },
        );
        let context = RewriteContext {
            document_url: &document_url,
            url_map: &url_map,
            policy: &policy,
        };
        let once = RewriteReferences.apply(input, &context);
        assert_eq!(RewriteReferences.apply(&once, &context), once, "rewriting must be idempotent");
        once
    }

    #[rstest]
    #[case(r#"<script src="/a/app.js"></script>"#, r#"<script src="file:///m/a/app.js"></script>"#)]
    #[case(r#"<script src='app.js?v=2'></script>"#, r#"<script src='file:///m/a/app.js'></script>"#)]
    #[case(r#"<img data-src=img/logo.png alt="">"#, r#"<img data-src=file:///m/a/img/logo.png alt="">"#)]
    #[case(
        r#"<div ng-include="'views/nav.html'"></div><a href="views/help.html">?</a>"#,
        r#"<div ng-include="'views/nav.html'"></div><a href="file:///m/a/views/help.html">?</a>"#
    )]
    #[case(
        r#"<link rel="stylesheet" href="https://cdn.example/lib.css">"#,
        r#"<link rel="stylesheet" href="https://cdn.example/lib.css">"#
    )]
    #[case(r##"<a href="#top">top</a>"##, r##"<a href="#top">top</a>"##)]
    #[case(r#"<a href="mailto:ops@x">mail</a>"#, r#"<a href="mailto:ops@x">mail</a>"#)]
    #[case(r#"<base href="https://x/a/">"#, r#"<base href="https://x/a/">"#)]
    #[case(
        r#"<form action="/a/save?x=1&amp;y=2"><button formaction="/a/alt">go</button></form>"#,
        r#"<form action="file:///m/a/save"><button formaction="file:///m/a/alt">go</button></form>"#
    )]
    #[case(
        r#"<video poster="/a/p.jpg" src="/a/v.mp4" controls></video>"#,
        r#"<video poster="file:///m/a/p.jpg" src="file:///m/a/v.mp4" controls></video>"#
    )]
    #[case(
        r#"<script>var s = "<img src='/a/x.png'>";</script>"#,
        r#"<script>var s = "<img src='/a/x.png'>";</script>"#
    )]
    fn test_references(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite(input), expected);
    }
}
