use super::{RewriteContext, Transform, first, head_insertion_point};
use crate::scan::{Splice, encode_attr, tags};

/// Points the document's `<base>` at the application root under the network
/// origin, so anything the reference rewriter leaves alone still resolves
/// sensibly. Only the first `<base>` counts, as in browsers.
pub struct BaseHref;

impl Transform for BaseHref {
    fn name(&self) -> &'static str {
        "base-href"
    }

    fn apply(&self, html: &str, context: &RewriteContext<'_>) -> String {
        let tags = tags(html);
        let target = context.policy.app_base().as_str();
        let mut splice = Splice::default();
        match first(&tags, "base") {
            Some(base) => match base.attr("href") {
                Some(href) => match &href.value {
                    Some(value) => splice.replace(value.span.clone(), encode_attr(target, value.quote)),
                    None => splice.replace(href.outer.clone(), format!(r#" href="{}""#, encode_attr(target, None))),
                },
                None => splice.insert(base.name_end, format!(r#" href="{}""#, encode_attr(target, None))),
            },
            None => splice.insert(
                head_insertion_point(&tags),
                format!(r#"<base href="{}">"#, encode_attr(target, None)),
            ),
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
        r#"<html><head><base href="/"><title>t</title></head></html>"#,
        r#"<html><head><base href="https://x/a/"><title>t</title></head></html>"#
    )]
    #[case(
        "<html><head><BASE target=_self HREF='https://x/'></head></html>",
        "<html><head><BASE target=_self HREF='https://x/a/'></head></html>"
    )]
    #[case(
        "<html><head><base target=_self></head></html>",
        r#"<html><head><base href="https://x/a/" target=_self></head></html>"#
    )]
    #[case(
        "<html><head><base href></head></html>",
        r#"<html><head><base href="https://x/a/"></head></html>"#
    )]
    #[case(
        r#"<html lang="en"><head data-x="1"><meta charset="utf-8"></head></html>"#,
        r#"<html lang="en"><head data-x="1"><base href="https://x/a/"><meta charset="utf-8"></head></html>"#
    )]
    #[case("<html><body></body></html>", r#"<html><base href="https://x/a/"><body></body></html>"#)]
    #[case("<p>fragment</p>", r#"<base href="https://x/a/"><p>fragment</p>"#)]
    fn test_base_href(#[case] input: &str, #[case] expected: &str) {
        let policy = RewritePolicy::new(Url::parse("https://x").unwrap(), "/a/", Url::parse("file:///m/").unwrap())
            .unwrap();
        let document_url = Url::parse("https://x/a/index.html").unwrap();
        let url_map = UrlMap::new();
        let context = RewriteContext {
            document_url: &document_url,
            url_map: &url_map,
            policy: &policy,
        };
        let once = BaseHref.apply(input, &context);
        assert_eq!(once, expected);
        assert_eq!(BaseHref.apply(&once, &context), once);
    }
}
