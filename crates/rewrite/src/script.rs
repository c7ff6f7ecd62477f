//! Embedded in-page scripts.
//!
//! Scripts live in `assets/scripts/` and are compiled into the binary. Each
//! is an [`upon`] template taking a single `config` value: a JSON object
//! literal. Keeping every injected value inside one JSON blob means nothing
//! configurable is ever spliced into script source as raw text.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use serde::Serialize;
use std::borrow::Cow;
use upon::Engine;

#[derive(Embed)]
#[folder = "../../assets/scripts/"]
pub struct Scripts;
impl Scripts {
    /// Raw template source of an embedded script.
    pub fn load(name: impl AsRef<str>) -> Result<Cow<'static, [u8]>> {
        Self::get(name.as_ref()).map(|f| f.data).ok_or_raise(|| ErrorKind::Script(name.as_ref().to_string()))
    }

    /// Names of all embedded scripts.
    pub fn list() -> Vec<Cow<'static, str>> {
        Self::iter().filter(|f| f.ends_with(".js")).collect()
    }

    /// Render an embedded script with `config` as its JSON configuration.
    pub fn render(name: impl AsRef<str>, config: &impl Serialize) -> Result<String> {
        let name = name.as_ref();
        let source = Self::load(name)?;
        let source = String::from_utf8_lossy(&source).into_owned();
        let config = json_literal(config).or_raise(|| ErrorKind::Script(name.to_string()))?;
        let engine = Engine::new();
        let template = engine.compile(source).or_raise(|| ErrorKind::Script(name.to_string()))?;
        template
            .render(&engine, upon::value! { config: config })
            .to_string()
            .or_raise(|| ErrorKind::Script(name.to_string()))
    }
}

/// JSON that is also safe to place inside an HTML `<script>` element.
pub fn json_literal(value: &impl Serialize) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bootstrap_is_embedded() {
        assert!(Scripts::list().iter().any(|s| s == "bootstrap.js"));
        assert!(!Scripts::load("bootstrap.js").unwrap().is_empty());
        assert!(Scripts::load("missing.js").is_err());
    }

    #[test]
    fn test_json_literal_cannot_close_script() {
        let literal = json_literal(&json!({ "body": "</script><script>alert(1)</script>" })).unwrap();
        assert!(!literal.contains("</"));
        let parsed: serde_json::Value = serde_json::from_str(&literal).unwrap();
        assert_eq!(parsed["body"], "</script><script>alert(1)</script>");
    }

    #[test]
    fn test_render_substitutes_config() {
        let rendered = Scripts::render("bootstrap.js", &json!({ "marker": "probe-value" })).unwrap();
        assert!(rendered.contains(r#"{"marker":"probe-value"}"#));
        assert!(!rendered.contains("{{"));
    }
}
