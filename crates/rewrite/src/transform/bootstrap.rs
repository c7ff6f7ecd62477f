use super::{RewriteContext, Transform, first, head_insertion_point};
use crate::RewritePolicy;
use crate::error::Result;
use crate::policy::ScriptPolicy;
use crate::scan::{Splice, tags};
use crate::script::Scripts;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Attribute identifying the injected bootstrap script.
pub const BOOTSTRAP_MARKER: &str = "data-haven-bootstrap";

/// A response served in place of a data endpoint the application calls while
/// starting up, so first paint doesn't wait on the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannedResponse {
    pub method: String,
    /// Regular expression matched against the request URL.
    pub url: String,
    #[serde(default = "CannedResponse::default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}
impl CannedResponse {
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status: Self::default_status(),
            body,
        }
    }

    fn default_status() -> u16 {
        200
    }
}

/// Knobs for the compatibility bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapOptions {
    /// Name of the framework module the bootstrap registers.
    pub module: String,
    /// Global the in-page scripts post diagnostics through.
    pub channel: String,
    pub canned: Vec<CannedResponse>,
    /// Flags seeded onto the framework's root scope before first render.
    pub root_scope: Map<String, Value>,
    pub poll_interval_ms: u32,
    pub poll_attempts: u32,
}
impl Default for BootstrapOptions {
    fn default() -> Self {
        let root_scope = json!({ "offline": true, "appReady": true, "currentUser": {} });
        Self {
            module: "havenOffline".to_string(),
            channel: "havenBridge".to_string(),
            canned: vec![
                CannedResponse::new("GET", r"/api/(?:users?/)?(?:me|current)(?:[/?#]|$)", json!({})),
                CannedResponse::new("POST", r"/api/locations?(?:/save)?(?:[/?#]|$)", json!({ "saved": false })),
                CannedResponse::new("GET", r"/api/[^?#]*/(?:list|lookup)(?:[/?#]|$)", json!([])),
            ],
            root_scope: match root_scope {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            poll_interval_ms: 50,
            poll_attempts: 200,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BootstrapConfig<'a> {
    policy: ScriptPolicy<'a>,
    module: &'a str,
    channel: &'a str,
    canned: &'a [CannedResponse],
    root_scope: &'a Map<String, Value>,
    poll_interval: u32,
    poll_attempts: u32,
}

/// Inserts the compatibility bootstrap straight after `<base>`.
///
/// The script is rendered once at construction. An already injected script
/// (found by [`BOOTSTRAP_MARKER`]) is replaced in place rather than
/// duplicated.
pub struct InjectBootstrap {
    element: String,
}
impl InjectBootstrap {
    pub fn new(options: &BootstrapOptions, policy: &RewritePolicy) -> Result<Self> {
        let config = BootstrapConfig {
            policy: policy.script_config(),
            module: &options.module,
            channel: &options.channel,
            canned: &options.canned,
            root_scope: &options.root_scope,
            poll_interval: options.poll_interval_ms,
            poll_attempts: options.poll_attempts,
        };
        let script = Scripts::render("bootstrap.js", &config)?;
        Ok(Self {
            element: format!("<script {BOOTSTRAP_MARKER}>\n{}</script>", script),
        })
    }

    pub fn element(&self) -> &str {
        &self.element
    }
}

impl Transform for InjectBootstrap {
    fn name(&self) -> &'static str {
        "bootstrap"
    }

    fn apply(&self, html: &str, _context: &RewriteContext<'_>) -> String {
        let tags = tags(html);
        let mut splice = Splice::default();
        let existing = tags.iter().find(|t| t.is("script") && t.attr(BOOTSTRAP_MARKER).is_some());
        match existing {
            Some(script) => {
                let range = script.span.start..script.element_end(html);
                if html[range.clone()] != self.element {
                    splice.replace(range, self.element.as_str());
                }
            },
            None => {
                let at = first(&tags, "base").map_or_else(|| head_insertion_point(&tags), |base| base.span.end);
                splice.insert(at, self.element.as_str());
            },
        }
        splice.apply(html)
    }
}
