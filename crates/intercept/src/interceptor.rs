use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use haven_rewrite::transform::REFERENCE_ATTRIBUTES;
use haven_rewrite::{BootstrapOptions, RewritePolicy, ScriptPolicy, Scripts};
use serde::Serialize;
use url::Url;

/// Global the interceptor sets in the hosted context on first install.
pub const INSTALL_MARKER: &str = "__havenInterceptor";

/// Installation adapter for the runtime half of the rewrite policy.
///
/// The policy itself is [`RewritePolicy::resolve`]; this type only produces
/// the scripts that apply it inside the hosted context. Installing twice
/// into the same context is a no-op after the first time.
#[derive(Debug, Clone)]
pub struct Interceptor {
    policy: RewritePolicy,
    module: String,
    channel: String,
}

#[derive(Serialize)]
struct InterceptorConfig<'a> {
    policy: ScriptPolicy<'a>,
    offline: bool,
    marker: &'static str,
    channel: &'a str,
    attributes: &'static [&'static str],
}

#[derive(Serialize)]
struct AfterLoadConfig<'a> {
    module: &'a str,
    channel: &'a str,
}

impl Interceptor {
    pub fn new(policy: RewritePolicy, bootstrap: &BootstrapOptions) -> Self {
        Self {
            policy,
            module: bootstrap.module.clone(),
            channel: bootstrap.channel.clone(),
        }
    }

    pub fn policy(&self) -> &RewritePolicy {
        &self.policy
    }

    /// What the installed interceptor will do with `request` issued from a
    /// document at `current_document`.
    pub fn resolve(&self, request: &str, current_document: &Url, offline: bool) -> String {
        self.policy.resolve(request, current_document, offline)
    }

    /// Script to run before any page script: installs the interceptor.
    ///
    /// `offline` is baked in at render time; contexts are recreated on every
    /// connectivity change so it never needs updating in place.
    pub fn before_load(&self, offline: bool) -> Result<String> {
        let config = InterceptorConfig {
            policy: self.policy.script_config(),
            offline,
            marker: INSTALL_MARKER,
            channel: &self.channel,
            attributes: &REFERENCE_ATTRIBUTES,
        };
        Scripts::render("interceptor.js", &config).or_raise(|| ErrorKind::Script("interceptor"))
    }

    /// Script to run after each load completes: reports boot diagnostics.
    pub fn after_load(&self) -> Result<String> {
        let config = AfterLoadConfig {
            module: &self.module,
            channel: &self.channel,
        };
        Scripts::render("after-load.js", &config).or_raise(|| ErrorKind::Script("after-load"))
    }
}
