//! One-directional messages from the hosted context.
//!
//! In-page scripts post JSON objects tagged by `kind`. Nothing is ever sent
//! back, so a message that doesn't parse is kept verbatim rather than
//! rejected.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
    /// Plain `console.log`, and any level this build doesn't know.
    #[serde(other)]
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// A `<script>`, `<link>` or `<img>` failed to load.
    ResourceLoadFailure { tag: String, source: String },
    /// Echo of a console call.
    Console { level: ConsoleLevel, message: String },
    UncaughtError {
        message: String,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        line: Option<u32>,
        #[serde(default)]
        column: Option<u32>,
    },
    UnhandledRejection { reason: String },
    RequestRewritten { from: String, to: String },
    /// Transport failure (status `0`) or an HTTP status of 400 or above.
    RequestFailed { status: u16, url: String },
    BlockedNavigation { url: String },
    /// Framework state once loading finished.
    Boot {
        injector: bool,
        forced_bootstrap: bool,
        pending_requests: u32,
    },
    #[serde(skip)]
    Unrecognized { raw: String },
}

impl DiagnosticEvent {
    /// Parse a raw channel message. Never fails.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self::Unrecognized { raw: raw.to_string() })
    }

    /// Whether the event points at something the user will notice.
    pub fn is_failure(&self) -> bool {
        match self {
            Self::ResourceLoadFailure { .. }
            | Self::UncaughtError { .. }
            | Self::UnhandledRejection { .. }
            | Self::RequestFailed { .. } => true,
            Self::Console { level, .. } => *level == ConsoleLevel::Error,
            Self::Boot { injector, .. } => !injector,
            Self::RequestRewritten { .. } | Self::BlockedNavigation { .. } | Self::Unrecognized { .. } => false,
        }
    }

    /// Re-emit through `tracing` at a level matching the kind.
    pub fn emit(&self) {
        match self {
            Self::ResourceLoadFailure { tag, source } => {
                tracing::warn!(target: "haven::page", tag = %tag, source = %source, "Resource failed to load")
            },
            Self::Console { level, message } => match level {
                ConsoleLevel::Error => tracing::error!(target: "haven::page", "{message}"),
                ConsoleLevel::Warn => tracing::warn!(target: "haven::page", "{message}"),
                ConsoleLevel::Info => tracing::info!(target: "haven::page", "{message}"),
                ConsoleLevel::Log | ConsoleLevel::Debug => tracing::debug!(target: "haven::page", "{message}"),
            },
            Self::UncaughtError {
                message,
                source,
                line,
                column,
            } => tracing::error!(
                target: "haven::page",
                source = ?source,
                line = ?line,
                column = ?column,
                "Uncaught error: {message}"
            ),
            Self::UnhandledRejection { reason } => {
                tracing::error!(target: "haven::page", "Unhandled rejection: {reason}")
            },
            Self::RequestRewritten { from, to } => {
                tracing::debug!(target: "haven::page", from = %from, to = %to, "Request rewritten")
            },
            Self::RequestFailed { status, url } => {
                tracing::warn!(target: "haven::page", status, url = %url, "Request failed")
            },
            Self::BlockedNavigation { url } => {
                tracing::warn!(target: "haven::page", url = %url, "Navigation blocked")
            },
            Self::Boot {
                injector,
                forced_bootstrap,
                pending_requests,
            } => match injector {
                true => tracing::info!(
                    target: "haven::page",
                    forced_bootstrap,
                    pending_requests,
                    "Framework booted"
                ),
                false => tracing::warn!(target: "haven::page", forced_bootstrap, "Framework has no injector"),
            },
            Self::Unrecognized { raw } => tracing::debug!(target: "haven::page", raw = %raw, "Unrecognized message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        r#"{"kind":"resource_load_failure","tag":"script","source":"file:///m/a/app.js"}"#,
        DiagnosticEvent::ResourceLoadFailure { tag: "script".into(), source: "file:///m/a/app.js".into() }
    )]
    #[case(
        r#"{"kind":"console","level":"warn","message":"careful"}"#,
        DiagnosticEvent::Console { level: ConsoleLevel::Warn, message: "careful".into() }
    )]
    #[case(
        r#"{"kind":"console","level":"trace","message":"odd"}"#,
        DiagnosticEvent::Console { level: ConsoleLevel::Log, message: "odd".into() }
    )]
    #[case(
        r#"{"kind":"console","level":"log","message":"hi"}"#,
        DiagnosticEvent::Console { level: ConsoleLevel::Log, message: "hi".into() }
    )]
    #[case(
        r#"{"kind":"console","level":"error","message":"bad"}"#,
        DiagnosticEvent::Console { level: ConsoleLevel::Error, message: "bad".into() }
    )]
    #[case(
        r#"{"kind":"uncaught_error","message":"boom","source":null,"line":3,"column":null}"#,
        DiagnosticEvent::UncaughtError { message: "boom".into(), source: None, line: Some(3), column: None }
    )]
    #[case(
        r#"{"kind":"request_failed","status":404,"url":"https://x/api/list"}"#,
        DiagnosticEvent::RequestFailed { status: 404, url: "https://x/api/list".into() }
    )]
    #[case(
        r#"{"kind":"boot","injector":true,"forced_bootstrap":false,"pending_requests":2}"#,
        DiagnosticEvent::Boot { injector: true, forced_bootstrap: false, pending_requests: 2 }
    )]
    fn test_parse(#[case] raw: &str, #[case] expected: DiagnosticEvent) {
        assert_eq!(DiagnosticEvent::parse(raw), expected);
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"kind":"teleport"}"#)]
    #[case(r#"{"kind":"request_failed","status":"nope"}"#)]
    fn test_unrecognized(#[case] raw: &str) {
        assert_eq!(DiagnosticEvent::parse(raw), DiagnosticEvent::Unrecognized { raw: raw.to_string() });
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let event = DiagnosticEvent::BlockedNavigation {
            url: "https://x/logout".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "blocked_navigation");
        assert!(!event.is_failure());
        assert!(DiagnosticEvent::RequestFailed { status: 0, url: String::new() }.is_failure());
    }
}
