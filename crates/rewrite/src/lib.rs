//! Turns the mirrored entry document into one that runs from local storage.
//!
//! [`RewritePolicy`] is the single rule for where a reference should point
//! when offline. [`DocumentRewriter`] applies it to the entry document ahead
//! of time; the runtime interceptor applies the same policy to requests the
//! running page makes later.

pub mod error;
mod policy;
mod rewriter;
mod scan;
mod script;
pub mod transform;

pub use crate::policy::{DEFAULT_TEMPLATE_PATTERN, RewritePolicy, ScriptPolicy};
pub use crate::rewriter::{DocumentRewriter, RewrittenDocument};
pub use crate::script::{Scripts, json_literal};
pub use crate::transform::{BOOTSTRAP_MARKER, BootstrapOptions, CannedResponse};
