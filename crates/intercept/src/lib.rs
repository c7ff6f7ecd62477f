//! Runtime half of the offline rewrite.
//!
//! Page code keeps issuing requests long after the entry document was
//! rewritten. [`Interceptor`] produces the scripts a hosted context runs to
//! route those requests through the same [`RewritePolicy`] the document
//! rewriter uses, and [`DiagnosticEvent`] is what those scripts report back.

mod diagnostics;
pub mod error;
mod interceptor;

pub use crate::diagnostics::{ConsoleLevel, DiagnosticEvent};
pub use crate::interceptor::{INSTALL_MARKER, Interceptor};
pub use haven_rewrite::RewritePolicy;
