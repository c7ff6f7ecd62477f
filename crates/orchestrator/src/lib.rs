//! Sequences the offline mirror around connectivity changes.
//!
//! The [`Orchestrator`] owns every component and is driven by
//! [`ConnectivityReport`]s from the outside world:
//!
//! ```text
//! Unknown ──▶ Online ◀──▶ Offline
//!               │
//!               └─ manifest ▶ version gate ▶ precache ▶ rewrite
//! ```
//!
//! Each transition tears down the hosted context and creates a fresh one
//! through the [`Host`].

pub mod error;
mod host;
mod orchestrator;
mod placeholder;
mod state;

pub use crate::host::{ContextSpec, Host};
pub use crate::orchestrator::{CycleReport, Orchestrator, Settings, Status};
pub use crate::placeholder::placeholder;
pub use crate::state::{ConnectivityReport, ConnectivityState, EntryPoint};
