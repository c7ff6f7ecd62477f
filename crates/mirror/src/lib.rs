//! The local mirror of a hosted application's static assets.
//!
//! Everything persisted lives under one storage root:
//!
//! ```text
//! <root>/
//! ├── VERSION            version marker; the mirror is valid iff it matches
//! ├── mirror/            one file per manifest entry, at its root-relative path
//! └── rewritten/
//!     └── index.html     offline-runnable entry document
//! ```
//!
//! [`VersionGate`] decides whether the existing tree can be trusted,
//! [`Precache`] fills `mirror/` from a [`Manifest`] and hands back the
//! [`UrlMap`] the rewriter needs.

pub mod error;
mod gate;
mod layout;
mod manifest;
mod precache;
mod urlmap;

pub use crate::gate::{Reconciliation, VersionGate};
pub use crate::layout::{Layout, MIRROR_DIR, REWRITTEN_DIR, REWRITTEN_ENTRY, VERSION_MARKER};
pub use crate::manifest::{Manifest, ManifestHandle, ManifestSource, RemoteManifest, StaticManifest};
pub use crate::precache::{Precache, PrecacheFailure, PrecacheReport};
pub use crate::urlmap::{LocalAsset, UrlMap};
