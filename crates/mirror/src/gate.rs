use crate::Layout;
use tracing::instrument;

/// What the [`VersionGate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The recorded version matched; nothing was touched.
    Intact,
    /// The mirror and rewritten subtrees were emptied and the marker now
    /// holds the current version. `previous` is `None` on first run (or when
    /// the marker was unreadable).
    Reset { previous: Option<String> },
}

/// Keeps on-device content from outliving the manifest version it was
/// downloaded for.
///
/// Never fails. Storage problems are logged and reconciliation carries on
/// with whatever it can do; the worst outcome is an extra full download on
/// the next run.
#[derive(Clone)]
pub struct VersionGate {
    layout: Layout,
}
impl VersionGate {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Compare the stored marker to `current` and wipe stale content on
    /// mismatch. Must run before any precache pass for `current`.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, current: &str) -> Reconciliation {
        let current = current.trim();
        let previous = self.recorded().await;
        if previous.as_deref() == Some(current) {
            tracing::debug!("Mirror matches manifest version");
            return Reconciliation::Intact;
        }
        tracing::info!(previous = ?previous, "Manifest version changed; resetting mirror");
        self.reset(current).await;
        Reconciliation::Reset { previous }
    }

    /// Version recorded by the last successful reset, if any.
    pub async fn recorded(&self) -> Option<String> {
        let storage = self.layout.storage();
        match storage.read(self.layout.marker_path()).await {
            Ok(bytes) => {
                let version = String::from_utf8_lossy(&bytes).trim().to_string();
                (!version.is_empty()).then_some(version)
            },
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                tracing::warn!(error = ?e, "Unable to read version marker; treating as absent");
                None
            },
        }
    }

    /// Empties the whole storage root, scratch files and unknown files
    /// included, then lays out the skeleton again.
    async fn reset(&self, current: &str) {
        let storage = self.layout.storage();
        if let Err(e) = storage.clear().await {
            tracing::warn!(error = ?e, "Unable to clear storage root");
        }
        for dir in [self.layout.mirror_dir(), self.layout.rewritten_dir()] {
            if let Err(e) = storage.create_dir_all(dir).await {
                tracing::warn!(dir = %dir.display(), error = ?e, "Unable to recreate directory");
            }
        }
        if let Err(e) = storage.write(self.layout.marker_path(), current.as_bytes()).await {
            tracing::warn!(error = ?e, "Unable to record manifest version");
        }
    }
}
