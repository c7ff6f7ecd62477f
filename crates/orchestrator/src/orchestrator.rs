use crate::error::{ErrorKind, Result};
use crate::{ConnectivityReport, ConnectivityState, ContextSpec, EntryPoint, Host};
use exn::ResultExt;
use haven_fetch::FetcherHandle;
use haven_intercept::{DiagnosticEvent, Interceptor};
use haven_mirror::{Layout, ManifestHandle, Precache, PrecacheReport, Reconciliation, VersionGate};
use haven_rewrite::{BootstrapOptions, DEFAULT_TEMPLATE_PATTERN, DocumentRewriter, RewritePolicy, RewrittenDocument};
use haven_storage::BackendHandle;
use tracing::instrument;
use url::Url;

/// How the hosted application is laid out on its origin.
#[derive(Debug, Clone)]
pub struct Settings {
    pub origin: Url,
    pub app_root: String,
    /// Root-relative path of the entry document.
    pub entry: String,
    pub template_pattern: String,
    /// Defaults to `app_root`.
    pub template_root: Option<String>,
    pub bootstrap: BootstrapOptions,
}
impl Settings {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            app_root: "/".to_string(),
            entry: "/index.html".to_string(),
            template_pattern: DEFAULT_TEMPLATE_PATTERN.to_string(),
            template_root: None,
            bootstrap: BootstrapOptions::default(),
        }
    }
}

/// Outcome of one online cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub version: String,
    pub reconciliation: Reconciliation,
    pub precache: PrecacheReport,
    pub document: RewrittenDocument,
}

/// Snapshot of what is on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: ConnectivityState,
    /// Version recorded by the last reset.
    pub version: Option<String>,
    /// Number of files under the mirror subtree.
    pub mirrored: usize,
    pub offline_entry: Option<RewrittenDocument>,
}

/// The connectivity state machine.
///
/// Every operation takes `&mut self`, so a cycle can never start while
/// another one is still running.
pub struct Orchestrator<H> {
    host: H,
    manifests: ManifestHandle,
    layout: Layout,
    gate: VersionGate,
    precache: Precache,
    rewriter: DocumentRewriter,
    interceptor: Interceptor,
    remote_entry: Url,
    local_roots: [Url; 2],
    state: ConnectivityState,
    context: bool,
    offline_entry: Option<RewrittenDocument>,
}

impl<H: Host> Orchestrator<H> {
    pub fn new(
        storage: BackendHandle,
        fetcher: FetcherHandle,
        manifests: ManifestHandle,
        settings: Settings,
        host: H,
    ) -> Result<Self> {
        let layout = Layout::new(storage);
        let mirror_root = layout
            .mirror_root_url()
            .or_raise(|| ErrorKind::Settings("storage has no local identity".to_string()))?;
        let rewritten_root = layout
            .rewritten_root_url()
            .or_raise(|| ErrorKind::Settings("storage has no local identity".to_string()))?;
        let template_root = settings.template_root.as_deref().unwrap_or(&settings.app_root);
        let policy = RewritePolicy::new(settings.origin.clone(), &settings.app_root, mirror_root.clone())
            .and_then(|p| p.with_templates(&settings.template_pattern, template_root))
            .or_raise(|| ErrorKind::Settings("invalid rewrite policy".to_string()))?;
        let remote_entry = settings
            .origin
            .join(&settings.entry)
            .or_raise(|| ErrorKind::Settings(format!("invalid entry: {}", settings.entry)))?;
        let rewriter = DocumentRewriter::new(layout.clone(), policy.clone(), &settings.bootstrap)
            .or_raise(|| ErrorKind::Script)?;
        Ok(Self {
            host,
            manifests,
            gate: VersionGate::new(layout.clone()),
            precache: Precache::new(layout.clone(), fetcher),
            rewriter,
            interceptor: Interceptor::new(policy, &settings.bootstrap),
            layout,
            remote_entry,
            local_roots: [mirror_root, rewritten_root],
            state: ConnectivityState::Unknown,
            context: false,
            offline_entry: None,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn policy(&self) -> &RewritePolicy {
        self.rewriter.policy()
    }

    /// Process start: reconcile the mirror with the current manifest version
    /// and pick up a rewritten document left by an earlier run.
    ///
    /// Without a manifest there is no version to compare against, so the
    /// mirror is trusted as it is.
    #[instrument(skip_all)]
    pub async fn start(&mut self) -> Option<Reconciliation> {
        let reconciliation = match self.manifests.load().await {
            Ok(manifest) => Some(self.gate.reconcile(&manifest.version).await),
            Err(e) => {
                tracing::warn!(error = ?e, "Manifest unavailable at start; keeping the existing mirror");
                None
            },
        };
        self.offline_entry = self.rewriter.stored().await;
        if let Some(document) = &self.offline_entry {
            tracing::info!(url = %document.url, "Found offline entry point");
        }
        reconciliation
    }

    /// Fold a connectivity report into the state machine.
    ///
    /// A change of state recreates the hosted context. Entering online also
    /// refreshes the mirror; a failed refresh is logged and the previous
    /// offline entry point stays in place.
    #[instrument(skip_all, fields(connected = report.connected, reachable = ?report.reachable))]
    pub async fn handle(&mut self, report: ConnectivityReport) -> Result<EntryPoint> {
        let next = report.state();
        if next == self.state {
            return Ok(self.entry_point());
        }
        tracing::info!(from = ?self.state, to = ?next, "Connectivity changed");
        self.state = next;
        let created = self.recreate_context().await;
        if next == ConnectivityState::Online {
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    version = %report.version,
                    downloaded = report.precache.downloaded,
                    cached = report.precache.cached,
                    failed = report.precache.failed.len(),
                    "Offline mirror refreshed"
                ),
                Err(e) => tracing::warn!(error = ?e, "Offline refresh failed; keeping previous entry point"),
            }
        }
        created?;
        Ok(self.entry_point())
    }

    /// Manifest, version gate, precache and rewrite, in that order.
    #[instrument(skip_all)]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let manifest = self.manifests.load().await.or_raise(|| ErrorKind::Manifest)?;
        let reconciliation = self.gate.reconcile(&manifest.version).await;
        if matches!(reconciliation, Reconciliation::Reset { .. }) {
            self.offline_entry = None;
        }
        let precache = self.precache.run(&manifest).await;
        let document = self
            .rewriter
            .rewrite_entry(&manifest, &precache.url_map)
            .await
            .or_raise(|| ErrorKind::Rewrite)?;
        self.offline_entry = Some(document.clone());
        Ok(CycleReport {
            version: manifest.version,
            reconciliation,
            precache,
            document,
        })
    }

    pub fn entry_point(&self) -> EntryPoint {
        match self.state {
            ConnectivityState::Unknown => EntryPoint::Pending,
            ConnectivityState::Online => EntryPoint::Remote(self.remote_entry.clone()),
            ConnectivityState::Offline => match &self.offline_entry {
                Some(document) => EntryPoint::Local(document.url.clone()),
                None => EntryPoint::Unavailable,
            },
        }
    }

    /// Top-level navigation callback. Offline, only local documents under
    /// the mirror or rewritten roots may load.
    pub fn allow_navigation(&self, url: &Url) -> bool {
        if self.state != ConnectivityState::Offline {
            return true;
        }
        let allowed = self.local_roots.iter().any(|root| is_within(url, root));
        if !allowed {
            tracing::warn!(url = %url, "Blocked navigation while offline");
        }
        allowed
    }

    /// Diagnostic channel sink. Never fails.
    pub fn on_message(&self, raw: &str) -> DiagnosticEvent {
        let event = DiagnosticEvent::parse(raw);
        event.emit();
        event
    }

    pub async fn status(&self) -> Status {
        let mirrored = match self.layout.storage().list(Some(self.layout.mirror_dir())).await {
            Ok(files) => files.len(),
            Err(e) if e.is_not_found() => 0,
            Err(e) => {
                tracing::warn!(error = ?e, "Unable to list mirror");
                0
            },
        };
        Status {
            state: self.state,
            version: self.gate.recorded().await,
            mirrored,
            offline_entry: self.offline_entry.clone(),
        }
    }

    async fn recreate_context(&mut self) -> Result<()> {
        if std::mem::take(&mut self.context) {
            self.host.destroy_context().await;
        }
        let offline = self.state == ConnectivityState::Offline;
        let spec = ContextSpec {
            entry: self.entry_point(),
            before_load: self.interceptor.before_load(offline).or_raise(|| ErrorKind::Script)?,
            after_load: self.interceptor.after_load().or_raise(|| ErrorKind::Script)?,
            offline,
        };
        self.host.create_context(spec).await?;
        self.context = true;
        Ok(())
    }
}

fn is_within(url: &Url, root: &Url) -> bool {
    url.scheme() == "file" && url.host() == root.host() && url.path().starts_with(root.path())
}
