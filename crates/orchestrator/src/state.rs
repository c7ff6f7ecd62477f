use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// What the connectivity observer publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub connected: bool,
    /// Whether the internet is actually reachable, when the observer knows.
    pub reachable: Option<bool>,
}
impl ConnectivityReport {
    pub fn online() -> Self {
        Self {
            connected: true,
            reachable: Some(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            connected: false,
            reachable: None,
        }
    }

    /// Connected counts as online unless reachability is known to be false
    /// (captive portals, dead uplinks).
    pub fn state(&self) -> ConnectivityState {
        match (self.connected, self.reachable) {
            (true, Some(false)) | (false, _) => ConnectivityState::Offline,
            (true, _) => ConnectivityState::Online,
        }
    }
}

/// What the hosted execution context should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Connectivity not known yet; nothing to load.
    Pending,
    /// The network entry document, bypassing the mirror entirely.
    Remote(Url),
    /// The rewritten entry document on the device.
    Local(Url),
    /// Offline with no rewritten document ever produced. The host should
    /// show [`placeholder`](crate::placeholder).
    Unavailable,
}
impl EntryPoint {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Remote(url) | Self::Local(url) => Some(url),
            Self::Pending | Self::Unavailable => None,
        }
    }
}
