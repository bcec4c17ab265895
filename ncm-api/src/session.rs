//! Client session: cookie jar plus network settings.
//!
//! Every call reads a snapshot of the session to build its request options,
//! and every completed call folds the upstream `Set-Cookie` pairs back in.
//! Both happen under one mutex, so concurrent calls never lose an update.
//!
//! The cookie jar can be persisted to `~/.config/ncm-api/session.json`.
//! Network settings stay in memory and apply to the current process only.
//!
//! ```json
//! {
//!   "cookies": { "MUSIC_U": "00AABBCC...", "__csrf": "..." }
//! }
//! ```

use crate::error::{NeteaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Proxy / client-IP / HTTP-downgrade settings. Only the session sets these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Proxy URL, e.g. `http://127.0.0.1:8080`.
    pub proxy: Option<String>,
    /// Sent as `X-Real-IP` when set.
    pub real_ip: Option<String>,
    /// Downgrade `https://` URLs to `http://`.
    pub use_http: bool,
}

/// Point-in-time copy of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Never written to disk.
    #[serde(skip)]
    pub network: NetworkSettings,
}

/// Shared mutable client state.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// Empty jar, direct HTTPS connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded from a saved or hand-built state.
    pub fn from_state(state: SessionState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detached copy of cookies and network settings.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.lock().cookies.clone()
    }

    /// Current value of one cookie.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.lock().cookies.get(name).cloned()
    }

    pub fn network(&self) -> NetworkSettings {
        self.lock().network.clone()
    }

    /// Set one cookie, replacing any previous value.
    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().cookies.insert(name.into(), value.into());
    }

    /// Fold response cookies into the jar, last write wins per name.
    pub fn store_cookies<I>(&self, cookies: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut state = self.lock();
        let mut n = 0usize;
        for (name, value) in cookies {
            state.cookies.insert(name, value);
            n += 1;
        }
        tracing::trace!(stored = n, total = state.cookies.len(), "folded response cookies");
    }

    /// Drop every cookie; network settings are kept.
    pub fn reset_cookies(&self) {
        self.lock().cookies.clear();
    }

    /// Route calls through `proxy`, or connect directly with `None`.
    pub fn set_proxy(&self, proxy: Option<String>) {
        self.lock().network.proxy = proxy;
    }

    /// Client IP sent as `X-Real-IP`.
    pub fn set_real_ip(&self, ip: Option<String>) {
        self.lock().network.real_ip = ip;
    }

    /// Downgrade `https://` URLs to `http://`.
    pub fn set_use_http(&self, use_http: bool) {
        self.lock().network.use_http = use_http;
    }

    /// Whether a `MUSIC_U` cookie is present (does not validate it).
    pub fn is_logged_in(&self) -> bool {
        self.lock()
            .cookies
            .get("MUSIC_U")
            .is_some_and(|u| !u.is_empty())
    }

    /// Load the session from `~/.config/ncm-api/session.json`.
    ///
    /// Returns an empty session if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Save the cookie jar to disk, creating parent directories if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(Self::from_state(serde_json::from_str(&data)?))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Delete the saved session file.
    pub fn clear_saved() -> Result<()> {
        let path = Self::path()?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn path() -> Result<PathBuf> {
        let config = dirs::config_dir()
            .ok_or_else(|| NeteaseError::Other("cannot determine config directory".into()))?;
        Ok(config.join("ncm-api").join("session.json"))
    }
}
