//! Poll-profile detection for the bridge root's filesystem.
//!
//! The bridge never uses OS file-watch APIs; it polls. On conventional
//! local filesystems a short interval is fine, but on filesystems that
//! bridge two OS kernels (WSL's drvfs mounts of Windows drives, Windows
//! `\\wsl$` shares into a WSL distro) metadata propagation is slow
//! enough that a short interval just burns CPU while still observing
//! stale directory listings. The profile is detected once per session
//! and applied to every poll loop.

use std::path::Path;
use std::time::Duration;

use crate::constants::{POLL_INTERVAL_BRIDGED, POLL_INTERVAL_LOCAL};

/// Polling profile for a bridge root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollProfile {
    /// Conventional local filesystem.
    Local,
    /// Filesystem crossing an OS-kernel boundary (WSL <-> Windows).
    Bridged,
}

impl PollProfile {
    /// Detect the profile for a bridge root.
    ///
    /// Inside WSL, a root under `/mnt/<drive>` is a drvfs mount of a
    /// Windows drive. On Windows, a root under `\\wsl$` or
    /// `\\wsl.localhost` is a share into a WSL distro. Everything else
    /// is treated as local.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsbridge::platform::PollProfile;
    /// use std::path::Path;
    ///
    /// // A plain temp directory is a local filesystem.
    /// let profile = PollProfile::detect(Path::new("/tmp/bridge"));
    /// # let _ = profile;
    /// ```
    pub fn detect(root: &Path) -> Self {
        if cfg!(windows) {
            let lossy = root.to_string_lossy();
            if lossy.starts_with("\\\\wsl$") || lossy.starts_with("\\\\wsl.localhost") {
                return Self::Bridged;
            }
            return Self::Local;
        }

        if running_under_wsl() && root.starts_with("/mnt") {
            return Self::Bridged;
        }

        Self::Local
    }

    /// The poll interval for this profile.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsbridge::platform::PollProfile;
    /// use std::time::Duration;
    ///
    /// assert_eq!(PollProfile::Local.poll_interval(), Duration::from_millis(50));
    /// assert_eq!(PollProfile::Bridged.poll_interval(), Duration::from_millis(150));
    /// ```
    pub fn poll_interval(&self) -> Duration {
        match self {
            Self::Local => POLL_INTERVAL_LOCAL,
            Self::Bridged => POLL_INTERVAL_BRIDGED,
        }
    }
}

/// Whether the current process is running inside WSL.
fn running_under_wsl() -> bool {
    if std::env::var_os("WSL_DISTRO_NAME").is_some() || std::env::var_os("WSL_INTEROP").is_some() {
        return true;
    }

    // Older WSL versions predate WSL_DISTRO_NAME; the kernel banner is
    // the reliable signal there.
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_ascii_lowercase().contains("microsoft"))
        .unwrap_or(false)
}
