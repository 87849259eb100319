//! Local machine metadata reported with seat heartbeats.
//!
//! Nothing here is security relevant: the values only help the server and
//! its operators tell sessions apart.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

/// Information about the machine this client runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Machine hostname, or "unknown".
    pub hostname: String,
    /// Operating system name.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
}

impl DeviceInfo {
    /// Collects information about the current machine.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            os: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
        }
    }

    /// A `product (os; arch)` style agent string for session metadata.
    #[must_use]
    pub fn user_agent(&self, product: &str) -> String {
        format!("{product} ({}; {})", self.os, self.arch)
    }
}

/// A stable, opaque hash identifying this machine and OS user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Derives the fingerprint for the current machine.
    ///
    /// Survives restarts; changes if the hostname, machine ID or user changes.
    #[must_use]
    pub fn generate() -> Self {
        let info = DeviceInfo::collect();
        let mut parts = vec![info.os, info.arch, info.hostname];
        if let Some(machine_id) = machine_id() {
            parts.push(machine_id);
        }
        if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
            parts.push(user);
        }

        let hash = Sha256::digest(parts.join("|").as_bytes());
        Self(URL_SAFE_NO_PAD.encode(&hash[..16]))
    }

    /// Returns the fingerprint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|out| {
                out.lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
