//! Pre-run system facts used as the "must not appear" ground truth.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, ToSocketAddrs};
use std::process::Command;

use crate::errors::VerifyError;
use crate::sensitive::loggable;

const KERNEL_HOSTNAME: &str = "/proc/sys/kernel/hostname";
/// IP searched for when the hostname does not resolve.
const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// Hostname and IP address as seen before the collaborator ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub hostname: String,
    pub ip_addr: String,
}

impl SystemSnapshot {
    pub fn new(hostname: impl Into<String>, ip_addr: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ip_addr: ip_addr.into(),
        }
    }

    /// Reads the hostname from the kernel (falling back to `hostname`) and
    /// resolves it to an address.
    pub fn capture() -> Result<Self, VerifyError> {
        let hostname = read_hostname().ok_or(VerifyError::HostnameUnavailable)?;
        let ip_addr = resolve_ip(&hostname).unwrap_or_else(loopback_fallback);
        debug!(
            "Captured snapshot: hostname='{}', ip='{}'",
            loggable(&hostname),
            loggable(&ip_addr)
        );
        Ok(Self { hostname, ip_addr })
    }

    /// Captures what is not overridden. Both overrides given means no system
    /// lookup at all.
    pub fn with_overrides(
        hostname: Option<&str>,
        ip_addr: Option<&str>,
    ) -> Result<Self, VerifyError> {
        match (hostname, ip_addr) {
            (Some(h), Some(ip)) => Ok(Self::new(h, ip)),
            (Some(h), None) => {
                let ip = resolve_ip(h).unwrap_or_else(loopback_fallback);
                Ok(Self::new(h, ip))
            }
            (None, ip) => {
                let mut snap = Self::capture()?;
                if let Some(ip) = ip {
                    snap.ip_addr = ip.to_string();
                }
                Ok(snap)
            }
        }
    }

    /// Everything before the first dot.
    pub fn short_hostname(&self) -> &str {
        short_name(&self.hostname)
    }
}

fn loopback_fallback() -> String {
    warn!("Hostname did not resolve; falling back to {} for the IP check.", LOOPBACK_FALLBACK);
    LOOPBACK_FALLBACK.to_string()
}

pub fn short_name(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

fn read_hostname() -> Option<String> {
    if let Ok(raw) = std::fs::read_to_string(KERNEL_HOSTNAME) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    let output = Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// First non-loopback IPv4, else any non-loopback address, else whatever
/// resolved first.
fn resolve_ip(hostname: &str) -> Option<String> {
    let addrs: Vec<IpAddr> = (hostname, 0)
        .to_socket_addrs()
        .ok()?
        .map(|sa| sa.ip())
        .collect();
    pick_address(&addrs).map(|ip| ip.to_string())
}

fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4() && !ip.is_loopback())
        .or_else(|| addrs.iter().find(|ip| !ip.is_loopback()))
        .or_else(|| addrs.first())
        .copied()
}
