//! Seam to the external rendering helper process.
//!
//! The helper paints windows in its own process; plotlink only needs to know
//! its version, whether it is healthy, and how to shut it down. That contract
//! is the [`RendererTransport`] trait. [`ProcessTransport`] locates the real
//! helper binary, [`NoopTransport`] stands in when none can be found so that
//! dispatch callers keep working (silently) without a renderer.
//!
//! Version-gated behavior is negotiated once per handle into a
//! [`RendererCapabilities`] record instead of being re-derived on every call.

use crate::error::{PlotlinkError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// Minimum helper version required for dispatch to work at all.
pub const MIN_RENDERER_VERSION: RendererVersion = RendererVersion::new(0, 5, 12);

/// First helper version that accepts a named-process registration.
pub const PROC_NAME_VERSION: RendererVersion = RendererVersion::new(0, 4, 8);

/// Environment variable pointing at the helper binary.
pub const HELPER_ENV_VAR: &str = "PLOTLINK_RENDERER";

/// Helper binary name searched on PATH when the env var is unset.
pub const HELPER_BIN_NAME: &str = "plotlink-renderer";

/// Process name registered with helpers that support it.
pub const PROC_NAME: &str = "Plotlink";

/// Dotted-triple helper version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RendererVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl RendererVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `major.minor.patch` string, tolerating a leading `v`.
    pub fn parse(version: &str) -> Option<Self> {
        let version = version.trim().trim_start_matches('v');
        let mut it = version.split('.');
        let major = it.next()?.parse::<u64>().ok()?;
        let minor = it.next()?.parse::<u64>().ok()?;
        let patch = it.next()?.parse::<u64>().ok()?;
        if it.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for RendererVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// How the health probe should be interpreted for a given helper version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Version below the minimum (or unknown): dispatch must be disabled.
    Unsupported,
    /// Exactly at the minimum: probe failures are suppressed and treated as
    /// healthy, matching the behavior of helpers at that version.
    Lenient,
    /// Above the minimum: the helper's own probe result is authoritative.
    Strict,
}

/// Capability record negotiated once at handle creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererCapabilities {
    pub version: Option<RendererVersion>,
    pub supports_proc_name: bool,
    pub probe_mode: ProbeMode,
}

impl RendererCapabilities {
    pub fn negotiate(version: Option<&str>) -> Self {
        let version = version.and_then(RendererVersion::parse);
        match version {
            Some(v) => Self {
                version: Some(v),
                supports_proc_name: v >= PROC_NAME_VERSION,
                probe_mode: if v < MIN_RENDERER_VERSION {
                    ProbeMode::Unsupported
                } else if v == MIN_RENDERER_VERSION {
                    ProbeMode::Lenient
                } else {
                    ProbeMode::Strict
                },
            },
            None => Self {
                version: None,
                supports_proc_name: false,
                probe_mode: ProbeMode::Unsupported,
            },
        }
    }
}

/// Connection to the external renderer.
///
/// Implementations must be cheap to share behind a handle; the dispatcher
/// calls `probe` from async context and `shutdown` exactly once on close.
#[async_trait]
pub trait RendererTransport: Send + Sync {
    /// Version string reported by the renderer, if it could be determined.
    fn version(&self) -> Option<&str>;

    /// Ask the renderer whether it is able to paint windows.
    async fn probe(&self) -> Result<()>;

    /// Tear down the renderer connection.
    fn shutdown(&self);
}

/// Stand-in transport used when no renderer helper can be located.
pub struct NoopTransport;

#[async_trait]
impl RendererTransport for NoopTransport {
    fn version(&self) -> Option<&str> {
        None
    }

    async fn probe(&self) -> Result<()> {
        Err(PlotlinkError::unavailable("no renderer transport"))
    }

    fn shutdown(&self) {}
}

/// Transport backed by the real helper binary.
pub struct ProcessTransport {
    binary: PathBuf,
    version: Option<String>,
}

impl ProcessTransport {
    /// Locate the helper binary and read its version once.
    ///
    /// Lookup order: `PLOTLINK_RENDERER` env var, then PATH.
    pub fn discover() -> Result<Self> {
        let binary = env::var_os(HELPER_ENV_VAR)
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .or_else(|| find_in_path(HELPER_BIN_NAME))
            .ok_or_else(|| {
                PlotlinkError::unavailable(format!(
                    "{HELPER_BIN_NAME} not found on PATH and {HELPER_ENV_VAR} is unset"
                ))
            })?;

        let version = query_version(&binary);
        if version.is_none() {
            warn!(
                "could not determine renderer version for {}",
                binary.display()
            );
        }
        Ok(Self { binary, version })
    }

    fn supports_proc_name(&self) -> bool {
        self.version
            .as_deref()
            .and_then(RendererVersion::parse)
            .is_some_and(|v| v >= PROC_NAME_VERSION)
    }
}

#[async_trait]
impl RendererTransport for ProcessTransport {
    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn probe(&self) -> Result<()> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("--ping");
        if self.supports_proc_name() {
            cmd.args(["--name", PROC_NAME]);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| PlotlinkError::unavailable(format!("failed to run helper probe: {e}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PlotlinkError::unavailable(format!(
                "helper probe exited with {}",
                output.status
            )))
        }
    }

    fn shutdown(&self) {
        debug!("releasing renderer helper {}", self.binary.display());
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

fn query_version(binary: &PathBuf) -> Option<String> {
    let output = Command::new(binary).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_triplet() {
        assert_eq!(
            RendererVersion::parse("0.5.12"),
            Some(RendererVersion::new(0, 5, 12))
        );
        assert_eq!(
            RendererVersion::parse("v1.2.3"),
            Some(RendererVersion::new(1, 2, 3))
        );
        assert_eq!(RendererVersion::parse("1.2"), None);
        assert_eq!(RendererVersion::parse("x.y.z"), None);
    }

    #[test]
    fn version_ordering() {
        assert!(RendererVersion::new(0, 5, 12) > RendererVersion::new(0, 4, 8));
        assert!(RendererVersion::new(0, 5, 11) < MIN_RENDERER_VERSION);
        assert!(RendererVersion::new(0, 6, 0) > MIN_RENDERER_VERSION);
    }

    #[test]
    fn negotiation_covers_the_version_gates() {
        let old = RendererCapabilities::negotiate(Some("0.4.0"));
        assert!(!old.supports_proc_name);
        assert_eq!(old.probe_mode, ProbeMode::Unsupported);

        let named = RendererCapabilities::negotiate(Some("0.4.8"));
        assert!(named.supports_proc_name);
        assert_eq!(named.probe_mode, ProbeMode::Unsupported);

        let exact = RendererCapabilities::negotiate(Some("0.5.12"));
        assert_eq!(exact.probe_mode, ProbeMode::Lenient);

        let newer = RendererCapabilities::negotiate(Some("0.6.0"));
        assert_eq!(newer.probe_mode, ProbeMode::Strict);

        let unknown = RendererCapabilities::negotiate(None);
        assert_eq!(unknown.probe_mode, ProbeMode::Unsupported);
        assert!(unknown.version.is_none());
    }
}
