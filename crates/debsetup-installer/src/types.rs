use std::fmt;
use std::path::PathBuf;

use crate::host::Escalation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Architecture,
    Privileges,
    Download,
    Verify,
    Install,
    DesktopEntry,
    ServiceConfig,
    Cleanup,
    ServiceStart,
}

impl InstallStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Privileges => "privileges",
            Self::Download => "download",
            Self::Verify => "verify",
            Self::Install => "install",
            Self::DesktopEntry => "desktop-entry",
            Self::ServiceConfig => "service-config",
            Self::Cleanup => "cleanup",
            Self::ServiceStart => "service-start",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No unit file on disk; nothing was reloaded, enabled or started.
    Missing,
    /// Enabled, but systemd did not list the unit afterwards.
    EnabledNotRegistered,
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub package_name: String,
    pub archive_url: String,
    pub archive_sha256: Option<String>,
    pub escalation: Escalation,
    pub desktop_entries: Vec<PathBuf>,
    pub service: ServiceState,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Expected archive digest. `None` keeps the unverified download behavior.
    pub expected_sha256: Option<String>,
}

/// Receives progress from the pipeline; `step_started` is always followed by
/// `step_finished` unless the step fails.
pub trait InstallReporter {
    fn step_started(&mut self, step: InstallStep, message: &str);
    fn step_finished(&mut self, step: InstallStep, message: &str);
    fn warn(&mut self, message: &str);
}

#[derive(Debug, Default)]
pub struct SilentReporter;

impl InstallReporter for SilentReporter {
    fn step_started(&mut self, _step: InstallStep, _message: &str) {}
    fn step_finished(&mut self, _step: InstallStep, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Returned when the run stopped because an interrupt was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}
