use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

pub const SUPPORTED_ARCHES: [&str; 2] = ["aarch64", "arm64"];
pub const ESCALATION_TOOL: &str = "sudo";

/// Read-only view of the host the installer runs on.
pub trait HostProbe {
    fn machine_arch(&self) -> Result<String>;
    fn is_root(&self) -> bool;
    fn has_tool(&self, name: &str) -> bool;
    fn home_dir(&self) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostProbe for SystemHost {
    fn machine_arch(&self) -> Result<String> {
        let output = Command::new("uname")
            .arg("-m")
            .output()
            .context("failed to run uname -m")?;
        if !output.status.success() {
            return Err(anyhow!("uname -m failed: status={}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[cfg(unix)]
    fn is_root(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    fn is_root(&self) -> bool {
        false
    }

    fn has_tool(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

pub fn ensure_supported_arch(arch: &str) -> Result<()> {
    if SUPPORTED_ARCHES.contains(&arch) {
        return Ok(());
    }
    Err(anyhow!(
        "unsupported architecture: {} (ARM64 required: {})",
        if arch.is_empty() { "<unknown>" } else { arch },
        SUPPORTED_ARCHES.join(" or ")
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    Sudo,
}

impl Escalation {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Sudo => Some(ESCALATION_TOOL),
        }
    }

    pub fn is_escalated(self) -> bool {
        self == Self::Sudo
    }

    /// Builds a command for `program` with the escalation prefix applied.
    pub fn command(self, program: &str) -> Command {
        match self.prefix() {
            None => Command::new(program),
            Some(prefix) => {
                let mut command = Command::new(prefix);
                command.arg(program);
                command
            }
        }
    }
}

/// Primes the escalation helper's credential cache so later steps do not
/// prompt mid-run.
pub fn credentials_command() -> Command {
    let mut command = Command::new(ESCALATION_TOOL);
    command.arg("-v");
    command
}

pub fn resolve_escalation(host: &dyn HostProbe) -> Result<Escalation> {
    if host.is_root() {
        return Ok(Escalation::None);
    }
    if !host.has_tool(ESCALATION_TOOL) {
        return Err(anyhow!(
            "{ESCALATION_TOOL} is required when not running as root"
        ));
    }
    Ok(Escalation::Sudo)
}
