use std::path::Path;
use std::process::Command;

use anyhow::Result;

use crate::exec::CommandExecutor;
use crate::host::Escalation;

const APT_GET: &str = "apt-get";
const NONINTERACTIVE: &str = "DEBIAN_FRONTEND=noninteractive";

pub trait PackageManager {
    fn refresh_index(&self, escalation: Escalation) -> Result<()>;
    fn install_archive(&self, escalation: Escalation, archive: &Path) -> Result<()>;
    fn repair_dependencies(&self, escalation: Escalation) -> Result<()>;
}

/// `apt-get` wrapped in `env` so debconf stays non-interactive even after
/// sudo resets the environment; output is captured and prompts would hang.
fn apt_command(escalation: Escalation) -> Command {
    let mut command = escalation.command("env");
    command.arg(NONINTERACTIVE).arg(APT_GET);
    command
}

pub fn refresh_index_command(escalation: Escalation) -> Command {
    let mut command = apt_command(escalation);
    command.arg("update");
    command
}

pub fn install_archive_command(escalation: Escalation, archive: &Path) -> Command {
    let mut command = apt_command(escalation);
    command.arg("install").arg("-y").arg(archive);
    command
}

pub fn repair_dependencies_command(escalation: Escalation) -> Command {
    let mut command = apt_command(escalation);
    command.arg("install").arg("-f").arg("-y");
    command
}

/// `apt-get` backed package manager. Every call runs under the escalation prefix.
pub struct Apt<E> {
    executor: E,
}

impl<E: CommandExecutor> Apt<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> PackageManager for Apt<E> {
    fn refresh_index(&self, escalation: Escalation) -> Result<()> {
        self.executor.run(
            &mut refresh_index_command(escalation),
            "failed to refresh package index",
        )
    }

    fn install_archive(&self, escalation: Escalation, archive: &Path) -> Result<()> {
        self.executor.run(
            &mut install_archive_command(escalation, archive),
            &format!("failed to install {}", archive.display()),
        )
    }

    fn repair_dependencies(&self, escalation: Escalation) -> Result<()> {
        self.executor.run(
            &mut repair_dependencies_command(escalation),
            "failed to resolve package dependencies",
        )
    }
}
