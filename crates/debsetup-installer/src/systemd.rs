use std::process::Command;

use anyhow::Result;

use crate::exec::CommandExecutor;
use crate::host::Escalation;

const SYSTEMCTL: &str = "systemctl";

pub trait ServiceManager {
    fn reload(&self, escalation: Escalation) -> Result<()>;
    fn enable(&self, escalation: Escalation, unit: &str) -> Result<()>;
    fn is_registered(&self, unit: &str) -> Result<bool>;
    fn start(&self, escalation: Escalation, unit: &str) -> Result<()>;
}

pub fn reload_command(escalation: Escalation) -> Command {
    let mut command = escalation.command(SYSTEMCTL);
    command.arg("daemon-reload");
    command
}

pub fn enable_command(escalation: Escalation, unit: &str) -> Command {
    let mut command = escalation.command(SYSTEMCTL);
    command.arg("enable").arg(unit);
    command
}

pub fn list_unit_files_command(unit: &str) -> Command {
    let mut command = Command::new(SYSTEMCTL);
    command
        .arg("list-unit-files")
        .arg("--no-legend")
        .arg("--no-pager")
        .arg(unit);
    command
}

pub fn start_command(escalation: Escalation, unit: &str) -> Command {
    let mut command = escalation.command(SYSTEMCTL);
    command.arg("start").arg(unit);
    command
}

/// True when any `list-unit-files` row names `unit`.
pub fn unit_listed(list_output: &str, unit: &str) -> bool {
    list_output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name == unit)
}

pub struct Systemd<E> {
    executor: E,
}

impl<E: CommandExecutor> Systemd<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> ServiceManager for Systemd<E> {
    fn reload(&self, escalation: Escalation) -> Result<()> {
        self.executor.run(
            &mut reload_command(escalation),
            "failed to reload systemd units",
        )
    }

    fn enable(&self, escalation: Escalation, unit: &str) -> Result<()> {
        self.executor.run(
            &mut enable_command(escalation, unit),
            &format!("failed to enable {unit}"),
        )
    }

    fn is_registered(&self, unit: &str) -> Result<bool> {
        let listed = self.executor.capture(
            &mut list_unit_files_command(unit),
            &format!("failed to query unit files for {unit}"),
        );
        match listed {
            Ok(output) => Ok(unit_listed(&output, unit)),
            // list-unit-files exits non-zero when nothing matches the pattern.
            Err(err) if err.downcast_ref::<crate::CommandFailure>().is_some() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn start(&self, escalation: Escalation, unit: &str) -> Result<()> {
        self.executor.run(
            &mut start_command(escalation, unit),
            &format!("failed to start {unit}"),
        )
    }
}
