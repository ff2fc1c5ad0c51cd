use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use debsetup_core::{render_desktop_entry, PackageProfile};

use crate::exec::CommandExecutor;
use crate::fs_utils::set_mode;
use crate::host::Escalation;

pub const DESKTOP_ENTRY_MODE: u32 = 0o755;

pub fn install_file_command(escalation: Escalation, source: &Path, dest: &Path) -> Command {
    let mut command = escalation.command("install");
    command
        .arg("-D")
        .arg("-m")
        .arg(format!("{DESKTOP_ENTRY_MODE:o}"))
        .arg(source)
        .arg(dest);
    command
}

/// Writes the launcher system-wide and, for a non-root user, into their
/// autostart directory. Returns every path written, system entry first.
pub fn write_desktop_entries(
    executor: &dyn CommandExecutor,
    profile: &PackageProfile,
    escalation: Escalation,
    staging_dir: &Path,
    home: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let entry = render_desktop_entry(profile);
    let staged = staging_dir.join(profile.desktop_file_name());
    fs::write(&staged, entry.as_bytes())
        .with_context(|| format!("failed to stage desktop entry: {}", staged.display()))?;

    let system_path = profile.system_desktop_entry_path();
    install_system_entry(executor, escalation, &staged, &system_path)?;
    let mut written = vec![system_path];

    if escalation.is_escalated() {
        let home = home.ok_or_else(|| {
            anyhow!("HOME is not set; cannot write the autostart entry for the current user")
        })?;
        let autostart_dir = profile.user_autostart_dir(home);
        fs::create_dir_all(&autostart_dir).with_context(|| {
            format!(
                "failed to create autostart dir: {}",
                autostart_dir.display()
            )
        })?;
        let autostart_path = profile.user_autostart_path(home);
        write_executable_file(&autostart_path, &entry)?;
        written.push(autostart_path);
    }

    Ok(written)
}

fn install_system_entry(
    executor: &dyn CommandExecutor,
    escalation: Escalation,
    staged: &Path,
    dest: &Path,
) -> Result<()> {
    if escalation.is_escalated() {
        return executor.run(
            &mut install_file_command(escalation, staged, dest),
            &format!("failed to install desktop entry {}", dest.display()),
        );
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(staged, dest)
        .with_context(|| format!("failed to write desktop entry: {}", dest.display()))?;
    set_mode(dest, DESKTOP_ENTRY_MODE)
        .with_context(|| format!("failed to mark executable: {}", dest.display()))
}

fn write_executable_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents.as_bytes())
        .with_context(|| format!("failed to write desktop entry: {}", path.display()))?;
    set_mode(path, DESKTOP_ENTRY_MODE)
        .with_context(|| format!("failed to mark executable: {}", path.display()))
}
