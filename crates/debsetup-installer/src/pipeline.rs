use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use debsetup_core::PackageProfile;
use debsetup_security::{sha256_file_hex, verify_sha256_file};

use crate::apt::{
    install_archive_command, refresh_index_command, repair_dependencies_command, PackageManager,
};
use crate::desktop_entries::{install_file_command, write_desktop_entries};
use crate::exec::{describe_command, CommandExecutor};
use crate::fetch::{fetch_command, select_http_tool, HttpTool, PackageFetcher};
use crate::host::{
    credentials_command, ensure_supported_arch, resolve_escalation, Escalation, HostProbe,
};
use crate::systemd::{enable_command, reload_command, start_command, ServiceManager};
use crate::workdir::DownloadWorkdir;
use crate::{
    InstallOptions, InstallOutcome, InstallReporter, InstallStep, Interrupted, ServiceState,
    SilentReporter,
};

pub struct Collaborators<'a> {
    pub host: &'a dyn HostProbe,
    pub executor: &'a dyn CommandExecutor,
    pub fetcher: &'a dyn PackageFetcher,
    pub packages: &'a dyn PackageManager,
    pub services: &'a dyn ServiceManager,
}

/// Per-run values resolved by the guard steps and threaded through the rest
/// of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallContext<'p> {
    pub profile: &'p PackageProfile,
    pub escalation: Escalation,
    pub http_tool: HttpTool,
    pub workdir: PathBuf,
    pub home: Option<PathBuf>,
    pub expected_sha256: Option<String>,
}

impl InstallContext<'_> {
    pub fn archive_path(&self) -> PathBuf {
        self.workdir.join(&self.profile.archive_name)
    }

    pub fn service_unit_present(&self) -> bool {
        self.profile.service_unit_path().is_file()
    }
}

struct StagedInstall {
    archive_sha256: Option<String>,
    desktop_entries: Vec<PathBuf>,
    service_configured: bool,
}

pub struct Installer<'a> {
    host: &'a dyn HostProbe,
    executor: &'a dyn CommandExecutor,
    fetcher: &'a dyn PackageFetcher,
    packages: &'a dyn PackageManager,
    services: &'a dyn ServiceManager,
    temp_root: PathBuf,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> Installer<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self {
            host: collaborators.host,
            executor: collaborators.executor,
            fetcher: collaborators.fetcher,
            packages: collaborators.packages,
            services: collaborators.services,
            temp_root: std::env::temp_dir(),
            interrupt: None,
        }
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Runs the whole install. The first failing step ends the run; the
    /// download dir is removed before this returns on every path.
    pub fn run(
        &self,
        profile: &PackageProfile,
        options: &InstallOptions,
        reporter: &mut dyn InstallReporter,
    ) -> Result<InstallOutcome> {
        let mut warnings = Vec::new();
        let escalation = self.check_host(reporter, &mut warnings)?;
        if escalation.is_escalated() {
            self.executor.run(
                &mut credentials_command(),
                "failed to obtain sudo credentials",
            )?;
        }

        let workdir = DownloadWorkdir::create(&self.temp_root)?;
        let staged = self
            .resolve_context(profile, options, escalation, workdir.path())
            .and_then(|context| self.run_staged(&context, reporter, &mut warnings));
        drop(workdir);
        let staged = staged?;
        reporter.step_started(InstallStep::Cleanup, "removing download dir");
        reporter.step_finished(InstallStep::Cleanup, "download dir removed");
        self.ensure_not_interrupted()?;

        let service = if staged.service_configured {
            self.start_service(profile, escalation, reporter, &mut warnings)?
        } else {
            ServiceState::Missing
        };

        Ok(InstallOutcome {
            package_name: profile.package_name.clone(),
            archive_url: profile.download_url(),
            archive_sha256: staged.archive_sha256,
            escalation,
            desktop_entries: staged.desktop_entries,
            service,
            warnings,
        })
    }

    /// Runs the host checks and describes the remaining steps without
    /// touching the network or the filesystem.
    pub fn plan(&self, profile: &PackageProfile, options: &InstallOptions) -> Result<Vec<String>> {
        let mut reporter = SilentReporter;
        let mut warnings = Vec::new();
        let escalation = self.check_host(&mut reporter, &mut warnings)?;
        let placeholder = self.temp_root.join("debsetup-XXXXXX");
        let context = self.resolve_context(profile, options, escalation, &placeholder)?;
        Ok(plan_steps(&context))
    }

    fn check_host(
        &self,
        reporter: &mut dyn InstallReporter,
        warnings: &mut Vec<String>,
    ) -> Result<Escalation> {
        reporter.step_started(InstallStep::Architecture, "checking host architecture");
        let arch = self.host.machine_arch()?;
        ensure_supported_arch(&arch)?;
        reporter.step_finished(
            InstallStep::Architecture,
            &format!("architecture {arch} is supported"),
        );
        self.ensure_not_interrupted()?;

        reporter.step_started(InstallStep::Privileges, "checking privileges");
        let escalation = resolve_escalation(self.host)?;
        let message = match escalation {
            Escalation::None => {
                let warning = "running as root; privileged steps run without sudo".to_string();
                reporter.warn(&warning);
                warnings.push(warning);
                "running as root"
            }
            Escalation::Sudo => "using sudo for privileged steps",
        };
        reporter.step_finished(InstallStep::Privileges, message);
        self.ensure_not_interrupted()?;
        Ok(escalation)
    }

    fn resolve_context<'p>(
        &self,
        profile: &'p PackageProfile,
        options: &InstallOptions,
        escalation: Escalation,
        workdir: &Path,
    ) -> Result<InstallContext<'p>> {
        let http_tool = select_http_tool(self.host)?;
        let home = if escalation.is_escalated() {
            self.host.home_dir()
        } else {
            None
        };
        Ok(InstallContext {
            profile,
            escalation,
            http_tool,
            workdir: workdir.to_path_buf(),
            home,
            expected_sha256: options
                .expected_sha256
                .clone()
                .or_else(|| profile.sha256.clone()),
        })
    }

    fn run_staged(
        &self,
        context: &InstallContext<'_>,
        reporter: &mut dyn InstallReporter,
        warnings: &mut Vec<String>,
    ) -> Result<StagedInstall> {
        let profile = context.profile;
        let url = profile.download_url();
        let archive = context.archive_path();

        reporter.step_started(
            InstallStep::Download,
            &format!("downloading {url} with {}", context.http_tool.as_str()),
        );
        self.fetcher
            .fetch(context.http_tool, &url, &archive)
            .with_context(|| format!("failed to download {url}"))?;
        reporter.step_finished(
            InstallStep::Download,
            &format!("downloaded {}", profile.archive_name),
        );
        self.ensure_not_interrupted()?;

        let archive_sha256 = match context.expected_sha256.as_deref() {
            Some(expected) => {
                reporter.step_started(InstallStep::Verify, "verifying archive sha256");
                verify_archive(&archive, expected)?;
                reporter.step_finished(InstallStep::Verify, "archive sha256 matches");
                self.ensure_not_interrupted()?;
                Some(expected.trim().to_ascii_lowercase())
            }
            None => None,
        };

        reporter.step_started(
            InstallStep::Install,
            &format!("installing {}", profile.package_name),
        );
        self.packages.refresh_index(context.escalation)?;
        self.packages.install_archive(context.escalation, &archive)?;
        self.packages.repair_dependencies(context.escalation)?;
        reporter.step_finished(
            InstallStep::Install,
            &format!("installed {}", profile.package_name),
        );
        self.ensure_not_interrupted()?;

        reporter.step_started(InstallStep::DesktopEntry, "writing desktop entries");
        let desktop_entries = write_desktop_entries(
            self.executor,
            profile,
            context.escalation,
            &context.workdir,
            context.home.as_deref(),
        )?;
        for entry in &desktop_entries {
            reporter.step_finished(
                InstallStep::DesktopEntry,
                &format!("desktop entry: {}", entry.display()),
            );
        }
        self.ensure_not_interrupted()?;

        reporter.step_started(InstallStep::ServiceConfig, "configuring service");
        let unit = profile.service_unit_name();
        let service_configured = if context.service_unit_present() {
            self.services.reload(context.escalation)?;
            self.services.enable(context.escalation, &unit)?;
            reporter.step_finished(InstallStep::ServiceConfig, &format!("enabled {unit}"));
            true
        } else {
            let warning = format!(
                "service unit not found at {}; skipping service setup",
                profile.service_unit_path().display()
            );
            reporter.warn(&warning);
            warnings.push(warning);
            reporter.step_finished(InstallStep::ServiceConfig, "service setup skipped");
            false
        };
        self.ensure_not_interrupted()?;

        Ok(StagedInstall {
            archive_sha256,
            desktop_entries,
            service_configured,
        })
    }

    fn start_service(
        &self,
        profile: &PackageProfile,
        escalation: Escalation,
        reporter: &mut dyn InstallReporter,
        warnings: &mut Vec<String>,
    ) -> Result<ServiceState> {
        let unit = profile.service_unit_name();
        reporter.step_started(InstallStep::ServiceStart, &format!("starting {unit}"));
        if !self.services.is_registered(&unit)? {
            let warning = format!("{unit} is not registered with systemd; not started");
            reporter.warn(&warning);
            warnings.push(warning);
            reporter.step_finished(InstallStep::ServiceStart, "service start skipped");
            return Ok(ServiceState::EnabledNotRegistered);
        }
        self.services.start(escalation, &unit)?;
        reporter.step_finished(InstallStep::ServiceStart, &format!("started {unit}"));
        Ok(ServiceState::Started)
    }

    fn ensure_not_interrupted(&self) -> Result<()> {
        match self.interrupt {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(Interrupted.into()),
            _ => Ok(()),
        }
    }
}

fn verify_archive(archive: &Path, expected: &str) -> Result<()> {
    if verify_sha256_file(archive, expected)? {
        return Ok(());
    }
    let actual = sha256_file_hex(archive)?;
    Err(anyhow!(
        "sha256 mismatch for {}: expected {}, got {}",
        archive.display(),
        expected.trim().to_ascii_lowercase(),
        actual
    ))
}

/// Ordered, human-readable description of what a run with `context` does.
pub fn plan_steps(context: &InstallContext<'_>) -> Vec<String> {
    let profile = context.profile;
    let archive = context.archive_path();
    let mut lines = vec![
        format!("create download dir {}", context.workdir.display()),
        describe_command(&fetch_command(
            context.http_tool,
            &profile.download_url(),
            &archive,
        )),
    ];
    if let Some(expected) = &context.expected_sha256 {
        lines.push(format!("verify sha256 {}", expected.trim().to_ascii_lowercase()));
    }
    lines.push(describe_command(&refresh_index_command(context.escalation)));
    lines.push(describe_command(&install_archive_command(
        context.escalation,
        &archive,
    )));
    lines.push(describe_command(&repair_dependencies_command(
        context.escalation,
    )));

    let staged = context.workdir.join(profile.desktop_file_name());
    let system_entry = profile.system_desktop_entry_path();
    if context.escalation.is_escalated() {
        lines.push(describe_command(&install_file_command(
            context.escalation,
            &staged,
            &system_entry,
        )));
        match context.home.as_deref() {
            Some(home) => lines.push(format!(
                "write autostart entry {}",
                profile.user_autostart_path(home).display()
            )),
            None => lines.push("write autostart entry (HOME is not set)".to_string()),
        }
    } else {
        lines.push(format!("write desktop entry {}", system_entry.display()));
    }

    let unit = profile.service_unit_name();
    let present = context.service_unit_present();
    if present {
        lines.push(describe_command(&reload_command(context.escalation)));
        lines.push(describe_command(&enable_command(context.escalation, &unit)));
    } else {
        lines.push(format!(
            "skip service setup: {} not found",
            profile.service_unit_path().display()
        ));
    }
    lines.push(format!("remove download dir {}", context.workdir.display()));
    if present {
        lines.push(format!(
            "{} (when registered)",
            describe_command(&start_command(context.escalation, &unit))
        ));
    }
    lines
}
