use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use debsetup_core::PackageProfile;
use debsetup_installer::{
    Apt, Collaborators, CommandFailure, InstallOptions, Installer, Interrupted, SystemExecutor,
    SystemHost, Systemd, ToolFetcher,
};

mod interrupt;
mod render;

use interrupt::{install_interrupt_handlers, interrupt_requested, INTERRUPTED};
use render::{current_output_style, render_status_line, OutputStyle, TerminalReporter};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "debsetup", version)]
#[command(
    about = "Install an ARM64 .deb release, its desktop entries and its service",
    long_about = None
)]
struct Cli {
    /// TOML file overriding the built-in package profile.
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,
    /// Expected SHA-256 of the downloaded archive.
    #[arg(long, value_name = "HEX")]
    sha256: Option<String>,
    /// Print the steps that would run and exit.
    #[arg(long)]
    dry_run: bool,
    /// Disable badges, colors and spinners.
    #[arg(long)]
    plain: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let style = current_output_style(cli.plain);
    install_interrupt_handlers();

    let mut reporter = TerminalReporter::new(style);
    match run(&cli, style, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            reporter.print_error(&format!("{err:#}"));
            ExitCode::from(exit_code_for(&err, interrupt_requested()))
        }
    }
}

fn run(cli: &Cli, style: OutputStyle, reporter: &mut TerminalReporter) -> Result<()> {
    let profile = load_profile(cli.profile.as_deref())?;
    let options = InstallOptions {
        expected_sha256: cli.sha256.clone(),
    };

    let host = SystemHost;
    let executor = SystemExecutor::with_interrupt(&INTERRUPTED);
    let fetcher = ToolFetcher::new(executor);
    let packages = Apt::new(executor);
    let services = Systemd::new(executor);
    let installer = Installer::new(Collaborators {
        host: &host,
        executor: &executor,
        fetcher: &fetcher,
        packages: &packages,
        services: &services,
    })
    .with_interrupt(&INTERRUPTED);

    if cli.dry_run {
        for line in installer.plan(&profile, &options)? {
            println!("{}", render_status_line(style, "step", &line));
        }
        return Ok(());
    }

    let outcome = installer.run(&profile, &options, reporter)?;
    reporter.print_outcome(&outcome);
    Ok(())
}

fn load_profile(path: Option<&Path>) -> Result<PackageProfile> {
    match path {
        Some(path) => PackageProfile::load(path),
        None => Ok(PackageProfile::builtin()),
    }
}

/// Maps a failed run to the process exit code: a failing external command
/// passes its own status through, an interrupt exits 130.
fn exit_code_for(err: &anyhow::Error, interrupted: bool) -> u8 {
    if let Some(code) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<CommandFailure>())
        .and_then(|failure| failure.code)
    {
        return u8::try_from(code)
            .ok()
            .filter(|code| *code != 0)
            .unwrap_or(EXIT_FAILURE);
    }
    if interrupted || err.chain().any(|cause| cause.is::<Interrupted>()) {
        return EXIT_INTERRUPTED;
    }
    EXIT_FAILURE
}
