mod apt;
mod desktop_entries;
mod exec;
mod fetch;
mod fs_utils;
mod host;
mod pipeline;
mod systemd;
mod types;
mod workdir;

pub use apt::{
    install_archive_command, refresh_index_command, repair_dependencies_command, Apt,
    PackageManager,
};
pub use desktop_entries::{install_file_command, write_desktop_entries, DESKTOP_ENTRY_MODE};
pub use exec::{describe_command, program_name, CommandExecutor, CommandFailure, SystemExecutor};
pub use fetch::{fetch_command, select_http_tool, HttpTool, PackageFetcher, ToolFetcher};
pub use host::{
    credentials_command, ensure_supported_arch, resolve_escalation, Escalation, HostProbe, SystemHost,
    ESCALATION_TOOL, SUPPORTED_ARCHES,
};
pub use pipeline::{plan_steps, Collaborators, InstallContext, Installer};
pub use systemd::{
    enable_command, list_unit_files_command, reload_command, start_command, unit_listed,
    ServiceManager, Systemd,
};
pub use types::{
    InstallOptions, InstallOutcome, InstallReporter, InstallStep, Interrupted, ServiceState,
    SilentReporter,
};
pub use workdir::DownloadWorkdir;
