use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const PACKAGE_NAME: &str = "edgepanel";
pub const DISPLAY_NAME: &str = "Edge Panel";
pub const RELEASE_URL: &str = "https://github.com/edgepanel/edgepanel/releases/latest/download";
pub const ARCHIVE_NAME: &str = "edgepanel_arm64.deb";
pub const EXEC_PATH: &str = "/usr/bin/edgepanel";

/// Everything the installer needs to know about the one package it installs.
///
/// The builtin profile is fixed at build time. An override file may replace
/// individual fields; system paths are resolved relative to `system_root` so
/// the whole layout can be relocated into a scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageProfile {
    pub package_name: String,
    pub display_name: String,
    pub release_url: String,
    pub archive_name: String,
    pub exec_path: String,
    pub icon: Option<String>,
    pub comment: Option<String>,
    pub categories: Vec<String>,
    pub sha256: Option<String>,
    pub system_root: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileOverrides {
    package_name: Option<String>,
    display_name: Option<String>,
    release_url: Option<String>,
    archive_name: Option<String>,
    exec_path: Option<String>,
    icon: Option<String>,
    comment: Option<String>,
    categories: Option<Vec<String>>,
    sha256: Option<String>,
    system_root: Option<PathBuf>,
}

impl Default for PackageProfile {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PackageProfile {
    pub fn builtin() -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            release_url: RELEASE_URL.to_string(),
            archive_name: ARCHIVE_NAME.to_string(),
            exec_path: EXEC_PATH.to_string(),
            icon: Some(PACKAGE_NAME.to_string()),
            comment: None,
            categories: vec!["Utility".to_string()],
            sha256: None,
            system_root: PathBuf::from("/"),
        }
    }

    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let overrides: ProfileOverrides =
            toml::from_str(input).context("failed to parse package profile")?;
        let builtin = Self::builtin();
        let profile = Self {
            package_name: overrides.package_name.unwrap_or(builtin.package_name),
            display_name: overrides.display_name.unwrap_or(builtin.display_name),
            release_url: overrides.release_url.unwrap_or(builtin.release_url),
            archive_name: overrides.archive_name.unwrap_or(builtin.archive_name),
            exec_path: overrides.exec_path.unwrap_or(builtin.exec_path),
            icon: overrides.icon.or(builtin.icon),
            comment: overrides.comment.or(builtin.comment),
            categories: overrides.categories.unwrap_or(builtin.categories),
            sha256: overrides.sha256.or(builtin.sha256),
            system_root: overrides.system_root.unwrap_or(builtin.system_root),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read package profile: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid package profile: {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_package_name(&self.package_name)?;
        if self.release_url.trim().is_empty() {
            return Err(anyhow!("release_url must not be empty"));
        }
        let archive = self.archive_name.trim();
        if archive.is_empty() {
            return Err(anyhow!("archive_name must not be empty"));
        }
        if archive.contains('/') || archive == "." || archive == ".." {
            return Err(anyhow!(
                "archive_name must be a bare file name: {}",
                self.archive_name
            ));
        }
        if self.exec_path.trim().is_empty() {
            return Err(anyhow!("exec_path must not be empty"));
        }
        Ok(())
    }

    pub fn download_url(&self) -> String {
        format!(
            "{}/{}",
            self.release_url.trim_end_matches('/'),
            self.archive_name.trim_start_matches('/')
        )
    }

    pub fn desktop_file_name(&self) -> String {
        format!("{}.desktop", self.package_name)
    }

    pub fn system_desktop_entry_path(&self) -> PathBuf {
        self.system_path("usr/share/applications")
            .join(self.desktop_file_name())
    }

    pub fn user_autostart_dir(&self, home: &Path) -> PathBuf {
        home.join(".config").join("autostart")
    }

    pub fn user_autostart_path(&self, home: &Path) -> PathBuf {
        self.user_autostart_dir(home).join(self.desktop_file_name())
    }

    pub fn service_unit_name(&self) -> String {
        format!("{}.service", self.package_name)
    }

    pub fn service_unit_path(&self) -> PathBuf {
        self.system_path("lib/systemd/system")
            .join(self.service_unit_name())
    }

    fn system_path(&self, rel: &str) -> PathBuf {
        self.system_root.join(rel)
    }
}

fn validate_package_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("package_name must not be empty"));
    }
    if name
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '+' || ch == '-'))
    {
        return Err(anyhow!(
            "package_name contains invalid character(s): {name}"
        ));
    }
    Ok(())
}
