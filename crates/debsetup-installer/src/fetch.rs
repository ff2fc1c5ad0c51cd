use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};

use crate::exec::CommandExecutor;
use crate::fs_utils::remove_file_if_exists;
use crate::host::HostProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpTool {
    Curl,
    Wget,
}

impl HttpTool {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Curl => "curl",
            Self::Wget => "wget",
        }
    }
}

pub fn select_http_tool(host: &dyn HostProbe) -> Result<HttpTool> {
    [HttpTool::Curl, HttpTool::Wget]
        .into_iter()
        .find(|tool| host.has_tool(tool.as_str()))
        .ok_or_else(|| anyhow!("neither curl nor wget is available; install one and retry"))
}

pub fn fetch_command(tool: HttpTool, url: &str, dest: &Path) -> Command {
    let mut command = Command::new(tool.as_str());
    match tool {
        HttpTool::Curl => {
            command.arg("-fL").arg("-o").arg(dest).arg(url);
        }
        HttpTool::Wget => {
            command.arg("-O").arg(dest).arg(url);
        }
    }
    command
}

pub trait PackageFetcher {
    fn fetch(&self, tool: HttpTool, url: &str, dest: &Path) -> Result<()>;
}

/// Downloads through an external HTTP client. The payload is written as-is.
pub struct ToolFetcher<E> {
    executor: E,
}

impl<E: CommandExecutor> ToolFetcher<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> PackageFetcher for ToolFetcher<E> {
    fn fetch(&self, tool: HttpTool, url: &str, dest: &Path) -> Result<()> {
        let mut command = fetch_command(tool, url, dest);
        let context = format!("{} download failed", tool.as_str());
        if let Err(err) = self.executor.run(&mut command, &context) {
            let _ = remove_file_if_exists(dest);
            return Err(err);
        }
        if !dest.exists() {
            return Err(anyhow!(
                "{} reported success but wrote no file: {}",
                tool.as_str(),
                dest.display()
            ));
        }
        Ok(())
    }
}
