//! RegTool - Export and import Windows registry keys through `reg.exe`

use crate::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};

const SYSTEM_PATH: &str = "reg";

/// Registry operations needed to back up and restore registry-stored saves
pub trait RegistryTool {
    fn key_exists(&self, key: &str) -> bool;
    /// Export a key and its subkeys to a `.reg` file
    fn export(&self, key: &str, file: &Path) -> Result<()>;
    /// Import a previously exported `.reg` file
    fn import(&self, file: &Path) -> Result<()>;
}

/// Shells out to the Windows `reg` command
#[derive(Debug, Clone)]
pub struct RegExe {
    reg_path: String,
}

impl Default for RegExe {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RegExe {
    /// Create a new RegExe, falling back to `SAVEKEEPER_REG_PATH` then `reg`
    pub fn new(reg_path: Option<String>) -> Self {
        let reg_path = reg_path.unwrap_or_else(|| {
            std::env::var("SAVEKEEPER_REG_PATH").unwrap_or_else(|_| SYSTEM_PATH.to_string())
        });
        Self { reg_path }
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        tracing::debug!("Running {} {}", self.reg_path, args.join(" "));

        let output = Command::new(&self.reg_path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::RegistryTool(format!("{}: {}", self.reg_path, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::RegistryTool(format!(
                "{} {} exited with {}: {}",
                self.reg_path,
                args.first().unwrap_or(&""),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl RegistryTool for RegExe {
    fn key_exists(&self, key: &str) -> bool {
        Command::new(&self.reg_path)
            .args(["query", key])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn export(&self, key: &str, file: &Path) -> Result<()> {
        let file = file.to_string_lossy();
        self.run(&["export", key, &file, "/y"])
    }

    fn import(&self, file: &Path) -> Result<()> {
        let file = file.to_string_lossy();
        self.run(&["import", &file])
    }
}

/// Stand-in for hosts without a registry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl RegistryTool for NoRegistry {
    fn key_exists(&self, _key: &str) -> bool {
        false
    }

    fn export(&self, key: &str, _file: &Path) -> Result<()> {
        Err(Error::RegistryTool(format!(
            "cannot export {}: no registry on this platform",
            key
        )))
    }

    fn import(&self, file: &Path) -> Result<()> {
        Err(Error::RegistryTool(format!(
            "cannot import {}: no registry on this platform",
            file.display()
        )))
    }
}

/// Registry tool appropriate for the host OS
pub fn system_registry() -> Box<dyn RegistryTool> {
    if cfg!(windows) {
        Box::new(RegExe::default())
    } else {
        Box::new(NoRegistry)
    }
}
