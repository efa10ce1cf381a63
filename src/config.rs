//! Session configuration.
//!
//! Configuration is loaded from JSON. Only `executable` is required:
//!
//! ```json
//! {
//!   "executable": "C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey64.exe",
//!   "script_dir": "scripts",
//!   "hotkeys": ["F1", {"modifiers": ["control", "shift"], "key": "a"}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AhkError, Result};
use crate::hotkey::HotkeyDescriptor;

/// Runner script used with AutoHotkey v1.
pub const RUNNER_V1: &str = "runner_ahkV1.ahk";
/// Runner script used with AutoHotkey v2.
pub const RUNNER_V2: &str = "runner_ahkV2.ahk";
/// File name of the generated hotkeys script.
pub const HOTKEY_SCRIPT: &str = "hotkeys.ahk";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the AutoHotkey executable.
    pub executable: PathBuf,

    /// Directory holding the runner scripts; the hotkeys script is written here too.
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// Directory announced to the runner during the handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Use the AutoHotkey v1 runner script.
    #[serde(default)]
    pub ahkv1: bool,

    /// Color variation used by pixel and image searches when none is given.
    #[serde(default = "default_color_variation")]
    pub default_color_variation: u8,

    /// Hotkeys bound in the generated script at startup.
    #[serde(default)]
    pub hotkeys: Vec<HotkeyDescriptor>,

    /// Exit the whole program when either engine process goes away.
    #[serde(default = "default_true")]
    pub exit_on_channel_loss: bool,

    /// Shut the engine down and exit on Ctrl-C.
    #[serde(default = "default_true")]
    pub handle_interrupt: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_script_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_color_variation() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

impl Config {
    /// A configuration with every option at its default.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            script_dir: default_script_dir(),
            working_dir: None,
            ahkv1: false,
            default_color_variation: default_color_variation(),
            hotkeys: Vec::new(),
            exit_on_channel_loss: true,
            handle_interrupt: true,
            verbose: false,
        }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| AhkError::config_load(path, e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| AhkError::config_load(path, e.to_string()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| AhkError::config_save(path, e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(AhkError::config_validation("executable cannot be empty"));
        }

        if self.script_dir.as_os_str().is_empty() {
            return Err(AhkError::config_validation("script_dir cannot be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for descriptor in &self.hotkeys {
            descriptor
                .validate()
                .map_err(|e| AhkError::config_validation(e.to_string()))?;
            let key = descriptor.canonical_key();
            if !seen.insert(key.clone()) {
                return Err(AhkError::config_validation(format!(
                    "hotkey '{}' is bound more than once",
                    key
                )));
            }
        }

        Ok(())
    }

    /// The runner script matching the configured engine version.
    pub fn runner_script(&self) -> PathBuf {
        let name = if self.ahkv1 { RUNNER_V1 } else { RUNNER_V2 };
        self.script_dir.join(name)
    }

    pub fn hotkey_script_path(&self) -> PathBuf {
        self.script_dir.join(HOTKEY_SCRIPT)
    }

    /// The directory sent in the handshake, falling back to the current directory.
    pub fn working_dir(&self) -> Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn with_hotkeys(mut self, hotkeys: Vec<HotkeyDescriptor>) -> Self {
        self.hotkeys = hotkeys;
        self
    }

    /// Keep the process alive on channel loss and Ctrl-C, e.g. when embedding or testing.
    pub fn embedded(mut self) -> Self {
        self.exit_on_channel_loss = false;
        self.handle_interrupt = false;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_executable())
    }
}

fn default_executable() -> &'static Path {
    if cfg!(windows) {
        Path::new("C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey64.exe")
    } else {
        Path::new("AutoHotkey")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;

    #[test]
    fn test_runner_script_selection() {
        let mut config = Config::new("ahk.exe");
        config.script_dir = PathBuf::from("scripts");
        assert_eq!(config.runner_script(), Path::new("scripts").join(RUNNER_V2));

        config.ahkv1 = true;
        assert_eq!(config.runner_script(), Path::new("scripts").join(RUNNER_V1));
        assert_eq!(
            config.hotkey_script_path(),
            Path::new("scripts").join(HOTKEY_SCRIPT)
        );
    }

    #[test]
    fn test_duplicate_hotkeys_rejected() {
        let config = Config::new("ahk.exe").with_hotkeys(vec![
            HotkeyDescriptor::literal("^a"),
            HotkeyDescriptor::modifier_key([Modifier::Control], "a"),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_executable_rejected() {
        assert!(Config::new("").validate().is_err());
        assert!(Config::new("ahk.exe").validate().is_ok());
    }

    #[test]
    fn test_working_dir_falls_back_to_cwd() {
        let config = Config::new("ahk.exe");
        assert_eq!(
            config.working_dir().unwrap(),
            std::env::current_dir().unwrap()
        );
    }
}
