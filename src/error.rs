//! Custom error types for ahk-bridge.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for ahk-bridge operations.
#[derive(Error, Debug)]
pub enum AhkError {
    /// The automation executable could not be launched.
    #[error("failed to spawn '{program}': {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A hotkey action could not be bound to the given key.
    #[error("invalid action for hotkey '{key}': {reason}")]
    InvalidAction { key: String, reason: String },

    /// A hotkey descriptor could not be parsed or canonicalized.
    #[error("invalid hotkey '{descriptor}': {reason}")]
    InvalidHotkey { descriptor: String, reason: String },

    /// A command was issued while another one is still waiting for its response.
    #[error("command channel busy, refusing to send '{command}'")]
    ChannelBusy { command: String },

    /// A command line cannot be framed on the line protocol.
    #[error("invalid command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },

    /// A response was awaited without a matching command having been sent.
    #[error("no command is waiting for a response")]
    NoPendingRequest,

    /// The output stream of a channel reached end-of-file.
    #[error("{channel} channel closed")]
    ChannelClosed { channel: String },

    /// A response line could not be converted to the expected type.
    #[error("invalid response '{response}' to '{command}': {reason}")]
    InvalidResponse {
        command: String,
        response: String,
        reason: String,
    },

    /// The initialization payload was missing or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The session has already been shut down.
    #[error("session terminated")]
    SessionTerminated,

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ahk-bridge operations.
pub type Result<T> = std::result::Result<T, AhkError>;

impl AhkError {
    /// Create a new ProcessSpawn error.
    pub fn process_spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::ProcessSpawn {
            program: program.into(),
            source,
        }
    }

    /// Create a new InvalidAction error.
    pub fn invalid_action(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAction {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidHotkey error.
    pub fn invalid_hotkey(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHotkey {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ChannelBusy error.
    pub fn channel_busy(command: impl Into<String>) -> Self {
        Self::ChannelBusy {
            command: command.into(),
        }
    }

    /// Create a new InvalidCommand error.
    pub fn invalid_command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ChannelClosed error.
    pub fn channel_closed(channel: impl Into<String>) -> Self {
        Self::ChannelClosed {
            channel: channel.into(),
        }
    }

    /// Create a new InvalidResponse error.
    pub fn invalid_response(
        command: impl Into<String>,
        response: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidResponse {
            command: command.into(),
            response: response.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Handshake error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AhkError::channel_busy("getMousePos");
        assert_eq!(
            err.to_string(),
            "command channel busy, refusing to send 'getMousePos'"
        );

        let err = AhkError::invalid_action("", "hotkey key is empty");
        assert_eq!(
            err.to_string(),
            "invalid action for hotkey '': hotkey key is empty"
        );

        let err = AhkError::config_validation("executable cannot be empty");
        assert_eq!(
            err.to_string(),
            "configuration error: executable cannot be empty"
        );

        let err = AhkError::channel_closed("runner");
        assert_eq!(err.to_string(), "runner channel closed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: AhkError = io_err.into();
        assert!(matches!(err, AhkError::Io(_)));
    }

    #[test]
    fn test_process_spawn_keeps_source() {
        use std::error::Error as _;

        let err = AhkError::process_spawn(
            "AutoHotkey.exe",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("AutoHotkey.exe"));
        assert!(err.source().is_some());
    }
}
