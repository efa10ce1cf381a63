//! Programs, message boxes, the clipboard and plain delays.

use std::time::Duration;

use super::Automation;
use crate::error::Result;
use crate::response;

/// A modal message box. `options` is passed through to the engine verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgBox {
    pub text: String,
    pub title: String,
    pub options: String,
}

impl MsgBox {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }
}

impl Automation {
    pub async fn run_program(&self, name: &str) -> Result<()> {
        self.request(&format!("runProgram;{};", name)).await?;
        Ok(())
    }

    /// Show a message box and return the engine's answer, e.g. the button pressed.
    pub async fn msg_box(&self, message: &MsgBox) -> Result<Option<String>> {
        let reply = self
            .request(&format!(
                "msgBox;{};{};{};",
                message.text, message.title, message.options
            ))
            .await?;
        Ok(response::text(reply))
    }

    pub async fn set_clipboard(&self, text: &str) -> Result<()> {
        self.request(&format!("setClipboard;{}", text)).await?;
        Ok(())
    }

    /// The clipboard text, or `None` when it holds no text.
    pub async fn get_clipboard(&self) -> Result<Option<String>> {
        Ok(response::text(self.request("getClipboard").await?))
    }

    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
