//! Keyboard input.
//!
//! Text is always sent literally: the engine's modifier and brace
//! metacharacters are escaped and newlines become `{enter}`.

use super::Automation;
use crate::error::Result;

/// Escape engine metacharacters so `text` is typed exactly as written.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '!' => escaped.push_str("{!}"),
            '#' => escaped.push_str("{#}"),
            '+' => escaped.push_str("{+}"),
            '^' => escaped.push_str("{^}"),
            '{' => escaped.push_str("{{}"),
            '}' => escaped.push_str("{}}"),
            '\n' => escaped.push_str("{enter}"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Literal text to type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendText {
    pub text: String,
    /// Leave modifiers the user is holding down untouched.
    pub blind: bool,
}

impl SendText {
    pub fn blind(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blind: true,
        }
    }

    fn payload(&self) -> String {
        let escaped = escape_text(&self.text);
        if self.blind {
            format!("{{Blind}}{}", escaped)
        } else {
            escaped
        }
    }
}

impl From<&str> for SendText {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
            blind: false,
        }
    }
}

impl From<String> for SendText {
    fn from(text: String) -> Self {
        Self { text, blind: false }
    }
}

/// Key press timing. Unset values keep the engine's current setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDelay {
    pub delay: Option<i32>,
    pub duration: Option<i32>,
    /// Apply to `send_play` instead of the other send modes.
    pub play: bool,
}

impl KeyDelay {
    fn command(&self) -> String {
        let field = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_default();
        format!(
            "setKeyDelay;{};{};{}",
            field(self.delay),
            field(self.duration),
            if self.play { "Play" } else { "" }
        )
    }
}

impl Automation {
    pub async fn set_key_delay(&self, delay: KeyDelay) -> Result<()> {
        self.request(&delay.command()).await?;
        Ok(())
    }

    pub async fn send(&self, text: impl Into<SendText>) -> Result<()> {
        self.send_with("send", text.into()).await
    }

    pub async fn send_input(&self, text: impl Into<SendText>) -> Result<()> {
        self.send_with("sendInput", text.into()).await
    }

    pub async fn send_play(&self, text: impl Into<SendText>) -> Result<()> {
        self.send_with("sendPlay", text.into()).await
    }

    async fn send_with(&self, verb: &str, text: SendText) -> Result<()> {
        self.request(&format!("{};{}", verb, text.payload())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("hello"), "hello");
        assert_eq!(escape_text("a+b!"), "a{+}b{!}");
        assert_eq!(escape_text("#^"), "{#}{^}");
        assert_eq!(escape_text("{x}"), "{{}x{}}");
        assert_eq!(escape_text("one\ntwo"), "one{enter}two");
        assert_eq!(escape_text("one\r\ntwo"), "one{enter}two");
    }

    #[test]
    fn test_blind_payload() {
        assert_eq!(SendText::blind("a!").payload(), "{Blind}a{!}");
        assert_eq!(SendText::from("a!").payload(), "a{!}");
    }

    #[test]
    fn test_key_delay_command() {
        assert_eq!(KeyDelay::default().command(), "setKeyDelay;;;");
        let delay = KeyDelay {
            delay: Some(10),
            duration: Some(-1),
            play: true,
        };
        assert_eq!(delay.command(), "setKeyDelay;10;-1;Play");
    }
}
