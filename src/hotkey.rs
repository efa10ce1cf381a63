//! Hotkey descriptors, canonical keys and registration script generation.
//!
//! A hotkey can be described three ways: a literal key notation (`"F1"`),
//! a combination of keys pressed together (`a & b`), or a set of modifiers
//! plus a base key (`control` + `shift` + `a`). Each shape resolves to one
//! canonical key string. The generated hotkeys script writes that string to
//! its stdout whenever the binding fires, and the same string is used to
//! look the action up in the [`HotkeyRegistry`](crate::registry::HotkeyRegistry).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AhkError, Result};

/// Script prefix for bindings whose keypress still reaches the foreground window.
const PASS_THROUGH_PREFIX: &str = "~";

/// Header of the generated hotkeys script.
///
/// `write` flushes after every notification so the bridge sees each trigger
/// as soon as it happens.
const SCRIPT_HEADER: &str = "#NoTrayIcon
stdout := FileOpen(\"*\", \"w `n\")

write(x) {
  global stdout
  stdout.Write(x \"`n\")
  stdout.Read(0)
}
";

/// A keyboard modifier, as understood by the engine's hotkey syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    #[serde(alias = "super", alias = "meta", alias = "cmd")]
    Win,
    Alt,
    #[serde(alias = "ctrl")]
    Control,
    Shift,
    /// Fire regardless of which other modifiers are held.
    Any,
}

impl Modifier {
    /// The engine's single-character symbol for this modifier.
    pub const fn symbol(self) -> char {
        match self {
            Self::Win => '#',
            Self::Alt => '!',
            Self::Control => '^',
            Self::Shift => '+',
            Self::Any => '*',
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "win" | "super" | "meta" | "cmd" => Some(Self::Win),
            "alt" => Some(Self::Alt),
            "ctrl" | "control" => Some(Self::Control),
            "shift" => Some(Self::Shift),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

/// Describes one hotkey binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub enum HotkeyDescriptor {
    /// A key notation used verbatim, e.g. `F1` or `^!r`.
    Literal(String),
    /// Keys that must be held together, e.g. `a & b`.
    Combination { keys: Vec<String>, pass_through: bool },
    /// Modifier symbols followed by a base key.
    ModifierKey {
        modifiers: Vec<Modifier>,
        key: String,
        pass_through: bool,
    },
}

impl HotkeyDescriptor {
    pub fn literal(key: impl Into<String>) -> Self {
        Self::Literal(key.into())
    }

    pub fn combination<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Combination {
            keys: keys.into_iter().map(Into::into).collect(),
            pass_through: false,
        }
    }

    pub fn modifier_key(modifiers: impl Into<Vec<Modifier>>, key: impl Into<String>) -> Self {
        Self::ModifierKey {
            modifiers: modifiers.into(),
            key: key.into(),
            pass_through: false,
        }
    }

    /// Let the physical keypress reach the foreground application as well.
    ///
    /// Literal notations carry their own prefix, so this only affects the
    /// other two shapes.
    pub fn with_pass_through(mut self, enabled: bool) -> Self {
        match &mut self {
            Self::Literal(_) => {}
            Self::Combination { pass_through, .. } | Self::ModifierKey { pass_through, .. } => {
                *pass_through = enabled;
            }
        }
        self
    }

    pub fn pass_through(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Combination { pass_through, .. } | Self::ModifierKey { pass_through, .. } => {
                *pass_through
            }
        }
    }

    /// The string the hotkeys script reports and the registry is keyed by.
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Literal(key) => key.clone(),
            Self::Combination { keys, .. } => keys.join(" "),
            Self::ModifierKey { .. } => self.script_binding(),
        }
    }

    /// The key combination as written on the left of `::` in the script.
    pub fn script_binding(&self) -> String {
        match self {
            Self::Literal(key) => key.clone(),
            Self::Combination { keys, .. } => keys.join(" & "),
            Self::ModifierKey { modifiers, key, .. } => {
                let mut binding: String = modifiers.iter().map(|m| m.symbol()).collect();
                binding.push_str(&escape_braces(key));
                binding
            }
        }
    }

    /// One line of the hotkeys script: the binding and the notification it writes.
    pub fn script_line(&self) -> String {
        let prefix = if self.pass_through() {
            PASS_THROUGH_PREFIX
        } else {
            ""
        };
        format!(
            "{}{}::write(\"{}\")",
            prefix,
            self.script_binding(),
            self.canonical_key()
        )
    }

    /// Command asking the runner to create this binding while the session is live.
    pub fn registration_command(&self) -> String {
        let prefix = if self.pass_through() {
            PASS_THROUGH_PREFIX
        } else {
            ""
        };
        format!(
            "setHotkey;{}{};{}",
            prefix,
            self.script_binding(),
            self.canonical_key()
        )
    }

    /// Check that the descriptor resolves to something a binding can fire on.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Literal(key) if key.trim().is_empty() => {
                Err(AhkError::invalid_hotkey(key, "key cannot be empty"))
            }
            Self::Combination { keys, .. } if keys.len() < 2 => Err(AhkError::invalid_hotkey(
                keys.join(" & "),
                "a combination needs at least two keys",
            )),
            Self::Combination { keys, .. } if keys.iter().any(|k| k.trim().is_empty()) => Err(
                AhkError::invalid_hotkey(keys.join(" & "), "combination contains an empty key"),
            ),
            Self::ModifierKey { key, .. } if key.is_empty() => Err(AhkError::invalid_hotkey(
                self.script_binding(),
                "no key specified",
            )),
            _ if self.canonical_key().contains(['"', '\n', '\r']) => Err(
                AhkError::invalid_hotkey(self.canonical_key(), "key cannot contain '\"' or a line break"),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for HotkeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

impl From<&str> for HotkeyDescriptor {
    fn from(key: &str) -> Self {
        Self::Literal(key.to_string())
    }
}

impl From<String> for HotkeyDescriptor {
    fn from(key: String) -> Self {
        Self::Literal(key)
    }
}

/// Parse a human-friendly notation such as `ctrl+shift+a`, `~alt+f4` or `a & b`.
///
/// A string without `+` or `&` is taken as a literal engine notation.
impl FromStr for HotkeyDescriptor {
    type Err = AhkError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AhkError::invalid_hotkey(s, "empty hotkey string"));
        }

        let (pass_through, body) = match trimmed.strip_prefix(PASS_THROUGH_PREFIX) {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, trimmed),
        };

        if body.contains(" & ") {
            let keys: Vec<String> = body.split(" & ").map(|k| k.trim().to_string()).collect();
            let descriptor = Self::combination(keys).with_pass_through(pass_through);
            descriptor.validate()?;
            return Ok(descriptor);
        }

        let (modifier_part, key) = if let Some(rest) = body.strip_suffix("++") {
            (rest, "+")
        } else {
            match body.rfind('+') {
                Some(idx) if idx > 0 => (&body[..idx], &body[idx + 1..]),
                _ => {
                    let descriptor = Self::Literal(trimmed.to_string());
                    descriptor.validate()?;
                    return Ok(descriptor);
                }
            }
        };

        if key.trim().is_empty() {
            return Err(AhkError::invalid_hotkey(s, "no key specified"));
        }

        let mut modifiers = Vec::new();
        for part in modifier_part.split('+').map(str::trim) {
            let modifier = Modifier::parse(part)
                .ok_or_else(|| AhkError::invalid_hotkey(s, format!("unknown modifier '{}'", part)))?;
            if modifiers.contains(&modifier) {
                return Err(AhkError::invalid_hotkey(
                    s,
                    format!("modifier '{}' given twice", part),
                ));
            }
            modifiers.push(modifier);
        }

        let descriptor = Self::modifier_key(modifiers, key.trim()).with_pass_through(pass_through);
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Generate the complete hotkeys script for the notification process.
pub fn registration_script(descriptors: &[HotkeyDescriptor]) -> String {
    let mut script = String::from(SCRIPT_HEADER);
    for descriptor in descriptors {
        script.push_str(&descriptor.script_line());
        script.push('\n');
    }
    script
}

/// Escape `{` and `}` so the engine reads them as literal keys.
fn escape_braces(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '{' => escaped.push_str("{{}"),
            '}' => escaped.push_str("{}}"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The JSON shapes a descriptor may take in a config file.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Literal(String),
    Combination {
        keys: Vec<String>,
        #[serde(
            default,
            alias = "noInterrupt",
            alias = "no_interrupt",
            skip_serializing_if = "is_false"
        )]
        pass_through: bool,
    },
    ModifierKey {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<Modifier>,
        key: String,
        #[serde(
            default,
            alias = "noInterrupt",
            alias = "no_interrupt",
            skip_serializing_if = "is_false"
        )]
        pass_through: bool,
    },
}

impl TryFrom<RawDescriptor> for HotkeyDescriptor {
    type Error = AhkError;

    fn try_from(raw: RawDescriptor) -> Result<Self> {
        let descriptor = match raw {
            RawDescriptor::Literal(key) => Self::Literal(key),
            RawDescriptor::Combination { keys, pass_through } => {
                Self::Combination { keys, pass_through }
            }
            RawDescriptor::ModifierKey {
                modifiers,
                key,
                pass_through,
            } => Self::ModifierKey {
                modifiers,
                key,
                pass_through,
            },
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl From<HotkeyDescriptor> for RawDescriptor {
    fn from(descriptor: HotkeyDescriptor) -> Self {
        match descriptor {
            HotkeyDescriptor::Literal(key) => Self::Literal(key),
            HotkeyDescriptor::Combination { keys, pass_through } => {
                Self::Combination { keys, pass_through }
            }
            HotkeyDescriptor::ModifierKey {
                modifiers,
                key,
                pass_through,
            } => Self::ModifierKey {
                modifiers,
                key,
                pass_through,
            },
        }
    }
}
