//! Canonical key to action mapping.

use std::collections::HashMap;
use tracing::debug;

use crate::action::HotkeyAction;
use crate::error::{AhkError, Result};
use crate::hotkey::HotkeyDescriptor;

/// A registered hotkey action.
#[derive(Debug, Clone)]
pub struct HotkeyEntry {
    pub action: HotkeyAction,
    /// Run as soon as the notification arrives instead of going through the queue.
    pub instant: bool,
}

/// Maps canonical hotkey keys to the action they trigger.
#[derive(Debug, Default)]
pub struct HotkeyRegistry {
    entries: HashMap<String, HotkeyEntry>,
}

impl HotkeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a placeholder entry for each descriptor.
    ///
    /// Returns the canonical keys in descriptor order. Keys that already have
    /// an action keep it.
    pub fn register_bulk(&mut self, descriptors: &[HotkeyDescriptor]) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            descriptor.validate()?;
            let key = descriptor.canonical_key();
            self.entries.entry(key.clone()).or_insert_with(|| HotkeyEntry {
                action: HotkeyAction::noop(),
                instant: false,
            });
            debug!(key = %key, "reserved hotkey");
            keys.push(key);
        }
        Ok(keys)
    }

    /// Bind an action to a canonical key, replacing any previous binding.
    pub fn insert(&mut self, key: impl Into<String>, action: HotkeyAction, instant: bool) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(AhkError::invalid_action(key, "hotkey key is empty"));
        }
        debug!(key = %key, instant, "registered hotkey action");
        self.entries.insert(key, HotkeyEntry { action, instant });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&HotkeyEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;

    #[test]
    fn test_register_bulk_reserves_placeholders() {
        let mut registry = HotkeyRegistry::new();
        let keys = registry
            .register_bulk(&[
                HotkeyDescriptor::literal("F1"),
                HotkeyDescriptor::combination(["a", "b"]),
                HotkeyDescriptor::modifier_key([Modifier::Shift, Modifier::Control], "a"),
            ])
            .unwrap();

        assert_eq!(keys, vec!["F1", "a b", "+^a"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("+^a").unwrap().action.is_noop());
        assert!(!registry.get("F1").unwrap().instant);
    }

    #[test]
    fn test_bulk_keeps_existing_action() {
        let mut registry = HotkeyRegistry::new();
        registry
            .insert("F1", HotkeyAction::new(|| async { anyhow::Ok(()) }), true)
            .unwrap();
        registry
            .register_bulk(&[HotkeyDescriptor::literal("F1")])
            .unwrap();

        let entry = registry.get("F1").unwrap();
        assert!(!entry.action.is_noop());
        assert!(entry.instant);
    }

    #[test]
    fn test_unknown_key_is_absent() {
        let registry = HotkeyRegistry::new();
        assert!(registry.get("F9").is_none());
        assert!(!registry.contains("F9"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_rejects_empty_key() {
        let mut registry = HotkeyRegistry::new();
        let err = registry
            .insert("  ", HotkeyAction::noop(), false)
            .unwrap_err();
        assert!(matches!(err, AhkError::InvalidAction { .. }));
    }
}
