//! Named module registry.

use std::collections::HashMap;

use tether_core::HandleId;

/// Registry of module objects reachable from script code.
///
/// Names are unique and insertion order is irrelevant. Re-registration under
/// an existing name displaces the previous entry (last write wins); entries
/// are removed only at bridge teardown.
#[derive(Debug, Default)]
pub(crate) struct ModuleRegistry {
    entries: HashMap<String, HandleId>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an association; returns the displaced id, if any.
    pub(crate) fn insert(&mut self, name: &str, id: HandleId) -> Option<HandleId> {
        self.entries.insert(name.to_owned(), id)
    }

    /// Look up the id registered under `name`.
    pub(crate) fn get(&self, name: &str) -> Option<HandleId> {
        self.entries.get(name).copied()
    }

    /// Number of registered modules.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests empty registry initialization.
    ///
    /// # Panics
    /// Panics if assertions fail during test execution.
    #[test]
    fn test_empty_registry() {
        let registry = ModuleRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.get("Anything").is_none());
    }

    /// Tests that re-registration displaces the previous entry.
    ///
    /// # Panics
    /// Panics if assertions fail during test execution.
    #[test]
    fn test_last_write_wins() {
        let mut registry = ModuleRegistry::new();
        let first = HandleId::fresh();
        let second = HandleId::fresh();

        assert_eq!(registry.insert("Storage", first), None);
        assert_eq!(registry.insert("Storage", second), Some(first));
        assert_eq!(registry.get("Storage"), Some(second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut registry = ModuleRegistry::new();
        let _ = registry.insert("Storage", HandleId::fresh());
        let _ = registry.insert("Clipboard", HandleId::fresh());
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert_eq!(registry.len(), 0);
        assert!(registry.get("Storage").is_none());
    }
}
