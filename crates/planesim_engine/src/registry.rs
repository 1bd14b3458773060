//! Priority-ordered component registry with a dirty bit

use crate::component::ComponentRef;

struct Entry {
    component: ComponentRef,
    priority: i32,
}

/// Insertion-ordered components, lazily re-sorted by update priority
///
/// Adding a component marks the registry dirty. [`sort_if_dirty`](Self::sort_if_dirty)
/// re-establishes priority order with a stable sort, so components of equal
/// priority keep their registration order, and does nothing when clean.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    dirty: bool,
    sorts: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component; its priority is read now and cached
    pub fn add(&mut self, component: ComponentRef) {
        let priority = component.borrow().update_priority();
        self.entries.push(Entry { component, priority });
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sort by priority if anything was added since the last sort
    ///
    /// Returns whether a sort happened.
    pub fn sort_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.entries.sort_by_key(|e| e.priority);
        self.dirty = false;
        self.sorts += 1;
        true
    }

    /// Number of sorts performed so far
    pub fn sort_count(&self) -> usize {
        self.sorts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Components in current order
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRef> {
        self.entries.iter().map(|e| &e.component)
    }

    /// Drop every entry, returning them in current order
    pub fn drain(&mut self) -> Vec<ComponentRef> {
        self.dirty = false;
        self.entries.drain(..).map(|e| e.component).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{shared, GameComponent};
    use crate::error::ComponentError;

    struct Named {
        name: String,
        priority: i32,
        enabled: bool,
    }

    impl Named {
        fn new(name: &str, priority: i32) -> Self {
            Self {
                name: name.to_string(),
                priority,
                enabled: true,
            }
        }
    }

    impl GameComponent for Named {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn update_priority(&self) -> i32 {
            self.priority
        }

        fn update(&mut self, _delta: f64) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    fn names(registry: &Registry) -> Vec<String> {
        registry.iter().map(|c| c.borrow().name().to_string()).collect()
    }

    #[test]
    fn test_stable_sort_by_priority() {
        let mut registry = Registry::new();
        for (name, priority) in [("a", 3), ("b", 1), ("c", 1), ("d", 2)] {
            registry.add(shared(Named::new(name, priority)));
        }

        assert!(registry.sort_if_dirty());
        assert_eq!(names(&registry), ["b", "c", "d", "a"]);
    }

    #[test]
    fn test_clean_registry_is_not_resorted() {
        let mut registry = Registry::new();
        registry.add(shared(Named::new("a", 0)));

        assert!(registry.sort_if_dirty());
        assert!(!registry.sort_if_dirty());
        assert!(!registry.sort_if_dirty());
        assert_eq!(registry.sort_count(), 1);
    }

    #[test]
    fn test_add_marks_dirty() {
        let mut registry = Registry::new();
        assert!(!registry.is_dirty());
        registry.add(shared(Named::new("a", 0)));
        assert!(registry.is_dirty());
    }

    #[test]
    fn test_priority_is_cached_at_registration() {
        let mut registry = Registry::new();
        let late = shared(Named::new("late", 5));
        registry.add(late.clone());
        registry.add(shared(Named::new("early", 1)));

        // Changing the priority afterwards has no effect on ordering
        late.borrow_mut().priority = -10;
        registry.sort_if_dirty();
        assert_eq!(names(&registry), ["early", "late"]);
    }

    #[test]
    fn test_same_component_twice() {
        let mut registry = Registry::new();
        let c = shared(Named::new("twice", 0));
        registry.add(c.clone());
        registry.add(c);
        assert_eq!(registry.len(), 2);
    }
}
