//! # Store Backends and Forks
//!
//! Custom [`Store`] implementations plugged into containers, and how each
//! capability combination behaves when the container is forked.

#[cfg(test)]
mod tests {
    use crate::init_test_logging;
    use parking_lot::Mutex;
    use scope_registry::{Container, ContainerError, Descriptor, Key, Store, StoreError};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Ordered backend that can enumerate but not clone itself.
    #[derive(Default)]
    struct OrderedStore {
        entries: BTreeMap<String, (Key, Descriptor)>,
    }

    impl Store for OrderedStore {
        fn get(&self, key: &Key) -> Option<Descriptor> {
            self.entries.get(&key.to_string()).map(|(_, d)| d.clone())
        }

        fn set(&mut self, key: Key, descriptor: Descriptor) {
            self.entries.insert(key.to_string(), (key, descriptor));
        }

        fn for_each(&self, visit: &mut dyn FnMut(&Key, &Descriptor)) -> Result<(), StoreError> {
            for (key, descriptor) in self.entries.values() {
                visit(key, descriptor);
            }
            Ok(())
        }
    }

    /// Write-only view over an external map: no enumeration, no cloning.
    struct OpaqueStore {
        entries: Arc<Mutex<Vec<(Key, Descriptor)>>>,
    }

    impl Store for OpaqueStore {
        fn get(&self, key: &Key) -> Option<Descriptor> {
            self.entries
                .lock()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, d)| d.clone())
        }

        fn set(&mut self, key: Key, descriptor: Descriptor) {
            let mut entries = self.entries.lock();
            entries.retain(|(k, _)| *k != key);
            entries.push((key, descriptor));
        }

        fn backend_name(&self) -> &'static str {
            "opaque"
        }
    }

    /// Clonable backend counting how often it was cloned.
    #[derive(Clone, Default)]
    struct CountingStore {
        entries: Vec<(Key, Descriptor)>,
        clones: Arc<AtomicUsize>,
    }

    impl Store for CountingStore {
        fn get(&self, key: &Key) -> Option<Descriptor> {
            self.entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, d)| d.clone())
        }

        fn set(&mut self, key: Key, descriptor: Descriptor) {
            self.entries.retain(|(k, _)| *k != key);
            self.entries.push((key, descriptor));
        }

        fn try_clone(&self) -> Option<Box<dyn Store>> {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(self.clone()))
        }
    }

    // =============================================================================
    // FORKS
    // =============================================================================

    #[test]
    fn test_enumerable_backend_forks_through_copy() {
        init_test_logging();
        let source = Container::with_store(Box::new(OrderedStore::default()));
        source.register_value("b", 2u8);
        source.register_value("a", 1u8);

        let fork = source.fork().expect("enumerable backend forks");

        assert_eq!(fork.local_keys().len(), 2);
        assert!(fork
            .find("a", true)
            .expect("copied")
            .ptr_eq(&source.find("a", true).expect("own")));

        fork.register_value("c", 3u8);
        assert!(source.resolve("c").is_none());
        assert_eq!(source.local_keys(), vec![Key::from("a"), Key::from("b")]);
    }

    #[test]
    fn test_opaque_backend_cannot_fork() {
        init_test_logging();
        let shared = Arc::new(Mutex::new(Vec::new()));
        let source = Container::with_store(Box::new(OpaqueStore {
            entries: Arc::clone(&shared),
        }));
        source.register_value("a", 1u8);

        assert_eq!(shared.lock().len(), 1);
        assert!(source.local_keys().is_empty());

        match source.fork() {
            Err(ContainerError::BackendContractViolation { backend, source }) => {
                assert_eq!(backend, "opaque");
                assert_eq!(source, StoreError::EnumerationUnsupported { backend: "opaque" });
            }
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_clonable_backend_is_cloned_once_per_fork() {
        init_test_logging();
        let store = CountingStore::default();
        let clones = Arc::clone(&store.clones);
        let source = Container::with_store(Box::new(store));
        source.register_value("a", 1u8);

        let first = source.fork().expect("fork");
        let _second = first.fork().expect("fork of fork");

        assert_eq!(clones.load(Ordering::SeqCst), 2);
        assert_eq!(*first.resolve_as::<u8>("a").expect("shared"), 1);
    }

    #[test]
    fn test_fork_of_child_drops_ancestry() {
        init_test_logging();
        let root = Container::new();
        root.register_value("inherited", true);
        let child = Container::child(&root);
        child.register_value("local", true);

        let fork = child.fork().expect("fork");

        assert!(fork.parent().is_none());
        assert!(fork.resolve("local").is_some());
        assert!(fork.resolve("inherited").is_none());
    }

    #[test]
    fn test_set_through_shared_slot_is_visible_on_both_sides() {
        init_test_logging();
        let source = Container::new();
        source.register_value("mode", "a");
        let fork = source.fork().expect("fork");

        fork.find("mode", true).expect("shared").set_value("b");
        assert_eq!(*source.resolve_as::<&str>("mode").expect("mode"), "b");

        fork.register_value("mode", "c");
        assert_eq!(*source.resolve_as::<&str>("mode").expect("mode"), "b");
        assert_eq!(*fork.resolve_as::<&str>("mode").expect("mode"), "c");
    }

    #[test]
    fn test_source_reregistration_leaves_cloned_fork_alone() {
        init_test_logging();
        let source = Container::with_store(Box::new(CountingStore::default()));
        source.register_value("a", 1u32);
        let fork = source.fork().expect("clonable backend forks");

        source.register_value("a", 3u32);

        assert_eq!(*source.resolve_as::<u32>("a").expect("a"), 3);
        assert_eq!(*fork.resolve_as::<u32>("a").expect("a"), 1);
    }

    #[test]
    fn test_fork_metrics_are_independent() {
        init_test_logging();
        let source = Container::new();
        source.register_value("a", 1u8);

        let fork = source.fork().expect("fork");
        fork.register_value("b", 2u8);

        assert_eq!(source.metrics().snapshot().forks, 1);
        assert_eq!(source.metrics().snapshot().registrations, 1);
        assert_eq!(fork.metrics().snapshot().registrations, 1);
    }
}
