//! # Integration Flows
//!
//! Registration, lookup, async waiting and injection across container trees.
//!
//! ## Flows Tested:
//!
//! 1. **Override / inheritance**: closest container wins, nothing leaks upward
//! 2. **Async waits**: a child waiting on a key registered later at the root
//! 3. **Cancellation**: cancel signals beat late registrations
//! 4. **Injection**: per-scope instances whose fields follow child overrides

#[cfg(test)]
mod tests {
    use crate::init_test_logging;
    use parking_lot::Mutex;
    use scope_registry::{
        Binding, Container, ContainerId, Dependency, Injected, Key, Registration, ResolutionState,
        ResolveError, Scope,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn flag(container: &Container) -> Option<bool> {
        container.resolve_as::<bool>("flag").map(|v| *v)
    }

    /// Request handler registered once at the root and resolved per request.
    struct Handler {
        verbose: Injected<bool>,
        region: Injected<String>,
    }

    fn app_root() -> Container {
        let root = Container::new();
        root.register_value("verbose", false);
        root.register_value("region", "eu-west".to_string());

        let verbose = root.injection::<bool>("verbose", Binding::Scope);
        let region = root.injection::<String>("region", Binding::Container);
        root.register_type(move |scope: &Scope| Handler {
            verbose: verbose.bind(scope),
            region: region.bind(scope),
        });
        root
    }

    // =============================================================================
    // OVERRIDE AND INHERITANCE
    // =============================================================================

    #[test]
    fn test_child_override_scenario() {
        init_test_logging();
        let root = Container::new();
        root.register_value("flag", true);
        let child = Container::child(&root);
        let _span = scope_telemetry::container_span!("request", container = %child.id()).entered();
        child.register_value("flag", false);
        scope_telemetry::log_event!(debug, child.id(), "Override registered", key = "flag");

        assert_eq!(flag(&child), Some(false));
        assert_eq!(flag(&root), Some(true));
    }

    #[tokio::test]
    async fn test_request_span_wraps_async_resolution() {
        use tracing::Instrument;

        init_test_logging();
        let root = Container::new();
        let request = Container::child(&root);
        let span = scope_telemetry::container_span!("request", container = %request.id());

        let pending = request.resolve_async_as::<u16>("port");
        root.register_value("port", 8080u16);

        let port = async {
            let port = pending.await.expect("registered");
            scope_telemetry::log_event!(info, request.id(), "Request resolved port", port = *port);
            *port
        }
        .instrument(span)
        .await;
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_deep_chain_resolves_closest() {
        init_test_logging();
        let root = Container::new();
        let mut chain = vec![root.clone()];
        for depth in 1..=5u32 {
            let next = Container::child(chain.last().expect("non-empty"));
            if depth % 2 == 0 {
                next.register_value("depth", depth);
            }
            chain.push(next);
        }
        root.register_value("depth", 0u32);

        let seen: Vec<u32> = chain
            .iter()
            .map(|c| *c.resolve_as::<u32>("depth").expect("visible"))
            .collect();
        assert_eq!(seen, vec![0, 0, 2, 2, 4, 4]);
    }

    #[test]
    fn test_siblings_are_isolated() {
        init_test_logging();
        let root = Container::new();
        let left = Container::child(&root);
        let right = Container::child(&root);

        left.register_value("side", "left");

        assert!(right.resolve("side").is_none());
        assert!(root.resolve("side").is_none());
    }

    #[test]
    fn test_subscriber_tree_fanout() {
        init_test_logging();
        let root = Container::new();
        let child = Container::child(&root);
        let grandchild = Container::child(&child);

        let heard: Arc<Mutex<Vec<(ContainerId, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&heard);
        let listener = grandchild.id();
        let _sub = grandchild.subscribe(move |registration: &Registration| {
            scope_telemetry::log_key_event!(debug, listener, "Heard registration", registration.key);
            sink.lock()
                .push((registration.container, registration.key.to_string()));
        });

        root.register_value("a", 1u8);
        child.register_value("b", 2u8);
        grandchild.register_value("c", 3u8);

        assert_eq!(
            *heard.lock(),
            vec![
                (root.id(), "a".to_string()),
                (child.id(), "b".to_string()),
                (grandchild.id(), "c".to_string()),
            ]
        );
    }

    // =============================================================================
    // ASYNC WAITS
    // =============================================================================

    #[tokio::test]
    async fn test_child_waits_for_root_registration() {
        init_test_logging();
        let root = Container::new();
        let child = Container::child(&root);

        let pending = child.resolve_async("num");
        assert_eq!(pending.state(), ResolutionState::Pending);

        let registrar = root.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            registrar.register_value("num", 7i64);
        });

        let value = timeout(Duration::from_secs(2), pending)
            .await
            .expect("registered within timeout")
            .expect("resolved");
        assert_eq!(*value.downcast::<i64>().expect("i64"), 7);
        assert_eq!(root.subscriber_count(), 0);
        assert_eq!(child.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_async_value_is_produced_for_waiting_container() {
        init_test_logging();
        let root = Container::new();
        let child = Container::child(&root);

        let pending = child.resolve_async_as::<ContainerId>("who");
        let registrar = root.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            registrar.register_factory("who", |scope: &Scope| {
                Arc::new(scope.container().id()) as Dependency
            });
        });

        let who = timeout(Duration::from_secs(2), pending)
            .await
            .expect("registered")
            .expect("typed");
        assert_eq!(*who, child.id());
    }

    #[tokio::test]
    async fn test_typed_async_reports_mismatch() {
        init_test_logging();
        let root = Container::new();
        root.register_value("num", 1u8);

        let result = root.resolve_async_as::<String>("num").await;

        assert!(matches!(result, Err(ResolveError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_cancel_signal_beats_late_registration() {
        init_test_logging();
        let root = Container::new();

        let pending = root.resolve_async_with_cancel("num", async {
            sleep(Duration::from_millis(10)).await;
            "deadline passed".to_string()
        });

        let registrar = root.clone();
        let late = tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            registrar.register_value("num", 1u8);
        });

        let err = pending.await.expect_err("cancelled first");
        assert_eq!(err.to_string(), "resolution cancelled: deadline passed");
        assert_eq!(err.into_cancel_reason().as_deref(), Some("deadline passed"));

        late.await.expect("registrar task");
        assert_eq!(root.metrics().snapshot().async_cancelled, 1);
        assert_eq!(root.metrics().pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_wait_can_be_bounded_by_timeout() {
        init_test_logging();
        let root = Container::new();

        let outcome = timeout(Duration::from_millis(30), root.resolve_async("never")).await;

        assert!(outcome.is_err());
        assert_eq!(root.subscriber_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_waiters_each_resolve_once() {
        init_test_logging();
        let root = Container::new();
        let resolved = Arc::new(AtomicUsize::new(0));

        let mut waiters = Vec::new();
        for n in 0..16u32 {
            let child = Container::child(&root);
            let counter = Arc::clone(&resolved);
            waiters.push(tokio::spawn(async move {
                let value = child
                    .resolve_async_as::<u32>(format!("slot-{n}"))
                    .await
                    .expect("resolved");
                counter.fetch_add(1, Ordering::SeqCst);
                *value
            }));
        }

        for n in 0..16u32 {
            let registrar = root.clone();
            tokio::spawn(async move {
                registrar.register_value(format!("slot-{n}"), n * 10);
            });
        }

        for (n, waiter) in waiters.into_iter().enumerate() {
            let value = timeout(Duration::from_secs(5), waiter)
                .await
                .expect("no deadlock")
                .expect("task");
            assert_eq!(value, n as u32 * 10);
        }
        assert_eq!(resolved.load(Ordering::SeqCst), 16);
        assert_eq!(root.subscriber_count(), 0);
    }

    // =============================================================================
    // INJECTION
    // =============================================================================

    #[test]
    fn test_injected_field_follows_request_override() {
        init_test_logging();
        let root = app_root();
        let request = Container::child(&root);
        request.register_value("verbose", true);
        request.register_value("region", "us-east".to_string());

        let handler = request
            .resolve_as::<Handler>(Key::of::<Handler>())
            .expect("registered at root");

        // Scope binding follows the request; container binding stays at root.
        assert_eq!(handler.verbose.get().as_deref(), Some(&true));
        assert_eq!(handler.region.get().as_deref().map(String::as_str), Some("eu-west"));
    }

    #[test]
    fn test_one_handler_per_request_scope() {
        init_test_logging();
        let root = app_root();
        let first_request = Container::child(&root);
        let second_request = Container::child(&root);

        let a1 = first_request.resolve_as::<Handler>(Key::of::<Handler>()).expect("class");
        let a2 = first_request.resolve_as::<Handler>(Key::of::<Handler>()).expect("class");
        let b = second_request.resolve_as::<Handler>(Key::of::<Handler>()).expect("class");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_root_cannot_resolve_request_only_class() {
        init_test_logging();
        struct Session;

        let root = app_root();
        let request = Container::child(&root);
        request.register_type(|_: &Scope| Session);

        assert!(request.resolve_as::<Session>(Key::of::<Session>()).is_some());
        assert!(root.resolve_as::<Session>(Key::of::<Session>()).is_none());
    }

    #[test]
    fn test_injected_field_reads_late_registration() {
        init_test_logging();
        let root = Container::new();
        let field = root.injection::<u16>("port", Binding::Scope).bind(&root.scope());

        assert!(field.get().is_none());
        assert!(matches!(field.get_or_err(), Err(ResolveError::Unresolved { .. })));

        root.register_value("port", 8080u16);

        assert_eq!(field.get().as_deref(), Some(&8080));
    }

    #[tokio::test]
    async fn test_async_wait_for_class_registered_later() {
        init_test_logging();
        let root = app_root();
        let request = Container::child(&root);
        request.register_value("verbose", true);

        struct Audit {
            verbose: Injected<bool>,
        }

        let pending = request.resolve_async_as::<Audit>(Key::of::<Audit>());
        let verbose = root.injection::<bool>("verbose", Binding::Scope);
        root.register_type(move |scope: &Scope| Audit {
            verbose: verbose.bind(scope),
        });

        let audit = timeout(Duration::from_secs(1), pending)
            .await
            .expect("registered")
            .expect("typed");
        assert_eq!(audit.verbose.get().as_deref(), Some(&true));
        assert!(Arc::ptr_eq(
            &audit,
            &request.resolve_as::<Audit>(Key::of::<Audit>()).expect("cached")
        ));
    }
}
