use super::*;
use crate::bindings::Binding;
use crate::combo::Combo;
use crate::error::HotkeyError;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

fn combo(s: &str) -> Combo {
    Combo::parse(s).unwrap()
}

fn bound(c: &str, id: &str) -> Binding {
    Binding {
        combo: combo(c),
        template_id: Some(id.to_string()),
    }
}

fn unbound(c: &str) -> Binding {
    Binding {
        combo: combo(c),
        template_id: None,
    }
}

fn recorder() -> (OnFire, Arc<Mutex<Vec<String>>>) {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fired);
    let on_fire: OnFire = Arc::new(move |id: &str| sink.lock().push(id.to_string()));
    (on_fire, fired)
}

fn registry_with(backend: &MemoryBackend) -> HotkeyRegistry {
    HotkeyRegistry::new(Box::new(backend.clone()))
}

#[test]
fn reconcile_registers_only_bound_combos() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, _) = recorder();

    let report = registry.reconcile(
        &[bound("ctrl+shift+t", "a"), unbound("ctrl+shift+q")],
        &on_fire,
    );

    assert_eq!(report.registered, vec![combo("ctrl+shift+t")]);
    assert!(report.failures.is_empty());
    assert_eq!(registry.live_combos(), vec![combo("ctrl+shift+t")]);
    assert_eq!(
        backend.registered_combos(),
        BTreeSet::from([combo("ctrl+shift+t")])
    );
}

#[test]
fn firing_dispatches_captured_template_id() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, fired) = recorder();

    registry.reconcile(&[bound("ctrl+shift+t", "abc")], &on_fire);
    assert!(backend.fire(&combo("ctrl+shift+t")));
    assert_eq!(*fired.lock(), vec!["abc"]);
}

#[test]
fn second_reconcile_with_same_bindings_is_noop() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, _) = recorder();
    let bindings = [bound("ctrl+shift+t", "a"), bound("alt+f1", "b")];

    registry.reconcile(&bindings, &on_fire);
    let calls = backend.register_calls();
    let report = registry.reconcile(&bindings, &on_fire);

    assert!(report.is_noop());
    assert_eq!(backend.register_calls(), calls);
}

#[test]
fn rebind_repoints_without_reregistering() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, fired) = recorder();

    registry.reconcile(&[bound("ctrl+shift+t", "old")], &on_fire);
    let calls = backend.register_calls();
    let report = registry.reconcile(&[bound("ctrl+shift+t", "new")], &on_fire);

    assert_eq!(report.repointed, vec![combo("ctrl+shift+t")]);
    assert_eq!(backend.register_calls(), calls);
    assert_eq!(backend.repoint_calls(), 1);
    assert_eq!(registry.live_target(&combo("ctrl+shift+t")), Some("new"));

    backend.fire(&combo("ctrl+shift+t"));
    assert_eq!(*fired.lock(), vec!["new"]);
}

#[test]
fn rebind_is_not_visible_until_reconcile() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, fired) = recorder();

    let mut bindings = vec![bound("ctrl+shift+t", "old")];
    registry.reconcile(&bindings, &on_fire);
    bindings[0].template_id = Some("new".into());

    backend.fire(&combo("ctrl+shift+t"));
    assert_eq!(*fired.lock(), vec!["old"]);
}

#[test]
fn unbind_unregisters_and_stops_dispatch() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, fired) = recorder();

    registry.reconcile(&[bound("ctrl+shift+t", "a")], &on_fire);
    let report = registry.reconcile(&[unbound("ctrl+shift+t")], &on_fire);

    assert_eq!(report.unregistered, vec![combo("ctrl+shift+t")]);
    assert!(registry.live_combos().is_empty());
    assert!(!backend.fire(&combo("ctrl+shift+t")));
    assert!(fired.lock().is_empty());
}

#[test]
fn one_rejected_combo_does_not_block_others() {
    let backend = MemoryBackend::new();
    backend.reject(&combo("ctrl+shift+q"));
    let mut registry = registry_with(&backend);
    let (on_fire, _) = recorder();

    let report = registry.reconcile(
        &[
            bound("ctrl+shift+q", "a"),
            bound("ctrl+shift+t", "b"),
            bound("alt+f1", "c"),
        ],
        &on_fire,
    );

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        HotkeyError::RegistrationFailed { combo, .. } if combo == "ctrl+shift+q"
    ));
    assert_eq!(
        registry.live_combos(),
        vec![combo("alt+f1"), combo("ctrl+shift+t")]
    );
}

#[test]
fn timeout_is_reported_as_timed_out() {
    let backend = MemoryBackend::new();
    backend.time_out(&combo("alt+f1"));
    let mut registry = registry_with(&backend);
    let (on_fire, _) = recorder();

    let report = registry.reconcile(&[bound("alt+f1", "a"), bound("alt+f2", "b")], &on_fire);

    assert_eq!(
        report.failures,
        vec![HotkeyError::RegistrationTimedOut("alt+f1".into())]
    );
    assert_eq!(registry.live_combos(), vec![combo("alt+f2")]);
}

#[test]
fn failed_combo_is_retried_on_next_reconcile() {
    let backend = MemoryBackend::new();
    backend.reject(&combo("alt+f1"));
    let mut registry = registry_with(&backend);
    let (on_fire, _) = recorder();
    let bindings = [bound("alt+f1", "a")];

    registry.reconcile(&bindings, &on_fire);
    backend.allow(&combo("alt+f1"));
    let report = registry.reconcile(&bindings, &on_fire);

    assert_eq!(report.registered, vec![combo("alt+f1")]);
}

#[test]
fn unregister_all_then_fire_dispatches_nothing() {
    let backend = MemoryBackend::new();
    let mut registry = registry_with(&backend);
    let (on_fire, fired) = recorder();

    registry.reconcile(&[bound("ctrl+shift+t", "a"), bound("alt+f1", "b")], &on_fire);
    registry.unregister_all();
    registry.unregister_all();

    assert!(registry.live_combos().is_empty());
    assert!(backend.registered_combos().is_empty());
    assert!(!backend.fire(&combo("ctrl+shift+t")));
    assert!(!backend.fire(&combo("alt+f1")));
    assert!(fired.lock().is_empty());
}

#[test]
fn dropping_registry_releases_hooks() {
    let backend = MemoryBackend::new();
    let (on_fire, _) = recorder();
    {
        let mut registry = registry_with(&backend);
        registry.reconcile(&[bound("ctrl+shift+t", "a")], &on_fire);
        assert_eq!(backend.registered_combos().len(), 1);
    }
    assert!(backend.registered_combos().is_empty());
}

#[test]
fn unavailable_capability_is_reported_once() {
    let mut registry = HotkeyRegistry::unavailable("no display");
    let (on_fire, _) = recorder();
    let bindings = [bound("ctrl+shift+t", "a")];

    let first = registry.reconcile(&bindings, &on_fire);
    let second = registry.reconcile(&bindings, &on_fire);

    assert_eq!(
        first.failures,
        vec![HotkeyError::CapabilityUnavailable("no display".into())]
    );
    assert!(second.is_noop());
    assert!(!registry.is_available());
    assert_eq!(registry.unavailable_reason(), Some("no display"));
    assert!(registry.live_combos().is_empty());
}

#[test]
fn reconcile_inside_hook_callback_is_refused() {
    let backend = MemoryBackend::new();
    let registry = Arc::new(Mutex::new(registry_with(&backend)));
    let (on_fire, _) = recorder();

    let nested_report = Arc::new(Mutex::new(None));
    let nested = {
        let registry = Arc::clone(&registry);
        let report = Arc::clone(&nested_report);
        let inner_on_fire = on_fire.clone();
        Arc::new(move |_: &str| {
            assert!(in_hook_callback());
            // try_lock: the outer test does not hold the lock while firing.
            if let Some(mut registry) = registry.try_lock() {
                let r = registry.reconcile(&[bound("alt+f9", "x")], &inner_on_fire);
                *report.lock() = Some(r);
            }
        }) as OnFire
    };

    registry
        .lock()
        .reconcile(&[bound("ctrl+shift+t", "a")], &nested);
    assert!(backend.fire(&combo("ctrl+shift+t")));

    let report = nested_report.lock().take().expect("callback ran");
    assert!(report.is_noop());
    assert!(!in_hook_callback());
    assert_eq!(registry.lock().live_combos(), vec![combo("ctrl+shift+t")]);
}

#[test]
fn live_hooks_track_bound_set_over_random_sequences() {
    let combos = ["ctrl+shift+t", "ctrl+shift+q", "alt+f1", "cmd+k", "ctrl+alt+1"];
    let templates = ["t1", "t2", "t3"];

    for seed in 1..=20u64 {
        let backend = MemoryBackend::new();
        let mut registry = registry_with(&backend);
        let (on_fire, fired) = recorder();
        let mut declared: BTreeMap<String, Option<String>> = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..40 {
            let c = *combos.choose(&mut rng).unwrap();
            if rng.gen_ratio(1, 3) {
                if let Some(target) = declared.get_mut(c) {
                    *target = None;
                }
            } else {
                let target = templates.choose(&mut rng).unwrap();
                declared.insert(c.to_string(), Some(target.to_string()));
            }

            let bindings: Vec<Binding> = declared
                .iter()
                .map(|(c, t)| Binding {
                    combo: combo(c),
                    template_id: t.clone(),
                })
                .collect();
            registry.reconcile(&bindings, &on_fire);

            let expected: BTreeSet<Combo> = bindings
                .iter()
                .filter(|b| b.is_bound())
                .map(|b| b.combo.clone())
                .collect();
            assert_eq!(backend.registered_combos(), expected, "seed {seed}");
            assert_eq!(
                registry.live_combos().into_iter().collect::<BTreeSet<_>>(),
                expected
            );

            for b in &bindings {
                fired.lock().clear();
                let delivered = backend.fire(&b.combo);
                assert_eq!(delivered, b.is_bound());
                match &b.template_id {
                    Some(id) => assert_eq!(*fired.lock(), vec![id.clone()]),
                    None => assert!(fired.lock().is_empty()),
                }
            }
        }

        registry.unregister_all();
        assert!(backend.registered_combos().is_empty());
    }
}
