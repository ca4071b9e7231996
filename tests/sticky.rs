mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, ThreadId};

use common::*;
use parking_lot::Mutex;
use postbus::{BusConfig, EventBus, HandlerTable, Subscriber, ThreadMode};

#[derive(Debug, Clone, PartialEq)]
struct Level(u8);
impl postbus::Event for Level {}

#[test]
fn newer_sticky_event_replaces_the_older_one() {
    let bus = bus();
    bus.post_sticky(Level(1)).unwrap();
    bus.post_sticky(Level(2)).unwrap();
    assert_eq!(bus.get_sticky::<Level>().as_deref(), Some(&Level(2)));
}

/// Removes the sticky `Level` from inside its own handler.
struct Consumer {
    bus: EventBus,
    removed: Mutex<Vec<Option<u8>>>,
}

impl Subscriber for Consumer {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<Level>(ThreadMode::Direct, |c, _| {
            let removed = c.bus.remove_sticky::<Level>().map(|l| l.0);
            c.removed.lock().push(removed);
            Ok(())
        });
    }
}

#[test]
fn handler_sees_its_own_sticky_event_and_overwritten_ones_are_gone() {
    let bus = bus();
    let consumer = Arc::new(Consumer {
        bus: bus.clone(),
        removed: Mutex::new(Vec::new()),
    });

    bus.post_sticky(Level(1)).unwrap();
    bus.register(&consumer).unwrap();
    bus.post_sticky(Level(2)).unwrap();

    // The store was written before delivery, so the handler removed B itself.
    assert_eq!(*consumer.removed.lock(), [Some(2)]);
    // A was overwritten by B and is not resurrected.
    assert!(bus.get_sticky::<Level>().is_none());
    bus.unregister(&consumer);
}

#[test]
fn entries_are_independent_per_concrete_type() {
    let bus = bus();
    bus.post_sticky(Sound { volume: 1 }).unwrap();
    bus.post_sticky(bark(9)).unwrap();

    assert_eq!(bus.get_sticky::<Sound>().map(|s| s.volume), Some(1));
    assert_eq!(bus.get_sticky::<Bark>().map(|b| b.sound.volume), Some(9));

    assert!(!bus.remove_sticky_if_equal(&Sound { volume: 2 }));
    assert!(bus.remove_sticky_if_equal(&Sound { volume: 1 }));
    assert!(bus.get_sticky::<Sound>().is_none());
    assert!(bus.get_sticky::<Bark>().is_some());

    bus.remove_all_sticky();
    assert!(bus.get_sticky::<Bark>().is_none());
}

struct SoundFan {
    heard: Mutex<Vec<u8>>,
}

impl Subscriber for SoundFan {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<Sound>(ThreadMode::Direct, |f, s| {
            f.heard.lock().push(s.volume);
            Ok(())
        });
    }
}

fn fan() -> Arc<SoundFan> {
    Arc::new(SoundFan {
        heard: Mutex::new(Vec::new()),
    })
}

#[test]
fn sticky_registration_replays_descendants() {
    let bus = bus();
    bus.post_sticky(bark(7)).unwrap();

    let plain = fan();
    bus.register(&plain).unwrap();
    assert!(plain.heard.lock().is_empty());

    let late = fan();
    bus.register_sticky(&late).unwrap();
    assert_eq!(*late.heard.lock(), [7]);
}

#[test]
fn replay_matches_exact_type_without_inheritance() {
    let bus = bus_with(BusConfig {
        event_inheritance: false,
        ..BusConfig::default()
    });
    bus.post_sticky(bark(7)).unwrap();
    let late = fan();
    bus.register_sticky_with_priority(&late, 3).unwrap();
    assert!(late.heard.lock().is_empty());

    bus.post_sticky(Sound { volume: 4 }).unwrap();
    let later = fan();
    bus.register_sticky(&later).unwrap();
    assert_eq!(*later.heard.lock(), [4]);
}

struct PoolFan(Mutex<mpsc::Sender<ThreadId>>);

impl Subscriber for PoolFan {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<Level>(ThreadMode::Concurrent, |f, _| {
            let _ = f.0.lock().send(thread::current().id());
            Ok(())
        });
    }
}

#[test]
fn replay_is_routed_by_thread_mode() {
    let bus = bus();
    bus.post_sticky(Level(3)).unwrap();

    let (tx, rx) = mpsc::channel();
    bus.register_sticky(&Arc::new(PoolFan(Mutex::new(tx)))).unwrap();
    assert_ne!(rx.recv_timeout(WAIT).unwrap(), thread::current().id());
}
