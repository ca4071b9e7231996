//! # Example: sticky_screens
//!
//! Demonstrates late-joining screens picking up state through sticky events.
//!
//! Shows how to:
//! - Declare handlers with a [`HandlerTable`] and pick a [`ThreadMode`] per handler.
//! - Post sticky events and replay them with [`EventBus::register_sticky`].
//! - Deliver through an event hierarchy (`ThemeChanged` is-a `SettingsChanged`).
//! - Observe diagnostics with [`NoSubscriberEvent`] and [`SubscriberFaultEvent`].
//!
//! ## Flow
//! ```text
//! post_sticky(LoggedIn) ──► nobody listens yet ──► NoSubscriberEvent ──► Console
//! register_sticky(Profile) ──► replay LoggedIn ──► Profile (affinity loop)
//! post_sticky(ThemeChanged)
//!     ├─► Settings (SettingsChanged, Direct)
//!     └─► Analytics (ThemeChanged, Concurrent, fails) ──► SubscriberFaultEvent ──► Console
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=postbus=debug cargo run --example sticky_screens
//! ```

use std::any::{Any, TypeId};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use parking_lot::Mutex;
use postbus::{
    BusConfig, BusError, Event, EventBus, EventType, HandlerTable, NoSubscriberEvent, Subscriber,
    SubscriberFaultEvent, ThreadMode,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct LoggedIn {
    user: String,
}
impl Event for LoggedIn {}

#[derive(Debug, Clone, PartialEq)]
struct SettingsChanged {
    key: &'static str,
}
impl Event for SettingsChanged {}

#[derive(Debug, Clone, PartialEq)]
struct ThemeChanged {
    settings: SettingsChanged,
    dark: bool,
}
impl Event for ThemeChanged {
    fn parent() -> Option<EventType> {
        Some(EventType::of::<SettingsChanged>())
    }

    fn view(&self, ty: TypeId) -> Option<&dyn Any> {
        (ty == TypeId::of::<SettingsChanged>()).then_some(&self.settings as &dyn Any)
    }
}

/// Prints the bus's own diagnostics.
struct Console;

impl Subscriber for Console {
    fn handlers(table: &mut HandlerTable<Self>) {
        table
            .on::<NoSubscriberEvent>(ThreadMode::Direct, |_, e| {
                println!("[console] nobody handled {}", e.event.event_type());
                Ok(())
            })
            .on::<SubscriberFaultEvent>(ThreadMode::Direct, |_, e| {
                println!("[console] {} failed: {}", e.subscriber, e.fault.cause);
                Ok(())
            });
    }
}

/// Shows the logged-in user; must run on the affinity context.
struct Profile {
    shown: Mutex<mpsc::Sender<String>>,
}

impl Subscriber for Profile {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<LoggedIn>(ThreadMode::Affinity, |p, e| {
            println!("[profile] welcome, {}", e.user);
            let _ = p.shown.lock().send(e.user.clone());
            Ok(())
        });
    }
}

struct Settings;

impl Subscriber for Settings {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<SettingsChanged>(ThreadMode::Direct, |_, e| {
            println!("[settings] {} changed", e.key);
            Ok(())
        });
    }
}

struct Analytics;

impl Subscriber for Analytics {
    fn handlers(table: &mut HandlerTable<Self>) {
        table.on::<ThemeChanged>(ThreadMode::Concurrent, |_, e| {
            anyhow::ensure!(!e.dark, "dark theme is not tracked yet");
            Ok(())
        });
    }
}

fn main() -> Result<(), BusError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus = EventBus::builder(BusConfig::default()).build()?;
    bus.register(&Arc::new(Console))?;

    bus.post_sticky(LoggedIn {
        user: "ada".into(),
    })?;

    let (tx, rx) = mpsc::channel();
    let profile = Arc::new(Profile {
        shown: Mutex::new(tx),
    });
    bus.register_sticky(&profile)?;
    if let Ok(user) = rx.recv_timeout(Duration::from_secs(2)) {
        println!("[main] profile screen shows {user}");
    }

    bus.register(&Arc::new(Settings))?;
    bus.register(&Arc::new(Analytics))?;
    bus.post_sticky(ThemeChanged {
        settings: SettingsChanged { key: "theme" },
        dark: true,
    })?;

    // The analytics fault is reported from the worker pool.
    std::thread::sleep(Duration::from_millis(200));

    println!(
        "[main] current theme is dark: {}",
        bus.get_sticky::<ThemeChanged>().is_some_and(|t| t.dark)
    );
    bus.unregister(&profile);
    Ok(())
}
