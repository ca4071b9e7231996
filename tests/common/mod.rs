#![allow(dead_code)]

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use postbus::{AffinityExecutor, BusConfig, Event, EventBus, EventType, Executor, Job};

pub const WAIT: Duration = Duration::from_secs(5);

/// Shared, ordered record of what handlers saw.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick(pub u32);
impl Event for Tick {}

/// Capability marker: never instantiated.
#[derive(Debug)]
pub enum Audible {}
impl Event for Audible {}

#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub volume: u8,
}
impl Event for Sound {
    fn capabilities() -> Vec<EventType> {
        vec![EventType::of::<Audible>()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bark {
    pub sound: Sound,
}
impl Event for Bark {
    fn parent() -> Option<EventType> {
        Some(EventType::of::<Sound>())
    }

    fn view(&self, ty: TypeId) -> Option<&dyn Any> {
        (ty == TypeId::of::<Sound>()).then_some(&self.sound as &dyn Any)
    }
}

pub fn bark(volume: u8) -> Bark {
    Bark {
        sound: Sound { volume },
    }
}

/// Affinity context driven by the test thread that created it.
pub struct ManualAffinity {
    owner: ThreadId,
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualAffinity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            owner: thread::current().id(),
            jobs: Mutex::new(VecDeque::new()),
        })
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Runs the oldest queued job; returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        job.map(|job| job()).is_some()
    }

    /// Runs queued jobs in FIFO order, including ones they submit; returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let job = self.jobs.lock().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Executor for ManualAffinity {
    fn execute(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl AffinityExecutor for ManualAffinity {
    fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }
}

pub fn bus() -> EventBus {
    EventBus::builder(BusConfig::default()).build().unwrap()
}

pub fn bus_with(cfg: BusConfig) -> EventBus {
    EventBus::builder(cfg).build().unwrap()
}

/// Bus whose affinity context is the calling thread.
pub fn manual_bus(cfg: BusConfig) -> (EventBus, Arc<ManualAffinity>) {
    let affinity = ManualAffinity::new();
    let bus = EventBus::builder(cfg)
        .with_affinity(affinity.clone())
        .build()
        .unwrap();
    (bus, affinity)
}
