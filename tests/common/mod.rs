//! Shared helpers for the integration tests
//!
//! A [`Pump`] thread stands in for the platform's DIO0 interrupt: it watches each
//! simulated chip's line and calls the driver's handler while it is asserted.
//! Tests that only exercise receive completion call `handle_interrupt` directly
//! instead and stay single threaded.

#![allow(dead_code)]

use rf95_rs::radio::hal::relay;
use rf95_rs::{MockChip, Rf95};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub type TestRadio = Rf95<Arc<MockChip>>;

/// Generous bound for anything that waits on the pump thread
pub const WAIT: Duration = Duration::from_secs(2);

/// One simulated chip and the driver on top of it
#[derive(Clone)]
pub struct Node {
    pub chip: Arc<MockChip>,
    pub radio: Arc<TestRadio>,
}

impl Node {
    /// A driver over a fresh chip, already initialised
    pub fn new() -> Self {
        let node = Self::uninitialised();
        node.radio.init().expect("init on a fresh mock chip");
        node
    }

    pub fn uninitialised() -> Self {
        let chip = Arc::new(MockChip::new());
        let radio = Arc::new(Rf95::new(Arc::clone(&chip)));
        Self { chip, radio }
    }

    fn service(&self) {
        if self.chip.irq_line() {
            let _ = self.radio.handle_interrupt();
        }
    }
}

/// Background thread servicing interrupts until dropped
pub struct Pump {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Pump {
    /// Service the interrupts of `nodes`
    pub fn start(nodes: &[&Node]) -> Self {
        let nodes: Vec<Node> = nodes.iter().map(|n| (*n).clone()).collect();
        Self::spawn(move || nodes.iter().for_each(Node::service))
    }

    /// Service `a` and `b` and carry their transmissions to each other
    pub fn link(a: &Node, b: &Node, snr_raw: i8, rssi_raw: u8) -> Self {
        let (a, b) = (a.clone(), b.clone());
        Self::spawn(move || {
            a.service();
            relay(&a.chip, &b.chip, snr_raw, rssi_raw);
            b.service();
            relay(&b.chip, &a.chip, snr_raw, rssi_raw);
        })
    }

    fn spawn(mut step: impl FnMut() + Send + 'static) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                step();
                thread::yield_now();
            }
        });
        Self {
            running,
            handle: Some(handle),
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// A frame as it appears on air: header followed by payload
pub fn frame(to: u8, from: u8, id: u8, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![to, from, id, flags];
    bytes.extend_from_slice(payload);
    bytes
}
