//! # Interrupt Dispatch Registry
//!
//! Platforms typically have a handful of interrupt vectors that can be attached to
//! the radios' DIO0 lines. The registry maps a small slot id, handed out at
//! registration, to the driver instance that services it. The platform's
//! interrupt glue calls [`InterruptRegistry::dispatch`] with the slot id when the
//! line rises.
//!
//! ```rust
//! use rf95_rs::radio::interrupt::{InterruptHandler, InterruptRegistry};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct Counter(AtomicU32);
//! impl InterruptHandler for Counter {
//!     fn on_interrupt(&self) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let registry = InterruptRegistry::new();
//! let counter = Arc::new(Counter(AtomicU32::new(0)));
//! let slot = registry.register(counter.clone()).unwrap();
//! assert!(registry.dispatch(slot));
//! assert_eq!(counter.0.load(Ordering::Relaxed), 1);
//! ```

use crate::constants::RF95_NUM_INTERRUPTS;
use crate::error::Rf95Error;
use critical_section::Mutex;
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Something that services a DIO0 interrupt
pub trait InterruptHandler: Send + Sync {
    fn on_interrupt(&self);
}

/// Index of a registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

type Slots = [Option<Arc<dyn InterruptHandler>>; RF95_NUM_INTERRUPTS];

/// Fixed-capacity table of interrupt handlers
pub struct InterruptRegistry {
    id: usize,
    slots: Mutex<RefCell<Slots>>,
}

static NEXT_REGISTRY_ID: AtomicUsize = AtomicUsize::new(0);

static GLOBAL_REGISTRY: Lazy<InterruptRegistry> = Lazy::new(InterruptRegistry::new);

impl Default for InterruptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterruptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptRegistry")
            .field("capacity", &RF95_NUM_INTERRUPTS)
            .field("registered", &self.len())
            .finish()
    }
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            slots: Mutex::new(RefCell::new(Default::default())),
        }
    }

    /// Identity that stays unique for the life of the process
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Process-wide registry for platforms with a single interrupt controller
    pub fn global() -> &'static InterruptRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn capacity(&self) -> usize {
        RF95_NUM_INTERRUPTS
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.slots.borrow_ref(cs).iter().flatten().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim the lowest free slot for `handler`
    pub fn register(&self, handler: Arc<dyn InterruptHandler>) -> Result<SlotId, Rf95Error> {
        let slot = critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let free = slots.iter().position(Option::is_none)?;
            slots[free] = Some(handler);
            Some(SlotId(free))
        });
        match slot {
            Some(slot) => {
                log::debug!("Registered interrupt handler in {slot}");
                Ok(slot)
            }
            None => {
                log::warn!("Interrupt registry full ({RF95_NUM_INTERRUPTS} slots)");
                Err(Rf95Error::TooManyInstances {
                    capacity: RF95_NUM_INTERRUPTS,
                })
            }
        }
    }

    /// Release a slot so it can be reused
    pub fn unregister(&self, slot: SlotId) -> bool {
        critical_section::with(|cs| {
            self.slots
                .borrow_ref_mut(cs)
                .get_mut(slot.0)
                .and_then(Option::take)
                .is_some()
        })
    }

    /// Invoke the handler registered in `slot`; false if the slot is empty
    ///
    /// The handler runs outside the registry's critical section.
    pub fn dispatch(&self, slot: SlotId) -> bool {
        let handler = critical_section::with(|cs| {
            self.slots
                .borrow_ref(cs)
                .get(slot.0)
                .and_then(|entry| entry.clone())
        });
        match handler {
            Some(handler) => {
                handler.on_interrupt();
                true
            }
            None => {
                log::trace!("Spurious interrupt on empty {slot}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counter(AtomicU32);

    impl InterruptHandler for Counter {
        fn on_interrupt(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_capacity_is_strict() {
        let registry = InterruptRegistry::new();
        for _ in 0..RF95_NUM_INTERRUPTS {
            registry.register(Arc::new(Counter::default())).unwrap();
        }
        let err = registry.register(Arc::new(Counter::default())).unwrap_err();
        assert_eq!(err, Rf95Error::TooManyInstances { capacity: 3 });
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unregistered_slot_is_reused() {
        let registry = InterruptRegistry::new();
        let first = registry.register(Arc::new(Counter::default())).unwrap();
        let _second = registry.register(Arc::new(Counter::default())).unwrap();
        assert!(registry.unregister(first));
        assert!(!registry.dispatch(first));
        let again = registry.register(Arc::new(Counter::default())).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_dispatch_reaches_only_its_handler() {
        let registry = InterruptRegistry::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let slot_a = registry.register(a.clone()).unwrap();
        let _slot_b = registry.register(b.clone()).unwrap();
        registry.dispatch(slot_a);
        registry.dispatch(slot_a);
        assert_eq!(a.0.load(Ordering::Relaxed), 2);
        assert_eq!(b.0.load(Ordering::Relaxed), 0);
    }
}
