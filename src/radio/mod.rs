pub mod diagnostics;
pub mod driver;
pub mod hal;
pub mod interrupt;
pub mod irq;
pub mod mode;
pub mod modem;
pub mod packet;
pub mod registers;

pub use driver::{InterruptEvent, Rf95, RxFailure, RxRejection, Telemetry};
pub use mode::{ModeObserver, NoopObserver, RadioMode};
