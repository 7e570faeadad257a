//! Target hardware ports
//!
//! Everything the loader needs from the MCU is expressed as a trait here:
//! the flash/ISP controller, the system-control block, and the debug
//! transmit port. Operations take these as injected dependencies, so an
//! in-memory emulator can stand in for the real peripherals.

mod guard;
mod traits;

pub use guard::UpdateGuard;
pub use traits::{DebugPort, FlashCtl, SysCtl, UpdateRegion};
