//! Execution handoff
//!
//! Transfers control from the running loader into another image: remap the
//! vector table, resolve the new image's stack pointer and entry point from
//! its vector table, let pending console output drain, then jump. On
//! success the call diverges; the caller is responsible for only handing
//! off to a previously verified image.

use core::convert::Infallible;

use crate::error::{Error, Result};
use crate::target::{DebugPort, FlashCtl, SysCtl};

/// Microseconds between transmit-status polls
const POLL_DELAY_US: u32 = 10;

/// How long to wait for an asynchronous condition
///
/// An unbounded poll hangs the loader when the peripheral is stuck;
/// `Attempts` bounds the wait so that surfaces as
/// [`Error::DrainTimeout`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Poll until the condition holds, without bound
    Forever,
    /// Give up after this many polls
    Attempts(u32),
}

/// Block until the debug transmit FIFO is empty
///
/// # Errors
/// * `DrainTimeout` - a bounded policy ran out of attempts
pub fn drain<D: DebugPort + ?Sized>(dbg: &mut D, policy: WaitPolicy) -> Result<()> {
    match policy {
        WaitPolicy::Forever => {
            while !dbg.tx_empty() {
                dbg.delay_us(POLL_DELAY_US);
            }
            Ok(())
        }
        WaitPolicy::Attempts(max) => {
            for _ in 0..max {
                if dbg.tx_empty() {
                    return Ok(());
                }
                dbg.delay_us(POLL_DELAY_US);
            }
            Err(Error::DrainTimeout)
        }
    }
}

/// Hand control to the image whose vector table sits at `entry`
///
/// The new image's vector table supplies both the initial stack pointer
/// (word 0) and the entry point (word 1). Exception dispatch is redirected
/// first, pending console output drains under `policy`, then the jump is
/// made with a fresh stack pointer. The success path never returns, which
/// the uninhabited `Ok` type records.
///
/// # Errors
/// Errors are only possible before the jump. Note that on `DrainTimeout`
/// the vector base has already been redirected at `entry`; the caller must
/// treat the system as needing a reset.
pub fn branch_to<F, S, D>(
    flash: &mut F,
    sys: &mut S,
    dbg: &mut D,
    policy: WaitPolicy,
    entry: u32,
) -> Result<Infallible>
where
    F: FlashCtl + ?Sized,
    S: SysCtl + ?Sized,
    D: DebugPort + ?Sized,
{
    sys.set_vector_base(entry);

    let pc = flash.read_word(entry + 4)?;
    log::info!("branch to address 0x{:08X}", pc);

    drain(dbg, policy)?;

    let sp = flash.read_word(entry)?;
    sys.transfer(sp, pc)
}
