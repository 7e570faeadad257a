//! Port trait definitions
//!
//! These traits cover the minimal operation set the loader uses. They are
//! synchronous: IAP code executes in place on the core it is reprogramming,
//! so there is no transport to suspend on.

use crate::error::Result;

/// Protected flash banks that require an update enable before mutation
///
/// Mirrors the usual internal-flash arrangement: a loader bank (LDROM), the
/// application bank (APROM), and the user configuration words. Each has its
/// own enable bit in the ISP controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateRegion {
    /// Loader bank
    Ldrom,
    /// Application bank
    Aprom,
    /// User configuration words
    Config,
}

/// Flash/ISP controller port
///
/// Word-granular program and read access plus page-granular erase, the way
/// internal flash controllers expose it. All addresses are byte addresses;
/// program and read addresses must be 4-byte aligned, erase addresses
/// page-aligned.
pub trait FlashCtl {
    /// The erase page size in bytes (a hardware constant)
    fn page_size(&self) -> u32;

    /// Erase one page; every byte in it reads back erased afterwards
    ///
    /// # Errors
    /// Implementations report a rejected erase as
    /// [`Error::EraseFailed`](crate::Error::EraseFailed) carrying `addr`, and
    /// a missing update enable as
    /// [`Error::UpdateProtected`](crate::Error::UpdateProtected).
    fn erase_page(&mut self, addr: u32) -> Result<()>;

    /// Program one 32-bit word
    ///
    /// The containing page must have been erased first; flash programming
    /// can only clear bits.
    fn program_word(&mut self, addr: u32, word: u32) -> Result<()>;

    /// Read one 32-bit word
    fn read_word(&mut self, addr: u32) -> Result<u32>;

    /// Set the update enable for a bank
    ///
    /// Writes and erases to a bank fail with `UpdateProtected` until its
    /// enable is set. Prefer scoping this with
    /// [`UpdateGuard`](super::UpdateGuard) over calling it directly.
    fn enable_update(&mut self, bank: UpdateRegion) -> Result<()>;

    /// Clear the update enable for a bank
    fn disable_update(&mut self, bank: UpdateRegion);

    /// Read both user configuration words
    fn read_config(&mut self, words: &mut [u32; 2]) -> Result<()>;

    /// Write both user configuration words
    ///
    /// Requires the [`UpdateRegion::Config`] enable.
    fn write_config(&mut self, words: &[u32; 2]) -> Result<()>;
}

/// System-control port
///
/// Vector-table remapping and the two ways the loader leaves: transferring
/// control into another image, or resetting the system.
pub trait SysCtl {
    /// Point exception dispatch at the vector table of another image
    fn set_vector_base(&mut self, addr: u32);

    /// Hand control to another image
    ///
    /// Loads `sp` into the stack pointer and jumps to `entry`. This is the
    /// point of no return: nothing is reported past it, and an invalid
    /// `entry` is undefined hardware behavior. Callers verify the image
    /// first.
    fn transfer(&mut self, sp: u32, entry: u32) -> !;

    /// Request a system reset
    fn reset(&mut self) -> !;
}

/// Debug/console transmit status port
///
/// The handoff path polls this to let pending output drain before the
/// console peripheral is reinitialized by the next image.
pub trait DebugPort {
    /// True when the transmit FIFO holds no pending bytes
    fn tx_empty(&mut self) -> bool;

    /// Delay between status polls
    fn delay_us(&mut self, us: u32);
}
