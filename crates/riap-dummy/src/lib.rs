//! riap-dummy - In-memory MCU emulator for testing
//!
//! This crate provides a dummy target that emulates the flash banks, the
//! system-control block and the debug transmit FIFO in memory. It's useful
//! for testing and for simulating the whole loader flow without real
//! hardware.
//!
//! The non-returning operations ([`SysCtl::transfer`] and [`SysCtl::reset`])
//! diverge by unwinding with a typed payload; wrap the simulated flow in
//! [`catch_exit`] to observe them.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use riap_core::error::{Error, Result};
use riap_core::image::ERASED_BYTE;
use riap_core::layout::{APROM_BASE, LDROM_BASE};
use riap_core::target::{DebugPort, FlashCtl, SysCtl, UpdateRegion};

/// Configuration for the dummy target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Application bank capacity in bytes
    pub aprom_size: u32,
    /// Loader bank capacity in bytes
    pub ldrom_size: u32,
    /// Erase page size in bytes
    pub page_size: u32,
    /// Initial configuration words
    pub config: [u32; 2],
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            aprom_size: riap_core::layout::APROM_SIZE,
            ldrom_size: riap_core::layout::LDROM_SIZE,
            page_size: riap_core::layout::PAGE_SIZE,
            config: [0xFFFF_FFFF; 2],
        }
    }
}

/// Which bank an address decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bank {
    Aprom,
    Ldrom,
}

/// Dummy flash/ISP controller
///
/// Emulates the flash banks in memory: erases reset whole pages to 0xFF,
/// programming can only clear bits, and every mutation checks the bank's
/// update enable first.
#[cfg(feature = "alloc")]
pub struct DummyFlash {
    config: DummyConfig,
    aprom: Vec<u8>,
    ldrom: Vec<u8>,
    config_words: [u32; 2],
    ld_update: bool,
    ap_update: bool,
    cfg_update: bool,
    fail_erase_at: Option<u32>,
    corrupt_read: Option<(u32, u32)>,
}

#[cfg(feature = "alloc")]
impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let aprom = vec![ERASED_BYTE; config.aprom_size as usize];
        let ldrom = vec![ERASED_BYTE; config.ldrom_size as usize];
        let config_words = config.config;
        Self {
            config,
            aprom,
            ldrom,
            config_words,
            ld_update: false,
            ap_update: false,
            cfg_update: false,
            fail_erase_at: None,
            corrupt_read: None,
        }
    }

    /// Create a new dummy flash with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Application bank contents
    pub fn aprom(&self) -> &[u8] {
        &self.aprom
    }

    /// Mutable application bank contents
    pub fn aprom_mut(&mut self) -> &mut [u8] {
        &mut self.aprom
    }

    /// Loader bank contents
    pub fn ldrom(&self) -> &[u8] {
        &self.ldrom
    }

    /// Mutable loader bank contents
    pub fn ldrom_mut(&mut self) -> &mut [u8] {
        &mut self.ldrom
    }

    /// Current configuration words
    pub fn config_words(&self) -> [u32; 2] {
        self.config_words
    }

    /// Overwrite the configuration words directly (no enable required)
    pub fn set_config_words(&mut self, words: [u32; 2]) {
        self.config_words = words;
    }

    /// Make the erase of the page at `addr` fail
    pub fn fail_erase_at(&mut self, addr: u32) {
        self.fail_erase_at = Some(addr);
    }

    /// Make the next read of `addr` return `value` instead of the contents
    pub fn corrupt_read_at(&mut self, addr: u32, value: u32) {
        self.corrupt_read = Some((addr, value));
    }

    fn decode(&self, addr: u32, len: u32) -> Result<(Bank, usize)> {
        let end = addr.checked_add(len).ok_or(Error::AddressOutOfBounds)?;
        let aprom_end = APROM_BASE + self.config.aprom_size;
        let ldrom_end = LDROM_BASE + self.config.ldrom_size;
        if addr >= APROM_BASE && end <= aprom_end {
            Ok((Bank::Aprom, (addr - APROM_BASE) as usize))
        } else if addr >= LDROM_BASE && end <= ldrom_end {
            Ok((Bank::Ldrom, (addr - LDROM_BASE) as usize))
        } else {
            Err(Error::AddressOutOfBounds)
        }
    }

    fn update_enabled(&self, bank: Bank) -> bool {
        match bank {
            Bank::Aprom => self.ap_update,
            Bank::Ldrom => self.ld_update,
        }
    }

    fn bank_mut(&mut self, bank: Bank) -> &mut [u8] {
        match bank {
            Bank::Aprom => &mut self.aprom,
            Bank::Ldrom => &mut self.ldrom,
        }
    }

    fn bank(&self, bank: Bank) -> &[u8] {
        match bank {
            Bank::Aprom => &self.aprom,
            Bank::Ldrom => &self.ldrom,
        }
    }
}

#[cfg(feature = "alloc")]
impl FlashCtl for DummyFlash {
    fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn erase_page(&mut self, addr: u32) -> Result<()> {
        let page_size = self.config.page_size;
        if !addr.is_multiple_of(page_size) {
            return Err(Error::InvalidAlignment);
        }
        let (bank, offset) = self.decode(addr, page_size)?;
        if !self.update_enabled(bank) {
            return Err(Error::UpdateProtected);
        }
        if self.fail_erase_at == Some(addr) {
            log::debug!("injected erase failure at 0x{:08X}", addr);
            return Err(Error::EraseFailed { addr });
        }
        let size = page_size as usize;
        for byte in &mut self.bank_mut(bank)[offset..offset + size] {
            *byte = ERASED_BYTE;
        }
        Ok(())
    }

    fn program_word(&mut self, addr: u32, word: u32) -> Result<()> {
        if !addr.is_multiple_of(4) {
            return Err(Error::InvalidAlignment);
        }
        let (bank, offset) = self.decode(addr, 4)?;
        if !self.update_enabled(bank) {
            return Err(Error::UpdateProtected);
        }
        // Flash programming: can only change 1 -> 0
        let mem = self.bank_mut(bank);
        for (i, byte) in word.to_le_bytes().iter().enumerate() {
            mem[offset + i] &= byte;
        }
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> Result<u32> {
        if !addr.is_multiple_of(4) {
            return Err(Error::InvalidAlignment);
        }
        if let Some((bad_addr, value)) = self.corrupt_read {
            if bad_addr == addr {
                self.corrupt_read = None;
                return Ok(value);
            }
        }
        let (bank, offset) = self.decode(addr, 4)?;
        let mem = self.bank(bank);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&mem[offset..offset + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    fn enable_update(&mut self, bank: UpdateRegion) -> Result<()> {
        match bank {
            UpdateRegion::Ldrom => self.ld_update = true,
            UpdateRegion::Aprom => self.ap_update = true,
            UpdateRegion::Config => self.cfg_update = true,
        }
        Ok(())
    }

    fn disable_update(&mut self, bank: UpdateRegion) {
        match bank {
            UpdateRegion::Ldrom => self.ld_update = false,
            UpdateRegion::Aprom => self.ap_update = false,
            UpdateRegion::Config => self.cfg_update = false,
        }
    }

    fn read_config(&mut self, words: &mut [u32; 2]) -> Result<()> {
        *words = self.config_words;
        Ok(())
    }

    fn write_config(&mut self, words: &[u32; 2]) -> Result<()> {
        if !self.cfg_update {
            return Err(Error::UpdateProtected);
        }
        self.config_words = *words;
        Ok(())
    }
}

/// Payload carried out of a simulated control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCapture {
    /// Stack pointer the new image would start with
    pub sp: u32,
    /// Entry point the new image would start at
    pub entry: u32,
}

/// Payload carried out of a simulated system reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCapture;

/// Dummy system-control block
///
/// Records the vector base; the diverging operations unwind with a capture
/// payload that [`catch_exit`] turns back into a value.
#[derive(Debug, Default)]
pub struct DummyCore {
    vector_base: Option<u32>,
}

impl DummyCore {
    /// Create a new dummy core with no vector remap applied
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the vector table currently points, if it was remapped
    pub fn vector_base(&self) -> Option<u32> {
        self.vector_base
    }
}

#[cfg(feature = "std")]
impl SysCtl for DummyCore {
    fn set_vector_base(&mut self, addr: u32) {
        self.vector_base = Some(addr);
    }

    fn transfer(&mut self, sp: u32, entry: u32) -> ! {
        log::debug!("simulated transfer: sp=0x{:08X} entry=0x{:08X}", sp, entry);
        std::panic::panic_any(TransferCapture { sp, entry })
    }

    fn reset(&mut self) -> ! {
        log::debug!("simulated system reset");
        std::panic::panic_any(ResetCapture)
    }
}

/// Dummy debug transmit FIFO
///
/// Reports non-empty for a configurable number of polls, or indefinitely
/// when stuck.
#[derive(Debug, Default)]
pub struct DummyConsole {
    pending: u32,
    stuck: bool,
    polls: u32,
}

impl DummyConsole {
    /// Create an empty FIFO
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `n` polls worth of output is still in flight
    pub fn set_pending(&mut self, n: u32) {
        self.pending = n;
    }

    /// Make the FIFO never drain
    pub fn stick(&mut self) {
        self.stuck = true;
    }

    /// How many times the FIFO status was polled
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

impl DebugPort for DummyConsole {
    fn tx_empty(&mut self) -> bool {
        self.polls += 1;
        if self.stuck {
            return false;
        }
        if self.pending > 0 {
            self.pending -= 1;
            return false;
        }
        true
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for in-memory operations
    }
}

/// A complete dummy target: flash, core and console
///
/// The fields are public so callers can hand the three ports out as
/// disjoint borrows, which is what the core operations expect.
#[cfg(feature = "alloc")]
pub struct DummyTarget {
    /// Flash/ISP controller emulation
    pub flash: DummyFlash,
    /// System-control emulation
    pub core: DummyCore,
    /// Debug FIFO emulation
    pub console: DummyConsole,
}

#[cfg(feature = "alloc")]
impl DummyTarget {
    /// Create a target with the given flash configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            flash: DummyFlash::new(config),
            core: DummyCore::new(),
            console: DummyConsole::new(),
        }
    }

    /// Create a target with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }
}

/// How a simulated flow ended
#[cfg(feature = "std")]
#[derive(Debug)]
pub enum SimExit<R> {
    /// Control was handed off to another image
    Transfer(TransferCapture),
    /// A system reset was requested
    Reset,
    /// The closure returned without diverging
    Returned(R),
}

/// Run a simulated flow, catching the diverging exits of [`DummyCore`]
///
/// Panics that are not a [`TransferCapture`] or [`ResetCapture`] payload
/// (test assertion failures, genuine bugs) are resumed unchanged.
#[cfg(feature = "std")]
pub fn catch_exit<R>(f: impl FnOnce() -> R) -> SimExit<R> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => SimExit::Returned(value),
        Err(payload) => match payload.downcast::<TransferCapture>() {
            Ok(capture) => SimExit::Transfer(*capture),
            Err(payload) => match payload.downcast::<ResetCapture>() {
                Ok(_) => SimExit::Reset,
                Err(payload) => std::panic::resume_unwind(payload),
            },
        },
    }
}
