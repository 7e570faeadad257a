//! Boot-configuration words
//!
//! Two persistent 32-bit configuration words select the boot source and
//! data-flash behavior. The loader's job here is small: make sure the part
//! boots from the application bank, which means clearing the boot-source
//! selector if it is set. The update is read back and compared after
//! writing; these words steer the boot path, so a silently failed write
//! must not go unnoticed.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::target::{FlashCtl, UpdateGuard, UpdateRegion};

bitflags! {
    /// Bit assignments of configuration word 0
    ///
    /// Constructed with `from_bits_retain`: bits this crate does not model
    /// pass through updates untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Config0: u32 {
        /// Data flash disabled
        const DFEN = 1 << 0;
        /// Boot-source selector, low bit
        const CBS0 = 1 << 6;
        /// Boot-source selector, high bit
        const CBS1 = 1 << 7;
        /// The whole boot-source selector field
        const CBS = Self::CBS0.bits() | Self::CBS1.bits();
    }
}

/// Bit position of the boot-source selector within config word 0
const CBS_SHIFT: u32 = 6;

/// Outcome of [`force_aprom_boot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSelect {
    /// The selector was already zero; nothing was written
    Aprom,
    /// The selector was cleared (and the DFEN flag set)
    Updated {
        /// Selector value found before the update
        previous: u8,
    },
}

/// Read the current boot-source selector
pub fn boot_source<F: FlashCtl + ?Sized>(flash: &mut F) -> Result<u8> {
    let mut words = [0u32; 2];
    flash.read_config(&mut words)?;
    Ok(((words[0] >> CBS_SHIFT) & 0b11) as u8)
}

/// Read both configuration words
pub fn read_words<F: FlashCtl + ?Sized>(flash: &mut F) -> Result<[u32; 2]> {
    let mut words = [0u32; 2];
    flash.read_config(&mut words)?;
    Ok(words)
}

/// Force the part to boot from the application bank
///
/// Reads the configuration words; when the boot-source selector is nonzero,
/// clears it, sets the DFEN flag, writes both words back under a scoped
/// config-update enable, and verifies the readback. A zero selector issues
/// no write at all.
///
/// # Errors
/// * `ConfigMismatch` - the readback after writing disagreed with what was
///   written
pub fn force_aprom_boot<F: FlashCtl + ?Sized>(flash: &mut F) -> Result<BootSelect> {
    let mut words = [0u32; 2];
    flash.read_config(&mut words)?;

    let cbs = ((words[0] >> CBS_SHIFT) & 0b11) as u8;
    log::debug!(
        "config0 = 0x{:08X}, config1 = 0x{:08X}, cbs = {}",
        words[0],
        words[1],
        cbs
    );
    if cbs == 0 {
        return Ok(BootSelect::Aprom);
    }

    let mut cfg0 = Config0::from_bits_retain(words[0]);
    cfg0.remove(Config0::CBS);
    cfg0.insert(Config0::DFEN);
    let want = [cfg0.bits(), words[1]];

    log::info!("changing boot setting to boot from application bank");
    let mut guard = UpdateGuard::new(flash, UpdateRegion::Config)?;
    guard.write_config(&want)?;

    let mut found = [0u32; 2];
    guard.read_config(&mut found)?;
    for (index, (&wrote, &read)) in want.iter().zip(found.iter()).enumerate() {
        if wrote != read {
            return Err(Error::ConfigMismatch {
                index,
                expected: wrote,
                found: read,
            });
        }
    }

    Ok(BootSelect::Updated { previous: cbs })
}
