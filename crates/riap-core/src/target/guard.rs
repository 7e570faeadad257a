//! Scoped update-enable guard

use super::traits::{FlashCtl, UpdateRegion};
use crate::error::Result;

/// Scopes a bank's update enable to a borrow of the flash controller
///
/// Creating the guard sets the enable; dropping it always clears the enable
/// again, including on `?` early returns and during unwinding. The guard
/// derefs to the underlying controller so operations run through it:
///
/// ```ignore
/// let mut guard = UpdateGuard::new(&mut flash, UpdateRegion::Ldrom)?;
/// ops::program(&mut *guard, &image, &region)?;
/// // enable cleared here, success or not
/// ```
pub struct UpdateGuard<'a, F: FlashCtl + ?Sized> {
    flash: &'a mut F,
    bank: UpdateRegion,
}

impl<'a, F: FlashCtl + ?Sized> UpdateGuard<'a, F> {
    /// Set the update enable for `bank` and take custody of clearing it
    pub fn new(flash: &'a mut F, bank: UpdateRegion) -> Result<Self> {
        flash.enable_update(bank)?;
        Ok(Self { flash, bank })
    }

    /// The bank this guard holds open
    pub fn bank(&self) -> UpdateRegion {
        self.bank
    }
}

impl<F: FlashCtl + ?Sized> core::ops::Deref for UpdateGuard<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.flash
    }
}

impl<F: FlashCtl + ?Sized> core::ops::DerefMut for UpdateGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.flash
    }
}

impl<F: FlashCtl + ?Sized> Drop for UpdateGuard<'_, F> {
    fn drop(&mut self) {
        self.flash.disable_update(self.bank);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    /// Records enable/disable transitions
    struct PermFlash {
        events: RefCell<Vec<(UpdateRegion, bool)>>,
        refuse: bool,
    }

    impl PermFlash {
        fn new() -> Self {
            Self {
                events: RefCell::new(Vec::new()),
                refuse: false,
            }
        }
    }

    impl FlashCtl for PermFlash {
        fn page_size(&self) -> u32 {
            512
        }

        fn erase_page(&mut self, addr: u32) -> crate::Result<()> {
            Err(Error::EraseFailed { addr })
        }

        fn program_word(&mut self, _addr: u32, _word: u32) -> crate::Result<()> {
            Ok(())
        }

        fn read_word(&mut self, _addr: u32) -> crate::Result<u32> {
            Ok(0xFFFF_FFFF)
        }

        fn enable_update(&mut self, bank: UpdateRegion) -> crate::Result<()> {
            if self.refuse {
                return Err(Error::UpdateProtected);
            }
            self.events.borrow_mut().push((bank, true));
            Ok(())
        }

        fn disable_update(&mut self, bank: UpdateRegion) {
            self.events.borrow_mut().push((bank, false));
        }

        fn read_config(&mut self, _words: &mut [u32; 2]) -> crate::Result<()> {
            Ok(())
        }

        fn write_config(&mut self, _words: &[u32; 2]) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let mut flash = PermFlash::new();
        {
            let _guard = UpdateGuard::new(&mut flash, UpdateRegion::Aprom).unwrap();
        }
        assert_eq!(
            flash.events.into_inner(),
            vec![(UpdateRegion::Aprom, true), (UpdateRegion::Aprom, false)]
        );
    }

    #[test]
    fn guard_releases_on_error_path() {
        fn failing_op(flash: &mut PermFlash) -> crate::Result<()> {
            let mut guard = UpdateGuard::new(flash, UpdateRegion::Ldrom)?;
            guard.erase_page(0)?;
            Ok(())
        }

        let mut flash = PermFlash::new();
        assert_eq!(failing_op(&mut flash), Err(Error::EraseFailed { addr: 0 }));
        assert_eq!(
            flash.events.into_inner(),
            vec![(UpdateRegion::Ldrom, true), (UpdateRegion::Ldrom, false)]
        );
    }

    #[test]
    fn refused_enable_means_no_guard_and_no_release() {
        let mut flash = PermFlash::new();
        flash.refuse = true;
        assert!(UpdateGuard::new(&mut flash, UpdateRegion::Config).is_err());
        assert!(flash.events.into_inner().is_empty());
    }
}
