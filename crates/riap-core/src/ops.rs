//! High-level flash operations
//!
//! The page program-and-verify engine. An image is installed into a
//! destination region in two passes: erase each page and program the
//! image's words into it, then traverse everything again comparing the
//! flash contents word by word against the source.
//!
//! Neither pass is transactional. Any failure leaves the destination in an
//! indeterminate, possibly partially-written state; the only recovery is to
//! program the region again from scratch.

use crate::error::{Error, Result};
use crate::image::{Image, ERASED_WORD};
use crate::layout::Region;
use crate::target::FlashCtl;

/// Statistics from a program operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramStats {
    /// Number of pages erased
    pub pages_erased: u32,
    /// Number of 32-bit words programmed
    pub words_written: u32,
    /// Number of image bytes covered by the verification pass
    pub bytes_verified: u32,
}

/// Progress callbacks for long-running flash operations
///
/// The front-end hangs progress bars off these; the default bodies make
/// every callback optional.
pub trait ProgressSink {
    /// Called when the erase+write pass starts
    fn programming(&mut self, _total_bytes: u32) {}

    /// Called after each page has been erased and programmed
    fn program_progress(&mut self, _bytes_done: u32) {}

    /// Called when the verification pass starts
    fn verifying(&mut self, _total_bytes: u32) {}

    /// Called as the verification pass advances
    fn verify_progress(&mut self, _bytes_done: u32) {}

    /// Called once the whole operation has completed successfully
    fn complete(&mut self, _stats: &ProgramStats) {}
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Check the preconditions shared by programming and verification
fn check_image(image: &Image<'_>, region: &Region) -> Result<u32> {
    if image.is_empty() {
        return Err(Error::EmptyImage);
    }
    let len = image.len() as u32;
    if len > region.size() {
        return Err(Error::ImageTooLarge {
            size: len,
            capacity: region.size(),
        });
    }
    Ok(len)
}

/// Program an image into a flash region and verify the result
///
/// Precondition failures (`EmptyImage`, `ImageTooLarge`) are detected before
/// any flash mutation. The destination's update enable must already be held;
/// scope it with [`UpdateGuard`](crate::target::UpdateGuard).
///
/// # Errors
/// * `EraseFailed` - a page refused to erase; no further pages are touched
/// * `VerifyMismatch` - readback disagreed with the source image
pub fn program<F: FlashCtl + ?Sized>(
    flash: &mut F,
    image: &Image<'_>,
    region: &Region,
) -> Result<ProgramStats> {
    program_with_progress(flash, image, region, &mut NoProgress)
}

/// [`program`] with progress reporting
pub fn program_with_progress<F, P>(
    flash: &mut F,
    image: &Image<'_>,
    region: &Region,
    progress: &mut P,
) -> Result<ProgramStats>
where
    F: FlashCtl + ?Sized,
    P: ProgressSink,
{
    let len = check_image(image, region)?;
    let page_size = flash.page_size();

    log::info!(
        "programming {} bytes to 0x{:08X} ({} byte pages)",
        len,
        region.start,
        page_size
    );
    progress.programming(len);

    let mut stats = ProgramStats::default();
    let mut page = 0u32;
    while page < len {
        let page_addr = region.start + page;
        flash.erase_page(page_addr)?;
        stats.pages_erased += 1;

        // Fill the page, or stop early once the image runs out.
        let page_end = page + page_size;
        let mut offset = page;
        while offset < page_end && offset < len {
            flash.program_word(region.start + offset, image.word((offset / 4) as usize))?;
            stats.words_written += 1;
            offset += 4;
        }

        page = page_end;
        progress.program_progress(page.min(len));
    }

    stats.bytes_verified = verify_with_progress(flash, image, region, progress)?;
    log::info!(
        "programmed {} pages, {} words; verified {} bytes",
        stats.pages_erased,
        stats.words_written,
        stats.bytes_verified
    );
    progress.complete(&stats);
    Ok(stats)
}

/// Compare a flash region against an image, word by word
///
/// A separate full traversal in the same page-wise order as programming.
/// Returns the number of bytes covered on success.
///
/// # Errors
/// * `VerifyMismatch` - carries the first disagreeing address along with the
///   expected and found words; no later addresses are read
pub fn verify<F: FlashCtl + ?Sized>(
    flash: &mut F,
    image: &Image<'_>,
    region: &Region,
) -> Result<u32> {
    verify_with_progress(flash, image, region, &mut NoProgress)
}

/// [`verify`] with progress reporting
pub fn verify_with_progress<F, P>(
    flash: &mut F,
    image: &Image<'_>,
    region: &Region,
    progress: &mut P,
) -> Result<u32>
where
    F: FlashCtl + ?Sized,
    P: ProgressSink,
{
    let len = check_image(image, region)?;
    let page_size = flash.page_size();
    progress.verifying(len);

    let mut page = 0u32;
    while page < len {
        let page_end = page + page_size;
        let mut offset = page;
        while offset < page_end {
            // Still scanning at page granularity, but never past the image.
            if offset >= len {
                break;
            }
            let addr = region.start + offset;
            let found = flash.read_word(addr)?;
            let expected = image.word((offset / 4) as usize);
            if found != expected {
                return Err(Error::VerifyMismatch {
                    addr,
                    expected,
                    found,
                });
            }
            offset += 4;
        }
        page = page_end;
        progress.verify_progress(page.min(len));
    }

    Ok(len)
}

/// Check whether a region looks unprogrammed
///
/// Reads the region's first word and compares it against the erased value -
/// the same probe the boot flow uses to decide whether a loader image is
/// already installed.
pub fn blank<F: FlashCtl + ?Sized>(flash: &mut F, region: &Region) -> Result<bool> {
    Ok(flash.read_word(region.start)? == ERASED_WORD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ERASED_BYTE;
    use std::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    /// A mock flash controller that simulates a single bank
    ///
    /// Tracks every operation so tests can assert on exact call sequences:
    /// - Memory starts as all 0xFF (erased state)
    /// - Erases reset whole pages to 0xFF
    /// - Word writes only clear bits (1 -> 0), as real flash does
    struct MockFlash {
        page_size: u32,
        memory: RefCell<Vec<u8>>,
        /// Record of page erases (addresses)
        erases: RefCell<Vec<u32>>,
        /// Record of word writes: (address, word)
        writes: RefCell<Vec<(u32, u32)>>,
        /// Record of word reads (addresses)
        reads: RefCell<Vec<u32>>,
        /// Erases at this address are rejected
        fail_erase_at: Option<u32>,
        /// The first read of this address returns the given word instead
        corrupt_read: RefCell<Option<(u32, u32)>>,
    }

    impl MockFlash {
        fn new(size: usize) -> Self {
            Self {
                page_size: 512,
                memory: RefCell::new(vec![ERASED_BYTE; size]),
                erases: RefCell::new(Vec::new()),
                writes: RefCell::new(Vec::new()),
                reads: RefCell::new(Vec::new()),
                fail_erase_at: None,
                corrupt_read: RefCell::new(None),
            }
        }

        fn get_memory(&self) -> Vec<u8> {
            self.memory.borrow().clone()
        }

        fn get_erases(&self) -> Vec<u32> {
            self.erases.borrow().clone()
        }

        fn get_writes(&self) -> Vec<(u32, u32)> {
            self.writes.borrow().clone()
        }

        fn get_reads(&self) -> Vec<u32> {
            self.reads.borrow().clone()
        }
    }

    impl FlashCtl for MockFlash {
        fn page_size(&self) -> u32 {
            self.page_size
        }

        fn erase_page(&mut self, addr: u32) -> Result<()> {
            if self.fail_erase_at == Some(addr) {
                return Err(Error::EraseFailed { addr });
            }
            self.erases.borrow_mut().push(addr);
            let addr = addr as usize;
            let size = self.page_size as usize;
            let mut mem = self.memory.borrow_mut();
            if addr + size > mem.len() {
                return Err(Error::AddressOutOfBounds);
            }
            for byte in &mut mem[addr..addr + size] {
                *byte = ERASED_BYTE;
            }
            Ok(())
        }

        fn program_word(&mut self, addr: u32, word: u32) -> Result<()> {
            self.writes.borrow_mut().push((addr, word));
            let addr = addr as usize;
            let mut mem = self.memory.borrow_mut();
            if addr + 4 > mem.len() {
                return Err(Error::AddressOutOfBounds);
            }
            for (i, byte) in word.to_le_bytes().iter().enumerate() {
                mem[addr + i] &= byte;
            }
            Ok(())
        }

        fn read_word(&mut self, addr: u32) -> Result<u32> {
            self.reads.borrow_mut().push(addr);
            if let Some((bad_addr, value)) = *self.corrupt_read.borrow() {
                if bad_addr == addr {
                    *self.corrupt_read.borrow_mut() = None;
                    return Ok(value);
                }
            }
            let addr = addr as usize;
            let mem = self.memory.borrow();
            if addr + 4 > mem.len() {
                return Err(Error::AddressOutOfBounds);
            }
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&mem[addr..addr + 4]);
            Ok(u32::from_le_bytes(bytes))
        }

        fn enable_update(&mut self, _bank: crate::target::UpdateRegion) -> Result<()> {
            Ok(())
        }

        fn disable_update(&mut self, _bank: crate::target::UpdateRegion) {}

        fn read_config(&mut self, _words: &mut [u32; 2]) -> Result<()> {
            Ok(())
        }

        fn write_config(&mut self, _words: &[u32; 2]) -> Result<()> {
            Ok(())
        }
    }

    fn patterned_image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn empty_image_is_rejected_before_any_operation() {
        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);

        let err = program(&mut mock, &Image::new(&[]), &region).unwrap_err();
        assert_eq!(err, Error::EmptyImage);
        assert!(mock.get_erases().is_empty());
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn oversized_image_is_rejected_before_any_operation() {
        let mut mock = MockFlash::new(8192);
        let region = Region::span(0, 4095);
        let data = patterned_image(4097);

        let err = program(&mut mock, &Image::new(&data), &region).unwrap_err();
        assert_eq!(
            err,
            Error::ImageTooLarge {
                size: 4097,
                capacity: 4096
            }
        );
        assert!(mock.get_erases().is_empty());
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn programmed_region_reads_back_the_image() {
        let mut mock = MockFlash::new(8192);
        let region = Region::span(0x1000, 0x1FFF);
        let data = patterned_image(1001);

        let stats = program(&mut mock, &Image::new(&data), &region).unwrap();
        assert_eq!(stats.pages_erased, 2);
        assert_eq!(stats.bytes_verified, 1001);

        let memory = mock.get_memory();
        assert_eq!(&memory[0x1000..0x1000 + 1001], &data[..]);
        // The tail of the last programmed word is padded with erased bytes.
        assert_eq!(memory[0x1000 + 1001], ERASED_BYTE);
    }

    #[test]
    fn erase_failure_stops_the_operation_at_that_page() {
        let mut mock = MockFlash::new(8192);
        mock.fail_erase_at = Some(0x1400);
        let region = Region::span(0x1000, 0x1FFF);
        let data = patterned_image(2048);

        let err = program(&mut mock, &Image::new(&data), &region).unwrap_err();
        assert_eq!(err, Error::EraseFailed { addr: 0x1400 });

        // Exactly one page erased and programmed before the failure; the
        // failing page and everything after it untouched.
        assert_eq!(mock.get_erases(), vec![0x1000]);
        assert_eq!(mock.get_writes().len(), 128);
        assert!(mock.get_reads().is_empty());
    }

    #[test]
    fn verify_mismatch_reports_the_exact_triple_and_stops() {
        let mut mock = MockFlash::new(8192);
        let region = Region::span(0x1000, 0x1FFF);
        let data = patterned_image(2048);
        let image = Image::new(&data);

        let bad_addr = 0x1000 + 0x204;
        *mock.corrupt_read.borrow_mut() = Some((bad_addr, 0x1BAD_CAFE));

        let err = program(&mut mock, &image, &region).unwrap_err();
        assert_eq!(
            err,
            Error::VerifyMismatch {
                addr: bad_addr,
                expected: image.word(0x204 / 4),
                found: 0x1BAD_CAFE,
            }
        );

        // The scan stopped at the mismatch: no address past it was read.
        let reads = mock.get_reads();
        assert_eq!(*reads.last().unwrap(), bad_addr);
        assert_eq!(reads.len(), (0x204 / 4) + 1);
    }

    #[test]
    fn page_stride_scenario() {
        // Image of 2048 bytes into a 4096-byte region with 512-byte pages:
        // exactly 4 erases at page boundaries and 512 words written.
        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);
        let data = patterned_image(2048);

        let stats = program(&mut mock, &Image::new(&data), &region).unwrap();
        assert_eq!(mock.get_erases(), vec![0, 512, 1024, 1536]);
        assert_eq!(stats.pages_erased, 4);
        assert_eq!(stats.words_written, 512);
        assert_eq!(mock.get_writes().len(), 512);
        assert_eq!(stats.bytes_verified, 2048);
    }

    #[test]
    fn short_image_stops_writing_when_exhausted() {
        // 100 bytes in a 512-byte page: one erase, 25 words.
        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);
        let data = patterned_image(100);

        let stats = program(&mut mock, &Image::new(&data), &region).unwrap();
        assert_eq!(stats.pages_erased, 1);
        assert_eq!(stats.words_written, 25);

        // Verification scanned the same 25 words and no further.
        assert_eq!(mock.get_reads().len(), 25);
    }

    #[test]
    fn standalone_verify_matches_and_counts() {
        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);
        let data = patterned_image(600);
        let image = Image::new(&data);

        program(&mut mock, &image, &region).unwrap();
        assert_eq!(verify(&mut mock, &image, &region), Ok(600));

        let mut other = patterned_image(600);
        other[0] ^= 0xFF;
        let err = verify(&mut mock, &Image::new(&other), &region).unwrap_err();
        assert!(matches!(err, Error::VerifyMismatch { addr: 0, .. }));
    }

    #[test]
    fn blank_probe() {
        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);
        assert_eq!(blank(&mut mock, &region), Ok(true));

        program(&mut mock, &Image::new(&patterned_image(16)), &region).unwrap();
        assert_eq!(blank(&mut mock, &region), Ok(false));
    }

    #[test]
    fn progress_reports_both_phases() {
        #[derive(Default)]
        struct Phases {
            programming: Option<u32>,
            verifying: Option<u32>,
            last_program: u32,
            last_verify: u32,
            completed: bool,
        }

        impl ProgressSink for Phases {
            fn programming(&mut self, total: u32) {
                self.programming = Some(total);
            }
            fn program_progress(&mut self, done: u32) {
                self.last_program = done;
            }
            fn verifying(&mut self, total: u32) {
                self.verifying = Some(total);
            }
            fn verify_progress(&mut self, done: u32) {
                self.last_verify = done;
            }
            fn complete(&mut self, _stats: &ProgramStats) {
                self.completed = true;
            }
        }

        let mut mock = MockFlash::new(4096);
        let region = Region::span(0, 4095);
        let data = patterned_image(1024);
        let mut phases = Phases::default();

        program_with_progress(&mut mock, &Image::new(&data), &region, &mut phases).unwrap();
        assert_eq!(phases.programming, Some(1024));
        assert_eq!(phases.verifying, Some(1024));
        assert_eq!(phases.last_program, 1024);
        assert_eq!(phases.last_verify, 1024);
        assert!(phases.completed);
    }
}
