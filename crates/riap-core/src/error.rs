//! Error types for riap-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Precondition errors - detected before any flash mutation
    /// Source image has zero length
    EmptyImage,
    /// Source image does not fit the destination region
    ImageTooLarge {
        /// Image size in bytes
        size: u32,
        /// Destination region capacity in bytes
        capacity: u32,
    },

    // Operation errors
    /// Page erase was rejected by the flash controller
    EraseFailed {
        /// Address of the page that failed to erase
        addr: u32,
    },
    /// Post-write readback disagreed with the source image
    VerifyMismatch {
        /// Address of the first mismatching word
        addr: u32,
        /// Word the source image holds
        expected: u32,
        /// Word read back from flash
        found: u32,
    },
    /// Boot-configuration readback disagreed with what was written
    ConfigMismatch {
        /// Index of the mismatching config word
        index: usize,
        /// Word that was written
        expected: u32,
        /// Word read back
        found: u32,
    },

    // Address/size errors
    /// Address is beyond the addressable flash banks
    AddressOutOfBounds,
    /// Operation requires an aligned address or size
    InvalidAlignment,

    // Protection errors
    /// The targeted bank's update enable is not set
    UpdateProtected,

    // Handoff errors
    /// Transmit FIFO did not drain within the configured bound
    DrainTimeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyImage => write!(f, "source image is empty"),
            Self::ImageTooLarge { size, capacity } => {
                write!(
                    f,
                    "image of {} bytes exceeds region capacity of {} bytes",
                    size, capacity
                )
            }
            Self::EraseFailed { addr } => {
                write!(f, "erase failed at address 0x{:08X}", addr)
            }
            Self::VerifyMismatch {
                addr,
                expected,
                found,
            } => {
                write!(
                    f,
                    "data mismatch at 0x{:08X}: expected 0x{:08X}, found 0x{:08X}",
                    addr, expected, found
                )
            }
            Self::ConfigMismatch {
                index,
                expected,
                found,
            } => {
                write!(
                    f,
                    "config word {} readback mismatch: wrote 0x{:08X}, found 0x{:08X}",
                    index, expected, found
                )
            }
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::UpdateProtected => write!(f, "bank update is not enabled"),
            Self::DrainTimeout => write!(f, "transmit FIFO did not drain in time"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
