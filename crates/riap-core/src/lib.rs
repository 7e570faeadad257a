//! riap-core - Core library for in-application flash programming
//!
//! This crate provides the building blocks of an IAP loader: programming a
//! firmware image into internal flash page by page, verifying the result,
//! updating the boot-configuration words, and handing execution over to a
//! freshly programmed image. It is designed to be `no_std` compatible so the
//! same code can run on the target itself.
//!
//! Hardware access goes through the port traits in [`target`]; backends range
//! from the real flash controller down to the in-memory emulator used for
//! testing and host-side simulation.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation for named layouts
//!
//! # Example
//!
//! ```ignore
//! use riap_core::{ops, Image};
//! use riap_core::target::{FlashCtl, UpdateGuard, UpdateRegion};
//!
//! fn install<F: FlashCtl>(flash: &mut F, blob: &[u8]) -> riap_core::Result<()> {
//!     let image = Image::new(blob);
//!     let region = riap_core::layout::Region::span(0x10000, 0x1FFFF);
//!     let mut guard = UpdateGuard::new(flash, UpdateRegion::Aprom)?;
//!     ops::program(&mut *guard, &image, &region)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bootcfg;
pub mod error;
pub mod handoff;
pub mod image;
pub mod layout;
pub mod ops;
pub mod target;

pub use error::{Error, Result};
pub use image::Image;
