//! Flash memory layout
//!
//! Named regions over the target's flash banks. The fixed bank base
//! addresses live here as constants; a [`Layout`] carves the banks into the
//! loader and application regions the front-end operates on, either from
//! the built-in default map or from a TOML file.

#[cfg(feature = "std")]
mod toml;
mod types;

#[cfg(feature = "alloc")]
pub use types::Layout;
pub use types::{update_bank, LayoutError, Region};

/// Application bank (APROM) base address
pub const APROM_BASE: u32 = 0x0000_0000;

/// Loader bank (LDROM) base address
pub const LDROM_BASE: u32 = 0x0010_0000;

/// User configuration words base address
pub const CONFIG_BASE: u32 = 0x0030_0000;

/// Default flash page size in bytes
pub const PAGE_SIZE: u32 = 512;

/// Default application bank capacity
pub const APROM_SIZE: u32 = 128 * 1024;

/// Default loader bank capacity
pub const LDROM_SIZE: u32 = 4 * 1024;
