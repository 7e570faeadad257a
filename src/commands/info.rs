//! Info command

use std::error::Error;

use riap_core::layout::Layout;
use riap_core::target::FlashCtl;
use riap_core::{bootcfg, ops};
use riap_dummy::DummyTarget;

use super::describe_region;

pub fn run(target: &mut DummyTarget, layout: &Layout) -> Result<(), Box<dyn Error>> {
    let flash = &mut target.flash;

    println!("Page size: {} bytes", flash.page_size());

    let words = bootcfg::read_words(flash)?;
    let cbs = bootcfg::boot_source(flash)?;
    println!(
        "Config0 = 0x{:08X}, Config1 = 0x{:08X}, CBS = {}",
        words[0], words[1], cbs
    );
    println!(
        "Boot source: {}",
        if cbs == 0 {
            "application bank (APROM)"
        } else {
            "loader bank (LDROM)"
        }
    );

    println!("Regions:");
    for region in &layout.regions {
        let state = if ops::blank(flash, region)? {
            "blank"
        } else {
            "programmed"
        };
        let ro = if region.readonly { ", ro" } else { "" };
        println!("  {} [{}{}]", describe_region(region), state, ro);
    }

    Ok(())
}
