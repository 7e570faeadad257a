//! Boot-config command

use std::error::Error;

use riap_core::bootcfg::{self, BootSelect};
use riap_dummy::DummyTarget;

pub fn run(target: &mut DummyTarget) -> Result<(), Box<dyn Error>> {
    match bootcfg::force_aprom_boot(&mut target.flash)? {
        BootSelect::Aprom => {
            println!("Boot source already selects the application bank; nothing written");
        }
        BootSelect::Updated { previous } => {
            println!(
                "Boot source changed to the application bank (selector was 0b{:02b})",
                previous
            );
        }
    }
    Ok(())
}
