//! Branch command

use std::error::Error;

use riap_core::handoff::{self, WaitPolicy};
use riap_core::layout::Layout;
use riap_dummy::{catch_exit, DummyTarget, SimExit};

use super::find_region;

pub fn run(
    target: &mut DummyTarget,
    layout: &Layout,
    region_name: &str,
    entry_override: Option<u32>,
    drain_attempts: u32,
) -> Result<(), Box<dyn Error>> {
    let entry = match entry_override {
        Some(entry) => entry,
        None => find_region(layout, region_name)?.start,
    };
    let policy = if drain_attempts == 0 {
        WaitPolicy::Forever
    } else {
        WaitPolicy::Attempts(drain_attempts)
    };

    println!("Changing vector map and branching to 0x{:08X}...", entry);
    let exit = catch_exit(|| {
        handoff::branch_to(
            &mut target.flash,
            &mut target.core,
            &mut target.console,
            policy,
            entry,
        )
    });

    match exit {
        SimExit::Transfer(capture) => {
            println!(
                "Control transferred: sp=0x{:08X}, entry=0x{:08X}",
                capture.sp, capture.entry
            );
            Ok(())
        }
        SimExit::Reset => {
            println!("System reset requested");
            Ok(())
        }
        SimExit::Returned(result) => match result {
            Ok(never) => match never {},
            Err(e) => Err(e.into()),
        },
    }
}
