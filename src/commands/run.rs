//! Interactive loader flow
//!
//! The full boot-and-menu sequence: install the second-stage loader if the
//! loader bank is blank (then reset), force the boot source to the
//! application bank, then loop the two-question update/branch menu until
//! EOF.

use std::error::Error;
use std::io::{self, BufRead};
use std::path::Path;

use riap_core::handoff::{self, WaitPolicy};
use riap_core::layout::Layout;
use riap_core::target::{FlashCtl, SysCtl};
use riap_core::{bootcfg, ops};
use riap_dummy::{catch_exit, DummyTarget, SimExit};

use super::{describe_region, find_region, program_region, read_image_file};

pub fn run(
    target: &mut DummyTarget,
    layout: &Layout,
    loader_image: Option<&Path>,
    app_image: Option<&Path>,
    app_region: &str,
) -> Result<(), Box<dyn Error>> {
    let exit = catch_exit(|| run_inner(target, layout, loader_image, app_image, app_region));
    match exit {
        SimExit::Reset => {
            println!("System reset requested - run again to continue");
            Ok(())
        }
        SimExit::Transfer(capture) => {
            println!(
                "Control transferred: sp=0x{:08X}, entry=0x{:08X}",
                capture.sp, capture.entry
            );
            Ok(())
        }
        SimExit::Returned(result) => result,
    }
}

fn run_inner(
    target: &mut DummyTarget,
    layout: &Layout,
    loader_image: Option<&Path>,
    app_image: Option<&Path>,
    app_region: &str,
) -> Result<(), Box<dyn Error>> {
    let reset_vector = target.flash.read_word(0x4)?;
    println!("+--------------------------------------------------+");
    println!("| User program running, reset vector 0x{:08X}    |", reset_vector);
    println!("+--------------------------------------------------+");

    // Install the second-stage loader once, then come back up through it.
    let ldrom = find_region(layout, "ldrom")?;
    if ops::blank(&mut target.flash, ldrom)? {
        let Some(path) = loader_image else {
            return Err("loader bank is blank and no --loader-image was given".into());
        };
        println!("No boot loader found");
        println!("Writing loader image to {}...", describe_region(ldrom));
        let data = read_image_file(path)?;
        program_region(&mut target.flash, ldrom, &data)?;
        println!("OK.");

        handoff::drain(&mut target.console, WaitPolicy::Forever)?;
        target.core.reset();
    }

    match bootcfg::force_aprom_boot(&mut target.flash)? {
        bootcfg::BootSelect::Aprom => {}
        bootcfg::BootSelect::Updated { .. } => {
            println!("Changed boot setting to boot from the application bank");
        }
    }

    let app = find_region(layout, app_region)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!();
        println!("Do you want to update {}? (Yes/No)", app.name);
        match read_yes_no(&mut lines)? {
            None => break,
            Some(false) => {}
            Some(true) => match app_image {
                Some(path) => {
                    println!("Writing image to {}...", describe_region(app));
                    let data = read_image_file(path)?;
                    program_region(&mut target.flash, app, &data)?;
                    println!("OK.");
                }
                None => println!("No application image given (--app-image)"),
            },
        }

        println!();
        println!("Do you want to branch to {}? (Yes/No)", app.name);
        match read_yes_no(&mut lines)? {
            None => break,
            Some(false) => {}
            Some(true) => {
                println!("Change vector map and branch to the application image...");
                handoff::branch_to(
                    &mut target.flash,
                    &mut target.core,
                    &mut target.console,
                    WaitPolicy::Forever,
                    app.start,
                )?;
            }
        }
    }

    Ok(())
}

/// Read lines until one starts with a yes/no answer (case-insensitive)
///
/// Returns `None` at EOF; anything that is neither yes nor no is skipped
/// and the next line is read.
fn read_yes_no(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<bool>, Box<dyn Error>> {
    for line in lines {
        let line = line?;
        match line.trim().chars().next() {
            Some('y') | Some('Y') => return Ok(Some(true)),
            Some('n') | Some('N') => return Ok(Some(false)),
            _ => {}
        }
    }
    Ok(None)
}
