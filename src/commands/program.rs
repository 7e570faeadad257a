//! Program command

use std::error::Error;
use std::path::Path;

use riap_core::layout::Layout;
use riap_dummy::DummyTarget;

use super::{describe_region, find_region, program_region, read_image_file};

pub fn run(
    target: &mut DummyTarget,
    layout: &Layout,
    region_name: &str,
    image_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let region = find_region(layout, region_name)?;
    let data = read_image_file(image_path)?;

    println!("Programming {}", describe_region(region));
    let stats = program_region(&mut target.flash, region, &data)?;

    println!(
        "OK: {} pages erased, {} words written, {} bytes verified",
        stats.pages_erased, stats.words_written, stats.bytes_verified
    );
    Ok(())
}
