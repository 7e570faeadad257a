//! Verify command

use std::error::Error;
use std::path::Path;

use riap_core::layout::Layout;
use riap_core::{ops, Image};
use riap_dummy::DummyTarget;

use super::{describe_region, find_region, read_image_file};

pub fn run(
    target: &mut DummyTarget,
    layout: &Layout,
    region_name: &str,
    image_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let region = find_region(layout, region_name)?;
    let data = read_image_file(image_path)?;

    println!("Verifying {}", describe_region(region));
    let bytes = ops::verify(&mut target.flash, &Image::new(&data), region)?;
    println!("Verify OK: {} bytes match", bytes);
    Ok(())
}
