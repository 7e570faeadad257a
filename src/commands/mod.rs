//! Command implementations
//!
//! Every command drives the core operations against the opened target.
//! Shared plumbing lives here: image loading, region lookup, and the
//! indicatif-backed progress reporter.

pub mod bootcfg;
pub mod branch;
pub mod info;
pub mod program;
pub mod run;
pub mod verify;

use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use riap_core::layout::{update_bank, Layout, Region};
use riap_core::ops::{self, ProgramStats, ProgressSink};
use riap_core::target::UpdateGuard;
use riap_core::Image;
use riap_dummy::DummyFlash;

use crate::targets;

/// Read an image file into a Vec
pub fn read_image_file(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Look up a region by name, with a readable error
pub fn find_region<'a>(layout: &'a Layout, name: &str) -> Result<&'a Region, Box<dyn Error>> {
    layout
        .find(name)
        .ok_or_else(|| format!("no region named '{}' in the layout", name).into())
}

/// Format a region for display
pub fn describe_region(region: &Region) -> String {
    format!(
        "{} (0x{:08X} - 0x{:08X}, {} bytes)",
        region.name,
        region.start,
        region.end,
        region.size()
    )
}

/// Program an image into a region under a scoped update enable
pub fn program_region(
    flash: &mut DummyFlash,
    region: &Region,
    data: &[u8],
) -> Result<ProgramStats, Box<dyn Error>> {
    if region.readonly {
        return Err(format!("region '{}' is marked read-only", region.name).into());
    }
    let image = Image::new(data);
    let mut progress = BarProgress::new();
    let mut guard = UpdateGuard::new(flash, update_bank(region))?;
    let stats = ops::program_with_progress(&mut *guard, &image, region, &mut progress)?;
    Ok(stats)
}

/// List available targets
pub fn list_targets() {
    println!("Available targets ({}):", targets::default_geometry());
    for target in targets::available_targets() {
        println!("  {:<8} {}", target.name, target.description);
        println!("  {:<8}   params: {}", "", target.params);
    }
}

/// List the regions of the active layout
pub fn regions(layout: &Layout) {
    if let Some(name) = &layout.name {
        println!("Layout: {}", name);
    }
    for region in &layout.regions {
        let ro = if region.readonly { " [ro]" } else { "" };
        println!("  {}{}", describe_region(region), ro);
    }
}

/// Progress reporter using indicatif progress bars
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// Create a reporter with no bar shown yet
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn start_phase(&mut self, total: u32, phase: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn advance(&mut self, done: u32) {
        if let Some(bar) = &self.bar {
            bar.set_position(done as u64);
        }
    }
}

impl ProgressSink for BarProgress {
    fn programming(&mut self, total_bytes: u32) {
        self.start_phase(total_bytes, "programming");
    }

    fn program_progress(&mut self, bytes_done: u32) {
        self.advance(bytes_done);
    }

    fn verifying(&mut self, total_bytes: u32) {
        self.start_phase(total_bytes, "verifying");
    }

    fn verify_progress(&mut self, bytes_done: u32) {
        self.advance(bytes_done);
    }

    fn complete(&mut self, _stats: &ProgramStats) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
