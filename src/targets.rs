//! Target registration and dispatch
//!
//! Targets are selected by a spec string of the form
//! `name:key=value,key=value`. The only backend today is the in-memory
//! dummy MCU, whose flash banks can be persisted to a state file so the
//! simulated part survives between invocations.

use std::fs;
use std::path::{Path, PathBuf};

use riap_core::layout::{APROM_SIZE, LDROM_SIZE, PAGE_SIZE};
use riap_dummy::{DummyConfig, DummyTarget};
use thiserror::Error;

/// Errors opening or persisting a target
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("unknown target '{0}'")]
    Unknown(String),

    #[error("invalid target parameter '{0}'")]
    InvalidParam(String),

    #[error("state file {path:?}: expected {expected} bytes, found {found}")]
    StateSize {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("state file: {0}")]
    Io(#[from] std::io::Error),
}

/// Information about a target backend
pub struct TargetInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Accepted parameters
    pub params: &'static str,
}

/// Get information about all available targets (enabled at compile time)
pub fn available_targets() -> Vec<TargetInfo> {
    let mut targets = Vec::new();

    targets.push(TargetInfo {
        name: "dummy",
        description: "In-memory MCU emulator",
        params: "state=<file>,aprom=<size>,ldrom=<size>,page=<size>",
    });

    targets
}

/// Comma-separated names of the available targets
pub fn target_names() -> String {
    available_targets()
        .iter()
        .map(|t| t.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An opened target plus its persistence settings
pub struct TargetHandle {
    /// The opened dummy target
    pub target: DummyTarget,
    state_path: Option<PathBuf>,
}

impl TargetHandle {
    /// Persist the flash banks back to the state file, if one was given
    pub fn save(&self) -> Result<(), TargetError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let flash = &self.target.flash;
        let mut state =
            Vec::with_capacity(flash.aprom().len() + flash.ldrom().len() + 8);
        state.extend_from_slice(flash.aprom());
        state.extend_from_slice(flash.ldrom());
        for word in flash.config_words() {
            state.extend_from_slice(&word.to_le_bytes());
        }
        fs::write(path, state)?;
        log::debug!("state saved to {}", path.display());
        Ok(())
    }
}

/// Open a target from its spec string
pub fn open_target(spec: &str) -> Result<TargetHandle, TargetError> {
    let (name, params) = match spec.split_once(':') {
        Some((name, params)) => (name, params),
        None => (spec, ""),
    };

    match name {
        "dummy" => open_dummy(params),
        _ => Err(TargetError::Unknown(name.to_string())),
    }
}

fn open_dummy(params: &str) -> Result<TargetHandle, TargetError> {
    let mut config = DummyConfig::default();
    let mut state_path = None;

    for param in params.split(',').filter(|p| !p.is_empty()) {
        let Some((key, value)) = param.split_once('=') else {
            return Err(TargetError::InvalidParam(param.to_string()));
        };
        match key {
            "state" => state_path = Some(PathBuf::from(value)),
            "aprom" => config.aprom_size = parse_size(value, param)?,
            "ldrom" => config.ldrom_size = parse_size(value, param)?,
            "page" => config.page_size = parse_size(value, param)?,
            _ => return Err(TargetError::InvalidParam(param.to_string())),
        }
    }

    let mut target = DummyTarget::new(config);
    if let Some(path) = &state_path {
        if path.exists() {
            load_state(&mut target, path)?;
        } else {
            log::info!("state file {} not found, starting erased", path.display());
        }
    }

    Ok(TargetHandle { target, state_path })
}

fn load_state(target: &mut DummyTarget, path: &Path) -> Result<(), TargetError> {
    let state = fs::read(path)?;
    let flash = &mut target.flash;
    let aprom_len = flash.aprom().len();
    let ldrom_len = flash.ldrom().len();
    let expected = aprom_len + ldrom_len + 8;
    if state.len() != expected {
        return Err(TargetError::StateSize {
            path: path.to_path_buf(),
            expected,
            found: state.len(),
        });
    }

    flash.aprom_mut().copy_from_slice(&state[..aprom_len]);
    flash
        .ldrom_mut()
        .copy_from_slice(&state[aprom_len..aprom_len + ldrom_len]);
    let mut words = [0u32; 2];
    for (i, word) in words.iter_mut().enumerate() {
        let at = aprom_len + ldrom_len + i * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&state[at..at + 4]);
        *word = u32::from_le_bytes(bytes);
    }
    flash.set_config_words(words);
    log::debug!("state loaded from {}", path.display());
    Ok(())
}

/// Parse a size value like "128KiB", "4 KiB" or "4096"
fn parse_size(value: &str, param: &str) -> Result<u32, TargetError> {
    let s = value.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if let Ok(n) = u32::from_str_radix(hex, 16) {
            return Ok(n);
        }
    }
    let lower = s.to_lowercase();
    let (num, multiplier) = if let Some(n) = lower.strip_suffix("mib") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("kib") {
        (n, 1024)
    } else if let Some(n) = lower.strip_suffix("k") {
        (n, 1024)
    } else {
        return Err(TargetError::InvalidParam(param.to_string()));
    };
    num.trim()
        .parse::<u32>()
        .map(|n| n * multiplier)
        .map_err(|_| TargetError::InvalidParam(param.to_string()))
}

/// Sanity defaults, used by help text
pub fn default_geometry() -> String {
    format!(
        "aprom {} KiB, ldrom {} KiB, {} byte pages",
        APROM_SIZE / 1024,
        LDROM_SIZE / 1024,
        PAGE_SIZE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_opens_with_defaults() {
        let handle = open_target("dummy").unwrap();
        assert_eq!(handle.target.flash.aprom().len(), APROM_SIZE as usize);
        assert!(handle.state_path.is_none());
    }

    #[test]
    fn params_override_geometry() {
        let handle = open_target("dummy:aprom=64KiB,ldrom=0x800,page=256").unwrap();
        assert_eq!(handle.target.flash.aprom().len(), 64 * 1024);
        assert_eq!(handle.target.flash.ldrom().len(), 0x800);
        assert_eq!(handle.target.flash.config().page_size, 256);
    }

    #[test]
    fn unknown_target_and_params_are_rejected() {
        assert!(matches!(
            open_target("serprog"),
            Err(TargetError::Unknown(_))
        ));
        assert!(matches!(
            open_target("dummy:bogus=1"),
            Err(TargetError::InvalidParam(_))
        ));
        assert!(matches!(
            open_target("dummy:aprom"),
            Err(TargetError::InvalidParam(_))
        ));
    }

    #[test]
    fn sizes_accept_suffixes() {
        assert_eq!(parse_size("4096", "p").unwrap(), 4096);
        assert_eq!(parse_size("4KiB", "p").unwrap(), 4096);
        assert_eq!(parse_size("128k", "p").unwrap(), 128 * 1024);
        assert_eq!(parse_size("1 MiB", "p").unwrap(), 1024 * 1024);
        assert!(parse_size("lots", "p").is_err());
    }

    #[test]
    fn state_round_trips_through_a_file() {
        let dir = std::env::temp_dir().join("riap-target-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.bin");
        let _ = std::fs::remove_file(&path);
        let spec = format!("dummy:state={}", path.display());

        {
            let mut handle = open_target(&spec).unwrap();
            handle.target.flash.aprom_mut()[0] = 0x42;
            handle.target.flash.set_config_words([0xC1, 0]);
            handle.save().unwrap();
        }

        let handle = open_target(&spec).unwrap();
        assert_eq!(handle.target.flash.aprom()[0], 0x42);
        assert_eq!(handle.target.flash.config_words(), [0xC1, 0]);

        let _ = std::fs::remove_file(&path);
    }
}
