//! TOML layout file parsing
//!
//! Parses layout files in TOML format:
//!
//! ```toml
//! [layout]
//! name = "custom map"
//! chip_size = "1 MiB"
//!
//! [[region]]
//! name = "ap0"
//! start = 0x000000
//! end = 0x00FFFF
//! readonly = true
//!
//! [[region]]
//! name = "ap1"
//! start = 0x010000
//! end = 0x01FFFF
//! ```

use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use super::types::{Layout, LayoutError, Region};

/// TOML layout file structure
#[derive(Debug, serde::Deserialize)]
struct TomlLayoutFile {
    layout: Option<TomlLayoutMeta>,
    region: Vec<TomlRegion>,
}

/// Layout metadata
#[derive(Debug, serde::Deserialize)]
struct TomlLayoutMeta {
    name: Option<String>,
    chip_size: Option<String>,
}

/// Region definition in TOML
#[derive(Debug, serde::Deserialize)]
struct TomlRegion {
    name: String,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    start: u32,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    end: u32,
    #[serde(default)]
    readonly: bool,
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| std::format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| std::format!("invalid number: {}", e))
    }
}

/// Parse a size string like "1 MiB", "4 KiB" or "4096"
pub(crate) fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if let Ok(n) = u32::from_str_radix(hex.trim(), 16) {
            return Ok(n);
        }
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(std::format!("invalid size: {}", s));
    };

    let num: u32 = num_str
        .parse()
        .map_err(|_| std::format!("invalid size: {}", s))?;
    Ok(num * multiplier)
}

impl Layout {
    /// Load a layout from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let content = fs::read_to_string(path).map_err(|_| LayoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse a layout from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, LayoutError> {
        let file: TomlLayoutFile =
            toml::from_str(content).map_err(|_| LayoutError::ParseError)?;

        let mut layout = Layout::new();
        if let Some(meta) = file.layout {
            layout.name = meta.name;
            if let Some(size) = meta.chip_size {
                layout.chip_size =
                    Some(parse_size(&size).map_err(|_| LayoutError::ParseError)?);
            }
        }

        for r in file.region {
            let mut region = Region::new(r.name, r.start, r.end);
            region.readonly = r.readonly;
            layout.add_region(region);
        }

        layout.validate()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_layout() {
        let toml = r#"
[layout]
name = "test map"
chip_size = "128 KiB"

[[region]]
name = "ap0"
start = 0x0000
end = 0xFFFF
readonly = true

[[region]]
name = "ap1"
start = "0x10000"
end = "0x1FFFF"
"#;
        let layout = Layout::from_toml_str(toml).unwrap();
        assert_eq!(layout.name.as_deref(), Some("test map"));
        assert_eq!(layout.chip_size, Some(128 * 1024));
        assert_eq!(layout.regions.len(), 2);
        assert!(layout.find("ap0").unwrap().readonly);
        assert_eq!(layout.find("ap1").unwrap().start, 0x10000);
    }

    #[test]
    fn overlapping_file_is_rejected() {
        let toml = r#"
[[region]]
name = "a"
start = 0x0000
end = 0x1000

[[region]]
name = "b"
start = 0x0800
end = 0x2000
"#;
        assert_eq!(
            Layout::from_toml_str(toml).unwrap_err(),
            LayoutError::OverlappingRegions
        );
    }

    #[test]
    fn sizes_accept_suffixes() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("4 KiB"), Ok(4096));
        assert_eq!(parse_size("1mib"), Ok(1024 * 1024));
        assert_eq!(parse_size("0x200"), Ok(512));
        assert!(parse_size("lots").is_err());
    }
}
