//! Editor configuration and the icon sheet.
//!
//! Both are read once at startup and handed to the parts that need them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::timestamp::{TimestampCodec, ZoneTable};

/// Lines at the top of a `.t3s` sheet that are tex3ds options, not icons.
const SHEET_HEADER_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSpec {
    pub abbr: String,
    pub offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default = "default_timezones")]
    pub timezones: Vec<ZoneSpec>,
    #[serde(default)]
    pub icon_sheet: Option<PathBuf>,
}

fn default_timezones() -> Vec<ZoneSpec> {
    ZoneTable::default()
        .iter()
        .map(|(abbr, secs)| ZoneSpec {
            abbr: abbr.to_string(),
            offset_minutes: secs / 60,
        })
        .collect()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            timezones: default_timezones(),
            icon_sheet: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn zone_table(&self) -> Result<ZoneTable> {
        let mut table = ZoneTable::empty();
        for zone in &self.timezones {
            let seconds = zone.offset_minutes.checked_mul(60).ok_or_else(|| {
                StoreError::InvalidConfig(format!("offset for {} out of range", zone.abbr))
            })?;
            table.insert(zone.abbr.clone(), seconds)?;
        }
        Ok(table)
    }

    pub fn codec(&self) -> Result<TimestampCodec> {
        Ok(TimestampCodec::new(self.zone_table()?))
    }

    pub fn load_icon_sheet(&self) -> Result<Option<IconSheet>> {
        self.icon_sheet
            .as_deref()
            .map(IconSheet::load)
            .transpose()
    }
}

/// Icon file names listed in a tex3ds sprite sheet, indexed by `icon_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSheet {
    dir: PathBuf,
    icons: Vec<String>,
}

impl IconSheet {
    /// Parses sheet text; icon paths resolve relative to the current directory.
    pub fn parse(text: &str) -> Self {
        Self {
            dir: PathBuf::new(),
            icons: text
                .lines()
                .skip(SHEET_HEADER_LINES)
                .map(str::to_string)
                .collect(),
        }
    }

    /// Reads a sheet file; icon paths resolve relative to the sheet's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut sheet = Self::parse(&content);
        sheet.dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(sheet)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.icons.len()
    }

    pub fn resolve(&self, index: usize) -> Option<&str> {
        self.icons.get(index).map(String::as_str)
    }

    pub fn icon_path(&self, index: usize) -> Option<PathBuf> {
        self.resolve(index).map(|name| self.dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHEET: &str = "--atlas -f rgba8888 -z auto\n\n01_unistore.png\n02_luma.png\r\n03_godmode9.png\n";

    #[test]
    fn test_sheet_skips_header_lines() {
        let sheet = IconSheet::parse(SHEET);
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.resolve(0), Some("01_unistore.png"));
        assert_eq!(sheet.resolve(1), Some("02_luma.png"));
        assert_eq!(sheet.resolve(3), None);
        assert!(!sheet.contains(3));
    }

    #[test]
    fn test_sheet_paths_are_relative_to_sheet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spritesheet.t3s");
        fs::File::create(&path).unwrap().write_all(SHEET.as_bytes()).unwrap();

        let sheet = IconSheet::load(&path).unwrap();
        assert_eq!(sheet.icon_path(2), Some(dir.path().join("03_godmode9.png")));
    }

    #[test]
    fn test_default_config_matches_default_zones() {
        let config = EditorConfig::default();
        assert_eq!(config.zone_table().unwrap(), ZoneTable::default());
        assert_eq!(config.timezones[0].offset_minutes, -360);
    }

    #[test]
    fn test_config_from_json() {
        let config = EditorConfig::from_json(
            r#"{"timezones": [{"abbr": "UTC", "offsetMinutes": 0}, {"abbr": "CEST", "offsetMinutes": 120}],
                "iconSheet": "assets/icons/spritesheet.t3s"}"#,
        )
        .unwrap();
        let codec = config.codec().unwrap();
        assert!(codec.parse("2024-07-01 at 09:00 (CEST)").is_ok());
        assert!(codec.parse("2024-07-01 at 09:00 (CST)").is_err());
        assert_eq!(config.icon_sheet, Some(PathBuf::from("assets/icons/spritesheet.t3s")));
    }

    #[test]
    fn test_missing_timezones_fall_back_to_defaults() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_duplicate_zone_rejected() {
        let config = EditorConfig::from_json(
            r#"{"timezones": [{"abbr": "UTC", "offsetMinutes": 0}, {"abbr": "UTC", "offsetMinutes": 60}]}"#,
        )
        .unwrap();
        assert!(matches!(config.zone_table(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"iconSheet": null}}"#).unwrap();
        let config = EditorConfig::load(file.path()).unwrap();
        assert!(config.load_icon_sheet().unwrap().is_none());
    }
}
