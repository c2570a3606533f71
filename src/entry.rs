//! Entry Model - one catalog item.
//!
//! An entry object holds an `info` block plus any number of named scripts.
//! Loading never fails: `info` is kept verbatim and only checked when read,
//! and a script that does not decode is held raw until someone asks for it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::script::Script;
use crate::timestamp::TimestampCodec;

/// Reserved key for entry metadata; never usable as a script name.
pub const INFO_KEY: &str = "info";

/// Typed view of an entry's `info` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub title: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub license: String,
    pub releasenotes: String,
    pub icon_index: usize,
    pub last_updated: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntryInfo {
    pub const FIELDS: [&'static str; 8] = [
        "title",
        "author",
        "version",
        "description",
        "license",
        "releasenotes",
        "icon_index",
        "last_updated",
    ];
}

#[derive(Debug, Clone, PartialEq)]
enum ScriptBody {
    /// `pristine` holds the source JSON until the script is first mutated.
    Parsed { script: Script, pristine: Option<Value> },
    Invalid(Value),
}

impl ScriptBody {
    fn load(name: &str, value: Value) -> Self {
        match Script::from_value(name, value.clone()) {
            Ok(script) => ScriptBody::Parsed { script, pristine: Some(value) },
            Err(e) => {
                tracing::warn!(script = name, error = %e, "keeping undecodable script as-is");
                ScriptBody::Invalid(value)
            }
        }
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            ScriptBody::Parsed { pristine: Some(raw), .. } => Ok(raw.clone()),
            ScriptBody::Parsed { script, pristine: None } => script.to_value(),
            ScriptBody::Invalid(raw) => Ok(raw.clone()),
        }
    }
}

/// Read-only view of a script slot.
#[derive(Debug, Clone, Copy)]
pub enum ScriptView<'a> {
    Parsed(&'a Script),
    /// The raw JSON of a script that failed to decode.
    Invalid(&'a Value),
}

fn invalid_script_error(name: &str, raw: &Value) -> StoreError {
    match Script::from_value(name, raw.clone()) {
        Err(e) => e,
        Ok(_) => StoreError::InvalidScript(name.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    info: Option<Value>,
    /// How many scripts preceded `info` in the source object.
    info_position: usize,
    scripts: IndexMap<String, ScriptBody>,
    /// Source value of an entry that was not an object, written back until edited.
    malformed: Option<Value>,
}

impl Entry {
    /// A new entry with the given metadata and no scripts.
    pub fn new(info: EntryInfo) -> Result<Self> {
        Ok(Self {
            info: Some(serde_json::to_value(info)?),
            ..Self::default()
        })
    }

    /// Any JSON value; a non-object is kept verbatim as a malformed entry.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Self {
                malformed: Some(other),
                ..Self::default()
            },
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut entry = Self::default();
        for (key, value) in map {
            if key == INFO_KEY {
                entry.info = Some(value);
                entry.info_position = entry.scripts.len();
            } else {
                let body = ScriptBody::load(&key, value);
                entry.scripts.insert(key, body);
            }
        }
        entry
    }

    /// Keys come out in load order, with `info` back where it was found.
    pub fn to_value(&self) -> Result<Value> {
        if let Some(raw) = &self.malformed {
            return Ok(raw.clone());
        }
        let info_at = self.info_position.min(self.scripts.len());
        let mut map = Map::new();
        for (position, (name, body)) in self.scripts.iter().enumerate() {
            if position == info_at {
                self.write_info(&mut map);
            }
            map.insert(name.clone(), body.to_value()?);
        }
        if info_at == self.scripts.len() {
            self.write_info(&mut map);
        }
        Ok(Value::Object(map))
    }

    fn write_info(&self, map: &mut Map<String, Value>) {
        if let Some(info) = &self.info {
            map.insert(INFO_KEY.to_string(), info.clone());
        }
    }

    /// True for an entry loaded from something other than a JSON object.
    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    /// Any edit turns a malformed entry into a (so far empty) object.
    fn ensure_object(&mut self) {
        if self.malformed.take().is_some() {
            tracing::debug!("replacing malformed entry with an object");
        }
    }

    // --- Info ---

    pub fn info_value(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    fn info_object(&self) -> Result<&Map<String, Value>> {
        if self.is_malformed() {
            return Err(StoreError::InvalidEntryInfo("entry is not an object".to_string()));
        }
        match &self.info {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(StoreError::InvalidEntryInfo("'info' is not an object".to_string())),
            None => Err(StoreError::MissingInfoField(INFO_KEY.to_string())),
        }
    }

    pub fn info_field(&self, key: &str) -> Result<&Value> {
        self.info_object()?
            .get(key)
            .ok_or_else(|| StoreError::MissingInfoField(key.to_string()))
    }

    fn info_str(&self, key: &str) -> Result<&str> {
        self.info_field(key)?
            .as_str()
            .ok_or_else(|| StoreError::InvalidEntryInfo(format!("'{key}' must be a string")))
    }

    pub fn title(&self) -> Result<&str> {
        self.info_str("title")
    }

    pub fn last_updated(&self) -> Result<&str> {
        self.info_str("last_updated")
    }

    pub fn icon_index(&self) -> Result<usize> {
        self.info_field("icon_index")?
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| {
                StoreError::InvalidEntryInfo("'icon_index' must be a non-negative integer".to_string())
            })
    }

    /// Decodes the full info block. Missing fields are reported by name.
    pub fn info(&self) -> Result<EntryInfo> {
        let object = self.info_object()?;
        if let Some(missing) = EntryInfo::FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(StoreError::MissingInfoField(missing.to_string()));
        }
        serde_json::from_value(Value::Object(object.clone()))
            .map_err(|e| StoreError::InvalidEntryInfo(e.to_string()))
    }

    pub fn set_info(&mut self, info: EntryInfo) -> Result<()> {
        self.ensure_object();
        self.info = Some(serde_json::to_value(info)?);
        Ok(())
    }

    /// Sets one info field, creating the `info` object if it is absent or not an object.
    pub fn set_info_field(&mut self, key: &str, value: impl Into<Value>) {
        self.ensure_object();
        if !matches!(self.info, Some(Value::Object(_))) {
            self.info = Some(Value::Object(Map::new()));
        }
        if let Some(Value::Object(map)) = &mut self.info {
            map.insert(key.to_string(), value.into());
        }
    }

    /// Stamps `last_updated` with the current time and returns the new text.
    pub fn touch(&mut self, codec: &TimestampCodec) -> Result<String> {
        let stamp = codec.format(&codec.now())?;
        self.set_info_field("last_updated", stamp.clone());
        Ok(stamp)
    }

    // --- Scripts ---

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    pub fn script_names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn contains_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn scripts(&self) -> impl Iterator<Item = (&str, ScriptView<'_>)> {
        self.scripts.iter().map(|(name, body)| {
            let view = match body {
                ScriptBody::Parsed { script, .. } => ScriptView::Parsed(script),
                ScriptBody::Invalid(raw) => ScriptView::Invalid(raw),
            };
            (name.as_str(), view)
        })
    }

    pub fn script(&self, name: &str) -> Result<&Script> {
        match self.scripts.get(name) {
            Some(ScriptBody::Parsed { script, .. }) => Ok(script),
            Some(ScriptBody::Invalid(raw)) => Err(invalid_script_error(name, raw)),
            None => Err(StoreError::ScriptNotFound(name.to_string())),
        }
    }

    pub fn script_mut(&mut self, name: &str) -> Result<&mut Script> {
        match self.scripts.get_mut(name) {
            Some(ScriptBody::Parsed { script, pristine }) => {
                *pristine = None;
                Ok(script)
            }
            Some(ScriptBody::Invalid(raw)) => Err(invalid_script_error(name, raw)),
            None => Err(StoreError::ScriptNotFound(name.to_string())),
        }
    }

    /// Stores `script` under `name`, replacing whatever was there.
    pub fn set_script(&mut self, name: &str, script: Script) -> Result<()> {
        if name == INFO_KEY {
            return Err(StoreError::InvalidScript(name.to_string()));
        }
        self.ensure_object();
        self.scripts.insert(
            name.to_string(),
            ScriptBody::Parsed { script, pristine: None },
        );
        Ok(())
    }

    /// Adds an empty script, disambiguating the name if it is taken.
    pub fn add_script(&mut self, name: &str) -> String {
        self.ensure_object();
        let final_name = self.available_name(name);
        self.scripts.insert(
            final_name.clone(),
            ScriptBody::Parsed { script: Script::new(), pristine: None },
        );
        final_name
    }

    pub fn remove_script(&mut self, name: &str) -> Result<()> {
        self.scripts
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::ScriptNotFound(name.to_string()))
    }

    /// Renames `old` to `new`, appending `(n)` with the smallest free `n`
    /// when `new` is taken. The script keeps its position.
    pub fn rename_script(&mut self, old: &str, new: &str) -> Result<String> {
        if old == new {
            return Ok(old.to_string());
        }
        let (index, _, body) = self
            .scripts
            .shift_remove_full(old)
            .ok_or_else(|| StoreError::ScriptNotFound(old.to_string()))?;

        let final_name = self.available_name(new);
        tracing::debug!(from = old, to = %final_name, "renaming script");
        self.scripts.shift_insert(index, final_name.clone(), body);
        Ok(final_name)
    }

    fn is_taken(&self, name: &str) -> bool {
        name == INFO_KEY || self.scripts.contains_key(name)
    }

    fn available_name(&self, base: &str) -> String {
        if !self.is_taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}({n})"))
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BlockKind;
    use serde_json::json;

    fn sample() -> Entry {
        let value = json!({
            "info": {
                "title": "Universal-Updater",
                "author": "Universal-Team",
                "version": "v3.2.1",
                "description": "An easy to use app for installing homebrew",
                "license": "GPL-3.0",
                "releasenotes": "",
                "icon_index": 4,
                "last_updated": "2024-05-01 at 12:30 (CDT)"
            },
            "Universal-Updater.cia": [
                {"type": "downloadRelease", "repo": "Universal-Team/Universal-Updater",
                 "file": "Universal-Updater.cia", "output": "sdmc:/UU.cia", "includePrereleases": false},
                {"type": "installCia", "file": "sdmc:/UU.cia"},
                {"type": "deleteFile", "file": "sdmc:/UU.cia"}
            ],
            "Universal-Updater.3dsx": [
                {"type": "downloadRelease", "repo": "Universal-Team/Universal-Updater",
                 "file": "Universal-Updater.3dsx", "output": "sdmc:/3ds/UU.3dsx", "includePrereleases": false}
            ]
        });
        match value {
            Value::Object(map) => Entry::from_map(map),
            _ => unreachable!(),
        }
    }

    fn names(entry: &Entry) -> Vec<&str> {
        entry.script_names().collect()
    }

    #[test]
    fn test_typed_info_access() {
        let entry = sample();
        let info = entry.info().unwrap();
        assert_eq!(info.title, "Universal-Updater");
        assert_eq!(info.icon_index, 4);
        assert_eq!(entry.icon_index().unwrap(), 4);
        assert_eq!(entry.last_updated().unwrap(), "2024-05-01 at 12:30 (CDT)");
    }

    #[test]
    fn test_missing_info_fields_fail_on_access() {
        let entry = Entry::from_map(
            json!({"info": {"title": "Only a title"}}).as_object().unwrap().clone(),
        );
        assert_eq!(entry.title().unwrap(), "Only a title");
        assert!(matches!(entry.last_updated(), Err(StoreError::MissingInfoField(f)) if f == "last_updated"));
        assert!(matches!(entry.info(), Err(StoreError::MissingInfoField(f)) if f == "author"));

        let bare = Entry::default();
        assert!(matches!(bare.title(), Err(StoreError::MissingInfoField(_))));
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let mut entry = sample();
        let name = entry.rename_script("Universal-Updater.cia", "Universal-Updater.cia").unwrap();
        assert_eq!(name, "Universal-Updater.cia");
        assert_eq!(entry.script_count(), 2);
    }

    #[test]
    fn test_rename_keeps_position_and_blocks() {
        let mut entry = sample();
        let name = entry.rename_script("Universal-Updater.cia", "CIA").unwrap();
        assert_eq!(name, "CIA");
        assert_eq!(names(&entry), vec!["CIA", "Universal-Updater.3dsx"]);
        assert_eq!(entry.script("CIA").unwrap().len(), 3);
        assert!(matches!(
            entry.script("Universal-Updater.cia"),
            Err(StoreError::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_rename_picks_smallest_free_suffix() {
        let mut entry = sample();
        entry.add_script("init");
        entry.add_script("init(1)");
        entry.add_script("other");
        assert_eq!(entry.rename_script("other", "init").unwrap(), "init(2)");
        assert!(!entry.contains_script("other"));
    }

    #[test]
    fn test_rename_never_lands_on_info() {
        let mut entry = sample();
        let name = entry.rename_script("Universal-Updater.3dsx", INFO_KEY).unwrap();
        assert_eq!(name, "info(1)");
        assert_eq!(entry.to_value().unwrap()["info"]["title"], json!("Universal-Updater"));
    }

    #[test]
    fn test_rename_unknown_script() {
        let mut entry = sample();
        assert!(matches!(
            entry.rename_script("missing", "x"),
            Err(StoreError::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_untouched_scripts_round_trip_verbatim() {
        let entry = sample();
        let out = entry.to_value().unwrap();
        let again = Entry::from_map(out.as_object().unwrap().clone());
        assert_eq!(again, entry);
        assert_eq!(
            serde_json::to_string(&out["Universal-Updater.cia"][0]).unwrap(),
            r#"{"type":"downloadRelease","repo":"Universal-Team/Universal-Updater","file":"Universal-Updater.cia","output":"sdmc:/UU.cia","includePrereleases":false}"#
        );
    }

    #[test]
    fn test_mutated_script_is_reserialized() {
        let mut entry = sample();
        entry.script_mut("Universal-Updater.3dsx").unwrap().push(BlockKind::Exit).unwrap();
        let out = entry.to_value().unwrap();
        assert_eq!(out["Universal-Updater.3dsx"][1], json!({"type": "exit"}));
    }

    #[test]
    fn test_invalid_script_held_raw_and_failed_on_access() {
        let raw = json!({"info": {}, "broken": [{"type": "format", "drive": "sdmc"}]});
        let entry = Entry::from_map(raw.as_object().unwrap().clone());
        assert!(matches!(entry.script("broken"), Err(StoreError::UnknownBlockKind(_))));
        assert_eq!(entry.to_value().unwrap(), raw);
    }

    #[test]
    fn test_touch_sets_utc_stamp() {
        let mut entry = sample();
        let stamp = entry.touch(&TimestampCodec::default()).unwrap();
        assert!(stamp.ends_with("(UTC)"));
        assert_eq!(entry.last_updated().unwrap(), stamp);
    }

    #[test]
    fn test_info_keeps_its_key_position() {
        let raw = json!({
            "install": [{"type": "exit"}],
            "info": {"title": "late info"},
            "uninstall": []
        });
        let mut entry = Entry::from_map(raw.as_object().unwrap().clone());
        assert_eq!(
            serde_json::to_string(&entry.to_value().unwrap()).unwrap(),
            serde_json::to_string(&raw).unwrap()
        );

        entry.remove_script("uninstall").unwrap();
        let keys: Vec<String> = entry.to_value().unwrap().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["install", "info"]);
    }

    #[test]
    fn test_non_object_entry_kept_until_edited() {
        let mut entry = Entry::from_value(json!("legacy"));
        assert!(entry.is_malformed());
        assert_eq!(entry.to_value().unwrap(), json!("legacy"));
        assert!(matches!(entry.title(), Err(StoreError::InvalidEntryInfo(_))));

        entry.set_info_field("title", "fresh");
        assert!(!entry.is_malformed());
        assert_eq!(entry.to_value().unwrap(), json!({"info": {"title": "fresh"}}));
    }

    #[test]
    fn test_set_script_rejects_info_key() {
        let mut entry = sample();
        assert!(entry.set_script(INFO_KEY, Script::new()).is_err());
    }
}
