//! Store Document - The Whole File
//!
//! `load` never fails. A missing or malformed top level is repaired into a
//! usable document and each repair is reported as a [`MalformedDocument`]
//! advisory. Problems below the top level are left for the point of use.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::entry::Entry;
use crate::error::{Result, StoreError};
use crate::hashing;
use crate::timestamp::TimestampCodec;

pub const STORE_INFO_KEY: &str = "storeInfo";
pub const STORE_CONTENT_KEY: &str = "storeContent";

/// File name written into a synthesized `storeInfo` when none is given.
pub const TEMPLATE_FILE_NAME: &str = "store.unistore";

/// Top-level `storeInfo` mapping.
pub type StoreInfo = Map<String, Value>;

/// Placeholder `storeInfo` for files that lack one.
pub fn template_store_info(file_name: &str) -> StoreInfo {
    let template = json!({
        "title": "dummyTitle",
        "author": "dummy",
        "description": "dummyDescription",
        "file": file_name,
        "url": "dummyUrl.com",
        "sheet": "dummySheet.t3x",
        "sheetURL": "dummySheetUrl.com",
        "version": 3,
        "revision": 1
    });
    match template {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A repair applied while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedDocument {
    NotAnObject,
    StoreInfoTemplated,
    StoreContentMissing,
    StoreContentNotArray,
    EntryNotObject { index: usize },
}

impl fmt::Display for MalformedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "document is not a JSON object; starting empty"),
            Self::StoreInfoTemplated => write!(
                f,
                "'{STORE_INFO_KEY}' missing; created a template, check the file to replace the placeholder info"
            ),
            Self::StoreContentMissing => write!(f, "'{STORE_CONTENT_KEY}' missing; starting with no entries"),
            Self::StoreContentNotArray => {
                write!(f, "'{STORE_CONTENT_KEY}' is not a list; starting with no entries")
            }
            Self::EntryNotObject { index } => {
                write!(f, "entry {index} is not an object; kept as-is until edited")
            }
        }
    }
}

/// Result of [`StoreDocument::load`]: always a complete document.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub document: StoreDocument,
    pub advisories: Vec<MalformedDocument>,
}

impl Loaded {
    pub fn is_clean(&self) -> bool {
        self.advisories.is_empty()
    }
}

/// An entry paired with its position in the document.
#[derive(Debug, Clone, Copy)]
pub struct EntryRef<'a> {
    pub index: usize,
    pub entry: &'a Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreDocument {
    info: StoreInfo,
    entries: Vec<Entry>,
    /// Unrecognised top-level keys, written back as found.
    extra: Map<String, Value>,
}

impl StoreDocument {
    /// An empty document with template info.
    pub fn new(file_name: &str) -> Self {
        Self {
            info: template_store_info(file_name),
            entries: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn load(raw: Value) -> Loaded {
        Self::load_named(raw, TEMPLATE_FILE_NAME)
    }

    /// Loads `raw`, using `file_name` for the `file` field if `storeInfo` has to be synthesized.
    pub fn load_named(raw: Value, file_name: &str) -> Loaded {
        let mut advisories = Vec::new();

        let mut top = match raw {
            Value::Object(map) => map,
            _ => {
                advisories.push(MalformedDocument::NotAnObject);
                Map::new()
            }
        };

        let info = match top.shift_remove(STORE_INFO_KEY) {
            Some(Value::Object(map)) => map,
            _ => {
                advisories.push(MalformedDocument::StoreInfoTemplated);
                template_store_info(file_name)
            }
        };

        let items = match top.shift_remove(STORE_CONTENT_KEY) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                advisories.push(MalformedDocument::StoreContentNotArray);
                Vec::new()
            }
            None => {
                advisories.push(MalformedDocument::StoreContentMissing);
                Vec::new()
            }
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_object() {
                    advisories.push(MalformedDocument::EntryNotObject { index });
                }
                Entry::from_value(item)
            })
            .collect();

        for advisory in &advisories {
            tracing::warn!(file = file_name, "{advisory}");
        }

        Loaded {
            document: Self { info, entries, extra: top },
            advisories,
        }
    }

    pub fn serialize(&self) -> Result<Value> {
        let content = self
            .entries
            .iter()
            .map(Entry::to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut top = Map::new();
        top.insert(STORE_INFO_KEY.to_string(), Value::Object(self.info.clone()));
        top.insert(STORE_CONTENT_KEY.to_string(), Value::Array(content));
        for (key, value) in &self.extra {
            top.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(top))
    }

    /// SHA-256 of the canonical serialization.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(hashing::fingerprint(&self.serialize()?)?)
    }

    pub fn info(&self) -> &StoreInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut StoreInfo {
        &mut self.info
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Result<&Entry> {
        StoreError::check_index(index, self.entries.len())?;
        Ok(&self.entries[index])
    }

    pub fn entry_mut(&mut self, index: usize) -> Result<&mut Entry> {
        StoreError::check_index(index, self.entries.len())?;
        Ok(&mut self.entries[index])
    }

    /// Appends `entry` and returns its index.
    pub fn add_entry(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        tracing::debug!(index = self.entries.len() - 1, "added entry");
        self.entries.len() - 1
    }

    pub fn remove_entry(&mut self, index: usize) -> Result<Entry> {
        StoreError::check_index(index, self.entries.len())?;
        tracing::debug!(index, "removing entry");
        Ok(self.entries.remove(index))
    }

    /// Entries by descending `last_updated`; equal instants keep document order.
    ///
    /// Fails on the first entry whose `last_updated` is missing or unparseable.
    pub fn sorted_by_recency(&self, codec: &TimestampCodec) -> Result<Vec<EntryRef<'_>>> {
        let mut keyed = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Ok((codec.parse(entry.last_updated()?)?, index, entry)))
            .collect::<Result<Vec<_>>>()?;

        // slice::sort_by is stable
        keyed.sort_by(|a, b| b.0.cmp_instant(&a.0));

        Ok(keyed
            .into_iter()
            .map(|(_, index, entry)| EntryRef { index, entry })
            .collect())
    }

    /// Entries by ascending title; equal titles keep document order.
    pub fn sorted_by_title(&self) -> Result<Vec<EntryRef<'_>>> {
        let mut keyed = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Ok((entry.title()?, index, entry)))
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|a, b| a.0.cmp(b.0));

        Ok(keyed
            .into_iter()
            .map(|(_, index, entry)| EntryRef { index, entry })
            .collect())
    }
}
