//! Block Schema - The Action Contract
//!
//! Every script block carries a `type` tag naming one of thirteen action
//! kinds. The table below is the only place field names and defaults are
//! declared; validation and default construction are both driven by it.

mod block;

pub use block::{
    Block, BootTitle, CopyPath, DeleteFile, DownloadFile, DownloadRelease, Exit, ExtractFile,
    InstallCia, MakeDir, MovePath, PromptMessage, RemoveDir, Skip,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Key holding the kind tag on every block object.
pub const TYPE_KEY: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    DownloadFile,
    DownloadRelease,
    ExtractFile,
    InstallCia,
    BootTitle,
    Mkdir,
    Rmdir,
    Move,
    Copy,
    DeleteFile,
    PromptMessage,
    Skip,
    Exit,
}

/// Default value of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Flag(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(s) => Value::String(s.to_string()),
            FieldDefault::Flag(b) => Value::Bool(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: FieldDefault,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec { name, default: FieldDefault::Text("") }
}

const fn flag(name: &'static str) -> FieldSpec {
    FieldSpec { name, default: FieldDefault::Flag(false) }
}

const DOWNLOAD_FILE: &[FieldSpec] = &[text("file"), text("output")];
const DOWNLOAD_RELEASE: &[FieldSpec] = &[
    text("repo"),
    text("file"),
    text("output"),
    flag("includePrereleases"),
];
const EXTRACT_FILE: &[FieldSpec] = &[text("file"), text("input"), text("output")];
const INSTALL_CIA: &[FieldSpec] = &[text("file")];
const BOOT_TITLE: &[FieldSpec] = &[text("TitleID"), flag("NAND")];
const MKDIR: &[FieldSpec] = &[text("directory")];
const RMDIR: &[FieldSpec] = &[text("directory"), flag("required")];
const MOVE: &[FieldSpec] = &[text("old"), text("new")];
const COPY: &[FieldSpec] = &[text("source"), text("destination")];
const DELETE_FILE: &[FieldSpec] = &[text("file")];
const PROMPT_MESSAGE: &[FieldSpec] = &[text("message"), text("count")];
const SKIP: &[FieldSpec] = &[text("count")];
const EXIT: &[FieldSpec] = &[];

impl BlockKind {
    pub const ALL: [BlockKind; 13] = [
        BlockKind::DownloadFile,
        BlockKind::DownloadRelease,
        BlockKind::ExtractFile,
        BlockKind::InstallCia,
        BlockKind::BootTitle,
        BlockKind::Mkdir,
        BlockKind::Rmdir,
        BlockKind::Move,
        BlockKind::Copy,
        BlockKind::DeleteFile,
        BlockKind::PromptMessage,
        BlockKind::Skip,
        BlockKind::Exit,
    ];

    /// The tag written to the `type` key.
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::DownloadFile => "downloadFile",
            BlockKind::DownloadRelease => "downloadRelease",
            BlockKind::ExtractFile => "extractFile",
            BlockKind::InstallCia => "installCia",
            BlockKind::BootTitle => "bootTitle",
            BlockKind::Mkdir => "mkdir",
            BlockKind::Rmdir => "rmdir",
            BlockKind::Move => "move",
            BlockKind::Copy => "copy",
            BlockKind::DeleteFile => "deleteFile",
            BlockKind::PromptMessage => "promptMessage",
            BlockKind::Skip => "skip",
            BlockKind::Exit => "exit",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| StoreError::UnknownBlockKind(tag.to_string()))
    }

    /// Ordered field list for this kind.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            BlockKind::DownloadFile => DOWNLOAD_FILE,
            BlockKind::DownloadRelease => DOWNLOAD_RELEASE,
            BlockKind::ExtractFile => EXTRACT_FILE,
            BlockKind::InstallCia => INSTALL_CIA,
            BlockKind::BootTitle => BOOT_TITLE,
            BlockKind::Mkdir => MKDIR,
            BlockKind::Rmdir => RMDIR,
            BlockKind::Move => MOVE,
            BlockKind::Copy => COPY,
            BlockKind::DeleteFile => DELETE_FILE,
            BlockKind::PromptMessage => PROMPT_MESSAGE,
            BlockKind::Skip => SKIP,
            BlockKind::Exit => EXIT,
        }
    }

    /// The block object with every field at its default.
    pub fn default_value(self) -> Value {
        let mut object = Map::new();
        object.insert(TYPE_KEY.to_string(), Value::String(self.tag().to_string()));
        for field in self.fields() {
            object.insert(field.name.to_string(), field.default.to_value());
        }
        Value::Object(object)
    }

    pub fn default_block(self) -> Result<Block> {
        Block::from_value(self.default_value())
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BlockKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

/// Builds a default block for the kind named by `tag`.
pub fn create_default(tag: &str) -> Result<Block> {
    BlockKind::from_tag(tag)?.default_block()
}

/// Checks that `value` is a block of a known kind carrying every schema field.
///
/// Field types are not checked here; [`Block::from_value`] does that when
/// decoding into the typed variant.
pub fn validate(value: &Value) -> Result<BlockKind> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::InvalidBlock("block must be a JSON object".to_string()))?;

    let tag = match object.get(TYPE_KEY) {
        Some(Value::String(tag)) => tag,
        Some(other) => {
            return Err(StoreError::InvalidBlock(format!(
                "'{TYPE_KEY}' must be a string, got {other}"
            )))
        }
        None => {
            return Err(StoreError::InvalidBlock(format!(
                "block has no '{TYPE_KEY}' key"
            )))
        }
    };
    let kind = BlockKind::from_tag(tag)?;

    let missing: Vec<String> = kind
        .fields()
        .iter()
        .filter(|field| !object.contains_key(field.name))
        .map(|field| field.name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(kind)
    } else {
        Err(StoreError::MissingField {
            kind: kind.tag().to_string(),
            fields: missing,
        })
    }
}
