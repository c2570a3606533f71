//! Typed block variants.
//!
//! Keys a block carries beyond its schema fields land in `extra` and are
//! written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{validate, BlockKind};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    DownloadFile(DownloadFile),
    DownloadRelease(DownloadRelease),
    ExtractFile(ExtractFile),
    InstallCia(InstallCia),
    BootTitle(BootTitle),
    Mkdir(MakeDir),
    Rmdir(RemoveDir),
    Move(MovePath),
    Copy(CopyPath),
    DeleteFile(DeleteFile),
    PromptMessage(PromptMessage),
    Skip(Skip),
    Exit(Exit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFile {
    pub file: String,
    pub output: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fetches an asset from the latest GitHub release of `repo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRelease {
    pub repo: String,
    pub file: String,
    pub output: String,
    pub include_prereleases: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractFile {
    pub file: String,
    pub input: String,
    pub output: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallCia {
    pub file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootTitle {
    #[serde(rename = "TitleID")]
    pub title_id: String,
    #[serde(rename = "NAND")]
    pub nand: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeDir {
    pub directory: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveDir {
    pub directory: String,
    pub required: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePath {
    pub old: String,
    pub new: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyPath {
    pub source: String,
    pub destination: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteFile {
    pub file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `count` is left untyped: store files write it as either a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub message: String,
    pub count: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skip {
    pub count: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::DownloadFile(_) => BlockKind::DownloadFile,
            Block::DownloadRelease(_) => BlockKind::DownloadRelease,
            Block::ExtractFile(_) => BlockKind::ExtractFile,
            Block::InstallCia(_) => BlockKind::InstallCia,
            Block::BootTitle(_) => BlockKind::BootTitle,
            Block::Mkdir(_) => BlockKind::Mkdir,
            Block::Rmdir(_) => BlockKind::Rmdir,
            Block::Move(_) => BlockKind::Move,
            Block::Copy(_) => BlockKind::Copy,
            Block::DeleteFile(_) => BlockKind::DeleteFile,
            Block::PromptMessage(_) => BlockKind::PromptMessage,
            Block::Skip(_) => BlockKind::Skip,
            Block::Exit(_) => BlockKind::Exit,
        }
    }

    /// Validates `value` against the schema, then decodes it.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = validate(&value)?;
        serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidBlock(format!("{kind}: {e}")))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Keys outside the schema, carried through untouched.
    pub fn extra(&self) -> &Map<String, Value> {
        match self {
            Block::DownloadFile(b) => &b.extra,
            Block::DownloadRelease(b) => &b.extra,
            Block::ExtractFile(b) => &b.extra,
            Block::InstallCia(b) => &b.extra,
            Block::BootTitle(b) => &b.extra,
            Block::Mkdir(b) => &b.extra,
            Block::Rmdir(b) => &b.extra,
            Block::Move(b) => &b.extra,
            Block::Copy(b) => &b.extra,
            Block::DeleteFile(b) => &b.extra,
            Block::PromptMessage(b) => &b.extra,
            Block::Skip(b) => &b.extra,
            Block::Exit(b) => &b.extra,
        }
    }
}
