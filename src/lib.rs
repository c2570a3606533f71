//! Unistore Core - Store Document Model
//!
//! # The Ground Rules
//! 1. Loading Never Fails (the top level is repaired, not rejected)
//! 2. The Block Table Is Truth
//! 3. Script Order Is Execution Order
//! 4. Untouched Data Round-Trips
//! 5. Schema, Index And Timestamp Errors Are Never Guessed Past

pub mod error;
pub mod timestamp;
pub mod schema;
pub mod script;
pub mod entry;
pub mod document;
pub mod validation;
pub mod config;
pub mod hashing;

pub use error::{StoreError, Result};
pub use timestamp::{Timestamp, TimestampCodec, ZoneTable};
pub use schema::{Block, BlockKind, FieldDefault, FieldSpec};
pub use script::Script;
pub use entry::{Entry, EntryInfo, ScriptView};
pub use document::{EntryRef, Loaded, MalformedDocument, StoreDocument, StoreInfo};
pub use validation::{ValidationContext, ValidationResult, ValidationViolation, Validator, ViolationSeverity};
pub use config::{EditorConfig, IconSheet};
pub use hashing::{canonical_json, fingerprint};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
