//! Script Model - ordered action blocks.
//!
//! Block order is execution order. Nothing here reorders blocks except an
//! explicit insert or remove at a caller-supplied index.

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::schema::{Block, BlockKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    blocks: Vec<Block>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Decodes a JSON array of blocks, validating each against the schema.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(StoreError::InvalidScript(name.to_string()));
        };
        let blocks = items
            .into_iter()
            .map(Block::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    pub fn to_value(&self) -> Result<Value> {
        let items = self
            .blocks
            .iter()
            .map(Block::to_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// Inserts a default block of `kind` at `index`; `index == len` appends.
    pub fn insert_at(&mut self, index: usize, kind: BlockKind) -> Result<&mut Block> {
        let block = kind.default_block()?;
        self.insert_block_at(index, block)?;
        Ok(&mut self.blocks[index])
    }

    pub fn insert_block_at(&mut self, index: usize, block: Block) -> Result<()> {
        if index > self.blocks.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.blocks.len(),
            });
        }
        tracing::debug!(index, kind = %block.kind(), "inserting block");
        self.blocks.insert(index, block);
        Ok(())
    }

    pub fn push(&mut self, kind: BlockKind) -> Result<&mut Block> {
        self.insert_at(self.blocks.len(), kind)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Block> {
        StoreError::check_index(index, self.blocks.len())?;
        let block = self.blocks.remove(index);
        tracing::debug!(index, kind = %block.kind(), "removed block");
        Ok(block)
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(script: &Script) -> Vec<BlockKind> {
        script.iter().map(Block::kind).collect()
    }

    #[test]
    fn test_insert_shifts_later_blocks() {
        let mut script = Script::new();
        script.push(BlockKind::DownloadRelease).unwrap();
        script.push(BlockKind::InstallCia).unwrap();
        script.insert_at(1, BlockKind::Mkdir).unwrap();
        script.insert_at(0, BlockKind::PromptMessage).unwrap();
        assert_eq!(
            kinds(&script),
            vec![
                BlockKind::PromptMessage,
                BlockKind::DownloadRelease,
                BlockKind::Mkdir,
                BlockKind::InstallCia
            ]
        );
    }

    #[test]
    fn test_insert_at_len_appends_and_past_len_fails() {
        let mut script = Script::new();
        assert!(script.insert_at(0, BlockKind::Exit).is_ok());
        assert!(script.insert_at(1, BlockKind::Skip).is_ok());
        assert!(matches!(
            script.insert_at(3, BlockKind::Skip),
            Err(StoreError::IndexOutOfRange { index: 3, len: 2 })
        ));
        assert_eq!(kinds(&script), vec![BlockKind::Exit, BlockKind::Skip]);
    }

    #[test]
    fn test_remove_returns_block_and_shifts_down() {
        let mut script = Script::new();
        script.push(BlockKind::Mkdir).unwrap();
        script.push(BlockKind::Copy).unwrap();
        script.push(BlockKind::Rmdir).unwrap();
        let removed = script.remove_at(1).unwrap();
        assert_eq!(removed.kind(), BlockKind::Copy);
        assert_eq!(kinds(&script), vec![BlockKind::Mkdir, BlockKind::Rmdir]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut script = Script::new();
        script.push(BlockKind::Exit).unwrap();
        assert!(matches!(script.remove_at(1), Err(StoreError::IndexOutOfRange { .. })));
        assert!(matches!(script.remove_at(usize::MAX), Err(StoreError::IndexOutOfRange { .. })));
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn test_from_value_rejects_non_arrays_and_bad_blocks() {
        assert!(matches!(
            Script::from_value("init", json!({"type": "exit"})),
            Err(StoreError::InvalidScript(name)) if name == "init"
        ));
        assert!(matches!(
            Script::from_value("init", json!([{"type": "exit"}, {"type": "format"}])),
            Err(StoreError::UnknownBlockKind(_))
        ));
    }

    #[test]
    fn test_from_value_keeps_order() {
        let script = Script::from_value(
            "run",
            json!([
                {"type": "mkdir", "directory": "sdmc:/3ds"},
                {"type": "downloadFile", "file": "https://x/y.3dsx", "output": "sdmc:/3ds/y.3dsx"},
                {"type": "exit"}
            ]),
        )
        .unwrap();
        assert_eq!(
            kinds(&script),
            vec![BlockKind::Mkdir, BlockKind::DownloadFile, BlockKind::Exit]
        );
    }
}
