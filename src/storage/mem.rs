//! # In-Memory Storage
//!
//! `MemStorage` backs a tree with a plain growable byte buffer. Allocation
//! is a bump of the buffer length, reads borrow straight from the buffer,
//! and applied writes land immediately. Its main job is testing: the whole
//! stored tree can be compared byte-for-byte via [`MemStorage::as_slice`].

use eyre::{ensure, Result};

use super::Storage;
use crate::io::{Block, WriteOp};

#[derive(Debug, Default)]
pub struct MemStorage {
    bytes: Vec<u8>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes allocated so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The entire backing buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Storage for MemStorage {
    fn read(&self, block: Block) -> Result<&[u8]> {
        ensure!(block.offset >= 0, "negative read offset {}", block.offset);

        let start = block.offset as usize;
        let end = start + block.len as usize;
        ensure!(
            end <= self.bytes.len(),
            "read {}..{} past end of storage (len={})",
            start,
            end,
            self.bytes.len()
        );

        Ok(&self.bytes[start..end])
    }

    fn allocate(&mut self, len: u64) -> Result<i64> {
        let offset = self.bytes.len();
        self.bytes.resize(offset + len as usize, 0);
        Ok(offset as i64)
    }

    fn apply(&mut self, writes: &[WriteOp]) -> Result<()> {
        for write in writes {
            ensure!(write.offset >= 0, "negative write offset {}", write.offset);

            let start = write.offset as usize;
            let end = start + write.bytes.len();
            ensure!(
                end <= self.bytes.len(),
                "write {}..{} past end of storage (len={})",
                start,
                end,
                self.bytes.len()
            );

            self.bytes[start..end].copy_from_slice(&write.bytes);
        }
        Ok(())
    }
}
