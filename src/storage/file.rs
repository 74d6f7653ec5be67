//! # Memory-Mapped File Storage
//!
//! `FileStorage` backs a tree with a single memory-mapped file. The first
//! 128 bytes are a header block owned by the driver; everything after it is
//! allocation space handed out bump-style, tracked by a watermark in the
//! header.
//!
//! ## File layout
//!
//! ```text
//! Offset    Size   Content
//! ------    ----   -------
//! 0         128    FileHeader (magic, version, order, root_offset,
//!                  allocation watermark, key/value widths)
//! 128       ...    allocated regions, bump-allocated, never reclaimed
//! ```
//!
//! The header is where the persisted caller state lives: `root_offset` and
//! `order` survive restarts, so reattaching to an index is
//! [`FileStorage::open`] plus [`crate::Session::open`] with the stored
//! pair. The key/value widths are stored too; [`FileStorage::open`] takes
//! the widths the caller is about to read with and rejects a mismatch,
//! catching a file opened under the wrong codec types before any node is
//! misread.
//!
//! ## Growth
//!
//! The mapping is grown in chunks: when an allocation would pass the end of
//! the file, the file is extended, flushed and remapped. Growing requires
//! `&mut self`, so the borrow checker guarantees no block reference
//! survives a remap.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::little_endian::{I64, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::Storage;
use crate::io::{Block, WriteOp};
use crate::node::NO_CHILD;

pub const FILE_HEADER_SIZE: usize = 128;
pub const FILE_MAGIC: &[u8; 16] = b"taproot index\x00\x00\x00";
pub const CURRENT_VERSION: u32 = 1;

const GROWTH_CHUNK: u64 = 64 * 1024;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    magic: [u8; 16],
    version: U32,
    order: U32,
    root_offset: I64,
    allocated: U64,
    key_width: U32,
    val_width: U32,
    reserved: [u8; 80],
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == FILE_HEADER_SIZE);

impl FileHeader {
    pub fn new(order: u32, key_width: u32, val_width: u32) -> Self {
        Self {
            magic: *FILE_MAGIC,
            version: U32::new(CURRENT_VERSION),
            order: U32::new(order),
            root_offset: I64::new(NO_CHILD),
            allocated: U64::new(FILE_HEADER_SIZE as u64),
            key_width: U32::new(key_width),
            val_width: U32::new(val_width),
            reserved: [0u8; 80],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse FileHeader: {:?}", e))?;

        ensure!(
            &header.magic == FILE_MAGIC,
            "invalid magic bytes in index file"
        );

        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported index file version: {} (expected {})",
            header.version.get(),
            CURRENT_VERSION
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::mut_from_bytes(&mut bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse FileHeader: {:?}", e))?;

        ensure!(
            &header.magic == FILE_MAGIC,
            "invalid magic bytes in index file"
        );

        Ok(header)
    }

    zerocopy_accessors! {
        version: u32,
        order: u32,
        root_offset: i64,
        allocated: u64,
        key_width: u32,
        val_width: u32,
    }
}

#[derive(Debug)]
pub struct FileStorage {
    file: File,
    mmap: MmapMut,
}

impl FileStorage {
    /// Creates a fresh index file with an empty allocation space.
    pub fn create<P: AsRef<Path>>(
        path: P,
        order: u32,
        key_width: u32,
        val_width: u32,
    ) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create index file '{}'", path.display()))?;

        file.set_len(FILE_HEADER_SIZE as u64 + GROWTH_CHUNK)
            .wrap_err("failed to size fresh index file")?;

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files can
        // be modified externally. This is safe because:
        // 1. We just created this file with exclusive access (truncate=true)
        // 2. Index files are not meant to be modified by external processes
        // 3. The mmap lifetime is tied to FileStorage, preventing use-after-unmap
        // 4. All access goes through read()/apply() which bounds-check offsets
        let mut mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let header = FileHeader::new(order, key_width, val_width);
        mmap[..FILE_HEADER_SIZE].copy_from_slice(header.as_bytes());

        Ok(Self { file, mmap })
    }

    /// Opens an existing index file, validating its header against the
    /// key/value widths the caller is going to read it with.
    pub fn open<P: AsRef<Path>>(path: P, key_width: u32, val_width: u32) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open index file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size >= FILE_HEADER_SIZE as u64,
            "index file '{}' is too small to hold a header ({} bytes)",
            path.display(),
            file_size
        );

        // SAFETY: see create(); the file is opened read+write and all access
        // is bounds-checked against the mapping.
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let header = FileHeader::from_bytes(&mmap[..FILE_HEADER_SIZE])?;
        ensure!(
            header.key_width() == key_width,
            "key width mismatch in '{}': file has {}, caller expects {}",
            path.display(),
            header.key_width(),
            key_width
        );
        ensure!(
            header.val_width() == val_width,
            "value width mismatch in '{}': file has {}, caller expects {}",
            path.display(),
            header.val_width(),
            val_width
        );
        ensure!(
            header.allocated() <= file_size,
            "allocation watermark {} past end of file ({} bytes)",
            header.allocated(),
            file_size
        );

        Ok(Self { file, mmap })
    }

    fn header(&self) -> &FileHeader {
        FileHeader::from_bytes(&self.mmap[..FILE_HEADER_SIZE]).unwrap()
    }

    fn header_mut(&mut self) -> &mut FileHeader {
        FileHeader::from_bytes_mut(&mut self.mmap[..FILE_HEADER_SIZE]).unwrap()
    }

    pub fn order(&self) -> u32 {
        self.header().order()
    }

    pub fn key_width(&self) -> u32 {
        self.header().key_width()
    }

    pub fn val_width(&self) -> u32 {
        self.header().val_width()
    }

    /// The persisted root offset, or `None` before a tree has been created.
    pub fn root(&self) -> Option<i64> {
        let root = self.header().root_offset();
        (root != NO_CHILD).then_some(root)
    }

    /// Records a new root offset in the header block.
    pub fn set_root(&mut self, root: i64) {
        self.header_mut().set_root_offset(root);
    }

    /// Bytes handed out so far, header included.
    pub fn allocated(&self) -> u64 {
        self.header().allocated()
    }

    fn ensure_capacity(&mut self, end: u64) -> Result<()> {
        if end <= self.mmap.len() as u64 {
            return Ok(());
        }

        let new_size = end.next_multiple_of(GROWTH_CHUNK);

        self.mmap
            .flush()
            .wrap_err("failed to flush mapping before grow")?;

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend index file to {new_size} bytes"))?;

        // SAFETY: the old mapping becomes invalid on remap. This is safe
        // because:
        // 1. ensure_capacity takes &mut self, so no block reference can
        //    exist across the remap (borrow checker)
        // 2. The mapping was flushed above
        // 3. The file was extended to new_size before remapping
        // 4. The old mapping is dropped when the new one is assigned
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file).wrap_err("failed to remap index file after grow")?
        };

        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, block: Block) -> Result<&[u8]> {
        ensure!(
            block.offset >= FILE_HEADER_SIZE as i64,
            "read at {} overlaps the header block",
            block.offset
        );

        let end = block.end();
        ensure!(
            end as u64 <= self.header().allocated(),
            "read {}..{} past the allocation watermark ({})",
            block.offset,
            end,
            self.header().allocated()
        );

        Ok(&self.mmap[block.offset as usize..end as usize])
    }

    fn allocate(&mut self, len: u64) -> Result<i64> {
        let offset = self.header().allocated();
        self.ensure_capacity(offset + len)?;
        self.header_mut().set_allocated(offset + len);
        Ok(offset as i64)
    }

    fn apply(&mut self, writes: &[WriteOp]) -> Result<()> {
        for write in writes {
            ensure!(
                write.offset >= FILE_HEADER_SIZE as i64,
                "write at {} overlaps the header block",
                write.offset
            );

            let start = write.offset as usize;
            let end = start + write.bytes.len();
            ensure!(
                end as u64 <= self.header().allocated(),
                "write {}..{} past the allocation watermark ({})",
                start,
                end,
                self.header().allocated()
            );

            self.mmap[start..end].copy_from_slice(&write.bytes);
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.mmap.flush().wrap_err("failed to sync index file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Session;
    use tempfile::tempdir;

    #[test]
    fn file_header_is_128_bytes() {
        assert_eq!(std::mem::size_of::<FileHeader>(), FILE_HEADER_SIZE);
    }

    #[test]
    fn file_header_round_trips_fields() {
        let mut header = FileHeader::new(7, 8, 16);
        header.set_root_offset(4096);
        header.set_allocated(9000);

        let bytes = header.as_bytes().to_vec();
        let parsed = FileHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.order(), 7);
        assert_eq!(parsed.key_width(), 8);
        assert_eq!(parsed.val_width(), 16);
        assert_eq!(parsed.root_offset(), 4096);
        assert_eq!(parsed.allocated(), 9000);
    }

    #[test]
    fn from_bytes_rejects_bad_magic() {
        let bytes = [0u8; FILE_HEADER_SIZE];

        let result = FileHeader::from_bytes(&bytes);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("magic"));
    }

    #[test]
    fn create_then_open_preserves_the_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let mut storage = FileStorage::create(&path, 5, 8, 8).unwrap();
            storage.set_root(128);
            storage.sync().unwrap();
        }

        let storage = FileStorage::open(&path, 8, 8).unwrap();
        assert_eq!(storage.order(), 5);
        assert_eq!(storage.root(), Some(128));
    }

    #[test]
    fn open_rejects_mismatched_widths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        FileStorage::create(&path, 5, 8, 8).unwrap();

        let result = FileStorage::open(&path, 4, 8);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("key width mismatch"));

        let result = FileStorage::open(&path, 8, 16);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("value width mismatch"));
    }

    #[test]
    fn fresh_file_has_no_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let storage = FileStorage::create(&path, 3, 8, 8).unwrap();

        assert_eq!(storage.root(), None);
        assert_eq!(storage.allocated(), FILE_HEADER_SIZE as u64);
    }

    #[test]
    fn allocations_start_after_the_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let mut storage = FileStorage::create(&path, 3, 8, 8).unwrap();

        let first = storage.allocate(100).unwrap();
        let second = storage.allocate(50).unwrap();

        assert_eq!(first, FILE_HEADER_SIZE as i64);
        assert_eq!(second, FILE_HEADER_SIZE as i64 + 100);
    }

    #[test]
    fn grows_past_the_initial_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let mut storage = FileStorage::create(&path, 3, 8, 8).unwrap();

        let offset = storage.allocate(3 * GROWTH_CHUNK).unwrap();
        storage
            .apply(&[WriteOp::new(offset, vec![0xCD; 16])])
            .unwrap();

        assert_eq!(
            storage.read(Block::new(offset, 16)).unwrap(),
            &[0xCD; 16]
        );
    }

    #[test]
    fn reads_beyond_the_watermark_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let mut storage = FileStorage::create(&path, 3, 8, 8).unwrap();
        storage.allocate(64).unwrap();

        assert!(storage.read(Block::new(FILE_HEADER_SIZE as i64, 65)).is_err());
        assert!(storage.read(Block::new(0, 8)).is_err());
    }

    #[test]
    fn index_survives_a_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("survivor.idx");

        let (root, order) = {
            let storage = FileStorage::create(&path, 3, 8, 8).unwrap();
            let mut session: Session<u64, u64, FileStorage> =
                Session::create(storage, 3).unwrap();

            for n in 0..50u64 {
                session.insert(n, n * 2).unwrap();
            }

            let root = session.root();
            let order = session.order();
            let storage = session.storage_mut();
            storage.set_root(root);
            storage.sync().unwrap();
            (root, order)
        };

        let storage = FileStorage::open(&path, 8, 8).unwrap();
        assert_eq!(storage.root(), Some(root));
        assert_eq!(storage.order(), order);

        let mut session: Session<u64, u64, FileStorage> =
            Session::open(storage, root, order);
        for n in 0..50u64 {
            assert_eq!(session.find(n).unwrap(), Some(n * 2));
        }
    }
}
