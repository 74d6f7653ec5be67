//! # Suspendable I/O Protocol
//!
//! The tree algorithms never touch a file, a buffer or an allocator. Every
//! operation is expressed as a [`Step`] value that either carries the final
//! result or asks the caller for one of two services:
//!
//! - **Read** — "give me the bytes at this block", answered by invoking the
//!   continuation with the bytes.
//! - **Alloc** — "reserve me a fresh contiguous region of this length",
//!   answered by invoking the continuation with the chosen offset.
//!
//! The caller pumps the computation forward:
//!
//! ```text
//! let mut step = tree.find(key);
//! loop {
//!     step = match step {
//!         Step::Done(result) => break result,
//!         Step::Read { block, cont } => cont(storage.read(block)?),
//!         Step::Alloc { len, cont } => cont(storage.allocate(len)?),
//!     };
//! }
//! ```
//!
//! Continuations are `FnOnce` and must be invoked in the order they are
//! produced; skipping, reordering or replaying one breaks the computation.
//! Given the same tree bytes and the same allocation answers, the sequence
//! of requests and the final result are fully deterministic.
//!
//! ## Writes are not requests
//!
//! Mutating operations never ask the caller to write mid-flight. They batch
//! every rewritten node block into their terminal payload (see
//! `tree::Commit`), so an aborted operation can simply be dropped and the
//! storage is left untouched. Dropping a suspended mutation leaks at most
//! the regions it already asked to allocate.
//!
//! ## Borrowing discipline
//!
//! A read continuation borrows the supplied bytes only for the duration of
//! the call and copies what it needs; the returned [`Step`] owns all of its
//! state. Callers are therefore free to reuse, relocate or grow their
//! backing buffer between steps.

/// A byte range in the caller's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub offset: i64,
    pub len: u64,
}

impl Block {
    pub fn new(offset: i64, len: u64) -> Self {
        Self { offset, len }
    }

    /// End offset, one past the last byte.
    pub fn end(&self) -> i64 {
        self.offset + self.len as i64
    }
}

/// A single durable write the caller must apply: `bytes` replace the
/// storage contents starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    pub offset: i64,
    pub bytes: Vec<u8>,
}

impl WriteOp {
    pub fn new(offset: i64, bytes: Vec<u8>) -> Self {
        Self { offset, bytes }
    }
}

/// Continuation resumed with the bytes of a requested block.
pub type ReadCont<T> = Box<dyn FnOnce(&[u8]) -> Step<T>>;

/// Continuation resumed with the offset of a freshly reserved region.
pub type AllocCont<T> = Box<dyn FnOnce(i64) -> Step<T>>;

/// One step of a suspendable tree operation.
pub enum Step<T> {
    /// Terminal: the operation finished with this result.
    Done(T),
    /// The operation needs the bytes of `block` to continue.
    Read { block: Block, cont: ReadCont<T> },
    /// The operation needs a fresh region of `len` bytes to continue.
    Alloc { len: u64, cont: AllocCont<T> },
}

impl<T: 'static> Step<T> {
    pub fn read(block: Block, cont: impl FnOnce(&[u8]) -> Step<T> + 'static) -> Self {
        Step::Read {
            block,
            cont: Box::new(cont),
        }
    }

    pub fn alloc(len: u64, cont: impl FnOnce(i64) -> Step<T> + 'static) -> Self {
        Step::Alloc {
            len,
            cont: Box::new(cont),
        }
    }

    /// Sequences `f` after this computation, threading suspensions through.
    pub fn and_then<U: 'static>(self, f: impl FnOnce(T) -> Step<U> + 'static) -> Step<U> {
        match self {
            Step::Done(value) => f(value),
            Step::Read { block, cont } => Step::Read {
                block,
                cont: Box::new(move |bytes| cont(bytes).and_then(f)),
            },
            Step::Alloc { len, cont } => Step::Alloc {
                len,
                cont: Box::new(move |offset| cont(offset).and_then(f)),
            },
        }
    }

    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Step<U> {
        self.and_then(|value| Step::Done(f(value)))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Done(value) => f.debug_tuple("Done").field(value).finish(),
            Step::Read { block, .. } => f.debug_struct("Read").field("block", block).finish(),
            Step::Alloc { len, .. } => f.debug_struct("Alloc").field("len", len).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump_with(mut step: Step<u64>, bytes: &[u8], base: i64) -> u64 {
        let mut next_offset = base;
        loop {
            step = match step {
                Step::Done(value) => return value,
                Step::Read { block, cont } => {
                    let start = block.offset as usize;
                    cont(&bytes[start..start + block.len as usize])
                }
                Step::Alloc { len, cont } => {
                    let offset = next_offset;
                    next_offset += len as i64;
                    cont(offset)
                }
            };
        }
    }

    #[test]
    fn done_carries_the_result() {
        assert_eq!(pump_with(Step::Done(7), &[], 0), 7);
    }

    #[test]
    fn read_resumes_with_block_bytes() {
        let step = Step::read(Block::new(2, 2), |bytes| {
            Step::Done(u64::from(bytes[0]) + u64::from(bytes[1]))
        });

        assert_eq!(pump_with(step, &[0, 0, 3, 4], 0), 7);
    }

    #[test]
    fn alloc_resumes_with_fresh_offsets() {
        let step = Step::alloc(16, |first| {
            Step::alloc(16, move |second| Step::Done((first + second) as u64))
        });

        assert_eq!(pump_with(step, &[], 100), 100 + 116);
    }

    #[test]
    fn and_then_sequences_across_suspensions() {
        let step = Step::read(Block::new(0, 1), |bytes| Step::Done(u64::from(bytes[0])))
            .and_then(|n| Step::alloc(8, move |offset| Step::Done(n + offset as u64)));

        assert_eq!(pump_with(step, &[5], 10), 15);
    }

    #[test]
    fn map_transforms_the_terminal_value() {
        let step = Step::Done(21u64).map(|n| n * 2);

        assert_eq!(pump_with(step, &[], 0), 42);
    }

    #[test]
    fn block_end_is_exclusive() {
        assert_eq!(Block::new(8, 4).end(), 12);
    }
}
