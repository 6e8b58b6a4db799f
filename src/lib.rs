//! Slotted-page record manager for a heap-file storage engine.
//!
//! A [`HeapPage`] packs variable-length records into one fixed-size byte
//! buffer, hands out stable [`Rid`]s, compacts on delete and walks live
//! records in slot order. Buffer management, file I/O and the multi-page
//! heap file live outside this crate.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{HeapPage, PageDump, PageOptions, SlotEntry};
pub use types::{PageError, PageId, Result, Rid};
