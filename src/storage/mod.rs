//! Page-level record storage for heap files.
//!
//! The enclosing heap file chains pages through their prev/next links and
//! decides which page receives a record; this module only manages the
//! records inside one page buffer.

/// Slotted page holding variable-length records.
///
/// Insertion, deletion with compaction, lookup and iteration by record id.
pub mod page;

pub use page::{HeapPage, PageDump, PageOptions, Records, SlotDump, SlotEntry};
