use serde::Serialize;

use crate::primitives::bytes::le;
use crate::types::page::{EMPTY_SLOT, SLOT_ENTRY_LEN};
use crate::types::{PageError, Result};

/// One slot directory entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotEntry {
    /// Slot points at record bytes inside the data area.
    Live {
        /// Offset of the first record byte, relative to the data area.
        offset: u16,
        /// Record length in bytes.
        len: u16,
    },
    /// Slot index is reserved but its record was deleted.
    Tombstone,
}

impl SlotEntry {
    /// Decodes an entry from its four on-page bytes.
    pub fn decode(bytes: &[u8]) -> Self {
        let offset = le::get_u16(&bytes[0..2]);
        let len = le::get_u16(&bytes[2..4]);
        if len == EMPTY_SLOT {
            SlotEntry::Tombstone
        } else {
            SlotEntry::Live { offset, len }
        }
    }

    /// Encodes the entry into `dst` (at least four bytes).
    pub fn encode(self, dst: &mut [u8]) {
        let (offset, len) = match self {
            SlotEntry::Live { offset, len } => (offset, len),
            SlotEntry::Tombstone => (0, EMPTY_SLOT),
        };
        le::put_u16(&mut dst[0..2], offset);
        le::put_u16(&mut dst[2..4], len);
    }

    /// Returns `(offset, len)` for live entries.
    pub fn extent(self) -> Option<(usize, usize)> {
        match self {
            SlotEntry::Live { offset, len } => Some((offset as usize, len as usize)),
            SlotEntry::Tombstone => None,
        }
    }

    /// True unless the slot is a tombstone.
    pub fn is_live(self) -> bool {
        matches!(self, SlotEntry::Live { .. })
    }
}

/// View over the slot directory at the head of the data area.
pub struct SlotDirectory<'a> {
    slots: &'a [u8],
}

impl<'a> SlotDirectory<'a> {
    /// Wraps the first `slot_cnt` entries of `data`.
    pub fn new(data: &'a [u8], slot_cnt: u16) -> Result<Self> {
        let bytes = slot_cnt as usize * SLOT_ENTRY_LEN;
        if bytes > data.len() {
            return Err(PageError::Corruption(
                "slot directory larger than data area",
            ));
        }
        Ok(Self {
            slots: &data[..bytes],
        })
    }

    /// Returns the number of slots in the directory.
    pub fn len(&self) -> usize {
        self.slots.len() / SLOT_ENTRY_LEN
    }

    /// True when the directory has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Retrieves the entry at `idx`, or `None` past the end of the directory.
    pub fn get(&self, idx: usize) -> Option<SlotEntry> {
        if idx >= self.len() {
            return None;
        }
        let off = idx * SLOT_ENTRY_LEN;
        Some(SlotEntry::decode(&self.slots[off..off + SLOT_ENTRY_LEN]))
    }

    /// Returns an iterator over all entries in index order.
    pub fn iter(&self) -> SlotIter<'a> {
        SlotIter {
            slots: self.slots,
            pos: 0,
        }
    }
}

/// Iterator over slot directory entries.
pub struct SlotIter<'a> {
    slots: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for SlotIter<'a> {
    type Item = SlotEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.slots.len() {
            return None;
        }
        let entry = SlotEntry::decode(&self.slots[self.pos..self.pos + SLOT_ENTRY_LEN]);
        self.pos += SLOT_ENTRY_LEN;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.slots.len() - self.pos) / SLOT_ENTRY_LEN;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SlotIter<'_> {}

/// Writes `entry` as slot `idx` of the data area.
#[inline]
pub fn write_slot_entry(data: &mut [u8], idx: usize, entry: SlotEntry) {
    let pos = idx * SLOT_ENTRY_LEN;
    debug_assert!(pos + SLOT_ENTRY_LEN <= data.len());
    entry.encode(&mut data[pos..pos + SLOT_ENTRY_LEN]);
}
