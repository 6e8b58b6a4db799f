use std::fmt;

use serde::Serialize;

use super::{HeapPage, SlotEntry};

/// Snapshot of a page's header and slot directory for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PageDump {
    /// Identifier of the dumped page.
    pub page_no: u32,
    /// Previous page in the chain, if any.
    pub prev_page: Option<u32>,
    /// Next page in the chain, if any.
    pub next_page: Option<u32>,
    /// Allocated slot directory entries, tombstones included.
    pub slot_count: u16,
    /// Start of the record heap inside the data area.
    pub used_ptr: u16,
    /// Raw free-space counter from the header.
    pub free_space: u16,
    /// Largest record that would currently fit.
    pub available_space: usize,
    /// Number of non-tombstoned slots.
    pub live_records: usize,
    /// Every allocated slot in index order.
    pub slots: Vec<SlotDump>,
}

/// One slot directory entry in a [`PageDump`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SlotDump {
    /// Slot index.
    pub slot: u16,
    /// Decoded entry.
    #[serde(flatten)]
    pub entry: SlotEntry,
}

impl HeapPage {
    /// Captures the header fields and every allocated slot.
    pub fn dump(&self) -> PageDump {
        let slots: Vec<SlotDump> = (0..self.slot_count())
            .filter_map(|slot| self.slot(slot).map(|entry| SlotDump { slot, entry }))
            .collect();
        PageDump {
            page_no: self.page_no().0,
            prev_page: self.prev_page().map(|p| p.0),
            next_page: self.next_page().map(|p| p.0),
            slot_count: self.slot_count(),
            used_ptr: self.used_ptr(),
            free_space: self.free_space(),
            available_space: self.available_space(),
            live_records: slots.iter().filter(|s| s.entry.is_live()).count(),
            slots,
        }
    }
}

fn link(page: Option<u32>) -> String {
    page.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
}

impl fmt::Display for PageDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "page {}: prev={} next={}",
            self.page_no,
            link(self.prev_page),
            link(self.next_page)
        )?;
        writeln!(
            f,
            "used_ptr={} free_space={} available_space={} slot_count={} live_records={}",
            self.used_ptr, self.free_space, self.available_space, self.slot_count, self.live_records
        )?;
        for slot in &self.slots {
            match slot.entry {
                SlotEntry::Live { offset, len } => {
                    writeln!(f, "slot[{}] offset={} length={}", slot.slot, offset, len)?
                }
                SlotEntry::Tombstone => writeln!(f, "slot[{}] tombstone", slot.slot)?,
            }
        }
        Ok(())
    }
}
