//! Slotted heap-file page.
//!
//! A page is one `MAX_SPACE` byte buffer: the fixed header, then a data area
//! in which the slot directory grows up from offset zero while record bytes
//! grow down from the end. The live record heap always occupies exactly
//! `[used_ptr, DATA_LEN)` with no holes; deleting a record slides every
//! younger record up over the gap it leaves.
//!
//! Slot indices are never handed out twice while a record may still be
//! named by them: a deleted slot becomes a tombstone, except when it is the
//! last slot, in which case the directory simply shrinks by one.

mod dump;
mod options;
mod slots;
mod verify;


pub use dump::{PageDump, SlotDump};
pub use options::PageOptions;
pub use slots::{SlotDirectory, SlotEntry, SlotIter};

use std::fmt;

use tracing::{debug, trace, warn};

use crate::primitives::bytes::le;
use crate::types::page::{
    decode_link, encode_link, header, PageHeader, DATA_LEN, HEADER_LEN, MAX_SPACE, SLOT_ENTRY_LEN,
};
use crate::types::{PageError, PageId, Result, Rid};

use slots::write_slot_entry;

/// An owned slotted page.
///
/// All state lives in the byte buffer, so [`HeapPage::as_bytes`] is the
/// persisted image and [`HeapPage::from_bytes`] reloads it.
pub struct HeapPage {
    buf: Box<[u8]>,
    options: PageOptions,
}

impl HeapPage {
    /// Initialises an empty page bound to `page_no`.
    pub fn init(page_no: PageId) -> Self {
        Self::init_with(page_no, PageOptions::default())
    }

    /// Initialises an empty page with explicit options.
    pub fn init_with(page_no: PageId, options: PageOptions) -> Self {
        let mut page = Self {
            buf: vec![0u8; MAX_SPACE].into_boxed_slice(),
            options,
        };
        page.reset(page_no);
        page
    }

    /// Re-initialises this buffer as an empty page bound to `page_no`.
    pub fn reset(&mut self, page_no: PageId) {
        self.buf.fill(0);
        PageHeader::empty(page_no).encode(&mut self.buf);
    }

    /// Loads a persisted page image, rejecting any image whose layout is
    /// inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, PageOptions::default())
    }

    /// Variant of [`HeapPage::from_bytes`] with explicit options.
    pub fn from_bytes_with(bytes: &[u8], options: PageOptions) -> Result<Self> {
        if bytes.len() != MAX_SPACE {
            warn!(len = bytes.len(), expected = MAX_SPACE, "page.load.bad_length");
            return Err(PageError::Corruption("page image has wrong length"));
        }
        let page = Self {
            buf: bytes.to_vec().into_boxed_slice(),
            options,
        };
        if let Err(err) = page.verify() {
            warn!(page = page.page_no().0, error = %err, "page.load.corrupt");
            return Err(err);
        }
        Ok(page)
    }

    /// The exact persisted image of this page.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Identifier stored in the page header.
    pub fn page_no(&self) -> PageId {
        PageId(le::get_u32(&self.buf[header::CUR_PAGE]))
    }

    /// Previous page in the heap-file chain.
    pub fn prev_page(&self) -> Option<PageId> {
        decode_link(le::get_u32(&self.buf[header::PREV_PAGE]))
    }

    /// Overwrites the previous-page link.
    pub fn set_prev_page(&mut self, page: Option<PageId>) {
        le::put_u32(&mut self.buf[header::PREV_PAGE], encode_link(page));
    }

    /// Next page in the heap-file chain.
    pub fn next_page(&self) -> Option<PageId> {
        decode_link(le::get_u32(&self.buf[header::NEXT_PAGE]))
    }

    /// Overwrites the next-page link.
    pub fn set_next_page(&mut self, page: Option<PageId>) {
        le::put_u32(&mut self.buf[header::NEXT_PAGE], encode_link(page));
    }

    /// Number of allocated slot directory entries, tombstones included.
    pub fn slot_count(&self) -> u16 {
        le::get_u16(&self.buf[header::SLOT_CNT])
    }

    /// Start of the record heap, relative to the data area.
    pub fn used_ptr(&self) -> u16 {
        le::get_u16(&self.buf[header::USED_PTR])
    }

    /// Bytes between the end of the slot directory and the record heap.
    pub fn free_space(&self) -> u16 {
        le::get_u16(&self.buf[header::FREE_SPACE])
    }

    /// Decoded copy of the header fields.
    pub fn header(&self) -> Result<PageHeader> {
        PageHeader::decode(&self.buf)
    }

    /// Largest record the page can accept right now, net of the slot entry
    /// the insertion itself would consume. Zero when not even a slot entry fits.
    pub fn available_space(&self) -> usize {
        (self.free_space() as usize).saturating_sub(SLOT_ENTRY_LEN)
    }

    /// True when the slot directory is empty.
    ///
    /// This is the literal `slot_count == 0` test: a page whose slots are all
    /// tombstones still reports `false`. Use [`HeapPage::live_record_count`]
    /// for the stronger notion.
    pub fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }

    /// Number of slots that still hold a record.
    pub fn live_record_count(&self) -> usize {
        (0..self.slot_count() as usize)
            .filter(|&idx| self.slot_at(idx).is_live())
            .count()
    }

    /// Entry for `slot_no`, or `None` past the end of the directory.
    pub fn slot(&self, slot_no: u16) -> Option<SlotEntry> {
        self.slot_directory().ok()?.get(slot_no as usize)
    }

    /// View over the whole slot directory.
    pub fn slot_directory(&self) -> Result<SlotDirectory<'_>> {
        SlotDirectory::new(self.data(), self.slot_count())
    }

    /// Appends a record, returning its identifier.
    ///
    /// Fails with [`PageError::InsufficientSpace`] when the record plus a new
    /// slot entry does not fit; the page is left untouched in that case.
    /// With `verify_writes` on, a write that leaves the page inconsistent is
    /// rolled back and reported as [`PageError::Corruption`].
    pub fn insert_record(&mut self, record: &[u8]) -> Result<Rid> {
        let page_no = self.page_no();
        let free = self.free_space() as usize;
        let needed = record.len();
        if needed + SLOT_ENTRY_LEN > free {
            debug!(
                page = page_no.0,
                needed,
                free_space = free,
                "page.insert.rejected"
            );
            return Err(PageError::InsufficientSpace {
                needed,
                available: self.available_space(),
            });
        }

        let before = self.checkpoint();
        let slot_no = self.slot_count();
        let offset = self.used_ptr() as usize - needed;
        {
            let data = self.data_mut();
            data[offset..offset + needed].copy_from_slice(record);
            write_slot_entry(
                data,
                slot_no as usize,
                SlotEntry::Live {
                    offset: offset as u16,
                    len: needed as u16,
                },
            );
        }
        self.set_used_ptr(offset);
        self.set_free_space(free - needed - SLOT_ENTRY_LEN);
        self.set_slot_count(slot_no + 1);
        trace!(
            page = page_no.0,
            slot = slot_no,
            len = needed,
            used_ptr = offset,
            "page.insert"
        );
        self.after_write(before)?;
        Ok(Rid::new(page_no, slot_no))
    }

    /// Deletes the record named by `rid` and compacts the record heap.
    ///
    /// Rolled back like [`HeapPage::insert_record`] when `verify_writes`
    /// rejects the result.
    pub fn delete_record(&mut self, rid: Rid) -> Result<()> {
        self.check_owner(rid)?;
        let slot_cnt = self.slot_count();
        if rid.slot_no >= slot_cnt {
            return Err(PageError::InvalidSlot {
                slot: rid.slot_no,
                slot_count: slot_cnt,
            });
        }
        let (victim_off, victim_len) = self
            .slot_at(rid.slot_no as usize)
            .extent()
            .ok_or(PageError::AlreadyDeleted(rid))?;

        let used = self.used_ptr() as usize;
        let free = self.free_space() as usize;
        if victim_off < used || victim_off + victim_len > DATA_LEN {
            return Err(PageError::Corruption("record extent outside record heap"));
        }
        let before = self.checkpoint();
        let scrub = self.options.scrub_freed;
        let is_tail = rid.slot_no + 1 == slot_cnt;
        {
            let data = self.data_mut();
            // Younger records occupy [used, victim_off); slide them over the gap.
            data.copy_within(used..victim_off, used + victim_len);
            for idx in rid.slot_no as usize + 1..slot_cnt as usize {
                let pos = idx * SLOT_ENTRY_LEN;
                if let SlotEntry::Live { offset, len } =
                    SlotEntry::decode(&data[pos..pos + SLOT_ENTRY_LEN])
                {
                    write_slot_entry(
                        data,
                        idx,
                        SlotEntry::Live {
                            offset: offset + victim_len as u16,
                            len,
                        },
                    );
                }
            }
            if scrub {
                data[used..used + victim_len].fill(0);
            }
            if is_tail {
                if scrub {
                    let pos = rid.slot_no as usize * SLOT_ENTRY_LEN;
                    data[pos..pos + SLOT_ENTRY_LEN].fill(0);
                }
            } else {
                write_slot_entry(data, rid.slot_no as usize, SlotEntry::Tombstone);
            }
        }

        self.set_used_ptr(used + victim_len);
        if is_tail {
            self.set_slot_count(slot_cnt - 1);
            self.set_free_space(free + victim_len + SLOT_ENTRY_LEN);
        } else {
            self.set_free_space(free + victim_len);
        }
        trace!(
            page = rid.page_no.0,
            slot = rid.slot_no,
            len = victim_len,
            moved = victim_off - used,
            truncated = is_tail,
            "page.delete.compact"
        );
        self.after_write(before)
    }

    /// Copies the record named by `rid` into `out`, returning its length.
    pub fn get_record(&self, rid: Rid, out: &mut Vec<u8>) -> Result<usize> {
        let bytes = self.return_record(rid)?;
        out.clear();
        out.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Borrows the record named by `rid` straight out of the page buffer.
    ///
    /// The borrow ends before any mutating call can run, so a stale view
    /// across a compaction cannot be observed.
    pub fn return_record(&self, rid: Rid) -> Result<&[u8]> {
        self.check_owner(rid)?;
        let slot_cnt = self.slot_count();
        if rid.slot_no >= slot_cnt {
            return Err(PageError::InvalidSlot {
                slot: rid.slot_no,
                slot_count: slot_cnt,
            });
        }
        let (offset, len) = self
            .slot_at(rid.slot_no as usize)
            .extent()
            .ok_or(PageError::NotFound(rid))?;
        self.data()
            .get(offset..offset + len)
            .ok_or(PageError::Corruption("record extent beyond data area"))
    }

    /// First live record in slot order.
    pub fn first_record(&self) -> Result<Rid> {
        self.scan_from(0)
    }

    /// Next live record after `rid` in slot order.
    pub fn next_record(&self, rid: Rid) -> Result<Rid> {
        self.check_owner(rid)?;
        self.scan_from(rid.slot_no as usize + 1)
    }

    /// Iterates over live records in slot order.
    pub fn records(&self) -> Records<'_> {
        Records { page: self, next: 0 }
    }

    fn scan_from(&self, start: usize) -> Result<Rid> {
        let page_no = self.page_no();
        (start..self.slot_count() as usize)
            .find(|&idx| self.slot_at(idx).is_live())
            .map(|idx| Rid::new(page_no, idx as u16))
            .ok_or(PageError::EndOfPage)
    }

    fn check_owner(&self, rid: Rid) -> Result<()> {
        let page = self.page_no();
        if rid.page_no != page {
            return Err(PageError::WrongPage { rid, page });
        }
        Ok(())
    }

    /// Copy of the image to restore if the pending write fails verification.
    fn checkpoint(&self) -> Option<Box<[u8]>> {
        self.options.verify_writes.then(|| self.buf.clone())
    }

    fn after_write(&mut self, before: Option<Box<[u8]>>) -> Result<()> {
        let Some(before) = before else {
            return Ok(());
        };
        if let Err(err) = self.verify() {
            warn!(page = self.page_no().0, error = %err, "page.write.rolled_back");
            self.buf = before;
            return Err(err);
        }
        Ok(())
    }

    /// Decodes slot `idx`; callers bound-check against the slot count.
    fn slot_at(&self, idx: usize) -> SlotEntry {
        let pos = idx * SLOT_ENTRY_LEN;
        SlotEntry::decode(&self.data()[pos..pos + SLOT_ENTRY_LEN])
    }

    fn data(&self) -> &[u8] {
        &self.buf[HEADER_LEN..]
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_LEN..]
    }

    fn set_slot_count(&mut self, value: u16) {
        le::put_u16(&mut self.buf[header::SLOT_CNT], value);
    }

    fn set_used_ptr(&mut self, value: usize) {
        debug_assert!(value <= DATA_LEN);
        le::put_u16(&mut self.buf[header::USED_PTR], value as u16);
    }

    fn set_free_space(&mut self, value: usize) {
        debug_assert!(value <= DATA_LEN);
        le::put_u16(&mut self.buf[header::FREE_SPACE], value as u16);
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapPage")
            .field("page_no", &self.page_no())
            .field("prev_page", &self.prev_page())
            .field("next_page", &self.next_page())
            .field("slot_count", &self.slot_count())
            .field("used_ptr", &self.used_ptr())
            .field("free_space", &self.free_space())
            .finish()
    }
}

/// Borrowing iterator over `(Rid, record bytes)` pairs of a page.
///
/// Iteration stops early if a live slot points outside the data area; a page
/// that passes [`HeapPage::verify`] never does.
pub struct Records<'a> {
    page: &'a HeapPage,
    next: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = (Rid, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rid = self.page.scan_from(self.next).ok()?;
        self.next = rid.slot_no as usize + 1;
        match self.page.return_record(rid) {
            Ok(bytes) => Some((rid, bytes)),
            Err(err) => {
                warn!(
                    page = rid.page_no.0,
                    slot = rid.slot_no,
                    error = %err,
                    "page.records.corrupt"
                );
                None
            }
        }
    }
}
