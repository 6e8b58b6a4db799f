#![forbid(unsafe_code)]
//! Identifiers, errors and the fixed on-page header shared by the page core.

use std::fmt;

/// Identifier of a page inside the enclosing heap file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u32);

/// Record identifier: the page a record lives on plus its slot index.
///
/// A `Rid` is the only handle callers hold on a record. It never exposes
/// the byte offset, which can move when a sibling record is deleted.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Rid {
    /// Page holding the record.
    pub page_no: PageId,
    /// Index into that page's slot directory.
    pub slot_no: u16,
}

impl Rid {
    /// Builds a record identifier from its parts.
    pub const fn new(page_no: PageId, slot_no: u16) -> Self {
        Self { page_no, slot_no }
    }
}

/// Errors surfaced by slotted-page operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The record plus its slot entry does not fit in the remaining free space.
    #[error("insufficient space: need {needed} bytes, {available} available")]
    InsufficientSpace {
        /// Bytes requested by the record.
        needed: usize,
        /// Largest record the page could accept.
        available: usize,
    },
    /// The slot index is outside the current slot directory.
    #[error("invalid slot {slot} (slot count {slot_count})")]
    InvalidSlot {
        /// Requested slot index.
        slot: u16,
        /// Slot count at the time of the call.
        slot_count: u16,
    },
    /// Delete targeted a slot that is already a tombstone.
    #[error("record {0} already deleted")]
    AlreadyDeleted(Rid),
    /// Read targeted a slot that is a tombstone.
    #[error("record {0} not found")]
    NotFound(Rid),
    /// Iteration ran past the last live record.
    #[error("end of page")]
    EndOfPage,
    /// The record identifier names a different page.
    #[error("record {rid} does not belong to page {page}")]
    WrongPage {
        /// Offending identifier.
        rid: Rid,
        /// Page the call was made on.
        page: PageId,
    },
    /// A page image violates the layout invariants.
    #[error("corruption: {0}")]
    Corruption(&'static str),
}

impl PageError {
    /// Returns true for outcomes callers are expected to handle in normal
    /// control flow: a full page, a repeated delete, an exhausted scan.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            PageError::InsufficientSpace { .. } | PageError::AlreadyDeleted(_) | PageError::EndOfPage
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PageError>;

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

impl From<u32> for PageId {
    fn from(value: u32) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u32 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

pub mod page {
    //! Fixed page geometry and the header record stored at offset zero.

    use crate::primitives::bytes::le;

    use super::{PageId, PageError, Result};

    /// Total page capacity in bytes.
    pub const MAX_SPACE: usize = 1024;
    /// Length of the fixed header preceding the data area.
    pub const HEADER_LEN: usize = 20;
    /// Bytes available to the slot directory and record heap together.
    pub const DATA_LEN: usize = MAX_SPACE - HEADER_LEN;
    /// Size in bytes of a single slot directory entry (offset + length).
    pub const SLOT_ENTRY_LEN: usize = 4;
    /// On-disk encoding of an absent neighbour link.
    pub const INVALID_PAGE: u32 = u32::MAX;
    /// On-disk length value marking a tombstoned slot.
    pub const EMPTY_SLOT: u16 = u16::MAX;

    pub mod header {
        //! Byte offsets for fixed header fields.
        use core::ops::Range;

        /// Identifier of the page itself.
        pub const CUR_PAGE: Range<usize> = 0..4;
        /// Previous page link.
        pub const PREV_PAGE: Range<usize> = 4..8;
        /// Next page link.
        pub const NEXT_PAGE: Range<usize> = 8..12;
        /// Allocated slot directory entries.
        pub const SLOT_CNT: Range<usize> = 12..14;
        /// Start of the record heap.
        pub const USED_PTR: Range<usize> = 14..16;
        /// Free-space counter.
        pub const FREE_SPACE: Range<usize> = 16..18;
        /// Always zero.
        pub const RESERVED: Range<usize> = 18..20;
    }

    /// Decoded copy of the page header.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct PageHeader {
        /// Identifier of the page itself.
        pub cur_page: PageId,
        /// Previous page in the heap-file chain.
        pub prev_page: Option<PageId>,
        /// Next page in the heap-file chain.
        pub next_page: Option<PageId>,
        /// Number of allocated slot directory entries.
        pub slot_cnt: u16,
        /// Start of the live record heap, relative to the data area.
        pub used_ptr: u16,
        /// Bytes between the end of the slot directory and `used_ptr`.
        pub free_space: u16,
    }

    impl PageHeader {
        /// Header of a freshly initialised page.
        pub fn empty(cur_page: PageId) -> Self {
            Self {
                cur_page,
                prev_page: None,
                next_page: None,
                slot_cnt: 0,
                used_ptr: DATA_LEN as u16,
                free_space: DATA_LEN as u16,
            }
        }

        /// Writes the header into the first `HEADER_LEN` bytes of `dst`,
        /// zeroing the reserved field.
        ///
        /// Panics if `dst` is shorter than `HEADER_LEN`.
        pub fn encode(&self, dst: &mut [u8]) {
            let hdr = &mut dst[..HEADER_LEN];
            le::put_u32(&mut hdr[header::CUR_PAGE], self.cur_page.0);
            le::put_u32(&mut hdr[header::PREV_PAGE], encode_link(self.prev_page));
            le::put_u32(&mut hdr[header::NEXT_PAGE], encode_link(self.next_page));
            le::put_u16(&mut hdr[header::SLOT_CNT], self.slot_cnt);
            le::put_u16(&mut hdr[header::USED_PTR], self.used_ptr);
            le::put_u16(&mut hdr[header::FREE_SPACE], self.free_space);
            hdr[header::RESERVED].fill(0);
        }

        /// Reads the header from the start of a page image.
        pub fn decode(src: &[u8]) -> Result<Self> {
            if src.len() < HEADER_LEN {
                return Err(PageError::Corruption("page header truncated"));
            }
            let hdr = &src[..HEADER_LEN];
            Ok(Self {
                cur_page: PageId(le::get_u32(&hdr[header::CUR_PAGE])),
                prev_page: decode_link(le::get_u32(&hdr[header::PREV_PAGE])),
                next_page: decode_link(le::get_u32(&hdr[header::NEXT_PAGE])),
                slot_cnt: le::get_u16(&hdr[header::SLOT_CNT]),
                used_ptr: le::get_u16(&hdr[header::USED_PTR]),
                free_space: le::get_u16(&hdr[header::FREE_SPACE]),
            })
        }
    }

    /// Encodes an optional chain link, mapping `None` to [`INVALID_PAGE`].
    pub fn encode_link(link: Option<PageId>) -> u32 {
        link.map(|p| p.0).unwrap_or(INVALID_PAGE)
    }

    /// Inverse of [`encode_link`].
    pub fn decode_link(raw: u32) -> Option<PageId> {
        if raw == INVALID_PAGE {
            None
        } else {
            Some(PageId(raw))
        }
    }
}
