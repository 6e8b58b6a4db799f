use crate::types::page::{DATA_LEN, SLOT_ENTRY_LEN};
use crate::types::{PageError, Result};

use super::HeapPage;

impl HeapPage {
    /// Checks the layout invariants of the page.
    ///
    /// * the slot directory ends at or before `used_ptr`, which lies inside
    ///   the data area;
    /// * `free_space == used_ptr - slot_count * SLOT_ENTRY_LEN`;
    /// * walking live slots from the youngest to the oldest visits record
    ///   extents that tile `[used_ptr, DATA_LEN)` exactly, with no overlap
    ///   and no gap.
    pub fn verify(&self) -> Result<()> {
        let used = self.used_ptr() as usize;
        if used > DATA_LEN {
            return Err(PageError::Corruption("used_ptr beyond data area"));
        }
        let dir = self.slot_directory()?;
        let dir_end = dir.len() * SLOT_ENTRY_LEN;
        if dir_end > used {
            return Err(PageError::Corruption(
                "slot directory overlaps record heap",
            ));
        }
        if self.free_space() as usize != used - dir_end {
            return Err(PageError::Corruption("free space does not match layout"));
        }

        if dir.is_empty() {
            return if used == DATA_LEN {
                Ok(())
            } else {
                Err(PageError::Corruption("gap inside record heap"))
            };
        }

        let extents: Vec<(usize, usize)> =
            dir.iter().filter_map(|entry| entry.extent()).collect();
        let mut cursor = used;
        for &(offset, len) in extents.iter().rev() {
            if offset < cursor {
                return Err(PageError::Corruption(
                    "live records overlap or are out of slot order",
                ));
            }
            if offset > cursor {
                return Err(PageError::Corruption("gap inside record heap"));
            }
            cursor = offset
                .checked_add(len)
                .ok_or(PageError::Corruption("record extent overflow"))?;
            if cursor > DATA_LEN {
                return Err(PageError::Corruption("record extent beyond data area"));
            }
        }
        if cursor != DATA_LEN {
            return Err(PageError::Corruption("gap inside record heap"));
        }
        Ok(())
    }
}
