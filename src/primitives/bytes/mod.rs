#![forbid(unsafe_code)]
//! Fixed-width integer encoding used by the page header and slot directory.

pub mod le {
    //! Little-endian accessors over byte slices.
    //!
    //! Callers hand in slices cut from fixed layout ranges, so a short slice
    //! is a layout bug and panics.

    const U16_LEN: usize = core::mem::size_of::<u16>();
    const U32_LEN: usize = core::mem::size_of::<u32>();

    /// Writes `v` into the first two bytes of `dst`.
    pub fn put_u16(dst: &mut [u8], v: u16) {
        assert!(dst.len() >= U16_LEN, "destination too small");
        dst[..U16_LEN].copy_from_slice(&v.to_le_bytes());
    }

    /// Reads a u16 from the first two bytes of `src`.
    pub fn get_u16(src: &[u8]) -> u16 {
        assert!(
            src.len() >= U16_LEN,
            "u16 source shorter than 2 bytes (have {})",
            src.len()
        );
        u16::from_le_bytes([src[0], src[1]])
    }

    /// Writes `v` into the first four bytes of `dst`.
    pub fn put_u32(dst: &mut [u8], v: u32) {
        assert!(dst.len() >= U32_LEN, "destination too small");
        dst[..U32_LEN].copy_from_slice(&v.to_le_bytes());
    }

    /// Reads a u32 from the first four bytes of `src`.
    pub fn get_u32(src: &[u8]) -> u32 {
        assert!(
            src.len() >= U32_LEN,
            "u32 source shorter than 4 bytes (have {})",
            src.len()
        );
        u32::from_le_bytes([src[0], src[1], src[2], src[3]])
    }
}
