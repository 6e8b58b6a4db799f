/// Behavioural knobs for a [`super::HeapPage`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageOptions {
    /// Zero bytes vacated by compaction or tail truncation.
    pub scrub_freed: bool,
    /// Run a full structural check after every mutation.
    pub verify_writes: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            scrub_freed: false,
            verify_writes: cfg!(feature = "strict-verify"),
        }
    }
}

impl PageOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables zeroing of reclaimed bytes.
    pub fn scrub_freed(mut self, enabled: bool) -> Self {
        self.scrub_freed = enabled;
        self
    }

    /// Enables or disables post-mutation verification.
    pub fn verify_writes(mut self, enabled: bool) -> Self {
        self.verify_writes = enabled;
        self
    }
}
