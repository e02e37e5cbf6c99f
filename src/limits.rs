//! Resource ceilings applied to every upload

/// Maximum accepted upload size: 50MB
pub const MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// Maximum number of pages processed per document
pub const MAX_PAGE_COUNT: usize = 500;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Ceilings checked before any expensive work is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_file_size_bytes: usize,
    pub max_page_count: usize,
}

impl ResourceLimits {
    /// Process-wide limits
    pub const DEFAULT: ResourceLimits = ResourceLimits {
        max_file_size_bytes: MAX_FILE_SIZE_BYTES,
        max_page_count: MAX_PAGE_COUNT,
    };
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whole megabytes, rounded down (used in human readable messages)
pub fn whole_megabytes(bytes: usize) -> usize {
    bytes / BYTES_PER_MB
}
