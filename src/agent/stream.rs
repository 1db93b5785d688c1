//! Simulated streaming of a fully received reply.

use std::time::Duration;

pub const DEFAULT_CHUNK_COUNT: usize = 15;
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(30);

/// Chunking parameters for simulated streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Target number of slices.
    pub chunk_count: usize,
    /// Pause before each slice.
    pub chunk_delay: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_count: DEFAULT_CHUNK_COUNT,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

/// Split `content` into slices of `max(1, ceil(chars / chunk_count))`
/// characters. Slices never cut through a character.
pub fn split_chunks(content: &str, chunk_count: usize) -> Vec<&str> {
    let total = content.chars().count();
    if total == 0 {
        return Vec::new();
    }
    let size = total.div_ceil(chunk_count.max(1)).max(1);

    let mut chunks = Vec::with_capacity(total.div_ceil(size));
    let mut start = 0;
    let mut taken = 0;
    for (idx, _) in content.char_indices() {
        if taken == size {
            chunks.push(&content[start..idx]);
            start = idx;
            taken = 0;
        }
        taken += 1;
    }
    chunks.push(&content[start..]);
    chunks
}

/// Feed `content` to `on_chunk` slice by slice, sleeping before each one.
/// Returns the number of slices delivered.
pub async fn deliver<F>(content: &str, options: StreamOptions, on_chunk: &mut F) -> usize
where
    F: FnMut(&str) + Send + ?Sized,
{
    let chunks = split_chunks(content, options.chunk_count);
    for chunk in &chunks {
        if !options.chunk_delay.is_zero() {
            tokio::time::sleep(options.chunk_delay).await;
        }
        on_chunk(chunk);
    }
    chunks.len()
}
