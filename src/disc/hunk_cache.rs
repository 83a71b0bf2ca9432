//! Single-hunk decompression cache

use std::collections::TryReserveError;
use std::io;

use super::engine::HunkSource;

/// Holds the most recently decompressed hunk
pub struct HunkCache {
    /// Hunk-sized buffer, allocated once
    buffer: Vec<u8>,
    /// Hunk currently held in `buffer`
    cached: Option<u32>,
    /// Swap 16-bit words after each load (big-endian audio)
    swap_bytes: bool,
}

impl HunkCache {
    /// Allocate a cache for hunks of `hunk_bytes` bytes
    pub fn new(hunk_bytes: usize, swap_bytes: bool) -> Result<Self, TryReserveError> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(hunk_bytes)?;
        buffer.resize(hunk_bytes, 0);

        Ok(Self {
            buffer,
            cached: None,
            swap_bytes,
        })
    }

    /// Make sure `hunk_num` is loaded, decompressing it on a miss
    ///
    /// If the read fails the cache is left empty, since the source may have
    /// partially overwritten the buffer.
    pub fn load<S: HunkSource>(&mut self, source: &mut S, hunk_num: u32) -> io::Result<()> {
        if self.cached == Some(hunk_num) {
            return Ok(());
        }

        if let Err(e) = source.read_hunk(hunk_num, &mut self.buffer) {
            self.cached = None;
            return Err(e);
        }

        if self.swap_bytes {
            for word in self.buffer.chunks_exact_mut(2) {
                word.swap(0, 1);
            }
        }

        log::trace!("Loaded hunk {}", hunk_num);
        self.cached = Some(hunk_num);
        Ok(())
    }

    /// Hunk number currently held, if any
    pub fn cached(&self) -> Option<u32> {
        self.cached
    }

    /// `len` bytes of the cached hunk starting at `start`
    pub fn bytes(&self, start: usize, len: usize) -> Option<&[u8]> {
        self.cached?;
        self.buffer.get(start..start.checked_add(len)?)
    }

    /// Size of the hunk buffer
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn swaps_bytes(&self) -> bool {
        self.swap_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::engine::memory::MemorySource;

    /// Two units per hunk, every byte holds its unit number and position
    fn source() -> MemorySource {
        MemorySource::new(8, 4, 6, |unit, byte| (unit as u8) * 16 + byte as u8)
    }

    #[test]
    fn test_buffer_is_hunk_sized() {
        let cache = HunkCache::new(19584, false).unwrap();
        assert_eq!(cache.capacity(), 19584);
        assert_eq!(cache.cached(), None);
        assert!(cache.bytes(0, 1).is_none());
    }

    #[test]
    fn test_load_and_copy() {
        let mut source = source();
        let mut cache = HunkCache::new(8, false).unwrap();

        cache.load(&mut source, 1).unwrap();
        assert_eq!(cache.cached(), Some(1));
        assert_eq!(cache.bytes(0, 4).unwrap(), &[0x20, 0x21, 0x22, 0x23]);
        assert_eq!(cache.bytes(4, 4).unwrap(), &[0x30, 0x31, 0x32, 0x33]);
        assert!(cache.bytes(6, 4).is_none());
    }

    #[test]
    fn test_hit_does_not_reload() {
        let mut source = source();
        let mut cache = HunkCache::new(8, false).unwrap();

        cache.load(&mut source, 0).unwrap();
        cache.load(&mut source, 0).unwrap();
        assert_eq!(source.hunk_reads, 1);

        cache.load(&mut source, 2).unwrap();
        assert_eq!(source.hunk_reads, 2);
    }

    #[test]
    fn test_swap_applied_once() {
        let mut source = source();
        let mut cache = HunkCache::new(8, true).unwrap();

        cache.load(&mut source, 0).unwrap();
        cache.load(&mut source, 0).unwrap();
        assert_eq!(cache.bytes(0, 4).unwrap(), &[0x01, 0x00, 0x03, 0x02]);
    }

    #[test]
    fn test_failed_load_empties_cache() {
        let mut source = source();
        source.failing.insert(1);
        let mut cache = HunkCache::new(8, false).unwrap();

        cache.load(&mut source, 0).unwrap();
        assert!(cache.load(&mut source, 1).is_err());
        assert_eq!(cache.cached(), None);

        // Hunk 0 must be fetched again rather than served from a clobbered buffer
        cache.load(&mut source, 0).unwrap();
        assert_eq!(source.hunk_reads, 2);
        assert_eq!(cache.bytes(0, 2).unwrap(), &[0x00, 0x01]);
    }
}
