//! Storage engine access
//!
//! The stream only needs four things from a hunk-compressed container: its
//! geometry, whole decompressed hunks, tagged metadata records, and to be
//! released when done. [`HunkSource`] captures that contract; [`ChdFile`]
//! fulfils it for CHD files through the `chd` crate.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use chd::Chd;
use chd::metadata::MetadataTag;

/// Sizes reported by the container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkGeometry {
    /// Bytes in one decompressed hunk
    pub hunk_bytes: u32,
    /// Bytes in one native storage unit (a CD frame with subcode, for CD images)
    pub unit_bytes: u32,
}

impl HunkGeometry {
    /// Number of whole units stored in each hunk
    pub fn units_per_hunk(&self) -> u32 {
        if self.unit_bytes == 0 {
            0
        } else {
            self.hunk_bytes / self.unit_bytes
        }
    }
}

/// A read-only container of fixed-size compressed hunks
pub trait HunkSource {
    /// Header geometry, fixed for the lifetime of the source
    fn geometry(&self) -> HunkGeometry;

    /// Decompress hunk `hunk_num` into `out`, which is exactly `hunk_bytes` long
    fn read_hunk(&mut self, hunk_num: u32, out: &mut [u8]) -> io::Result<()>;

    /// Raw value of the `index`-th metadata record carrying `tag`, if present
    fn metadata(&mut self, tag: u32, index: u32) -> Option<Vec<u8>>;
}

/// A CHD file opened read-only
pub struct ChdFile {
    chd: Chd<BufReader<File>>,
    /// Scratch space for compressed hunk data
    compressed_buf: Vec<u8>,
}

impl ChdFile {
    /// Open a CHD file and validate its header
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let chd = Chd::open(BufReader::new(file), None).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Failed to open CHD: {}", e))
        })?;

        let header = chd.header();
        log::debug!(
            "Opened CHD {}: hunk_size={}, unit_bytes={}, hunks={}",
            path.display(),
            header.hunk_size(),
            header.unit_bytes(),
            header.hunk_count()
        );

        Ok(Self {
            chd,
            compressed_buf: Vec::new(),
        })
    }
}

impl HunkSource for ChdFile {
    fn geometry(&self) -> HunkGeometry {
        let header = self.chd.header();
        HunkGeometry {
            hunk_bytes: header.hunk_size(),
            unit_bytes: header.unit_bytes(),
        }
    }

    fn read_hunk(&mut self, hunk_num: u32, out: &mut [u8]) -> io::Result<()> {
        self.chd
            .hunk(hunk_num)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))?
            .read_hunk_in(&mut self.compressed_buf, out)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))?;
        Ok(())
    }

    fn metadata(&mut self, tag: u32, index: u32) -> Option<Vec<u8>> {
        let meta_ref = self
            .chd
            .metadata_refs()
            .filter(|meta_ref| meta_ref.metatag() == tag)
            .nth(index as usize)?;

        match meta_ref.read(self.chd.inner()) {
            Ok(metadata) => Some(metadata.value),
            Err(e) => {
                log::warn!("Failed to read metadata {:08x}[{}]: {:?}", tag, index, e);
                None
            }
        }
    }
}

/// In-memory container used by the unit tests
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashSet;

    pub(crate) struct MemorySource {
        geometry: HunkGeometry,
        data: Vec<u8>,
        records: Vec<(u32, Vec<u8>)>,
        pub(crate) failing: HashSet<u32>,
        pub(crate) hunk_reads: usize,
    }

    impl MemorySource {
        /// A container whose unit `n` is filled by `fill(n)`
        pub(crate) fn new(
            hunk_bytes: u32,
            unit_bytes: u32,
            units: u32,
            fill: impl Fn(u32, usize) -> u8,
        ) -> Self {
            let mut data = Vec::with_capacity((units * unit_bytes) as usize);
            for unit in 0..units {
                for byte in 0..unit_bytes as usize {
                    data.push(fill(unit, byte));
                }
            }
            Self {
                geometry: HunkGeometry {
                    hunk_bytes,
                    unit_bytes,
                },
                data,
                records: Vec::new(),
                failing: HashSet::new(),
                hunk_reads: 0,
            }
        }

        pub(crate) fn with_record(mut self, tag: u32, text: &str) -> Self {
            let mut value = text.as_bytes().to_vec();
            value.push(0);
            self.records.push((tag, value));
            self
        }
    }

    impl HunkSource for MemorySource {
        fn geometry(&self) -> HunkGeometry {
            self.geometry
        }

        fn read_hunk(&mut self, hunk_num: u32, out: &mut [u8]) -> io::Result<()> {
            if self.failing.contains(&hunk_num) {
                out.fill(0xEE);
                return Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt hunk"));
            }
            self.hunk_reads += 1;
            let start = hunk_num as usize * self.geometry.hunk_bytes as usize;
            out.fill(0);
            if let Some(src) = self.data.get(start..) {
                let len = src.len().min(out.len());
                out[..len].copy_from_slice(&src[..len]);
            }
            Ok(())
        }

        fn metadata(&mut self, tag: u32, index: u32) -> Option<Vec<u8>> {
            self.records
                .iter()
                .filter(|(t, _)| *t == tag)
                .nth(index as usize)
                .map(|(_, value)| value.clone())
        }
    }
}
