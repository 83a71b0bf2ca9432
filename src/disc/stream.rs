//! Byte stream over a single CHD track
//!
//! A [`ChdStream`] presents one track as a flat, seekable sequence of bytes.
//! Stream offsets are translated into track frames and then into container
//! hunks, which are decompressed one at a time into a [`HunkCache`]. Pregap
//! frames the container does not store read back as zeros.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::engine::{ChdFile, HunkSource};
use super::hunk_cache::HunkCache;
use super::metadata::{scan_tracks, TrackMetadata};
use super::track::{locate, TrackSelector};

/// Errors that can occur when opening or reading a track stream
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to open container {path}: {source}")]
    ContainerOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Track not found: {0}")]
    TrackNotFound(TrackSelector),

    #[error("Failed to allocate {0} byte hunk buffer")]
    Allocation(usize),

    #[error("Unusable container geometry: {0}")]
    InvalidGeometry(String),

    #[error("Failed to read hunk {hunk} after {copied} bytes: {source}")]
    HunkRead {
        hunk: u32,
        /// Bytes delivered by the failing call before the error
        copied: usize,
        #[source]
        source: io::Error,
    },

    #[error("Invalid seek: {0}")]
    InvalidSeek(String),
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        let kind = match &e {
            StreamError::ContainerOpen { source, .. } => source.kind(),
            StreamError::TrackNotFound(_) => io::ErrorKind::NotFound,
            StreamError::InvalidSeek(_) => io::ErrorKind::InvalidInput,
            StreamError::InvalidGeometry(_) => io::ErrorKind::InvalidData,
            StreamError::Allocation(_) | StreamError::HunkRead { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

/// Reference point for [`ChdStream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the start of the track (including pregap)
    Start,
    /// From the current offset
    Current,
    /// From the end of the track
    End,
}

/// C-style `whence` values: 0 start, 1 current, 2 end
impl TryFrom<i32> for SeekOrigin {
    type Error = StreamError;

    fn try_from(whence: i32) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidSeek(format!("unknown origin {}", other))),
        }
    }
}

/// A single track of a CHD disc image, readable as a byte stream
pub struct ChdStream<S: HunkSource = ChdFile> {
    source: S,
    cache: HunkCache,
    /// Record of the opened track
    track: TrackMetadata,
    /// Bytes exposed per frame
    frame_size: u32,
    /// Offset of exposed bytes within a stored unit
    data_offset: u32,
    frames_per_hunk: u32,
    unit_bytes: u32,
    /// First container frame of the track data
    track_frame: u32,
    /// Stream offset where track data begins (after pregap)
    track_start: u64,
    /// Stream offset one past the last byte
    track_end: u64,
    offset: u64,
}

impl ChdStream<ChdFile> {
    /// Open a track of a CHD file
    ///
    /// # Arguments
    /// * `path` - Path to the `.chd` file
    /// * `selector` - Which track to expose
    ///
    /// # Returns
    /// * `Ok(ChdStream)` - Stream positioned at offset 0
    /// * `Err(StreamError)` - The container could not be opened, the track was
    ///   not found, or the hunk buffer could not be set up
    pub fn open(path: &Path, selector: TrackSelector) -> StreamResult<Self> {
        let source = ChdFile::open(path).map_err(|source| StreamError::ContainerOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_source(source, selector)
    }
}

impl<S: HunkSource> ChdStream<S> {
    /// Open a track from an already opened container
    pub fn with_source(mut source: S, selector: TrackSelector) -> StreamResult<Self> {
        let tracks = scan_tracks(&mut source);
        let track = locate(&tracks, selector)
            .cloned()
            .ok_or(StreamError::TrackNotFound(selector))?;

        let geometry = source.geometry();
        let frames_per_hunk = geometry.units_per_hunk();
        if frames_per_hunk == 0 {
            return Err(StreamError::InvalidGeometry(format!(
                "hunk of {} bytes holds no {} byte units",
                geometry.hunk_bytes, geometry.unit_bytes
            )));
        }

        let frame = track.track_type.geometry(geometry.unit_bytes);
        if frame.frame_size == 0 || frame.data_offset + frame.frame_size > geometry.unit_bytes {
            return Err(StreamError::InvalidGeometry(format!(
                "{} frames of {} bytes do not fit {} byte units",
                track.track_type, frame.frame_size, geometry.unit_bytes
            )));
        }

        let hunk_bytes = geometry.hunk_bytes as usize;
        let cache = HunkCache::new(hunk_bytes, frame.swap_bytes)
            .map_err(|_| StreamError::Allocation(hunk_bytes))?;

        let frame_size = u64::from(frame.frame_size);
        let track_start = u64::from(track.stored_pregap()) * frame_size;
        let track_end = track_start + u64::from(track.frames) * frame_size;

        log::debug!(
            "Opened track {} ({}): frame_size={}, frames_per_hunk={}, pregap_bytes={}, length={}, swap={}",
            track.track,
            track.track_type,
            frame.frame_size,
            frames_per_hunk,
            track_start,
            track_end,
            frame.swap_bytes
        );

        Ok(Self {
            source,
            cache,
            frame_size: frame.frame_size,
            data_offset: frame.data_offset,
            frames_per_hunk,
            unit_bytes: geometry.unit_bytes,
            track_frame: track.frame_offset,
            track_start,
            track_end,
            offset: 0,
            track,
        })
    }

    /// Read up to `buf.len()` bytes from the current offset
    ///
    /// Returns fewer bytes than requested only at the end of the track. If a
    /// hunk cannot be decompressed the call fails; bytes copied before the
    /// failure stay in `buf` and the offset moves past them.
    pub fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        self.read_into(buf)
    }

    /// Read one byte, or `None` at the end of the track
    pub fn read_byte(&mut self) -> StreamResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_into(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Fill `buf` with up to `buf.len() - 1` raw bytes and NUL-terminate it
    ///
    /// No line handling is done: newlines are copied like any other byte.
    /// Returns the number of bytes copied, excluding the terminator.
    pub fn read_bounded(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let Some(limit) = buf.len().checked_sub(1) else {
            return Ok(0);
        };

        let mut filled = 0;
        while filled < limit {
            match self.read_byte()? {
                Some(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                }
                None => break,
            }
        }
        buf[filled] = 0;

        Ok(filled)
    }

    /// Current byte offset
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Move back to offset 0
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// Move the read offset
    ///
    /// A target before the start of the track is an error and leaves the
    /// offset unchanged; a target past the end is clamped to the end.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> StreamResult<u64> {
        self.seek_to(offset, origin)
    }

    /// Record of the opened track
    pub fn track(&self) -> &TrackMetadata {
        &self.track
    }

    /// Stream offset where track data begins, after any stored pregap
    pub fn track_start(&self) -> u64 {
        self.track_start
    }

    /// Stream offset one past the last byte of the track
    pub fn track_end(&self) -> u64 {
        self.track_end
    }

    /// Total stream length in bytes, pregap included
    pub fn len(&self) -> u64 {
        self.track_end
    }

    pub fn is_empty(&self) -> bool {
        self.track_end == 0
    }

    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn frames_per_hunk(&self) -> u32 {
        self.frames_per_hunk
    }

    /// Whether 16-bit words are swapped after decompression (audio tracks)
    pub fn is_byte_swapped(&self) -> bool {
        self.cache.swaps_bytes()
    }

    /// Write everything from the current offset to the end of the track
    ///
    /// Reads in `chunk_size` pieces (at least one byte) and returns the number
    /// of bytes written. The writer is not flushed.
    pub fn copy_to<W: Write>(&mut self, writer: &mut W, chunk_size: usize) -> io::Result<u64> {
        let mut buffer = vec![0u8; chunk_size.max(1)];
        let mut written = 0u64;

        loop {
            let n = Read::read(self, &mut buffer)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n])?;
            written += n as u64;
        }

        Ok(written)
    }

    /// Release the container and hunk buffer
    pub fn close(self) {
        log::debug!("Closing track {} stream", self.track.track);
    }

    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let available = self.track_end - self.offset;
        let len = usize::try_from(available).map_or(buf.len(), |a| a.min(buf.len()));
        let frame_size = u64::from(self.frame_size);

        let mut copied = 0;
        while copied < len {
            // Offsets within a frame are always smaller than frame_size (u32)
            let frame_pos = (self.offset % frame_size) as usize;
            let amount = (self.frame_size as usize - frame_pos).min(len - copied);
            let out = &mut buf[copied..copied + amount];

            if self.offset < self.track_start {
                out.fill(0);
            } else {
                self.copy_chunk(frame_pos, out, copied)?;
            }

            copied += amount;
            self.offset += amount as u64;
        }

        Ok(copied)
    }

    /// Copy part of the frame under the cursor out of its hunk
    fn copy_chunk(&mut self, frame_pos: usize, out: &mut [u8], copied: usize) -> StreamResult<()> {
        let frame = u64::from(self.track_frame)
            + (self.offset - self.track_start) / u64::from(self.frame_size);
        let frames_per_hunk = u64::from(self.frames_per_hunk);
        let hunk = frame / frames_per_hunk;
        let hunk_offset = (frame % frames_per_hunk) as usize * self.unit_bytes as usize;

        let hunk = u32::try_from(hunk).map_err(|_| StreamError::HunkRead {
            hunk: u32::MAX,
            copied,
            source: io::Error::new(io::ErrorKind::InvalidInput, "frame beyond addressable hunks"),
        })?;

        if let Err(source) = self.cache.load(&mut self.source, hunk) {
            log::error!("Failed to read hunk {} for frame {}: {}", hunk, frame, source);
            return Err(StreamError::HunkRead {
                hunk,
                copied,
                source,
            });
        }

        let start = frame_pos + hunk_offset + self.data_offset as usize;
        let bytes = self
            .cache
            .bytes(start, out.len())
            .ok_or_else(|| StreamError::HunkRead {
                hunk,
                copied,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "frame extends past hunk"),
            })?;
        out.copy_from_slice(bytes);

        Ok(())
    }

    fn seek_to(&mut self, offset: i64, origin: SeekOrigin) -> StreamResult<u64> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.offset,
            SeekOrigin::End => self.track_end,
        };

        let target = i128::from(base) + i128::from(offset);
        if target < 0 {
            return Err(StreamError::InvalidSeek(format!(
                "offset {} from {:?} is before the start of the track",
                offset, origin
            )));
        }

        self.offset = u64::try_from(target).map_or(self.track_end, |t| t.min(self.track_end));
        Ok(self.offset)
    }
}

/// Bytes delivered before a hunk failure are returned as a short read; the
/// failure surfaces on the next call, which starts at that hunk.
impl<S: HunkSource> Read for ChdStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_into(buf) {
            Ok(n) => Ok(n),
            Err(StreamError::HunkRead { copied, .. }) if copied > 0 => Ok(copied),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S: HunkSource> Seek for ChdStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(n) => (i64::try_from(n).unwrap_or(i64::MAX), SeekOrigin::Start),
            SeekFrom::Current(n) => (n, SeekOrigin::Current),
            SeekFrom::End(n) => (n, SeekOrigin::End),
        };
        self.seek_to(offset, origin).map_err(io::Error::from)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.offset)
    }
}
