//! Disc image track access
//!
//! Provides functionality for locating a track inside a CHD disc image and
//! reading it as a flat byte stream.

mod engine;
mod formats;
mod hunk_cache;
mod metadata;
mod stream;
mod track;

pub use engine::{ChdFile, HunkGeometry, HunkSource};
pub use formats::{FrameGeometry, TrackType, CD_SECTOR_SIZE_RAW};
pub use hunk_cache::HunkCache;
pub use metadata::{get_record, padding_frames, scan_tracks, TrackMetadata, TrackRecordFormat};
pub use stream::{ChdStream, SeekOrigin, StreamError, StreamResult};
pub use track::{locate, SelectorError, TrackSelector};
