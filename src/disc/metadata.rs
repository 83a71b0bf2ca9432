//! CD/GD-ROM track metadata
//!
//! Track layout lives in textual metadata records inside the container, one
//! record per track. Three record formats exist; newer containers carry the
//! extended CD format, older ones the legacy CD format, and Dreamcast images
//! the GD-ROM format.

use super::engine::HunkSource;
use super::formats::TrackType;

/// Tracks are padded to a multiple of this many frames inside the container
const TRACK_PAD: u32 = 4;

/// Upper bound on records scanned, well above the 99 tracks a disc can hold
const MAX_TRACK_RECORDS: u32 = 256;

/// Metadata record formats, in lookup priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRecordFormat {
    /// `CHT2`: extended CD-ROM track record
    CdTrack2,
    /// `CHTR`: legacy CD-ROM track record
    CdTrack,
    /// `CHGD`: GD-ROM track record
    GdTrack,
}

impl TrackRecordFormat {
    /// Formats in the order they are tried
    pub const PRIORITY: [Self; 3] = [Self::CdTrack2, Self::CdTrack, Self::GdTrack];

    /// Four-character metadata tag
    pub fn metatag(self) -> u32 {
        match self {
            Self::CdTrack2 => 0x4348_5432, // "CHT2"
            Self::CdTrack => 0x4348_5452,  // "CHTR"
            Self::GdTrack => 0x4348_4744,  // "CHGD"
        }
    }

    /// Field keys in the order they appear in the record text
    fn keys(self) -> &'static [&'static str] {
        match self {
            Self::CdTrack2 => &[
                "TRACK", "TYPE", "SUBTYPE", "FRAMES", "PREGAP", "PGTYPE", "PGSUB", "POSTGAP",
            ],
            Self::CdTrack => &["TRACK", "TYPE", "SUBTYPE", "FRAMES"],
            Self::GdTrack => &[
                "TRACK", "TYPE", "SUBTYPE", "FRAMES", "PAD", "PREGAP", "PGTYPE", "PGSUB",
                "POSTGAP",
            ],
        }
    }

    /// Parse a record of this format
    ///
    /// Returns `None` unless every field is present, in order, with a
    /// well-formed value and nothing trailing.
    pub fn parse(self, text: &str) -> Option<TrackMetadata> {
        let values = split_fields(text, self.keys())?;

        let number = |i: usize| values.get(i).and_then(|v| v.parse::<u32>().ok());
        let word = |i: usize| values.get(i).map(|v| v.to_string());

        let metadata = match self {
            Self::CdTrack2 => TrackMetadata::new(
                number(0)?,
                &word(1)?,
                word(2)?,
                number(3)?,
                0,
                number(4)?,
                word(5)?,
                word(6)?,
                number(7)?,
            ),
            Self::CdTrack => TrackMetadata::new(
                number(0)?,
                &word(1)?,
                word(2)?,
                number(3)?,
                0,
                0,
                String::new(),
                String::new(),
                0,
            ),
            Self::GdTrack => TrackMetadata::new(
                number(0)?,
                &word(1)?,
                word(2)?,
                number(3)?,
                number(4)?,
                number(5)?,
                word(6)?,
                word(7)?,
                number(8)?,
            ),
        };

        Some(metadata)
    }
}

/// Split `KEY:VALUE` tokens, checking keys and field count
fn split_fields<'a>(text: &'a str, keys: &[&str]) -> Option<Vec<&'a str>> {
    let mut values = Vec::with_capacity(keys.len());
    let mut tokens = text.split_whitespace();

    for key in keys {
        let (found, value) = tokens.next()?.split_once(':')?;
        if found != *key || value.is_empty() {
            return None;
        }
        values.push(value);
    }

    if tokens.next().is_some() {
        return None;
    }

    Some(values)
}

/// Frames needed to pad a track out to the container's track alignment
pub fn padding_frames(frames: u32) -> u32 {
    frames
        .checked_next_multiple_of(TRACK_PAD)
        .map_or(0, |padded| padded - frames)
}

/// One track as described by the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track number (1-based)
    pub track: u32,
    pub track_type: TrackType,
    pub subtype: String,
    /// Frames of track data, excluding pregap and postgap
    pub frames: u32,
    /// Alignment frames between this track and the next
    pub pad_frames: u32,
    /// PAD value reported by GD-ROM records
    pub reported_pad: u32,
    pub pregap: u32,
    pub pregap_type: String,
    pub pregap_subtype: String,
    pub postgap: u32,
    /// Cumulative frame position of the track within the container
    pub frame_offset: u32,
}

impl TrackMetadata {
    #[allow(clippy::too_many_arguments)]
    fn new(
        track: u32,
        track_type: &str,
        subtype: String,
        frames: u32,
        reported_pad: u32,
        pregap: u32,
        pregap_type: String,
        pregap_subtype: String,
        postgap: u32,
    ) -> Self {
        Self {
            track,
            track_type: TrackType::from_code(track_type),
            subtype,
            frames,
            pad_frames: padding_frames(frames),
            reported_pad,
            pregap,
            pregap_type,
            pregap_subtype,
            postgap,
            frame_offset: 0,
        }
    }

    /// Whether the pregap frames are physically stored ahead of the track data
    pub fn pregap_in_container(&self) -> bool {
        self.pregap_type == self.track_type.code()
    }

    /// Pregap frames addressable through a stream
    pub fn stored_pregap(&self) -> u32 {
        if self.pregap_in_container() {
            self.pregap
        } else {
            0
        }
    }

    pub fn is_audio(&self) -> bool {
        self.track_type.is_audio()
    }
}

/// Fetch and parse the `index`-th track record
///
/// Formats are tried in priority order; a record that exists but fails to
/// parse falls through to the next format.
pub fn get_record<S: HunkSource>(source: &mut S, index: u32) -> Option<TrackMetadata> {
    for format in TrackRecordFormat::PRIORITY {
        let Some(raw) = source.metadata(format.metatag(), index) else {
            continue;
        };

        let text = String::from_utf8_lossy(&raw);
        let text = text.trim_end_matches('\0');

        match format.parse(text) {
            Some(metadata) => return Some(metadata),
            None => log::warn!("Malformed {:?} record {}: {:?}", format, index, text),
        }
    }

    None
}

/// Read every track record in container order, assigning frame offsets
pub fn scan_tracks<S: HunkSource>(source: &mut S) -> Vec<TrackMetadata> {
    let mut tracks = Vec::new();
    let mut frame_offset = 0u32;

    for index in 0..MAX_TRACK_RECORDS {
        let Some(mut metadata) = get_record(source, index) else {
            break;
        };

        metadata.frame_offset = frame_offset;
        frame_offset = frame_offset
            .saturating_add(metadata.frames)
            .saturating_add(metadata.pad_frames);

        log::debug!(
            "Track {}: type={}, frames={}, pregap={} ({}), offset={}",
            metadata.track,
            metadata.track_type,
            metadata.frames,
            metadata.pregap,
            metadata.pregap_type,
            metadata.frame_offset
        );
        tracks.push(metadata);
    }

    tracks
}
