//! Track selection
//!
//! A [`TrackSelector`] names the track to expose, either by number or by
//! role. Selectors are resolved against the full list of track records read
//! from the container (see [`super::metadata::scan_tracks`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metadata::TrackMetadata;

/// Which track of a disc image to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TrackSelector {
    /// Explicit 1-based track number
    Number(u32),
    /// The final track record (requires at least two tracks)
    Last,
    /// The first track that is not audio
    FirstData,
    /// The largest non-audio track
    #[default]
    Primary,
}

/// Errors converting user input into a selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Track numbers start at 1")]
    ZeroTrack,

    #[error("Unknown track selector: {0}")]
    Unknown(String),

    #[error("Unknown track selector code: {0}")]
    UnknownCode(i32),
}

impl FromStr for TrackSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first-data" | "first_data" => Ok(Self::FirstData),
            "primary" => Ok(Self::Primary),
            other => match other.parse::<u32>() {
                Ok(0) => Err(SelectorError::ZeroTrack),
                Ok(n) => Ok(Self::Number(n)),
                Err(_) => Err(SelectorError::Unknown(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for TrackSelector {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Numeric selector codes used by C-style callers: positive track numbers,
/// `-1` first data track, `-2` last track, `-3` primary track
impl TryFrom<i32> for TrackSelector {
    type Error = SelectorError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Self::FirstData),
            -2 => Ok(Self::Last),
            -3 => Ok(Self::Primary),
            0 => Err(SelectorError::ZeroTrack),
            n if n > 0 => Ok(Self::Number(n.unsigned_abs())),
            n => Err(SelectorError::UnknownCode(n)),
        }
    }
}

impl fmt::Display for TrackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Last => f.write_str("last"),
            Self::FirstData => f.write_str("first-data"),
            Self::Primary => f.write_str("primary"),
        }
    }
}

impl From<TrackSelector> for String {
    fn from(selector: TrackSelector) -> Self {
        selector.to_string()
    }
}

/// Find the record for `track`, in container order
fn find_number(tracks: &[TrackMetadata], track: u32) -> Option<&TrackMetadata> {
    tracks.iter().find(|t| t.track == track)
}

/// Resolve a selector against the container's track records
///
/// The returned record carries its cumulative frame offset.
pub fn locate(tracks: &[TrackMetadata], selector: TrackSelector) -> Option<&TrackMetadata> {
    let found = match selector {
        TrackSelector::Number(n) => find_number(tracks, n),
        TrackSelector::Last => {
            if tracks.len() >= 2 {
                tracks.last()
            } else {
                None
            }
        }
        TrackSelector::FirstData => tracks.iter().find(|t| !t.is_audio()),
        TrackSelector::Primary => {
            let mut largest: Option<&TrackMetadata> = None;
            for track in tracks.iter().filter(|t| !t.is_audio()) {
                if largest.map_or(true, |l| track.frames > l.frames) {
                    largest = Some(track);
                }
            }
            largest.and_then(|l| find_number(tracks, l.track))
        }
    };

    match found {
        Some(track) => log::debug!(
            "Selector {} resolved to track {} ({}, frame offset {})",
            selector,
            track.track,
            track.track_type,
            track.frame_offset
        ),
        None => log::debug!("Selector {} matched no track", selector),
    }

    found
}
