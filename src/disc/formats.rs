//! Track type codes and frame geometry definitions

use std::fmt;

/// Raw CD sector size (sync + header + user data + EDC/ECC, or 588 stereo samples)
pub const CD_SECTOR_SIZE_RAW: u32 = 2352;

/// Track types as they appear in CHD track metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackType {
    /// Mode 1 data stored as full raw sectors
    Mode1Raw,
    /// Mode 2 data stored as full raw sectors
    Mode2Raw,
    /// Red Book audio, stored big-endian in the container
    Audio,
    /// Any already-linearized type (MODE1, MODE2_FORM1, ...)
    Cooked(String),
}

impl TrackType {
    /// Parse a track type code from metadata
    pub fn from_code(code: &str) -> Self {
        match code {
            "MODE1_RAW" => Self::Mode1Raw,
            "MODE2_RAW" => Self::Mode2Raw,
            "AUDIO" => Self::Audio,
            other => Self::Cooked(other.to_string()),
        }
    }

    /// The metadata code for this type
    pub fn code(&self) -> &str {
        match self {
            Self::Mode1Raw => "MODE1_RAW",
            Self::Mode2Raw => "MODE2_RAW",
            Self::Audio => "AUDIO",
            Self::Cooked(code) => code.as_str(),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }

    /// Frame layout of this track inside a container with the given unit size
    pub fn geometry(&self, unit_bytes: u32) -> FrameGeometry {
        match self {
            Self::Mode1Raw | Self::Mode2Raw => FrameGeometry {
                frame_size: CD_SECTOR_SIZE_RAW,
                data_offset: 0,
                swap_bytes: false,
            },
            Self::Audio => FrameGeometry {
                frame_size: CD_SECTOR_SIZE_RAW,
                data_offset: 0,
                swap_bytes: true,
            },
            Self::Cooked(_) => FrameGeometry {
                frame_size: unit_bytes,
                data_offset: 0,
                swap_bytes: false,
            },
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How a track's frames are laid out in the decompressed hunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Bytes of each frame exposed through the stream
    pub frame_size: u32,
    /// Offset of the exposed bytes within a stored unit
    pub data_offset: u32,
    /// Swap every 16-bit word after decompression
    pub swap_bytes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_detection() {
        assert_eq!(TrackType::from_code("MODE1_RAW"), TrackType::Mode1Raw);
        assert_eq!(TrackType::from_code("MODE2_RAW"), TrackType::Mode2Raw);
        assert_eq!(TrackType::from_code("AUDIO"), TrackType::Audio);
        assert_eq!(
            TrackType::from_code("MODE1"),
            TrackType::Cooked("MODE1".to_string())
        );
        assert_eq!(TrackType::from_code("MODE2_FORM1").code(), "MODE2_FORM1");
    }

    #[test]
    fn test_raw_geometry() {
        let geometry = TrackType::Mode1Raw.geometry(2448);
        assert_eq!(geometry.frame_size, 2352);
        assert_eq!(geometry.data_offset, 0);
        assert!(!geometry.swap_bytes);
    }

    #[test]
    fn test_audio_is_swapped() {
        let geometry = TrackType::Audio.geometry(2448);
        assert_eq!(geometry.frame_size, 2352);
        assert!(geometry.swap_bytes);
    }

    #[test]
    fn test_cooked_uses_unit_size() {
        let geometry = TrackType::from_code("MODE1").geometry(2048);
        assert_eq!(geometry.frame_size, 2048);
        assert!(!geometry.swap_bytes);
    }
}
