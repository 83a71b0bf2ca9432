//! CHD Track Stream Library
//!
//! Exposes one track of a CHD (Compressed Hunks of Data) disc image as an
//! ordinary random-access byte stream, with stored pregaps read back as zeros
//! and audio converted to little-endian samples.

pub mod config;
pub mod disc;

pub use disc::{ChdStream, SeekOrigin, StreamError, StreamResult, TrackSelector};
