//! chdtrack
//!
//! Lists the tracks of a CHD disc image and extracts a single track as a
//! flat byte stream, with stored pregaps zero-filled.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use chd_track_stream::config;
use chd_track_stream::disc::{scan_tracks, ChdFile, ChdStream, TrackMetadata, TrackSelector};

#[derive(Parser)]
#[command(name = "chdtrack", version, about = "Read single tracks from CHD disc images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every track record in the image
    List {
        /// Path to the .chd file
        image: PathBuf,
    },
    /// Show the stream geometry of a track
    Info {
        image: PathBuf,
        /// Track number, or last / first-data / primary
        #[arg(short, long)]
        track: Option<TrackSelector>,
    },
    /// Write a track's byte stream to a file
    Extract {
        image: PathBuf,
        output: PathBuf,
        #[arg(short, long)]
        track: Option<TrackSelector>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = config::get_config();

    match cli.command {
        Command::List { image } => list(&image),
        Command::Info { image, track } => {
            info(&image, track.unwrap_or(config.stream.default_track))
        }
        Command::Extract {
            image,
            output,
            track,
        } => extract(
            &image,
            &output,
            track.unwrap_or(config.stream.default_track),
            config.stream.chunk_size,
        ),
    }
}

fn list(image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut chd = ChdFile::open(image)?;
    let tracks = scan_tracks(&mut chd);

    if tracks.is_empty() {
        println!("No track metadata found in {}", image.display());
        return Ok(());
    }

    write_track_table(&mut io::stdout().lock(), &tracks)?;
    Ok(())
}

fn write_track_table<W: Write>(out: &mut W, tracks: &[TrackMetadata]) -> io::Result<()> {
    writeln!(
        out,
        "{:>5}  {:<12} {:>8} {:>8} {:<10} {:>10}",
        "TRACK", "TYPE", "FRAMES", "PREGAP", "PGTYPE", "OFFSET"
    )?;
    for track in tracks {
        writeln!(
            out,
            "{:>5}  {:<12} {:>8} {:>8} {:<10} {:>10}",
            track.track,
            track.track_type.code(),
            track.frames,
            track.pregap,
            track.pregap_type,
            track.frame_offset
        )?;
    }
    Ok(())
}

fn info(image: &Path, selector: TrackSelector) -> Result<(), Box<dyn std::error::Error>> {
    let stream = ChdStream::open(image, selector)?;
    let track = stream.track();

    println!("Track:        {} ({})", track.track, track.track_type);
    println!("Frame size:   {}", stream.frame_size());
    println!("Frame offset: {}", track.frame_offset);
    println!("Pregap bytes: {}", stream.track_start());
    println!("Length:       {}", stream.len());
    println!("Byte swap:    {}", stream.is_byte_swapped());

    Ok(())
}

fn extract(
    image: &Path,
    output: &Path,
    selector: TrackSelector,
    chunk_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = ChdStream::open(image, selector)?;
    let mut writer = BufWriter::new(File::create(output)?);
    let written = stream.copy_to(&mut writer, chunk_size)?;
    writer.flush()?;

    log::info!(
        "Wrote track {} ({} bytes) to {}",
        stream.track().track,
        written,
        output.display()
    );
    stream.close();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chd_track_stream::disc::{HunkGeometry, HunkSource};

    /// Container with track records only
    struct Records(Vec<&'static str>);

    impl HunkSource for Records {
        fn geometry(&self) -> HunkGeometry {
            HunkGeometry {
                hunk_bytes: 2448 * 8,
                unit_bytes: 2448,
            }
        }

        fn read_hunk(&mut self, _hunk_num: u32, out: &mut [u8]) -> io::Result<()> {
            out.fill(0);
            Ok(())
        }

        fn metadata(&mut self, tag: u32, index: u32) -> Option<Vec<u8>> {
            if tag != 0x4348_5452 {
                return None;
            }
            self.0.get(index as usize).map(|text| text.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_track_table() {
        let mut source = Records(vec![
            "TRACK:1 TYPE:MODE1_RAW SUBTYPE:NONE FRAMES:10",
            "TRACK:2 TYPE:AUDIO SUBTYPE:NONE FRAMES:21",
        ]);
        let tracks = scan_tracks(&mut source);

        let mut out = Vec::new();
        write_track_table(&mut out, &tracks).unwrap();
        let table = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TRACK"));
        let row: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(row[0], "2");
        assert_eq!(row[1], "AUDIO");
        assert_eq!(row[2], "21");
        // 10 frames + 2 pad
        assert_eq!(row.last(), Some(&"12"));
    }

    #[test]
    fn test_extract_copies_track() {
        let source = Records(vec!["TRACK:1 TYPE:MODE1_RAW SUBTYPE:NONE FRAMES:10"]);
        let mut stream = ChdStream::with_source(source, TrackSelector::Number(1)).unwrap();

        let mut out = Vec::new();
        assert_eq!(stream.copy_to(&mut out, 4096).unwrap(), 10 * 2352);
        assert_eq!(out.len(), 10 * 2352);
    }

    #[test]
    fn test_cli_parses_selectors() {
        let cli = Cli::try_parse_from(["chdtrack", "extract", "disc.chd", "out.bin", "-t", "last"])
            .unwrap();
        match cli.command {
            Command::Extract { track, .. } => assert_eq!(track, Some(TrackSelector::Last)),
            _ => panic!("expected extract"),
        }

        let cli = Cli::try_parse_from(["chdtrack", "info", "disc.chd"]).unwrap();
        assert!(matches!(cli.command, Command::Info { track: None, .. }));

        assert!(Cli::try_parse_from(["chdtrack", "info", "disc.chd", "--track", "0"]).is_err());
    }
}
