//! Helpers for 1541 disk images (D64).
//!
//! Track/sector geometry, PETSCII conversion, BAM accessors and directory
//! parsing for locally stored `.d64` files.

pub mod bam;
pub mod dir;
pub mod petscii;

pub use bam::Bam;
pub use dir::{Directory, FileEntry, FileType};

use thiserror::Error;

/// Bytes per disk block.
pub const SECTOR_SIZE: usize = 256;

/// Track holding the BAM and the directory chain.
pub const DIR_TRACK: u8 = 18;

#[derive(Debug, Error)]
pub enum D64Error {
  #[error("image too small: {size} bytes, need at least {needed}")]
  Truncated { size: usize, needed: usize },

  #[error("invalid track {0}")]
  InvalidTrack(u8),

  #[error("invalid sector {sector} on track {track}")]
  InvalidSector { track: u8, sector: u8 },

  #[error("directory chain loops back to track {track}, sector {sector}")]
  ChainLoop { track: u8, sector: u8 },
}

/// Number of sectors on a track. Zero for tracks outside 1..=40.
pub fn sectors_in_track(track: u8) -> u8 {
  match track {
    0 => 0,
    1..=17 => 21,
    18..=24 => 19,
    25..=30 => 18,
    31..=40 => 17,
    _ => 0,
  }
}

/// Absolute sector number counted from track 1, sector 0.
pub fn sector_number(track: u8, sector: u8) -> usize {
  (1..track).map(|t| sectors_in_track(t) as usize).sum::<usize>() + sector as usize
}

/// Byte offset of a track/sector in a D64 file.
pub fn file_offset(track: u8, sector: u8) -> usize {
  SECTOR_SIZE * sector_number(track, sector)
}

/// Borrow one 256-byte block out of a loaded image.
pub fn sector_bytes(image: &[u8], track: u8, sector: u8) -> Result<&[u8], D64Error> {
  if sectors_in_track(track) == 0 {
    return Err(D64Error::InvalidTrack(track));
  }
  if sector >= sectors_in_track(track) {
    return Err(D64Error::InvalidSector { track, sector });
  }
  let offset = file_offset(track, sector);
  let end = offset + SECTOR_SIZE;
  if image.len() < end {
    return Err(D64Error::Truncated {
      size: image.len(),
      needed: end,
    });
  }
  Ok(&image[offset..end])
}
