//! Directory parsing and listing.
//!
//! The directory chain starts at track 18, sector 1. Each block holds up
//! to eight 32-byte entries; the first two bytes of a block point to the
//! next block in the chain (next track 0 terminates it).

use std::collections::HashSet;

use super::bam::Bam;
use super::petscii::{petscii_to_ascii, strip_padding};
use super::{D64Error, DIR_TRACK, SECTOR_SIZE, sector_bytes};

/// CBM DOS file types, from the low three bits of the type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
  Del,
  Seq,
  Prg,
  Usr,
  Rel,
  Cbm,
  Dir,
  Unknown,
}

impl FileType {
  pub fn from_bits(bits: u8) -> Self {
    match bits & 0x07 {
      0 => FileType::Del,
      1 => FileType::Seq,
      2 => FileType::Prg,
      3 => FileType::Usr,
      4 => FileType::Rel,
      5 => FileType::Cbm,
      6 => FileType::Dir,
      _ => FileType::Unknown,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      FileType::Del => "DEL",
      FileType::Seq => "SEQ",
      FileType::Prg => "PRG",
      FileType::Usr => "USR",
      FileType::Rel => "REL",
      FileType::Cbm => "CBM",
      FileType::Dir => "DIR",
      FileType::Unknown => "???",
    }
  }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
  pub file_type: FileType,
  /// Write-protected ("<" in a listing).
  pub locked: bool,
  /// Properly closed; open files show as "*" (splat) entries.
  pub closed: bool,
  /// First track/sector of the file's block chain.
  pub track: u8,
  pub sector: u8,
  pub name: String,
  /// Size in blocks.
  pub blocks: u16,
}

#[derive(Debug, Clone)]
pub struct Directory {
  pub bam: Bam,
  pub entries: Vec<FileEntry>,
}

impl Directory {
  /// Parse the BAM sector followed by the raw directory blocks.
  pub fn parse(blocks: &[u8]) -> Result<Self, D64Error> {
    let bam = Bam::new(blocks)?;
    let dir = &blocks[SECTOR_SIZE.min(blocks.len())..];

    let mut entries = Vec::new();
    for chunk in dir.chunks_exact(0x20) {
      // Type byte zero marks an unused slot.
      if chunk[0x02] == 0 {
        continue;
      }
      entries.push(FileEntry {
        file_type: FileType::from_bits(chunk[0x02]),
        locked: chunk[0x02] & 0x40 > 0,
        closed: chunk[0x02] & 0x80 > 0,
        track: chunk[0x03],
        sector: chunk[0x04],
        name: petscii_to_ascii(&strip_padding(&chunk[0x05..0x15])),
        blocks: u16::from_le_bytes([chunk[0x1E], chunk[0x1F]]),
      });
    }

    Ok(Directory { bam, entries })
  }

  /// Walk the directory chain of a loaded D64 image.
  pub fn from_image(image: &[u8]) -> Result<Self, D64Error> {
    let mut blocks = Vec::new();
    blocks.extend_from_slice(sector_bytes(image, DIR_TRACK, 0)?);

    let mut track = DIR_TRACK;
    let mut sector = 1u8;
    let mut visited = HashSet::new();
    loop {
      if !visited.insert((track, sector)) {
        return Err(D64Error::ChainLoop { track, sector });
      }
      let block = sector_bytes(image, track, sector)?;
      blocks.extend_from_slice(block);
      if block[0] == 0 {
        break;
      }
      track = block[0];
      sector = block[1];
    }

    Self::parse(&blocks)
  }

  /// Render the listing the way a 1541 shows it.
  pub fn listing(&self) -> Vec<String> {
    let mut lines = vec![self.bam.header()];
    for entry in &self.entries {
      let quoted = format!("\"{}\"", entry.name).to_uppercase();
      lines.push(format!(
        "{:<5}{:<18}{}{}{}",
        entry.blocks,
        quoted,
        if entry.closed { " " } else { "*" },
        entry.file_type.as_str(),
        if entry.locked { "<" } else { "" },
      ));
    }
    lines.push(format!("{} BLOCKS FREE.", self.bam.blocks_free()));
    lines
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::d64::bam::sample_bam;
  use crate::d64::petscii::ascii_to_petscii;

  fn entry(type_byte: u8, name: &str, track: u8, sector: u8, blocks: u16) -> [u8; 0x20] {
    let mut raw = [0u8; 0x20];
    raw[0x02] = type_byte;
    raw[0x03] = track;
    raw[0x04] = sector;
    raw[0x05..0x15].fill(0xA0);
    let pet = ascii_to_petscii(name);
    raw[0x05..0x05 + pet.len()].copy_from_slice(&pet);
    raw[0x1E..0x20].copy_from_slice(&blocks.to_le_bytes());
    raw
  }

  fn dir_block(entries: &[[u8; 0x20]]) -> Vec<u8> {
    let mut block = vec![0u8; SECTOR_SIZE];
    block[1] = 0xFF;
    for (i, e) in entries.iter().enumerate() {
      let base = 0x20 * i;
      block[base..base + 0x20].copy_from_slice(e);
      // Keep the chain pointer of the first row intact.
      if i == 0 {
        block[0] = 0;
        block[1] = 0xFF;
      }
    }
    block
  }

  #[test]
  fn parses_entries_with_flags() {
    let mut blocks = sample_bam();
    blocks.extend(dir_block(&[
      entry(0x82, "HELLO", 17, 0, 5),
      entry(0xC1, "DATA", 16, 3, 12),
      entry(0x02, "BROKEN", 15, 1, 1),
    ]));

    let dir = Directory::parse(&blocks).unwrap();
    assert_eq!(dir.entries.len(), 3);

    let hello = &dir.entries[0];
    assert_eq!(hello.file_type, FileType::Prg);
    assert!(hello.closed);
    assert!(!hello.locked);
    assert_eq!(hello.name, "HELLO");
    assert_eq!((hello.track, hello.sector), (17, 0));
    assert_eq!(hello.blocks, 5);

    let data = &dir.entries[1];
    assert_eq!(data.file_type, FileType::Seq);
    assert!(data.locked);

    let broken = &dir.entries[2];
    assert!(!broken.closed, "unclosed entry must be a splat file");
  }

  #[test]
  fn listing_shows_header_entries_and_free_blocks() {
    let mut blocks = sample_bam();
    blocks.extend(dir_block(&[entry(0x82, "HELLO", 17, 0, 5)]));

    let dir = Directory::parse(&blocks).unwrap();
    let listing = dir.listing();
    assert_eq!(listing.first().unwrap(), "0    \"TESTDISK\"          23 2A");
    assert!(listing[1].starts_with("5    \"HELLO\""));
    assert!(listing[1].contains("PRG"));
    assert_eq!(listing.last().unwrap(), "42 BLOCKS FREE.");
  }

  #[test]
  fn walks_the_chain_across_blocks() {
    let mut image = vec![0u8; 683 * SECTOR_SIZE];
    let bam_offset = crate::d64::file_offset(DIR_TRACK, 0);
    image[bam_offset..bam_offset + SECTOR_SIZE].copy_from_slice(&sample_bam());

    // Sector 1 links to sector 4, which terminates the chain.
    let first = crate::d64::file_offset(DIR_TRACK, 1);
    let block = dir_block(&[entry(0x82, "ONE", 17, 0, 2)]);
    image[first..first + SECTOR_SIZE].copy_from_slice(&block);
    image[first] = DIR_TRACK;
    image[first + 1] = 4;

    let second = crate::d64::file_offset(DIR_TRACK, 4);
    let block = dir_block(&[entry(0x81, "TWO", 16, 0, 3)]);
    image[second..second + SECTOR_SIZE].copy_from_slice(&block);

    let dir = Directory::from_image(&image).unwrap();
    assert_eq!(dir.entries.len(), 2);
    assert_eq!(dir.entries[0].name, "ONE");
    assert_eq!(dir.entries[1].name, "TWO");
  }

  #[test]
  fn chain_loop_is_detected() {
    let mut image = vec![0u8; 683 * SECTOR_SIZE];
    let bam_offset = crate::d64::file_offset(DIR_TRACK, 0);
    image[bam_offset..bam_offset + SECTOR_SIZE].copy_from_slice(&sample_bam());

    let first = crate::d64::file_offset(DIR_TRACK, 1);
    image[first] = DIR_TRACK;
    image[first + 1] = 1;

    let result = Directory::from_image(&image);
    assert!(matches!(
      result,
      Err(D64Error::ChainLoop {
        track: DIR_TRACK,
        sector: 1
      })
    ));
  }
}
