//! Block Availability Map of a 1541 disk.
//!
//! The BAM lives in track 18, sector 0. Each track owns four bytes: a free
//! count followed by three bitmap bytes, one bit per sector (set = free).
//! Offsets 0x90.. hold the disk name, ID and DOS type.

use super::petscii::{petscii_to_ascii, strip_padding};
use super::{D64Error, SECTOR_SIZE, sectors_in_track};

#[derive(Debug, Clone)]
pub struct Bam {
  data: [u8; SECTOR_SIZE],
}

impl Bam {
  /// Wrap a BAM sector. Accepts any buffer of at least one block.
  pub fn new(sector: &[u8]) -> Result<Self, D64Error> {
    if sector.len() < SECTOR_SIZE {
      return Err(D64Error::Truncated {
        size: sector.len(),
        needed: SECTOR_SIZE,
      });
    }
    let mut data = [0u8; SECTOR_SIZE];
    data.copy_from_slice(&sector[..SECTOR_SIZE]);
    Ok(Bam { data })
  }

  pub fn disk_name(&self) -> String {
    petscii_to_ascii(&strip_padding(&self.data[0x90..0xA0]))
  }

  pub fn disk_id(&self) -> String {
    petscii_to_ascii(&self.data[0xA2..0xA4])
  }

  pub fn dos_type(&self) -> String {
    petscii_to_ascii(&self.data[0xA5..0xA7])
  }

  /// Header line as a directory listing shows it.
  pub fn header(&self) -> String {
    let mut header = String::from("0    \"");
    header.push_str(&format!("{:<19}", format!("{}\"", self.disk_name())));
    header.push_str(&format!("{:<3}", self.disk_id()));
    header.push_str(&self.dos_type());
    header.to_uppercase()
  }

  /// Free blocks as shown in a directory listing (track 18 excluded).
  pub fn blocks_free(&self) -> u32 {
    (0x04..0x90)
      .step_by(4)
      .filter(|&x| x != 0x48)
      .map(|x| self.data[x] as u32)
      .sum()
  }

  /// Total number of allocated sectors on the disk.
  pub fn allocated(&self) -> u32 {
    (0x04..0x90)
      .step_by(4)
      .map(|x| {
        let track = (x / 4) as u8;
        (sectors_in_track(track) as u32).saturating_sub(self.data[x] as u32)
      })
      .sum()
  }

  fn bit_position(track: u8, sector: u8) -> (usize, u8) {
    let byte = 4 * track as usize + 1 + (sector / 8) as usize;
    (byte, 1 << (sector % 8))
  }

  /// Whether a block is free (not allocated).
  pub fn block_is_free(&self, track: u8, sector: u8) -> bool {
    let (byte, mask) = Self::bit_position(track, sector);
    self.data[byte] & mask > 0
  }

  /// Mark a block allocated.
  pub fn allocate(&mut self, track: u8, sector: u8) {
    let (byte, mask) = Self::bit_position(track, sector);
    self.data[byte] &= !mask;
  }

  /// Mark a block free.
  pub fn deallocate(&mut self, track: u8, sector: u8) {
    let (byte, mask) = Self::bit_position(track, sector);
    self.data[byte] |= mask;
  }
}

/// A synthetic BAM for tests: name TESTDISK, id 23, DOS 2A, tracks 1 and 2
/// fully free, everything else allocated.
#[cfg(test)]
pub(crate) fn sample_bam() -> Vec<u8> {
  use super::petscii::ascii_to_petscii;

  let mut data = vec![0u8; SECTOR_SIZE];
  data[0] = 18;
  data[1] = 1;
  data[2] = 0x41;
  for track in [1usize, 2] {
    data[4 * track] = 21;
    data[4 * track + 1] = 0xFF;
    data[4 * track + 2] = 0xFF;
    data[4 * track + 3] = 0x1F;
  }
  data[0x90..0xA0].fill(0xA0);
  let name = ascii_to_petscii("TESTDISK");
  data[0x90..0x90 + name.len()].copy_from_slice(&name);
  data[0xA2] = b'2';
  data[0xA3] = b'3';
  data[0xA5] = b'2';
  data[0xA6] = 0xC1; // shifted A
  data
}
