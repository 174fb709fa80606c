//! Memory usage derived from the size tool's berkeley output.
//!
//! `avr-size -d` prints a header line followed by one row of decimal
//! section sizes per object:
//!
//! ```text
//!    text    data     bss     dec     hex filename
//!    4242      86     118    4446    115e dumpmaster64.elf
//! ```
//!
//! Flash usage is the sum of the code and initialized-data sections;
//! RAM usage is the sum of the initialized-data and bss sections.

use serde::Serialize;

use super::ToolchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
  /// text + data, in bytes.
  pub flash: u64,
  /// data + bss, in bytes.
  pub ram: u64,
}

/// Parse berkeley-format size output, summing rows if there are several.
pub fn parse_berkeley(output: &str) -> Result<MemoryUsage, ToolchainError> {
  let mut text: u64 = 0;
  let mut data: u64 = 0;
  let mut bss: u64 = 0;
  let mut rows = 0;

  for line in output.lines() {
    let mut columns = line.split_whitespace();
    let first = match columns.next() {
      Some(first) => first,
      None => continue,
    };
    // Header and blank lines have no leading number.
    let row_text: u64 = match first.parse() {
      Ok(value) => value,
      Err(_) => continue,
    };
    let row_data: u64 = columns
      .next()
      .and_then(|c| c.parse().ok())
      .ok_or_else(|| ToolchainError::SizeReport(line.to_string()))?;
    let row_bss: u64 = columns
      .next()
      .and_then(|c| c.parse().ok())
      .ok_or_else(|| ToolchainError::SizeReport(line.to_string()))?;
    text += row_text;
    data += row_data;
    bss += row_bss;
    rows += 1;
  }

  if rows == 0 {
    return Err(ToolchainError::SizeReport(output.to_string()));
  }

  Ok(MemoryUsage {
    flash: text + data,
    ram: data + bss,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sums_sections_per_formula() {
    let output = "   text\t   data\t    bss\t    dec\t    hex\tfilename\n\
                  \x20   100\t     20\t     10\t    130\t     82\tdumpmaster64.elf\n";
    let usage = parse_berkeley(output).unwrap();
    assert_eq!(usage.flash, 120);
    assert_eq!(usage.ram, 30);
  }

  #[test]
  fn sums_multiple_rows() {
    let output = "   text    data     bss     dec     hex filename\n\
                  100 20 10 130 82 a.o\n\
                  50 5 1 56 38 b.o\n";
    let usage = parse_berkeley(output).unwrap();
    assert_eq!(usage.flash, 175);
    assert_eq!(usage.ram, 36);
  }

  #[test]
  fn header_only_output_is_an_error() {
    let output = "   text    data     bss     dec     hex filename\n";
    assert!(matches!(
      parse_berkeley(output),
      Err(ToolchainError::SizeReport(_))
    ));
  }

  #[test]
  fn short_row_is_an_error() {
    let output = "100 20\n";
    assert!(matches!(
      parse_berkeley(output),
      Err(ToolchainError::SizeReport(_))
    ));
  }
}
