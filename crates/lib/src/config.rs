//! Build configuration.
//!
//! A `BuildConfig` is resolved once per invocation and passed by reference
//! into every operation; nothing reads ambient globals after resolution.
//! Resolution layers, lowest to highest precedence: embedded defaults,
//! an optional `tinyforge.toml` project file, `TINYFORGE_*` environment
//! variables, command-line overrides.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Project file looked up in the working directory when no explicit
/// path is given.
pub const CONFIG_FILE: &str = "tinyforge.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "TINYFORGE_";

/// Fuse byte indices present on tinyAVR 0/1-series devices.
/// Index 3 is reserved and has no fuse.
pub const FUSE_INDICES: [u8; 8] = [0, 1, 2, 4, 5, 6, 7, 8];

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid fuse index {0} (valid indices: 0, 1, 2, 4, 5, 6, 7, 8)")]
  FuseIndex(u8),

  #[error("invalid fuse override {0:?} (expected index:value, e.g. 5:0xC5)")]
  FuseSyntax(String),

  #[error("invalid byte value {0:?}")]
  ByteValue(String),

  #[error("invalid value in ${var}: {value:?}")]
  EnvValue { var: String, value: String },
}

/// The eight fuse bytes of a tinyAVR device, keyed by hardware index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseMap {
  values: [u8; 8],
}

impl Default for FuseMap {
  /// DumpMaster64 fuse set: 20 MHz oscillator, UPDI pin left as UPDI,
  /// 8 ms startup time, no bootloader section.
  fn default() -> Self {
    FuseMap {
      values: [0x00, 0x00, 0x02, 0x00, 0xC5, 0x04, 0x00, 0x00],
    }
  }
}

impl FuseMap {
  fn slot(index: u8) -> Option<usize> {
    FUSE_INDICES.iter().position(|&i| i == index)
  }

  /// Value of the fuse at a hardware index, if the index exists.
  pub fn get(&self, index: u8) -> Option<u8> {
    Self::slot(index).map(|s| self.values[s])
  }

  pub fn set(&mut self, index: u8, value: u8) -> Result<(), ConfigError> {
    let slot = Self::slot(index).ok_or(ConfigError::FuseIndex(index))?;
    self.values[slot] = value;
    Ok(())
  }

  /// Iterate `(index, value)` pairs in hardware order.
  pub fn pairs(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
    FUSE_INDICES.iter().zip(self.values.iter()).map(|(&i, &v)| (i, v))
  }

  /// Render as the programmer's `index:0xVV` arguments.
  pub fn to_args(&self) -> Vec<String> {
    self.pairs().map(|(i, v)| format!("{}:0x{:02X}", i, v)).collect()
  }

  /// Parse a single `index:value` pair, e.g. `5:0xC5`.
  pub fn parse_pair(input: &str) -> Result<(u8, u8), ConfigError> {
    let (index, value) = input
      .split_once(':')
      .ok_or_else(|| ConfigError::FuseSyntax(input.to_string()))?;
    let index = index
      .trim()
      .parse::<u8>()
      .map_err(|_| ConfigError::FuseSyntax(input.to_string()))?;
    let value = parse_byte(value)?;
    if FuseMap::slot(index).is_none() {
      return Err(ConfigError::FuseIndex(index));
    }
    Ok((index, value))
  }

  /// Apply a comma-separated list of `index:value` pairs.
  pub fn apply_pairs(&mut self, input: &str) -> Result<(), ConfigError> {
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
      let (index, value) = Self::parse_pair(part)?;
      self.set(index, value)?;
    }
    Ok(())
  }
}

impl fmt::Display for FuseMap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_args().join(" "))
  }
}

impl Serialize for FuseMap {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(FUSE_INDICES.len()))?;
    for (index, value) in self.pairs() {
      map.serialize_entry(&index.to_string(), &format!("0x{:02X}", value))?;
    }
    map.end()
  }
}

/// Parse a byte from decimal or `0x` hex notation.
pub fn parse_byte(input: &str) -> Result<u8, ConfigError> {
  let trimmed = input.trim();
  let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
    Some(hex) => u8::from_str_radix(hex, 16),
    None => trimmed.parse::<u8>(),
  };
  parsed.map_err(|_| ConfigError::ByteValue(input.to_string()))
}

/// Settings for the external UPDI programmer script.
#[derive(Debug, Clone, Serialize)]
pub struct ProgrammerConfig {
  /// Interpreter used to run the script.
  pub python: String,
  /// Path to the programmer script.
  pub script: PathBuf,
  /// Serial port of the programmer; the script auto-detects when unset.
  pub port: Option<String>,
}

impl Default for ProgrammerConfig {
  fn default() -> Self {
    ProgrammerConfig {
      python: "python3".to_string(),
      script: PathBuf::from("tools/tinyupdi.py"),
      port: None,
    }
  }
}

/// Immutable per-invocation build configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
  /// Source sketch file handed to the compiler.
  pub source: PathBuf,
  /// Base name of all produced artifacts.
  pub name: String,
  /// Target device identifier, e.g. `attiny814`.
  pub device: String,
  /// Clock frequency in Hz, exported as `F_CPU`.
  pub f_cpu: u32,
  /// Fuse bytes burned by `install` and `fuses`.
  pub fuses: FuseMap,
  /// Toolchain installation root; tools are taken from `$PATH` when unset.
  pub toolchain_root: Option<PathBuf>,
  /// Device family pack directory (compiler specs and headers).
  pub dfp: PathBuf,
  pub programmer: ProgrammerConfig,
  /// Directory where artifacts are produced and cleaned.
  pub out_dir: PathBuf,
}

impl Default for BuildConfig {
  fn default() -> Self {
    BuildConfig {
      source: PathBuf::from("dumpmaster64.ino"),
      name: "dumpmaster64".to_string(),
      device: "attiny814".to_string(),
      f_cpu: 20_000_000,
      fuses: FuseMap::default(),
      toolchain_root: None,
      dfp: PathBuf::from("tools/dfp"),
      programmer: ProgrammerConfig::default(),
      out_dir: PathBuf::from("."),
    }
  }
}

/// Command-line overrides, applied last during resolution.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub source: Option<PathBuf>,
  pub name: Option<String>,
  pub device: Option<String>,
  pub f_cpu: Option<u32>,
  /// `index:value` pairs.
  pub fuses: Vec<String>,
  pub toolchain_root: Option<PathBuf>,
  pub dfp: Option<PathBuf>,
  pub port: Option<String>,
  pub updi_script: Option<PathBuf>,
  pub updi_python: Option<String>,
}

/// Raw shape of `tinyforge.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  source: Option<PathBuf>,
  name: Option<String>,
  device: Option<String>,
  f_cpu: Option<u32>,
  /// Fuse table keyed by index, values in decimal or `0x` hex.
  fuses: Option<BTreeMap<String, String>>,
  toolchain_root: Option<PathBuf>,
  dfp: Option<PathBuf>,
  out_dir: Option<PathBuf>,
  #[serde(default)]
  programmer: ProgrammerFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgrammerFile {
  python: Option<String>,
  script: Option<PathBuf>,
  port: Option<String>,
}

impl BuildConfig {
  /// Resolve the effective configuration.
  ///
  /// `file` forces a specific project file; otherwise `tinyforge.toml` in
  /// the working directory is used when present.
  pub fn resolve(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
    let mut config = BuildConfig::default();

    match file {
      Some(path) => config.apply_file(path)?,
      None => {
        let default_path = Path::new(CONFIG_FILE);
        if default_path.exists() {
          config.apply_file(default_path)?;
        }
      }
    }

    config.apply_env()?;
    config.apply_overrides(overrides)?;
    Ok(config)
  }

  /// Source path canonicalized for display, falling back to the raw path.
  pub fn canonical_source(&self) -> PathBuf {
    dunce::canonicalize(&self.source).unwrap_or_else(|_| self.source.clone())
  }

  fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    if let Some(source) = file.source {
      self.source = source;
    }
    if let Some(name) = file.name {
      self.name = name;
    }
    if let Some(device) = file.device {
      self.device = device;
    }
    if let Some(f_cpu) = file.f_cpu {
      self.f_cpu = f_cpu;
    }
    if let Some(fuses) = file.fuses {
      for (index, value) in fuses {
        let index = index.parse::<u8>().map_err(|_| ConfigError::FuseSyntax(index.clone()))?;
        self.fuses.set(index, parse_byte(&value)?)?;
      }
    }
    if let Some(root) = file.toolchain_root {
      self.toolchain_root = Some(root);
    }
    if let Some(dfp) = file.dfp {
      self.dfp = dfp;
    }
    if let Some(out_dir) = file.out_dir {
      self.out_dir = out_dir;
    }
    if let Some(python) = file.programmer.python {
      self.programmer.python = python;
    }
    if let Some(script) = file.programmer.script {
      self.programmer.script = script;
    }
    if let Some(port) = file.programmer.port {
      self.programmer.port = Some(port);
    }
    Ok(())
  }

  fn apply_env(&mut self) -> Result<(), ConfigError> {
    if let Some(source) = env_var("SOURCE") {
      self.source = PathBuf::from(source);
    }
    if let Some(name) = env_var("NAME") {
      self.name = name;
    }
    if let Some(device) = env_var("DEVICE") {
      self.device = device;
    }
    if let Some(f_cpu) = env_var("F_CPU") {
      self.f_cpu = f_cpu.parse().map_err(|_| ConfigError::EnvValue {
        var: format!("{}F_CPU", ENV_PREFIX),
        value: f_cpu,
      })?;
    }
    if let Some(fuses) = env_var("FUSES") {
      self.fuses.apply_pairs(&fuses)?;
    }
    if let Some(root) = env_var("TOOLCHAIN_ROOT") {
      self.toolchain_root = Some(PathBuf::from(root));
    }
    if let Some(dfp) = env_var("DFP") {
      self.dfp = PathBuf::from(dfp);
    }
    if let Some(out_dir) = env_var("OUT_DIR") {
      self.out_dir = PathBuf::from(out_dir);
    }
    if let Some(python) = env_var("UPDI_PYTHON") {
      self.programmer.python = python;
    }
    if let Some(script) = env_var("UPDI_SCRIPT") {
      self.programmer.script = PathBuf::from(script);
    }
    if let Some(port) = env_var("PORT") {
      self.programmer.port = Some(port);
    }
    Ok(())
  }

  fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
    if let Some(ref source) = overrides.source {
      self.source = source.clone();
    }
    if let Some(ref name) = overrides.name {
      self.name = name.clone();
    }
    if let Some(ref device) = overrides.device {
      self.device = device.clone();
    }
    if let Some(f_cpu) = overrides.f_cpu {
      self.f_cpu = f_cpu;
    }
    for pair in &overrides.fuses {
      let (index, value) = FuseMap::parse_pair(pair)?;
      self.fuses.set(index, value)?;
    }
    if let Some(ref root) = overrides.toolchain_root {
      self.toolchain_root = Some(root.clone());
    }
    if let Some(ref dfp) = overrides.dfp {
      self.dfp = dfp.clone();
    }
    if let Some(ref port) = overrides.port {
      self.programmer.port = Some(port.clone());
    }
    if let Some(ref script) = overrides.updi_script {
      self.programmer.script = script.clone();
    }
    if let Some(ref python) = overrides.updi_python {
      self.programmer.python = python.clone();
    }
    Ok(())
  }
}

fn env_var(name: &str) -> Option<String> {
  env::var(format!("{}{}", ENV_PREFIX, name)).ok().filter(|v| !v.is_empty())
}
