use crate::mac::Mac;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Runtime configuration: which exporters to run, where to put their output,
/// and which decryption keys we hold.
///
/// Any problem here is fatal at startup.
#[derive(Debug)]
pub struct Config {
    pub output_path: PathBuf,
    pub outputs: Outputs,
    pub wep_keys: Vec<WepKey>,
    pub wpa_keys: Vec<WpaKey>,
    wep_index: HashSet<Mac>,
    wpa_index: HashSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Outputs {
    #[serde(default)]
    pub pcap: bool,
    #[serde(default)]
    pub wigle: bool,
    #[serde(default)]
    pub kml: bool,
    #[serde(default)]
    pub client_csv: bool,
    #[serde(default)]
    pub probe_csv: bool,
    #[serde(default)]
    pub ap_clients_csv: bool,
}

/// A WEP key, already hex-decoded, addressed by BSSID.
#[derive(Debug, Clone)]
pub struct WepKey {
    pub bssid: Mac,
    pub key: Vec<u8>,
}

/// A WPA passphrase, addressed by SSID.
#[derive(Debug, Clone)]
pub struct WpaKey {
    pub ssid: String,
    pub passphrase: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("malformed bssid in key entry: {0}")]
    BadBssid(String),
    #[error("non-hex value in decrypt key: {0:?}")]
    BadHex(char),
    #[error("hex keys must have both nibbles")]
    OddHex,
    #[error("the WEP key must be 5, 13, or 16 bytes long, got {0}")]
    BadWepKeyLength(usize),
    #[error("failed to create the output path {}: {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("the output path is not a directory: {}", .0.display())]
    OutputNotDirectory(PathBuf),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_output_path")]
    output_path: PathBuf,
    #[serde(default)]
    outputs: Outputs,
    #[serde(default)]
    keys: Vec<RawKey>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawKey {
    Wep { bssid: String, key: String },
    Wpa { ssid: String, passphrase: String },
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let mut wep_keys = Vec::new();
        let mut wpa_keys = Vec::new();
        for key in raw.keys {
            match key {
                RawKey::Wep { bssid, key } => {
                    let bssid: Mac = bssid
                        .parse()
                        .map_err(|_| ConfigError::BadBssid(bssid.clone()))?;
                    let key = decode_hex(&key)?;
                    if !matches!(key.len(), 5 | 13 | 16) {
                        return Err(ConfigError::BadWepKeyLength(key.len()));
                    }
                    wep_keys.push(WepKey { bssid, key });
                }
                RawKey::Wpa { ssid, passphrase } => {
                    wpa_keys.push(WpaKey { ssid, passphrase });
                }
            }
        }

        if !raw.output_path.exists() {
            fs::create_dir_all(&raw.output_path).map_err(|source| ConfigError::CreateOutput {
                path: raw.output_path.clone(),
                source,
            })?;
        }
        if !raw.output_path.is_dir() {
            return Err(ConfigError::OutputNotDirectory(raw.output_path));
        }

        let wep_index = wep_keys.iter().map(|k| k.bssid).collect();
        let wpa_index = wpa_keys.iter().map(|k| k.ssid.clone()).collect();
        Ok(Config {
            output_path: raw.output_path,
            outputs: raw.outputs,
            wep_keys,
            wpa_keys,
            wep_index,
            wpa_index,
        })
    }

    /// A configuration with nothing enabled, for embedding and tests.
    pub fn empty() -> Config {
        Config {
            output_path: PathBuf::from("."),
            outputs: Outputs::default(),
            wep_keys: Vec::new(),
            wpa_keys: Vec::new(),
            wep_index: HashSet::new(),
            wpa_index: HashSet::new(),
        }
    }

    pub fn has_wep_key(&self, bssid: Mac) -> bool {
        self.wep_index.contains(&bssid)
    }

    pub fn has_wpa_key(&self, ssid: &str) -> bool {
        self.wpa_index.contains(ssid)
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ConfigError> {
    if s.len() % 2 != 0 {
        return Err(ConfigError::OddHex);
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = hex_nibble(pair[0])?;
        let lo = hex_nibble(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_nibble(b: u8) -> Result<u8, ConfigError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        other => Err(ConfigError::BadHex(other as char)),
    }
}
