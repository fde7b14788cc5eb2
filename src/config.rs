//! Process configuration.
//!
//! Values come from `ShieldConfig::default()`, a JSON document, or `QSHIELD_*`
//! environment variables layered over the defaults.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::crypto::encryption::CipherSuite;

/// Room used when a caller does not name one.
pub const DEFAULT_ROOM: &str = "default";
/// Raw qubit count used when a caller does not give one.
pub const DEFAULT_QUBITS: usize = 512;
/// Upper bound on raw qubits per provisioning request.
pub const DEFAULT_MAX_QUBITS: usize = 1 << 20;

pub const ENV_DEFAULT_ROOM: &str = "QSHIELD_DEFAULT_ROOM";
pub const ENV_DEFAULT_QUBITS: &str = "QSHIELD_DEFAULT_QUBITS";
pub const ENV_PQC_MODE: &str = "QSHIELD_PQC_MODE";
pub const ENV_CIPHER: &str = "QSHIELD_CIPHER";
pub const ENV_MAX_QUBITS: &str = "QSHIELD_MAX_QUBITS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Requested PQC backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PqcMode {
    /// Whatever the startup probe finds
    #[default]
    Auto,
    /// ML-KEM, or fail at startup
    Real,
    /// Always simulate
    Simulated,
}

impl PqcMode {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AUTO" => Some(PqcMode::Auto),
            "REAL" => Some(PqcMode::Real),
            "SIMULATED" => Some(PqcMode::Simulated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    pub default_room: String,
    pub default_qubits: usize,
    pub max_qubits: usize,
    pub pqc_mode: PqcMode,
    pub cipher_suite: CipherSuite,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM.to_string(),
            default_qubits: DEFAULT_QUBITS,
            max_qubits: DEFAULT_MAX_QUBITS,
            pqc_mode: PqcMode::Auto,
            cipher_suite: CipherSuite::Aes256Gcm,
        }
    }
}

impl ShieldConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by any `QSHIELD_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(room) = lookup(ENV_DEFAULT_ROOM) {
            config.default_room = room;
        }
        if let Some(value) = lookup(ENV_DEFAULT_QUBITS) {
            config.default_qubits = parse_usize(ENV_DEFAULT_QUBITS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_QUBITS) {
            config.max_qubits = parse_usize(ENV_MAX_QUBITS, &value)?;
        }
        if let Some(value) = lookup(ENV_PQC_MODE) {
            config.pqc_mode =
                PqcMode::from_string(&value).ok_or_else(|| invalid(ENV_PQC_MODE, &value))?;
        }
        if let Some(value) = lookup(ENV_CIPHER) {
            config.cipher_suite =
                CipherSuite::from_name(&value).ok_or_else(|| invalid(ENV_CIPHER, &value))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// The default qubit count must itself be within `max_qubits`.
    pub fn validate(&self) -> Result<()> {
        if self.default_qubits > self.max_qubits {
            return Err(ConfigError::InvalidValue {
                key: "default_qubits".to_string(),
                value: format!("{} (max_qubits {})", self.default_qubits, self.max_qubits),
            });
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ShieldConfig::default();
        assert_eq!(config.default_room, "default");
        assert_eq!(config.default_qubits, 512);
        assert_eq!(config.pqc_mode, PqcMode::Auto);
        assert_eq!(config.cipher_suite, CipherSuite::Aes256Gcm);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            ShieldConfig::from_json(r#"{"default_qubits": 1024, "pqc_mode": "simulated"}"#)
                .unwrap();
        assert_eq!(config.default_qubits, 1024);
        assert_eq!(config.pqc_mode, PqcMode::Simulated);
        assert_eq!(config.default_room, DEFAULT_ROOM);
    }

    #[test]
    fn test_from_json_cipher_suite() {
        let config = ShieldConfig::from_json(r#"{"cipher_suite": "chacha20-poly1305"}"#).unwrap();
        assert_eq!(config.cipher_suite, CipherSuite::ChaCha20Poly1305);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            ShieldConfig::from_json(r#"{"pqc_mode": "quantum"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = ShieldConfig::from_lookup(lookup_from(&[
            (ENV_DEFAULT_ROOM, "lobby"),
            (ENV_DEFAULT_QUBITS, "2048"),
            (ENV_PQC_MODE, "simulated"),
            (ENV_CIPHER, "chacha"),
        ]))
        .unwrap();

        assert_eq!(config.default_room, "lobby");
        assert_eq!(config.default_qubits, 2048);
        assert_eq!(config.pqc_mode, PqcMode::Simulated);
        assert_eq!(config.cipher_suite, CipherSuite::ChaCha20Poly1305);
        assert_eq!(config.max_qubits, DEFAULT_MAX_QUBITS);
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let result = ShieldConfig::from_lookup(lookup_from(&[(ENV_DEFAULT_QUBITS, "many")]));
        match result {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, ENV_DEFAULT_QUBITS);
                assert_eq!(value, "many");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_default_qubits_above_max_rejected() {
        let result = ShieldConfig::from_lookup(lookup_from(&[(ENV_MAX_QUBITS, "100")]));
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "default_qubits"),
            other => panic!("unexpected result: {:?}", other),
        }

        let result = ShieldConfig::from_json(r#"{"default_qubits": 4096, "max_qubits": 1024}"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let config = ShieldConfig::from_lookup(lookup_from(&[
            (ENV_MAX_QUBITS, "100"),
            (ENV_DEFAULT_QUBITS, "100"),
        ]))
        .unwrap();
        assert_eq!(config.default_qubits, 100);
    }

    #[test]
    fn test_pqc_mode_from_string() {
        assert_eq!(PqcMode::from_string("real"), Some(PqcMode::Real));
        assert_eq!(PqcMode::from_string("AUTO"), Some(PqcMode::Auto));
        assert_eq!(PqcMode::from_string("other"), None);
    }
}
