use crate::error::ConfigError;
use crate::dnssec::constants::DEFAULT_SIGNATURE_VALIDITY;
use serde::Deserialize;
use std::path::Path;

/// Upper bound accepted for `max_recursion_depth`; a name has at most 127 labels.
const MAX_RECURSION_LIMIT: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Expiration offset for new signatures when the key specifies none
    pub signature_validity_secs: u32,

    /// Seconds subtracted from "now" for the default inception
    pub inception_offset_secs: u32,

    /// Hard cap for data chain, trust tree and parent domain recursion
    pub max_recursion_depth: usize,

    /// Validator refuses NSEC3 records with more iterations than this
    pub max_nsec3_iterations: u16,

    /// Default NSEC3 iterations used when signing
    pub nsec3_iterations: u16,

    /// Default NSEC3 salt, hex encoded ("" or "-" for none)
    pub nsec3_salt: String,

    /// Set the opt-out flag on generated NSEC3 records
    pub nsec3_opt_out: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signature_validity_secs: DEFAULT_SIGNATURE_VALIDITY,
            inception_offset_secs: 0,
            max_recursion_depth: 128,
            max_nsec3_iterations: 2500,
            nsec3_iterations: 0,
            nsec3_salt: String::new(),
            nsec3_opt_out: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from `DNSSEC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(validity) = lookup("DNSSEC_SIGNATURE_VALIDITY") {
            config.signature_validity_secs = validity.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("DNSSEC_SIGNATURE_VALIDITY: {}", validity))
            })?;
        }

        if let Some(offset) = lookup("DNSSEC_INCEPTION_OFFSET") {
            config.inception_offset_secs = offset
                .trim()
                .parse()
                .map_err(|_| ConfigError::Parse(format!("DNSSEC_INCEPTION_OFFSET: {}", offset)))?;
        }

        if let Some(depth) = lookup("DNSSEC_MAX_RECURSION_DEPTH") {
            config.max_recursion_depth = depth
                .trim()
                .parse()
                .map_err(|_| ConfigError::Parse(format!("DNSSEC_MAX_RECURSION_DEPTH: {}", depth)))?;
        }

        if let Some(max) = lookup("DNSSEC_MAX_NSEC3_ITERATIONS") {
            config.max_nsec3_iterations = max.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("DNSSEC_MAX_NSEC3_ITERATIONS: {}", max))
            })?;
        }

        if let Some(iterations) = lookup("DNSSEC_NSEC3_ITERATIONS") {
            config.nsec3_iterations = iterations.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("DNSSEC_NSEC3_ITERATIONS: {}", iterations))
            })?;
        }

        if let Some(salt) = lookup("DNSSEC_NSEC3_SALT") {
            config.nsec3_salt = salt.trim().to_string();
        }

        if let Some(opt_out) = lookup("DNSSEC_NSEC3_OPT_OUT") {
            config.nsec3_opt_out = parse_bool(&opt_out, config.nsec3_opt_out);
        }

        config.validate()?;
        Ok(config)
    }

    /// Decoded NSEC3 salt
    pub fn nsec3_salt_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let salt = self.nsec3_salt.trim();
        if salt.is_empty() || salt == "-" {
            return Ok(Vec::new());
        }
        hex::decode(salt).map_err(|e| ConfigError::Invalid(format!("NSEC3 salt: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signature_validity_secs == 0 {
            return Err(ConfigError::Invalid(
                "Signature validity must be greater than zero".to_string(),
            ));
        }

        if self.max_recursion_depth == 0 || self.max_recursion_depth > MAX_RECURSION_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "Max recursion depth must be between 1 and {}",
                MAX_RECURSION_LIMIT
            )));
        }

        if self.nsec3_iterations > self.max_nsec3_iterations {
            return Err(ConfigError::Invalid(format!(
                "NSEC3 iterations {} exceed the maximum of {}",
                self.nsec3_iterations, self.max_nsec3_iterations
            )));
        }

        let salt = self.nsec3_salt_bytes()?;
        if salt.len() > 255 {
            return Err(ConfigError::Invalid(
                "NSEC3 salt too long (max 255 bytes)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signature_validity_secs, 2_592_000);
    }

    #[test]
    fn test_invalid_recursion_depth() {
        let config = EngineConfig {
            max_recursion_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_recursion_depth: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_salt() {
        let config = EngineConfig {
            nsec3_salt: "zz".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_salt_bytes() {
        let config = EngineConfig {
            nsec3_salt: "AABBCCDD".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.nsec3_salt_bytes().unwrap(),
            vec![0xaa, 0xbb, 0xcc, 0xdd]
        );

        let config = EngineConfig {
            nsec3_salt: "-".to_string(),
            ..Default::default()
        };
        assert!(config.nsec3_salt_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DNSSEC_SIGNATURE_VALIDITY", "3600"),
            ("DNSSEC_NSEC3_ITERATIONS", "10"),
            ("DNSSEC_NSEC3_SALT", "beef"),
            ("DNSSEC_NSEC3_OPT_OUT", "yes"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.signature_validity_secs, 3600);
        assert_eq!(config.nsec3_iterations, 10);
        assert_eq!(config.nsec3_salt, "beef");
        assert!(config.nsec3_opt_out);
        assert_eq!(config.max_recursion_depth, 128);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = EngineConfig::from_lookup(|k| {
            (k == "DNSSEC_MAX_RECURSION_DEPTH").then(|| "deep".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_toml_str() {
        let config = EngineConfig::from_toml_str(
            r#"
            signature_validity_secs = 86400
            nsec3_salt = "01"
            "#,
        )
        .unwrap();
        assert_eq!(config.signature_validity_secs, 86400);
        assert_eq!(config.nsec3_salt_bytes().unwrap(), vec![1]);
        assert_eq!(config.max_nsec3_iterations, 2500);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true", false));
        assert!(parse_bool("TRUE", false));
        assert!(parse_bool("1", false));
        assert!(parse_bool("on", false));

        assert!(!parse_bool("false", true));
        assert!(!parse_bool("0", true));
        assert!(!parse_bool("off", true));

        assert!(parse_bool("invalid", true));
        assert!(!parse_bool("invalid", false));
    }
}
