//! Settings management for the wagerflip engine
//!
//! Settings seed the initial protocol config. They are read from TOML, overridden by
//! `WAGERFLIP_*` environment variables, then validated with the same bounds the
//! admin operations enforce.

use crate::common::types::{Address, TokenType};
use crate::errors::ConfigurationError;
use crate::protocol::{
    TokenLimits, DEFAULT_FEE_BPS, DEFAULT_MAX_GAMES_PER_BATCH, MAX_FEE_BPS, MAX_GAMES_PER_BATCH_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_TREASURY: &str = "0x7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e";

/// Complete engine settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub protocol: ProtocolSettings,
    pub tokens: Vec<TokenSettings>,
    pub logging: LoggingSettings,
}

/// Initial protocol parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    pub fee_bps: u16,
    pub max_games_per_batch: usize,
    /// Hex-encoded treasury address
    pub treasury: String,
    pub paused: bool,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            max_games_per_batch: DEFAULT_MAX_GAMES_PER_BATCH,
            treasury: DEFAULT_TREASURY.to_string(),
            paused: false,
        }
    }
}

/// One whitelisted token at startup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenSettings {
    pub symbol: String,
    pub min_bet: u64,
    pub max_bet: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TokenSettings {
    pub fn token_type(&self) -> TokenType {
        TokenType::new(self.symbol.clone())
    }

    pub fn limits(&self) -> TokenLimits {
        TokenLimits {
            enabled: self.enabled,
            min_bet: self.min_bet,
            max_bet: self.max_bet,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigurationError::InvalidValue {
                field: "logging.level".to_string(),
                value: s.to_string(),
                reason: "expected one of error, warn, info, debug, trace".to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
}

impl EngineSettings {
    /// Settings with a single whitelisted token, used by the simulator and tests
    pub fn with_token(symbol: &str, min_bet: u64, max_bet: u64) -> Self {
        Self {
            tokens: vec![TokenSettings {
                symbol: symbol.to_string(),
                min_bet,
                max_bet,
                enabled: true,
            }],
            ..Default::default()
        }
    }

    pub fn treasury_address(&self) -> Result<Address, ConfigurationError> {
        self.protocol
            .treasury
            .parse()
            .map_err(|e: hex::FromHexError| ConfigurationError::InvalidValue {
                field: "protocol.treasury".to_string(),
                value: self.protocol.treasury.clone(),
                reason: e.to_string(),
            })
    }

    pub fn token_entries(&self) -> Vec<(TokenType, TokenLimits)> {
        self.tokens.iter().map(|t| (t.token_type(), t.limits())).collect()
    }
}

/// Settings loader with environment variable support
#[derive(Debug, Default)]
pub struct SettingsLoader {
    settings_path: Option<PathBuf>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self { settings_path: None }
    }

    /// Set the settings file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load settings from file and process environment
    pub fn load(&self) -> Result<EngineSettings, ConfigurationError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load settings using `lookup` in place of the process environment
    pub fn load_with<F>(&self, lookup: F) -> Result<EngineSettings, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match &self.settings_path {
            Some(path) => Self::load_from_file(path)?,
            None => EngineSettings::default(),
        };

        apply_overrides(&mut settings, lookup)?;
        validate(&settings)?;

        Ok(settings)
    }

    fn load_from_file(path: &Path) -> Result<EngineSettings, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: key.to_string(),
        value,
        reason: reason.to_string(),
    })
}

/// Apply `WAGERFLIP_*` overrides
fn apply_overrides<F>(settings: &mut EngineSettings, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(fee) = lookup("WAGERFLIP_FEE_BPS") {
        settings.protocol.fee_bps = parse_override("WAGERFLIP_FEE_BPS", fee, "Invalid fee in basis points")?;
    }
    if let Some(max) = lookup("WAGERFLIP_MAX_GAMES_PER_BATCH") {
        settings.protocol.max_games_per_batch =
            parse_override("WAGERFLIP_MAX_GAMES_PER_BATCH", max, "Invalid batch size")?;
    }
    if let Some(treasury) = lookup("WAGERFLIP_TREASURY") {
        settings.protocol.treasury = treasury;
    }
    if let Some(paused) = lookup("WAGERFLIP_PAUSED") {
        settings.protocol.paused = parse_override("WAGERFLIP_PAUSED", paused, "Invalid boolean value")?;
    }
    if let Some(level) = lookup("WAGERFLIP_LOG_LEVEL") {
        settings.logging.level = level.parse()?;
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate settings values
fn validate(settings: &EngineSettings) -> Result<(), ConfigurationError> {
    let protocol = &settings.protocol;

    if protocol.fee_bps > MAX_FEE_BPS {
        return Err(invalid("protocol.fee_bps", protocol.fee_bps, "Fee cannot exceed 10000 bps"));
    }

    if protocol.max_games_per_batch == 0 || protocol.max_games_per_batch > MAX_GAMES_PER_BATCH_LIMIT {
        return Err(invalid(
            "protocol.max_games_per_batch",
            protocol.max_games_per_batch,
            "Batch size must be between 1 and 1000",
        ));
    }

    if protocol.treasury.is_empty() {
        return Err(ConfigurationError::MissingRequired("protocol.treasury".to_string()));
    }
    if settings.treasury_address()?.is_zero() {
        return Err(invalid("protocol.treasury", &protocol.treasury, "Treasury cannot be the zero address"));
    }

    let mut seen = HashSet::new();
    for token in &settings.tokens {
        if token.symbol.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("tokens.symbol".to_string()));
        }
        if !seen.insert(token.symbol.as_str()) {
            return Err(invalid("tokens.symbol", &token.symbol, "Duplicate token symbol"));
        }
        if token.min_bet == 0 || token.min_bet > token.max_bet {
            return Err(invalid(
                &format!("tokens.{}", token.symbol),
                format!("{}..={}", token.min_bet, token.max_bet),
                "min_bet must be non-zero and not exceed max_bet",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    const SAMPLE: &str = r#"
[protocol]
fee_bps = 300
max_games_per_batch = 20
treasury = "0x1111111111111111111111111111111111111111111111111111111111111111"

[[tokens]]
symbol = "SUI"
min_bet = 1000
max_bet = 1000000

[[tokens]]
symbol = "USDC"
min_bet = 10
max_bet = 500
enabled = false

[logging]
level = "debug"
"#;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SettingsLoader::new().load_with(no_env).unwrap();
        assert_eq!(settings.protocol.fee_bps, DEFAULT_FEE_BPS);
        assert!(!settings.treasury_address().unwrap().is_zero());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = SettingsLoader::new().with_path(file.path()).load_with(no_env).unwrap();
        assert_eq!(settings.protocol.fee_bps, 300);
        assert_eq!(settings.protocol.max_games_per_batch, 20);
        assert_eq!(settings.tokens.len(), 2);
        assert!(settings.tokens[0].enabled);
        assert!(!settings.tokens[1].enabled);
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("WAGERFLIP_FEE_BPS", "100"),
            ("WAGERFLIP_PAUSED", "true"),
            ("WAGERFLIP_LOG_LEVEL", "WARN"),
        ]
        .into_iter()
        .collect();

        let settings = SettingsLoader::new()
            .load_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.protocol.fee_bps, 100);
        assert!(settings.protocol.paused);
        assert_eq!(settings.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let err = SettingsLoader::new()
            .load_with(|k| (k == "WAGERFLIP_MAX_GAMES_PER_BATCH").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("WAGERFLIP_MAX_GAMES_PER_BATCH"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let fee = SettingsLoader::new().load_with(|k| (k == "WAGERFLIP_FEE_BPS").then(|| "10001".to_string()));
        assert!(fee.is_err());

        let zero_treasury = format!("0x{}", "00".repeat(32));
        let treasury = SettingsLoader::new().load_with(|k| (k == "WAGERFLIP_TREASURY").then(|| zero_treasury.clone()));
        assert!(treasury.is_err());

        let mut settings = EngineSettings::with_token("SUI", 10, 5);
        assert!(validate(&settings).is_err());
        settings.tokens[0].max_bet = 10;
        assert!(validate(&settings).is_ok());
        settings.tokens.push(settings.tokens[0].clone());
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let err = SettingsLoader::new()
            .with_path("/definitely/not/here.toml")
            .load_with(no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::LoadFailed(_)));
    }
}
