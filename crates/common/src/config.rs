//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Voting engine configuration.
    #[serde(default)]
    pub voting: VotingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// What happens to a user's votes when the account is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorDeletionPolicy {
    /// Keep the votes counting but drop the author reference.
    #[default]
    Anonymize,
    /// Retract every vote (with compensation) before the account goes away.
    Retract,
}

/// Accepted impact range for one votable entity type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImpactRangeConfig {
    /// Smallest accepted impact (inclusive).
    pub min: i32,
    /// Largest accepted impact (inclusive).
    pub max: i32,
    /// Whether an impact of zero is accepted.
    #[serde(default)]
    pub allow_zero: bool,
    /// Message returned when an impact is rejected.
    #[serde(default)]
    pub message: Option<String>,
}

impl ImpactRangeConfig {
    /// Whether `impact` falls inside this range.
    #[must_use]
    pub const fn accepts(&self, impact: i32) -> bool {
        impact >= self.min && impact <= self.max && (self.allow_zero || impact != 0)
    }

    /// The rejection message, falling back to a description of the range.
    #[must_use]
    pub fn rejection_message(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!("Vote must be between {} and {}", self.min, self.max)
        })
    }
}

/// Voting engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// How many times a replace sequence is retried after a ledger conflict.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Policy applied to votes of deleted accounts.
    #[serde(default)]
    pub author_deletion: AuthorDeletionPolicy,
    /// Accepted impacts for uploads.
    #[serde(default = "default_upload_impact")]
    pub upload_impact: ImpactRangeConfig,
    /// Accepted impacts for comments.
    #[serde(default = "default_comment_impact")]
    pub comment_impact: ImpactRangeConfig,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            conflict_retries: default_conflict_retries(),
            author_deletion: AuthorDeletionPolicy::default(),
            upload_impact: default_upload_impact(),
            comment_impact: default_comment_impact(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_conflict_retries() -> u32 {
    1
}

const fn default_upload_impact() -> ImpactRangeConfig {
    ImpactRangeConfig {
        min: -1,
        max: 1,
        allow_zero: false,
        message: None,
    }
}

fn default_comment_impact() -> ImpactRangeConfig {
    ImpactRangeConfig {
        min: -1,
        max: 1,
        allow_zero: false,
        message: Some("Vote must be +/- 1".to_string()),
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, only to populate the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SHAREHUB_ENV`)
    /// 4. Environment variables with `SHAREHUB_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("SHAREHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SHAREHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SHAREHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_voting_defaults_when_section_missing() {
        let config = from_toml(
            r#"
            [server]
            url = "https://example.com"

            [database]
            url = "postgres://localhost/sharehub"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.voting.conflict_retries, 1);
        assert_eq!(config.voting.author_deletion, AuthorDeletionPolicy::Anonymize);
        assert!(config.voting.comment_impact.accepts(1));
        assert!(!config.voting.comment_impact.accepts(0));
        assert!(!config.voting.comment_impact.accepts(2));
    }

    #[test]
    fn test_voting_section_overrides() {
        let config = from_toml(
            r#"
            [server]
            url = "https://example.com"

            [database]
            url = "postgres://localhost/sharehub"

            [voting]
            conflict_retries = 3
            author_deletion = "retract"

            [voting.upload_impact]
            min = -5
            max = 5
            allow_zero = true
            "#,
        );

        assert_eq!(config.voting.conflict_retries, 3);
        assert_eq!(config.voting.author_deletion, AuthorDeletionPolicy::Retract);
        assert!(config.voting.upload_impact.accepts(0));
        assert!(config.voting.upload_impact.accepts(-5));
        assert!(!config.voting.upload_impact.accepts(6));
        assert_eq!(
            config.voting.comment_impact.rejection_message(),
            "Vote must be +/- 1"
        );
    }

    #[test]
    fn test_rejection_message_falls_back_to_range() {
        let range = ImpactRangeConfig {
            min: -2,
            max: 3,
            allow_zero: false,
            message: None,
        };
        assert_eq!(range.rejection_message(), "Vote must be between -2 and 3");
    }
}
