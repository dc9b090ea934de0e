//! Configuration loading and validation
//!
//! Settings are layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (`config.yaml`, `config.yml` or `config.toml`)
//! 3. `CW_*` environment variables and command line flags
//!
//! The merged settings are validated into a [`Config`].

use crate::cli::CliArgs;
use crate::credentials::RepositoryAuth;
use crate::domain::{ApplicationFilter, VersionConstraint};
use crate::error::ConfigError;
use crate::notification::{EmailSettings, NotificationTarget, DEFAULT_SMTP_PORT};
use crate::orchestrator::{normalize_concurrency, DEFAULT_CONCURRENCY};
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_SOURCE_NAME: &str = "chart-repo";
const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "config.toml"];

/// Settings as written in a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argocd_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argocd_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argocd_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argocd_insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_webhook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_webhook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams_webhook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_smtp_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_smtp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_smtp_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_smtp_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_use_tls: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repository_auth: Vec<RepositoryAuth>,
}

impl FileConfig {
    /// Reads a config file, choosing TOML or YAML by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let parsed = if is_toml {
            toml::from_str(content).map_err(|e| e.to_string())
        } else if content.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Directories searched when no config file is given
    pub fn search_dirs() -> Vec<PathBuf> {
        let mut search = vec![PathBuf::from("."), PathBuf::from("/etc/chartwatch")];
        if let Some(home) = dirs::home_dir() {
            search.push(home.join(".chartwatch"));
        }
        search
    }

    /// Finds the first config file in `dirs`
    pub fn discover(dirs: &[PathBuf]) -> Option<PathBuf> {
        dirs.iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    /// Loads the explicit file, or the first discovered one, or nothing
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::discover(&Self::search_dirs()) {
                Some(path) => path,
                None => {
                    debug!("no config file found, using defaults and environment");
                    return Ok(Self::default());
                }
            },
        };
        debug!(path = %path.display(), "loading config file");
        Self::load(&path)
    }
}

/// Validated configuration
#[derive(Clone)]
pub struct Config {
    pub argocd_url: String,
    pub argocd_username: String,
    pub argocd_password: String,
    pub argocd_insecure: bool,
    pub filter: ApplicationFilter,
    pub source_name: String,
    pub concurrency: usize,
    pub version_constraint: VersionConstraint,
    pub output_format: OutputFormat,
    pub notification: Option<NotificationTarget>,
    pub repository_auth: Vec<RepositoryAuth>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("argocd_url", &self.argocd_url)
            .field("argocd_username", &self.argocd_username)
            .field("argocd_password", &"***")
            .field("argocd_insecure", &self.argocd_insecure)
            .field("filter", &self.filter)
            .field("source_name", &self.source_name)
            .field("concurrency", &self.concurrency)
            .field("version_constraint", &self.version_constraint)
            .field("output_format", &self.output_format)
            .field("notification", &self.notification.as_ref().map(|n| n.channel()))
            .field("repository_auth", &self.repository_auth.len())
            .finish()
    }
}

impl Config {
    /// Loads the config file named by the arguments (or discovered) and merges it
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::resolve(args.config.as_deref())?;
        Self::from_layers(file, args)
    }

    /// Merges file settings under command line/environment settings and validates
    pub fn from_layers(file: FileConfig, args: &CliArgs) -> Result<Self, ConfigError> {
        let channels = ChannelSettings::merge(args, &file);
        let argocd_url = pick(&args.argocd_url, file.argocd_url);
        let argocd_username = pick(&args.argocd_username, file.argocd_username);
        let argocd_password = pick(&args.argocd_password, file.argocd_password);

        let argocd_url = require(argocd_url, "argocd_url")?;
        let argocd_username = require(argocd_username, "argocd_username")?;
        let argocd_password = require(argocd_password, "argocd_password")?;

        let labels = match &args.labels {
            Some(raw) => parse_labels(raw),
            None => file.labels.unwrap_or_default(),
        };
        let filter = ApplicationFilter {
            projects: non_empty_list(pick(&args.projects, file.projects)),
            names: non_empty_list(pick(&args.app_names, file.app_names)),
            labels,
        };

        let version_constraint: VersionConstraint =
            pick(&args.version_constraint, file.version_constraint)
                .unwrap_or_default()
                .parse()?;
        let output_format: OutputFormat = pick(&args.output_format, file.output_format)
            .unwrap_or_default()
            .parse()?;

        let concurrency = pick(&args.concurrency, file.concurrency)
            .map(|n| normalize_concurrency(usize::try_from(n).unwrap_or(0)))
            .unwrap_or(DEFAULT_CONCURRENCY);

        let notification = channels.target()?;

        Ok(Self {
            argocd_url,
            argocd_username,
            argocd_password,
            argocd_insecure: pick(&args.argocd_insecure, file.argocd_insecure).unwrap_or(false),
            filter,
            source_name: pick(&args.source_name, file.source_name)
                .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string()),
            concurrency,
            version_constraint,
            output_format,
            notification,
            repository_auth: file.repository_auth,
        })
    }
}

/// Command line/environment value if set, otherwise the file value
fn pick<T: Clone>(flag: &Option<T>, file: Option<T>) -> Option<T> {
    flag.clone().or(file)
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingField { field })
}

fn non_empty_list(values: Option<Vec<String>>) -> Vec<String> {
    let values: Vec<String> = values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        vec!["*".to_string()]
    } else {
        values
    }
}

/// Parses `key1=value1,key2=value2` into a label map
///
/// Pairs without `=` and pairs with an empty key are dropped.
pub fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Notification settings merged from both layers
#[derive(Debug)]
struct ChannelSettings {
    channel: String,
    telegram_webhook: Option<String>,
    telegram_chat_id: Option<String>,
    slack_webhook: Option<String>,
    teams_webhook: Option<String>,
    webhook_url: Option<String>,
    email_smtp_host: Option<String>,
    email_smtp_port: Option<u16>,
    email_smtp_username: Option<String>,
    email_smtp_password: Option<String>,
    email_from: Option<String>,
    email_to: Option<Vec<String>>,
    email_use_tls: Option<bool>,
}

impl ChannelSettings {
    fn merge(args: &CliArgs, file: &FileConfig) -> Self {
        let file = file.clone();
        Self {
            channel: pick(&args.notification_channel, file.notification_channel).unwrap_or_default(),
            telegram_webhook: pick(&args.telegram_webhook, file.telegram_webhook),
            telegram_chat_id: pick(&args.telegram_chat_id, file.telegram_chat_id),
            slack_webhook: pick(&args.slack_webhook, file.slack_webhook),
            teams_webhook: pick(&args.teams_webhook, file.teams_webhook),
            webhook_url: pick(&args.webhook_url, file.webhook_url),
            email_smtp_host: pick(&args.email_smtp_host, file.email_smtp_host),
            email_smtp_port: pick(&args.email_smtp_port, file.email_smtp_port),
            email_smtp_username: pick(&args.email_smtp_username, file.email_smtp_username),
            email_smtp_password: pick(&args.email_smtp_password, file.email_smtp_password),
            email_from: pick(&args.email_from, file.email_from),
            email_to: pick(&args.email_to, file.email_to),
            email_use_tls: pick(&args.email_use_tls, file.email_use_tls),
        }
    }

    fn target(self) -> Result<Option<NotificationTarget>, ConfigError> {
        let setting = |value: Option<String>, channel: &'static str, field: &'static str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingChannelSetting { channel, field })
        };

        let target = match self.channel.trim() {
            "" => return Ok(None),
            "telegram" => NotificationTarget::Telegram {
                webhook: setting(self.telegram_webhook, "telegram", "telegram_webhook")?,
                chat_id: setting(self.telegram_chat_id, "telegram", "telegram_chat_id")?,
            },
            "slack" => NotificationTarget::Slack {
                webhook: setting(self.slack_webhook, "slack", "slack_webhook")?,
            },
            "teams" => NotificationTarget::Teams {
                webhook: setting(self.teams_webhook, "teams", "teams_webhook")?,
            },
            "webhook" => NotificationTarget::Webhook {
                url: setting(self.webhook_url, "webhook", "webhook_url")?,
            },
            "email" => {
                let to: Vec<String> = self
                    .email_to
                    .unwrap_or_default()
                    .into_iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                let smtp_host = setting(self.email_smtp_host, "email", "email_smtp_host")?;
                let from = setting(self.email_from, "email", "email_from")?;
                if to.is_empty() {
                    return Err(ConfigError::MissingChannelSetting {
                        channel: "email",
                        field: "email_to",
                    });
                }
                NotificationTarget::Email(EmailSettings {
                    smtp_host,
                    smtp_port: self.email_smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
                    smtp_username: self.email_smtp_username.unwrap_or_default(),
                    smtp_password: self.email_smtp_password.unwrap_or_default(),
                    from,
                    to,
                    use_tls: self.email_use_tls.unwrap_or(true),
                })
            }
            other => {
                return Err(ConfigError::UnknownChannel {
                    value: other.to_string(),
                })
            }
        };
        Ok(Some(target))
    }
}

/// Validates the notification settings of a config file on their own
pub fn notification_target(file: &FileConfig) -> Result<Option<NotificationTarget>, ConfigError> {
    ChannelSettings::merge(&CliArgs::default(), file).target()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn required_args() -> CliArgs {
        CliArgs {
            argocd_url: Some("https://argocd.example.com".to_string()),
            argocd_username: Some("admin".to_string()),
            argocd_password: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_layers(FileConfig::default(), &required_args()).unwrap();
        assert_eq!(config.filter.projects, vec!["*"]);
        assert_eq!(config.filter.names, vec!["*"]);
        assert!(config.filter.labels.is_empty());
        assert_eq!(config.source_name, "chart-repo");
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.version_constraint, VersionConstraint::Major);
        assert_eq!(config.output_format, OutputFormat::Table);
        assert!(config.notification.is_none());
        assert!(!config.argocd_insecure);
    }

    #[test]
    fn test_missing_required_fields() {
        let err = Config::from_layers(FileConfig::default(), &CliArgs::default()).unwrap_err();
        assert_eq!(err.to_string(), "argocd_url is required");

        let args = CliArgs {
            argocd_password: None,
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert_eq!(err.to_string(), "argocd_password is required");
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            argocd_url: Some("https://from-file".to_string()),
            source_name: Some("file-source".to_string()),
            concurrency: Some(4),
            ..Default::default()
        };
        let args = CliArgs {
            concurrency: Some(2),
            ..required_args()
        };
        let config = Config::from_layers(file, &args).unwrap();
        assert_eq!(config.argocd_url, "https://argocd.example.com");
        assert_eq!(config.source_name, "file-source");
        assert_eq!(config.concurrency, 2);
    }

    #[test]
    fn test_file_supplies_required_fields() {
        let file = FileConfig {
            argocd_url: Some("https://argocd".to_string()),
            argocd_username: Some("u".to_string()),
            argocd_password: Some("p".to_string()),
            ..Default::default()
        };
        let config = Config::from_layers(file, &CliArgs::default()).unwrap();
        assert_eq!(config.argocd_username, "u");
    }

    #[test]
    fn test_non_positive_concurrency_uses_default() {
        for n in [0, -5] {
            let args = CliArgs {
                concurrency: Some(n),
                ..required_args()
            };
            let config = Config::from_layers(FileConfig::default(), &args).unwrap();
            assert_eq!(config.concurrency, 10);
        }
    }

    #[test]
    fn test_invalid_constraint_and_format() {
        let args = CliArgs {
            version_constraint: Some("huge".to_string()),
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConstraint { .. }));

        let args = CliArgs {
            output_format: Some("xml".to_string()),
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOutputFormat { .. }));
    }

    #[test]
    fn test_empty_constraint_normalizes_to_major() {
        let args = CliArgs {
            version_constraint: Some(String::new()),
            output_format: Some(String::new()),
            ..required_args()
        };
        let config = Config::from_layers(FileConfig::default(), &args).unwrap();
        assert_eq!(config.version_constraint, VersionConstraint::Major);
        assert_eq!(config.output_format, OutputFormat::Table);
    }

    #[test]
    fn test_channel_settings_required() {
        let args = CliArgs {
            notification_channel: Some("telegram".to_string()),
            telegram_webhook: Some("https://relay".to_string()),
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "telegram_chat_id is required when notification_channel is 'telegram'"
        );

        let args = CliArgs {
            notification_channel: Some("slack".to_string()),
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingChannelSetting { field: "slack_webhook", .. }
        ));
    }

    #[test]
    fn test_channel_target_built() {
        let args = CliArgs {
            notification_channel: Some("teams".to_string()),
            teams_webhook: Some("https://teams".to_string()),
            ..required_args()
        };
        let config = Config::from_layers(FileConfig::default(), &args).unwrap();
        assert_eq!(
            config.notification,
            Some(NotificationTarget::Teams {
                webhook: "https://teams".to_string()
            })
        );
    }

    #[test]
    fn test_email_channel_target() {
        let file = FileConfig {
            notification_channel: Some("email".to_string()),
            email_smtp_host: Some("smtp.example.com".to_string()),
            email_from: Some("bot@example.com".to_string()),
            email_to: Some(vec!["ops@example.com".to_string(), " ".to_string()]),
            ..Default::default()
        };
        let args = CliArgs {
            email_smtp_port: Some(2525),
            ..required_args()
        };
        let config = Config::from_layers(file, &args).unwrap();
        let Some(NotificationTarget::Email(settings)) = config.notification else {
            panic!("expected an email target");
        };
        assert_eq!(settings.smtp_port, 2525);
        assert_eq!(settings.to, vec!["ops@example.com"]);
        assert!(settings.use_tls);
        assert!(settings.smtp_username.is_empty());
    }

    #[test]
    fn test_email_defaults() {
        let file = FileConfig {
            notification_channel: Some("email".to_string()),
            email_smtp_host: Some("smtp.example.com".to_string()),
            email_from: Some("bot@example.com".to_string()),
            email_to: Some(vec!["ops@example.com".to_string()]),
            email_use_tls: Some(false),
            ..Default::default()
        };
        let Some(NotificationTarget::Email(settings)) = notification_target(&file).unwrap() else {
            panic!("expected an email target");
        };
        assert_eq!(settings.smtp_port, 587);
        assert!(!settings.use_tls);
    }

    #[test]
    fn test_email_settings_required() {
        let mut file = FileConfig {
            notification_channel: Some("email".to_string()),
            ..Default::default()
        };
        let err = notification_target(&file).unwrap_err();
        assert_eq!(
            err.to_string(),
            "email_smtp_host is required when notification_channel is 'email'"
        );

        file.email_smtp_host = Some("smtp.example.com".to_string());
        let err = notification_target(&file).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingChannelSetting { field: "email_from", .. }
        ));

        file.email_from = Some("bot@example.com".to_string());
        let err = notification_target(&file).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingChannelSetting { field: "email_to", .. }
        ));
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let args = CliArgs {
            notification_channel: Some("pager".to_string()),
            ..required_args()
        };
        let err = Config::from_layers(FileConfig::default(), &args).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownChannel { .. }));
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("team=infra, env = prod ,=orphan,novalue,empty=");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["team"], "infra");
        assert_eq!(labels["env"], "prod");
        assert_eq!(labels["empty"], "");
        assert!(parse_labels("").is_empty());
    }

    #[test]
    fn test_labels_flag_replaces_file_labels() {
        let mut file_labels = BTreeMap::new();
        file_labels.insert("a".to_string(), "1".to_string());
        let file = FileConfig {
            labels: Some(file_labels),
            ..Default::default()
        };
        let args = CliArgs {
            labels: Some("b=2".to_string()),
            ..required_args()
        };
        let config = Config::from_layers(file, &args).unwrap();
        assert_eq!(config.filter.labels.len(), 1);
        assert_eq!(config.filter.labels["b"], "2");
    }

    #[test]
    fn test_parse_yaml_file() {
        let yaml = r#"
argocd_url: https://argocd.example.com
projects: [infra, apps]
labels:
  team: platform
concurrency: 3
repository_auth:
  - url: https://charts.example.com
    username: bot
    password: token
"#;
        let file = FileConfig::parse(Path::new("config.yaml"), yaml).unwrap();
        assert_eq!(file.argocd_url.as_deref(), Some("https://argocd.example.com"));
        assert_eq!(file.projects, Some(vec!["infra".to_string(), "apps".to_string()]));
        assert_eq!(file.concurrency, Some(3));
        assert_eq!(file.repository_auth.len(), 1);
        assert_eq!(file.repository_auth[0].username, "bot");
    }

    #[test]
    fn test_parse_toml_file() {
        let toml = r#"
argocd_url = "https://argocd.example.com"
version_constraint = "minor"

[[repository_auth]]
url = "ghcr.io"
username = "bot"
password = "token"
"#;
        let file = FileConfig::parse(Path::new("config.toml"), toml).unwrap();
        assert_eq!(file.version_constraint.as_deref(), Some("minor"));
        assert_eq!(file.repository_auth[0].url, "ghcr.io");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = FileConfig::parse(Path::new("config.yaml"), "projects: [unclosed").unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_discover_and_load() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let path = second.path().join("config.yml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "source_name: custom").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = FileConfig::discover(&dirs).unwrap();
        assert_eq!(found, path);

        let file = FileConfig::load(&found).unwrap();
        assert_eq!(file.source_name.as_deref(), Some("custom"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = FileConfig::resolve(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = Config::from_layers(FileConfig::default(), &required_args()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
    }
}
