//! Repository credentials
//!
//! Credentials are collected once at startup from the config file and from
//! `CW_AUTH_URL_<id>`, `CW_AUTH_USER_<id>`, `CW_AUTH_PASS_<id>` environment
//! groups. Entries are keyed by normalized host; environment groups override
//! config entries for the same host.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "CW_AUTH_";

/// Repository credentials entry as written in the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryAuth {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Basic-auth credentials for one host
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Where the entry came from: `config` or `env:<id>`
    pub source: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Immutable lookup table from normalized host to credentials
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<String, Credentials>,
}

impl CredentialStore {
    /// Builds the store from config entries and the process environment
    pub fn from_env(config_auth: &[RepositoryAuth]) -> Self {
        Self::from_sources(config_auth, std::env::vars())
    }

    /// Builds the store from config entries and the given variables
    pub fn from_sources<I, K, V>(config_auth: &[RepositoryAuth], vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();

        for auth in config_auth {
            if auth.url.is_empty() || auth.username.is_empty() || auth.password.is_empty() {
                warn!(url = %auth.url, "incomplete auth configuration, skipping");
                continue;
            }
            let host = normalize_host(&auth.url);
            debug!(url = %auth.url, normalized = %host, username = %auth.username, "loaded credentials from config file");
            entries.insert(
                host,
                Credentials {
                    username: auth.username.clone(),
                    password: auth.password.clone(),
                    source: "config".to_string(),
                },
            );
        }

        let mut groups: BTreeMap<String, EnvGroup> = BTreeMap::new();
        for (key, value) in vars {
            let Some(rest) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let Some((field, id)) = rest.split_once('_') else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            let group = groups.entry(id.to_string()).or_default();
            match field {
                "URL" => group.url = Some(value.into()),
                "USER" => group.user = Some(value.into()),
                "PASS" => group.pass = Some(value.into()),
                _ => {}
            }
        }

        for (id, group) in groups {
            let (Some(url), Some(user), Some(pass)) = (group.url, group.user, group.pass) else {
                warn!(id = %id, "incomplete auth group in environment variables");
                continue;
            };
            let host = normalize_host(&url);
            debug!(id = %id, url = %url, normalized = %host, "loaded credentials from environment");
            entries.insert(
                host,
                Credentials {
                    username: user,
                    password: pass,
                    source: format!("env:{}", id),
                },
            );
        }

        debug!(auths = entries.len(), "loaded authentication credentials");
        Self { entries }
    }

    /// Looks up credentials for a repository URL or host
    pub fn get(&self, repository: &str) -> Option<&Credentials> {
        let host = normalize_host(repository);
        let found = self.entries.get(&host);
        match found {
            Some(creds) => debug!(repo = %repository, normalized = %host, source = %creds.source, "found credentials"),
            None => debug!(repo = %repository, normalized = %host, "no credentials found, using anonymous access"),
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct EnvGroup {
    url: Option<String>,
    user: Option<String>,
    pass: Option<String>,
}

/// Reduces a repository reference to its bare host name
///
/// `https://charts.example.com:8443/stable` and `oci://charts.example.com/x`
/// both normalize to `charts.example.com`.
pub fn normalize_host(repository: &str) -> String {
    let rest = ["https://", "http://", "oci://"]
        .iter()
        .find_map(|scheme| repository.strip_prefix(scheme))
        .unwrap_or(repository);
    let host = rest.split('/').next().unwrap_or(rest);
    host.split(':').next().unwrap_or(host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(url: &str, user: &str, pass: &str) -> RepositoryAuth {
        RepositoryAuth {
            url: url.to_string(),
            username: user.to_string(),
            password: pass.to_string(),
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://charts.example.com"), "charts.example.com");
        assert_eq!(normalize_host("registry.example.com/helm"), "registry.example.com");
        assert_eq!(normalize_host("ghcr.io/myorg/charts"), "ghcr.io");
        assert_eq!(normalize_host("oci://ghcr.io/org"), "ghcr.io");
        assert_eq!(normalize_host("http://localhost:5000/charts"), "localhost");
    }

    #[test]
    fn test_config_credentials() {
        let store = CredentialStore::from_sources(
            &[auth("https://charts.example.com", "alice", "secret")],
            Vec::<(String, String)>::new(),
        );
        let creds = store.get("https://charts.example.com/stable").unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.source, "config");
        assert!(store.get("other.example.com").is_none());
    }

    #[test]
    fn test_incomplete_config_entry_skipped() {
        let store = CredentialStore::from_sources(
            &[auth("https://charts.example.com", "alice", "")],
            Vec::<(String, String)>::new(),
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_env_overrides_config() {
        let vars = vec![
            ("CW_AUTH_URL_HARBOR", "oci://charts.example.com"),
            ("CW_AUTH_USER_HARBOR", "robot"),
            ("CW_AUTH_PASS_HARBOR", "token"),
            ("UNRELATED", "x"),
        ];
        let store = CredentialStore::from_sources(
            &[auth("https://charts.example.com", "alice", "secret")],
            vars,
        );
        let creds = store.get("charts.example.com").unwrap();
        assert_eq!(creds.username, "robot");
        assert_eq!(creds.source, "env:HARBOR");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_incomplete_env_group_skipped() {
        let vars = vec![
            ("CW_AUTH_URL_1", "ghcr.io"),
            ("CW_AUTH_USER_1", "bob"),
        ];
        let store = CredentialStore::from_sources(&[], vars);
        assert!(store.get("ghcr.io").is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials {
            username: "u".to_string(),
            password: "hunter2".to_string(),
            source: "config".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
