//! Defines the environment variables to use.

#![cfg(feature = "env")]

use std::{fmt, time::Duration};

use anyhow::anyhow;

/// Parses an environment variable from [`String`] to something else, wrapping any error in [`anyhow::Error`].
///
/// The first argument is the lookup to read from, usually [`std::env::var`] wrapped to return an
/// [`Option`]. Unset and empty variables both evaluate to `Ok(None)`.
#[macro_export]
macro_rules! parse_env {
    ($lookup:expr, $key:expr) => {
        ($lookup)($key).filter(|value: &String| !value.is_empty())
    };
    ($lookup:expr, $key:expr => |$var:ident| $expr:expr) => {
        match $crate::parse_env!($lookup, $key) {
            Some($var) => $expr
                .map(Some)
                .map_err(|e| ::anyhow::anyhow!("invalid value for {}: {}", $key, e)),
            None => Ok(None),
        }
    };
}

/// The public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// The port to listen on when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// The quiescence window when `DEBOUNCE_MILLIS` is unset.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Process configuration, read once at startup and handed to the components that need it.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// The GitHub token used for the REST API.
    pub github_token: String,
    /// The owner of the watched repository.
    pub owner: String,
    /// The name of the watched repository.
    pub repo: String,
    /// The base URL of the GitHub REST API.
    pub api_url: String,
    /// The shared secret for webhook signatures. Signatures are not checked when unset.
    pub webhook_secret: Option<String>,
    /// The port the webhook server listens on.
    pub port: u16,
    /// How long deliveries must stay quiet before a reconciliation pass starts.
    pub debounce_window: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a variable fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `GITHUB_TOKEN`, `GITHUB_OWNER` or `GITHUB_REPO` is missing, or if
    /// `PORT` or `DEBOUNCE_MILLIS` fails to parse.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            parse_env!(&lookup, key).ok_or_else(|| anyhow!("{key} not set in environment"))
        };

        let github_token = required("GITHUB_TOKEN")?;
        let owner = required("GITHUB_OWNER")?;
        let repo = required("GITHUB_REPO")?;
        let api_url = parse_env!(&lookup, "GITHUB_API_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let webhook_secret = parse_env!(&lookup, "GITHUB_WEBHOOK_SECRET");
        let port = parse_env!(&lookup, "PORT" => |s| s.parse::<u16>())?.unwrap_or(DEFAULT_PORT);
        let debounce_window = parse_env!(&lookup, "DEBOUNCE_MILLIS" => |s| s.parse::<u64>())?
            .map_or(DEFAULT_DEBOUNCE, Duration::from_millis);

        Ok(Self {
            github_token,
            owner,
            repo,
            api_url,
            webhook_secret,
            port,
            debounce_window,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_url", &self.api_url)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("port", &self.port)
            .field("debounce_window", &self.debounce_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("GITHUB_TOKEN", "ghp_secret"),
        ("GITHUB_OWNER", "octocat"),
        ("GITHUB_REPO", "hello-world"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.github_token, "ghp_secret");
        assert_eq!(config.owner, "octocat");
        assert_eq!(config.repo, "hello-world");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.webhook_secret, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.debounce_window, Duration::from_secs(2));
    }

    #[test]
    fn optional_vars_override_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3/"),
            ("GITHUB_WEBHOOK_SECRET", "hush"),
            ("PORT", "3000"),
            ("DEBOUNCE_MILLIS", "500"),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.webhook_secret.as_deref(), Some("hush"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.debounce_window, Duration::from_millis(500));
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("GITHUB_REPO"));
    }

    #[test]
    fn empty_required_var_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("GITHUB_TOKEN", "");

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn unparsable_port_is_an_error() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn debug_redacts_credentials() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("GITHUB_WEBHOOK_SECRET", "hush"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("hush"));
        assert!(debug.contains("octocat"));
    }
}
