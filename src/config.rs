use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::errors::ConfigError;
use crate::scheduler::ReschedulePolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub token: String,
    pub backend_url: Url,
    pub backend_timeout: Duration,
    /// Long polling is used when absent.
    pub webhook: Option<WebhookConfig>,
    pub poll_interval: Duration,
    pub worker_idle: Duration,
    pub reschedule_policy: ReschedulePolicy,
    pub log_level: String,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let token = required("TELOXIDE_TOKEN")?;
        let backend_url = parse("BACKEND_URL", required("BACKEND_URL")?)?;

        let webhook = match (lookup("WEBHOOK_URL"), lookup("WEBHOOK_ADDR")) {
            (Some(url), Some(addr)) => Some(WebhookConfig {
                url: parse("WEBHOOK_URL", url)?,
                addr: parse("WEBHOOK_ADDR", addr)?,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteWebhook),
        };

        let number = |name: &'static str, default: u64| match lookup(name) {
            Some(value) => parse::<u64>(name, value),
            None => Ok(default),
        };

        let reschedule_policy = match lookup("RESCHEDULE_POLICY") {
            Some(value) => parse("RESCHEDULE_POLICY", value)?,
            None => ReschedulePolicy::default(),
        };

        Ok(Self {
            token,
            backend_url,
            backend_timeout: Duration::from_secs(number("BACKEND_TIMEOUT_SECS", 30)?),
            webhook,
            poll_interval: Duration::from_millis(number("QUEUE_POLL_INTERVAL_MS", 1000)?),
            worker_idle: Duration::from_secs(number("WORKER_IDLE_SECS", 300)?),
            reschedule_policy,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const BASE: [(&str, &str); 2] = [
        ("TELOXIDE_TOKEN", "123456:abcdef"),
        ("BACKEND_URL", "http://localhost:8080/api"),
    ];

    #[test]
    fn defaults_apply() {
        let config = config(&BASE).unwrap();

        assert_eq!(config.backend_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.backend_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.worker_idle, Duration::from_secs(300));
        assert_eq!(config.reschedule_policy, ReschedulePolicy::Replace);
        assert_eq!(config.log_level, "info");
        assert!(config.webhook.is_none());
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            config(&[("BACKEND_URL", "http://x")]).unwrap_err(),
            ConfigError::Missing("TELOXIDE_TOKEN")
        );
        assert_eq!(
            config(&[("TELOXIDE_TOKEN", " "), ("BACKEND_URL", "http://x")]).unwrap_err(),
            ConfigError::Missing("TELOXIDE_TOKEN")
        );
    }

    #[test]
    fn invalid_values_are_named() {
        let mut vars = BASE.to_vec();
        vars.push(("QUEUE_POLL_INTERVAL_MS", "soon"));

        assert_eq!(
            config(&vars).unwrap_err(),
            ConfigError::Invalid {
                name: "QUEUE_POLL_INTERVAL_MS",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn webhook_needs_both_halves() {
        let mut vars = BASE.to_vec();
        vars.push(("WEBHOOK_URL", "https://example.org/hook"));
        assert_eq!(config(&vars).unwrap_err(), ConfigError::IncompleteWebhook);

        vars.push(("WEBHOOK_ADDR", "0.0.0.0:8443"));
        let webhook = config(&vars).unwrap().webhook.unwrap();
        assert_eq!(webhook.addr.port(), 8443);
    }

    #[test]
    fn stack_policy_can_be_selected() {
        let mut vars = BASE.to_vec();
        vars.push(("RESCHEDULE_POLICY", "stack"));

        assert_eq!(config(&vars).unwrap().reschedule_policy, ReschedulePolicy::Stack);
    }
}
