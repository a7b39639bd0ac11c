//! DSN form of the failover configuration.
//!
//! ```text
//! failover://primary||secondary?consumption_strategy=latency_aware&circuit_breaker[failure_threshold]=3
//! ```
//!
//! Transport names are separated by `||`. Options go in the query string;
//! nested keys may be written either bare (`failure_threshold=3`) or in
//! bracket form (`circuit_breaker[failure_threshold]=3`). Durations are whole
//! seconds for the circuit breaker and milliseconds everywhere else.
//!
//! Transport names, option keys and option values are percent-decoded, so
//! `circuit_breaker%5Btimeout%5D=5` and `queue%2Da` are accepted.

use super::FailoverConfig;
use crate::error::{FailoverError, FailoverResult};
use std::str::FromStr;
use url::form_urlencoded;

/// Scheme every failover DSN starts with
pub const DSN_SCHEME: &str = "failover://";

const TRANSPORT_SEPARATOR: &str = "||";

impl FailoverConfig {
    /// Parse and validate a `failover://` DSN
    pub fn from_dsn(dsn: &str) -> FailoverResult<Self> {
        let rest = dsn
            .trim()
            .strip_prefix(DSN_SCHEME)
            .ok_or_else(|| dsn_error(format!("DSN must start with '{DSN_SCHEME}'")))?;

        let (hosts, query) = match rest.split_once('?') {
            Some((hosts, query)) => (hosts, Some(query)),
            None => (rest, None),
        };

        let names = hosts
            .split(TRANSPORT_SEPARATOR)
            .map(decode_transport_name)
            .collect::<FailoverResult<Vec<_>>>()?;
        let mut config =
            FailoverConfig::with_transports(names.into_iter().filter(|name| !name.is_empty()));

        if let Some(query) = query {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                config.apply_option(key.trim(), value.trim())?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> FailoverResult<()> {
        let (section, field) = match key.split_once('[') {
            Some((section, rest)) => {
                let field = rest
                    .strip_suffix(']')
                    .ok_or_else(|| dsn_error(format!("malformed option key '{key}'")))?;
                (Some(section), field)
            }
            None => (None, key),
        };

        match (section, field) {
            (None | Some("circuit_breaker"), "failure_threshold") => {
                self.circuit_breaker.failure_threshold = parse(key, value)?
            }
            (None | Some("circuit_breaker"), "success_threshold") => {
                self.circuit_breaker.success_threshold = parse(key, value)?
            }
            (None | Some("circuit_breaker"), "timeout" | "timeout_seconds") => {
                self.circuit_breaker.timeout_seconds = parse(key, value)?
            }
            (None | Some("circuit_breaker"), "timeout_multiplier") => {
                self.circuit_breaker.timeout_multiplier = parse(key, value)?
            }
            (None | Some("circuit_breaker"), "max_timeout" | "max_timeout_seconds") => {
                self.circuit_breaker.max_timeout_seconds = parse(key, value)?
            }
            (None, "consumption_strategy") => self.consumption_strategy = value.parse()?,
            (None | Some("strategy_options"), "window_size") => {
                self.strategy_options.window_size = parse(key, value)?
            }
            (None | Some("strategy_options"), "latency_weight") => {
                self.strategy_options.latency_weight = parse(key, value)?
            }
            (None | Some("strategy_options"), "success_weight") => {
                self.strategy_options.success_weight = parse(key, value)?
            }
            (None | Some("strategy_options"), "measurement_interval" | "measurement_interval_ms") => {
                self.strategy_options.measurement_interval_ms = parse(key, value)?
            }
            (None | Some("strategy_options"), "latency_threshold" | "latency_threshold_ms") => {
                self.strategy_options.latency_threshold_ms = parse(key, value)?
            }
            (None, "try_unhealthy_on_failure") => {
                self.try_unhealthy_on_failure = parse_bool(key, value)?
            }
            (None, "max_retries") => self.max_retries = parse(key, value)?,
            (None, "retry_delay" | "retry_delay_ms") => self.retry_delay_ms = parse(key, value)?,
            _ => return Err(dsn_error(format!("unknown option '{key}'"))),
        }
        Ok(())
    }
}

fn dsn_error(message: impl Into<String>) -> FailoverError {
    FailoverError::configuration("dsn", message)
}

fn parse<T: FromStr>(key: &str, value: &str) -> FailoverResult<T> {
    value
        .parse()
        .map_err(|_| dsn_error(format!("invalid value '{value}' for option '{key}'")))
}

fn parse_bool(key: &str, value: &str) -> FailoverResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(dsn_error(format!(
            "invalid boolean '{value}' for option '{key}'"
        ))),
    }
}

/// Percent-decode one `||`-separated transport name
fn decode_transport_name(raw: &str) -> FailoverResult<String> {
    let raw = raw.trim();
    if raw.contains(['=', '&']) {
        return Err(dsn_error(format!("invalid transport name '{raw}'")));
    }

    Ok(form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(name, _)| name.trim().to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ConsumptionStrategyKind;

    #[test]
    fn test_minimal_dsn() {
        let config = FailoverConfig::from_dsn("failover://primary||secondary").unwrap();

        assert_eq!(config.transports, vec!["primary", "secondary"]);
        assert_eq!(config, FailoverConfig::with_transports(["primary", "secondary"]));
    }

    #[test]
    fn test_dsn_with_options() {
        let config = FailoverConfig::from_dsn(
            "failover://db || redis || memory?consumption_strategy=adaptive_priority\
             &circuit_breaker[failure_threshold]=3&timeout=10\
             &circuit_breaker%5Bmax_timeout%5D=60&window_size=20\
             &try_unhealthy_on_failure=false&retry_delay=250",
        )
        .unwrap();

        assert_eq!(config.transports, vec!["db", "redis", "memory"]);
        assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::AdaptivePriority);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.timeout_seconds, 10);
        assert_eq!(config.circuit_breaker.max_timeout_seconds, 60);
        assert_eq!(config.strategy_options.window_size, 20);
        assert!(!config.try_unhealthy_on_failure);
        assert_eq!(config.retry_delay_ms, 250);
    }

    #[test]
    fn test_dsn_is_percent_decoded() {
        let config = FailoverConfig::from_dsn(
            "failover://queue%2Da||queue%2Db?consumption_strategy=latency%5Faware\
             &strategy_options%5Blatency_threshold%5D=750&retry%5Fdelay=%32%35",
        )
        .unwrap();

        assert_eq!(config.transports, vec!["queue-a", "queue-b"]);
        assert_eq!(config.consumption_strategy, ConsumptionStrategyKind::LatencyAware);
        assert_eq!(config.strategy_options.latency_threshold_ms, 750);
        assert_eq!(config.retry_delay_ms, 25);
    }

    #[test]
    fn test_dsn_errors() {
        let cases = [
            "redis://primary||secondary",
            "failover://primary",
            "failover://a||b?consumption_strategy=fastest",
            "failover://a||b?failure_threshold=many",
            "failover://a||b?unknown_option=1",
            "failover://a||b?strategy_options[failure_threshold]=1",
            "failover://a||b?max_retries",
            "failover://a||b?circuit_breaker[timeout=5",
            "failover://a=1||b",
            "failover://a||b?failure_threshold=%33x",
        ];

        for dsn in cases {
            let err = FailoverConfig::from_dsn(dsn).unwrap_err();
            assert!(
                matches!(err, FailoverError::Configuration { .. }),
                "{dsn}: {err}"
            );
        }
    }
}
