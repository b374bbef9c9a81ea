use std::env;

use revenue_analytics_core::config::{parse_instant, AnalyticsConfig};
use tracing::debug;

use crate::input;

pub const ENV_AS_OF: &str = "REVDASH_AS_OF";
pub const ENV_WINDOW_MONTHS: &str = "REVDASH_WINDOW_MONTHS";
pub const ENV_TENANT: &str = "REVDASH_TENANT";

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Layered settings: built-in defaults, then the config file, then the
/// `REVDASH_*` environment variables.
pub fn load(path: Option<&str>) -> Result<AnalyticsConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(p) => input::file::read_structured::<AnalyticsConfig>(p)?,
        None => AnalyticsConfig::default(),
    };
    apply_overrides(&mut config, |name| env_string(name))?;
    config.validate()?;
    debug!(window_months = config.window_months, as_of = ?config.as_of, "loaded configuration");
    Ok(config)
}

fn apply_overrides(
    config: &mut AnalyticsConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(raw) = lookup(ENV_AS_OF) {
        config.as_of = Some(parse_instant(&raw)?);
    }
    if let Some(raw) = lookup(ENV_WINDOW_MONTHS) {
        config.window_months = raw
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("{ENV_WINDOW_MONTHS}='{raw}': {e}"))?;
    }
    if let Some(raw) = lookup(ENV_TENANT) {
        config.tenant = Some(raw);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = AnalyticsConfig {
            window_months: 6,
            tenant: Some("from-file".into()),
            ..Default::default()
        };
        apply_overrides(
            &mut config,
            lookup(&[(ENV_WINDOW_MONTHS, "3"), (ENV_AS_OF, "2024-02-10")]),
        )
        .unwrap();
        assert_eq!(config.window_months, 3);
        assert_eq!(config.tenant.as_deref(), Some("from-file"));
        assert_eq!(
            config.as_of,
            Some(Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_bad_window_rejected() {
        let mut config = AnalyticsConfig::default();
        let err = apply_overrides(&mut config, lookup(&[(ENV_WINDOW_MONTHS, "twelve")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_WINDOW_MONTHS));
    }

    #[test]
    fn test_yaml_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "window_months: 4\ntenant: acme").unwrap();
        let config: AnalyticsConfig =
            input::file::read_structured(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.window_months, 4);
        assert_eq!(config.tenant.as_deref(), Some("acme"));
    }
}
