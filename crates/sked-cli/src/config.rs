use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::timezone::detect_system_timezone;

pub const CONFIG_FILE: &str = "sked.toml";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file
    pub database_path: String,
    /// Owner used when `--owner` is not given
    pub owner: String,
    /// IANA zone instants are displayed in
    pub timezone: String,
    /// Length of the `list` window when `--to` is absent
    pub default_window_days: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "sked.db".to_string(),
            owner: "local".to_string(),
            timezone: detect_system_timezone(),
            default_window_days: 30,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// `sked.toml` in the working directory, then `SKED_*` variables.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("SKED_"))
    }

    /// Like [`Config::new`], but an unreadable configuration is reported and
    /// replaced by the defaults.
    pub fn load_or_default() -> Self {
        match Self::new() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "invalid configuration, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::new()?;
            assert_eq!(config.database_path, "sked.db");
            assert_eq!(config.owner, "local");
            assert_eq!(config.default_window_days, 30);
            assert_eq!(config.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                owner = "from-file"
                default_window_days = 7
                timezone = "Asia/Seoul"
                "#,
            )?;
            jail.set_env("SKED_OWNER", "from-env");

            let config = Config::new()?;
            assert_eq!(config.owner, "from-env");
            assert_eq!(config.default_window_days, 7);
            assert_eq!(config.timezone, "Asia/Seoul");
            Ok(())
        });
    }
}
