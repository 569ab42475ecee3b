use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_dir: String,

    // Work rules
    pub office_start: NaiveTime,
    pub standard_work_minutes: i32,
    pub max_permission_minutes: i32,
    pub max_overtime_minutes: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            office_start: match lookup("OFFICE_START") {
                Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                    .with_context(|| format!("OFFICE_START must be HH:MM, got {raw:?}"))?,
                None => NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            },
            standard_work_minutes: parse_or(&lookup, "STANDARD_WORK_MINUTES", 480)?,
            max_permission_minutes: parse_or(&lookup, "MAX_PERMISSION_MINUTES", 180)?,
            max_overtime_minutes: parse_or(&lookup, "MAX_OVERTIME_MINUTES", 720)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SERVER_ADDR" => Some("127.0.0.1:8080".into()),
        "DATABASE_URL" => Some("postgres://localhost/ems_test".into()),
        "JWT_SECRET" => Some("test-secret".into()),
        _ => None,
    })
    .expect("test config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "0.0.0.0:8080"),
        ("DATABASE_URL", "postgres://localhost/ems"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.refresh_token_ttl, 604_800);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.office_start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(config.max_permission_minutes, 180);
        assert!(config.run_migrations);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OFFICE_START", "10:00"));
        pairs.push(("RUN_MIGRATIONS", "false"));
        pairs.push(("RATE_LOGIN_PER_MIN", "5"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.office_start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert!(!config.run_migrations);
        assert_eq!(config.rate_login_per_min, 5);
    }

    #[test]
    fn garbage_number_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
    }
}
