use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// PostgreSQL backend when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub demo_user_id: i32,
    pub predict_program: String,
    pub risk_model_script: String,
    pub score_model_script: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            database_url: None,
            demo_user_id: 1,
            predict_program: "python3".to_string(),
            risk_model_script: "ml/predict.py".to_string(),
            score_model_script: "ml/model.py".to_string(),
            openai_api_key: None,
            openai_model: "gpt-5".to_string(),
        }
    }
}

impl Config {
    /// Reads `.env.local` and `.env` if present, then the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).filter(|v| !v.is_empty()).unwrap_or(default);

        Ok(Self {
            host: parse(&lookup, "HOST", defaults.host)?,
            port: parse(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            demo_user_id: parse(&lookup, "DEMO_USER_ID", defaults.demo_user_id)?,
            predict_program: text("PREDICT_PROGRAM", defaults.predict_program),
            risk_model_script: text("RISK_MODEL_SCRIPT", defaults.risk_model_script),
            score_model_script: text("SCORE_MODEL_SCRIPT", defaults.score_model_script),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()),
            openai_model: text("OPENAI_MODEL", defaults.openai_model),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value `{}`", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.addr().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("DEMO_USER_ID", "7"),
            ("OPENAI_MODEL", "gpt-4o"),
        ])
        .unwrap();
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/portal"));
        assert_eq!(config.demo_user_id, 7);
        assert_eq!(config.openai_model, "gpt-4o");
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn empty_values_fall_back() {
        let config = config(&[("DATABASE_URL", ""), ("PORT", "")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.port, 5000);
    }
}
