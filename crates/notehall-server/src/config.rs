use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expires_in: i64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()?,
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expires_in: var("JWT_EXPIRES_IN")
                .unwrap_or_else(|| "900".to_string()) // 15 minutes
                .parse()?,
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()?,
        })
    }
}
