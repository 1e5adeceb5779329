use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// The current environment the application is running in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Dev and or staging environment
    Develop,
    /// The server is running on localhost
    Local,
}

/// Represents a value which cannot be converted into an [Environment]
#[derive(Debug, Error)]
#[error("Could not convert {0} into an environment value")]
pub struct UnknownEnvironment(String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(environment: &str) -> Result<Self, UnknownEnvironment> {
        match environment {
            "production" | "prod" => Ok(Environment::Production),
            "develop" | "dev" => Ok(Environment::Develop),
            "local" => Ok(Environment::Local),
            s => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "prod"),
            Environment::Develop => write!(f, "dev"),
            Environment::Local => write!(f, "local"),
        }
    }
}

impl Environment {
    /// (min, max) connections of the database pool
    pub fn pool_size(&self) -> (u32, u32) {
        match self {
            Environment::Production => (5, 30),
            Environment::Develop => (3, 20),
            Environment::Local => (3, 10),
        }
    }
}

/// Configuration parameters for the field engine.
#[derive(Debug)]
pub struct Config {
    /// The connection URL for the Postgres database holding the field tables
    pub database_url: String,
    /// The environment we are in
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be provided")?;
        let environment = match std::env::var("ENVIRONMENT") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("invalid ENVIRONMENT value '{value}'"))?,
            Err(_) => Environment::Production,
        };

        Ok(Config {
            database_url,
            environment,
        })
    }

    /// Open a pool sized for the environment
    #[tracing::instrument(err, skip(self), fields(environment = %self.environment))]
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let (min_connections, max_connections) = self.environment.pool_size();

        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(&self.database_url)
            .await
            .context("could not connect to db")?;

        tracing::trace!(
            min_connections,
            max_connections,
            "initialized db connection"
        );
        Ok(pool)
    }
}

/// Field engine schema migrations
pub static FIELDS_MIGRATIONS: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply the field engine schema
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    FIELDS_MIGRATIONS
        .run(pool)
        .await
        .context("could not run field engine migrations")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Develop);
        assert_eq!("local".parse::<Environment>().unwrap(), Environment::Local);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_pool_sizes() {
        assert_eq!(Environment::Production.pool_size(), (5, 30));
        assert_eq!(Environment::Develop.pool_size(), (3, 20));
        assert_eq!(Environment::Local.pool_size(), (3, 10));
    }
}
