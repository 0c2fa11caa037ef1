pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub database_url: String,
        pub port: u16,
        #[serde(default = "default_static_dir")]
        pub static_dir: String,
    }

    /// Error raised while assembling the process configuration.
    #[derive(Debug, thiserror::Error)]
    pub enum ConfigError {
        #[error("failed to load configuration: {0}")]
        Source(#[from] ::config::ConfigError),
        #[error("{0} must not be empty")]
        Empty(&'static str),
        #[error("failed to load .env file: {0}")]
        DotEnv(#[from] dotenvy::Error),
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> Result<Self, ConfigError> {
            Self::from_environment(::config::Environment::default())
        }

        /// Loads configuration from the given environment source and checks
        /// that every required value is present and non-empty.
        pub fn from_environment(environment: ::config::Environment) -> Result<Self, ConfigError> {
            let settings = ::config::Config::builder()
                .add_source(environment)
                .build()?;

            let config: Config = settings.try_deserialize()?;
            if config.database_url.trim().is_empty() {
                return Err(ConfigError::Empty("DATABASE_URL"));
            }
            Ok(config)
        }
    }

    /// Loads variables from a local `.env` file when running with `ENV=dev`.
    pub fn load_dev_env() -> Result<(), ConfigError> {
        if std::env::var("ENV").is_ok_and(|env| env == "dev") {
            dotenvy::dotenv()?;
        }
        Ok(())
    }

    fn default_static_dir() -> String {
        "static".to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn environment(vars: &[(&str, &str)]) -> ::config::Environment {
            ::config::Environment::default().source(Some(
                vars.iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            ))
        }

        #[test]
        fn can_load_config_from_environment() {
            let config = Config::from_environment(environment(&[
                ("PORT", "3000"),
                ("DATABASE_URL", "postgres://localhost/tasks"),
            ]))
            .unwrap();

            assert_eq!(config.port, 3000);
            assert_eq!(config.database_url, "postgres://localhost/tasks");
            assert_eq!(config.static_dir, "static");
        }

        #[test]
        fn can_override_static_dir() {
            let config = Config::from_environment(environment(&[
                ("PORT", "3000"),
                ("DATABASE_URL", "postgres://localhost/tasks"),
                ("STATIC_DIR", "/srv/static"),
            ]))
            .unwrap();

            assert_eq!(config.static_dir, "/srv/static");
        }

        #[test]
        fn rejects_missing_port() {
            let result = Config::from_environment(environment(&[(
                "DATABASE_URL",
                "postgres://localhost/tasks",
            )]));

            assert!(matches!(result, Err(ConfigError::Source(_))));
        }

        #[test]
        fn rejects_empty_port() {
            let result = Config::from_environment(environment(&[
                ("PORT", ""),
                ("DATABASE_URL", "postgres://localhost/tasks"),
            ]));

            assert!(result.is_err());
        }

        #[test]
        fn rejects_empty_database_url() {
            let result =
                Config::from_environment(environment(&[("PORT", "3000"), ("DATABASE_URL", "")]));

            assert!(matches!(result, Err(ConfigError::Empty("DATABASE_URL"))));
        }
    }
}

pub mod entities;
pub mod task;
pub mod web;
