use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_expired_attempt_policy, parse_i64, parse_u16, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, QuizSettings, RuntimeSettings,
    SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZ_HOST", "0.0.0.0");
        let port = env_or_default("QUIZ_PORT", "8000");

        let environment =
            parse_environment(env_optional("QUIZ_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("QUIZ_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Quiz Attempts API");
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let (secret_key, secret_key_from_env) = match env_optional("SECRET_KEY") {
            Some(value) => (value, true),
            None => (load_or_create_secret_key(), false),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quiz");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quiz_attempts");
        let database_url = env_optional("DATABASE_URL");

        let grace_period_seconds = parse_i64(
            "QUIZ_GRACE_PERIOD_SECONDS",
            env_or_default("QUIZ_GRACE_PERIOD_SECONDS", "60"),
        )?;
        let expired_attempts = parse_expired_attempt_policy(env_optional("QUIZ_EXPIRED_ATTEMPTS"))?;

        let log_level = env_or_default("QUIZ_LOG_LEVEL", "info");
        let json = env_optional("QUIZ_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, api_v1_str },
            security: SecuritySettings {
                secret_key,
                secret_key_from_env,
                access_token_expire_minutes,
                algorithm,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            quiz: QuizSettings { grace_period_seconds, expired_attempts },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn quiz(&self) -> &QuizSettings {
        &self.quiz
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.quiz.grace_period_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                field: "QUIZ_GRACE_PERIOD_SECONDS",
                value: self.quiz.grace_period_seconds.to_string(),
            });
        }

        if self.security.algorithm != "HS256" {
            return Err(ConfigError::InvalidValue {
                field: "ALGORITHM",
                value: self.security.algorithm.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if !self.security.secret_key_from_env {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigError, ExpiredAttemptPolicy, Settings};
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_quiz_defaults() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("QUIZ_GRACE_PERIOD_SECONDS");
        std::env::remove_var("QUIZ_EXPIRED_ATTEMPTS");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.quiz().grace_period_seconds, 60);
        assert_eq!(settings.quiz().expired_attempts, ExpiredAttemptPolicy::Retain);
        assert_eq!(settings.api().api_v1_str, "/api/v1");
    }

    #[tokio::test]
    async fn negative_grace_period_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("QUIZ_GRACE_PERIOD_SECONDS", "-5");

        let result = Settings::load();
        std::env::remove_var("QUIZ_GRACE_PERIOD_SECONDS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "QUIZ_GRACE_PERIOD_SECONDS", .. })
        ));
    }

    #[tokio::test]
    async fn strict_config_requires_database_secret() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("QUIZ_STRICT_CONFIG", "1");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("POSTGRES_PASSWORD");

        let result = Settings::load();
        std::env::set_var("QUIZ_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"))));
    }
}
