use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, parse_cors_origins, parse_environment,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings,
    GradingSettings, RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort,
    ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADEPOINT_HOST", "0.0.0.0");
        let port = env_or_default("GRADEPOINT_PORT", "8000");

        let environment = parse_environment(
            env_optional("GRADEPOINT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_flag("GRADEPOINT_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "GradePoint API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = env_number("ACCESS_TOKEN_EXPIRE_MINUTES", 10_080)?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = env_number("POSTGRES_PORT", 5432)?;
        let postgres_user = env_or_default("POSTGRES_USER", "gradepoint");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "gradepoint");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", 6379)?;
        let redis_db = env_number("REDIS_DB", 0)?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let model = env_or_default("GRADING_MODEL", "gpt-4o-mini");
        let max_tokens = env_number("GRADING_MAX_TOKENS", 1024)?;
        let request_timeout = env_number("GRADING_REQUEST_TIMEOUT", 60)?;
        let temperature = env_number("GRADING_TEMPERATURE", 0.0)?;

        let auto_save_interval_seconds = env_number("AUTO_SAVE_INTERVAL_SECONDS", 30)?;
        let invite_expire_hours = env_number("INVITE_EXPIRE_HOURS", 168)?;

        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "admin@gradepoint.local").to_lowercase();
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("GRADEPOINT_LOG_LEVEL", "info");
        let json = env_flag("GRADEPOINT_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            grading: GradingSettings {
                openai_api_key,
                openai_base_url,
                model,
                max_tokens,
                request_timeout,
                temperature,
            },
            exam: ExamSettings { auto_save_interval_seconds, invite_expire_hours },
            admin: AdminSettings { first_superuser_email, first_superuser_password },
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

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.auto_save_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AUTO_SAVE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.exam.invite_expire_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "INVITE_EXPIRE_HOURS",
                value: "0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.grading.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "GRADING_TEMPERATURE",
                value: self.grading.temperature.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }
        if !self.grading.oracle_enabled() {
            tracing::warn!(
                "OPENAI_API_KEY not configured; open-ended answers will be left for manual review"
            );
        }

        Ok(())
    }
}
