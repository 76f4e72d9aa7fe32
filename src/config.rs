use std::env;

/// Upper bound on session lifetime; longer values are clamped.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

const PLACEHOLDER_SECRET: &str = "changeme";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub admin_email: String,
    pub admin_password: String,
    pub bcrypt_cost: u32,
    pub assistant_provider: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub assistant_timeout_secs: u64,
    /// Lets the server start with the placeholder secrets. Local development only.
    pub allow_default_secrets: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "bikeservice.db".to_string(),
            session_secret: PLACEHOLDER_SECRET.to_string(),
            session_ttl_hours: 24,
            admin_email: "admin@bikeservice.local".to_string(),
            admin_password: PLACEHOLDER_SECRET.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            assistant_provider: "ollama".to_string(),
            groq_api_key: String::new(),
            groq_model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
            assistant_timeout_secs: 20,
            allow_default_secrets: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_secret: env::var("SESSION_SECRET").unwrap_or(defaults.session_secret),
            session_ttl_hours: parsed("SESSION_TTL_HOURS", defaults.session_ttl_hours)
                .clamp(1, MAX_SESSION_TTL_HOURS),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            bcrypt_cost: parsed("BCRYPT_COST", defaults.bcrypt_cost),
            assistant_provider: env::var("ASSISTANT_PROVIDER")
                .unwrap_or(defaults.assistant_provider),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL").unwrap_or(defaults.groq_model),
            ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            assistant_timeout_secs: parsed("ASSISTANT_TIMEOUT_SECS", defaults.assistant_timeout_secs),
            allow_default_secrets: parsed("ALLOW_DEFAULT_SECRETS", defaults.allow_default_secrets),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS))
    }

    pub fn assistant_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.assistant_timeout_secs)
    }

    /// True while the shipped placeholder secrets are still in use.
    pub fn uses_default_secrets(&self) -> bool {
        self.session_secret == PLACEHOLDER_SECRET || self.admin_password == PLACEHOLDER_SECRET
    }

    /// Refuses the placeholder secrets unless `ALLOW_DEFAULT_SECRETS=true`.
    pub fn check_secrets(&self) -> anyhow::Result<()> {
        if !self.uses_default_secrets() {
            return Ok(());
        }
        anyhow::ensure!(
            self.allow_default_secrets,
            "SESSION_SECRET and ADMIN_PASSWORD must be changed from their defaults \
             (set ALLOW_DEFAULT_SECRETS=true for local development)"
        );
        tracing::warn!("running with default SESSION_SECRET or ADMIN_PASSWORD");
        Ok(())
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ttl_is_clamped() {
        let mut config = AppConfig::default();
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));

        config.session_ttl_hours = i64::MAX;
        assert_eq!(config.session_ttl(), chrono::Duration::hours(MAX_SESSION_TTL_HOURS));

        config.session_ttl_hours = -5;
        assert_eq!(config.session_ttl(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_default_secrets_refused_unless_allowed() {
        let mut config = AppConfig::default();
        assert!(config.uses_default_secrets());
        assert!(config.check_secrets().is_err());

        config.allow_default_secrets = true;
        assert!(config.check_secrets().is_ok());

        let config = AppConfig {
            session_secret: "s3cret-value".to_string(),
            admin_password: "AdminPass1".to_string(),
            ..AppConfig::default()
        };
        assert!(config.check_secrets().is_ok());
    }
}
