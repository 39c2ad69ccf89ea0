use clap::Parser;

/// Command-line + environment configuration.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Music sharing web application")]
pub struct Args {
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Key signing the session cookie
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Public URL of this site, used as session issuer and reset-link target
    #[arg(long, env = "APP_URL", default_value = "http://localhost:5000")]
    pub app_url: String,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Anon key, subject to row-level security
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: String,

    /// Service-role key used for privileged writes
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: String,

    #[arg(long, env = "MAX_AUDIO_BYTES", default_value_t = 50 * 1024 * 1024)]
    pub max_audio_bytes: u64,

    #[arg(long, env = "MAX_COVER_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_cover_bytes: u64,

    #[arg(long, env = "SIGNED_URL_EXPIRY_SECS", default_value_t = 900)]
    pub signed_url_expiry_secs: u64,

    #[arg(long, env = "REFRESH_BUFFER_SECS", default_value_t = 300)]
    pub refresh_buffer_secs: i64,

    #[arg(long, env = "SESSION_TTL_DAYS", default_value_t = 7)]
    pub session_ttl_days: i64,

    #[arg(long, env = "COOKIE_SECURE", default_value_t = false)]
    pub cookie_secure: bool,

    #[arg(long, env = "ORPHAN_GRACE_SECS", default_value_t = 86_400)]
    pub orphan_grace_secs: i64,

    /// Run the orphan sweep periodically inside the server
    #[arg(long, env = "ORPHAN_SWEEP_INTERVAL_SECS")]
    pub orphan_sweep_interval_secs: Option<u64>,

    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: String,

    /// Run the orphan sweep once and exit
    #[arg(long)]
    pub sweep_orphans: bool,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub audio_bucket: String,
    pub cover_bucket: String,
    pub max_audio_bytes: u64,
    pub max_cover_bytes: u64,
    pub signed_url_expiry_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            audio_bucket: "music".to_string(),
            cover_bucket: "covers".to_string(),
            max_audio_bytes: 50 * 1024 * 1024,
            max_cover_bytes: 10 * 1024 * 1024,
            signed_url_expiry_secs: 900,
        }
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret_key: String,
    pub issuer: String,
    pub refresh_buffer_secs: i64,
    pub ttl_days: i64,
    pub cookie_secure: bool,
}

impl core::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("issuer", &self.issuer)
            .field("refresh_buffer_secs", &self.refresh_buffer_secs)
            .field("ttl_days", &self.ttl_days)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub grace_secs: i64,
    pub interval_secs: Option<u64>,
}

/// Centralized application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_url: String,
    pub static_dir: String,
    pub upload: UploadConfig,
    pub session: SessionConfig,
    pub cleanup: CleanupConfig,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            app_url: args.app_url.trim_end_matches('/').to_string(),
            static_dir: args.static_dir.clone(),
            upload: UploadConfig {
                max_audio_bytes: args.max_audio_bytes,
                max_cover_bytes: args.max_cover_bytes,
                signed_url_expiry_secs: args.signed_url_expiry_secs,
                ..UploadConfig::default()
            },
            session: SessionConfig {
                secret_key: args.secret_key.clone(),
                issuer: args.app_url.trim_end_matches('/').to_string(),
                refresh_buffer_secs: args.refresh_buffer_secs,
                ttl_days: args.session_ttl_days,
                cookie_secure: args.cookie_secure,
            },
            cleanup: CleanupConfig {
                grace_secs: args.orphan_grace_secs,
                interval_secs: args.orphan_sweep_interval_secs,
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            app_url: "http://localhost:5000".to_string(),
            static_dir: "static".to_string(),
            upload: UploadConfig::default(),
            session: SessionConfig {
                secret_key: "test-secret".to_string(),
                issuer: "http://localhost:5000".to_string(),
                refresh_buffer_secs: 300,
                ttl_days: 7,
                cookie_secure: false,
            },
            cleanup: CleanupConfig {
                grace_secs: 86_400,
                interval_secs: None,
            },
        }
    }
}
