//! Process configuration read from the environment

use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, bail};
use auth::{AuthConfig, GoogleSettings, SmtpSettings};
use base64::Engine;
use base64::engine::general_purpose;

const DEV_ACCESS_SECRET: &str = "dev-access-secret-change-me";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-me";

/// Everything `main` needs to wire the server
pub struct ApiConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub production: bool,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub google: GoogleSettings,
    /// `None` selects the logging mailer
    pub smtp: Option<SmtpSettings>,
    pub auth: AuthConfig,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|| default.to_string())
}

/// Comma-separated proxy addresses allowed to set forwarding headers
fn parse_trusted_proxies(raw: &str) -> anyhow::Result<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .with_context(|| format!("TRUSTED_PROXIES entry {entry:?} is not an IP address"))
        })
        .collect()
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let production = var_or("APP_ENV", "development") == "production";

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "5")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?;
        let bind_addr = var_or("BIND_ADDR", "0.0.0.0:31113")
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let frontend_url = var_or("FRONTEND_URL", "http://localhost:40922");
        let frontend_origins = var_or(
            "FRONTEND_ORIGINS",
            "http://localhost:40922,http://127.0.0.1:40922",
        )
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

        let (jwt_access_secret, jwt_refresh_secret) = if production {
            let access = var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET must be set")?;
            let refresh = var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET must be set")?;
            if access == refresh {
                bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
            }
            (access, refresh)
        } else {
            (
                var_or("JWT_ACCESS_SECRET", DEV_ACCESS_SECRET),
                var_or("JWT_REFRESH_SECRET", DEV_REFRESH_SECRET),
            )
        };

        let mut auth = if production {
            let secret_b64 = var("SESSION_SECRET").context("SESSION_SECRET must be set")?;
            let bytes = general_purpose::STANDARD
                .decode(secret_b64.trim())
                .context("SESSION_SECRET must be base64")?;
            let secret: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("SESSION_SECRET must decode to 32 bytes"))?;
            AuthConfig {
                session_secret: secret,
                ..AuthConfig::default()
            }
        } else {
            AuthConfig::development()
        };

        auth.frontend_url = frontend_url.clone();
        auth.cookie_domain = var("COOKIE_DOMAIN");
        auth.password_pepper = var("PASSWORD_PEPPER").map(String::into_bytes);
        auth.mail_from = var_or("MAIL_FROM", &auth.mail_from);
        auth.trusted_proxies = parse_trusted_proxies(&var_or("TRUSTED_PROXIES", ""))?;

        let google = match (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => GoogleSettings {
                client_id,
                client_secret,
                redirect_url: var("GOOGLE_REDIRECT_URL").context("GOOGLE_REDIRECT_URL must be set")?,
            },
            _ if production => bail!("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set"),
            _ => {
                tracing::warn!("Google credentials not configured; Google sign-in will fail");
                GoogleSettings {
                    client_id: "unconfigured".to_string(),
                    client_secret: "unconfigured".to_string(),
                    redirect_url: var_or(
                        "GOOGLE_REDIRECT_URL",
                        "http://localhost:31113/auth/google/callback",
                    ),
                }
            }
        };

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: var_or("SMTP_PORT", "587")
                    .parse()
                    .context("SMTP_PORT must be a number")?,
                username: var_or("SMTP_USERNAME", ""),
                password: var_or("SMTP_PASSWORD", ""),
            }),
            None if production => bail!("SMTP_HOST must be set"),
            None => None,
        };

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            frontend_origins,
            production,
            jwt_access_secret,
            jwt_refresh_secret,
            google,
            smtp,
            auth,
        })
    }
}
