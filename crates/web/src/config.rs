use std::{env, fmt::Display, str::FromStr};

use platform::client::DEFAULT_SESSION_TTL_HOURS;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_STATIC_DIR: &str = "./resources/www/";

/// Credentials of the administrator created on start-up.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_address: String,
    pub static_dir: String,
    pub session_ttl_hours: i64,
    /// sets the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
    pub admin: Option<AdminBootstrap>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            static_dir: DEFAULT_STATIC_DIR.to_owned(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: false,
            admin: None,
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
            session_ttl_hours: parsed_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)
                .max(1),
            cookie_secure: parsed_var("COOKIE_SECURE", defaults.cookie_secure),
            admin: admin_from_env(),
        }
    }
}

fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!("invalid value {:?} for {}, using {}", value, name, default);
            default
        }),
        Err(_) => default,
    }
}

fn admin_from_env() -> Option<AdminBootstrap> {
    let email = env::var("ADMIN_EMAIL").ok()?;
    let Ok(password) = env::var("ADMIN_PASSWORD") else {
        log::warn!("ADMIN_EMAIL is set without ADMIN_PASSWORD, no administrator is created");
        return None;
    };
    Some(AdminBootstrap {
        email,
        password,
        full_name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrateur".to_owned()),
    })
}
