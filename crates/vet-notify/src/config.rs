// Archivo: config.rs
// Propósito: configuración de notificaciones leída del entorno.
use crate::calendar::{CalendarContext, DEFAULT_CLINIC_ADDRESS};

/// Servidor SMTP. Presente sólo si `EMAIL_HOST` está definido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub smtp: Option<SmtpConfig>,
    /// Remitente único que sustituye a los predeterminados (`EMAIL_FROM`).
    pub sender: Option<String>,
    pub calendar: CalendarContext,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { smtp: None,
               sender: None,
               calendar: CalendarContext::default() }
    }
}

impl NotifyConfig {
    /// Lee `EMAIL_HOST`, `EMAIL_PORT` (587 por defecto), `EMAIL_USER`,
    /// `EMAIL_PASS`, `EMAIL_FROM`, `CLINIC_ADDRESS` y `FRONTEND_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Self
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let smtp = get("EMAIL_HOST").map(|host| SmtpConfig { host,
                                                             port: get("EMAIL_PORT").and_then(|p| p.parse().ok())
                                                                                    .unwrap_or(587),
                                                             user: get("EMAIL_USER"),
                                                             pass: get("EMAIL_PASS") });
        let defaults = CalendarContext::default();
        let calendar = CalendarContext { clinic_address: get("CLINIC_ADDRESS").unwrap_or_else(|| DEFAULT_CLINIC_ADDRESS.to_string()),
                                         frontend_url: get("FRONTEND_URL").unwrap_or(defaults.frontend_url) };
        Self { smtp,
               sender: get("EMAIL_FROM"),
               calendar }
    }
}
