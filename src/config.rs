// Archivo: config.rs
// Propósito: configuración del servidor leída del entorno (y de `.env`).
use anyhow::Context;
use std::net::SocketAddr;
use vet_notify::NotifyConfig;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_url: String,
    pub cors_allow: Vec<String>,
    /// Hora local (0-23) de la pasada diaria de recordatorios.
    pub reminder_hour: u32,
    pub reminders_enabled: bool,
    pub notify: NotifyConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("VET_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".to_string())
                                                                       .parse()
                                                                       .context("VET_LISTEN_ADDR no válido")?;
        let db_url = std::env::var("VET_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                                .unwrap_or_else(|_| "./db/mollyvet.db".into());
        let cors_allow = std::env::var("VET_CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".into())
                                                                .split(',')
                                                                .map(|s| s.trim().to_string())
                                                                .filter(|s| !s.is_empty())
                                                                .collect();
        let reminder_hour = std::env::var("VET_REMINDER_HOUR").ok()
                                                              .and_then(|h| h.trim().parse::<u32>().ok())
                                                              .filter(|h| *h < 24)
                                                              .unwrap_or(9);
        let reminders_enabled = std::env::var("VET_REMINDERS_ENABLED").map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                                                                      .unwrap_or(true);
        Ok(Self { listen_addr,
                  db_url,
                  cors_allow,
                  reminder_hour,
                  reminders_enabled,
                  notify: NotifyConfig::from_env() })
    }

    /// Configuración para pruebas: base en `db_url`, sin SMTP ni
    /// recordatorios.
    pub fn for_database(db_url: impl Into<String>) -> Self {
        Self { listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
               db_url: db_url.into(),
               cors_allow: vec!["*".to_string()],
               reminder_hour: 9,
               reminders_enabled: false,
               notify: NotifyConfig::default() }
    }
}
