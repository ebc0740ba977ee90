// Archivo: mailer.rs
// Propósito: transporte de correo. `SmtpMailer` usa lettre sobre tokio;
// `LogMailer` sólo registra y se usa cuando no hay SMTP configurado.
use crate::calendar::{InviteFile, CALENDAR_CONTENT_TYPE};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailError {
    #[error("Dirección no válida: {0}")]
    Address(String),
    #[error("No se pudo construir el mensaje: {0}")]
    Build(String),
    #[error("Error SMTP: {0}")]
    Transport(String),
}

/// Mensaje listo para enviar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachment: Option<InviteFile>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Envío real por SMTP.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Puerto 465: TLS implícito. Cualquier otro: STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }.map_err(|e| MailError::Transport(e.to_string()))?;
        let mut builder = builder.port(config.port);
        if let (Some(user), Some(pass)) = (&config.user, &config.pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self { transport: builder.build() })
    }
}

/// Construye el mensaje MIME: alternativa texto/HTML y, si hay, el .ics
/// como adjunto.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let from: Mailbox = email.from.parse().map_err(|_| MailError::Address(email.from.clone()))?;
    let to: Mailbox = email.to.parse().map_err(|_| MailError::Address(email.to.clone()))?;
    let alternative = MultiPart::alternative().singlepart(SinglePart::plain(email.text.clone()))
                                              .singlepart(SinglePart::html(email.html.clone()));
    let body = match &email.attachment {
        Some(invite) => {
            let content_type = ContentType::parse(CALENDAR_CONTENT_TYPE).map_err(|e| MailError::Build(e.to_string()))?;
            MultiPart::mixed().multipart(alternative)
                              .singlepart(Attachment::new(invite.filename.clone()).body(invite.bytes(), content_type))
        }
        None => alternative,
    };
    Message::builder().from(from)
                      .to(to)
                      .subject(email.subject.clone())
                      .multipart(body)
                      .map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(&email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        log::info!("correo enviado a {}: {}", email.to, email.subject);
        Ok(())
    }
}

/// Sólo registra el envío. Valida igualmente las direcciones.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        build_message(&email)?;
        log::info!("[sin SMTP] correo para {}: {} (adjunto: {})",
                   email.to,
                   email.subject,
                   email.attachment.as_ref().map(|a| a.filename.as_str()).unwrap_or("-"));
        Ok(())
    }
}

/// Guarda los mensajes en memoria. Para pruebas.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(email);
        Ok(())
    }
}
