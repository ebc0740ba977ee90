//! Crate `vet-notify` — notificaciones de citas
//!
//! - `calendar`: archivos .ics (una cita o varias).
//! - `templates`: correos de confirmación y recordatorio.
//! - `mailer`: transporte (`SmtpMailer` con lettre, `LogMailer`).
//! - `dispatcher`: `EmailDispatcher`, implementación de `lifecycle::Notifier`.
//! - `reminders`: pasada diaria de recordatorios.
pub mod calendar;
pub mod config;
pub mod dispatcher;
pub mod mailer;
pub mod reminders;
pub mod templates;

pub use calendar::{build_calendar, build_invite, CalendarContext, InviteFile, CALENDAR_CONTENT_TYPE};
pub use config::{NotifyConfig, SmtpConfig};
pub use dispatcher::EmailDispatcher;
pub use mailer::{LogMailer, MailError, Mailer, MemoryMailer, OutgoingEmail, SmtpMailer};
pub use reminders::{send_due_reminders, ReminderSummary};
pub use templates::{confirmation_email, reminder_email, EmailContent};
