// Archivo: dispatcher.rs
// Propósito: `EmailDispatcher`, el `Notifier` que arma los correos (con el
// .ics adjunto) y los entrega mediante un `Mailer`.
use crate::calendar::{build_invite, CalendarContext};
use crate::config::NotifyConfig;
use crate::mailer::{LogMailer, Mailer, OutgoingEmail, SmtpMailer};
use crate::templates::{confirmation_email, reminder_email, CONFIRMATION_FROM, REMINDER_FROM};
use chrono::NaiveDate;
use lifecycle::{Notifier, NotifyError};
use std::sync::Arc;
use vet_domain::{Appointment, ContactDirectory, PatientContact};

/// Despachador de correos.
///
/// `send_confirmation` arma el mensaje en el hilo del llamador y encola el
/// envío en el runtime de tokio actual; el resultado de la entrega sólo se
/// registra en el log.
pub struct EmailDispatcher {
    mailer: Arc<dyn Mailer>,
    contacts: Arc<dyn ContactDirectory>,
    calendar: CalendarContext,
    sender: Option<String>,
}

impl EmailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, contacts: Arc<dyn ContactDirectory>, calendar: CalendarContext) -> Self {
        Self { mailer,
               contacts,
               calendar,
               sender: None }
    }

    /// Elige `SmtpMailer` si hay SMTP configurado y `LogMailer` si no.
    pub fn from_config(config: &NotifyConfig, contacts: Arc<dyn ContactDirectory>) -> Result<Self, NotifyError> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => {
                log::info!("SMTP configurado: {}:{}", smtp.host, smtp.port);
                Arc::new(SmtpMailer::new(smtp).map_err(|e| NotifyError::Unavailable(e.to_string()))?)
            }
            None => {
                log::warn!("EMAIL_HOST no definido: los correos sólo se registrarán en el log");
                Arc::new(LogMailer)
            }
        };
        let mut dispatcher = Self::new(mailer, contacts, config.calendar.clone());
        dispatcher.sender = config.sender.clone();
        Ok(dispatcher)
    }

    pub fn calendar(&self) -> &CalendarContext {
        &self.calendar
    }

    /// Contacto con email; `MissingRecipient` si falta alguno de los dos.
    fn recipient(&self, appointment: &Appointment) -> Result<(PatientContact, String), NotifyError> {
        let contact = self.contacts
                          .get_contact(&appointment.patient_id)
                          .map_err(|e| NotifyError::Unavailable(e.to_string()))?
                          .ok_or_else(|| NotifyError::MissingRecipient(format!("paciente {}", appointment.patient_id)))?;
        let email = contact.owner_email
                           .clone()
                           .ok_or_else(|| NotifyError::MissingRecipient(format!("{} no tiene email", contact.owner_name)))?;
        Ok((contact, email))
    }

    /// Correo de confirmación con la invitación adjunta.
    pub fn confirmation_for(&self, appointment: &Appointment) -> Result<OutgoingEmail, NotifyError> {
        let (contact, to) = self.recipient(appointment)?;
        let content = confirmation_email(appointment, &contact, &self.calendar.frontend_url);
        Ok(OutgoingEmail { from: self.sender.clone().unwrap_or_else(|| CONFIRMATION_FROM.to_string()),
                           to,
                           subject: content.subject,
                           html: content.html,
                           text: content.text,
                           attachment: Some(build_invite(appointment, Some(&contact), &self.calendar)) })
    }

    pub fn reminder_for(&self, appointment: &Appointment, today: NaiveDate) -> Result<OutgoingEmail, NotifyError> {
        let (contact, to) = self.recipient(appointment)?;
        let content = reminder_email(appointment,
                                     &contact,
                                     &self.calendar.clinic_address,
                                     &self.calendar.frontend_url,
                                     today);
        Ok(OutgoingEmail { from: self.sender.clone().unwrap_or_else(|| REMINDER_FROM.to_string()),
                           to,
                           subject: content.subject,
                           html: content.html,
                           text: content.text,
                           attachment: None })
    }

    /// Envía el recordatorio y espera el resultado.
    pub async fn send_reminder(&self, appointment: &Appointment, today: NaiveDate) -> Result<(), NotifyError> {
        let email = self.reminder_for(appointment, today)?;
        self.mailer.send(email).await.map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

impl Notifier for EmailDispatcher {
    fn send_confirmation(&self, appointment: &Appointment) -> Result<(), NotifyError> {
        let email = self.confirmation_for(appointment)?;
        let handle = tokio::runtime::Handle::try_current().map_err(|e| NotifyError::Unavailable(e.to_string()))?;
        let mailer = self.mailer.clone();
        let id = appointment.id;
        handle.spawn(async move {
                  match mailer.send(email).await {
                      Ok(()) => log::info!("confirmación de la cita {} enviada", id),
                      Err(e) => log::warn!("falló el envío de la confirmación de la cita {}: {}", id, e),
                  }
              });
        Ok(())
    }
}
