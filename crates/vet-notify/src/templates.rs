// Archivo: templates.rs
// Propósito: asunto y cuerpo (HTML + texto plano) de los correos de
// confirmación y recordatorio.
use chrono::{Datelike, Duration, NaiveDate};
use vet_domain::{Appointment, AppointmentKind, ConsultationType, GroomingService, PatientContact, ServiceType};

pub const CONFIRMATION_FROM: &str = "\"MollyVet\" <citas@mollyvet.com>";
pub const REMINDER_FROM: &str = "\"MollyVet Recordatorios\" <recordatorios@mollyvet.com>";

/// Correo ya renderizado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

struct Theme {
    icon: &'static str,
    primary: &'static str,
    secondary: &'static str,
}

fn theme(kind: AppointmentKind) -> Theme {
    match kind {
        AppointmentKind::Medical => Theme { icon: "🏥",
                                            primary: "#FF7600",
                                            secondary: "#e60d0d" },
        AppointmentKind::Grooming => Theme { icon: "✨",
                                             primary: "#9333EA",
                                             secondary: "#C026D3" },
    }
}

const WEEKDAYS: [&str; 7] = ["lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo"];
const MONTHS: [&str; 12] = ["enero",
                            "febrero",
                            "marzo",
                            "abril",
                            "mayo",
                            "junio",
                            "julio",
                            "agosto",
                            "septiembre",
                            "octubre",
                            "noviembre",
                            "diciembre"];

/// `martes, 10 de junio de 2030`
pub fn long_date(date: NaiveDate) -> String {
    format!("{}, {} de {} de {}",
            WEEKDAYS[date.weekday().num_days_from_monday() as usize],
            date.day(),
            MONTHS[date.month0() as usize],
            date.year())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn detail_row(label: &str, value: &str) -> String {
    format!("<tr><td style=\"padding: 6px 0; color: #6B7280; font-size: 14px;\">{}</td>\
             <td style=\"padding: 6px 0; color: #111827; font-size: 15px; font-weight: bold;\">{}</td></tr>",
            label,
            escape_html(value))
}

const VACCINATION_PREP: &[&str] = &["Traer cartilla de vacunación",
                                    "Mascota en ayuno de 4 horas (solo agua)",
                                    "Evitar ejercicio intenso antes de la cita"];
const BATH_PREP: &[&str] = &["Evitar dar de comer 2 horas antes del servicio",
                             "Traer collar o arnés de repuesto",
                             "Avisar sobre cualquier sensibilidad en la piel"];

fn preparation_block(service: ServiceType) -> Option<(&'static str, &'static [&'static str])> {
    match service {
        ServiceType::Medical(ConsultationType::Vaccination) => Some(("💉 Preparación para la vacunación:", VACCINATION_PREP)),
        ServiceType::Grooming(GroomingService::Bath) | ServiceType::Grooming(GroomingService::BathAndHaircut) => {
            Some(("✨ Recomendaciones:", BATH_PREP))
        }
        _ => None,
    }
}

fn layout(t: &Theme, title: &str, heading: &str, body: &str) -> String {
    format!("<!DOCTYPE html>\n<html lang=\"es\">\n<head><meta charset=\"UTF-8\"><title>{title}</title></head>\n\
             <body style=\"margin: 0; padding: 0; background-color: #f5f5f5; font-family: Arial, sans-serif;\">\n\
             <div style=\"max-width: 600px; margin: 0 auto;\">\n\
             <div style=\"background: linear-gradient(-45deg, {p} 0%, {s} 100%); text-align: center; padding: 40px 20px; color: #ffffff;\">\
             <h1 style=\"margin: 0; font-size: 28px;\">{icon} MollyVet</h1>\
             <p style=\"margin: 10px 0 0; font-size: 16px;\">{heading}</p></div>\n\
             <div style=\"background-color: #ffffff; padding: 40px 30px;\">\n{body}\n</div>\n\
             <div style=\"text-align: center; padding: 20px; color: #9CA3AF; font-size: 12px;\">MollyVet - Sistema de Gestión Veterinaria</div>\n\
             </div>\n</body>\n</html>\n",
            title = title,
            p = t.primary,
            s = t.secondary,
            icon = t.icon,
            heading = heading,
            body = body)
}

fn owner_and_pet(contact: &PatientContact) -> (String, String) {
    (escape_html(&contact.owner_name), escape_html(&contact.pet_name))
}

/// Correo de confirmación de cita.
pub fn confirmation_email(appointment: &Appointment, contact: &PatientContact, frontend_url: &str) -> EmailContent {
    let t = theme(appointment.kind);
    let kind_text = appointment.kind.display_name();
    let date = long_date(appointment.date);
    let time = appointment.time.format("%H:%M").to_string();
    let service = appointment.service.calendar_label();
    let (owner, pet) = owner_and_pet(contact);
    let base = frontend_url.trim_end_matches('/');

    let mut rows = String::new();
    rows.push_str(&detail_row("🐾 Mascota", &contact.pet_name));
    rows.push_str(&detail_row("📅 Fecha", &date));
    rows.push_str(&detail_row("⏰ Hora", &time));
    rows.push_str(&detail_row("Servicio", service));
    if let Some(minutes) = appointment.estimated_duration {
        rows.push_str(&detail_row("⌛ Duración", &format!("{} min", minutes)));
    }
    if let Some(style) = &appointment.cut_style {
        rows.push_str(&detail_row("Estilo de corte", style));
    }

    let mut body = format!("<h2 style=\"margin: 0; font-size: 22px; color: #333333;\">Hola {}</h2>\n\
                            <p style=\"color: #666666; font-size: 16px;\">La cita de <strong>{}</strong> ha sido confirmada.</p>\n\
                            <table role=\"presentation\" width=\"100%\">{}</table>\n",
                           owner, pet, rows);
    if let Some(notes) = &appointment.notes {
        body.push_str(&format!("<p style=\"background-color: #FEF3C7; padding: 15px; border-radius: 4px;\">📝 {}</p>\n",
                               escape_html(notes)));
    }
    if let Some((title, items)) = preparation_block(appointment.service) {
        let list: String = items.iter().map(|i| format!("<li>{}</li>", i)).collect();
        body.push_str(&format!("<p style=\"font-weight: bold;\">{}</p><ul>{}</ul>\n", title, list));
    }
    body.push_str(&format!("<p style=\"text-align: center;\">\
                            <a href=\"{base}/confirmar-cita/{id}\" style=\"color: #10B981;\">Confirmar asistencia</a> · \
                            <a href=\"{base}/reagendar-cita/{id}\" style=\"color: #3B82F6;\">Reagendar</a> · \
                            <a href=\"{base}/cancelar-cita/{id}\" style=\"color: #EF4444;\">Cancelar</a></p>\n\
                            <p style=\"color: #6B7280; font-size: 13px;\">Adjuntamos el archivo de calendario para que \
                            agregues la cita a tu agenda.</p>",
                           base = base,
                           id = appointment.id));

    EmailContent { subject: format!("{} Confirmación de {} - {}", t.icon, kind_text, contact.pet_name),
                   html: layout(&t, "Confirmación de Cita - MollyVet", kind_text, &body),
                   text: format!("Hola {}, tu cita para {} ha sido confirmada. Fecha: {} a las {}. Servicio: {}.",
                                 contact.owner_name, contact.pet_name, date, time, service) }
}

/// Correo de recordatorio. "Mañana" si la cita es el día siguiente a
/// `today`, "Próxima" en otro caso.
pub fn reminder_email(appointment: &Appointment,
                      contact: &PatientContact,
                      clinic_address: &str,
                      frontend_url: &str,
                      today: NaiveDate)
                      -> EmailContent {
    let t = theme(appointment.kind);
    let is_tomorrow = appointment.date == today + Duration::days(1);
    let date = long_date(appointment.date);
    let time = appointment.time.format("%H:%M").to_string();
    let (owner, pet) = owner_and_pet(contact);
    let when = if is_tomorrow { "mañana" } else { "próximamente" };

    let body = format!("<h2 style=\"margin: 0; font-size: 22px; color: #333333;\">Hola {owner} 👋</h2>\n\
                        <p style=\"color: #666666; font-size: 16px;\">Este es un recordatorio amigable de que \
                        <strong>{pet}</strong> tiene una cita {when}.</p>\n\
                        <div style=\"background-color: {p}; border-radius: 12px; padding: 30px; text-align: center; color: #ffffff;\">\
                        <p style=\"margin: 0; font-size: 14px; text-transform: uppercase;\">{kind}</p>\
                        <p style=\"margin: 0; font-size: 48px; font-weight: bold;\">{time}</p>\
                        <p style=\"margin: 0; font-size: 16px;\">{date}</p></div>\n\
                        <p style=\"text-align: center;\"><a href=\"{base}/confirmar-cita/{id}\" style=\"color: #10B981;\">\
                        ✓ Confirmar Asistencia</a></p>\n\
                        <p style=\"text-align: center; color: #374151;\">Ubicación: {address}</p>",
                       owner = owner,
                       pet = pet,
                       when = when,
                       p = t.primary,
                       kind = appointment.kind.display_name(),
                       time = time,
                       date = date,
                       base = frontend_url.trim_end_matches('/'),
                       id = appointment.id,
                       address = escape_html(clinic_address));
    let heading = if is_tomorrow { "¡Tu cita es mañana!" } else { "Tienes una cita próxima" };

    EmailContent { subject: format!("⏰ Recordatorio: Cita {} - {}",
                                    if is_tomorrow { "Mañana" } else { "Próxima" },
                                    contact.pet_name),
                   html: layout(&t, "Recordatorio de Cita - MollyVet", heading, &body),
                   text: format!("Hola {}, te recordamos que {} tiene una cita {} el {} a las {}.",
                                 contact.owner_name, contact.pet_name, when, date, time) }
}
