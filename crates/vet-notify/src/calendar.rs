// Archivo: calendar.rs
// Propósito: generar archivos iCalendar (RFC 5545) a partir de citas.
// Funciones puras: no hacen E/S ni consultan el reloj.
use chrono::{DateTime, NaiveDateTime, Utc};
use vet_domain::{Appointment, AppointmentKind, PatientContact};

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8; method=REQUEST";
pub const DEFAULT_CLINIC_ADDRESS: &str = "MollyVet - Clínica Veterinaria";
pub const BUNDLE_FILENAME: &str = "mis_citas_mollyvet.ics";

const PRODID: &str = "-//MollyVet//Citas//ES";
const ORGANIZER: &str = "ORGANIZER;CN=MollyVet:mailto:citas@mollyvet.com";

/// Datos de la clínica que acompañan a cada evento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarContext {
    pub clinic_address: String,
    pub frontend_url: String,
}

impl Default for CalendarContext {
    fn default() -> Self {
        Self { clinic_address: DEFAULT_CLINIC_ADDRESS.to_string(),
               frontend_url: "http://localhost:3000".to_string() }
    }
}

/// Archivo generado, listo para adjuntar o descargar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteFile {
    pub filename: String,
    pub content: String,
}

impl InviteFile {
    pub fn bytes(&self) -> Vec<u8> {
        self.content.as_bytes().to_vec()
    }
}

/// Invitación de una sola cita.
pub fn build_invite(appointment: &Appointment, contact: Option<&PatientContact>, ctx: &CalendarContext) -> InviteFile {
    let mut lines = calendar_header("REQUEST");
    push_event(&mut lines, appointment, contact, ctx);
    lines.push("END:VCALENDAR".to_string());
    InviteFile { filename: invite_filename(appointment, contact),
                 content: render(&lines) }
}

/// Un único VCALENDAR con un VEVENT por cita.
pub fn build_calendar(items: &[(Appointment, Option<PatientContact>)], ctx: &CalendarContext) -> InviteFile {
    let mut lines = calendar_header("PUBLISH");
    for (appointment, contact) in items {
        push_event(&mut lines, appointment, contact.as_ref(), ctx);
    }
    lines.push("END:VCALENDAR".to_string());
    InviteFile { filename: BUNDLE_FILENAME.to_string(),
                 content: render(&lines) }
}

/// `cita_<mascota>_<fecha>.ics`, con los espacios del nombre como `_`.
pub fn invite_filename(appointment: &Appointment, contact: Option<&PatientContact>) -> String {
    let pet = pet_name(contact).split_whitespace().collect::<Vec<_>>().join("_");
    format!("cita_{}_{}.ics", pet, appointment.date.format("%Y-%m-%d"))
}

fn pet_name(contact: Option<&PatientContact>) -> &str {
    contact.map(|c| c.pet_name.as_str()).unwrap_or("Mascota")
}

fn calendar_header(method: &str) -> Vec<String> {
    vec!["BEGIN:VCALENDAR".to_string(),
         "VERSION:2.0".to_string(),
         format!("PRODID:{}", PRODID),
         "CALSCALE:GREGORIAN".to_string(),
         format!("METHOD:{}", method)]
}

fn push_event(lines: &mut Vec<String>, a: &Appointment, contact: Option<&PatientContact>, ctx: &CalendarContext) {
    let pet = pet_name(contact);
    let (kind_text, category) = match a.kind {
        AppointmentKind::Medical => ("Médica", "Consulta Veterinaria"),
        AppointmentKind::Grooming => ("de Estética", "Estética Veterinaria"),
    };

    let mut description = format!("Cita {} para {}\n\nTipo: {}\n", kind_text, pet, a.service.calendar_label());
    if let Some(c) = contact {
        description.push_str(&format!("Propietario: {}\n", c.owner_name));
    }
    if let Some(style) = &a.cut_style {
        description.push_str(&format!("Estilo de corte: {}\n", style));
    }
    if let Some(notes) = &a.notes {
        description.push_str(&format!("\nNotas: {}\n", notes));
    }
    description.push_str("\nMollyVet - Sistema de Gestión Veterinaria");

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}@mollyvet.com", a.id));
    lines.push(format!("DTSTAMP:{}", utc_stamp(a.updated_at)));
    lines.push(format!("DTSTART:{}", local_stamp(a.starts_at())));
    lines.push(format!("DTEND:{}", local_stamp(a.ends_at())));
    lines.push(format!("SUMMARY:{}", escape_text(&format!("{} - {}", a.service.calendar_label(), pet))));
    lines.push(format!("DESCRIPTION:{}", escape_text(&description)));
    lines.push(format!("LOCATION:{}", escape_text(&ctx.clinic_address)));
    lines.push("STATUS:CONFIRMED".to_string());
    lines.push("TRANSP:OPAQUE".to_string());
    lines.push(ORGANIZER.to_string());
    lines.push(format!("CATEGORIES:{}", escape_text(category)));
    lines.push(format!("URL:{}/citas", ctx.frontend_url.trim_end_matches('/')));
    push_alarm(lines, "-PT24H", &format!("Recordatorio: Cita de {}", pet));
    push_alarm(lines, "-PT2H", &format!("Recordatorio: Cita de {} en 2 horas", pet));
    lines.push("END:VEVENT".to_string());
}

fn push_alarm(lines: &mut Vec<String>, trigger: &str, text: &str) {
    lines.push("BEGIN:VALARM".to_string());
    lines.push("ACTION:DISPLAY".to_string());
    lines.push(format!("DESCRIPTION:{}", escape_text(text)));
    lines.push(format!("TRIGGER:{}", trigger));
    lines.push("END:VALARM".to_string());
}

fn utc_stamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Hora flotante (sin zona): se interpreta en la zona de quien abre el
/// archivo, que es la de la clínica.
fn local_stamp(ts: NaiveDateTime) -> String {
    ts.format("%Y%m%dT%H%M%S").to_string()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Une las líneas con CRLF y pliega las que superan 75 octetos sin partir
/// caracteres UTF-8.
fn render(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        let mut width = 0;
        for ch in line.chars() {
            let len = ch.len_utf8();
            if width + len > 75 {
                out.push_str("\r\n ");
                width = 1;
            }
            out.push(ch);
            width += len;
        }
        out.push_str("\r\n");
    }
    out
}
