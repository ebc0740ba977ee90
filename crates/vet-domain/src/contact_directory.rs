use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Datos de contacto de un paciente y su propietario, lo mínimo que
/// necesitan los correos y el archivo de calendario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContact {
    pub patient_id: Uuid,
    pub pet_name: String,
    pub owner_name: String,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
}

impl PatientContact {
    /// Valida nombre de mascota/propietario y normaliza el email (vacío =>
    /// `None`).
    pub fn validated(mut self) -> Result<Self, DomainError> {
        self.pet_name = self.pet_name.trim().to_string();
        self.owner_name = self.owner_name.trim().to_string();
        if self.pet_name.is_empty() {
            return Err(DomainError::ValidationError("El nombre de la mascota es obligatorio".to_string()));
        }
        if self.owner_name.is_empty() {
            return Err(DomainError::ValidationError("El nombre del propietario es obligatorio".to_string()));
        }
        self.owner_email = self.owner_email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        if let Some(email) = &self.owner_email {
            if !email.contains('@') {
                return Err(DomainError::ValidationError(format!("Email no válido: {}", email)));
            }
        }
        Ok(self)
    }
}

/// Trait de consulta de contactos de pacientes.
pub trait ContactDirectory: Send + Sync {
    /// Inserta o reemplaza el contacto del paciente.
    fn upsert_contact(&self, contact: PatientContact) -> Result<PatientContact, DomainError>;

    /// Recupera el contacto por id de paciente.
    fn get_contact(&self, patient_id: &Uuid) -> Result<Option<PatientContact>, DomainError>;
}

/// Directorio en memoria (pruebas y wiring rápido).
#[derive(Default)]
pub struct InMemoryContactDirectory {
    pub(crate) contacts: Arc<Mutex<HashMap<Uuid, PatientContact>>>,
}

impl InMemoryContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContactDirectory for InMemoryContactDirectory {
    fn upsert_contact(&self, contact: PatientContact) -> Result<PatientContact, DomainError> {
        let contact = contact.validated()?;
        let mut map = self.contacts
                          .lock()
                          .map_err(|e| DomainError::ExternalError(format!("mutex poisoned: {:?}", e)))?;
        map.insert(contact.patient_id, contact.clone());
        Ok(contact)
    }

    fn get_contact(&self, patient_id: &Uuid) -> Result<Option<PatientContact>, DomainError> {
        let map = self.contacts
                      .lock()
                      .map_err(|e| DomainError::ExternalError(format!("mutex poisoned: {:?}", e)))?;
        Ok(map.get(patient_id).cloned())
    }
}
