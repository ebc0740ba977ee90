use crate::contact_directory::{ContactDirectory, InMemoryContactDirectory, PatientContact};
use uuid::Uuid;

pub struct DomainStubs;

impl DomainStubs {
    /// Crea un directorio en memoria pre-poblado con dos pacientes de
    /// ejemplo: uno con email del propietario y otro sin él.
    pub fn sample_directory() -> (InMemoryContactDirectory, Uuid, Uuid) {
        let dir = InMemoryContactDirectory::new();
        let with_email = Uuid::new_v4();
        let without_email = Uuid::new_v4();
        let _ = dir.upsert_contact(PatientContact { patient_id: with_email,
                                                    pet_name: "Molly".into(),
                                                    owner_name: "Ana López".into(),
                                                    owner_email: Some("ana@example.com".into()),
                                                    species: Some("Perro".into()) });
        let _ = dir.upsert_contact(PatientContact { patient_id: without_email,
                                                    pet_name: "Michi".into(),
                                                    owner_name: "Luis Pérez".into(),
                                                    owner_email: None,
                                                    species: Some("Gato".into()) });
        (dir, with_email, without_email)
    }
}
