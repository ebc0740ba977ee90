//! Crate `lifecycle` — ciclo de vida de las citas
//!
//! Define la máquina de estados (`LifecycleEngine`), el contrato de
//! persistencia `AppointmentRepository`, el contrato de notificación
//! `Notifier` y el servicio orquestador `AppointmentService`. También expone
//! implementaciones en memoria útiles para pruebas.
//!
//! Diseño resumido:
//! - Estados cerrados: `programada -> confirmada -> en_curso -> completada`,
//!   con `cancelada` y `no_asistio` como salidas; los terminales no tienen
//!   sucesores.
//! - Locking optimista: `save` se condiciona al estado leído y devuelve
//!   `PersistResult::Conflict` si otro proceso se adelantó. Las
//!   reprogramaciones además comparan `updated_at`.
//! - Reservar y reprogramar comprueban el horario en la misma escritura.
//! - La confirmación se notifica una vez por transición y su fallo nunca
//!   deshace el cambio de estado.
//!
//! Ejemplo rápido:
//! ```rust
//! use lifecycle::{AppointmentService, InMemoryAppointmentRepository, NoopNotifier};
//! use std::sync::Arc;
//! let repo = Arc::new(InMemoryAppointmentRepository::new());
//! let service = AppointmentService::new(repo, Arc::new(NoopNotifier));
//! assert!(service.legal_transitions(vet_domain::AppointmentStatus::Completed).is_empty());
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use notifier::*;
pub use repository::*;
pub use service::*;
pub use stubs::*;
