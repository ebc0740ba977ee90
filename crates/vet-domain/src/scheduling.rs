// scheduling.rs
use chrono::{Duration, NaiveTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Rejilla de horarios reservables de la clínica: desde `opens_at` hasta
/// antes de `closes_at`, en intervalos de `step_minutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGrid {
  pub opens_at: NaiveTime,
  pub closes_at: NaiveTime,
  pub step_minutes: u32,
}

static DEFAULT_SLOTS: Lazy<Vec<NaiveTime>> = Lazy::new(|| SlotGrid::default().compute());

impl Default for SlotGrid {
  fn default() -> Self {
    SlotGrid { opens_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
               closes_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
               step_minutes: 30 }
  }
}

impl SlotGrid {
  /// Todos los horarios de la rejilla, en orden.
  pub fn slots(&self) -> Vec<NaiveTime> {
    if *self == SlotGrid::default() {
      return DEFAULT_SLOTS.clone();
    }
    self.compute()
  }

  fn compute(&self) -> Vec<NaiveTime> {
    let mut out = Vec::new();
    if self.step_minutes == 0 {
      return out;
    }
    let step = Duration::minutes(i64::from(self.step_minutes));
    let mut t = self.opens_at;
    while t < self.closes_at {
      out.push(t);
      let (next, wrapped) = t.overflowing_add_signed(step);
      if wrapped != 0 {
        break;
      }
      t = next;
    }
    out
  }

  /// Horarios libres: la rejilla menos los ocupados.
  pub fn available(&self, occupied: &[NaiveTime]) -> Vec<NaiveTime> {
    self.slots().into_iter().filter(|t| !occupied.contains(t)).collect()
  }
}
