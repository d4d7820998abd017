use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::models::{Appointment, AppointmentChanges, BookingRequest, NewAppointment};
use crate::store::AppointmentStore;

/// Fixed length of a booked slot.
pub const SLOT_MINUTES: i64 = 30;

const DEFAULT_STATUS: &str = "SCHEDULED";

/// Booking, conflict detection, and lifecycle queries for doctor/patient
/// appointments.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Books a new appointment. The doctor and the time are mandatory;
    /// the slot must be free of the doctor's other appointments.
    pub async fn book(&self, req: BookingRequest) -> Result<Appointment, ServiceError> {
        let (doctor_id, scheduled_at) = match (req.doctor_id, req.scheduled_at) {
            (Some(d), Some(t)) => (d, t),
            _ => {
                return Err(ServiceError::InvalidArgument(
                    "VALIDATION_ERROR",
                    "doctor_id and scheduled_at are required".into(),
                ));
            }
        };

        self.ensure_slot_free(doctor_id, scheduled_at, None).await?;

        let stored = self
            .store
            .insert(NewAppointment {
                doctor_id,
                patient_id: req.patient_id,
                scheduled_at,
                status: req.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
                notes: req.notes,
            })
            .await?;

        info!(appointment_id = stored.id, doctor_id, "appointment booked");
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<Appointment>, ServiceError> {
        self.store.list_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Appointment, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::appointment_not_found(id))
    }

    /// The doctor's appointments strictly after now, soonest first.
    pub async fn upcoming_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<Appointment>, ServiceError> {
        self.store.upcoming_for_doctor(doctor_id, Utc::now()).await
    }

    /// The patient's appointments, most recent first.
    pub async fn history_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Appointment>, ServiceError> {
        self.store.history_for_patient(patient_id).await
    }

    // Absent ids surface as NotFound, the same policy every other record
    // type's delete path follows.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if !self.store.delete_by_id(id).await? {
            return Err(ServiceError::appointment_not_found(id));
        }
        Ok(())
    }

    /// Rewrites the time/status/notes subset the caller supplied, then re-runs
    /// the booking conflict check for the resulting slot. The record's own row
    /// is skipped in that check, so an untouched time does not clash with
    /// itself.
    pub async fn update(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, ServiceError> {
        let mut appointment = self.get_by_id(id).await?;

        if let Some(t) = changes.scheduled_at {
            appointment.scheduled_at = t;
        }
        if let Some(s) = changes.status {
            appointment.status = s;
        }
        if let Some(n) = changes.notes {
            appointment.notes = Some(n);
        }

        self.ensure_slot_free(
            appointment.doctor_id,
            appointment.scheduled_at,
            Some(appointment.id),
        )
        .await?;

        self.store.update(&appointment).await
    }

    // The check and the subsequent insert are separate store calls; see the
    // race note on `booked_between` tests and the unique index in the schema.
    async fn ensure_slot_free(
        &self,
        doctor_id: i64,
        start: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<(), ServiceError> {
        let (from, to) = slot_window(start);
        let clashes = self.store.booked_between(doctor_id, from, to, exclude).await?;
        if !clashes.is_empty() {
            warn!(doctor_id, %start, clashes = clashes.len(), "slot already taken");
            return Err(ServiceError::doctor_double_booked());
        }
        Ok(())
    }
}

/// Closed interval of start times that clash with a slot beginning at `start`.
/// Slots are `SLOT_MINUTES` long, so any appointment starting within one slot
/// length on either side overlaps; both bounds are inclusive, which makes a
/// start at exactly one slot's distance clash as well.
fn slot_window(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let slot = Duration::minutes(SLOT_MINUTES);
    (start - slot, start + slot)
}
