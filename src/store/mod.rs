use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::models::{
    Appointment, Department, DepartmentTransfer, Doctor, NewAppointment, NewDepartmentTransfer,
};

pub mod memory;
pub mod postgres;

/// Appointment rows: lookups, the conflict-window query, and single-row writes.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, ServiceError>;

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, ServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, ServiceError>;

    async fn list_all(&self) -> Result<Vec<Appointment>, ServiceError>;

    /// Returns true when a row was actually removed.
    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError>;

    /// The doctor's appointments whose `scheduled_at` lies in `[from, to]`,
    /// both bounds inclusive. `exclude` drops one appointment id from the
    /// result (used when re-checking a record against its own slot).
    async fn booked_between(
        &self,
        doctor_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<Vec<Appointment>, ServiceError>;

    /// Appointments strictly after `after`, ascending by time.
    async fn upcoming_for_doctor(
        &self,
        doctor_id: i64,
        after: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, ServiceError>;

    /// The patient's appointments, newest first.
    async fn history_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, ServiceError>;
}

/// Transfer log plus the doctor-repointing write that must land with it.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Repoints the doctor's `department_id` to `new.to_department_id` and
    /// appends the log entry. Both writes land or neither does.
    async fn commit(&self, new: NewDepartmentTransfer)
    -> Result<DepartmentTransfer, ServiceError>;

    /// Transfer records for the doctor, newest first (id breaks same-day ties).
    async fn history_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<DepartmentTransfer>, ServiceError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Doctor>, ServiceError>;
}

#[async_trait]
pub trait DepartmentDirectory: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Department>, ServiceError>;
}
