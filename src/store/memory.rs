use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::models::{
    Appointment, Department, DepartmentTransfer, Doctor, NewAppointment, NewDepartmentTransfer,
};
use crate::store::{AppointmentStore, DepartmentDirectory, DoctorDirectory, TransferStore};

/// In-process backend. Backs the test suites and small single-node setups
/// that don't want Postgres; ids come from one monotonic counter.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_next_transfer: AtomicBool,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    appointments: BTreeMap<i64, Appointment>,
    doctors: BTreeMap<i64, Doctor>,
    departments: BTreeMap<i64, Department>,
    transfers: BTreeMap<i64, DepartmentTransfer>,
}

impl Inner {
    fn alloc(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a doctor under its own id, overwriting any previous row.
    pub fn put_doctor(&self, doctor: Doctor) -> Result<(), ServiceError> {
        let mut inner = self.locked()?;
        inner.next_id = inner.next_id.max(doctor.id);
        inner.doctors.insert(doctor.id, doctor);
        Ok(())
    }

    /// Seed a department under its own id, overwriting any previous row.
    pub fn put_department(&self, department: Department) -> Result<(), ServiceError> {
        let mut inner = self.locked()?;
        inner.next_id = inner.next_id.max(department.id);
        inner.departments.insert(department.id, department);
        Ok(())
    }

    /// Makes the next transfer commit fail before touching any row.
    pub fn fail_next_transfer_commit(&self) {
        self.fail_next_transfer.store(true, Ordering::SeqCst);
    }

    fn locked(&self) -> Result<MutexGuard<'_, Inner>, ServiceError> {
        self.inner
            .lock()
            .map_err(|_| ServiceError::Unexpected("store mutex poisoned".into()))
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, ServiceError> {
        let mut inner = self.locked()?;
        let id = inner.alloc();
        let appointment = Appointment {
            id,
            doctor_id: new.doctor_id,
            patient_id: new.patient_id,
            scheduled_at: new.scheduled_at,
            status: new.status,
            notes: new.notes,
        };
        inner.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, ServiceError> {
        let mut inner = self.locked()?;
        if !inner.appointments.contains_key(&appointment.id) {
            return Err(ServiceError::appointment_not_found(appointment.id));
        }
        inner
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, ServiceError> {
        Ok(self.locked()?.appointments.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, ServiceError> {
        Ok(self.locked()?.appointments.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.locked()?.appointments.remove(&id).is_some())
    }

    async fn booked_between(
        &self,
        doctor_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<Vec<Appointment>, ServiceError> {
        let inner = self.locked()?;
        let mut hits: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| a.scheduled_at >= from && a.scheduled_at <= to)
            .filter(|a| exclude != Some(a.id))
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.scheduled_at);
        Ok(hits)
    }

    async fn upcoming_for_doctor(
        &self,
        doctor_id: i64,
        after: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, ServiceError> {
        let inner = self.locked()?;
        let mut hits: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.scheduled_at > after)
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.scheduled_at);
        Ok(hits)
    }

    async fn history_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, ServiceError> {
        let inner = self.locked()?;
        let mut hits: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|a| a.patient_id == Some(patient_id))
            .cloned()
            .collect();
        hits.sort_by_key(|a| std::cmp::Reverse(a.scheduled_at));
        Ok(hits)
    }
}

#[async_trait]
impl TransferStore for MemoryStore {
    async fn commit(
        &self,
        new: NewDepartmentTransfer,
    ) -> Result<DepartmentTransfer, ServiceError> {
        if self.fail_next_transfer.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Unexpected("simulated storage failure".into()));
        }

        let mut inner = self.locked()?;
        if !inner.doctors.contains_key(&new.doctor_id) {
            return Err(ServiceError::NotFound(
                "DOCTOR_NOT_FOUND",
                format!("doctor not found: {}", new.doctor_id),
            ));
        }

        // Single critical section: the doctor repoint and the log insert are
        // visible together or not at all.
        let id = inner.alloc();
        if let Some(doctor) = inner.doctors.get_mut(&new.doctor_id) {
            doctor.department_id = Some(new.to_department_id);
        }
        let record = DepartmentTransfer {
            id,
            doctor_id: new.doctor_id,
            from_department_id: new.from_department_id,
            to_department_id: new.to_department_id,
            transfer_date: new.transfer_date,
        };
        inner.transfers.insert(id, record.clone());
        Ok(record)
    }

    async fn history_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<DepartmentTransfer>, ServiceError> {
        let inner = self.locked()?;
        let mut hits: Vec<DepartmentTransfer> = inner
            .transfers
            .values()
            .filter(|t| t.doctor_id == doctor_id)
            .cloned()
            .collect();
        hits.sort_by_key(|t| std::cmp::Reverse((t.transfer_date, t.id)));
        Ok(hits)
    }
}

#[async_trait]
impl DoctorDirectory for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Doctor>, ServiceError> {
        Ok(self.locked()?.doctors.get(&id).cloned())
    }
}

#[async_trait]
impl DepartmentDirectory for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Department>, ServiceError> {
        Ok(self.locked()?.departments.get(&id).cloned())
    }
}
