// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::ServiceError;
use crate::models::{
    Appointment, Department, DepartmentTransfer, Doctor, NewAppointment, NewDepartmentTransfer,
};
use crate::store::{AppointmentStore, DepartmentDirectory, DoctorDirectory, TransferStore};

/// Relational backend over the schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> ServiceError {
    ServiceError::Unexpected(format!("db error: {e}"))
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (doctor_id, patient_id, scheduled_at, status, notes)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING id, doctor_id, patient_id, scheduled_at, status, notes
            "#,
        )
        .bind(new.doctor_id)
        .bind(new.patient_id)
        .bind(new.scheduled_at)
        .bind(&new.status)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET scheduled_at = $2,
                status = $3,
                notes = $4
            WHERE id = $1
            RETURNING id, doctor_id, patient_id, scheduled_at, status, notes
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.scheduled_at)
        .bind(&appointment.status)
        .bind(&appointment.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::appointment_not_found(appointment.id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_id, scheduled_at, status, notes
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_id, scheduled_at, status, notes
            FROM appointments
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        let res = sqlx::query(r#"DELETE FROM appointments WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn booked_between(
        &self,
        doctor_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<Vec<Appointment>, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_id, scheduled_at, status, notes
            FROM appointments
            WHERE doctor_id = $1
              AND scheduled_at BETWEEN $2 AND $3
              AND ($4::bigint IS NULL OR id <> $4)
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn upcoming_for_doctor(
        &self,
        doctor_id: i64,
        after: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_id, scheduled_at, status, notes
            FROM appointments
            WHERE doctor_id = $1
              AND scheduled_at > $2
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(doctor_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn history_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, ServiceError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_id, scheduled_at, status, notes
            FROM appointments
            WHERE patient_id = $1
            ORDER BY scheduled_at DESC
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl TransferStore for PgStore {
    async fn commit(
        &self,
        new: NewDepartmentTransfer,
    ) -> Result<DepartmentTransfer, ServiceError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r#"
            UPDATE doctors
            SET department_id = $2
            WHERE id = $1
            "#,
        )
        .bind(new.doctor_id)
        .bind(new.to_department_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(ServiceError::NotFound(
                "DOCTOR_NOT_FOUND",
                format!("doctor not found: {}", new.doctor_id),
            ));
        }

        let record = sqlx::query_as::<_, DepartmentTransfer>(
            r#"
            INSERT INTO department_transfers (doctor_id, from_department_id, to_department_id, transfer_date)
            VALUES ($1,$2,$3,$4)
            RETURNING id, doctor_id, from_department_id, to_department_id, transfer_date
            "#,
        )
        .bind(new.doctor_id)
        .bind(new.from_department_id)
        .bind(new.to_department_id)
        .bind(new.transfer_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(record)
    }

    async fn history_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<DepartmentTransfer>, ServiceError> {
        sqlx::query_as::<_, DepartmentTransfer>(
            r#"
            SELECT id, doctor_id, from_department_id, to_department_id, transfer_date
            FROM department_transfers
            WHERE doctor_id = $1
            ORDER BY transfer_date DESC, id DESC
            "#,
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl DoctorDirectory for PgStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Doctor>, ServiceError> {
        sqlx::query_as::<_, Doctor>(
            r#"
            SELECT id, first_name, last_name, email, phone, specialization,
                   department_id, hire_date, status
            FROM doctors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl DepartmentDirectory for PgStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Department>, ServiceError> {
        sqlx::query_as::<_, Department>(
            r#"
            SELECT id, name, description
            FROM departments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }
}
