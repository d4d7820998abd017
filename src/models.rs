use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/* -------------------------
   Stored records
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    /// Free text, e.g. "SCHEDULED".
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    /// Current assignment; written only by the transfer workflow.
    pub department_id: Option<i64>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Append-only log entry; never edited after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DepartmentTransfer {
    pub id: i64,
    pub doctor_id: i64,
    pub from_department_id: Option<i64>,
    pub to_department_id: i64,
    pub transfer_date: NaiveDate,
}

/* -------------------------
   Insert payloads
--------------------------*/

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub patient_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDepartmentTransfer {
    pub doctor_id: i64,
    pub from_department_id: Option<i64>,
    pub to_department_id: i64,
    pub transfer_date: NaiveDate,
}

/* -------------------------
   Request DTOs
--------------------------*/

#[derive(Debug, Default, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Subset of appointment fields a caller may rewrite; anything omitted keeps
/// its stored value.
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentChanges {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRequest {
    pub doctor_id: Option<i64>,
    /// Accepted for wire compatibility but always overwritten with the
    /// doctor's actual department at execution time.
    pub from_department_id: Option<i64>,
    pub to_department_id: Option<i64>,
    pub transfer_date: Option<NaiveDate>,
}
