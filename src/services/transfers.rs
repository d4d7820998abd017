use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::ServiceError;
use crate::models::{DepartmentTransfer, NewDepartmentTransfer, TransferRequest};
use crate::store::{DepartmentDirectory, DoctorDirectory, TransferStore};

/// Moves a doctor between departments and keeps the append-only transfer log
/// consistent with the doctor's current assignment.
pub struct TransferService {
    transfers: Arc<dyn TransferStore>,
    doctors: Arc<dyn DoctorDirectory>,
    departments: Arc<dyn DepartmentDirectory>,
}

impl TransferService {
    pub fn new(
        transfers: Arc<dyn TransferStore>,
        doctors: Arc<dyn DoctorDirectory>,
        departments: Arc<dyn DepartmentDirectory>,
    ) -> Self {
        Self {
            transfers,
            doctors,
            departments,
        }
    }

    /// Executes a transfer: resolves the doctor and target department, derives
    /// the `from` side from the doctor's current assignment, then commits the
    /// doctor repoint and the log entry as one atomic store operation.
    pub async fn transfer(
        &self,
        req: TransferRequest,
    ) -> Result<DepartmentTransfer, ServiceError> {
        let (doctor_id, to_department_id) = match (req.doctor_id, req.to_department_id) {
            (Some(d), Some(t)) => (d, t),
            _ => {
                return Err(ServiceError::InvalidArgument(
                    "VALIDATION_ERROR",
                    "doctor_id and to_department_id are required".into(),
                ));
            }
        };

        let doctor = self.doctors.find_by_id(doctor_id).await?.ok_or_else(|| {
            ServiceError::NotFound("DOCTOR_NOT_FOUND", format!("doctor not found: {doctor_id}"))
        })?;
        let target = self
            .departments
            .find_by_id(to_department_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(
                    "DEPARTMENT_NOT_FOUND",
                    format!("department not found: {to_department_id}"),
                )
            })?;

        // The log's `from` side is the doctor's department at execution time;
        // whatever the caller put in the request is discarded.
        let record = self
            .transfers
            .commit(NewDepartmentTransfer {
                doctor_id: doctor.id,
                from_department_id: doctor.department_id,
                to_department_id: target.id,
                transfer_date: req.transfer_date.unwrap_or_else(|| Utc::now().date_naive()),
            })
            .await?;

        info!(
            doctor_id,
            from = ?record.from_department_id,
            to = record.to_department_id,
            "doctor transferred"
        );
        Ok(record)
    }

    /// The doctor's transfer log, newest first.
    pub async fn history_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<DepartmentTransfer>, ServiceError> {
        self.transfers.history_for_doctor(doctor_id).await
    }
}
