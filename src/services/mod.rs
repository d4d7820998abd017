pub mod appointments;
pub mod transfers;

pub use appointments::AppointmentService;
pub use transfers::TransferService;
