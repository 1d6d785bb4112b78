pub mod appointments;
pub mod cities;
pub mod doctors;
pub mod medical_records;
pub mod prescriptions;
pub mod reviews;
pub mod specializations;
pub mod symptom_checker;
pub mod uploads;
pub mod user_auth;
