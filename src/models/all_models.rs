use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

//  ROLES & ACCOUNTS

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Display, EnumString, PartialEq, Clone, Copy)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    User,
    Doctor,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub fullname: String,
    pub phone_number: String,
    pub password_hash: String,
    pub role: UserRole,
    pub photo: Option<String>,
    pub created_at: NaiveDateTime,
}

//  DOCTORS, CITIES & SPECIALIZATIONS

// Geographic point stored as jsonb on the doctor row
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub doctor_id: Uuid,
    pub fullname: String,
    pub phone_number: String,
    pub email: String,
    pub password_hash: String,
    pub description: Option<String>,
    pub photo: String,
    pub address: String,
    pub location: Option<Value>,
    pub city_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct City {
    pub city_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Specialization {
    pub specialization_id: Uuid,
    pub name: String,
    pub city_id: Option<Uuid>,
}

//  APPOINTMENTS

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Display, EnumString, PartialEq, Clone, Copy)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
}

//  PRESCRIPTIONS & MEDICAL RECORDS

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub prescription_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Display, EnumString, PartialEq, Clone, Copy)]
#[sqlx(type_name = "record_type", rename_all = "lowercase")]
pub enum RecordType {
    Diagnosis,
    LabResult,
    Imaging,
    Vaccination,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MedicalRecord {
    pub record_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub record_type: RecordType,
    pub details: String,
    pub files: Vec<String>,
    pub created_at: NaiveDateTime,
}

//  REVIEWS

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub review_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

//  SYMPTOM CHECKS

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SymptomCheck {
    pub check_id: Uuid,
    pub user_id: Uuid,
    pub symptoms: Vec<String>,
    pub diagnosis: Option<String>,
    pub recommended_doctor_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}
