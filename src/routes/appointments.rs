use crate::handlers::auth::AuthenticatedUser;
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{Appointment, AppointmentStatus, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Appointment Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub status: Option<AppointmentStatus>,
}

//Update Appointment Request
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateAppointmentRequest {
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: Option<AppointmentStatus>,
}

const APPOINTMENT_COLUMNS: &str =
    "appointment_id, patient_id, doctor_id, scheduled_at, status, created_at";

//Create Appointment
//Create Appointment Input: HttpRequest(JWT Token), CreateAppointmentRequest
//Create Appointment Output: Appointment
pub async fn create_appointment(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    payload: web::Json<CreateAppointmentRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let doctor_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM doctors WHERE doctor_id = $1)",
        )
        .bind(payload.doctor_id)
        .fetch_one(pool.get_ref())
        .await;

        match doctor_exists {
            Ok(true) => {}
            Ok(false) => return HttpResponse::BadRequest().body("Doctor does not exist"),
            Err(e) => {
                log::error!("Error checking doctor: {:?}", e);
                return HttpResponse::InternalServerError().body("Error creating appointment");
            }
        }

        let query = format!(
            "INSERT INTO appointments (appointment_id, patient_id, doctor_id, scheduled_at, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {}",
            APPOINTMENT_COLUMNS
        );

        let result = sqlx::query_as::<_, Appointment>(&query)
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(payload.doctor_id)
            .bind(payload.scheduled_at)
            .bind(payload.status.unwrap_or(AppointmentStatus::Pending))
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(appointment) => HttpResponse::Ok().json(appointment),
            Err(e) => {
                log::error!("Error creating appointment: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to create appointment")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Appointments
//List Appointments Input: HttpRequest(JWT Token)
//List Appointments Output: Vec<Appointment> for the calling patient, soonest first
pub async fn list_appointments(pool: web::Data<PgPool>, req: HttpRequest) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let query = format!(
            "SELECT {} FROM appointments WHERE patient_id = $1 ORDER BY scheduled_at ASC",
            APPOINTMENT_COLUMNS
        );

        let result = sqlx::query_as::<_, Appointment>(&query)
            .bind(user.id)
            .fetch_all(pool.get_ref())
            .await;

        match result {
            Ok(appointments) => HttpResponse::Ok().json(appointments),
            Err(e) => {
                log::error!("Error listing appointments: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to list appointments")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Get Appointment
//Get Appointment Input: Path (/appointments/{appointment_id})
//Get Appointment Output: Appointment
pub async fn get_appointment(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let query = format!(
        "SELECT {} FROM appointments WHERE appointment_id = $1",
        APPOINTMENT_COLUMNS
    );

    let result = sqlx::query_as::<_, Appointment>(&query)
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await;

    match result {
        Ok(Some(appointment)) => HttpResponse::Ok().json(appointment),
        Ok(None) => HttpResponse::NotFound().body("Appointment not found"),
        Err(e) => {
            log::error!("Error fetching appointment: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch appointment")
        }
    }
}

//Update Appointment
//Update Appointment Input: HttpRequest(JWT Token), Path (/appointments/{appointment_id}), UpdateAppointmentRequest
//Update Appointment Output: Appointment
pub async fn update_appointment(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateAppointmentRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let query = format!(
            "UPDATE appointments SET
                scheduled_at = CASE WHEN $1::timestamp IS NULL THEN scheduled_at ELSE $1 END,
                status = CASE WHEN $2::appointment_status IS NULL THEN status ELSE $2 END
             WHERE appointment_id = $3 AND patient_id = $4
             RETURNING {}",
            APPOINTMENT_COLUMNS
        );

        let result = sqlx::query_as::<_, Appointment>(&query)
            .bind(payload.scheduled_at)
            .bind(payload.status)
            .bind(path.into_inner())
            .bind(user.id)
            .fetch_optional(pool.get_ref())
            .await;

        match result {
            Ok(Some(appointment)) => HttpResponse::Ok().json(appointment),
            Ok(None) => HttpResponse::NotFound().body("Appointment not found or not yours"),
            Err(e) => {
                log::error!("Error updating appointment: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to update appointment")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Delete Appointment
//Delete Appointment Input: HttpRequest(JWT Token), Path (/appointments/{appointment_id})
//Delete Appointment Output: Success message
pub async fn delete_appointment(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let result =
            sqlx::query("DELETE FROM appointments WHERE appointment_id = $1 AND patient_id = $2")
                .bind(path.into_inner())
                .bind(user.id)
                .execute(pool.get_ref())
                .await;

        match result {
            Ok(res) if res.rows_affected() > 0 => {
                HttpResponse::Ok().body("Appointment deleted successfully")
            }
            Ok(_) => HttpResponse::NotFound().body("Appointment not found or not yours"),
            Err(e) => {
                log::error!("Error deleting appointment: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to delete appointment")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Config Appointment Routes
// POST   /appointments/create
// GET    /appointments/list
// GET    /appointments/{id}
// PUT    /appointments/{id}
// DELETE /appointments/{id}
// All routes are patient-only
pub fn config_appointment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/appointments")
            .wrap(RoleGuard::allow(&[UserRole::User]))
            .route("/create", web::post().to(create_appointment))
            .route("/list", web::get().to(list_appointments))
            .route("/{id}", web::get().to(get_appointment))
            .route("/{id}", web::put().to(update_appointment))
            .route("/{id}", web::delete().to(delete_appointment)),
    );
}
