use crate::handlers::auth::AuthenticatedUser;
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{MedicalRecord, RecordType, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Medical Record Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: Uuid,
    pub record_type: RecordType,
    pub details: String,
    pub files: Option<Vec<String>>,
}

//Update Medical Record Request
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateMedicalRecordRequest {
    pub record_type: Option<RecordType>,
    pub details: Option<String>,
    pub files: Option<Vec<String>>,
}

const RECORD_COLUMNS: &str =
    "record_id, patient_id, doctor_id, record_type, details, files, created_at";

//Create Medical Record
//Create Medical Record Input: HttpRequest(JWT Token), CreateMedicalRecordRequest
//Create Medical Record Output: MedicalRecord
pub async fn create_medical_record(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    payload: web::Json<CreateMedicalRecordRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        if payload.details.trim().is_empty() {
            return HttpResponse::BadRequest().body("Details cannot be empty");
        }

        let patient_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(payload.patient_id)
                .fetch_one(pool.get_ref())
                .await;

        match patient_exists {
            Ok(true) => {}
            Ok(false) => return HttpResponse::BadRequest().body("Patient does not exist"),
            Err(e) => {
                log::error!("Error checking patient: {:?}", e);
                return HttpResponse::InternalServerError().body("Error creating medical record");
            }
        }

        let query = format!(
            "INSERT INTO medical_records (record_id, patient_id, doctor_id, record_type, details, files, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {}",
            RECORD_COLUMNS
        );

        // Records without attachments store an empty file list
        let result = sqlx::query_as::<_, MedicalRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(payload.patient_id)
            .bind(user.id)
            .bind(payload.record_type)
            .bind(payload.details.trim())
            .bind(payload.files.clone().unwrap_or_default())
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(record) => HttpResponse::Ok().json(record),
            Err(e) => {
                log::error!("Error creating medical record: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to create medical record")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Medical Records
//List Medical Records Input: None
//List Medical Records Output: Vec<MedicalRecord>
pub async fn list_medical_records(pool: web::Data<PgPool>) -> impl Responder {
    let query = format!(
        "SELECT {} FROM medical_records ORDER BY created_at DESC",
        RECORD_COLUMNS
    );

    match sqlx::query_as::<_, MedicalRecord>(&query)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Error listing medical records: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list medical records")
        }
    }
}

//List Medical Records For User
//List Medical Records For User Input: HttpRequest(JWT Token)
//List Medical Records For User Output: Vec<MedicalRecord> about the calling patient
pub async fn list_medical_records_for_user(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        list_by_column(pool.get_ref(), "patient_id", user.id).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Medical Records For Doctor
//List Medical Records For Doctor Input: HttpRequest(JWT Token)
//List Medical Records For Doctor Output: Vec<MedicalRecord> authored by the calling doctor
pub async fn list_medical_records_for_doctor(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        list_by_column(pool.get_ref(), "doctor_id", user.id).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

async fn list_by_column(pool: &PgPool, column: &str, id: Uuid) -> HttpResponse {
    let query = format!(
        "SELECT {} FROM medical_records WHERE {} = $1 ORDER BY created_at DESC",
        RECORD_COLUMNS, column
    );

    match sqlx::query_as::<_, MedicalRecord>(&query)
        .bind(id)
        .fetch_all(pool)
        .await
    {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Error listing medical records: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list medical records")
        }
    }
}

//Get Medical Record
//Get Medical Record Input: Path (/medical-records/{record_id})
//Get Medical Record Output: MedicalRecord
pub async fn get_medical_record(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let query = format!("SELECT {} FROM medical_records WHERE record_id = $1", RECORD_COLUMNS);

    match sqlx::query_as::<_, MedicalRecord>(&query)
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().body("Medical record not found"),
        Err(e) => {
            log::error!("Error fetching medical record: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch medical record")
        }
    }
}

async fn apply_record_update(
    pool: &PgPool,
    record_id: Uuid,
    authored_by: Option<Uuid>,
    payload: UpdateMedicalRecordRequest,
) -> HttpResponse {
    let query = format!(
        "UPDATE medical_records SET
            record_type = CASE WHEN $1::record_type IS NULL THEN record_type ELSE $1 END,
            details = CASE WHEN $2::text IS NULL THEN details ELSE $2 END,
            files = CASE WHEN $3::text[] IS NULL THEN files ELSE $3 END
         WHERE record_id = $4 AND ($5::uuid IS NULL OR doctor_id = $5)
         RETURNING {}",
        RECORD_COLUMNS
    );

    let result = sqlx::query_as::<_, MedicalRecord>(&query)
        .bind(payload.record_type)
        .bind(&payload.details)
        .bind(&payload.files)
        .bind(record_id)
        .bind(authored_by)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().body("Medical record not found"),
        Err(e) => {
            log::error!("Error updating medical record: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update medical record")
        }
    }
}

//Update Medical Record
//Update Medical Record Input: Path (/medical-records/{record_id}), UpdateMedicalRecordRequest
//Update Medical Record Output: MedicalRecord
pub async fn update_medical_record(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateMedicalRecordRequest>,
) -> impl Responder {
    apply_record_update(pool.get_ref(), path.into_inner(), None, payload.into_inner()).await
}

//Update Medical Record For Doctor
//Update Medical Record For Doctor Input: HttpRequest(JWT Token), Path, UpdateMedicalRecordRequest
//Update Medical Record For Doctor Output: MedicalRecord (only if authored by the caller)
pub async fn update_medical_record_for_doctor(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateMedicalRecordRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        apply_record_update(
            pool.get_ref(),
            path.into_inner(),
            Some(user.id),
            payload.into_inner(),
        )
        .await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Delete Medical Record
//Delete Medical Record Input: Path (/medical-records/{record_id})
//Delete Medical Record Output: Success message
pub async fn delete_medical_record(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> impl Responder {
    delete_by_id(pool.get_ref(), path.into_inner(), None).await
}

//Delete Medical Record For Doctor
//Delete Medical Record For Doctor Input: HttpRequest(JWT Token), Path
//Delete Medical Record For Doctor Output: Success message (only if authored by the caller)
pub async fn delete_medical_record_for_doctor(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        delete_by_id(pool.get_ref(), path.into_inner(), Some(user.id)).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

async fn delete_by_id(pool: &PgPool, record_id: Uuid, authored_by: Option<Uuid>) -> HttpResponse {
    let result = sqlx::query(
        "DELETE FROM medical_records WHERE record_id = $1 AND ($2::uuid IS NULL OR doctor_id = $2)",
    )
    .bind(record_id)
    .bind(authored_by)
    .execute(pool)
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            HttpResponse::Ok().body("Medical record deleted successfully")
        }
        Ok(_) => HttpResponse::NotFound().body("Medical record not found"),
        Err(e) => {
            log::error!("Error deleting medical record: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete medical record")
        }
    }
}

//Config Medical Record Routes
// POST   /medical-records/create          (doctor)
// GET    /medical-records/list            (admin, superadmin)
// GET    /medical-records/for-user        (user)
// GET    /medical-records/for-doctor      (doctor)
// PUT    /medical-records/for-doctor/{id} (doctor)
// DELETE /medical-records/for-doctor/{id} (doctor)
// GET    /medical-records/{id}            (admin, superadmin)
// PUT    /medical-records/{id}            (admin, superadmin)
// DELETE /medical-records/{id}            (admin, superadmin)
pub fn config_medical_record_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/medical-records")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::post().to(create_medical_record)),
            )
            .service(
                web::resource("/list")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(list_medical_records)),
            )
            .service(
                web::resource("/for-user")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::get().to(list_medical_records_for_user)),
            )
            .service(
                web::resource("/for-doctor")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::get().to(list_medical_records_for_doctor)),
            )
            .service(
                web::resource("/for-doctor/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::put().to(update_medical_record_for_doctor))
                    .route(web::delete().to(delete_medical_record_for_doctor)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(get_medical_record))
                    .route(web::put().to(update_medical_record))
                    .route(web::delete().to(delete_medical_record)),
            ),
    );
}
