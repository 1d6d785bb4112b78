use crate::handlers::auth::AuthenticatedUser;
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{Prescription, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Prescription Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
}

//Update Prescription Request
// Patient and doctor ids are fixed at creation; only the content mutates
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePrescriptionRequest {
    pub medication: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
}

const PRESCRIPTION_COLUMNS: &str =
    "prescription_id, doctor_id, patient_id, medication, dosage, instructions, created_at";

//Create Prescription
//Create Prescription Input: HttpRequest(JWT Token), CreatePrescriptionRequest
//Create Prescription Output: Prescription
pub async fn create_prescription(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    payload: web::Json<CreatePrescriptionRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        if payload.medication.trim().is_empty() {
            return HttpResponse::BadRequest().body("Medication cannot be empty");
        }
        if payload.dosage.trim().is_empty() {
            return HttpResponse::BadRequest().body("Dosage cannot be empty");
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
                return HttpResponse::InternalServerError().body("Error creating prescription");
            }
        }

        let query = format!(
            "INSERT INTO prescriptions (prescription_id, doctor_id, patient_id, medication, dosage, instructions, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {}",
            PRESCRIPTION_COLUMNS
        );

        let result = sqlx::query_as::<_, Prescription>(&query)
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(payload.patient_id)
            .bind(payload.medication.trim())
            .bind(payload.dosage.trim())
            .bind(&payload.instructions)
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(prescription) => HttpResponse::Ok().json(prescription),
            Err(e) => {
                log::error!("Error creating prescription: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to create prescription")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Prescriptions
//List Prescriptions Input: None
//List Prescriptions Output: Vec<Prescription>
pub async fn list_prescriptions(pool: web::Data<PgPool>) -> impl Responder {
    let query = format!(
        "SELECT {} FROM prescriptions ORDER BY created_at DESC",
        PRESCRIPTION_COLUMNS
    );

    match sqlx::query_as::<_, Prescription>(&query)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(prescriptions) => HttpResponse::Ok().json(prescriptions),
        Err(e) => {
            log::error!("Error listing prescriptions: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list prescriptions")
        }
    }
}

//List Prescriptions For User
//List Prescriptions For User Input: HttpRequest(JWT Token)
//List Prescriptions For User Output: Vec<Prescription> issued to the calling patient
pub async fn list_prescriptions_for_user(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        list_by_column(pool.get_ref(), "patient_id", user.id).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Prescriptions For Doctor
//List Prescriptions For Doctor Input: HttpRequest(JWT Token)
//List Prescriptions For Doctor Output: Vec<Prescription> issued by the calling doctor
pub async fn list_prescriptions_for_doctor(
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
        "SELECT {} FROM prescriptions WHERE {} = $1 ORDER BY created_at DESC",
        PRESCRIPTION_COLUMNS, column
    );

    match sqlx::query_as::<_, Prescription>(&query)
        .bind(id)
        .fetch_all(pool)
        .await
    {
        Ok(prescriptions) => HttpResponse::Ok().json(prescriptions),
        Err(e) => {
            log::error!("Error listing prescriptions: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list prescriptions")
        }
    }
}

//Get Prescription
//Get Prescription Input: Path (/prescriptions/{prescription_id})
//Get Prescription Output: Prescription
pub async fn get_prescription(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let query = format!(
        "SELECT {} FROM prescriptions WHERE prescription_id = $1",
        PRESCRIPTION_COLUMNS
    );

    match sqlx::query_as::<_, Prescription>(&query)
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(prescription)) => HttpResponse::Ok().json(prescription),
        Ok(None) => HttpResponse::NotFound().body("Prescription not found"),
        Err(e) => {
            log::error!("Error fetching prescription: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch prescription")
        }
    }
}

async fn apply_prescription_update(
    pool: &PgPool,
    prescription_id: Uuid,
    issued_by: Option<Uuid>,
    payload: UpdatePrescriptionRequest,
) -> HttpResponse {
    let query = format!(
        "UPDATE prescriptions SET
            medication = CASE WHEN $1::text IS NULL THEN medication ELSE $1 END,
            dosage = CASE WHEN $2::text IS NULL THEN dosage ELSE $2 END,
            instructions = CASE WHEN $3::text IS NULL THEN instructions ELSE $3 END
         WHERE prescription_id = $4 AND ($5::uuid IS NULL OR doctor_id = $5)
         RETURNING {}",
        PRESCRIPTION_COLUMNS
    );

    let result = sqlx::query_as::<_, Prescription>(&query)
        .bind(&payload.medication)
        .bind(&payload.dosage)
        .bind(&payload.instructions)
        .bind(prescription_id)
        .bind(issued_by)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(Some(prescription)) => HttpResponse::Ok().json(prescription),
        Ok(None) => HttpResponse::NotFound().body("Prescription not found"),
        Err(e) => {
            log::error!("Error updating prescription: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update prescription")
        }
    }
}

//Update Prescription
//Update Prescription Input: Path (/prescriptions/{prescription_id}), UpdatePrescriptionRequest
//Update Prescription Output: Prescription
pub async fn update_prescription(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdatePrescriptionRequest>,
) -> impl Responder {
    apply_prescription_update(pool.get_ref(), path.into_inner(), None, payload.into_inner()).await
}

//Update Prescription For Doctor
//Update Prescription For Doctor Input: HttpRequest(JWT Token), Path, UpdatePrescriptionRequest
//Update Prescription For Doctor Output: Prescription (only if issued by the caller)
pub async fn update_prescription_for_doctor(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdatePrescriptionRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        apply_prescription_update(
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

//Delete Prescription
//Delete Prescription Input: Path (/prescriptions/{prescription_id})
//Delete Prescription Output: Success message
pub async fn delete_prescription(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    delete_by_id(pool.get_ref(), path.into_inner(), None).await
}

//Delete Prescription For Doctor
//Delete Prescription For Doctor Input: HttpRequest(JWT Token), Path
//Delete Prescription For Doctor Output: Success message (only if issued by the caller)
pub async fn delete_prescription_for_doctor(
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

async fn delete_by_id(pool: &PgPool, prescription_id: Uuid, issued_by: Option<Uuid>) -> HttpResponse {
    let result = sqlx::query(
        "DELETE FROM prescriptions WHERE prescription_id = $1 AND ($2::uuid IS NULL OR doctor_id = $2)",
    )
    .bind(prescription_id)
    .bind(issued_by)
    .execute(pool)
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            HttpResponse::Ok().body("Prescription deleted successfully")
        }
        Ok(_) => HttpResponse::NotFound().body("Prescription not found"),
        Err(e) => {
            log::error!("Error deleting prescription: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete prescription")
        }
    }
}

//Config Prescription Routes
// POST   /prescriptions/create          (doctor)
// GET    /prescriptions/list            (admin, superadmin)
// GET    /prescriptions/for-user        (user)
// GET    /prescriptions/for-doctor      (doctor)
// PUT    /prescriptions/for-doctor/{id} (doctor)
// DELETE /prescriptions/for-doctor/{id} (doctor)
// GET    /prescriptions/{id}            (admin, superadmin)
// PUT    /prescriptions/{id}            (admin, superadmin)
// DELETE /prescriptions/{id}            (admin, superadmin)
pub fn config_prescription_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/prescriptions")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::post().to(create_prescription)),
            )
            .service(
                web::resource("/list")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(list_prescriptions)),
            )
            .service(
                web::resource("/for-user")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::get().to(list_prescriptions_for_user)),
            )
            .service(
                web::resource("/for-doctor")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::get().to(list_prescriptions_for_doctor)),
            )
            .service(
                web::resource("/for-doctor/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::put().to(update_prescription_for_doctor))
                    .route(web::delete().to(delete_prescription_for_doctor)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(get_prescription))
                    .route(web::put().to(update_prescription))
                    .route(web::delete().to(delete_prescription)),
            ),
    );
}
