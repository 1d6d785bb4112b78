use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::diagnosis::DiagnosisClient;
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{SymptomCheck, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Symptom Check Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSymptomCheckRequest {
    pub symptoms: Vec<String>,
    pub recommended_doctor_id: Option<Uuid>,
}

const CHECK_COLUMNS: &str =
    "check_id, user_id, symptoms, diagnosis, recommended_doctor_id, created_at";

//Create Symptom Check
//Create Symptom Check Input: HttpRequest(JWT Token), CreateSymptomCheckRequest
//Create Symptom Check Output: SymptomCheck with the upstream diagnosis attached
pub async fn create_symptom_check(
    pool: web::Data<PgPool>,
    diagnosis_client: web::Data<DiagnosisClient>,
    req: HttpRequest,
    payload: web::Json<CreateSymptomCheckRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        if payload.symptoms.is_empty() {
            return HttpResponse::BadRequest().body("At least one symptom is required");
        }

        // The check is only persisted once the upstream analysis succeeds
        let diagnosis = match diagnosis_client.analyze(&payload.symptoms).await {
            Ok(diagnosis) => diagnosis,
            Err(e) => {
                log::error!("Symptom analysis failed: {}", e);
                return HttpResponse::BadGateway().body("Symptom analysis failed");
            }
        };

        let query = format!(
            "INSERT INTO symptom_checks (check_id, user_id, symptoms, diagnosis, recommended_doctor_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {}",
            CHECK_COLUMNS
        );

        let result = sqlx::query_as::<_, SymptomCheck>(&query)
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(&payload.symptoms)
            .bind(diagnosis)
            .bind(payload.recommended_doctor_id)
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(check) => HttpResponse::Ok().json(check),
            Err(e) => {
                log::error!("Error storing symptom check: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to store symptom check")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Own Symptom Checks
//List Own Symptom Checks Input: HttpRequest(JWT Token)
//List Own Symptom Checks Output: Vec<SymptomCheck> for the calling user
pub async fn list_own_symptom_checks(pool: web::Data<PgPool>, req: HttpRequest) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let query = format!(
            "SELECT {} FROM symptom_checks WHERE user_id = $1 ORDER BY created_at DESC",
            CHECK_COLUMNS
        );

        match sqlx::query_as::<_, SymptomCheck>(&query)
            .bind(user.id)
            .fetch_all(pool.get_ref())
            .await
        {
            Ok(checks) => HttpResponse::Ok().json(checks),
            Err(e) => {
                log::error!("Error listing symptom checks: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to list symptom checks")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Symptom Checks
//List Symptom Checks Input: None
//List Symptom Checks Output: Vec<SymptomCheck>
pub async fn list_symptom_checks(pool: web::Data<PgPool>) -> impl Responder {
    let query = format!(
        "SELECT {} FROM symptom_checks ORDER BY created_at DESC",
        CHECK_COLUMNS
    );

    match sqlx::query_as::<_, SymptomCheck>(&query)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(checks) => HttpResponse::Ok().json(checks),
        Err(e) => {
            log::error!("Error listing symptom checks: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list symptom checks")
        }
    }
}

//Get Symptom Check
//Get Symptom Check Input: Path (/symptom-checker/{check_id})
//Get Symptom Check Output: SymptomCheck
pub async fn get_symptom_check(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let query = format!("SELECT {} FROM symptom_checks WHERE check_id = $1", CHECK_COLUMNS);

    match sqlx::query_as::<_, SymptomCheck>(&query)
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(check)) => HttpResponse::Ok().json(check),
        Ok(None) => HttpResponse::NotFound().body("Symptom check not found"),
        Err(e) => {
            log::error!("Error fetching symptom check: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch symptom check")
        }
    }
}

//Delete Symptom Check
//Delete Symptom Check Input: Path (/symptom-checker/{check_id})
//Delete Symptom Check Output: Success message
pub async fn delete_symptom_check(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let result = sqlx::query("DELETE FROM symptom_checks WHERE check_id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            HttpResponse::Ok().body("Symptom check deleted successfully")
        }
        Ok(_) => HttpResponse::NotFound().body("Symptom check not found"),
        Err(e) => {
            log::error!("Error deleting symptom check: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete symptom check")
        }
    }
}

//Config Symptom Checker Routes
// POST   /symptom-checker/create (user)
// GET    /symptom-checker/mine   (user)
// GET    /symptom-checker/list   (admin, superadmin)
// GET    /symptom-checker/{id}   (admin, superadmin)
// DELETE /symptom-checker/{id}   (admin, superadmin)
pub fn config_symptom_checker_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/symptom-checker")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::post().to(create_symptom_check)),
            )
            .service(
                web::resource("/mine")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::get().to(list_own_symptom_checks)),
            )
            .service(
                web::resource("/list")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(list_symptom_checks)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(get_symptom_check))
                    .route(web::delete().to(delete_symptom_check)),
            ),
    );
}
