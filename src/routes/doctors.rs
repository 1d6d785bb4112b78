use crate::handlers::auth::{AuthenticatedUser, TokenCodec};
use crate::handlers::password::{hash_password, verify_password};
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{GeoPoint, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

//Create Doctor Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateDoctorRequest {
    pub fullname: String,
    pub phone_number: String,
    pub password: String,
    pub email: String,
    pub description: Option<String>,
    pub specializations: Vec<String>,
    pub photo: String,
    pub location: GeoPoint,
    pub address: String,
    pub city_id: Option<Uuid>,
}

//Doctor Login Request
#[derive(Debug, Deserialize)]
pub struct DoctorLoginRequest {
    pub phone_number: String,
    pub password: String,
}

//Update Doctor Request
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateDoctorRequest {
    pub fullname: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub city_id: Option<Uuid>,
}

//Doctor Response
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DoctorResponse {
    pub doctor_id: Uuid,
    pub fullname: String,
    pub phone_number: String,
    pub email: String,
    pub description: Option<String>,
    pub photo: String,
    pub address: String,
    pub location: Option<serde_json::Value>,
    pub city_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
struct DoctorAuthRow {
    doctor_id: Uuid,
    fullname: String,
    password_hash: String,
    photo: String,
}

const DOCTOR_COLUMNS: &str = "doctor_id, fullname, phone_number, email, description, photo, \
                              address, location, city_id, created_at";

/// Resolves specialization entries that may be either an existing
/// specialization id or a specialization name. Unknown ids are rejected,
/// unknown names are created on the fly.
async fn resolve_specializations(
    pool: &PgPool,
    entries: &[String],
) -> Result<Vec<Uuid>, HttpResponse> {
    let mut ids = Vec::with_capacity(entries.len());

    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(HttpResponse::BadRequest().body("Specialization entries cannot be empty"));
        }

        let id = if let Ok(id) = Uuid::parse_str(entry) {
            let found = sqlx::query_scalar::<_, Uuid>(
                "SELECT specialization_id FROM specializations WHERE specialization_id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await;

            match found {
                Ok(Some(id)) => id,
                Ok(None) => {
                    return Err(HttpResponse::BadRequest().body("Specialization not found"));
                }
                Err(e) => {
                    log::error!("Error looking up specialization: {:?}", e);
                    return Err(
                        HttpResponse::InternalServerError().body("Error resolving specializations")
                    );
                }
            }
        } else {
            let found = sqlx::query_scalar::<_, Uuid>(
                "SELECT specialization_id FROM specializations WHERE name = $1",
            )
            .bind(entry)
            .fetch_optional(pool)
            .await;

            match found {
                Ok(Some(id)) => id,
                Ok(None) => {
                    let created = sqlx::query_scalar::<_, Uuid>(
                        "INSERT INTO specializations (specialization_id, name) \
                         VALUES ($1, $2) RETURNING specialization_id",
                    )
                    .bind(Uuid::new_v4())
                    .bind(entry)
                    .fetch_one(pool)
                    .await;

                    match created {
                        Ok(id) => id,
                        Err(e) => {
                            log::error!("Error creating specialization: {:?}", e);
                            return Err(HttpResponse::InternalServerError()
                                .body("Error resolving specializations"));
                        }
                    }
                }
                Err(e) => {
                    log::error!("Error looking up specialization: {:?}", e);
                    return Err(
                        HttpResponse::InternalServerError().body("Error resolving specializations")
                    );
                }
            }
        };

        ids.push(id);
    }

    Ok(ids)
}

//Create Doctor
//Create Doctor Input: CreateDoctorRequest
//Create Doctor Output: DoctorResponse + resolved specialization ids
pub async fn create_doctor(
    pool: web::Data<PgPool>,
    payload: web::Json<CreateDoctorRequest>,
) -> impl Responder {
    let fullname = payload.fullname.trim();
    if fullname.len() < 5 {
        return HttpResponse::BadRequest().body("Fullname must be at least 5 characters");
    }
    if payload.password.len() < 5 {
        return HttpResponse::BadRequest().body("Password must be at least 5 characters");
    }
    if !payload.email.contains('@') {
        return HttpResponse::BadRequest().body("Email is not valid");
    }
    if payload.specializations.is_empty() {
        return HttpResponse::BadRequest().body("At least one specialization is required");
    }

    let existing =
        sqlx::query_scalar::<_, Uuid>("SELECT doctor_id FROM doctors WHERE phone_number = $1")
            .bind(payload.phone_number.trim())
            .fetch_optional(pool.get_ref())
            .await;

    match existing {
        Ok(Some(_)) => return HttpResponse::Conflict().body("Phone number already exists"),
        Ok(None) => {}
        Err(e) => {
            log::error!("Error checking phone number: {:?}", e);
            return HttpResponse::InternalServerError().body("Error creating doctor");
        }
    }

    let specialization_ids = match resolve_specializations(pool.get_ref(), &payload.specializations).await
    {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(_) => return HttpResponse::InternalServerError().body("Failed to hash password"),
    };

    let location = match serde_json::to_value(payload.location) {
        Ok(value) => value,
        Err(_) => return HttpResponse::BadRequest().body("Location is not valid"),
    };

    let query = format!(
        "INSERT INTO doctors \
         (doctor_id, fullname, phone_number, email, password_hash, description, photo, address, location, city_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
         RETURNING {}",
        DOCTOR_COLUMNS
    );

    let result = sqlx::query_as::<_, DoctorResponse>(&query)
        .bind(Uuid::new_v4())
        .bind(fullname)
        .bind(payload.phone_number.trim())
        .bind(payload.email.trim())
        .bind(password_hash)
        .bind(&payload.description)
        .bind(&payload.photo)
        .bind(&payload.address)
        .bind(location)
        .bind(payload.city_id)
        .fetch_one(pool.get_ref())
        .await;

    let doctor = match result {
        Ok(doctor) => doctor,
        Err(e) => {
            log::error!("Error creating doctor: {:?}", e);
            return HttpResponse::InternalServerError().body("Error creating doctor");
        }
    };

    for specialization_id in &specialization_ids {
        let linked = sqlx::query(
            "INSERT INTO doctor_specializations (doctor_id, specialization_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(doctor.doctor_id)
        .bind(specialization_id)
        .execute(pool.get_ref())
        .await;

        if let Err(e) = linked {
            log::error!("Error linking specialization: {:?}", e);
            return HttpResponse::InternalServerError().body("Error creating doctor");
        }
    }

    HttpResponse::Ok().json(json!({
        "doctor": doctor,
        "specialization_ids": specialization_ids,
    }))
}

//Doctor Login
//Doctor Login Input: DoctorLoginRequest
//Doctor Login Output: token + doctor summary
pub async fn doctor_login(
    pool: web::Data<PgPool>,
    codec: web::Data<TokenCodec>,
    payload: web::Json<DoctorLoginRequest>,
) -> impl Responder {
    let query = "SELECT doctor_id, fullname, password_hash, photo FROM doctors WHERE phone_number = $1";

    let doctor = sqlx::query_as::<_, DoctorAuthRow>(query)
        .bind(payload.phone_number.trim())
        .fetch_optional(pool.get_ref())
        .await;

    match doctor {
        Ok(Some(doctor)) => {
            let verified = match verify_password(&payload.password, &doctor.password_hash) {
                Ok(v) => v,
                Err(_) => {
                    return HttpResponse::InternalServerError().body("Error verifying password");
                }
            };

            if !verified {
                return HttpResponse::Unauthorized().body("Incorrect phone number or password");
            }

            match codec.issue(doctor.doctor_id, UserRole::Doctor) {
                Ok(token) => HttpResponse::Ok().json(json!({
                    "token": token,
                    "doctor_id": doctor.doctor_id,
                    "fullname": doctor.fullname,
                    "photo": doctor.photo,
                })),
                Err(e) => {
                    log::error!("Failed to issue token: {:?}", e);
                    HttpResponse::InternalServerError().body("Error issuing token")
                }
            }
        }
        Ok(None) => HttpResponse::Unauthorized().body("Incorrect phone number or password"),
        Err(e) => {
            log::error!("Error retrieving doctor: {:?}", e);
            HttpResponse::InternalServerError().body("Error logging in")
        }
    }
}

//List Doctors
//List Doctors Input: None
//List Doctors Output: doctors with aggregated review ratings and specialization names
pub async fn list_doctors(pool: web::Data<PgPool>) -> impl Responder {
    let query = "
        SELECT d.doctor_id, d.fullname, d.email, d.description, d.photo, d.address, d.city_id,
               AVG(r.rating)::float8 AS average_rating,
               COUNT(r.review_id) AS review_count
        FROM doctors d
        LEFT JOIN reviews r ON r.doctor_id = d.doctor_id
        GROUP BY d.doctor_id
        ORDER BY d.fullname";

    let rows = match sqlx::query(query).fetch_all(pool.get_ref()).await {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Error listing doctors: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to list doctors");
        }
    };

    let specialization_rows = sqlx::query(
        "SELECT ds.doctor_id, s.name
         FROM doctor_specializations ds
         JOIN specializations s ON s.specialization_id = ds.specialization_id",
    )
    .fetch_all(pool.get_ref())
    .await;

    let mut specializations_by_doctor: HashMap<Uuid, Vec<String>> = HashMap::new();
    match specialization_rows {
        Ok(rows) => {
            for row in rows {
                specializations_by_doctor
                    .entry(row.get::<Uuid, _>("doctor_id"))
                    .or_default()
                    .push(row.get::<String, _>("name"));
            }
        }
        Err(e) => {
            log::error!("Error fetching specializations: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to list doctors");
        }
    }

    let doctors = rows
        .iter()
        .map(|row| {
            let doctor_id = row.get::<Uuid, _>("doctor_id");
            json!({
                "doctor_id": doctor_id,
                "fullname": row.get::<String, _>("fullname"),
                "email": row.get::<String, _>("email"),
                "description": row.get::<Option<String>, _>("description"),
                "photo": row.get::<String, _>("photo"),
                "address": row.get::<String, _>("address"),
                "city_id": row.get::<Option<Uuid>, _>("city_id"),
                "average_rating": row.get::<Option<f64>, _>("average_rating"),
                "review_count": row.get::<i64, _>("review_count"),
                "specializations": specializations_by_doctor
                    .get(&doctor_id)
                    .cloned()
                    .unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    HttpResponse::Ok().json(doctors)
}

//Get Current Doctor
//Get Current Doctor Input: HttpRequest(JWT Token)
//Get Current Doctor Output: DoctorResponse
pub async fn get_current_doctor(pool: web::Data<PgPool>, req: HttpRequest) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        fetch_doctor(pool.get_ref(), user.id).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Update Current Doctor
//Update Current Doctor Input: HttpRequest(JWT Token), UpdateDoctorRequest
//Update Current Doctor Output: DoctorResponse
pub async fn update_current_doctor(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    payload: web::Json<UpdateDoctorRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        apply_doctor_update(pool.get_ref(), user.id, payload.into_inner()).await
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Get Doctor
//Get Doctor Input: Path (/doctors/{doctor_id})
//Get Doctor Output: DoctorResponse
pub async fn get_doctor(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    fetch_doctor(pool.get_ref(), path.into_inner()).await
}

//Update Doctor
//Update Doctor Input: Path (/doctors/{doctor_id}), UpdateDoctorRequest
//Update Doctor Output: DoctorResponse
pub async fn update_doctor(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateDoctorRequest>,
) -> impl Responder {
    apply_doctor_update(pool.get_ref(), path.into_inner(), payload.into_inner()).await
}

//Delete Doctor
//Delete Doctor Input: Path (/doctors/{doctor_id})
//Delete Doctor Output: Success message
pub async fn delete_doctor(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let result = sqlx::query("DELETE FROM doctors WHERE doctor_id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            HttpResponse::Ok().body("Doctor deleted successfully")
        }
        Ok(_) => HttpResponse::NotFound().body("Doctor not found"),
        Err(e) => {
            log::error!("Error deleting doctor: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete doctor")
        }
    }
}

async fn fetch_doctor(pool: &PgPool, doctor_id: Uuid) -> HttpResponse {
    let query = format!("SELECT {} FROM doctors WHERE doctor_id = $1", DOCTOR_COLUMNS);

    let result = sqlx::query_as::<_, DoctorResponse>(&query)
        .bind(doctor_id)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(Some(doctor)) => HttpResponse::Ok().json(doctor),
        Ok(None) => HttpResponse::NotFound().body("Doctor not found"),
        Err(e) => {
            log::error!("Error fetching doctor: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch doctor")
        }
    }
}

async fn apply_doctor_update(
    pool: &PgPool,
    doctor_id: Uuid,
    payload: UpdateDoctorRequest,
) -> HttpResponse {
    let password_hash = match payload.password.as_deref() {
        Some(password) => match hash_password(password) {
            Ok(hash) => Some(hash),
            Err(_) => return HttpResponse::InternalServerError().body("Failed to hash password"),
        },
        None => None,
    };

    let location = match payload.location {
        Some(point) => match serde_json::to_value(point) {
            Ok(value) => Some(value),
            Err(_) => return HttpResponse::BadRequest().body("Location is not valid"),
        },
        None => None,
    };

    let query = format!(
        "UPDATE doctors SET
            fullname = CASE WHEN $1::text IS NULL THEN fullname ELSE $1 END,
            email = CASE WHEN $2::text IS NULL THEN email ELSE $2 END,
            description = CASE WHEN $3::text IS NULL THEN description ELSE $3 END,
            photo = CASE WHEN $4::text IS NULL THEN photo ELSE $4 END,
            address = CASE WHEN $5::text IS NULL THEN address ELSE $5 END,
            location = CASE WHEN $6::jsonb IS NULL THEN location ELSE $6 END,
            city_id = CASE WHEN $7::uuid IS NULL THEN city_id ELSE $7 END,
            password_hash = CASE WHEN $8::text IS NULL THEN password_hash ELSE $8 END
         WHERE doctor_id = $9
         RETURNING {}",
        DOCTOR_COLUMNS
    );

    let result = sqlx::query_as::<_, DoctorResponse>(&query)
        .bind(&payload.fullname)
        .bind(&payload.email)
        .bind(&payload.description)
        .bind(&payload.photo)
        .bind(&payload.address)
        .bind(location)
        .bind(payload.city_id)
        .bind(password_hash)
        .bind(doctor_id)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(Some(doctor)) => HttpResponse::Ok().json(doctor),
        Ok(None) => HttpResponse::NotFound().body("Doctor not found"),
        Err(e) => {
            log::error!("Error updating doctor: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update doctor")
        }
    }
}

//Config Doctor Routes
// POST   /doctors/create  (admin, superadmin)
// POST   /doctors/login
// GET    /doctors/list
// GET    /doctors/me      (doctor)
// PUT    /doctors/me      (doctor)
// GET    /doctors/{id}    (admin, superadmin)
// PUT    /doctors/{id}    (admin, superadmin)
// DELETE /doctors/{id}    (admin, superadmin)
pub fn config_doctor_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/doctors")
            .route("/login", web::post().to(doctor_login))
            .route("/list", web::get().to(list_doctors))
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::post().to(create_doctor)),
            )
            .service(
                web::resource("/me")
                    .wrap(RoleGuard::allow(&[UserRole::Doctor]))
                    .route(web::get().to(get_current_doctor))
                    .route(web::put().to(update_current_doctor)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::get().to(get_doctor))
                    .route(web::put().to(update_doctor))
                    .route(web::delete().to(delete_doctor)),
            ),
    );
}
