use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::UserRole;
use actix_web::{guard, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Specialization Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSpecializationRequest {
    pub name: String,
    pub city_id: Option<Uuid>,
}

//Update Specialization Request
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateSpecializationRequest {
    pub name: Option<String>,
    pub city_id: Option<Uuid>,
}

//Specialization Response
// Each row carries its city name when the specialization is tied to a city
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SpecializationResponse {
    pub specialization_id: Uuid,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub city_name: Option<String>,
}

const SPECIALIZATION_QUERY: &str = "
    SELECT s.specialization_id, s.name, s.city_id, c.name AS city_name
    FROM specializations s
    LEFT JOIN cities c ON c.city_id = s.city_id";

//Create Specialization
//Create Specialization Input: CreateSpecializationRequest
//Create Specialization Output: SpecializationResponse
pub async fn create_specialization(
    pool: web::Data<PgPool>,
    payload: web::Json<CreateSpecializationRequest>,
) -> impl Responder {
    let name = payload.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().body("Specialization name cannot be empty");
    }

    if let Some(city_id) = payload.city_id {
        let city_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM cities WHERE city_id = $1)")
                .bind(city_id)
                .fetch_one(pool.get_ref())
                .await;

        match city_exists {
            Ok(true) => {}
            Ok(false) => return HttpResponse::BadRequest().body("City does not exist"),
            Err(e) => {
                log::error!("Error checking city: {:?}", e);
                return HttpResponse::InternalServerError().body("Error creating specialization");
            }
        }
    }

    let created = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO specializations (specialization_id, name, city_id) \
         VALUES ($1, $2, $3) RETURNING specialization_id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(payload.city_id)
    .fetch_one(pool.get_ref())
    .await;

    match created {
        Ok(id) => fetch_specialization(pool.get_ref(), id).await,
        Err(e) => {
            log::error!("Error creating specialization: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to create specialization")
        }
    }
}

//List Specializations
//List Specializations Input: None
//List Specializations Output: Vec<SpecializationResponse>
pub async fn list_specializations(pool: web::Data<PgPool>) -> impl Responder {
    let query = format!("{} ORDER BY s.name", SPECIALIZATION_QUERY);

    match sqlx::query_as::<_, SpecializationResponse>(&query)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(specializations) => HttpResponse::Ok().json(specializations),
        Err(e) => {
            log::error!("Error listing specializations: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list specializations")
        }
    }
}

//Get Specialization
//Get Specialization Input: Path (/specializations/{specialization_id})
//Get Specialization Output: SpecializationResponse
pub async fn get_specialization(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    fetch_specialization(pool.get_ref(), path.into_inner()).await
}

async fn fetch_specialization(pool: &PgPool, specialization_id: Uuid) -> HttpResponse {
    let query = format!("{} WHERE s.specialization_id = $1", SPECIALIZATION_QUERY);

    match sqlx::query_as::<_, SpecializationResponse>(&query)
        .bind(specialization_id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(specialization)) => HttpResponse::Ok().json(specialization),
        Ok(None) => HttpResponse::NotFound().body("Specialization not found"),
        Err(e) => {
            log::error!("Error fetching specialization: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch specialization")
        }
    }
}

//Update Specialization
//Update Specialization Input: Path (/specializations/{specialization_id}), UpdateSpecializationRequest
//Update Specialization Output: SpecializationResponse
pub async fn update_specialization(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateSpecializationRequest>,
) -> impl Responder {
    let specialization_id = path.into_inner();

    let result = sqlx::query_scalar::<_, Uuid>(
        "UPDATE specializations SET
            name = CASE WHEN $1::text IS NULL THEN name ELSE $1 END,
            city_id = CASE WHEN $2::uuid IS NULL THEN city_id ELSE $2 END
         WHERE specialization_id = $3
         RETURNING specialization_id",
    )
    .bind(&payload.name)
    .bind(payload.city_id)
    .bind(specialization_id)
    .fetch_optional(pool.get_ref())
    .await;

    match result {
        Ok(Some(id)) => fetch_specialization(pool.get_ref(), id).await,
        Ok(None) => HttpResponse::NotFound().body("Specialization not found"),
        Err(e) => {
            log::error!("Error updating specialization: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update specialization")
        }
    }
}

//Delete Specialization
//Delete Specialization Input: Path (/specializations/{specialization_id})
//Delete Specialization Output: Success message
pub async fn delete_specialization(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let result = sqlx::query("DELETE FROM specializations WHERE specialization_id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            HttpResponse::Ok().body("Specialization deleted successfully")
        }
        Ok(_) => HttpResponse::NotFound().body("Specialization not found"),
        Err(e) => {
            log::error!("Error deleting specialization: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete specialization")
        }
    }
}

//Config Specialization Routes
// POST   /specializations/create (admin, superadmin)
// GET    /specializations/list
// GET    /specializations/{id}
// PUT    /specializations/{id}   (admin, superadmin)
// DELETE /specializations/{id}   (admin, superadmin)
pub fn config_specialization_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/specializations")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::post().to(create_specialization)),
            )
            .route("/list", web::get().to(list_specializations))
            .service(
                web::resource("/{id}")
                    .guard(guard::Get())
                    .route(web::get().to(get_specialization)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::put().to(update_specialization))
                    .route(web::delete().to(delete_specialization)),
            ),
    );
}
