use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{City, Specialization, UserRole};
use actix_web::{guard, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

//Create City Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCityRequest {
    pub name: String,
}

//Update City Request
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateCityRequest {
    pub name: String,
}

//Create City
//Create City Input: CreateCityRequest
//Create City Output: City
pub async fn create_city(
    pool: web::Data<PgPool>,
    payload: web::Json<CreateCityRequest>,
) -> impl Responder {
    let name = payload.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().body("City name cannot be empty");
    }

    let result = sqlx::query_as::<_, City>(
        "INSERT INTO cities (city_id, name) VALUES ($1, $2) RETURNING city_id, name",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool.get_ref())
    .await;

    match result {
        Ok(city) => HttpResponse::Ok().json(city),
        Err(e) => {
            log::error!("Error creating city: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to create city")
        }
    }
}

//List Cities
//List Cities Input: None
//List Cities Output: cities with their specializations, doctors and doctor counts
pub async fn list_cities(pool: web::Data<PgPool>) -> impl Responder {
    let cities = match sqlx::query_as::<_, City>("SELECT city_id, name FROM cities ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(cities) => cities,
        Err(e) => {
            log::error!("Error listing cities: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to list cities");
        }
    };

    let specializations = match sqlx::query_as::<_, Specialization>(
        "SELECT specialization_id, name, city_id FROM specializations",
    )
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(specializations) => specializations,
        Err(e) => {
            log::error!("Error listing specializations: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to list cities");
        }
    };

    let doctor_rows = match sqlx::query(
        "SELECT d.doctor_id, d.fullname, d.city_id, s.name AS specialization
         FROM doctors d
         LEFT JOIN doctor_specializations ds ON ds.doctor_id = d.doctor_id
         LEFT JOIN specializations s ON s.specialization_id = ds.specialization_id",
    )
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Error listing doctors: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to list cities");
        }
    };

    // One entry per doctor, accumulating specialization names across rows
    let mut doctors: HashMap<Uuid, (String, Option<Uuid>, Vec<String>)> = HashMap::new();
    for row in &doctor_rows {
        let entry = doctors
            .entry(row.get::<Uuid, _>("doctor_id"))
            .or_insert_with(|| {
                (
                    row.get::<String, _>("fullname"),
                    row.get::<Option<Uuid>, _>("city_id"),
                    Vec::new(),
                )
            });
        if let Some(specialization) = row.get::<Option<String>, _>("specialization") {
            entry.2.push(specialization);
        }
    }

    let response = cities
        .iter()
        .map(|city| {
            let city_doctors = doctors
                .iter()
                .filter(|(_, (_, city_id, _))| *city_id == Some(city.city_id))
                .map(|(doctor_id, (fullname, _, specializations))| {
                    json!({
                        "doctor_id": doctor_id,
                        "fullname": fullname,
                        "specializations": specializations,
                    })
                })
                .collect::<Vec<_>>();

            let city_specializations = specializations
                .iter()
                .filter(|s| s.city_id == Some(city.city_id))
                .collect::<Vec<_>>();

            json!({
                "city_id": city.city_id,
                "name": city.name,
                "specializations": city_specializations,
                "total_count_of_doctors": city_doctors.len(),
                "doctors": city_doctors,
            })
        })
        .collect::<Vec<_>>();

    HttpResponse::Ok().json(response)
}

//Get City
//Get City Input: Path (/cities/{city_id})
//Get City Output: City with its specializations and doctors
pub async fn get_city(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let city_id = path.into_inner();

    let city = match sqlx::query_as::<_, City>("SELECT city_id, name FROM cities WHERE city_id = $1")
        .bind(city_id)
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(city)) => city,
        Ok(None) => return HttpResponse::NotFound().body("City not found"),
        Err(e) => {
            log::error!("Error fetching city: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch city");
        }
    };

    let specializations = match sqlx::query_as::<_, Specialization>(
        "SELECT specialization_id, name, city_id FROM specializations WHERE city_id = $1",
    )
    .bind(city_id)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(specializations) => specializations,
        Err(e) => {
            log::error!("Error fetching city specializations: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch city");
        }
    };

    let doctors = match sqlx::query(
        "SELECT doctor_id, fullname FROM doctors WHERE city_id = $1 ORDER BY fullname",
    )
    .bind(city_id)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(rows) => rows
            .iter()
            .map(|row| {
                json!({
                    "doctor_id": row.get::<Uuid, _>("doctor_id"),
                    "fullname": row.get::<String, _>("fullname"),
                })
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            log::error!("Error fetching city doctors: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch city");
        }
    };

    HttpResponse::Ok().json(json!({
        "city_id": city.city_id,
        "name": city.name,
        "specializations": specializations,
        "doctors": doctors,
    }))
}

//Update City
//Update City Input: Path (/cities/{city_id}), UpdateCityRequest
//Update City Output: City
pub async fn update_city(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateCityRequest>,
) -> impl Responder {
    let name = payload.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().body("City name cannot be empty");
    }

    let result = sqlx::query_as::<_, City>(
        "UPDATE cities SET name = $1 WHERE city_id = $2 RETURNING city_id, name",
    )
    .bind(name)
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await;

    match result {
        Ok(Some(city)) => HttpResponse::Ok().json(city),
        Ok(None) => HttpResponse::NotFound().body("City not found"),
        Err(e) => {
            log::error!("Error updating city: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update city")
        }
    }
}

//Delete City
//Delete City Input: Path (/cities/{city_id})
//Delete City Output: Success message
pub async fn delete_city(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> impl Responder {
    let result = sqlx::query("DELETE FROM cities WHERE city_id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => HttpResponse::Ok().body("City deleted successfully"),
        Ok(_) => HttpResponse::NotFound().body("City not found"),
        Err(e) => {
            log::error!("Error deleting city: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to delete city")
        }
    }
}

//Config City Routes
// POST   /cities/create (admin, superadmin)
// GET    /cities/list
// GET    /cities/{id}
// PUT    /cities/{id}   (admin, superadmin)
// DELETE /cities/{id}   (admin, superadmin)
pub fn config_city_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cities")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::post().to(create_city)),
            )
            .route("/list", web::get().to(list_cities))
            // Reads on /{id} stay public; the method guard lets mutating
            // verbs fall through to the admin-gated resource below
            .service(
                web::resource("/{id}")
                    .guard(guard::Get())
                    .route(web::get().to(get_city)),
            )
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::Admin, UserRole::SuperAdmin]))
                    .route(web::put().to(update_city))
                    .route(web::delete().to(delete_city)),
            ),
    );
}
