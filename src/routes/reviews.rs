use crate::handlers::auth::AuthenticatedUser;
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::{Review, UserRole};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Create Review Request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateReviewRequest {
    pub doctor_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

//Update Review Request
// Doctor and patient ids never change through an update
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

const REVIEW_COLUMNS: &str = "review_id, doctor_id, patient_id, rating, comment, created_at";

fn rating_in_range(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

//Create Review
//Create Review Input: HttpRequest(JWT Token), CreateReviewRequest
//Create Review Output: Review
pub async fn create_review(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    payload: web::Json<CreateReviewRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        if !rating_in_range(payload.rating) {
            return HttpResponse::BadRequest().body("Rating must be between 1 and 5");
        }

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
                return HttpResponse::InternalServerError().body("Error creating review");
            }
        }

        let query = format!(
            "INSERT INTO reviews (review_id, doctor_id, patient_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING {}",
            REVIEW_COLUMNS
        );

        let result = sqlx::query_as::<_, Review>(&query)
            .bind(Uuid::new_v4())
            .bind(payload.doctor_id)
            .bind(user.id)
            .bind(payload.rating)
            .bind(&payload.comment)
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(review) => HttpResponse::Ok().json(review),
            Err(e) => {
                log::error!("Error creating review: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to create review")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//List Reviews For Doctor
//List Reviews For Doctor Input: Path (/reviews/doctor/{doctor_id})
//List Reviews For Doctor Output: Vec<Review>, newest first
pub async fn list_reviews_for_doctor(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let query = format!(
        "SELECT {} FROM reviews WHERE doctor_id = $1 ORDER BY created_at DESC",
        REVIEW_COLUMNS
    );

    match sqlx::query_as::<_, Review>(&query)
        .bind(path.into_inner())
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(reviews) => HttpResponse::Ok().json(reviews),
        Err(e) => {
            log::error!("Error listing reviews: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to list reviews")
        }
    }
}

//Update Review
//Update Review Input: HttpRequest(JWT Token), Path (/reviews/{review_id}), UpdateReviewRequest
//Update Review Output: Review (only the author may update)
pub async fn update_review(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateReviewRequest>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        if let Some(rating) = payload.rating {
            if !rating_in_range(rating) {
                return HttpResponse::BadRequest().body("Rating must be between 1 and 5");
            }
        }

        let query = format!(
            "UPDATE reviews SET
                rating = CASE WHEN $1::int IS NULL THEN rating ELSE $1 END,
                comment = CASE WHEN $2::text IS NULL THEN comment ELSE $2 END
             WHERE review_id = $3 AND patient_id = $4
             RETURNING {}",
            REVIEW_COLUMNS
        );

        let result = sqlx::query_as::<_, Review>(&query)
            .bind(payload.rating)
            .bind(&payload.comment)
            .bind(path.into_inner())
            .bind(user.id)
            .fetch_optional(pool.get_ref())
            .await;

        match result {
            Ok(Some(review)) => HttpResponse::Ok().json(review),
            Ok(None) => HttpResponse::NotFound().body("Review not found or not yours"),
            Err(e) => {
                log::error!("Error updating review: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to update review")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Delete Review
//Delete Review Input: HttpRequest(JWT Token), Path (/reviews/{review_id})
//Delete Review Output: Success message (only the author may delete)
pub async fn delete_review(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1 AND patient_id = $2")
            .bind(path.into_inner())
            .bind(user.id)
            .execute(pool.get_ref())
            .await;

        match result {
            Ok(res) if res.rows_affected() > 0 => {
                HttpResponse::Ok().body("Review deleted successfully")
            }
            Ok(_) => HttpResponse::NotFound().body("Review not found or not yours"),
            Err(e) => {
                log::error!("Error deleting review: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to delete review")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Config Review Routes
// POST   /reviews/create              (user)
// GET    /reviews/doctor/{doctor_id}
// PUT    /reviews/{id}                (user, author only)
// DELETE /reviews/{id}                (user, author only)
pub fn config_review_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reviews")
            .service(
                web::resource("/create")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::post().to(create_review)),
            )
            .route("/doctor/{doctor_id}", web::get().to(list_reviews_for_doctor))
            .service(
                web::resource("/{id}")
                    .wrap(RoleGuard::allow(&[UserRole::User]))
                    .route(web::put().to(update_review))
                    .route(web::delete().to(delete_review)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(rating_in_range(1));
        assert!(rating_in_range(5));
        assert!(!rating_in_range(0));
        assert!(!rating_in_range(6));
        assert!(!rating_in_range(-3));
    }
}
