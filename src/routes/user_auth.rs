use crate::handlers::auth::{AuthenticatedUser, TokenCodec};
use crate::handlers::password::{hash_password, verify_password};
use crate::middleware::auth_middleware::RoleGuard;
use crate::models::all_models::UserRole;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

//Register Request
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub fullname: String,
    pub phone_number: String,
    pub password: String,
    pub photo: Option<String>,
}

//Login Request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

//Account Response
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AccountResponse {
    pub user_id: Uuid,
    pub fullname: String,
    pub phone_number: String,
    pub role: UserRole,
    pub photo: Option<String>,
    pub created_at: NaiveDateTime,
}

//Auth Response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AccountResponse,
}

#[derive(sqlx::FromRow)]
struct UserAuthRow {
    user_id: Uuid,
    fullname: String,
    phone_number: String,
    password_hash: String,
    role: UserRole,
    photo: Option<String>,
    created_at: NaiveDateTime,
}

//Register
//Register Input: RegisterRequest
//Register Output: AuthResponse
pub async fn register(
    pool: web::Data<PgPool>,
    codec: web::Data<TokenCodec>,
    payload: web::Json<RegisterRequest>,
) -> impl Responder {
    let fullname = payload.fullname.trim();
    if fullname.len() < 5 {
        return HttpResponse::BadRequest().body("Fullname must be at least 5 characters");
    }
    if payload.password.len() < 5 {
        return HttpResponse::BadRequest().body("Password must be at least 5 characters");
    }

    let existing =
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM users WHERE phone_number = $1")
            .bind(payload.phone_number.trim())
            .fetch_optional(pool.get_ref())
            .await;

    match existing {
        Ok(Some(_)) => return HttpResponse::Conflict().body("Phone number already exists"),
        Ok(None) => {}
        Err(e) => {
            log::error!("Error checking phone number: {:?}", e);
            return HttpResponse::InternalServerError().body("Error registering user");
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(_) => return HttpResponse::InternalServerError().body("Failed to hash password"),
    };

    let query = "
        INSERT INTO users (user_id, fullname, phone_number, password_hash, role, photo, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING user_id, fullname, phone_number, role, photo, created_at";

    let result = sqlx::query_as::<_, AccountResponse>(query)
        .bind(Uuid::new_v4())
        .bind(fullname)
        .bind(payload.phone_number.trim())
        .bind(password_hash)
        .bind(UserRole::User)
        .bind(&payload.photo)
        .fetch_one(pool.get_ref())
        .await;

    match result {
        Ok(user) => match codec.issue(user.user_id, user.role) {
            Ok(token) => HttpResponse::Ok().json(AuthResponse { token, user }),
            Err(e) => {
                log::error!("Failed to issue token: {:?}", e);
                HttpResponse::InternalServerError().body("Error issuing token")
            }
        },
        Err(e) => {
            log::error!("Error creating user: {:?}", e);
            HttpResponse::InternalServerError().body("Error registering user")
        }
    }
}

//Login
//Login Input: LoginRequest
//Login Output: AuthResponse
pub async fn login(
    pool: web::Data<PgPool>,
    codec: web::Data<TokenCodec>,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    let query = "
        SELECT user_id, fullname, phone_number, password_hash, role, photo, created_at
        FROM users WHERE phone_number = $1";

    let user = sqlx::query_as::<_, UserAuthRow>(query)
        .bind(payload.phone_number.trim())
        .fetch_optional(pool.get_ref())
        .await;

    // One message for an unknown phone and a wrong password
    match user {
        Ok(Some(user)) => {
            let verified = match verify_password(&payload.password, &user.password_hash) {
                Ok(v) => v,
                Err(_) => {
                    return HttpResponse::InternalServerError().body("Error verifying password");
                }
            };

            if !verified {
                return HttpResponse::Unauthorized().body("Incorrect phone number or password");
            }

            match codec.issue(user.user_id, user.role) {
                Ok(token) => HttpResponse::Ok().json(AuthResponse {
                    token,
                    user: AccountResponse {
                        user_id: user.user_id,
                        fullname: user.fullname,
                        phone_number: user.phone_number,
                        role: user.role,
                        photo: user.photo,
                        created_at: user.created_at,
                    },
                }),
                Err(e) => {
                    log::error!("Failed to issue token: {:?}", e);
                    HttpResponse::InternalServerError().body("Error issuing token")
                }
            }
        }
        Ok(None) => HttpResponse::Unauthorized().body("Incorrect phone number or password"),
        Err(e) => {
            log::error!("Error retrieving user: {:?}", e);
            HttpResponse::InternalServerError().body("Error logging in")
        }
    }
}

//Get Current Account
//Get Current Account Input: HttpRequest(JWT Token)
//Get Current Account Output: AccountResponse
pub async fn get_me(pool: web::Data<PgPool>, req: HttpRequest) -> impl Responder {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
        let query = "
            SELECT user_id, fullname, phone_number, role, photo, created_at
            FROM users WHERE user_id = $1";

        let result = sqlx::query_as::<_, AccountResponse>(query)
            .bind(user.id)
            .fetch_one(pool.get_ref())
            .await;

        match result {
            Ok(account) => HttpResponse::Ok().json(account),
            Err(e) => {
                log::error!("Error fetching account: {:?}", e);
                HttpResponse::NotFound().body("Account not found")
            }
        }
    } else {
        HttpResponse::Unauthorized().body("Authentication required")
    }
}

//Config User Auth Routes
// POST /auth/register
// POST /auth/login
// GET  /auth/me
pub fn config_user_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/me")
                    .wrap(RoleGuard::authenticated())
                    .route(web::get().to(get_me)),
            ),
    );
}
