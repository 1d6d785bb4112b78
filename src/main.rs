mod config;
mod handlers;
mod middleware;
mod models;
mod routes;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use config::AppConfig;
use handlers::auth::TokenCodec;
use handlers::diagnosis::DiagnosisClient;
use handlers::storage::StorageClient;
use log::info;
use middleware::request_logger::RequestLogger;
use routes::{
    appointments::config_appointment_routes, cities::config_city_routes,
    doctors::config_doctor_routes, medical_records::config_medical_record_routes,
    prescriptions::config_prescription_routes, reviews::config_review_routes,
    specializations::config_specialization_routes,
    symptom_checker::config_symptom_checker_routes, uploads::config_upload_routes,
    user_auth::config_user_auth_routes,
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    info!("=== MedPoint API Server Starting ===");

    // Configuration problems (including a missing signing secret) abort here,
    // before the server ever accepts a request
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    if handlers::db::check_db_connection(&pool).await {
        info!("Database connection established and verified");
    } else {
        info!("Database connection established but verification failed");
    }

    let codec = web::Data::new(TokenCodec::new(
        &config.jwt_secret,
        config.jwt_lifetime_hours,
    ));

    let storage = StorageClient::new(
        config.b2_key_id.clone(),
        config.b2_key.clone(),
        config.b2_bucket_id.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize storage client: {}", e))?;

    let diagnosis_client = DiagnosisClient::new(config.diagnosis_api_url.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize diagnosis client: {}", e))?;

    let bind_address = config.bind_address.clone();
    info!("Starting MedPoint API Server on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin_fn(|_origin, _req_head| true)
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(codec.clone())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(diagnosis_client.clone()))
            .wrap(Logger::new("%t [%s] \"%r\" %b %D ms \"%{User-Agent}i\" %a"))
            .wrap(RequestLogger)
            .wrap(cors)
            .service(
                web::scope("/api")
                    .configure(config_user_auth_routes)
                    .configure(config_doctor_routes)
                    .configure(config_appointment_routes)
                    .configure(config_prescription_routes)
                    .configure(config_medical_record_routes)
                    .configure(config_review_routes)
                    .configure(config_city_routes)
                    .configure(config_specialization_routes)
                    .configure(config_symptom_checker_routes)
                    .configure(config_upload_routes),
            )
            .route(
                "/",
                web::get().to(|| async { HttpResponse::Ok().body("Welcome to MedPoint API") }),
            )
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await
    .context("Server error")
}
