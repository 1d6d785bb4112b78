use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::storage::StorageClient;
use crate::middleware::auth_middleware::RoleGuard;
use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

//Uploaded File Response
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub url: String,
}

/// Object keys are a fresh UUID plus the original extension, so uploads can
/// never collide or traverse
fn object_name(original_name: &str) -> String {
    match Path::new(original_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

//Upload Files
//Upload Files Input: HttpRequest(JWT Token), multipart form with one or more files
//Upload Files Output: Vec<UploadedFile> with public URLs
pub async fn upload_files(
    storage: web::Data<StorageClient>,
    req: HttpRequest,
    mut payload: Multipart,
) -> impl Responder {
    if req.extensions().get::<AuthenticatedUser>().is_none() {
        return HttpResponse::Unauthorized().body("Authentication required");
    }

    let mut uploaded: Vec<UploadedFile> = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                log::error!("Invalid multipart field: {}", e);
                return HttpResponse::BadRequest().body("Invalid multipart payload");
            }
        };

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(sanitize_filename::sanitize)
            .unwrap_or_default();

        let mut data = web::BytesMut::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(e) => {
                    log::error!("Error reading upload: {}", e);
                    return HttpResponse::BadRequest().body("Failed to read uploaded file");
                }
            }
        }

        if data.is_empty() {
            continue;
        }

        let content_type: mime::Mime = mime_guess::from_path(&original_name).first_or_octet_stream();
        let object_name = object_name(&original_name);

        match storage
            .upload_file(&data, &object_name, content_type.as_ref())
            .await
        {
            Ok(url) => uploaded.push(UploadedFile {
                file_name: original_name,
                url,
            }),
            Err(e) => {
                log::error!("Error uploading file: {}", e);
                return HttpResponse::InternalServerError().body("Failed to upload file");
            }
        }
    }

    if uploaded.is_empty() {
        return HttpResponse::BadRequest().body("No files provided");
    }

    HttpResponse::Ok().json(uploaded)
}

//Config Upload Routes
// POST /uploads/create (any authenticated account)
pub fn config_upload_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/uploads").service(
            web::resource("/create")
                .wrap(RoleGuard::authenticated())
                .route(web::post().to(upload_files)),
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_keeps_the_extension() {
        let name = object_name("scan-results.pdf");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn object_name_without_extension_is_a_bare_uuid() {
        let name = object_name("README");
        assert!(Uuid::parse_str(&name).is_ok());
    }

    #[test]
    fn object_names_never_collide_for_the_same_input() {
        assert_ne!(object_name("a.png"), object_name("a.png"));
    }
}
