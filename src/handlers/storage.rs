use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, error, info};
use reqwest::{header, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct AccountAuthorization {
    api_url: String,
    authorization_token: String,
    download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTarget {
    authorization_token: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredObject {
    bucket_id: String,
    file_name: String,
}

/// Backblaze B2 client backing file uploads. Account authorizations are
/// cached and reused until they age out (B2 tokens last 24 hours).
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    authorization: Arc<Mutex<Option<(AccountAuthorization, Instant)>>>,
    key_id: String,
    key: String,
    bucket_id: String,
}

impl StorageClient {
    pub fn new(key_id: String, key: String, bucket_id: String) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(StorageClient {
            client,
            authorization: Arc::new(Mutex::new(None)),
            key_id,
            key,
            bucket_id,
        })
    }

    async fn authorize_account(&self) -> Result<AccountAuthorization, Box<dyn Error>> {
        {
            let cached = self.authorization.lock().unwrap();
            if let Some((auth, at)) = &*cached {
                if at.elapsed() < Duration::from_secs(23 * 60 * 60) {
                    debug!("Using cached storage authorization");
                    return Ok(auth.clone());
                }
            }
        }

        let credentials = STANDARD.encode(format!("{}:{}", self.key_id, self.key));
        let response = self
            .client
            .get("https://api.backblazeb2.com/b2api/v2/b2_authorize_account")
            .header(header::AUTHORIZATION, format!("Basic {}", credentials))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Storage authorization failed: {}", error_text);
            return Err(format!("Storage authorization failed: {}", error_text).into());
        }

        let auth: AccountAuthorization = response.json().await?;
        info!("Storage account authorized, api url: {}", auth.api_url);

        let mut cached = self.authorization.lock().unwrap();
        *cached = Some((auth.clone(), Instant::now()));

        Ok(auth)
    }

    async fn get_upload_target(&self) -> Result<UploadTarget, Box<dyn Error>> {
        let auth = self.authorize_account().await?;

        let response = self
            .client
            .post(format!("{}/b2api/v2/b2_get_upload_url", auth.api_url))
            .header(header::AUTHORIZATION, &auth.authorization_token)
            .json(&serde_json::json!({ "bucketId": self.bucket_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Failed to get upload url: {}", error_text);
            return Err(format!("Failed to get upload url: {}", error_text).into());
        }

        Ok(response.json().await?)
    }

    /// Uploads one object and returns its public download URL
    pub async fn upload_file(
        &self,
        data: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<String, Box<dyn Error>> {
        let target = self.get_upload_target().await?;

        let mut hasher = Sha1::new();
        hasher.update(data);
        let sha1_hex = format!("{:x}", hasher.finalize());

        info!("Uploading {} ({} bytes)", file_name, data.len());

        let response = self
            .client
            .post(&target.upload_url)
            .header(header::AUTHORIZATION, &target.authorization_token)
            .header("X-Bz-File-Name", file_name)
            .header("Content-Type", content_type)
            .header("Content-Length", data.len().to_string())
            .header("X-Bz-Content-Sha1", sha1_hex)
            .body(data.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Failed to upload {}: {}", file_name, error_text);
            return Err(format!("Failed to upload file: {}", error_text).into());
        }

        let stored: StoredObject = response.json().await?;

        let auth = self.authorize_account().await?;
        Ok(format!(
            "{}/file/{}/{}",
            auth.download_url, stored.bucket_id, stored.file_name
        ))
    }
}
