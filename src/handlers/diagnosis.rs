use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;

// EndlessMedical requires this exact passphrase before a session may be used
const TERMS_PASSPHRASE: &str = "I have read, understood and I accept and agree to comply with the Terms of Use of EndlessMedicalAPI and Endless Medical services. The Terms of Use are available on endlessmedical.com";

#[derive(Debug, Deserialize)]
struct InitSessionResponse {
    #[serde(rename = "SessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(rename = "Diseases")]
    diseases: Vec<serde_json::Value>,
}

/// Client for the EndlessMedical diagnostic API. Each analysis runs its own
/// upstream session: init, accept terms, push one feature per symptom,
/// analyze.
#[derive(Clone)]
pub struct DiagnosisClient {
    client: Client,
    base_url: String,
}

impl DiagnosisClient {
    pub fn new(base_url: String) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(DiagnosisClient { client, base_url })
    }

    async fn init_session(&self) -> Result<String, Box<dyn Error>> {
        let response: InitSessionResponse = self
            .client
            .get(format!("{}/InitSession", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Diagnosis session initialized: {}", response.session_id);
        Ok(response.session_id)
    }

    async fn accept_terms(&self, session_id: &str) -> Result<(), Box<dyn Error>> {
        self.client
            .post(format!("{}/AcceptTermsOfUse", self.base_url))
            .query(&[("SessionID", session_id), ("passphrase", TERMS_PASSPHRASE)])
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn update_feature(&self, session_id: &str, symptom: &str) -> Result<(), Box<dyn Error>> {
        self.client
            .post(format!("{}/UpdateFeature", self.base_url))
            .query(&[("SessionID", session_id), ("name", symptom), ("value", "1")])
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Runs a full analysis and returns the suggested disease names joined
    /// into one diagnosis string
    pub async fn analyze(&self, symptoms: &[String]) -> Result<String, Box<dyn Error>> {
        let session_id = self.init_session().await?;
        self.accept_terms(&session_id).await?;

        for symptom in symptoms {
            debug!("Reporting symptom: {}", symptom);
            self.update_feature(&session_id, symptom).await?;
        }

        let analysis: AnalyzeResponse = self
            .client
            .get(format!("{}/Analyze", self.base_url))
            .query(&[("SessionID", &session_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Each entry is an object keyed by a single disease name
        let diagnosis = analysis
            .diseases
            .iter()
            .filter_map(|disease| disease.as_object())
            .filter_map(|entry| entry.keys().next())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        info!("Diagnosis produced {} candidate diseases", analysis.diseases.len());
        Ok(diagnosis)
    }
}
