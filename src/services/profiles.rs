use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::distance::BoundingBox;
use crate::models::{BloodGroup, Donor, Patient};

/// Errors that can occur when interacting with the profile service
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Profile service client
///
/// Donor and patient demographic records are owned by the profile service;
/// the engine only ever reads snapshots through this client:
/// - candidate donor pulls by blood group (with an optional bounding box)
/// - single donor lookups by id or email
/// - patient lookups by id
pub struct ProfileClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ProfileClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Pull candidate donor snapshots for the given blood groups
    ///
    /// The bounding box is a cheap server-side pre-filter; donors without
    /// coordinates are still returned and ranked last by the matcher.
    pub async fn list_donors(
        &self,
        groups: &[BloodGroup],
        bbox: Option<&BoundingBox>,
    ) -> Result<Vec<Donor>, ProfileError> {
        let mut params: Vec<String> = groups
            .iter()
            .map(|g| format!("bloodGroup={}", urlencoding::encode(g.as_str())))
            .collect();

        if let Some(bbox) = bbox {
            params.push(format!("minLat={}", bbox.min_lat));
            params.push(format!("maxLat={}", bbox.max_lat));
            params.push(format!("minLng={}", bbox.min_lon));
            params.push(format!("maxLng={}", bbox.max_lon));
            params.push("includeUnlocated=true".to_string());
        }

        let url = format!("{}?{}", self.url("/donors"), params.join("&"));
        tracing::debug!("Fetching donor candidates from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to list donors: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("donors")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProfileError::InvalidResponse("Missing donors array".into()))?;

        // A malformed document degrades to a skipped candidate, never a failed search
        let donors: Vec<Donor> = documents
            .iter()
            .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
            .collect();

        tracing::debug!("Fetched {} donor candidates", donors.len());

        Ok(donors)
    }

    /// Fetch a single donor snapshot by its profile-service id
    pub async fn get_donor(&self, donor_id: &str) -> Result<Donor, ProfileError> {
        let url = self.url(&format!("/donors/{}", urlencoding::encode(donor_id)));

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProfileError::NotFound(format!("Donor {} not found", donor_id)));
        }
        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to fetch donor: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let data = json.get("donor").unwrap_or(&json);

        serde_json::from_value(data.clone())
            .map_err(|e| ProfileError::InvalidResponse(format!("Failed to parse donor: {}", e)))
    }

    /// Resolve a donor by email, used when a patient assembles a cohort
    pub async fn find_donor_by_email(&self, email: &str) -> Result<Donor, ProfileError> {
        let url = format!(
            "{}?email={}",
            self.url("/donors"),
            urlencoding::encode(email)
        );

        tracing::debug!("Resolving donor by email");

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to resolve donor: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("donors")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProfileError::InvalidResponse("Missing donors array".into()))?;

        let doc = documents
            .first()
            .ok_or_else(|| ProfileError::NotFound(format!("No donor with email {}", email)))?;

        serde_json::from_value(doc.clone())
            .map_err(|e| ProfileError::InvalidResponse(format!("Failed to parse donor: {}", e)))
    }

    /// Fetch a patient snapshot by id
    pub async fn get_patient(&self, patient_id: &str) -> Result<Patient, ProfileError> {
        let url = self.url(&format!("/patients/{}", urlencoding::encode(patient_id)));

        let response = self
            .client
            .get(&url)
            .header("X-Service-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProfileError::NotFound(format!(
                "Patient {} not found",
                patient_id
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch patient {}: {} - {}", patient_id, status, body);
            return Err(ProfileError::ApiError(format!(
                "Failed to fetch patient: {}",
                status
            )));
        }

        let json: Value = response.json().await?;
        let data = json.get("patient").unwrap_or(&json);

        serde_json::from_value(data.clone())
            .map_err(|e| ProfileError::InvalidResponse(format!("Failed to parse patient: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_client_creation() {
        let client = ProfileClient::new(
            "https://profiles.test/v1/".to_string(),
            "test_key".to_string(),
        );

        assert_eq!(client.url("/donors"), "https://profiles.test/v1/donors");
        assert_eq!(client.api_key, "test_key");
    }
}
