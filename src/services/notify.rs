use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BloodRequest, DonorMatch};

/// Errors that can occur when talking to the notification service
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),
}

/// Notification service client
///
/// Delivery (SMS/WhatsApp/push) is owned by an external collaborator. The
/// engine hands over recipients and context; it never waits on delivery and
/// a failed recipient never fails the triggering operation.
pub struct NotifyClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl NotifyClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Queue one emergency notification for a matched donor
    pub async fn notify_donor(
        &self,
        broadcast_id: Uuid,
        request: &BloodRequest,
        donor: &DonorMatch,
    ) -> Result<(), NotifyError> {
        let url = format!(
            "{}/notifications",
            self.base_url.trim_end_matches('/')
        );

        let payload = json!({
            "channel": "emergency_request",
            "broadcastId": broadcast_id,
            "requestId": request.id,
            "donorId": donor.donor_id,
            "phone": donor.phone,
            "bloodGroup": request.blood_group,
            "component": request.component,
            "urgency": request.urgency,
            "distanceKm": donor.distance_km,
        });

        let response = self
            .client
            .post(&url)
            .header("X-Service-Key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::ApiError(format!(
                "Failed to queue notification: {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Fan an emergency broadcast out to every matched donor
    ///
    /// Fire-and-forget: failures are logged per recipient and swallowed. The
    /// broadcast record was already committed by the caller.
    pub async fn fan_out(&self, broadcast_id: Uuid, request: &BloodRequest, matches: &[DonorMatch]) {
        let mut delivered = 0usize;

        for donor in matches {
            match self.notify_donor(broadcast_id, request, donor).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        "Notification for donor {} on broadcast {} failed: {}",
                        donor.donor_id,
                        broadcast_id,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Broadcast {} fan-out complete: {}/{} notifications queued",
            broadcast_id,
            delivered,
            matches.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_client_creation() {
        let client = NotifyClient::new(
            "https://notify.test/v1/".to_string(),
            "test_key".to_string(),
        );
        assert_eq!(client.base_url, "https://notify.test/v1/");
        assert_eq!(client.api_key, "test_key");
    }
}
