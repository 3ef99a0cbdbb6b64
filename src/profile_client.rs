//! Client for the farmer-profile REST API.
//!
//! Pure request/response plumbing: authenticated calls carry the caller's
//! bearer token, public lookups carry nothing.

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid profile API URL {0}")]
    InvalidBaseUrl(String),

    #[error("Profile API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Profile API responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farming_type: Option<String>,
    #[serde(default)]
    pub primary_crops: Vec<String>,
    #[serde(default)]
    pub secondary_crops: Vec<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub is_profile_complete: bool,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Editable profile fields; unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farming_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_crops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_crops: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ProfileClient {
    client: Client,
    base: Url,
}

impl ProfileClient {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str) -> Result<Self, ProfileError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ProfileError> {
        let base = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ProfileError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { client, base })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_my_profile(&self, token: &str) -> Result<FarmerProfile, ProfileError> {
        let request = self.client.get(self.url(&["farmer-profile", "me"]));
        send(request.bearer_auth(token)).await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        token: &str,
    ) -> Result<FarmerProfile, ProfileError> {
        let request = self.client.put(self.url(&["farmer-profile"])).json(update);
        send(request.bearer_auth(token)).await
    }

    pub async fn get_profile_by_id(&self, id: &str) -> Result<FarmerProfile, ProfileError> {
        send(self.client.get(self.url(&["farmer-profile", id]))).await
    }

    pub async fn search_by_location(
        &self,
        location: &str,
    ) -> Result<Vec<FarmerProfile>, ProfileError> {
        send(self.client.get(self.url(&["farmer-profile", "search", location]))).await
    }

    pub async fn update_stats<S: Serialize + ?Sized>(
        &self,
        stats: &S,
        token: &str,
    ) -> Result<serde_json::Value, ProfileError> {
        let request = self.client.put(self.url(&["farmer-profile", "stats"])).json(stats);
        send(request.bearer_auth(token)).await
    }
}

#[tracing::instrument(skip_all)]
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProfileError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "Profile API call failed");
        return Err(ProfileError::Status { status, body });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            ProfileClient::new("mailto:farmer@example.com"),
            Err(ProfileError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn path_segments_are_encoded() {
        let client = ProfileClient::new("http://localhost:5000/api").unwrap();
        let url = client.url(&["farmer-profile", "search", "Mandya district/south"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/farmer-profile/search/Mandya%20district%2Fsouth"
        );
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let profile: FarmerProfile = serde_json::from_value(serde_json::json!({
            "_id": "64f0",
            "farmName": "Green Acres",
            "primaryCrops": ["tomato"],
            "rating": 4.5,
        }))
        .unwrap();

        assert_eq!(profile.id.as_deref(), Some("64f0"));
        assert_eq!(profile.farm_name.as_deref(), Some("Green Acres"));
        assert_eq!(profile.primary_crops, vec!["tomato"]);
        assert_eq!(profile.extra.get("rating"), Some(&serde_json::json!(4.5)));
    }
}
