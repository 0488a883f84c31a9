use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{LocationInfo, PlaceCandidate, PlaceProvider, PlaceReview};
use crate::config::PlacesConfig;
use crate::error::ProviderError;

const REVIEW_FIELDS: &str = "reviews,rating,user_ratings_total";
const ADDRESS_FIELDS: &str = "address_components,formatted_address";

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    place_id: String,
    #[serde(default)]
    name: String,
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
    rating: Option<f64>,
    user_ratings_total: Option<i32>,
    price_level: Option<i32>,
    opening_hours: Option<Value>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<DetailsResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsResult {
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Review {
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    rating: i32,
    #[serde(default)]
    text: String,
    profile_photo_url: Option<String>,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

pub struct GooglePlacesClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_reviews: usize,
}

impl GooglePlacesClient {
    pub fn new(config: &PlacesConfig) -> Self {
        if config.api_key.is_none() {
            warn!("⚠️ GOOGLE_API_KEY not set. Place enrichment will be skipped.");
        }
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_reviews: config.max_reviews,
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("GOOGLE_API_KEY"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let res = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn details(&self, place_id: &str, fields: &str) -> Result<DetailsResult, ProviderError> {
        let key = self.key()?;
        let response: DetailsResponse = self
            .get_json(
                "details/json",
                &[("place_id", place_id), ("fields", fields), ("key", key)],
            )
            .await?;

        if response.status != "OK" {
            return Err(ProviderError::Api {
                status: response.status,
                message: response.error_message,
            });
        }
        Ok(response.result.unwrap_or_default())
    }
}

#[async_trait]
impl PlaceProvider for GooglePlacesClient {
    async fn search(&self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
        let key = self.key()?;
        info!("Searching Google Places for: {}", query);

        let response: TextSearchResponse = self
            .get_json("textsearch/json", &[("query", query), ("key", key)])
            .await?;

        candidate_from_search(response)
    }

    async fn reviews(&self, place_id: &str) -> Result<Vec<PlaceReview>, ProviderError> {
        let details = self.details(place_id, REVIEW_FIELDS).await?;
        Ok(details
            .reviews
            .into_iter()
            .take(self.max_reviews)
            .map(|r| PlaceReview {
                author_name: r.author_name,
                text: r.text,
                rating: r.rating,
                profile_photo_url: r.profile_photo_url,
                time: r.time,
            })
            .collect())
    }

    async fn address(&self, place_id: &str) -> Result<Option<LocationInfo>, ProviderError> {
        let details = self.details(place_id, ADDRESS_FIELDS).await?;
        Ok(location_from_details(details))
    }

    fn photo_url(&self, photo_reference: &str, max_width: u32) -> Option<String> {
        let key = self.api_key.as_deref()?;
        let max_width = max_width.to_string();
        Url::parse_with_params(
            &format!("{}/photo", self.base_url),
            &[
                ("maxwidth", max_width.as_str()),
                ("photo_reference", photo_reference),
                ("key", key),
            ],
        )
        .map(String::from)
        .map_err(|e| warn!("Invalid photo URL for {}: {}", photo_reference, e))
        .ok()
    }
}

fn candidate_from_search(
    response: TextSearchResponse,
) -> Result<Option<PlaceCandidate>, ProviderError> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        _ => {
            return Err(ProviderError::Api {
                status: response.status,
                message: response.error_message,
            })
        }
    }

    // First result is the most relevant one
    let Some(first) = response.results.into_iter().next() else {
        return Ok(None);
    };
    let location = first.geometry.and_then(|g| g.location);

    Ok(Some(PlaceCandidate {
        place_id: first.place_id,
        name: first.name,
        formatted_address: first.formatted_address,
        latitude: location.as_ref().map(|l| l.lat),
        longitude: location.as_ref().map(|l| l.lng),
        rating: first.rating,
        user_ratings_total: first.user_ratings_total,
        price_level: first.price_level,
        opening_hours: first.opening_hours,
        photo_references: first
            .photos
            .into_iter()
            .map(|p| p.photo_reference)
            .filter(|r| !r.is_empty())
            .collect(),
    }))
}

/// Country from `country`; city from `locality`, falling back to
/// `administrative_area_level_1` then `administrative_area_level_2`.
fn location_from_details(details: DetailsResult) -> Option<LocationInfo> {
    if details.address_components.is_empty() {
        return None;
    }

    let component = |kind: &str| {
        details
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    };

    let country = component("country");
    let city = component("locality")
        .or_else(|| component("administrative_area_level_1"))
        .or_else(|| component("administrative_area_level_2"));

    Some(LocationInfo {
        country,
        city,
        formatted_address: details.formatted_address.clone(),
    })
}
