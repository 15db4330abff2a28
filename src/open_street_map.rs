//! Building lookup against an OpenStreetMap Overpass server

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::projection::Coordinate;
use crate::types::{BuildingCentroid, Region};

/// Public Overpass endpoint used when none is configured
pub const DEFAULT_OVERPASS_URL: &str = "https://lz4.overpass-api.de/api/interpreter";

/// Server-side query timeout, in seconds
const QUERY_TIMEOUT_SECS: u64 = 600;

/// Finds building centroids inside areas of interest
#[async_trait]
pub trait BuildingFinder: Send + Sync {
    async fn building_centroids(&self, regions: &[Region]) -> Result<Vec<BuildingCentroid>>;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn position(&self) -> Option<Coordinate> {
        match (&self.center, self.lat, self.lon) {
            (Some(center), _, _) => Some(Coordinate::from_lonlat(center.lon, center.lat)),
            (None, Some(lat), Some(lon)) => Some(Coordinate::from_lonlat(lon, lat)),
            _ => None,
        }
    }
}

/// Formats a region's exterior ring as an Overpass `poly` filter ("lat lon lat lon ...")
pub fn poly_filter(region: &Region) -> String {
    region
        .exterior
        .iter()
        .map(|c| format!("{} {}", c.lat(), c.lon()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the Overpass QL query for every building in a region
pub fn building_query(region: &Region) -> String {
    let poly = poly_filter(region);
    format!(
        "[out:json][timeout:{timeout}];\n\
         (\n  node[\"building\"](poly:\"{poly}\");\n  \
         way[\"building\"](poly:\"{poly}\");\n  \
         relation[\"building\"](poly:\"{poly}\");\n);\n\
         out center;",
        timeout = QUERY_TIMEOUT_SECS,
        poly = poly,
    )
}

/// Overpass API client
pub struct OverpassClient {
    url: String,
    client: Client,
}

impl OverpassClient {
    /// Creates a client for the given interpreter URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS + 60))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Returns the interpreter URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn query(&self, query: &str) -> Result<OverpassResponse> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(Error::Service {
                service: "Overpass",
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl BuildingFinder for OverpassClient {
    async fn building_centroids(&self, regions: &[Region]) -> Result<Vec<BuildingCentroid>> {
        let mut seen = HashSet::new();
        let mut centroids = Vec::new();

        for (index, region) in regions.iter().enumerate() {
            let response = self.query(&building_query(region)).await?;
            tracing::debug!(
                region = index,
                elements = response.elements.len(),
                "Overpass query returned"
            );

            for element in response.elements {
                let Some(position) = element.position() else {
                    continue;
                };
                // Overpass only filters on the exterior ring
                if region.interiors.iter().any(|hole| crate::geometry::ring_contains(hole, position)) {
                    continue;
                }
                if seen.insert((element.element_type, element.id)) {
                    centroids.push(BuildingCentroid::from(position));
                }
            }
        }

        Ok(centroids)
    }
}
