//! Earthquake ingestion and listing endpoints.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use perilmail_core::{bounding_box, GeoPoint};
use perilmail_db::{EarthquakeFilter, EarthquakeRow, NewEarthquake};
use perilmail_usgs::{EventQuery, FeedEarthquake};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct IngestEarthquakesRequest {
    bbox: Option<Vec<f64>>,
    #[serde(default = "default_ingest_hours")]
    hours: i64,
    #[serde(default)]
    min_magnitude: f64,
}

fn default_ingest_hours() -> i64 {
    24
}

#[derive(Debug, Serialize)]
pub(super) struct IngestEarthquakesData {
    region: Region,
    query: QueryEcho,
    count: usize,
    stored: StoredCounts,
    earthquakes: Vec<EarthquakeItem>,
}

#[derive(Debug, Serialize)]
struct Region {
    bbox: [f64; 4],
}

#[derive(Debug, Serialize)]
struct QueryEcho {
    hours: i64,
    min_magnitude: f64,
}

#[derive(Debug, Serialize)]
struct StoredCounts {
    inserted: u64,
    updated: u64,
}

#[derive(Debug, Serialize)]
struct EarthquakeItem {
    id: String,
    magnitude: Option<f64>,
    place: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    depth_km: Option<f64>,
    url: Option<String>,
}

impl EarthquakeItem {
    fn from_feed(quake: FeedEarthquake) -> Self {
        Self {
            id: quake.id,
            magnitude: quake.magnitude,
            place: quake.place,
            occurred_at: quake.occurred_at,
            latitude: quake.latitude,
            longitude: quake.longitude,
            depth_km: quake.depth_km,
            url: quake.url,
        }
    }

    fn from_row(row: EarthquakeRow) -> Self {
        Self {
            id: row.external_id,
            magnitude: row.magnitude,
            place: row.place,
            occurred_at: row.occurred_at,
            latitude: row.latitude,
            longitude: row.longitude,
            depth_km: row.depth_km,
            url: row.url,
        }
    }
}

/// Validates a `[min_lng, min_lat, max_lng, max_lat]` box from the request.
fn parse_bbox(raw: &[f64]) -> Option<[f64; 4]> {
    if raw.len() != 4 || raw.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let bbox = [raw[0], raw[1], raw[2], raw[3]];
    if bbox[0] >= bbox[2] || bbox[1] >= bbox[3] {
        return None;
    }
    Some(bbox)
}

fn new_earthquake(quake: &FeedEarthquake) -> NewEarthquake {
    NewEarthquake {
        external_id: quake.id.clone(),
        occurred_at: quake.occurred_at,
        latitude: quake.latitude,
        longitude: quake.longitude,
        magnitude: quake.magnitude,
        depth_km: quake.depth_km,
        place: quake.place.clone(),
        url: quake.url.clone(),
    }
}

/// `POST /api/earthquakes` — fetch recent events from the feed and upsert
/// them into the store.
pub(super) async fn ingest_earthquakes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<IngestEarthquakesRequest>,
) -> Result<Json<ApiResponse<IngestEarthquakesData>>, ApiError> {
    let bbox = match &body.bbox {
        Some(raw) => parse_bbox(raw).ok_or_else(|| {
            ApiError::bad_request(
                req_id.0.clone(),
                "bbox must be [min_lng, min_lat, max_lng, max_lat] with min below max",
            )
            .with_details(serde_json::json!({ "bbox": raw }))
        })?,
        None => EventQuery::default().bbox,
    };

    let query = EventQuery {
        bbox,
        hours: body.hours,
        min_magnitude: body.min_magnitude,
    };

    let fetched = state.usgs.query_events(&query).await.map_err(|error| {
        tracing::error!(error = %error, "earthquake feed query failed");
        ApiError::internal(
            req_id.0.clone(),
            format!("earthquake feed query failed: {error}"),
        )
    })?;

    let records: Vec<NewEarthquake> = fetched.iter().map(new_earthquake).collect();
    let (inserted, updated) = perilmail_db::upsert_earthquakes(&state.pool, &records)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    tracing::info!(
        count = fetched.len(),
        inserted,
        updated,
        "ingested earthquakes from feed"
    );

    let earthquakes: Vec<EarthquakeItem> =
        fetched.into_iter().map(EarthquakeItem::from_feed).collect();

    Ok(Json(ApiResponse {
        data: IngestEarthquakesData {
            region: Region { bbox },
            query: QueryEcho {
                hours: body.hours,
                min_magnitude: body.min_magnitude,
            },
            count: earthquakes.len(),
            stored: StoredCounts { inserted, updated },
            earthquakes,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ListEarthquakesQuery {
    limit: Option<i64>,
    min_magnitude: Option<f64>,
    hours: Option<i32>,
    lat: Option<f64>,
    lng: Option<f64>,
    radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ListEarthquakesData {
    count: usize,
    query: ListQueryEcho,
    earthquakes: Vec<EarthquakeItem>,
}

#[derive(Debug, Serialize)]
struct ListQueryEcho {
    limit: i64,
    min_magnitude: f64,
    hours: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius_km: Option<f64>,
}

/// `GET /api/earthquakes` — list stored events newest-first.
pub(super) async fn list_earthquakes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListEarthquakesQuery>,
) -> Result<Json<ApiResponse<ListEarthquakesData>>, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let min_magnitude = params.min_magnitude.unwrap_or(0.0);
    let hours = params.hours.unwrap_or(168);

    let (bbox, radius_km) = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => {
            let radius = params.radius_km.unwrap_or(100.0);
            let center = GeoPoint::new(lat, lng);
            (Some(bounding_box(center, radius)), Some(radius))
        }
        _ => (None, None),
    };

    let filter = EarthquakeFilter {
        min_magnitude,
        hours,
        bbox,
        limit,
    };

    let rows = perilmail_db::list_earthquakes(&state.pool, &filter)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let earthquakes: Vec<EarthquakeItem> =
        rows.into_iter().map(EarthquakeItem::from_row).collect();

    Ok(Json(ApiResponse {
        data: ListEarthquakesData {
            count: earthquakes.len(),
            query: ListQueryEcho {
                limit,
                min_magnitude,
                hours,
                radius_km,
            },
            earthquakes,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `DELETE /api/earthquakes` — intentionally unimplemented; stored events
/// age out of queries via the `hours` filter instead.
pub(super) async fn purge_earthquakes(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::not_implemented(req_id.0, "bulk earthquake deletion is not supported")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::testutil::{test_app, test_state};
    use super::*;

    fn feed_state(pool: PgPool, base_url: &str) -> AppState {
        let usgs = perilmail_usgs::UsgsClient::with_base_url(5, "perilmail-tests", base_url)
            .expect("test feed client");
        AppState {
            usgs: Arc::new(usgs),
            ..test_state(pool)
        }
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_fetches_and_stores_feed_events(pool: PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("format", "geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "id": "us7000full",
                        "properties": {
                            "mag": 4.2,
                            "time": 1_755_000_000_000_i64,
                            "place": "12 km SW of Ridgecrest, CA",
                            "url": "https://earthquake.usgs.gov/us7000full"
                        },
                        "geometry": { "coordinates": [-117.67, 35.62, 8.1] }
                    },
                    {
                        "id": "us7000bare",
                        "properties": { "mag": null, "time": null }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let app = test_app(feed_state(pool.clone(), &server.uri()));
        let response = app
            .oneshot(post_json(
                "/api/earthquakes",
                serde_json::json!({ "min_magnitude": 2.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 2);
        assert_eq!(json["data"]["stored"]["inserted"], 2);
        assert_eq!(json["data"]["stored"]["updated"], 0);
        assert_eq!(json["data"]["query"]["hours"], 24);
        assert_eq!(json["data"]["earthquakes"][0]["id"], "us7000full");
        assert_eq!(json["data"]["earthquakes"][0]["magnitude"], 4.2);
        assert_eq!(json["data"]["region"]["bbox"][0], -125.0);

        let stored = perilmail_db::find_earthquake(&pool, "us7000full")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.magnitude, Some(4.2));
        assert_eq!(stored.latitude, Some(35.62));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_rejects_malformed_bbox(pool: PgPool) {
        let app = test_app(test_state(pool));
        let response = app
            .oneshot(post_json(
                "/api/earthquakes",
                serde_json::json!({ "bbox": [-125.0, 32.0, -114.0] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert_eq!(json["error"]["details"]["bbox"][2], -114.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_rejects_inverted_bbox(pool: PgPool) {
        let app = test_app(test_state(pool));
        let response = app
            .oneshot(post_json(
                "/api/earthquakes",
                serde_json::json!({ "bbox": [-114.0, 32.0, -125.0, 42.0] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn ingest_surfaces_feed_failures(pool: PgPool) {
        let app = test_app(feed_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(post_json("/api/earthquakes", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "internal_error");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("earthquake feed query failed"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_applies_magnitude_and_time_filters(pool: PgPool) {
        let records = vec![
            NewEarthquake {
                external_id: "recent-strong".to_string(),
                occurred_at: Some(Utc::now() - chrono::Duration::hours(2)),
                latitude: Some(34.0),
                longitude: Some(-118.0),
                magnitude: Some(4.5),
                depth_km: Some(10.0),
                place: Some("Los Angeles, CA".to_string()),
                url: None,
            },
            NewEarthquake {
                external_id: "ancient-weak".to_string(),
                occurred_at: Some(Utc::now() - chrono::Duration::days(30)),
                latitude: Some(37.0),
                longitude: Some(-122.0),
                magnitude: Some(1.2),
                depth_km: None,
                place: None,
                url: None,
            },
        ];
        perilmail_db::upsert_earthquakes(&pool, &records).await.unwrap();

        let app = test_app(test_state(pool));

        let filtered = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/earthquakes?min_magnitude=3.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(filtered.status(), StatusCode::OK);
        let json = body_json(filtered).await;
        assert_eq!(json["data"]["count"], 1);
        assert_eq!(json["data"]["earthquakes"][0]["id"], "recent-strong");
        assert_eq!(json["data"]["query"]["min_magnitude"], 3.0);
        assert_eq!(json["data"]["query"]["hours"], 168);

        let unbounded = app
            .oneshot(
                Request::builder()
                    .uri("/api/earthquakes?hours=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(unbounded).await;
        assert_eq!(json["data"]["count"], 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_filters_by_radius(pool: PgPool) {
        let records = vec![
            NewEarthquake {
                external_id: "nearby".to_string(),
                occurred_at: Some(Utc::now()),
                latitude: Some(34.05),
                longitude: Some(-118.24),
                magnitude: Some(3.0),
                depth_km: None,
                place: None,
                url: None,
            },
            NewEarthquake {
                external_id: "faraway".to_string(),
                occurred_at: Some(Utc::now()),
                latitude: Some(40.7),
                longitude: Some(-74.0),
                magnitude: Some(3.0),
                depth_km: None,
                place: None,
                url: None,
            },
        ];
        perilmail_db::upsert_earthquakes(&pool, &records).await.unwrap();

        let app = test_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/earthquakes?lat=34.0&lng=-118.2&radius_km=50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 1);
        assert_eq!(json["data"]["earthquakes"][0]["id"], "nearby");
        assert_eq!(json["data"]["query"]["radius_km"], 50.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn delete_is_not_implemented(pool: PgPool) {
        let app = test_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/earthquakes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "not_implemented");
    }
}
