//! Campaign record endpoints: append a campaign after dispatch, list recent
//! campaigns with their event and recipient context.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use perilmail_core::RiskLevel;
use perilmail_db::{CampaignListRow, NewCampaign};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    map_db_error, normalize_limit, require_field, ApiError, ApiResponse, AppState, ResponseMeta,
};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct CreateCampaignRequest {
    id: Option<String>,
    person_id: Option<Uuid>,
    event_kind: Option<String>,
    event_id: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    risk_level: Option<RiskLevel>,
    distance_km: Option<f64>,
    target_count: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateCampaignData {
    campaign_id: String,
}

/// `POST /api/campaigns` — record a campaign. Generates a `campaign_<uuid>`
/// id when the caller does not supply one.
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<Json<ApiResponse<CreateCampaignData>>, ApiError> {
    let subject = require_field(&req_id, body.subject, "subject")?;
    let body_text = require_field(&req_id, body.body, "body")?;
    let event_id = require_field(&req_id, body.event_id, "event_id")?;

    let event_kind = body
        .event_kind
        .map(|kind| kind.trim().to_lowercase())
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| "earthquake".to_string());
    if event_kind != "earthquake" && event_kind != "weather" {
        return Err(ApiError::bad_request(
            req_id.0,
            "event_kind must be earthquake or weather",
        ));
    }

    let campaign_id = body
        .id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("campaign_{}", Uuid::new_v4()));

    let campaign = NewCampaign {
        id: campaign_id.clone(),
        person_id: body.person_id,
        event_kind,
        event_id,
        subject,
        body: body_text,
        risk_level: body
            .risk_level
            .unwrap_or(RiskLevel::Medium)
            .as_str()
            .to_string(),
        distance_km: body.distance_km,
        target_count: body.target_count.unwrap_or(0),
    };

    if let Err(error) = perilmail_db::insert_campaign(&state.pool, &campaign).await {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return Err(ApiError::conflict(
                    req_id.0,
                    "a campaign with that id already exists",
                ));
            }
        }
        return Err(map_db_error(req_id.0, &error));
    }

    tracing::info!(campaign_id = %campaign_id, "campaign recorded");

    Ok(Json(ApiResponse {
        data: CreateCampaignData { campaign_id },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ListCampaignsQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignListData {
    count: usize,
    campaigns: Vec<CampaignItem>,
}

#[derive(Debug, Serialize)]
struct CampaignItem {
    id: String,
    event_kind: String,
    event_id: String,
    subject: String,
    body: String,
    risk_level: String,
    distance_km: Option<f64>,
    target_count: i32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    earthquake: Option<CampaignEarthquake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    person: Option<CampaignPerson>,
}

#[derive(Debug, Serialize)]
struct CampaignEarthquake {
    magnitude: Option<f64>,
    place: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CampaignPerson {
    first_name: String,
    last_name: String,
    city: Option<String>,
    state: Option<String>,
}

impl From<CampaignListRow> for CampaignItem {
    fn from(row: CampaignListRow) -> Self {
        let joined_quake = row.event_kind == "earthquake"
            && (row.magnitude.is_some() || row.place.is_some() || row.occurred_at.is_some());
        let earthquake = joined_quake.then(|| CampaignEarthquake {
            magnitude: row.magnitude,
            place: row.place.clone(),
            occurred_at: row.occurred_at,
        });
        let person = match (row.first_name.clone(), row.last_name.clone()) {
            (Some(first_name), Some(last_name)) => Some(CampaignPerson {
                first_name,
                last_name,
                city: row.city.clone(),
                state: row.state.clone(),
            }),
            _ => None,
        };

        Self {
            id: row.id,
            event_kind: row.event_kind,
            event_id: row.event_id,
            subject: row.subject,
            body: row.body,
            risk_level: row.risk_level,
            distance_km: row.distance_km,
            target_count: row.target_count,
            created_at: row.created_at,
            earthquake,
            person,
        }
    }
}

/// `GET /api/campaigns` — newest campaigns first, joined with earthquake and
/// person context where resolvable.
pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListCampaignsQuery>,
) -> Result<Json<ApiResponse<CampaignListData>>, ApiError> {
    let limit = normalize_limit(params.limit);
    let rows = perilmail_db::list_campaigns(&state.pool, limit)
        .await
        .map_err(|error| map_db_error(req_id.0.clone(), &error))?;

    let campaigns: Vec<CampaignItem> = rows.into_iter().map(CampaignItem::from).collect();

    Ok(Json(ApiResponse {
        data: CampaignListData {
            count: campaigns.len(),
            campaigns,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
