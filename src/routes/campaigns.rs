use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    cache::CampaignSummary,
    error::{AppError, AppResult},
    lifecycle::{default_campaign, normalize_template, validate_campaign_name, validate_delay_days},
    models::{Campaign, Lead},
    queries,
    schema::{campaigns, leads},
    state::AppState,
    stats::CampaignStats,
    template::{lead_field_values, preview_sequence, SequencePreview},
    utils::json::{classify_nullable, optional_integer, NullableValue},
};

use super::{leads::LeadResponse, to_iso};

#[derive(Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub request_message_template: Option<String>,
    pub connection_message_template: Option<String>,
    pub first_follow_up_message_template: Option<String>,
    pub first_follow_up_delay_days: i32,
    pub second_follow_up_message_template: Option<String>,
    pub second_follow_up_delay_days: i32,
    pub allow_no_personalization: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            is_active: campaign.is_active,
            request_message_template: campaign.request_message_template,
            connection_message_template: campaign.connection_message_template,
            first_follow_up_message_template: campaign.first_follow_up_message_template,
            first_follow_up_delay_days: campaign.first_follow_up_delay_days,
            second_follow_up_message_template: campaign.second_follow_up_message_template,
            second_follow_up_delay_days: campaign.second_follow_up_delay_days,
            allow_no_personalization: campaign.allow_no_personalization,
            created_at: to_iso(campaign.created_at),
            updated_at: to_iso(campaign.updated_at),
        }
    }
}

/// Funnel counts plus the display rates derived from them.
#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counts: CampaignStats,
    pub acceptance_rate: f64,
    pub reply_rate: f64,
}

impl From<CampaignStats> for StatsResponse {
    fn from(counts: CampaignStats) -> Self {
        Self {
            acceptance_rate: counts.acceptance_rate(),
            reply_rate: counts.reply_rate(),
            counts,
        }
    }
}

#[derive(Serialize)]
pub struct CampaignWithStatsResponse {
    #[serde(flatten)]
    pub campaign: CampaignResponse,
    pub stats: StatsResponse,
}

#[derive(Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateCampaignSettingsRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub allow_no_personalization: Option<bool>,
}

#[derive(Deserialize)]
pub struct PreviewSequenceRequest {
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub lead_id: Option<Uuid>,
}

#[derive(AsChangeset)]
#[diesel(table_name = campaigns)]
struct SettingsChangeset {
    name: Option<String>,
    is_active: Option<bool>,
    allow_no_personalization: Option<bool>,
    updated_at: chrono::NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = campaigns)]
struct SequenceChangeset {
    request_message_template: Option<Option<String>>,
    connection_message_template: Option<Option<String>>,
    first_follow_up_message_template: Option<Option<String>>,
    first_follow_up_delay_days: Option<i32>,
    second_follow_up_message_template: Option<Option<String>>,
    second_follow_up_delay_days: Option<i32>,
    updated_at: chrono::NaiveDateTime,
}

pub(crate) fn with_stats(campaign: Campaign, stats: CampaignStats) -> CampaignWithStatsResponse {
    CampaignWithStatsResponse {
        campaign: CampaignResponse::from(campaign),
        stats: StatsResponse::from(stats),
    }
}

/// Every campaign of the user, newest first, with statistics from a single
/// grouped query.
pub(crate) fn load_campaigns_with_stats(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Vec<CampaignWithStatsResponse>> {
    let owned: Vec<Campaign> = campaigns::table
        .filter(campaigns::user_id.eq(user_id))
        .order((campaigns::created_at.desc(), campaigns::id.desc()))
        .load(conn)?;

    let mut stats = queries::campaign_stats_for_user(conn, user_id)?;

    Ok(owned
        .into_iter()
        .map(|campaign| {
            let campaign_stats = stats.remove(&campaign.id).unwrap_or_default();
            with_stats(campaign, campaign_stats)
        })
        .collect())
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CampaignWithStatsResponse>>> {
    let mut conn = state.db()?;
    let response = load_campaigns_with_stats(&mut conn, user.user_id)?;
    Ok(Json(response))
}

pub async fn create_campaign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCampaignRequest>,
) -> AppResult<(StatusCode, Json<CampaignWithStatsResponse>)> {
    let new_campaign = default_campaign(&payload.name, user.user_id)?;

    let mut conn = state.db()?;
    diesel::insert_into(campaigns::table)
        .values(&new_campaign)
        .execute(&mut conn)?;

    let campaign: Campaign = campaigns::table.find(new_campaign.id).first(&mut conn)?;
    info!(
        campaign_id = %campaign.id,
        user_id = %user.user_id,
        "campaign created"
    );

    Ok((
        StatusCode::CREATED,
        Json(with_stats(campaign, CampaignStats::default())),
    ))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<Json<CampaignWithStatsResponse>> {
    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;
    let stats = queries::campaign_stats(&mut conn, campaign.id)?;
    Ok(Json(with_stats(campaign, stats)))
}

pub async fn get_campaign_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<Json<CampaignSummary>> {
    if let Some(summary) = state.campaign_cache.get(user.user_id, campaign_id) {
        debug!(%campaign_id, "campaign summary served from cache");
        return Ok(Json(summary));
    }

    let generation = state.campaign_cache.generation();
    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;
    let summary = CampaignSummary::from(&campaign);
    state
        .campaign_cache
        .insert(user.user_id, summary.clone(), generation);
    Ok(Json(summary))
}

pub async fn update_campaign_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<UpdateCampaignSettingsRequest>,
) -> AppResult<Json<CampaignResponse>> {
    let name = payload
        .name
        .as_deref()
        .map(validate_campaign_name)
        .transpose()?;

    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;

    let changeset = SettingsChangeset {
        name,
        is_active: payload.is_active,
        allow_no_personalization: payload.allow_no_personalization,
        updated_at: Utc::now().naive_utc(),
    };

    let updated: Campaign = diesel::update(campaigns::table.find(campaign.id))
        .set(&changeset)
        .get_result(&mut conn)?;

    state.campaign_cache.invalidate(user.user_id, campaign.id);
    info!(
        campaign_id = %updated.id,
        is_active = updated.is_active,
        "campaign settings updated"
    );

    Ok(Json(CampaignResponse::from(updated)))
}

fn template_change(body: &Value, field: &str) -> AppResult<Option<Option<String>>> {
    let class = classify_nullable(body.get(field))
        .map_err(|err| AppError::bad_request(format!("{field}: {err}")))?;
    Ok(match class {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(None),
        NullableValue::String(value) => Some(normalize_template(Some(value))),
    })
}

fn delay_change(body: &Value, field: &str) -> AppResult<Option<i32>> {
    let value = optional_integer(field, body.get(field)).map_err(AppError::bad_request)?;
    Ok(value
        .map(|days| validate_delay_days(field, days))
        .transpose()?)
}

pub async fn update_campaign_sequence(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<CampaignResponse>> {
    if !body.is_object() {
        return Err(AppError::bad_request("expected a JSON object"));
    }

    let changeset = SequenceChangeset {
        request_message_template: template_change(&body, "request_message_template")?,
        connection_message_template: template_change(&body, "connection_message_template")?,
        first_follow_up_message_template: template_change(
            &body,
            "first_follow_up_message_template",
        )?,
        first_follow_up_delay_days: delay_change(&body, "first_follow_up_delay_days")?,
        second_follow_up_message_template: template_change(
            &body,
            "second_follow_up_message_template",
        )?,
        second_follow_up_delay_days: delay_change(&body, "second_follow_up_delay_days")?,
        updated_at: Utc::now().naive_utc(),
    };

    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;

    let updated: Campaign = diesel::update(campaigns::table.find(campaign.id))
        .set(&changeset)
        .get_result(&mut conn)?;

    info!(campaign_id = %updated.id, "campaign sequence updated");
    Ok(Json(CampaignResponse::from(updated)))
}

pub async fn preview_campaign_sequence(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<PreviewSequenceRequest>,
) -> AppResult<Json<SequencePreview>> {
    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;

    let mut values = match payload.lead_id {
        Some(lead_id) => {
            let lead = queries::find_owned_lead(&mut conn, lead_id, user.user_id)?;
            lead_field_values(&lead)
        }
        None => HashMap::new(),
    };
    values.extend(payload.fields);

    Ok(Json(preview_sequence(&campaign, &values)))
}

pub async fn list_campaign_leads(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<Json<Vec<LeadResponse>>> {
    let mut conn = state.db()?;
    let campaign = queries::find_owned_campaign(&mut conn, campaign_id, user.user_id)?;

    let campaign_leads: Vec<Lead> = leads::table
        .filter(leads::campaign_id.eq(campaign.id))
        .order((leads::created_at.desc(), leads::id.desc()))
        .load(&mut conn)?;

    Ok(Json(
        campaign_leads.into_iter().map(LeadResponse::from).collect(),
    ))
}
