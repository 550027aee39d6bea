use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    lifecycle::{
        advance_stage, set_status, status_change_message, validate_lead_input, LeadInput, Stage,
        EVENT_LEAD_CREATED, EVENT_STATUS_CHANGED,
    },
    models::{Campaign, Lead, LeadEvent, LeadStatus},
    queries,
    schema::{campaigns, leads},
    state::AppState,
    template::{lead_field_values, preview_sequence, resolve_template, SequencePreview},
};

use super::to_iso;

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Serialize)]
pub struct LeadResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: LeadStatus,
    pub stage_connection_requested: bool,
    pub stage_first_followup_sent: bool,
    pub stage_second_followup_sent: bool,
    pub created_at: String,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id,
            campaign_id: lead.campaign_id,
            name: lead.name,
            email: lead.email,
            company: lead.company,
            position: lead.position,
            status: lead.status,
            stage_connection_requested: lead.stage_connection_requested,
            stage_first_followup_sent: lead.stage_first_followup_sent,
            stage_second_followup_sent: lead.stage_second_followup_sent,
            created_at: to_iso(lead.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct LeadListEntry {
    #[serde(flatten)]
    pub lead: LeadResponse,
    pub campaign_name: String,
}

#[derive(Serialize)]
pub struct LeadEventResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: Option<String>,
    pub created_at: String,
}

impl From<LeadEvent> for LeadEventResponse {
    fn from(event: LeadEvent) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            message: event.message,
            created_at: to_iso(event.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct LeadCampaignInfo {
    pub id: Uuid,
    pub name: String,
    pub request_message_template: Option<String>,
    pub connection_message_template: Option<String>,
    pub first_follow_up_message_template: Option<String>,
    pub second_follow_up_message_template: Option<String>,
}

#[derive(Serialize)]
pub struct LeadDetailResponse {
    #[serde(flatten)]
    pub lead: LeadResponse,
    pub campaign: LeadCampaignInfo,
    /// Campaign messages personalized for this lead.
    pub messages: SequencePreview,
    pub events: Vec<LeadEventResponse>,
}

#[derive(Deserialize)]
pub struct LeadListQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub limit: i64,
}

const fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Deserialize)]
pub struct AdvanceStageRequest {
    pub stage: Stage,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: LeadStatus,
}

/// The user's most recent leads joined with their campaign name.
pub(crate) fn load_recent_leads(
    conn: &mut PgConnection,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<LeadListEntry>> {
    let rows: Vec<(Lead, String)> = leads::table
        .inner_join(campaigns::table)
        .filter(leads::user_id.eq(user_id))
        .order((leads::created_at.desc(), leads::id.desc()))
        .limit(limit)
        .offset(offset)
        .select((leads::all_columns, campaigns::name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(lead, campaign_name)| LeadListEntry {
            lead: LeadResponse::from(lead),
            campaign_name,
        })
        .collect())
}

pub async fn list_leads(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<LeadListQuery>,
) -> AppResult<Json<Vec<LeadListEntry>>> {
    if params.page < 0 {
        return Err(AppError::bad_request("page must not be negative"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&params.limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = params
        .page
        .checked_mul(params.limit)
        .ok_or_else(|| AppError::bad_request("page is out of range"))?;

    let mut conn = state.db()?;
    let entries = load_recent_leads(&mut conn, user.user_id, params.limit, offset)?;
    Ok(Json(entries))
}

pub async fn create_lead(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<LeadInput>,
) -> AppResult<(StatusCode, Json<LeadResponse>)> {
    let mut conn = state.db()?;

    let lead = conn.transaction::<Lead, AppError, _>(|conn| {
        let campaign = queries::find_campaign(conn, payload.campaign_id)?;
        let new_lead = validate_lead_input(&payload, campaign, user.user_id)?;

        diesel::insert_into(leads::table)
            .values(&new_lead)
            .execute(conn)?;
        queries::record_event(conn, new_lead.id, EVENT_LEAD_CREATED, None)?;

        Ok(leads::table.find(new_lead.id).first(conn)?)
    })?;

    info!(
        lead_id = %lead.id,
        campaign_id = %lead.campaign_id,
        user_id = %user.user_id,
        "lead created"
    );

    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

pub async fn get_lead(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> AppResult<Json<LeadDetailResponse>> {
    let mut conn = state.db()?;
    let lead = queries::find_owned_lead(&mut conn, lead_id, user.user_id)?;
    let campaign: Campaign = campaigns::table.find(lead.campaign_id).first(&mut conn)?;
    let events = queries::events_for_lead(&mut conn, lead.id)?;

    let messages = preview_sequence(&campaign, &lead_field_values(&lead));

    Ok(Json(LeadDetailResponse {
        lead: LeadResponse::from(lead),
        campaign: LeadCampaignInfo {
            id: campaign.id,
            name: campaign.name,
            request_message_template: campaign.request_message_template,
            connection_message_template: campaign.connection_message_template,
            first_follow_up_message_template: campaign.first_follow_up_message_template,
            second_follow_up_message_template: campaign.second_follow_up_message_template,
        },
        messages,
        events: events.into_iter().map(LeadEventResponse::from).collect(),
    }))
}

fn mark_stage_sent(conn: &mut PgConnection, lead_id: Uuid, stage: Stage) -> QueryResult<usize> {
    let target = leads::table.find(lead_id);
    match stage {
        Stage::ConnectionRequested => diesel::update(target)
            .set(leads::stage_connection_requested.eq(true))
            .execute(conn),
        Stage::FirstFollowup => diesel::update(target)
            .set(leads::stage_first_followup_sent.eq(true))
            .execute(conn),
        Stage::SecondFollowup => diesel::update(target)
            .set(leads::stage_second_followup_sent.eq(true))
            .execute(conn),
    }
}

pub async fn advance_lead_stage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<AdvanceStageRequest>,
) -> AppResult<Json<LeadResponse>> {
    let stage = payload.stage;
    let mut conn = state.db()?;

    let (lead, changed) = conn.transaction::<(Lead, bool), AppError, _>(|conn| {
        let mut lead = queries::lock_owned_lead(conn, lead_id, user.user_id)?;
        if !advance_stage(&mut lead, stage) {
            return Ok((lead, false));
        }

        mark_stage_sent(conn, lead.id, stage)?;

        let campaign: Campaign = campaigns::table.find(lead.campaign_id).first(conn)?;
        let message = stage
            .template(&campaign)
            .map(|template| resolve_template(template, &lead_field_values(&lead)));
        queries::record_event(conn, lead.id, stage.event_type(), message)?;

        Ok((lead, true))
    })?;

    if changed {
        info!(lead_id = %lead.id, stage = stage.event_type(), "lead stage advanced");
    }

    Ok(Json(LeadResponse::from(lead)))
}

pub async fn update_lead_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<LeadResponse>> {
    let mut conn = state.db()?;

    let (lead, previous) = conn.transaction::<(Lead, LeadStatus), AppError, _>(|conn| {
        let mut lead = queries::lock_owned_lead(conn, lead_id, user.user_id)?;
        let previous = set_status(&mut lead, payload.status);
        if previous == lead.status {
            return Ok((lead, previous));
        }

        diesel::update(leads::table.find(lead.id))
            .set(leads::status.eq(lead.status))
            .execute(conn)?;
        queries::record_event(
            conn,
            lead.id,
            EVENT_STATUS_CHANGED,
            Some(status_change_message(previous, lead.status)),
        )?;
        Ok((lead, previous))
    })?;

    if previous != lead.status {
        info!(
            lead_id = %lead.id,
            from = %previous,
            to = %lead.status,
            "lead status changed"
        );
    }

    Ok(Json(LeadResponse::from(lead)))
}
