use axum::{extract::State, Json};
use serde::Serialize;

use crate::{auth::AuthenticatedUser, error::AppResult, state::AppState, stats};

use super::campaigns::{load_campaigns_with_stats, CampaignWithStatsResponse, StatsResponse};
use super::leads::{load_recent_leads, LeadListEntry};

pub const RECENT_LEADS_LIMIT: i64 = 10;

#[derive(Serialize)]
pub struct DashboardResponse {
    pub recent_leads: Vec<LeadListEntry>,
    pub campaigns: Vec<CampaignWithStatsResponse>,
    pub totals: StatsResponse,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    let mut conn = state.db()?;

    let recent_leads = load_recent_leads(&mut conn, user.user_id, RECENT_LEADS_LIMIT, 0)?;
    let campaigns = load_campaigns_with_stats(&mut conn, user.user_id)?;
    let totals = stats::totals(campaigns.iter().map(|entry| &entry.stats.counts));

    Ok(Json(DashboardResponse {
        recent_leads,
        campaigns,
        totals: StatsResponse::from(totals),
    }))
}
