//! Owner-scoped lookups and the grouped statistics query shared by the HTTP
//! handlers and the maintenance tool.

use std::collections::HashMap;

use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::access::require_owned;
use crate::error::{AppError, DomainError};
use crate::models::{Campaign, Lead, LeadEvent, LeadStatus, NewLeadEvent};
use crate::schema::{campaigns, lead_events, leads};
use crate::stats::{fold_tallies, CampaignStats, LeadTally, StageFlags};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Database(err) => AppError::from(err),
            StoreError::Domain(err) => AppError::from(err),
        }
    }
}

type TallyRow = (Uuid, LeadStatus, bool, bool, bool, i64);

fn tally_from_row(row: TallyRow) -> LeadTally {
    let (campaign_id, status, connection_requested, first_followup_sent, second_followup_sent, count) =
        row;
    LeadTally {
        campaign_id,
        status,
        stages: StageFlags {
            connection_requested,
            first_followup_sent,
            second_followup_sent,
        },
        count,
    }
}

pub fn find_campaign(conn: &mut PgConnection, campaign_id: Uuid) -> StoreResult<Option<Campaign>> {
    Ok(campaigns::table
        .find(campaign_id)
        .first::<Campaign>(conn)
        .optional()?)
}

pub fn find_owned_campaign(
    conn: &mut PgConnection,
    campaign_id: Uuid,
    user_id: Uuid,
) -> StoreResult<Campaign> {
    let campaign = find_campaign(conn, campaign_id)?;
    Ok(require_owned(campaign, user_id)?)
}

pub fn find_owned_lead(conn: &mut PgConnection, lead_id: Uuid, user_id: Uuid) -> StoreResult<Lead> {
    let lead = leads::table.find(lead_id).first::<Lead>(conn).optional()?;
    Ok(require_owned(lead, user_id)?)
}

/// Same as [`find_owned_lead`] but takes a row lock for the surrounding
/// transaction.
pub fn lock_owned_lead(conn: &mut PgConnection, lead_id: Uuid, user_id: Uuid) -> StoreResult<Lead> {
    let lead = leads::table
        .find(lead_id)
        .for_update()
        .get_result::<Lead>(conn)
        .optional()?;
    Ok(require_owned(lead, user_id)?)
}

/// Statistics for every campaign of a user from one grouped count query.
/// Campaigns without leads are absent from the map.
pub fn campaign_stats_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> StoreResult<HashMap<Uuid, CampaignStats>> {
    let rows: Vec<TallyRow> = leads::table
        .filter(leads::user_id.eq(user_id))
        .group_by((
            leads::campaign_id,
            leads::status,
            leads::stage_connection_requested,
            leads::stage_first_followup_sent,
            leads::stage_second_followup_sent,
        ))
        .select((
            leads::campaign_id,
            leads::status,
            leads::stage_connection_requested,
            leads::stage_first_followup_sent,
            leads::stage_second_followup_sent,
            count_star(),
        ))
        .load(conn)?;

    Ok(fold_tallies(rows.into_iter().map(tally_from_row)))
}

pub fn campaign_stats(conn: &mut PgConnection, campaign_id: Uuid) -> StoreResult<CampaignStats> {
    let rows: Vec<TallyRow> = leads::table
        .filter(leads::campaign_id.eq(campaign_id))
        .group_by((
            leads::campaign_id,
            leads::status,
            leads::stage_connection_requested,
            leads::stage_first_followup_sent,
            leads::stage_second_followup_sent,
        ))
        .select((
            leads::campaign_id,
            leads::status,
            leads::stage_connection_requested,
            leads::stage_first_followup_sent,
            leads::stage_second_followup_sent,
            count_star(),
        ))
        .load(conn)?;

    Ok(fold_tallies(rows.into_iter().map(tally_from_row))
        .remove(&campaign_id)
        .unwrap_or_default())
}

pub fn record_event(
    conn: &mut PgConnection,
    lead_id: Uuid,
    event_type: &str,
    message: Option<String>,
) -> StoreResult<LeadEvent> {
    let new_event = NewLeadEvent {
        id: Uuid::new_v4(),
        lead_id,
        event_type: event_type.to_string(),
        message,
    };

    diesel::insert_into(lead_events::table)
        .values(&new_event)
        .execute(conn)?;

    Ok(lead_events::table.find(new_event.id).first(conn)?)
}

/// Newest first.
pub fn events_for_lead(conn: &mut PgConnection, lead_id: Uuid) -> StoreResult<Vec<LeadEvent>> {
    Ok(lead_events::table
        .filter(lead_events::lead_id.eq(lead_id))
        .order((lead_events::created_at.desc(), lead_events::id.desc()))
        .load(conn)?)
}
