use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = campaigns)]
#[diesel(belongs_to(User))]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub request_message_template: Option<String>,
    pub connection_message_template: Option<String>,
    pub first_follow_up_message_template: Option<String>,
    pub first_follow_up_delay_days: i32,
    pub second_follow_up_message_template: Option<String>,
    pub second_follow_up_delay_days: i32,
    pub allow_no_personalization: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = campaigns)]
pub struct NewCampaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub first_follow_up_delay_days: i32,
    pub second_follow_up_delay_days: i32,
    pub allow_no_personalization: bool,
}

/// Label attached to a lead. Any status may follow any other; it is not a
/// workflow and is independent of the stage flags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = crate::schema::sql_types::LeadStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Messaged,
    Connected,
    NotInterested,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::Pending,
        LeadStatus::Accepted,
        LeadStatus::Rejected,
        LeadStatus::Messaged,
        LeadStatus::Connected,
        LeadStatus::NotInterested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "PENDING",
            LeadStatus::Accepted => "ACCEPTED",
            LeadStatus::Rejected => "REJECTED",
            LeadStatus::Messaged => "MESSAGED",
            LeadStatus::Connected => "CONNECTED",
            LeadStatus::NotInterested => "NOT_INTERESTED",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown lead status {value:?}"))
    }
}

impl ToSql<crate::schema::sql_types::LeadStatus, Pg> for LeadStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::LeadStatus, Pg> for LeadStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(bytes.as_bytes())?;
        raw.parse::<LeadStatus>().map_err(Into::into)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = leads)]
#[diesel(belongs_to(Campaign))]
pub struct Lead {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: LeadStatus,
    pub stage_connection_requested: bool,
    pub stage_first_followup_sent: bool,
    pub stage_second_followup_sent: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = leads)]
pub struct NewLead {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = lead_events)]
#[diesel(belongs_to(Lead))]
pub struct LeadEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub event_type: String,
    pub message: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = lead_events)]
pub struct NewLeadEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    #[diesel(column_name = type_)]
    pub event_type: String,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::LeadStatus;

    #[test]
    fn status_names_round_trip_through_from_str() {
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>(), Ok(status));
        }
        assert!("pending".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&LeadStatus::NotInterested).unwrap();
        assert_eq!(json, "\"NOT_INTERESTED\"");
        let parsed: LeadStatus = serde_json::from_str("\"MESSAGED\"").unwrap();
        assert_eq!(parsed, LeadStatus::Messaged);
    }

    #[test]
    fn pending_is_the_default_status() {
        assert_eq!(LeadStatus::default(), LeadStatus::Pending);
    }
}
