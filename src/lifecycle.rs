//! Campaign and lead rules: input validation, defaults, stage progression and
//! status changes. Nothing here touches storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::require_owned;
use crate::error::DomainError;
use crate::models::{Campaign, Lead, LeadStatus, NewCampaign, NewLead};

pub const DEFAULT_FIRST_FOLLOW_UP_DELAY_DAYS: i32 = 1;
pub const DEFAULT_SECOND_FOLLOW_UP_DELAY_DAYS: i32 = 3;
pub const MAX_NAME_LENGTH: usize = 255;

pub const EVENT_LEAD_CREATED: &str = "LEAD_CREATED";
pub const EVENT_STATUS_CHANGED: &str = "STATUS_CHANGED";

/// Steps of a campaign sequence, in their natural order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    ConnectionRequested,
    FirstFollowup,
    SecondFollowup,
}

impl Stage {
    pub fn event_type(&self) -> &'static str {
        match self {
            Stage::ConnectionRequested => "CONNECTION_REQUESTED",
            Stage::FirstFollowup => "FIRST_FOLLOWUP_SENT",
            Stage::SecondFollowup => "SECOND_FOLLOWUP_SENT",
        }
    }

    pub fn is_reached(&self, lead: &Lead) -> bool {
        match self {
            Stage::ConnectionRequested => lead.stage_connection_requested,
            Stage::FirstFollowup => lead.stage_first_followup_sent,
            Stage::SecondFollowup => lead.stage_second_followup_sent,
        }
    }

    /// The campaign message sent when this stage is reached.
    pub fn template<'a>(&self, campaign: &'a Campaign) -> Option<&'a str> {
        match self {
            Stage::ConnectionRequested => campaign.request_message_template.as_deref(),
            Stage::FirstFollowup => campaign.first_follow_up_message_template.as_deref(),
            Stage::SecondFollowup => campaign.second_follow_up_message_template.as_deref(),
        }
    }

    fn flag_mut<'a>(&self, lead: &'a mut Lead) -> &'a mut bool {
        match self {
            Stage::ConnectionRequested => &mut lead.stage_connection_requested,
            Stage::FirstFollowup => &mut lead.stage_first_followup_sent,
            Stage::SecondFollowup => &mut lead.stage_second_followup_sent,
        }
    }
}

pub fn validate_campaign_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("campaign name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "campaign name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_delay_days(field: &str, value: i64) -> Result<i32, DomainError> {
    if value < 1 {
        return Err(DomainError::validation(format!(
            "{field} must be at least 1"
        )));
    }
    i32::try_from(value)
        .map_err(|_| DomainError::validation(format!("{field} is out of range")))
}

/// Blank templates are stored as unset.
pub fn normalize_template(value: Option<String>) -> Option<String> {
    value.filter(|template| !template.trim().is_empty())
}

pub fn default_campaign(name: &str, owner_id: Uuid) -> Result<NewCampaign, DomainError> {
    Ok(NewCampaign {
        id: Uuid::new_v4(),
        user_id: owner_id,
        name: validate_campaign_name(name)?,
        is_active: false,
        first_follow_up_delay_days: DEFAULT_FIRST_FOLLOW_UP_DELAY_DAYS,
        second_follow_up_delay_days: DEFAULT_SECOND_FOLLOW_UP_DELAY_DAYS,
        allow_no_personalization: false,
    })
}

/// Syntactic check only: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    pub campaign_id: Uuid,
}

/// Validates an add-lead request. `campaign` is the lookup result for
/// `input.campaign_id`; it must exist and belong to the acting user.
pub fn validate_lead_input(
    input: &LeadInput,
    campaign: Option<Campaign>,
    acting_user_id: Uuid,
) -> Result<NewLead, DomainError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("lead name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "lead name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    let email = input.email.trim();
    if email.is_empty() {
        return Err(DomainError::validation("lead email cannot be empty"));
    }
    if !is_valid_email(email) || email.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation("lead email is not a valid address"));
    }

    let campaign = require_owned(campaign, acting_user_id)?;

    Ok(NewLead {
        id: Uuid::new_v4(),
        user_id: acting_user_id,
        campaign_id: campaign.id,
        name: name.to_string(),
        email: email.to_string(),
        company: optional_text("company", input.company.as_deref())?,
        position: optional_text("position", input.position.as_deref())?,
        status: LeadStatus::Pending,
    })
}

/// Blank means absent; anything longer than the column is rejected.
fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "lead {field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

/// Marks `stage` as sent. Returns whether the flag changed; advancing an
/// already reached stage is a no-op. Stages may be reached out of order.
pub fn advance_stage(lead: &mut Lead, stage: Stage) -> bool {
    if stage.is_reached(lead) {
        return false;
    }
    *stage.flag_mut(lead) = true;
    true
}

/// Overwrites the status and returns the previous one.
pub fn set_status(lead: &mut Lead, status: LeadStatus) -> LeadStatus {
    std::mem::replace(&mut lead.status, status)
}

pub fn status_change_message(previous: LeadStatus, current: LeadStatus) -> String {
    format!("{previous} -> {current}")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample_campaign(owner: Uuid) -> Campaign {
        let now = Utc::now().naive_utc();
        Campaign {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Founders".to_string(),
            is_active: false,
            request_message_template: Some("Hi {{firstName}}".to_string()),
            connection_message_template: None,
            first_follow_up_message_template: Some("Following up, {{firstName}}".to_string()),
            first_follow_up_delay_days: DEFAULT_FIRST_FOLLOW_UP_DELAY_DAYS,
            second_follow_up_message_template: None,
            second_follow_up_delay_days: DEFAULT_SECOND_FOLLOW_UP_DELAY_DAYS,
            allow_no_personalization: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn sample_lead(owner: Uuid, campaign_id: Uuid) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            user_id: owner,
            campaign_id,
            name: "Ana Lima".to_string(),
            email: "ana@example.com".to_string(),
            company: Some("Acme".to_string()),
            position: None,
            status: LeadStatus::Pending,
            stage_connection_requested: false,
            stage_first_followup_sent: false,
            stage_second_followup_sent: false,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn input(name: &str, email: &str, campaign_id: Uuid) -> LeadInput {
        LeadInput {
            name: name.to_string(),
            email: email.to_string(),
            company: Some("  ".to_string()),
            position: Some(" CTO ".to_string()),
            campaign_id,
        }
    }

    #[test]
    fn campaign_name_is_trimmed() {
        assert_eq!(validate_campaign_name("  Q3 push ").unwrap(), "Q3 push");
    }

    #[test]
    fn blank_campaign_name_is_rejected() {
        assert!(matches!(
            validate_campaign_name("   \t"),
            Err(DomainError::Validation(_))
        ));
        assert!(validate_campaign_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn new_campaign_uses_default_delays_and_flags() {
        let owner = Uuid::new_v4();
        let campaign = default_campaign("Founders", owner).unwrap();
        assert_eq!(campaign.user_id, owner);
        assert_eq!(campaign.first_follow_up_delay_days, 1);
        assert_eq!(campaign.second_follow_up_delay_days, 3);
        assert!(!campaign.is_active);
        assert!(!campaign.allow_no_personalization);
    }

    #[test]
    fn delays_below_one_are_rejected() {
        assert!(validate_delay_days("first_follow_up_delay_days", 0).is_err());
        assert!(validate_delay_days("first_follow_up_delay_days", -2).is_err());
        assert_eq!(validate_delay_days("second_follow_up_delay_days", 5), Ok(5));
        assert!(validate_delay_days("second_follow_up_delay_days", i64::MAX).is_err());
    }

    #[test]
    fn blank_templates_normalize_to_none() {
        assert_eq!(normalize_template(Some(" \n".to_string())), None);
        assert_eq!(
            normalize_template(Some("Hi {{firstName}}".to_string())),
            Some("Hi {{firstName}}".to_string())
        );
    }

    #[test]
    fn email_syntax_check() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b..com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn lead_input_is_validated_against_owned_campaign() {
        let owner = Uuid::new_v4();
        let campaign = sample_campaign(owner);
        let campaign_id = campaign.id;

        let lead = validate_lead_input(
            &input(" Ana ", "a@b.com", campaign_id),
            Some(campaign),
            owner,
        )
        .unwrap();

        assert_eq!(lead.name, "Ana");
        assert_eq!(lead.campaign_id, campaign_id);
        assert_eq!(lead.user_id, owner);
        assert_eq!(lead.status, LeadStatus::Pending);
        assert_eq!(lead.company, None);
        assert_eq!(lead.position.as_deref(), Some("CTO"));
    }

    #[test]
    fn lead_input_rejects_bad_email_and_empty_name() {
        let owner = Uuid::new_v4();
        let campaign = sample_campaign(owner);
        let id = campaign.id;

        let bad_email =
            validate_lead_input(&input("Ana", "not-an-email", id), Some(campaign.clone()), owner);
        assert!(matches!(bad_email, Err(DomainError::Validation(_))));

        let empty_name = validate_lead_input(&input(" ", "a@b.com", id), Some(campaign), owner);
        assert!(matches!(empty_name, Err(DomainError::Validation(_))));
    }

    #[test]
    fn lead_input_rejects_company_and_position_longer_than_column() {
        let owner = Uuid::new_v4();
        let campaign = sample_campaign(owner);
        let id = campaign.id;

        let mut long_company = input("Ana", "a@b.com", id);
        long_company.company = Some("x".repeat(MAX_NAME_LENGTH + 1));
        assert_eq!(
            validate_lead_input(&long_company, Some(campaign.clone()), owner),
            Err(DomainError::validation(
                "lead company must be at most 255 characters"
            ))
        );

        let mut long_position = input("Ana", "a@b.com", id);
        long_position.position = Some("y".repeat(400));
        assert!(matches!(
            validate_lead_input(&long_position, Some(campaign.clone()), owner),
            Err(DomainError::Validation(_))
        ));

        let mut at_limit = input("Ana", "a@b.com", id);
        at_limit.company = Some(format!("  {}  ", "z".repeat(MAX_NAME_LENGTH)));
        let lead = validate_lead_input(&at_limit, Some(campaign), owner).unwrap();
        assert_eq!(lead.company.map(|c| c.chars().count()), Some(MAX_NAME_LENGTH));
    }

    #[test]
    fn lead_input_rejects_missing_or_foreign_campaign() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let campaign = sample_campaign(owner);
        let id = campaign.id;

        let missing = validate_lead_input(&input("Ana", "a@b.com", id), None, intruder);
        assert_eq!(missing.unwrap_err(), DomainError::NotFound("campaign"));

        let foreign = validate_lead_input(&input("Ana", "a@b.com", id), Some(campaign), intruder);
        assert_eq!(
            foreign.unwrap_err(),
            DomainError::Forbidden {
                entity: "campaign",
                id
            }
        );
    }

    #[test]
    fn advancing_a_stage_is_idempotent() {
        let mut lead = sample_lead(Uuid::new_v4(), Uuid::new_v4());

        assert!(advance_stage(&mut lead, Stage::FirstFollowup));
        let once = (
            lead.stage_connection_requested,
            lead.stage_first_followup_sent,
            lead.stage_second_followup_sent,
        );
        assert!(!advance_stage(&mut lead, Stage::FirstFollowup));
        let twice = (
            lead.stage_connection_requested,
            lead.stage_first_followup_sent,
            lead.stage_second_followup_sent,
        );

        assert_eq!(once, (false, true, false));
        assert_eq!(once, twice);
        assert!(Stage::FirstFollowup.is_reached(&lead));
        assert!(!Stage::ConnectionRequested.is_reached(&lead));
    }

    #[test]
    fn status_is_independent_of_stages() {
        let mut lead = sample_lead(Uuid::new_v4(), Uuid::new_v4());
        advance_stage(&mut lead, Stage::ConnectionRequested);

        let previous = set_status(&mut lead, LeadStatus::Rejected);
        assert_eq!(previous, LeadStatus::Pending);
        assert_eq!(lead.status, LeadStatus::Rejected);
        assert!(lead.stage_connection_requested);

        // any status may follow any other
        assert_eq!(set_status(&mut lead, LeadStatus::Pending), LeadStatus::Rejected);
        assert_eq!(
            status_change_message(LeadStatus::Pending, LeadStatus::NotInterested),
            "PENDING -> NOT_INTERESTED"
        );
    }

    #[test]
    fn stage_templates_follow_the_sequence() {
        let campaign = sample_campaign(Uuid::new_v4());
        assert_eq!(
            Stage::ConnectionRequested.template(&campaign),
            Some("Hi {{firstName}}")
        );
        assert_eq!(Stage::SecondFollowup.template(&campaign), None);
        assert_eq!(Stage::SecondFollowup.event_type(), "SECOND_FOLLOWUP_SENT");
    }

    #[test]
    fn stage_deserializes_from_screaming_case() {
        let stage: Stage = serde_json::from_str("\"FIRST_FOLLOWUP\"").unwrap();
        assert_eq!(stage, Stage::FirstFollowup);
    }
}
