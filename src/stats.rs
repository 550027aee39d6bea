//! Campaign funnel statistics.
//!
//! Counts are folded from [`LeadTally`] rows: either one row per lead, or one
//! row per `(campaign, status, stage flags)` group as returned by a grouped
//! count query. Both paths share [`CampaignStats::record`].

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Lead, LeadStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub sent: i64,
    pub accepted: i64,
    pub pending: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionCounts {
    pub messaged: i64,
    pub connected: i64,
    pub not_interested: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowUpCounts {
    pub first_sent: i64,
    pub second_sent: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignStats {
    pub total_leads: i64,
    pub requests: RequestCounts,
    pub connections: ConnectionCounts,
    pub follow_ups: FollowUpCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub connection_requested: bool,
    pub first_followup_sent: bool,
    pub second_followup_sent: bool,
}

impl From<&Lead> for StageFlags {
    fn from(lead: &Lead) -> Self {
        Self {
            connection_requested: lead.stage_connection_requested,
            first_followup_sent: lead.stage_first_followup_sent,
            second_followup_sent: lead.stage_second_followup_sent,
        }
    }
}

/// `count` leads of one campaign sharing a status and stage flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadTally {
    pub campaign_id: Uuid,
    pub status: LeadStatus,
    pub stages: StageFlags,
    pub count: i64,
}

impl From<&Lead> for LeadTally {
    fn from(lead: &Lead) -> Self {
        Self {
            campaign_id: lead.campaign_id,
            status: lead.status,
            stages: StageFlags::from(lead),
            count: 1,
        }
    }
}

impl CampaignStats {
    pub fn record(&mut self, status: LeadStatus, stages: StageFlags, count: i64) {
        self.total_leads += count;
        match status {
            LeadStatus::Pending => self.requests.pending += count,
            LeadStatus::Accepted => self.requests.accepted += count,
            LeadStatus::Rejected => self.requests.rejected += count,
            LeadStatus::Messaged => self.connections.messaged += count,
            LeadStatus::Connected => self.connections.connected += count,
            LeadStatus::NotInterested => self.connections.not_interested += count,
        }
        if stages.connection_requested {
            self.requests.sent += count;
        }
        if stages.first_followup_sent {
            self.follow_ups.first_sent += count;
        }
        if stages.second_followup_sent {
            self.follow_ups.second_sent += count;
        }
    }

    pub fn merge(&mut self, other: &CampaignStats) {
        self.total_leads += other.total_leads;
        self.requests.sent += other.requests.sent;
        self.requests.accepted += other.requests.accepted;
        self.requests.pending += other.requests.pending;
        self.requests.rejected += other.requests.rejected;
        self.connections.messaged += other.connections.messaged;
        self.connections.connected += other.connections.connected;
        self.connections.not_interested += other.connections.not_interested;
        self.follow_ups.first_sent += other.follow_ups.first_sent;
        self.follow_ups.second_sent += other.follow_ups.second_sent;
    }

    /// Accepted requests per request sent, as a percentage.
    pub fn acceptance_rate(&self) -> f64 {
        percentage(self.requests.accepted, self.requests.sent)
    }

    /// Leads that answered (connected or declined) per accepted request, as a
    /// percentage.
    pub fn reply_rate(&self) -> f64 {
        percentage(
            self.connections.connected + self.connections.not_interested,
            self.requests.accepted,
        )
    }
}

/// Clamped to `[0, 100]` and rounded to one decimal; zero when `whole` is zero.
fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let raw = (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0);
    (raw * 10.0).round() / 10.0
}

pub fn aggregate<'a, I>(leads: I) -> CampaignStats
where
    I: IntoIterator<Item = &'a Lead>,
{
    leads.into_iter().fold(CampaignStats::default(), |mut stats, lead| {
        stats.record(lead.status, StageFlags::from(lead), 1);
        stats
    })
}

/// Folds tallies of any number of campaigns into per-campaign statistics.
pub fn fold_tallies<I>(tallies: I) -> HashMap<Uuid, CampaignStats>
where
    I: IntoIterator<Item = LeadTally>,
{
    let mut by_campaign: HashMap<Uuid, CampaignStats> = HashMap::new();
    for tally in tallies {
        by_campaign
            .entry(tally.campaign_id)
            .or_default()
            .record(tally.status, tally.stages, tally.count);
    }
    by_campaign
}

pub fn totals<'a, I>(stats: I) -> CampaignStats
where
    I: IntoIterator<Item = &'a CampaignStats>,
{
    stats
        .into_iter()
        .fold(CampaignStats::default(), |mut total, stats| {
            total.merge(stats);
            total
        })
}
