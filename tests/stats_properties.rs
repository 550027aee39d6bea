use chrono::Utc;
use outreach::models::{Lead, LeadStatus};
use outreach::stats::{aggregate, fold_tallies, totals, CampaignStats, LeadTally};
use proptest::prelude::*;
use proptest::test_runner::Config;
use uuid::Uuid;

fn lead_in(campaign_id: Uuid, status: LeadStatus, flags: (bool, bool, bool)) -> Lead {
    Lead {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        campaign_id,
        name: "Ana Lima".to_string(),
        email: "ana@example.com".to_string(),
        company: None,
        position: None,
        status,
        stage_connection_requested: flags.0,
        stage_first_followup_sent: flags.1,
        stage_second_followup_sent: flags.2,
        created_at: Utc::now().naive_utc(),
    }
}

fn lead_shape() -> impl Strategy<Value = (usize, usize, (bool, bool, bool))> {
    (
        0..3_usize,
        0..LeadStatus::ALL.len(),
        (any::<bool>(), any::<bool>(), any::<bool>()),
    )
}

fn build_leads(shapes: &[(usize, usize, (bool, bool, bool))]) -> (Vec<Uuid>, Vec<Lead>) {
    let campaigns: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let leads = shapes
        .iter()
        .map(|&(campaign, status, flags)| {
            lead_in(campaigns[campaign], LeadStatus::ALL[status], flags)
        })
        .collect();
    (campaigns, leads)
}

fn bucket_sum(stats: &CampaignStats) -> i64 {
    stats.requests.accepted
        + stats.requests.pending
        + stats.requests.rejected
        + stats.connections.messaged
        + stats.connections.connected
        + stats.connections.not_interested
}

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn counts_stay_within_total(shapes in prop::collection::vec(lead_shape(), 0..64)) {
        let (_, leads) = build_leads(&shapes);
        let stats = aggregate(&leads);

        prop_assert_eq!(stats.total_leads, leads.len() as i64);
        prop_assert!(stats.requests.accepted + stats.requests.pending <= stats.total_leads);
        prop_assert_eq!(bucket_sum(&stats), stats.total_leads);
        prop_assert!(stats.requests.sent <= stats.total_leads);
        prop_assert!((0.0..=100.0).contains(&stats.acceptance_rate()));
        prop_assert!((0.0..=100.0).contains(&stats.reply_rate()));
    }

    #[test]
    fn grouped_tallies_match_per_lead_aggregation(
        shapes in prop::collection::vec(lead_shape(), 0..64)
    ) {
        let (campaigns, leads) = build_leads(&shapes);
        let by_campaign = fold_tallies(leads.iter().map(LeadTally::from));

        for campaign_id in &campaigns {
            let expected = aggregate(leads.iter().filter(|lead| lead.campaign_id == *campaign_id));
            let folded = by_campaign.get(campaign_id).copied().unwrap_or_default();
            prop_assert_eq!(folded, expected);
        }
        prop_assert_eq!(totals(by_campaign.values()), aggregate(&leads));
    }
}
