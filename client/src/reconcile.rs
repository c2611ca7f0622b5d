//! Merges on-chain proposals with cached attachment metadata.
//!
//! On-chain existence always wins: a cache entry never produces a view on its
//! own.  Entries the chain cannot account for are reported by
//! [`find_orphans`] and only removed on request.

use {
    crate::{
        attachment::{attachment_key, parse_attachment_key, AttachmentRecord},
        view::{ProposalStats, ProposalStatus, ProposalView},
    },
    log::*,
    serde::Serialize,
    std::{cmp::Ordering, collections::BTreeMap},
};

/// Total order used for every proposal listing.
pub fn compare_proposals(a: &ProposalView, b: &ProposalView) -> Ordering {
    a.status
        .priority()
        .cmp(&b.status.priority())
        .then_with(|| b.id.cmp(&a.id))
        .then_with(|| a.address.as_ref().cmp(b.address.as_ref()))
}

pub fn sort_proposals(proposals: &mut [ProposalView]) {
    proposals.sort_by(compare_proposals);
}

/// Copy attachment fields onto matching views.  Views without an entry are
/// left untouched, so merging twice gives the same result.
pub fn merge_attachments(
    proposals: &mut [ProposalView],
    attachments: &BTreeMap<String, AttachmentRecord>,
) {
    for proposal in proposals.iter_mut() {
        if let Some(record) = attachments.get(&attachment_key(proposal.id)) {
            proposal.apply_attachment(record);
        }
    }
}

pub fn compute_stats(proposals: &[ProposalView]) -> ProposalStats {
    let mut stats = ProposalStats {
        total: proposals.len(),
        ..ProposalStats::default()
    };
    for proposal in proposals {
        let counter = match proposal.status {
            ProposalStatus::Voting => &mut stats.voting,
            ProposalStatus::Succeeded => &mut stats.succeeded,
            ProposalStatus::Executed => &mut stats.executed,
            ProposalStatus::Failed => &mut stats.failed,
            ProposalStatus::Unknown => &mut stats.unknown,
        };
        *counter = counter.saturating_add(1);
        if proposal.degraded {
            warn!(
                "proposal {} at {} only partially decoded; counted with zero amounts",
                proposal.id, proposal.address
            );
            stats.degraded_records = stats.degraded_records.saturating_add(1);
        }
        stats.total_requested = stats
            .total_requested
            .saturating_add(u128::from(proposal.bond_amount));
        stats.total_votes = stats
            .total_votes
            .saturating_add(u128::from(proposal.total_votes()));
    }
    if stats.total > 0 {
        stats.average_requested = stats.total_requested as f64 / stats.total as f64;
        stats.average_votes = stats.total_votes as f64 / stats.total as f64;
    }
    stats
}

/// Classification of cache keys against the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    /// Malformed keys, and ids below the proposal count with no account.
    pub orphans: Vec<String>,
    /// Ids at or beyond the proposal count; the proposal may still land.
    pub pending: Vec<String>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty() && self.pending.is_empty()
    }
}

pub fn find_orphans<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    proposal_count: u64,
    onchain_ids: &[u64],
) -> OrphanReport {
    let mut report = OrphanReport::default();
    for key in keys {
        match parse_attachment_key(key) {
            None => report.orphans.push(key.to_string()),
            Some(id) if id >= proposal_count => report.pending.push(key.to_string()),
            Some(id) if onchain_ids.contains(&id) => {}
            Some(_) => report.orphans.push(key.to_string()),
        }
    }
    report
}

/// A reconciled listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalBoard {
    pub proposals: Vec<ProposalView>,
    pub stats: ProposalStats,
    /// Slot the chain reads were taken at.
    pub slot: u64,
}

impl ProposalBoard {
    pub fn get(&self, id: u64) -> Option<&ProposalView> {
        self.proposals.iter().find(|proposal| proposal.id == id)
    }
}

/// Merge, sort and summarize.
pub fn reconcile(
    mut proposals: Vec<ProposalView>,
    attachments: &BTreeMap<String, AttachmentRecord>,
    slot: u64,
) -> ProposalBoard {
    merge_attachments(&mut proposals, attachments);
    sort_proposals(&mut proposals);
    let stats = compute_stats(&proposals);
    debug!(
        "reconciled {} proposals ({} degraded) at slot {}",
        stats.total, stats.degraded_records, slot
    );
    ProposalBoard {
        proposals,
        stats,
        slot,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        proptest::prelude::*,
        solana_pubkey::Pubkey,
    };

    fn view(id: u64, status: ProposalStatus) -> ProposalView {
        ProposalView {
            address: Pubkey::new_from_array([id as u8; 32]),
            id,
            proposer: Some(Pubkey::new_from_array([id as u8 ^ 0xff; 32])),
            description: format!("proposal number {id}"),
            bond_purpose: "Roads".to_string(),
            bond_sector: "Infrastructure".to_string(),
            bond_amount: id.saturating_mul(1_000),
            yes_votes: id,
            no_votes: 1,
            start_slot: 10,
            end_slot: 110,
            status,
            degraded: false,
            recorded_id: None,
            ipfs_url: None,
            file_name: None,
            attachment_timestamp: None,
        }
    }

    fn record(url: &str) -> AttachmentRecord {
        AttachmentRecord {
            ipfs_url: url.to_string(),
            file_name: "plan.pdf".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_sort_by_status_then_newest() {
        let mut proposals = vec![
            view(1, ProposalStatus::Failed),
            view(2, ProposalStatus::Voting),
            view(3, ProposalStatus::Succeeded),
            view(4, ProposalStatus::Voting),
        ];
        sort_proposals(&mut proposals);
        let order: Vec<_> = proposals.iter().map(|p| (p.status, p.id)).collect();
        assert_eq!(
            order,
            vec![
                (ProposalStatus::Voting, 4),
                (ProposalStatus::Voting, 2),
                (ProposalStatus::Succeeded, 3),
                (ProposalStatus::Failed, 1),
            ]
        );
    }

    #[test]
    fn test_sort_executed_before_failed_and_unknown_last() {
        let mut proposals = vec![
            view(5, ProposalStatus::Unknown),
            view(6, ProposalStatus::Failed),
            view(7, ProposalStatus::Executed),
        ];
        sort_proposals(&mut proposals);
        let ids: Vec<_> = proposals.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 6, 5]);
    }

    #[test]
    fn test_sort_tie_breaks_on_address() {
        let mut a = view(9, ProposalStatus::Unknown);
        let mut b = view(9, ProposalStatus::Unknown);
        a.address = Pubkey::new_from_array([2; 32]);
        b.address = Pubkey::new_from_array([1; 32]);
        let mut proposals = vec![a.clone(), b.clone()];
        sort_proposals(&mut proposals);
        assert_eq!(proposals, vec![b, a]);
    }

    #[test]
    fn test_merge_leaves_unmatched_views_alone() {
        let mut proposals = vec![view(1, ProposalStatus::Voting), view(2, ProposalStatus::Voting)];
        let attachments = BTreeMap::from([(attachment_key(2), record("https://gw/ipfs/Qm2"))]);
        merge_attachments(&mut proposals, &attachments);
        assert_eq!(proposals[0].ipfs_url, None);
        assert_eq!(proposals[1].ipfs_url.as_deref(), Some("https://gw/ipfs/Qm2"));
        assert_eq!(proposals[1].file_name.as_deref(), Some("plan.pdf"));
        assert_eq!(proposals[1].attachment_timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_merge_does_not_match_padded_keys() {
        let mut proposals = vec![view(7, ProposalStatus::Voting)];
        let attachments = BTreeMap::from([("proposal_07".to_string(), record("x"))]);
        merge_attachments(&mut proposals, &attachments);
        assert_eq!(proposals[0].ipfs_url, None);
    }

    #[test]
    fn test_stats() {
        let mut degraded = view(3, ProposalStatus::Unknown);
        degraded.degraded = true;
        degraded.bond_amount = 0;
        degraded.yes_votes = 0;
        degraded.no_votes = 0;
        let proposals = vec![
            view(1, ProposalStatus::Voting),
            view(2, ProposalStatus::Executed),
            degraded,
        ];
        let stats = compute_stats(&proposals);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.voting, 1);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.degraded_records, 1);
        assert_eq!(stats.total_requested, 3_000);
        assert_eq!(stats.average_requested, 1_000.0);
        // (1 + 1) + (2 + 1)
        assert_eq!(stats.total_votes, 5);
    }

    #[test]
    fn test_stats_empty_and_saturating() {
        assert_eq!(compute_stats(&[]), ProposalStats::default());

        let mut big = view(1, ProposalStatus::Voting);
        big.bond_amount = u64::MAX;
        big.yes_votes = u64::MAX;
        let stats = compute_stats(&[big.clone(), big]);
        assert_eq!(stats.total_requested, u128::from(u64::MAX) * 2);
        assert_eq!(stats.total_votes, u128::from(u64::MAX) * 2);
    }

    #[test]
    fn test_find_orphans() {
        let keys = [
            "proposal_0",
            "proposal_1",
            "proposal_2",
            "proposal_5",
            "proposal_x",
            "notes",
        ];
        let report = find_orphans(keys, 3, &[0, 2]);
        assert_eq!(report.orphans, vec!["proposal_1", "proposal_x", "notes"]);
        assert_eq!(report.pending, vec!["proposal_5"]);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_reconcile_never_surfaces_cache_only_entries() {
        let attachments = BTreeMap::from([
            (attachment_key(1), record("u1")),
            (attachment_key(42), record("u42")),
        ]);
        let board = reconcile(vec![view(1, ProposalStatus::Voting)], &attachments, 50);
        assert_eq!(board.proposals.len(), 1);
        assert!(board.get(42).is_none());
        assert_eq!(board.get(1).unwrap().ipfs_url.as_deref(), Some("u1"));
        assert_eq!(board.slot, 50);
    }

    fn arb_status() -> impl Strategy<Value = ProposalStatus> {
        prop::sample::select(ProposalStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn test_merge_is_idempotent(
            entries in prop::collection::vec((0u64..20, arb_status(), any::<bool>()), 0..12)
        ) {
            let mut proposals: Vec<_> = entries.iter().map(|(id, status, _)| view(*id, *status)).collect();
            let attachments: BTreeMap<_, _> = entries
                .iter()
                .filter(|(_, _, cached)| *cached)
                .map(|(id, _, _)| (attachment_key(*id), record(&format!("https://gw/ipfs/{id}"))))
                .collect();
            merge_attachments(&mut proposals, &attachments);
            let once = proposals.clone();
            merge_attachments(&mut proposals, &attachments);
            prop_assert_eq!(once, proposals);
        }

        #[test]
        fn test_sort_is_total_and_stable_under_shuffle(
            entries in prop::collection::vec((0u64..50, arb_status()), 0..16),
        ) {
            let proposals: Vec<_> = entries.iter().map(|(id, status)| view(*id, *status)).collect();
            let mut forward = proposals.clone();
            let mut backward: Vec<_> = proposals.into_iter().rev().collect();
            sort_proposals(&mut forward);
            sort_proposals(&mut backward);
            prop_assert_eq!(&forward, &backward);
            for pair in forward.windows(2) {
                prop_assert!(compare_proposals(&pair[0], &pair[1]) != Ordering::Greater);
            }
        }
    }
}
