//! E2E Test: Governance Lifecycle
//!
//! Verifies the complete bond governance flow against the simulated ledger:
//! - Admin initializes governance and verifies a proposer
//! - Proposer submits a proposal with a pinned attachment
//! - Holders vote; duplicate and ineligible votes are refused
//! - Proposal is finalized and executed
//! - Cached attachments merge into on-chain views and orphans are pruned

use {
    bondgov_client::{
        attachment::{
            attachment_key, AttachmentFile, AttachmentRecord, AttachmentStore,
            FileAttachmentStore,
        },
        rpc::TransactionSubmitter,
        session::{ProposalDraft, VerifyOutcome},
        submit_error::SubmitErrorKind,
        ClientError, ProgramAddresses, ProposalStatus,
    },
    bondgov_e2e_tests::helpers::*,
    bondgov_governance_interface::{
        bond::BondAccount,
        instruction,
        state::{GovernanceState, Proposal, ProposalState},
    },
    solana_pubkey::Pubkey,
    std::sync::Arc,
};

fn draft() -> ProposalDraft {
    ProposalDraft {
        description: "Upgrade the district water treatment plant".to_string(),
        bond_purpose: "Water treatment".to_string(),
        bond_sector: "Infrastructure".to_string(),
        bond_amount: 25_000_000_000,
    }
}

fn seeded_proposal(id: u64, state: ProposalState, yes_votes: u64, no_votes: u64) -> Proposal {
    Proposal {
        id,
        proposer: Pubkey::new_unique(),
        description: "Rebuild the collapsed river bridge".to_string(),
        yes_votes,
        no_votes,
        start_slot: GENESIS_SLOT,
        end_slot: GENESIS_SLOT.saturating_add(100),
        state,
        bond_purpose: "Bridge repair".to_string(),
        bond_sector: "Infrastructure".to_string(),
        bond_amount: 5_000_000_000,
    }
}

fn seed_governance(ledger: &SimLedger, admin: Pubkey, proposal_count: u64) {
    let addresses = *ledger.addresses();
    ledger.seed(
        addresses.governance_state().unwrap().address,
        &addresses.governance_program,
        &GovernanceState {
            admin,
            voting_period: 100,
            quorum_votes: 1,
            proposal_count,
        },
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: Full lifecycle through client sessions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_proposal_lifecycle() {
    init_logging();
    let ledger = SimLedger::new(ProgramAddresses::default());
    let admin = participant(&ledger);
    let proposer = participant(&ledger);
    let voters: Vec<_> = (0..3).map(|_| participant(&ledger)).collect();

    admin.session.initialize_governance(100, 2).await.unwrap();
    assert!(matches!(
        admin.session.initialize_governance(100, 2).await,
        Err(ClientError::Rejected(_))
    ));
    let governance = admin.session.governance().await.unwrap().unwrap();
    assert_eq!(governance.admin, admin.wallet);
    assert_eq!(governance.proposal_count, 0);
    println!("✓ Governance initialized by {}", admin.wallet);

    // Unverified wallets cannot propose.
    assert!(matches!(
        proposer.session.create_proposal(draft(), None).await,
        Err(ClientError::Rejected(_))
    ));
    // Only the admin verifies.
    assert!(matches!(
        voters[0].session.verify_user(&proposer.wallet).await,
        Err(ClientError::Rejected(_))
    ));
    assert!(matches!(
        admin.session.verify_user(&proposer.wallet).await,
        Ok(VerifyOutcome::Verified(_))
    ));
    assert_eq!(
        admin.session.verify_user(&proposer.wallet).await.unwrap(),
        VerifyOutcome::AlreadyVerified
    );
    println!("✓ Proposer verified");

    let file = AttachmentFile {
        file_name: "plant.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 plan".to_vec(),
    };
    let created = proposer
        .session
        .create_proposal(draft(), Some(file))
        .await
        .unwrap();
    assert_eq!(created.id, 0);
    assert_eq!(proposer.uploader.uploads(), vec!["plant.pdf".to_string()]);
    println!("✓ Proposal #{} created in {}", created.id, created.transaction);

    for voter in &voters {
        voter
            .session
            .initialize_holding("Water bond", "Infrastructure", 1_000_000_000)
            .await
            .unwrap();
        assert!(voter.session.user_status(&voter.wallet).await.unwrap().is_holder);
    }
    voters[0].session.cast_vote(0, true).await.unwrap();
    voters[1].session.cast_vote(0, true).await.unwrap();
    voters[2].session.cast_vote(0, false).await.unwrap();
    println!("✓ Three holders voted");

    assert!(matches!(
        voters[0].session.cast_vote(0, false).await,
        Err(ClientError::Rejected(reason)) if reason.contains("already voted")
    ));
    assert!(matches!(
        proposer.session.cast_vote(0, true).await,
        Err(ClientError::Rejected(reason)) if reason.contains("bond")
    ));
    println!("✓ Duplicate and non-holder votes refused before submission");

    let board = proposer.session.refresh_proposals().await.unwrap().unwrap();
    let view = board.get(0).unwrap();
    assert_eq!(view.status, ProposalStatus::Voting);
    assert_eq!((view.yes_votes, view.no_votes), (2, 1));
    assert_eq!(view.file_name.as_deref(), Some("plant.pdf"));
    assert_eq!(
        view.ipfs_url.as_deref(),
        Some("https://gateway.pinata.cloud/ipfs/Qmplantpdf")
    );
    // The attachment cache is local to the proposer's session.
    let other_board = admin.session.refresh_proposals().await.unwrap().unwrap();
    assert_eq!(other_board.get(0).unwrap().ipfs_url, None);

    assert!(matches!(
        admin.session.execute_proposal(0).await,
        Err(ClientError::Rejected(_))
    ));
    ledger.advance_slots(101);
    assert_eq!(
        ledger.finalize_proposal(0).unwrap(),
        ProposalState::Succeeded
    );
    admin.session.execute_proposal(0).await.unwrap();
    println!("✓ Proposal executed at slot {}", ledger.slot());

    let board = proposer.session.refresh_proposals().await.unwrap().unwrap();
    assert_eq!(board.get(0).unwrap().status, ProposalStatus::Executed);
    assert_eq!(board.stats.executed, 1);

    let status = proposer.session.user_status(&proposer.wallet).await.unwrap();
    assert!(status.is_verified);
    assert!(!status.is_holder);
    assert!(!status.is_admin);

    assert!(matches!(
        admin.session.issue_bond(0).await,
        Err(ClientError::Rejected(reason)) if reason.contains("only the proposer")
    ));
    proposer.session.issue_bond(0).await.unwrap();
    println!("✓ Bond issued to the proposer");
    assert!(proposer.session.user_status(&proposer.wallet).await.unwrap().is_holder);
    assert!(matches!(
        proposer.session.issue_bond(0).await,
        Err(ClientError::Rejected(reason)) if reason.contains("already has a holding")
    ));

    let report = proposer.session.diagnostics(None).await.unwrap();
    assert!(report.programs.iter().all(|program| program.is_deployed()));
    let wallet = report.wallet.as_ref().unwrap();
    assert_eq!(wallet.verified_user.is_verified, Some(true));
    assert_eq!(wallet.holding.authority, Some(proposer.wallet));
    assert!(report.problems().is_empty());
    println!("✓ Diagnostics clean");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: Cached attachment merged into an on-chain proposal
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cached_attachment_merges_into_onchain_view() {
    init_logging();
    let ledger = SimLedger::new(ProgramAddresses::default());
    let addresses = *ledger.addresses();
    seed_governance(&ledger, Pubkey::new_unique(), 8);
    ledger.seed(
        addresses.proposal(7).unwrap().address,
        &addresses.governance_program,
        &seeded_proposal(7, ProposalState::Voting, 3, 1),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attachments.json");
    FileAttachmentStore::new(&path)
        .put(
            7,
            AttachmentRecord::new(
                "https://gateway.pinata.cloud/ipfs/QmSeven",
                "bridge-plan.pdf",
            ),
        )
        .unwrap();

    // A later session reads the same file.
    let viewer = participant_with_store(&ledger, Arc::new(FileAttachmentStore::new(&path)));
    let board = viewer.session.refresh_proposals().await.unwrap().unwrap();
    assert_eq!(board.proposals.len(), 1);
    let view = board.get(7).unwrap();
    assert_eq!(view.status, ProposalStatus::Voting);
    assert_eq!(view.yes_votes, 3);
    assert_eq!(view.no_votes, 1);
    assert_eq!(
        view.ipfs_url.as_deref(),
        Some("https://gateway.pinata.cloud/ipfs/QmSeven")
    );
    assert_eq!(view.file_name.as_deref(), Some("bridge-plan.pdf"));
    assert_eq!(view.yes_percentage(), 75.0);

    let single = viewer.session.proposal(7).await.unwrap().unwrap();
    assert_eq!(&single, view);
    println!("✓ Proposal #7 reads voting 3/1 with bridge-plan.pdf");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: Program failures classified from structured error codes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_program_errors_are_classified() {
    init_logging();
    let ledger = SimLedger::new(ProgramAddresses::default());
    let addresses = *ledger.addresses();
    let wallet = Pubkey::new_unique();
    let signer = SimSigner::new(ledger.clone(), wallet);
    seed_governance(&ledger, wallet, 1);
    let proposal = addresses.proposal(0).unwrap().address;
    ledger.seed(
        proposal,
        &addresses.governance_program,
        &seeded_proposal(0, ProposalState::Voting, 0, 0),
    );
    let program = addresses.governance_program;
    let holding = addresses.holding(&wallet).unwrap().address;
    let vote = instruction::cast_vote(
        &program,
        &proposal,
        &wallet,
        &holding,
        &addresses.vote_record(0, &wallet).unwrap().address,
        true,
    );

    let err = signer.submit(&[vote.clone()]).await.unwrap_err();
    assert_eq!(err.kind, SubmitErrorKind::NotHolder);

    ledger.seed(
        holding,
        &addresses.holding_program,
        &BondAccount {
            authority: wallet,
            purpose: "Bridge repair".to_string(),
            sector: "Infrastructure".to_string(),
            amount: 1,
            is_redeemed: false,
        },
    );
    signer.submit(&[vote.clone()]).await.unwrap();
    // The vote record now exists.
    let err = signer.submit(&[vote.clone()]).await.unwrap_err();
    assert_eq!(err.kind, SubmitErrorKind::AlreadyExists);

    ledger.advance_slots(500);
    let late_voter = Pubkey::new_unique();
    let late_holding = addresses.holding(&late_voter).unwrap().address;
    ledger.seed(
        late_holding,
        &addresses.holding_program,
        &BondAccount {
            authority: late_voter,
            purpose: "Bridge repair".to_string(),
            sector: "Infrastructure".to_string(),
            amount: 1,
            is_redeemed: false,
        },
    );
    let err = SimSigner::new(ledger.clone(), late_voter)
        .submit(&[instruction::cast_vote(
            &program,
            &proposal,
            &late_voter,
            &late_holding,
            &addresses.vote_record(0, &late_voter).unwrap().address,
            false,
        )])
        .await
        .unwrap_err();
    assert_eq!(err.kind, SubmitErrorKind::VotingClosed);

    let governance_state = addresses.governance_state().unwrap().address;
    let err = signer
        .submit(&[instruction::execute_proposal(&program, &proposal, &governance_state)])
        .await
        .unwrap_err();
    assert_eq!(err.kind, SubmitErrorKind::NotSucceeded);

    let missing = addresses.proposal(9).unwrap().address;
    let err = signer
        .submit(&[instruction::execute_proposal(&program, &missing, &governance_state)])
        .await
        .unwrap_err();
    assert_eq!(err.kind, SubmitErrorKind::MissingAccount);

    // Failed transactions leave no trace.
    assert_eq!(ledger.transaction_count(), 1);
    println!("✓ Program errors mapped to structured kinds");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: Orphaned attachment cleanup
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_prune_orphaned_attachments() {
    init_logging();
    let ledger = SimLedger::new(ProgramAddresses::default());
    let addresses = *ledger.addresses();
    seed_governance(&ledger, Pubkey::new_unique(), 5);
    ledger.seed(
        addresses.proposal(0).unwrap().address,
        &addresses.governance_program,
        &seeded_proposal(0, ProposalState::Failed, 0, 1),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attachments.json");
    let store = Arc::new(FileAttachmentStore::new(&path));
    for id in [0, 3, 9] {
        store
            .put(id, AttachmentRecord::new(format!("https://gw/ipfs/Qm{id}"), "doc.pdf"))
            .unwrap();
    }
    let user = participant_with_store(&ledger, store);

    let report = user.session.orphaned_attachments().await.unwrap();
    assert_eq!(report.orphans, vec![attachment_key(3)]);
    assert_eq!(report.pending, vec![attachment_key(9)]);

    let removed = user.session.prune_attachments().await.unwrap();
    assert_eq!(removed, vec![attachment_key(3)]);

    let mut keys = FileAttachmentStore::new(&path).keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec![attachment_key(0), attachment_key(9)]);
    println!("✓ Orphan pruned, pending entry kept");
}
