//! Bond Governance End-to-End Test Suite
//!
//! Drives full client sessions against [`helpers::SimLedger`], an in-process
//! ledger that interprets governance and holding instructions the way the
//! deployed programs do, so no validator process is needed.
//!
//! ```bash
//! cargo test -p bondgov-e2e-tests --test governance_lifecycle -- --nocapture
//! ```

pub mod helpers;
