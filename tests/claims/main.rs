// Claims Tests
// ClaimIDs, commitments and account-create sequences

#[path = "../common/mod.rs"]
mod common;
