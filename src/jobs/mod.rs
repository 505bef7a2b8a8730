pub mod manifest_reconcile;
pub mod verification_sweep;
