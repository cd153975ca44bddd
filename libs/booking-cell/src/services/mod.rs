pub mod ledger;
pub mod queue;
