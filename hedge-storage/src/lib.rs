pub mod ledger;

pub use ledger::{Ledger, LedgerState, MAX_EVENTS_PER_USER};
