pub mod types;
pub mod ledger;

pub use types::*;
pub use ledger::*;
