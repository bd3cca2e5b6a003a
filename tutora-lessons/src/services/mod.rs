pub mod attendance;
pub mod disputes;
pub mod ledger;
pub mod lifecycle;
pub mod recurrence;
