pub mod activity;
pub mod arr_breakdown;
pub mod at_risk;
pub mod billing;
pub mod grr;
pub mod mrr;
pub mod retention;
