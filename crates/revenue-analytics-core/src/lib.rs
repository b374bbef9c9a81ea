pub mod config;
pub mod display;
pub mod entities;
pub mod error;
pub mod period;
pub mod snapshot;
pub mod types;

#[cfg(feature = "revenue")]
pub mod revenue;

#[cfg(feature = "customers")]
pub mod customers;

#[cfg(feature = "onboarding")]
pub mod onboarding;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use error::AnalyticsError;
pub use types::*;

/// Standard result type for all revenue-analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
