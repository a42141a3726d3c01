//! Marketplace backend core: routes inbound sales leads to paying partner
//! accounts and gates every assignment on quota and billing eligibility.

pub mod config;
pub mod error;
pub mod infra;
pub mod routing;
pub mod telemetry;
