//! Core data types for Paybill tariffs

pub mod cost_rule;
pub mod country;
pub mod price_group;
