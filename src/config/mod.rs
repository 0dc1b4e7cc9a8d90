//! Tenant configuration types

mod settings;

pub use settings::{PointsSettings, DEFAULT_ACTIVITY_REWARDS};
