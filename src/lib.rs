//! Points and gamification engine for multi-tenant communities.
//!
//! Awards reputation points for member actions, enforces per-period earning
//! caps, derives a level/progress curve from cumulative totals, and governs
//! redemption of points for rewards with finite stock and expiry.
//!
//! The engine owns the business rules only. Persistence sits behind the
//! [`store::PointsStore`] trait (a SQLite implementation ships for local
//! and test use); auth, UI, and notification delivery are the host
//! application's problem.
//!
//! ```ignore
//! let store = Arc::new(SqliteStore::open(&path)?);
//! let engine = PointsEngine::new("my-community", store);
//!
//! match engine.award_points("user-1", ActionType::Comment, Some("post-9"), None).await? {
//!     AwardOutcome::Granted { points, .. } => println!("earned {points}"),
//!     AwardOutcome::Denied(reason) => println!("no points: {reason:?}"),
//! }
//! ```

pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod store;

pub use domain::*;
pub use engine::{
    level_of, AwardDenial, AwardOutcome, EngineError, LevelProgress, PointsEngine, RedeemDenial,
    RedeemOutcome,
};
pub use store::{PointsStore, SqliteStore, StoreError};
