use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::Fixture;

/// Trait that every fixture provider must implement.
#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// Upcoming fixtures, already normalised. An empty list is not an error.
    async fn fetch_upcoming(&self) -> Result<Vec<Fixture>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
