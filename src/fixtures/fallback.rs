use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::provider::FixtureSource;
use crate::db::models::Fixture;

/// Live source that hands over to a backup whenever it fails or stalls, so a
/// provider outage still yields a slate for its sport.
pub struct WithFallback {
    primary: Arc<dyn FixtureSource>,
    backup: Arc<dyn FixtureSource>,
    timeout: Duration,
    name: String,
}

impl WithFallback {
    pub fn new(
        primary: Arc<dyn FixtureSource>,
        backup: Arc<dyn FixtureSource>,
        timeout: Duration,
    ) -> Self {
        let name = format!("{} (fallback {})", primary.name(), backup.name());
        WithFallback {
            primary,
            backup,
            timeout,
            name,
        }
    }
}

#[async_trait]
impl FixtureSource for WithFallback {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_upcoming(&self) -> Result<Vec<Fixture>> {
        let live = match tokio::time::timeout(self.timeout, self.primary.fetch_upcoming()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("timed out after {:?}", self.timeout)),
        };
        match live {
            Ok(fixtures) => Ok(fixtures),
            Err(e) => {
                warn!(
                    "{} failed ({}), using {}",
                    self.primary.name(),
                    e,
                    self.backup.name()
                );
                self.backup.fetch_upcoming().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Sport;
    use crate::fixtures::tests::{Broken, Stalled};
    use crate::fixtures::SimulatedFixtures;
    use chrono::NaiveDate;

    fn simulated(sport: Sport) -> Arc<dyn FixtureSource> {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        Arc::new(SimulatedFixtures::on_day(sport, day))
    }

    #[tokio::test]
    async fn failing_source_falls_back_to_backup() {
        let source = WithFallback::new(
            Arc::new(Broken),
            simulated(Sport::Basketball),
            Duration::from_secs(1),
        );
        let fixtures = source.fetch_upcoming().await.unwrap();
        assert_eq!(fixtures.len(), 3);
        assert!(fixtures.iter().all(|f| f.sport == Sport::Basketball));
        assert_eq!(source.name(), "Broken (fallback Simulated(basketball))");
    }

    #[tokio::test]
    async fn stalled_source_falls_back_after_timeout() {
        let source = WithFallback::new(
            Arc::new(Stalled),
            simulated(Sport::Soccer),
            Duration::from_millis(50),
        );
        assert_eq!(source.fetch_upcoming().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn healthy_source_is_used_as_is() {
        let source = WithFallback::new(
            simulated(Sport::Soccer),
            Arc::new(Broken),
            Duration::from_secs(1),
        );
        let fixtures = source.fetch_upcoming().await.unwrap();
        assert_eq!(fixtures.len(), 4);
        assert!(fixtures.iter().all(|f| f.sport == Sport::Soccer));
    }

    #[tokio::test]
    async fn both_failing_is_an_error() {
        let source = WithFallback::new(Arc::new(Broken), Arc::new(Broken), Duration::from_secs(1));
        assert!(source.fetch_upcoming().await.is_err());
    }
}
