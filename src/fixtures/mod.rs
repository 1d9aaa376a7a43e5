pub mod api_football;
pub mod fallback;
pub mod odds_api;
pub mod provider;
pub mod simulated;

pub use api_football::ApiFootball;
pub use fallback::WithFallback;
pub use odds_api::OddsApi;
pub use provider::FixtureSource;
pub use simulated::SimulatedFixtures;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::models::Fixture;
use crate::error::{EngineError, EngineResult};

/// Poll every source concurrently and merge their fixtures, earliest kickoff
/// first.
///
/// Failing or slow sources are logged and skipped. Fails with
/// `SourceUnavailable` only if every source failed.
pub async fn fetch_upcoming_all(
    sources: &[Arc<dyn FixtureSource>],
    timeout: Duration,
) -> EngineResult<Vec<Fixture>> {
    let fetches: Vec<_> = sources
        .iter()
        .map(|s| {
            let s = Arc::clone(s);
            async move {
                let out = match tokio::time::timeout(timeout, s.fetch_upcoming()).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("timed out after {:?}", timeout)),
                };
                (s.name().to_string(), out)
            }
        })
        .collect();

    let results = futures_util::future::join_all(fetches).await;

    let mut fixtures = Vec::new();
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(batch) => {
                info!("{}: {} upcoming fixture(s)", name, batch.len());
                fixtures.extend(batch);
            }
            Err(e) => {
                warn!("Fixture source '{}' failed: {}", name, e);
                failures.push(format!("{}: {}", name, e));
            }
        }
    }

    if !sources.is_empty() && failures.len() == sources.len() {
        return Err(EngineError::SourceUnavailable(failures.join("; ")));
    }

    fixtures.sort_by_key(|f| f.kickoff);
    Ok(fixtures)
}
