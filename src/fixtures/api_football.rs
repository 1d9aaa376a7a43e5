use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::provider::FixtureSource;
use crate::db::models::{Fixture, Sport};

/// Premier League, La Liga, Serie A, Ligue 1, Bundesliga.
const LEAGUE_IDS: &str = "39,140,135,61,78";

/// Soccer fixtures from API-Football v3.
/// Docs: <https://www.api-football.com/documentation-v3>
pub struct ApiFootball {
    http: Client,
    api_key: String,
    base_url: String,
    max_fixtures: usize,
}

impl ApiFootball {
    pub fn new(
        api_key: &str,
        base_url: &str,
        max_fixtures: usize,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiFootball {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_fixtures,
        })
    }

    fn fixtures_url(&self, now: DateTime<Utc>) -> Result<Url> {
        let tomorrow = (now + Duration::days(1)).format("%Y-%m-%d").to_string();
        let mut url = Url::parse(&format!("{}/fixtures", self.base_url))
            .context("Invalid API-Football base URL")?;
        url.query_pairs_mut()
            .append_pair("date", &tomorrow)
            .append_pair("league", LEAGUE_IDS);
        Ok(url)
    }
}

#[async_trait]
impl FixtureSource for ApiFootball {
    fn name(&self) -> &str {
        "API-Football"
    }

    async fn fetch_upcoming(&self) -> Result<Vec<Fixture>> {
        let url = self.fixtures_url(Utc::now())?;
        let host = url.host_str().unwrap_or_default().to_string();
        debug!("Fetching soccer fixtures from {}", url);

        let resp = self
            .http
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", host)
            .send()
            .await
            .context("API-Football request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API-Football error {}: {}", status, body);
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse API-Football response")?;

        Ok(parse_fixtures_response(&raw, self.max_fixtures))
    }
}

fn parse_fixtures_response(raw: &serde_json::Value, max_fixtures: usize) -> Vec<Fixture> {
    let Some(items) = raw["response"].as_array() else {
        return vec![];
    };

    items
        .iter()
        .filter_map(|item| {
            let fixture = &item["fixture"];
            let id = fixture["id"]
                .as_i64()
                .map(|v| v.to_string())
                .or_else(|| fixture["id"].as_str().map(str::to_string))?;
            let kickoff = DateTime::parse_from_rfc3339(fixture["date"].as_str()?)
                .ok()?
                .with_timezone(&Utc);

            Some(Fixture {
                id,
                sport: Sport::Soccer,
                home_team: item["teams"]["home"]["name"].as_str()?.to_string(),
                away_team: item["teams"]["away"]["name"].as_str()?.to_string(),
                kickoff,
                league: item["league"]["name"]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_string(),
                venue: fixture["venue"]["name"].as_str().map(str::to_string),
                odds: None,
            })
        })
        .take(max_fixtures)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "response": [
                {
                    "fixture": {
                        "id": 1035037,
                        "date": "2026-08-16T14:00:00+00:00",
                        "venue": { "name": "Old Trafford" }
                    },
                    "league": { "name": "Premier League" },
                    "teams": {
                        "home": { "name": "Manchester United" },
                        "away": { "name": "Tottenham" }
                    }
                },
                {
                    "fixture": { "id": 1035038, "date": "2026-08-16T16:30:00+02:00", "venue": {} },
                    "league": { "name": "La Liga" },
                    "teams": {
                        "home": { "name": "Atlético Madrid" },
                        "away": { "name": "Sevilla" }
                    }
                },
                {
                    "fixture": { "id": 1035039, "date": "not a date" },
                    "teams": { "home": { "name": "A" }, "away": { "name": "B" } }
                }
            ]
        })
    }

    #[test]
    fn parses_fixtures_and_skips_malformed_entries() {
        let fixtures = parse_fixtures_response(&sample(), 10);
        assert_eq!(fixtures.len(), 2);

        let first = &fixtures[0];
        assert_eq!(first.id, "1035037");
        assert_eq!(first.sport, Sport::Soccer);
        assert_eq!(first.home_team, "Manchester United");
        assert_eq!(first.venue.as_deref(), Some("Old Trafford"));
        assert_eq!(first.kickoff, Utc.with_ymd_and_hms(2026, 8, 16, 14, 0, 0).unwrap());

        let second = &fixtures[1];
        assert_eq!(second.league, "La Liga");
        assert_eq!(second.venue, None);
        assert_eq!(second.kickoff, Utc.with_ymd_and_hms(2026, 8, 16, 14, 30, 0).unwrap());
    }

    #[test]
    fn respects_fixture_cap() {
        assert_eq!(parse_fixtures_response(&sample(), 1).len(), 1);
    }

    #[test]
    fn missing_response_is_empty() {
        assert!(parse_fixtures_response(&json!({ "errors": [] }), 10).is_empty());
    }

    #[test]
    fn url_targets_tomorrow() {
        let client = ApiFootball::new(
            "key",
            "https://v3.football.api-sports.io/",
            10,
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 22, 0, 0).unwrap();
        let url = client.fixtures_url(now).unwrap();
        assert_eq!(url.path(), "/fixtures");
        assert!(url.query().unwrap().contains("date=2027-01-01"));
        assert!(url.query().unwrap().contains("league=39%2C140%2C135%2C61%2C78"));
    }
}
