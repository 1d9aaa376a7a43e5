use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::provider::FixtureSource;
use crate::db::models::{Fixture, MatchOdds, Sport};

/// NBA fixtures from The Odds API v4.
/// Docs: <https://the-odds-api.com/liveapi/guides/v4/>
pub struct OddsApi {
    http: Client,
    api_key: String,
    base_url: String,
    max_fixtures: usize,
}

impl OddsApi {
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
        Ok(OddsApi {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_fixtures,
        })
    }

    fn odds_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/sports/basketball_nba/odds/", self.base_url))
            .context("Invalid Odds API base URL")?;
        url.query_pairs_mut()
            .append_pair("apiKey", &self.api_key)
            .append_pair("regions", "us")
            .append_pair("markets", "h2h");
        Ok(url)
    }
}

#[async_trait]
impl FixtureSource for OddsApi {
    fn name(&self) -> &str {
        "TheOddsAPI"
    }

    async fn fetch_upcoming(&self) -> Result<Vec<Fixture>> {
        let url = self.odds_url()?;
        debug!("Fetching NBA fixtures from {}{}", url.host_str().unwrap_or_default(), url.path());

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Odds API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Odds API error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        Ok(parse_odds_response(&raw, self.max_fixtures))
    }
}

/// Head-to-head prices from the first bookmaker's first market, matched to
/// each side by full team name.
fn first_quote(ev: &serde_json::Value, home: &str, away: &str) -> Option<MatchOdds> {
    let outcomes = ev["bookmakers"][0]["markets"][0]["outcomes"].as_array()?;
    let price = |team: &str| {
        outcomes
            .iter()
            .find(|o| o["name"].as_str() == Some(team))
            .and_then(|o| o["price"].as_f64())
    };
    Some(MatchOdds {
        home: price(home)?,
        away: price(away)?,
    })
}

/// "Los Angeles Lakers" → "Lakers"
fn short_team_name(full: &str) -> String {
    full.split_whitespace().last().unwrap_or(full).to_string()
}

fn parse_odds_response(raw: &serde_json::Value, max_fixtures: usize) -> Vec<Fixture> {
    let Some(events) = raw.as_array() else {
        return vec![];
    };

    events
        .iter()
        .filter_map(|ev| {
            let kickoff = DateTime::parse_from_rfc3339(ev["commence_time"].as_str()?)
                .ok()?
                .with_timezone(&Utc);
            let home = ev["home_team"].as_str()?;
            let away = ev["away_team"].as_str()?;
            Some(Fixture {
                id: ev["id"].as_str()?.to_string(),
                sport: Sport::Basketball,
                home_team: short_team_name(home),
                away_team: short_team_name(away),
                kickoff,
                league: "NBA".to_string(),
                venue: None,
                odds: first_quote(ev, home, away),
            })
        })
        .take(max_fixtures)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_events_with_short_names() {
        let raw = json!([
            {
                "id": "e912304de2b2ce35b473ce2ecd3d1502",
                "sport_key": "basketball_nba",
                "commence_time": "2026-10-21T23:40:00Z",
                "home_team": "Philadelphia 76ers",
                "away_team": "New York Knicks",
                "bookmakers": []
            },
            { "id": "broken", "home_team": "Chicago Bulls" }
        ]);
        let fixtures = parse_odds_response(&raw, 10);
        assert_eq!(fixtures.len(), 1);
        let f = &fixtures[0];
        assert_eq!(f.sport, Sport::Basketball);
        assert_eq!(f.home_team, "76ers");
        assert_eq!(f.away_team, "Knicks");
        assert_eq!(f.league, "NBA");
        assert!(f.venue.is_none());
        assert!(f.odds.is_none());
    }

    #[test]
    fn reads_first_bookmaker_prices() {
        let raw = json!([{
            "id": "4f1c",
            "commence_time": "2026-10-22T00:10:00Z",
            "home_team": "Chicago Bulls",
            "away_team": "Cleveland Cavaliers",
            "bookmakers": [
                {
                    "key": "draftkings",
                    "markets": [{
                        "key": "h2h",
                        "outcomes": [
                            { "name": "Cleveland Cavaliers", "price": 1.58 },
                            { "name": "Chicago Bulls", "price": 2.45 }
                        ]
                    }]
                },
                {
                    "key": "fanduel",
                    "markets": [{
                        "key": "h2h",
                        "outcomes": [
                            { "name": "Cleveland Cavaliers", "price": 1.6 },
                            { "name": "Chicago Bulls", "price": 2.4 }
                        ]
                    }]
                }
            ]
        }]);
        let fixtures = parse_odds_response(&raw, 10);
        assert_eq!(
            fixtures[0].odds,
            Some(MatchOdds { home: 2.45, away: 1.58 })
        );
    }

    #[test]
    fn one_sided_quote_is_dropped() {
        let raw = json!([{
            "id": "4f1d",
            "commence_time": "2026-10-22T00:10:00Z",
            "home_team": "Chicago Bulls",
            "away_team": "Cleveland Cavaliers",
            "bookmakers": [{
                "markets": [{ "outcomes": [{ "name": "Chicago Bulls", "price": 2.45 }] }]
            }]
        }]);
        assert!(parse_odds_response(&raw, 10)[0].odds.is_none());
    }

    #[test]
    fn non_array_payload_is_empty() {
        let raw = json!({ "message": "Invalid API key" });
        assert!(parse_odds_response(&raw, 10).is_empty());
    }

    #[test]
    fn short_name_keeps_single_word() {
        assert_eq!(short_team_name("Lakers"), "Lakers");
        assert_eq!(short_team_name("Golden State Warriors"), "Warriors");
    }
}
