use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use super::provider::FixtureSource;
use crate::db::models::{Fixture, Sport};

/// (id, home, away, kickoff hour, kickoff minute, league, venue)
type Slate = [(&'static str, &'static str, &'static str, i64, i64, &'static str, &'static str)];

const SOCCER_SLATE: &Slate = &[
    ("sim-1", "Manchester United", "Tottenham", 16, 0, "Premier League", "Old Trafford"),
    ("sim-2", "Atlético Madrid", "Sevilla", 18, 30, "La Liga", "Wanda Metropolitano"),
    ("sim-3", "AC Milan", "Napoli", 20, 45, "Serie A", "San Siro"),
    ("sim-4", "Borussia Dortmund", "RB Leipzig", 15, 30, "Bundesliga", "Signal Iduna Park"),
];

const NBA_SLATE: &Slate = &[
    ("sim-nba-1", "76ers", "Knicks", 19, 0, "NBA", "Wells Fargo Center"),
    ("sim-nba-2", "Bulls", "Cavaliers", 20, 0, "NBA", "United Center"),
    ("sim-nba-3", "Lakers", "Suns", 22, 30, "NBA", "Crypto.com Arena"),
];

/// Fixed fallback slate, used for a sport whose provider has no API key or
/// whose live fetch failed.
pub struct SimulatedFixtures {
    sport: Sport,
    name: String,
    /// Day to schedule on; `None` means tomorrow at fetch time.
    day: Option<NaiveDate>,
}

impl SimulatedFixtures {
    pub fn new(sport: Sport) -> Self {
        SimulatedFixtures {
            sport,
            name: format!("Simulated({})", sport),
            day: None,
        }
    }

    #[cfg(test)]
    pub fn on_day(sport: Sport, day: NaiveDate) -> Self {
        SimulatedFixtures {
            day: Some(day),
            ..Self::new(sport)
        }
    }

    fn slate(&self, day: NaiveDate) -> Vec<Fixture> {
        let entries = match self.sport {
            Sport::Soccer => SOCCER_SLATE,
            Sport::Basketball => NBA_SLATE,
        };
        let midnight = day.and_time(NaiveTime::MIN);
        entries
            .iter()
            .map(|(id, home, away, hour, minute, league, venue)| Fixture {
                id: id.to_string(),
                sport: self.sport,
                home_team: home.to_string(),
                away_team: away.to_string(),
                kickoff: Utc.from_utc_datetime(
                    &(midnight + Duration::minutes(hour * 60 + minute)),
                ),
                league: league.to_string(),
                venue: Some(venue.to_string()),
                odds: None,
            })
            .collect()
    }
}

#[async_trait]
impl FixtureSource for SimulatedFixtures {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_upcoming(&self) -> Result<Vec<Fixture>> {
        let day = self
            .day
            .unwrap_or_else(|| (Utc::now() + Duration::days(1)).date_naive());
        Ok(self.slate(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn soccer_slate_is_scheduled_on_requested_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let fixtures = SimulatedFixtures::on_day(Sport::Soccer, day)
            .fetch_upcoming()
            .await
            .unwrap();
        assert_eq!(fixtures.len(), 4);
        assert!(fixtures.iter().all(|f| f.sport == Sport::Soccer));
        assert!(fixtures.iter().all(|f| f.kickoff.date_naive() == day));
        assert_eq!(fixtures[2].venue.as_deref(), Some("San Siro"));
        assert_eq!(fixtures[1].kickoff, Utc.with_ymd_and_hms(2026, 10, 17, 18, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn default_slate_is_tomorrow() {
        let fixtures = SimulatedFixtures::new(Sport::Basketball)
            .fetch_upcoming()
            .await
            .unwrap();
        assert_eq!(fixtures.len(), 3);
        assert!(fixtures.iter().all(|f| f.league == "NBA"));
        assert!(fixtures[0].kickoff > Utc::now());
    }
}
