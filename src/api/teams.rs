use super::client::ScoreSightClient;
use super::error::{ApiError, Outcome};
use crate::models::{Fixture, Team, TeamAnalysis};
use crate::utils::analysis::analyze_team;
use crate::utils::fallback::{sample_fixtures, sample_teams};
use serde::Deserialize;

const TEAMS_PATH: &str = "/api/teams";
const FIXTURES_PATH: &str = "/api/fixtures";
const MATCHES_PATH: &str = "/api/matches"; // older backends

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    teams: Vec<Team>,
}

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    matches: Option<Vec<Fixture>>,
    #[serde(default)]
    fixtures: Option<Vec<Fixture>>,
}

impl ScoreSightClient {
    pub async fn fetch_teams(&self) -> Result<Vec<Team>, ApiError> {
        let response: TeamsResponse = self.send_json(self.get(TEAMS_PATH)).await?;
        Ok(response.teams)
    }

    /// Fetch fixtures, retrying the legacy `/api/matches` path when `/api/fixtures` is missing
    pub async fn fetch_fixtures(&self) -> Result<Vec<Fixture>, ApiError> {
        let first = self
            .send_json::<FixturesResponse>(self.get(FIXTURES_PATH))
            .await;
        let response = match first {
            Err(ApiError::Status { status: 404, .. }) => {
                tracing::debug!("{} not found, trying {}", FIXTURES_PATH, MATCHES_PATH);
                self.send_json::<FixturesResponse>(self.get(MATCHES_PATH))
                    .await?
            }
            other => other?,
        };

        response
            .matches
            .or(response.fixtures)
            .ok_or_else(|| ApiError::Decode("response has neither matches nor fixtures".to_string()))
    }

    /// Teams list, falling back to the sample clubs
    pub async fn teams(&self) -> Outcome<Vec<Team>> {
        Outcome::or_fallback(self.fetch_teams().await, sample_teams)
    }

    /// Fixtures list, falling back to a static sample
    pub async fn fixtures(&self) -> Outcome<Vec<Fixture>> {
        Outcome::or_fallback(self.fetch_fixtures().await, sample_fixtures)
    }

    /// Season summary for one team, derived from the fixtures list
    pub async fn team_analysis(&self, team: &str) -> Outcome<TeamAnalysis> {
        if team.trim().is_empty() {
            return Outcome::Failed(ApiError::Validation("Please select a team".to_string()));
        }
        self.fixtures().await.map(|fixtures| analyze_team(team, &fixtures))
    }
}

/// Fixtures that have not been played yet, soonest first
pub fn upcoming(fixtures: &[Fixture]) -> Vec<&Fixture> {
    let mut upcoming: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.final_score().is_none())
        .collect();
    upcoming.sort_by(|a, b| a.date.cmp(&b.date));
    upcoming
}
