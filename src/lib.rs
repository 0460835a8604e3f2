pub mod api;
pub mod config;
pub mod models;
pub mod utils;

pub use api::*;
pub use models::*;
pub use utils::*;

use api::teams::upcoming;
use serde::{Deserialize, Serialize};

/// One upcoming fixture with whatever prediction could be obtained for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedMatch {
    pub fixture: Fixture,
    pub prediction: Option<MatchPrediction>,
    pub provenance: Option<Provenance>,
    pub error: Option<String>,
}

/// All the data the dashboard page shows, each section tagged with where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub teams: Vec<Team>,
    pub teams_provenance: Option<Provenance>,
    pub fixtures: Vec<Fixture>,
    pub fixtures_provenance: Option<Provenance>,
    pub featured: Vec<FeaturedMatch>,
    pub news: Vec<NewsArticle>,
    pub news_provenance: Option<Provenance>,
}

fn split<T: Default>(outcome: Outcome<T>) -> (T, Option<Provenance>) {
    let provenance = outcome.provenance();
    if let Some(err) = outcome.error() {
        tracing::warn!("Dashboard section unavailable: {}", err);
    }
    (outcome.into_value().unwrap_or_default(), provenance)
}

/// Fetch teams, fixtures and news together, then predict the next `featured` fixtures
pub async fn fetch_dashboard(
    predictor: &Predictor,
    featured: usize,
    news_limit: u32,
    token: Option<&str>,
) -> DashboardData {
    let client = predictor.client();
    let (teams, fixtures, news) =
        tokio::join!(client.teams(), client.fixtures(), client.news(news_limit));

    let (teams, teams_provenance) = split(teams);
    let (fixtures, fixtures_provenance) = split(fixtures);
    let (news, news_provenance) = split(news);

    let mut featured_matches = Vec::new();
    for fixture in upcoming(&fixtures).into_iter().take(featured) {
        let request = PredictionRequest::new(&fixture.home_team.name, &fixture.away_team.name)
            .with_date(fixture.date.clone());
        let (_, outcome) = predictor.predict(&request, token).await;

        featured_matches.push(FeaturedMatch {
            fixture: fixture.clone(),
            provenance: outcome.provenance(),
            error: outcome.error().map(ApiError::user_message),
            prediction: outcome.into_value(),
        });
    }

    DashboardData {
        teams,
        teams_provenance,
        fixtures,
        fixtures_provenance,
        featured: featured_matches,
        news,
        news_provenance,
    }
}
