use super::client::ScoreSightClient;
use super::error::{ApiError, Outcome};
use super::normalize::{normalize_prediction, RawPrediction};
use crate::models::{MatchPrediction, MatchStats};
use crate::utils::fallback::synthesize_prediction;
use crate::utils::generation::{RequestGate, Ticket};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Mutex;

pub const LOGIN_REQUIRED: &str = "Please login first to use the AI Predictor";

/// Which revision of the prediction API to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictEndpoint {
    /// `GET /api/predict?home_team=..&away_team=..`
    Simple,
    /// `POST /api/predict-detailed` with match statistics
    Detailed,
    /// `POST /predict-ai-fixed` with `HomeTeam`/`AwayTeam`/`Date`
    AiFixed,
}

impl PredictEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            PredictEndpoint::Simple => "/api/predict",
            PredictEndpoint::Detailed => "/api/predict-detailed",
            PredictEndpoint::AiFixed => "/predict-ai-fixed",
        }
    }
}

impl FromStr for PredictEndpoint {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "predict" => Ok(PredictEndpoint::Simple),
            "detailed" | "predict-detailed" => Ok(PredictEndpoint::Detailed),
            "ai-fixed" | "ai_fixed" | "predict-ai-fixed" => Ok(PredictEndpoint::AiFixed),
            other => Err(ApiError::Validation(format!(
                "unknown prediction endpoint: {}",
                other
            ))),
        }
    }
}

/// User-selected inputs for a pre-match prediction
#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    pub date: Option<String>,
    pub stats: Option<MatchStats>,
}

impl PredictionRequest {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_stats(mut self, stats: MatchStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_teams(&self.home_team, &self.away_team)
    }
}

/// Both teams selected and not the same club
pub fn validate_teams(home_team: &str, away_team: &str) -> Result<(), ApiError> {
    let home = home_team.trim();
    let away = away_team.trim();
    if home.is_empty() || away.is_empty() {
        return Err(ApiError::Validation("Please select both teams".to_string()));
    }
    if home.eq_ignore_ascii_case(away) {
        return Err(ApiError::Validation(
            "Home and Away teams must be different".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DetailedBody<'a> {
    home_team: &'a str,
    away_team: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_date: Option<&'a str>,
    #[serde(flatten)]
    stats: MatchStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AiFixedBody<'a> {
    home_team: &'a str,
    away_team: &'a str,
    date: String,
}

impl ScoreSightClient {
    /// Fetch and normalize one prediction. No fallback here; see `Predictor`.
    pub async fn fetch_prediction(
        &self,
        endpoint: PredictEndpoint,
        request: &PredictionRequest,
        token: Option<&str>,
    ) -> Result<MatchPrediction, ApiError> {
        let home = request.home_team.trim();
        let away = request.away_team.trim();

        let mut builder = match endpoint {
            PredictEndpoint::Simple => self
                .get(endpoint.path())
                .query(&[("home_team", home), ("away_team", away)]),
            PredictEndpoint::Detailed => self.post(endpoint.path()).json(&DetailedBody {
                home_team: home,
                away_team: away,
                match_date: request.date.as_deref(),
                stats: request.stats.clone().unwrap_or_default(),
            }),
            PredictEndpoint::AiFixed => self.post(endpoint.path()).json(&AiFixedBody {
                home_team: home,
                away_team: away,
                date: request
                    .date
                    .clone()
                    .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
            }),
        };

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!("Requesting prediction {} vs {} via {:?}", home, away, endpoint);
        let raw: RawPrediction = self.send_json(builder).await.map_err(|e| match e {
            ApiError::Unauthorized(_) => ApiError::Unauthorized(LOGIN_REQUIRED.to_string()),
            other => other,
        })?;

        normalize_prediction(raw, home, away, request.date.as_deref())
    }
}

/// Prediction requests with validation, fallback synthesis and request ordering
pub struct Predictor {
    pub(crate) client: ScoreSightClient,
    endpoint: PredictEndpoint,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) gate: RequestGate,
}

impl Predictor {
    pub fn new(client: ScoreSightClient, endpoint: PredictEndpoint) -> Self {
        Self {
            client,
            endpoint,
            rng: Mutex::new(StdRng::from_entropy()),
            gate: RequestGate::new(),
        }
    }

    /// Fix the RNG used for fallback data, so synthesized values are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn endpoint(&self) -> PredictEndpoint {
        self.endpoint
    }

    pub fn client(&self) -> &ScoreSightClient {
        &self.client
    }

    /// Whether `ticket` belongs to the most recent request issued through this predictor
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.gate.is_current(ticket)
    }

    /// Validate, fetch and normalize a prediction, synthesizing one if the
    /// backend is unreachable or misbehaves.
    ///
    /// Invalid input returns `Failed` without touching the network.
    pub async fn predict(
        &self,
        request: &PredictionRequest,
        token: Option<&str>,
    ) -> (Ticket, Outcome<MatchPrediction>) {
        let ticket = self.gate.begin();

        if let Err(e) = request.validate() {
            return (ticket, Outcome::Failed(e));
        }

        let result = self
            .client
            .fetch_prediction(self.endpoint, request, token)
            .await;

        let outcome = Outcome::or_fallback(result, || {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            synthesize_prediction(
                &mut *rng,
                request.home_team.trim(),
                request.away_team.trim(),
                request.date.as_deref(),
            )
        });

        (ticket, outcome)
    }
}
