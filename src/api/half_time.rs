use super::client::ScoreSightClient;
use super::error::{ApiError, Outcome};
use super::normalize::{normalize_half_time, RawPrediction};
use super::predict::{validate_teams, Predictor};
use crate::models::HalfTimePrediction;
use crate::utils::fallback::synthesize_half_time;
use crate::utils::generation::Ticket;

const HALF_TIME_PATH: &str = "/api/half-time-predict";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalfTimeRequest {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl HalfTimeRequest {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_score: u32,
        away_score: u32,
    ) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_score,
            away_score,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_teams(&self.home_team, &self.away_team)
    }
}

impl ScoreSightClient {
    pub async fn fetch_half_time(
        &self,
        request: &HalfTimeRequest,
    ) -> Result<HalfTimePrediction, ApiError> {
        let home = request.home_team.trim();
        let away = request.away_team.trim();
        let home_score = request.home_score.to_string();
        let away_score = request.away_score.to_string();

        let builder = self.get(HALF_TIME_PATH).query(&[
            ("home_team", home),
            ("away_team", away),
            ("home_score", home_score.as_str()),
            ("away_score", away_score.as_str()),
        ]);

        let raw: RawPrediction = self.send_json(builder).await?;
        normalize_half_time(
            raw,
            home,
            away,
            (request.home_score, request.away_score),
        )
    }
}

impl Predictor {
    /// Half-time prediction with the same validation and fallback rules as `predict`
    pub async fn predict_half_time(
        &self,
        request: &HalfTimeRequest,
    ) -> (Ticket, Outcome<HalfTimePrediction>) {
        let ticket = self.gate.begin();

        if let Err(e) = request.validate() {
            return (ticket, Outcome::Failed(e));
        }

        let result = self.client.fetch_half_time(request).await;
        let outcome = Outcome::or_fallback(result, || {
            synthesize_half_time(
                request.home_team.trim(),
                request.away_team.trim(),
                request.home_score,
                request.away_score,
            )
        });

        (ticket, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_time_request_validation() {
        assert!(HalfTimeRequest::new("Arsenal", "Chelsea", 1, 0).validate().is_ok());
        assert!(HalfTimeRequest::new("Arsenal", "arsenal", 1, 0).validate().is_err());
        assert!(HalfTimeRequest::new("", "Chelsea", 0, 0).validate().is_err());
    }
}
