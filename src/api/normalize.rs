//! The one place that knows about the backend's many response shapes.
//!
//! Every prediction endpoint revision spells its fields differently
//! (`home_win_prob`, `homeWinProbability`, nested `probabilities`, ...).
//! They all deserialize into the raw structs here and leave as the
//! canonical models types.

use super::error::ApiError;
use crate::models::{
    short_name_for, Confidence, HalfTimePrediction, MatchPrediction, Momentum, Team,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTeamRef {
    Name(String),
    Team(RawTeam),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeam {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default, alias = "short_name")]
    pub short_name: Option<String>,
    #[serde(default)]
    pub crest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawConfidence {
    Label(String),
    Score(f64),
}

#[derive(Debug, Default, Deserialize)]
pub struct RawProbabilities {
    #[serde(default, alias = "home_win", alias = "homeWin")]
    pub home: Option<f64>,
    #[serde(default)]
    pub draw: Option<f64>,
    #[serde(default, alias = "away_win", alias = "awayWin")]
    pub away: Option<f64>,
}

/// Union of every prediction payload the backends have produced
#[derive(Debug, Default, Deserialize)]
pub struct RawPrediction {
    #[serde(default, alias = "homeTeam", alias = "HomeTeam")]
    pub home_team: Option<RawTeamRef>,
    #[serde(default, alias = "awayTeam", alias = "AwayTeam")]
    pub away_team: Option<RawTeamRef>,
    #[serde(default, alias = "match_date", alias = "Date")]
    pub date: Option<String>,

    #[serde(default, alias = "homeWinProbability", alias = "home_win_probability")]
    pub home_win_prob: Option<f64>,
    #[serde(default, alias = "drawProbability", alias = "draw_probability")]
    pub draw_prob: Option<f64>,
    #[serde(default, alias = "awayWinProbability", alias = "away_win_probability")]
    pub away_win_prob: Option<f64>,
    #[serde(default)]
    pub probabilities: Option<RawProbabilities>,

    #[serde(
        default,
        alias = "predictedScore",
        alias = "finalScore",
        alias = "final_score"
    )]
    pub predicted_score: Option<String>,
    #[serde(default, alias = "homeGoals")]
    pub home_goals: Option<f64>,
    #[serde(default, alias = "awayGoals")]
    pub away_goals: Option<f64>,

    #[serde(default)]
    pub confidence: Option<RawConfidence>,
    #[serde(default, alias = "keyFactors")]
    pub key_factors: Option<Vec<String>>,
    #[serde(default, alias = "aiExplanation", alias = "ai_explanation")]
    pub explanation: Option<String>,
    #[serde(default, alias = "modelUsed")]
    pub model_used: Option<String>,

    #[serde(default)]
    pub momentum: Option<String>,
    #[serde(default, alias = "comebackLikelihood")]
    pub comeback_likelihood: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

fn team_from_raw(raw: Option<RawTeamRef>, requested: &str) -> Team {
    match raw {
        Some(RawTeamRef::Name(name)) if !name.trim().is_empty() => Team::from_name(&name),
        Some(RawTeamRef::Team(team)) => {
            let short_name = team
                .short_name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| short_name_for(&team.name));
            Team {
                id: team.id.unwrap_or(0),
                name: team.name,
                short_name,
                crest: team.crest.filter(|c| !c.is_empty()).unwrap_or_else(|| "⚽".to_string()),
            }
        }
        _ => Team::from_name(requested),
    }
}

fn confidence_from_raw(raw: Option<RawConfidence>, home: f64, away: f64) -> Confidence {
    match raw {
        Some(RawConfidence::Label(label)) => {
            Confidence::parse(&label).unwrap_or_else(|| Confidence::from_probabilities(home, away))
        }
        Some(RawConfidence::Score(score)) => Confidence::from_score(score),
        None => Confidence::from_probabilities(home, away),
    }
}

/// Map a raw prediction into the canonical shape.
///
/// Probabilities are copied verbatim. A body with an `error` field is a
/// `Backend` error; a body missing any of the three probabilities is a
/// `Decode` error.
pub fn normalize_prediction(
    raw: RawPrediction,
    home_team: &str,
    away_team: &str,
    date: Option<&str>,
) -> Result<MatchPrediction, ApiError> {
    if let Some(error) = raw.error.filter(|e| !e.trim().is_empty()) {
        return Err(ApiError::Backend(error));
    }

    let nested = raw.probabilities.unwrap_or_default();
    let home = raw.home_win_prob.or(nested.home);
    let draw = raw.draw_prob.or(nested.draw);
    let away = raw.away_win_prob.or(nested.away);

    let (home, draw, away) = match (home, draw, away) {
        (Some(h), Some(d), Some(a)) => (h, d, a),
        _ => {
            return Err(ApiError::Decode(
                "response is missing win/draw/loss probabilities".to_string(),
            ))
        }
    };

    let predicted_score = match (raw.predicted_score, raw.home_goals, raw.away_goals) {
        (Some(score), _, _) if !score.trim().is_empty() => score,
        (_, Some(h), Some(a)) => format!("{}-{}", h.round() as i64, a.round() as i64),
        _ => "-".to_string(),
    };

    Ok(MatchPrediction {
        home_team: team_from_raw(raw.home_team, home_team),
        away_team: team_from_raw(raw.away_team, away_team),
        date: raw.date.or_else(|| date.map(str::to_string)),
        home_win_probability: home,
        draw_probability: draw,
        away_win_probability: away,
        predicted_score,
        confidence: confidence_from_raw(raw.confidence, home, away),
        key_factors: raw.key_factors.unwrap_or_default(),
        explanation: raw.explanation,
        model_used: raw.model_used,
    })
}

/// Half-time variant: same probability rules, plus momentum and comeback
/// likelihood (derived from the score when the backend omits them)
pub fn normalize_half_time(
    mut raw: RawPrediction,
    home_team: &str,
    away_team: &str,
    score: (u32, u32),
) -> Result<HalfTimePrediction, ApiError> {
    let momentum = raw.momentum.take();
    let comeback = raw.comeback_likelihood.take();
    let prediction = normalize_prediction(raw, home_team, away_team, None)?;

    let momentum = match momentum.as_deref().map(str::to_lowercase).as_deref() {
        Some("home") => Momentum::Home,
        Some("away") => Momentum::Away,
        Some("level") | Some("draw") | Some("even") => Momentum::Level,
        _ => match score.0.cmp(&score.1) {
            std::cmp::Ordering::Greater => Momentum::Home,
            std::cmp::Ordering::Less => Momentum::Away,
            std::cmp::Ordering::Equal => Momentum::Level,
        },
    };

    let comeback_likelihood = comeback
        .as_deref()
        .and_then(Confidence::parse)
        .unwrap_or(if score.0 == score.1 {
            Confidence::Low
        } else {
            Confidence::Medium
        });

    Ok(HalfTimePrediction {
        prediction,
        half_time_score: score,
        momentum,
        comeback_likelihood,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawPrediction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_snake_case_probabilities_are_verbatim() {
        let p = normalize_prediction(
            raw(json!({
                "home_team": "Arsenal",
                "away_team": "Chelsea",
                "home_win_prob": 0.5,
                "draw_prob": 0.3,
                "away_win_prob": 0.2,
                "predicted_score": "2-1",
                "confidence": "high",
                "model_used": "Real ML Model (75.7% accuracy)"
            })),
            "Arsenal",
            "Chelsea",
            None,
        )
        .unwrap();

        assert_eq!(p.home_win_probability, 0.5);
        assert_eq!(p.draw_probability, 0.3);
        assert_eq!(p.away_win_probability, 0.2);
        assert_eq!(p.predicted_score, "2-1");
        assert_eq!(p.confidence, Confidence::High);
        assert_eq!(p.home_team.short_name, "ARS");
    }

    #[test]
    fn test_camel_case_shape_with_team_objects() {
        let p = normalize_prediction(
            raw(json!({
                "homeTeam": {"id": 57, "name": "Arsenal FC", "shortName": "Arsenal", "crest": ""},
                "awayTeam": {"name": "Chelsea FC"},
                "homeWinProbability": 0.41,
                "drawProbability": 0.27,
                "awayWinProbability": 0.32,
                "predictedScore": "1-1",
                "keyFactors": ["Home advantage"]
            })),
            "Arsenal",
            "Chelsea",
            Some("2024-04-01"),
        )
        .unwrap();

        assert_eq!(p.home_team.id, 57);
        assert_eq!(p.home_team.crest, "⚽");
        assert_eq!(p.away_team.short_name, "CHE");
        assert_eq!(p.date.as_deref(), Some("2024-04-01"));
        assert_eq!(p.key_factors, vec!["Home advantage".to_string()]);
        assert_eq!(p.confidence, Confidence::Medium);
    }

    #[test]
    fn test_nested_probabilities_and_goal_counts() {
        let p = normalize_prediction(
            raw(json!({
                "probabilities": {"home_win": 0.6, "draw": 0.25, "away_win": 0.15},
                "homeGoals": 2.2,
                "awayGoals": 0.8,
                "confidence": 78
            })),
            "Liverpool",
            "Everton",
            None,
        )
        .unwrap();

        assert_eq!(p.home_team.name, "Liverpool");
        assert_eq!(p.predicted_score, "2-1");
        assert_eq!(p.confidence, Confidence::High);
    }

    #[test]
    fn test_unnormalized_probabilities_are_not_corrected() {
        let p = normalize_prediction(
            raw(json!({"home_win_prob": 0.7, "draw_prob": 0.3, "away_win_prob": 0.3})),
            "A",
            "B",
            None,
        )
        .unwrap();
        assert!((p.probability_sum() - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_missing_probabilities_is_decode_error() {
        let err = normalize_prediction(
            raw(json!({"outcome": "Home Win", "confidence": 70})),
            "A",
            "B",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_error_field_is_backend_error() {
        let err = normalize_prediction(
            raw(json!({"error": "Unknown team: Wrexham", "model_loaded": false})),
            "Wrexham",
            "B",
            None,
        )
        .unwrap_err();
        match err {
            ApiError::Backend(msg) => assert_eq!(msg, "Unknown team: Wrexham"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_half_time_reads_momentum_or_derives_it() {
        let ht = normalize_half_time(
            raw(json!({
                "homeWinProbability": 0.2,
                "drawProbability": 0.3,
                "awayWinProbability": 0.5,
                "finalScore": "1-2",
                "momentum": "away",
                "comebackLikelihood": "high"
            })),
            "A",
            "B",
            (1, 1),
        )
        .unwrap();
        assert_eq!(ht.momentum, Momentum::Away);
        assert_eq!(ht.comeback_likelihood, Confidence::High);
        assert_eq!(ht.prediction.predicted_score, "1-2");

        let ht = normalize_half_time(
            raw(json!({"home_win_prob": 0.7, "draw_prob": 0.2, "away_win_prob": 0.1})),
            "A",
            "B",
            (2, 0),
        )
        .unwrap();
        assert_eq!(ht.momentum, Momentum::Home);
        assert_eq!(ht.comeback_likelihood, Confidence::Medium);
    }
}
