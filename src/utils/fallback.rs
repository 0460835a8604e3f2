//! Placeholder data shown when the backend cannot be reached.
//!
//! None of this is a model. It only has to look plausible and keep the
//! probability triple well formed.

use crate::models::{
    ArticleKind, Confidence, Fixture, FixtureScore, HalfTimePrediction, MatchPrediction, Momentum,
    NewsArticle, NewsCategory, ScoreLine, Team,
};
use chrono::{Duration, Utc};
use rand::Rng;

const PREMATCH_FACTORS: [&str; 4] = [
    "Home advantage",
    "Recent form",
    "Head-to-head record",
    "Goal scoring rate",
];

const HALF_TIME_FACTORS: [&str; 4] = [
    "Current score advantage",
    "Shots on target ratio",
    "Possession dominance",
    "Disciplinary record",
];

/// Synthesize a pre-match prediction.
///
/// Home win is drawn from [0.2, 0.8), draw from [0, 0.3) capped so the
/// remainder stays non-negative, and away takes whatever is left.
pub fn synthesize_prediction<R: Rng + ?Sized>(
    rng: &mut R,
    home_team: &str,
    away_team: &str,
    date: Option<&str>,
) -> MatchPrediction {
    let home = rng.gen_range(0.2..0.8);
    let draw_cap = 0.3_f64.min(1.0 - home);
    let draw = if draw_cap > 0.0 {
        rng.gen_range(0.0..draw_cap)
    } else {
        0.0
    };
    let away = (1.0 - home - draw).max(0.0);

    let confidence = if home > 0.55 || away > 0.55 {
        Confidence::High
    } else {
        Confidence::Medium
    };

    MatchPrediction {
        home_team: Team::from_name(home_team),
        away_team: Team::from_name(away_team),
        date: date.map(str::to_string),
        home_win_probability: home,
        draw_probability: draw,
        away_win_probability: away,
        predicted_score: score_for(home, draw, away),
        confidence,
        key_factors: PREMATCH_FACTORS.iter().map(|f| f.to_string()).collect(),
        explanation: None,
        model_used: None,
    }
}

/// Synthesize a prediction from the half-time score.
///
/// Shifts a 0.45/0.25/0.30 base by a tenth per goal of lead, clamps each
/// value to [0.1, 0.9], then renormalizes so the triple sums to one.
pub fn synthesize_half_time(
    home_team: &str,
    away_team: &str,
    home_goals: u32,
    away_goals: u32,
) -> HalfTimePrediction {
    let lead = home_goals as f64 - away_goals as f64;
    let home = (0.45 + lead * 0.1).clamp(0.1, 0.9);
    let draw = 0.25_f64.clamp(0.1, 0.9);
    let away = (0.30 - lead * 0.1).clamp(0.1, 0.9);
    let total = home + draw + away;

    let (home, draw, away) = (home / total, draw / total, away / total);

    let momentum = match home_goals.cmp(&away_goals) {
        std::cmp::Ordering::Greater => Momentum::Home,
        std::cmp::Ordering::Less => Momentum::Away,
        std::cmp::Ordering::Equal => Momentum::Level,
    };

    // The leader scores once more; a level game goes to the home side
    let predicted_score = match momentum {
        Momentum::Away => format!("{}-{}", home_goals, away_goals + 1),
        _ => format!("{}-{}", home_goals + 1, away_goals),
    };

    let explanation = match momentum {
        Momentum::Home => "Based on first-half performance, the home team have the momentum.",
        Momentum::Away => "Based on first-half performance, the away team have the momentum.",
        Momentum::Level => "Based on first-half performance, both teams have the momentum.",
    };

    HalfTimePrediction {
        prediction: MatchPrediction {
            home_team: Team::from_name(home_team),
            away_team: Team::from_name(away_team),
            date: None,
            home_win_probability: home,
            draw_probability: draw,
            away_win_probability: away,
            predicted_score,
            confidence: Confidence::from_probabilities(home, away),
            key_factors: HALF_TIME_FACTORS.iter().map(|f| f.to_string()).collect(),
            explanation: Some(explanation.to_string()),
            model_used: None,
        },
        half_time_score: (home_goals, away_goals),
        momentum,
        comeback_likelihood: if momentum == Momentum::Level {
            Confidence::Low
        } else {
            Confidence::Medium
        },
    }
}

fn score_for(home: f64, draw: f64, away: f64) -> String {
    if draw >= home && draw >= away {
        "1-1".to_string()
    } else if home >= away {
        if home > 0.6 {
            "2-0".to_string()
        } else {
            "2-1".to_string()
        }
    } else if away > 0.6 {
        "0-2".to_string()
    } else {
        "1-2".to_string()
    }
}

/// Demo clubs used when the teams endpoint is down
pub fn sample_teams() -> Vec<Team> {
    [
        (1, "Manchester City", "MCI"),
        (2, "Liverpool", "LIV"),
        (3, "Arsenal", "ARS"),
        (4, "Chelsea", "CHE"),
        (5, "Manchester United", "MUN"),
        (6, "Tottenham", "TOT"),
    ]
    .into_iter()
    .map(|(id, name, short)| Team {
        id,
        name: name.to_string(),
        short_name: short.to_string(),
        crest: "⚽".to_string(),
    })
    .collect()
}

/// A handful of finished and upcoming fixtures between the sample clubs
pub fn sample_fixtures() -> Vec<Fixture> {
    let teams = sample_teams();
    let now = Utc::now();
    let finished = [(0, 1, 2, 1), (2, 3, 1, 1), (4, 5, 0, 2), (1, 2, 3, 0), (3, 0, 1, 2)];
    let upcoming = [(0, 2), (1, 4), (5, 3)];

    let mut fixtures = Vec::new();
    for (i, (h, a, hg, ag)) in finished.into_iter().enumerate() {
        fixtures.push(Fixture {
            id: 100 + i as u64,
            home_team: teams[h].clone(),
            away_team: teams[a].clone(),
            date: (now - Duration::days(7 * (finished.len() - i) as i64)).to_rfc3339(),
            status: "FINISHED".to_string(),
            score: Some(FixtureScore {
                full_time: Some(ScoreLine {
                    home: Some(hg),
                    away: Some(ag),
                }),
                home: None,
                away: None,
            }),
            venue: Some("Premier League".to_string()),
            matchday: Some(i as u32 + 1),
        });
    }
    for (i, (h, a)) in upcoming.into_iter().enumerate() {
        fixtures.push(Fixture {
            id: 200 + i as u64,
            home_team: teams[h].clone(),
            away_team: teams[a].clone(),
            date: (now + Duration::days(i as i64 + 1)).to_rfc3339(),
            status: "SCHEDULED".to_string(),
            score: None,
            venue: Some("Premier League".to_string()),
            matchday: Some(finished.len() as u32 + 1),
        });
    }
    fixtures
}

/// Headlines shown when the news feed is down
pub fn sample_news() -> Vec<NewsArticle> {
    let now = Utc::now();
    vec![
        NewsArticle {
            id: "1".to_string(),
            title: "Haaland Fit for Manchester Derby".to_string(),
            content: "Erling Haaland has been declared fit for the upcoming Manchester derby..."
                .to_string(),
            excerpt: "Manchester City receive major boost as star striker returns to training"
                .to_string(),
            author: "Premier League News".to_string(),
            published_at: now.to_rfc3339(),
            source: "BBC Sport".to_string(),
            link: None,
            image_url: None,
            category: NewsCategory::Injury,
            kind: ArticleKind::News,
            likes: 142,
            comments: 23,
        },
        NewsArticle {
            id: "2".to_string(),
            title: "Arsenal Close in on January Signing".to_string(),
            content: "Arsenal are reportedly close to completing a deal for...".to_string(),
            excerpt: "Gunners set to strengthen squad in January transfer window".to_string(),
            author: "Transfer News".to_string(),
            published_at: (now - Duration::hours(2)).to_rfc3339(),
            source: "Sky Sports".to_string(),
            link: None,
            image_url: None,
            category: NewsCategory::Transfer,
            kind: ArticleKind::News,
            likes: 89,
            comments: 45,
        },
    ]
}
