use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Premier League club
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub crest: String, // emoji placeholder or image URL
}

impl Team {
    /// Build a team from a bare name, as the prediction endpoints only echo names back
    pub fn from_name(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            short_name: short_name_for(name),
            crest: "⚽".to_string(),
        }
    }
}

/// Three letter abbreviation used when the backend does not send one
pub fn short_name_for(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

/// Either the football-data shape (`fullTime.home`) or a flat `home`/`away` pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureScore {
    #[serde(default, rename = "fullTime", skip_serializing_if = "Option::is_none")]
    pub full_time: Option<ScoreLine>,
    #[serde(default)]
    pub home: Option<u32>,
    #[serde(default)]
    pub away: Option<u32>,
}

/// A scheduled or finished match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: u64,
    pub home_team: Team,
    pub away_team: Team,
    pub date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub score: Option<FixtureScore>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub matchday: Option<u32>,
}

impl Fixture {
    /// Final score, if the match has been played
    pub fn final_score(&self) -> Option<(u32, u32)> {
        let score = self.score.as_ref()?;
        if let Some(ScoreLine {
            home: Some(home),
            away: Some(away),
        }) = score.full_time
        {
            return Some((home, away));
        }
        Some((score.home?, score.away?))
    }
}

/// Qualitative confidence label attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Derive a label from how skewed the outcome probabilities are
    pub fn from_probabilities(home: f64, away: f64) -> Self {
        let favourite = home.max(away);
        if favourite > 0.55 {
            Confidence::High
        } else if favourite > 0.40 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Map a numeric confidence (either 0-1 or 0-100) to a label
    pub fn from_score(score: f64) -> Self {
        let pct = if score <= 1.0 { score * 100.0 } else { score };
        if pct >= 65.0 {
            Confidence::High
        } else if pct >= 45.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Canonical pre-match prediction, whatever shape the backend sent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPrediction {
    pub home_team: Team,
    pub away_team: Team,
    pub date: Option<String>,
    pub home_win_probability: f64,
    pub draw_probability: f64,
    pub away_win_probability: f64,
    pub predicted_score: String,
    pub confidence: Confidence,
    pub key_factors: Vec<String>,
    pub explanation: Option<String>,
    pub model_used: Option<String>,
}

impl MatchPrediction {
    pub fn probability_sum(&self) -> f64 {
        self.home_win_probability + self.draw_probability + self.away_win_probability
    }

    /// "Home Win", "Draw" or "Away Win", whichever is most likely
    pub fn most_likely_outcome(&self) -> &'static str {
        if self.home_win_probability >= self.draw_probability
            && self.home_win_probability >= self.away_win_probability
        {
            "Home Win"
        } else if self.away_win_probability >= self.draw_probability {
            "Away Win"
        } else {
            "Draw"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Home,
    Away,
    Level,
}

/// Prediction made with the first-half score known
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalfTimePrediction {
    pub prediction: MatchPrediction,
    pub half_time_score: (u32, u32),
    pub momentum: Momentum,
    pub comeback_likelihood: Confidence,
}

/// Optional in-match statistics sent to the detailed prediction endpoint.
/// Field names follow the backend's short column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchStats {
    #[serde(rename = "hs")]
    pub home_shots: u32,
    #[serde(rename = "as")]
    pub away_shots: u32,
    #[serde(rename = "hst")]
    pub home_shots_on_target: u32,
    #[serde(rename = "ast")]
    pub away_shots_on_target: u32,
    #[serde(rename = "hc")]
    pub home_corners: u32,
    #[serde(rename = "ac")]
    pub away_corners: u32,
    #[serde(rename = "hf")]
    pub home_fouls: u32,
    #[serde(rename = "af")]
    pub away_fouls: u32,
    #[serde(rename = "hy")]
    pub home_yellow_cards: u32,
    #[serde(rename = "ay")]
    pub away_yellow_cards: u32,
    #[serde(rename = "hr")]
    pub home_red_cards: u32,
    #[serde(rename = "ar")]
    pub away_red_cards: u32,
    #[serde(rename = "fthg")]
    pub home_score: u32,
    #[serde(rename = "ftag")]
    pub away_score: u32,
    pub home_possession: f64,
    pub away_possession: f64,
    pub home_pass_accuracy: f64,
    pub away_pass_accuracy: f64,
}

/// Authenticated user, as persisted in the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub token: String,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Per-user prediction stats cached client side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub predictions_made: u32,
    pub correct_predictions: u32,
    pub favorite_team: Option<String>,
}

impl UserStats {
    /// Accuracy as a fraction between 0 and 1
    pub fn accuracy(&self) -> f64 {
        if self.predictions_made == 0 {
            0.0
        } else {
            self.correct_predictions as f64 / self.predictions_made as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: u64,
    pub content: String,
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>, // e.g. "ml_model", "team_analyzer"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Transfer,
    Injury,
    Match,
    General,
    Analysis,
}

impl NewsCategory {
    /// Guess a category from headline keywords
    pub fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| title.contains(w));

        if has(&["transfer", "sign", "deal"]) {
            NewsCategory::Transfer
        } else if has(&["injur", "fit", "recover"]) {
            NewsCategory::Injury
        } else if has(&["match", "fixture", "vs", "v "]) {
            NewsCategory::Match
        } else if has(&["analysis", "tactic", "stats"]) {
            NewsCategory::Analysis
        } else {
            NewsCategory::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    News,
    UserBlog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub published_at: String,
    pub source: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub category: NewsCategory,
    #[serde(rename = "type")]
    pub kind: ArticleKind,
    pub likes: u32,
    pub comments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogAuthor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A user-authored post, cached locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: BlogAuthor,
    pub published_at: String,
    pub tags: Vec<String>,
    pub likes: u32,
    pub comments: u32,
    pub is_published: bool,
}

/// Win/draw/loss record for one venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub form: Vec<char>, // last five results, most recent first
    pub home: SplitRecord,
    pub away: SplitRecord,
}

impl TeamAnalysis {
    pub fn points(&self) -> u32 {
        self.wins * 3 + self.draws
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    pub fn form_string(&self) -> String {
        self.form.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_probabilities() {
        assert_eq!(Confidence::from_probabilities(0.6, 0.2), Confidence::High);
        assert_eq!(Confidence::from_probabilities(0.2, 0.56), Confidence::High);
        assert_eq!(Confidence::from_probabilities(0.45, 0.3), Confidence::Medium);
        assert_eq!(Confidence::from_probabilities(0.35, 0.35), Confidence::Low);
    }

    #[test]
    fn test_confidence_from_score_accepts_percent_and_fraction() {
        assert_eq!(Confidence::from_score(72.0), Confidence::High);
        assert_eq!(Confidence::from_score(0.72), Confidence::High);
        assert_eq!(Confidence::from_score(50.0), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.3), Confidence::Low);
    }

    #[test]
    fn test_news_category_from_title() {
        assert_eq!(
            NewsCategory::from_title("Arsenal close in on January signing"),
            NewsCategory::Transfer
        );
        assert_eq!(
            NewsCategory::from_title("Haaland fit for Manchester derby"),
            NewsCategory::Injury
        );
        assert_eq!(
            NewsCategory::from_title("Liverpool vs Chelsea preview"),
            NewsCategory::Match
        );
        assert_eq!(
            NewsCategory::from_title("Tactical analysis of the title race"),
            NewsCategory::Analysis
        );
        assert_eq!(NewsCategory::from_title("Club unveils new kit"), NewsCategory::General);
    }

    #[test]
    fn test_short_name_for() {
        assert_eq!(short_name_for("Liverpool"), "LIV");
        assert_eq!(short_name_for("A.F.C. Bournemouth"), "AFC");
    }

    #[test]
    fn test_user_stats_accuracy() {
        let stats = UserStats {
            predictions_made: 4,
            correct_predictions: 3,
            favorite_team: None,
        };
        assert!((stats.accuracy() - 0.75).abs() < f64::EPSILON);
        assert_eq!(UserStats::default().accuracy(), 0.0);
    }

    #[test]
    fn test_match_stats_use_short_keys() {
        let stats = MatchStats {
            home_shots: 12,
            away_corners: 4,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hs"], 12);
        assert_eq!(json["ac"], 4);
        assert!(json.get("home_possession").is_some());
    }

    #[test]
    fn test_partial_match_stats_fill_in_zeroes() {
        let stats: MatchStats = serde_json::from_str(r#"{"hs": 10, "as": 4}"#).unwrap();
        assert_eq!(stats.home_shots, 10);
        assert_eq!(stats.away_shots, 4);
        assert_eq!(stats.home_shots_on_target, 0);
        assert_eq!(stats.home_possession, 0.0);
    }
}
