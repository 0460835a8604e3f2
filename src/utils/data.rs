use crate::api::Provenance;
use crate::models::MatchPrediction;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Save any serializable data to a JSON cache file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: &str) -> Result<()> {
    if let Some(parent) = Path::new(cache_file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    std::fs::write(cache_file, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load data from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: &str) -> Result<T> {
    let json = std::fs::read_to_string(cache_file).context("Failed to read cache file")?;
    let data = serde_json::from_str(&json).context("Failed to deserialize cache data")?;
    Ok(data)
}

#[derive(Debug, Serialize)]
struct PredictionRow<'a> {
    #[serde(rename = "Home Team")]
    home_team: &'a str,
    #[serde(rename = "Away Team")]
    away_team: &'a str,
    #[serde(rename = "Home Win (%)")]
    home_win: String,
    #[serde(rename = "Draw (%)")]
    draw: String,
    #[serde(rename = "Away Win (%)")]
    away_win: String,
    #[serde(rename = "Predicted Score")]
    predicted_score: &'a str,
    #[serde(rename = "Confidence")]
    confidence: &'a str,
    #[serde(rename = "Source")]
    provenance: &'a str,
}

/// Save predictions to CSV, one row per match, with their provenance
pub fn save_predictions_to_csv(
    predictions: &[(MatchPrediction, Provenance)],
    filename: &str,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    for (prediction, provenance) in predictions {
        writer.serialize(PredictionRow {
            home_team: &prediction.home_team.name,
            away_team: &prediction.away_team.name,
            home_win: format!("{:.1}", prediction.home_win_probability * 100.0),
            draw: format!("{:.1}", prediction.draw_probability * 100.0),
            away_win: format!("{:.1}", prediction.away_win_probability * 100.0),
            predicted_score: &prediction.predicted_score,
            confidence: prediction.confidence.as_str(),
            provenance: provenance.as_str(),
        })?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}
