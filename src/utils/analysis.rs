use crate::models::{Fixture, SplitRecord, TeamAnalysis};

const FORM_LENGTH: usize = 5;

/// Build a season summary for `team` from finished fixtures.
/// Team names match case-insensitively against full or short names.
pub fn analyze_team(team: &str, fixtures: &[Fixture]) -> TeamAnalysis {
    let wanted = team.trim().to_lowercase();
    let matches_team = |name: &str, short: &str| {
        name.to_lowercase() == wanted || (!short.is_empty() && short.to_lowercase() == wanted)
    };

    let mut played: Vec<(&Fixture, bool, u32, u32)> = fixtures
        .iter()
        .filter_map(|fixture| {
            let (home_goals, away_goals) = fixture.final_score()?;
            if matches_team(&fixture.home_team.name, &fixture.home_team.short_name) {
                Some((fixture, true, home_goals, away_goals))
            } else if matches_team(&fixture.away_team.name, &fixture.away_team.short_name) {
                Some((fixture, false, away_goals, home_goals))
            } else {
                None
            }
        })
        .collect();

    // Most recent first; RFC 3339 dates sort lexically
    played.sort_by(|a, b| b.0.date.cmp(&a.0.date));

    let mut home = SplitRecord::default();
    let mut away = SplitRecord::default();
    let mut form = Vec::new();

    for (_, at_home, scored, conceded) in &played {
        let split = if *at_home { &mut home } else { &mut away };
        split.played += 1;
        split.goals_for += scored;
        split.goals_against += conceded;

        let result = match scored.cmp(conceded) {
            std::cmp::Ordering::Greater => {
                split.wins += 1;
                'W'
            }
            std::cmp::Ordering::Equal => {
                split.draws += 1;
                'D'
            }
            std::cmp::Ordering::Less => {
                split.losses += 1;
                'L'
            }
        };

        if form.len() < FORM_LENGTH {
            form.push(result);
        }
    }

    let display_name = played
        .first()
        .map(|(fixture, at_home, _, _)| {
            if *at_home {
                fixture.home_team.name.clone()
            } else {
                fixture.away_team.name.clone()
            }
        })
        .unwrap_or_else(|| team.trim().to_string());

    TeamAnalysis {
        team: display_name,
        played: home.played + away.played,
        wins: home.wins + away.wins,
        draws: home.draws + away.draws,
        losses: home.losses + away.losses,
        goals_for: home.goals_for + away.goals_for,
        goals_against: home.goals_against + away.goals_against,
        form,
        home,
        away,
    }
}
