use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scoresight::api::auth::{auth_failure_message, AuthAction};
use scoresight::api::chat::ChatTurn;
use scoresight::api::news::DEFAULT_NEWS_LIMIT;
use scoresight::api::teams::upcoming;
use scoresight::config::Config;
use scoresight::data::{load_from_cache, save_predictions_to_csv, save_to_cache};
use scoresight::store::FileStore;
use scoresight::{
    ApiError, BlogDraft, BlogShelf, ChatWidget, Fixture, HalfTimeRequest, MatchPrediction,
    MatchStats, Outcome, PredictEndpoint, PredictionRequest, Predictor, ScoreSightClient,
    SessionManager,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const FIXTURES_CACHE_FILE: &str = "cache/fixtures_cache.json";

#[derive(Parser)]
#[command(name = "scoresight", about = "EPL match predictions from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the result of a match
    Predict {
        home: String,
        away: String,
        /// simple, detailed or ai-fixed (defaults to SCORESIGHT_PREDICT_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// JSON file with match statistics for the detailed endpoint
        #[arg(long)]
        stats: Option<String>,
        /// Also write the prediction to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Predict the final result from a half-time score
    HalfTime {
        home: String,
        away: String,
        home_score: u32,
        away_score: u32,
    },
    /// List Premier League teams
    Teams,
    /// List fixtures and results
    Fixtures {
        /// Only show matches that have not been played
        #[arg(long)]
        upcoming: bool,
    },
    /// Predict every upcoming fixture
    Upcoming {
        #[arg(long)]
        csv: Option<String>,
    },
    /// Season summary for one team
    Analyze { team: String },
    /// Latest headlines
    News {
        #[arg(long, default_value_t = DEFAULT_NEWS_LIMIT)]
        limit: u32,
    },
    /// Ask the assistant; starts an interactive session without a message
    Chat { message: Option<String> },
    Login { email: String, password: String },
    Signup {
        email: String,
        password: String,
        first_name: String,
        last_name: String,
    },
    Logout,
    /// Show the signed-in user and their prediction stats
    Whoami,
    /// Manage your blog posts
    Posts {
        #[command(subcommand)]
        action: Option<PostAction>,
    },
}

#[derive(Subcommand)]
enum PostAction {
    Publish {
        title: String,
        content: String,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let client = ScoreSightClient::from_config(&config)?;
    let store = Arc::new(
        FileStore::open(&config.store_path)
            .with_context(|| format!("Failed to open session store {}", config.store_path))?,
    );
    let mut session = SessionManager::new(client.clone(), store.clone());
    session.bootstrap().await;

    match cli.command {
        Command::Predict {
            home,
            away,
            endpoint,
            date,
            stats,
            csv,
        } => {
            let endpoint: PredictEndpoint = match endpoint {
                Some(name) => name.parse()?,
                None => config.predict_endpoint,
            };
            let mut request = PredictionRequest::new(home, away);
            if let Some(date) = date {
                request = request.with_date(date);
            }
            if let Some(path) = stats {
                let stats: MatchStats = load_from_cache(&path)
                    .with_context(|| format!("Failed to read match stats from {}", path))?;
                request = request.with_stats(stats);
            }

            let predictor = Predictor::new(client, endpoint);
            let (_, outcome) = predictor.predict(&request, session.token()).await;
            let prediction = settle(outcome)?;

            if session.is_authenticated() {
                session.record_prediction(&request.home_team)?;
            }
            if let Some(path) = csv {
                save_predictions_to_csv(&[prediction.clone()], &path)?;
                println!("\nSaved prediction to {}", path);
            }
        }
        Command::HalfTime {
            home,
            away,
            home_score,
            away_score,
        } => {
            let predictor = Predictor::new(client, config.predict_endpoint);
            let request = HalfTimeRequest::new(home, away, home_score, away_score);
            let (_, outcome) = predictor.predict_half_time(&request).await;
            let provenance = outcome.provenance();
            match outcome {
                Outcome::Failed(e) => bail!(e.user_message()),
                other => {
                    if let (Some(half_time), Some(provenance)) = (other.value(), provenance) {
                        println!(
                            "Half-time {}-{} [{}]",
                            half_time.half_time_score.0,
                            half_time.half_time_score.1,
                            provenance.as_str()
                        );
                        print_prediction(&half_time.prediction);
                        println!("  Momentum: {:?}", half_time.momentum);
                        println!(
                            "  Comeback likelihood: {}",
                            half_time.comeback_likelihood.as_str()
                        );
                    }
                }
            }
        }
        Command::Teams => {
            let outcome = client.teams().await;
            print_source("Teams", &outcome);
            for team in outcome.into_value().unwrap_or_default() {
                println!("  {} {} ({})", team.crest, team.name, team.short_name);
            }
        }
        Command::Fixtures { upcoming: only_upcoming } => {
            let fixtures = load_fixtures(&client).await?;
            let shown: Vec<&Fixture> = if only_upcoming {
                upcoming(&fixtures)
            } else {
                fixtures.iter().collect()
            };
            if shown.is_empty() {
                println!("No fixtures found.");
            }
            for fixture in shown {
                print_fixture(fixture);
            }
        }
        Command::Upcoming { csv } => {
            let fixtures = load_fixtures(&client).await?;
            let predictor = Predictor::new(client, config.predict_endpoint);
            let mut rows = Vec::new();
            for (i, fixture) in upcoming(&fixtures).into_iter().enumerate() {
                let request =
                    PredictionRequest::new(&fixture.home_team.name, &fixture.away_team.name)
                        .with_date(fixture.date.clone());
                let (_, outcome) = predictor.predict(&request, session.token()).await;
                print!("{}. ", i + 1);
                match settle(outcome) {
                    Ok(row) => rows.push(row),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            if let Some(path) = csv {
                if !rows.is_empty() {
                    save_predictions_to_csv(&rows, &path)?;
                    println!("\nSaved {} predictions to {}", rows.len(), path);
                }
            }
        }
        Command::Analyze { team } => {
            let outcome = client.team_analysis(&team).await;
            print_source("Analysis", &outcome);
            match outcome {
                Outcome::Failed(e) => bail!(e.user_message()),
                other => {
                    if let Some(analysis) = other.into_value() {
                        println!("{}", analysis.team);
                        println!(
                            "  P{} W{} D{} L{}  GF{} GA{} GD{:+}  Pts {}",
                            analysis.played,
                            analysis.wins,
                            analysis.draws,
                            analysis.losses,
                            analysis.goals_for,
                            analysis.goals_against,
                            analysis.goal_difference(),
                            analysis.points()
                        );
                        println!("  Form: {}", analysis.form_string());
                        println!(
                            "  Home: W{} D{} L{}   Away: W{} D{} L{}",
                            analysis.home.wins,
                            analysis.home.draws,
                            analysis.home.losses,
                            analysis.away.wins,
                            analysis.away.draws,
                            analysis.away.losses
                        );
                    }
                }
            }
        }
        Command::News { limit } => {
            let outcome = client.news(limit).await;
            print_source("News", &outcome);
            let shelf = BlogShelf::new(store.clone());
            let saved = shelf.saved_articles()?;
            for article in outcome.into_value().unwrap_or_default() {
                let marker = if saved.contains(&article.id) { "*" } else { " " };
                println!("{} [{:?}] {} ({})", marker, article.category, article.title, article.source);
                println!("    {}", article.excerpt);
            }
        }
        Command::Chat { message } => {
            let mut chat = ChatWidget::new(client);
            match message {
                Some(message) => {
                    let turn = chat.send(&message, session.token()).await?;
                    print_turn(&turn);
                }
                None => {
                    println!("{}", chat.messages()[0].content);
                    println!("(type 'exit' to quit, 'clear' to start over)\n");
                    let mut lines = BufReader::new(tokio::io::stdin()).lines();
                    while let Some(line) = lines.next_line().await? {
                        match line.trim() {
                            "exit" | "quit" => break,
                            "clear" => {
                                chat.clear();
                                println!("{}", chat.messages()[0].content);
                            }
                            text => match chat.send(text, session.token()).await {
                                Ok(turn) => print_turn(&turn),
                                Err(ApiError::Validation(_)) => continue,
                                Err(e) => return Err(e.into()),
                            },
                        }
                    }
                }
            }
        }
        Command::Login { email, password } => match session.login(&email, &password).await {
            Ok(user) => println!("Welcome back, {}!", user.display_name()),
            Err(e) => bail!(auth_failure_message(AuthAction::Login, &e)),
        },
        Command::Signup {
            email,
            password,
            first_name,
            last_name,
        } => match session
            .signup(&email, &password, &first_name, &last_name)
            .await
        {
            Ok(user) => println!("Welcome to ScoreSight, {}!", user.display_name()),
            Err(e) => bail!(auth_failure_message(AuthAction::Signup, &e)),
        },
        Command::Logout => {
            session.logout().await?;
            println!("Logged out.");
        }
        Command::Whoami => match session.user() {
            Some(user) => {
                let stats = session.stats()?;
                println!("{} <{}>", user.display_name(), user.email);
                println!(
                    "  Predictions: {}  Correct: {}  Accuracy: {:.1}%",
                    stats.predictions_made,
                    stats.correct_predictions,
                    stats.accuracy() * 100.0
                );
                if let Some(team) = stats.favorite_team {
                    println!("  Favourite team: {}", team);
                }
            }
            None => println!("Not logged in."),
        },
        Command::Posts { action } => {
            let shelf = BlogShelf::new(store.clone());
            match action {
                None => {
                    let posts = shelf.posts()?;
                    if posts.is_empty() {
                        println!("No posts yet.");
                    }
                    for post in posts {
                        println!("{}  {} by {}", post.id, post.title, post.author.name);
                        println!("    {}", post.excerpt);
                    }
                }
                Some(PostAction::Publish {
                    title,
                    content,
                    excerpt,
                    tags,
                }) => {
                    let Some(user) = session.user() else {
                        bail!("Please log in to publish a post");
                    };
                    let post = shelf
                        .publish(
                            BlogDraft {
                                title,
                                content,
                                excerpt,
                                tags,
                            },
                            user,
                        )
                        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
                    println!("Published {}", post.id);
                }
                Some(PostAction::Delete { id }) => {
                    if shelf.delete(&id)? {
                        println!("Deleted {}", id);
                    } else {
                        println!("No post with id {}", id);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print a prediction outcome and hand back the value with its provenance
fn settle(
    outcome: Outcome<MatchPrediction>,
) -> Result<(MatchPrediction, scoresight::Provenance)> {
    let provenance = outcome.provenance();
    if let Outcome::Fallback { reason, .. } = &outcome {
        println!("(offline estimate: {})", reason);
    }
    match (outcome, provenance) {
        (Outcome::Failed(e), _) => bail!(e.user_message()),
        (other, Some(provenance)) => {
            let Some(prediction) = other.into_value() else {
                bail!("prediction missing");
            };
            println!("[{}]", provenance.as_str());
            print_prediction(&prediction);
            Ok((prediction, provenance))
        }
        (_, None) => bail!("prediction missing"),
    }
}

fn print_prediction(prediction: &MatchPrediction) {
    println!(
        "{} vs {}",
        prediction.home_team.name, prediction.away_team.name
    );
    println!(
        "  Home {:.1}%  Draw {:.1}%  Away {:.1}%",
        prediction.home_win_probability * 100.0,
        prediction.draw_probability * 100.0,
        prediction.away_win_probability * 100.0
    );
    println!(
        "  Predicted score: {}  ({}, {} confidence)",
        prediction.predicted_score,
        prediction.most_likely_outcome(),
        prediction.confidence.as_str()
    );
    for factor in &prediction.key_factors {
        println!("  - {}", factor);
    }
    if let Some(explanation) = &prediction.explanation {
        println!("  {}", explanation);
    }
}

fn print_fixture(fixture: &Fixture) {
    let score = match fixture.final_score() {
        Some((home, away)) => format!("{}-{}", home, away),
        None => "vs".to_string(),
    };
    println!(
        "  {}  {} {} {}  [{}]",
        fixture.date, fixture.home_team.name, score, fixture.away_team.name, fixture.status
    );
}

fn print_source<T>(label: &str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Live(_) => println!("{} (live)\n", label),
        Outcome::Fallback { reason, .. } => println!("{} (sample data: {})\n", label, reason),
        Outcome::Failed(e) => eprintln!("{} unavailable: {}\n", label, e.user_message()),
    }
}

fn print_turn(turn: &ChatTurn) {
    let message = turn.message();
    match turn {
        ChatTurn::Reply(_) => {
            let source = message.source.as_deref().unwrap_or("assistant");
            println!("[{}] {}\n", source, message.content);
        }
        ChatTurn::Failed { .. } => println!("! {}\n", message.content),
    }
}

/// Fixtures from the backend, or from the local cache when USE_CACHE=1
async fn load_fixtures(client: &ScoreSightClient) -> Result<Vec<Fixture>> {
    let use_cache = std::env::var("USE_CACHE").unwrap_or_default() == "1";
    if use_cache && Path::new(FIXTURES_CACHE_FILE).exists() {
        println!("Loading fixtures from cache file: {}\n", FIXTURES_CACHE_FILE);
        return load_from_cache(FIXTURES_CACHE_FILE);
    }

    let outcome = client.fixtures().await;
    print_source("Fixtures", &outcome);
    let live = outcome.is_live();
    let fixtures = match outcome {
        Outcome::Failed(e) => bail!(e.user_message()),
        other => other.into_value().unwrap_or_default(),
    };
    if live {
        save_to_cache(&fixtures, FIXTURES_CACHE_FILE)?;
    }
    Ok(fixtures)
}
