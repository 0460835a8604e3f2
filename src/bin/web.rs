use anyhow::{Context, Result};
use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use scoresight::api::auth::{auth_failure_message, authenticate, register, revoke, AuthAction};
use scoresight::api::news::DEFAULT_NEWS_LIMIT;
use scoresight::config::Config;
use scoresight::fallback::sample_teams;
use scoresight::generation::Latest;
use scoresight::store::{FileStore, SessionStore};
use scoresight::{
    fetch_dashboard, ApiError, BlogDraft, BlogShelf, ChatRole, ChatWidget, DashboardData,
    HalfTimeRequest, MatchPrediction, Outcome, PredictionRequest, Predictor, Provenance,
    ScoreSightClient, SessionManager,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;

const FEATURED_MATCHES: usize = 3;
const HOME_NEWS: u32 = 5;

// Custom filters for formatting
mod filters {
    pub fn format_percent(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.1}%", value * 100.0))
    }

    pub fn format_signed(value: &i64) -> ::askama::Result<String> {
        Ok(format!("{:+}", value))
    }
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

/// Flattened prediction ready for a template
#[derive(Debug, Clone)]
struct PredictionView {
    home: String,
    away: String,
    home_win: f64,
    draw: f64,
    away_win: f64,
    score: String,
    outcome: String,
    confidence: String,
    key_factors: Vec<String>,
    explanation: Option<String>,
    provenance: String,
    reason: Option<String>,
}

impl PredictionView {
    fn new(prediction: &MatchPrediction, provenance: Provenance, reason: Option<String>) -> Self {
        Self {
            home: prediction.home_team.name.clone(),
            away: prediction.away_team.name.clone(),
            home_win: prediction.home_win_probability,
            draw: prediction.draw_probability,
            away_win: prediction.away_win_probability,
            score: prediction.predicted_score.clone(),
            outcome: prediction.most_likely_outcome().to_string(),
            confidence: prediction.confidence.as_str().to_string(),
            key_factors: prediction.key_factors.clone(),
            explanation: prediction.explanation.clone(),
            provenance: provenance.as_str().to_string(),
            reason,
        }
    }
}

/// Value, provenance and fallback reason, or the error to show instead
fn settle<T>(outcome: Outcome<T>) -> Result<(T, Provenance, Option<String>), ApiError> {
    match outcome {
        Outcome::Live(value) => Ok((value, Provenance::Live, None)),
        Outcome::Fallback { value, reason } => {
            Ok((value, Provenance::Fallback, Some(reason.to_string())))
        }
        Outcome::Failed(err) => Err(err),
    }
}

struct FeaturedView {
    date: String,
    home: String,
    away: String,
    prediction: Option<PredictionView>,
    error: Option<String>,
}

struct ResultView {
    date: String,
    home: String,
    away: String,
    score: String,
}

struct ArticleView {
    id: String,
    title: String,
    excerpt: String,
    source: String,
    category: String,
    link: Option<String>,
    saved: bool,
}

struct PostView {
    id: String,
    title: String,
    excerpt: String,
    author: String,
    tags: String,
}

struct MessageView {
    from_user: bool,
    content: String,
    source: Option<String>,
    confidence: Option<String>,
    time: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    active_page: String,
    user: Option<String>,
    fixtures_provenance: String,
    news_provenance: String,
    featured: Vec<FeaturedView>,
    results: Vec<ResultView>,
    headlines: Vec<ArticleView>,
}

#[derive(Template)]
#[template(path = "predict.html")]
struct PredictTemplate {
    active_page: String,
    user: Option<String>,
    teams: Vec<String>,
    home: String,
    away: String,
    result: Option<PredictionView>,
    error: Option<String>,
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "half_time.html")]
struct HalfTimeTemplate {
    active_page: String,
    user: Option<String>,
    teams: Vec<String>,
    home: String,
    away: String,
    home_score: String,
    away_score: String,
    half_time_score: String,
    momentum: String,
    comeback: String,
    result: Option<PredictionView>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "team.html")]
struct TeamTemplate {
    active_page: String,
    user: Option<String>,
    team: String,
    provenance: String,
    played: u32,
    wins: u32,
    draws: u32,
    losses: u32,
    goals_for: u32,
    goals_against: u32,
    goal_difference: i64,
    points: u32,
    form: String,
    home_record: String,
    away_record: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "news.html")]
struct NewsTemplate {
    active_page: String,
    user: Option<String>,
    provenance: String,
    articles: Vec<ArticleView>,
    posts: Vec<PostView>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "chat.html")]
struct ChatTemplate {
    active_page: String,
    user: Option<String>,
    messages: Vec<MessageView>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "account.html")]
struct AccountTemplate {
    active_page: String,
    user: Option<String>,
    email: String,
    predictions_made: u32,
    correct_predictions: u32,
    accuracy: f64,
    favorite_team: String,
    error: Option<String>,
}

struct AppState {
    predictor: Predictor,
    session: RwLock<SessionManager>,
    chat: RwLock<ChatWidget>,
    shelf: BlogShelf,
    dashboard: RwLock<Option<DashboardData>>,
    latest_prediction: RwLock<Latest<PredictionView>>,
}

type SharedState = Arc<AppState>;

impl AppState {
    fn new(client: ScoreSightClient, predictor: Predictor, store: Arc<dyn SessionStore>) -> Self {
        Self {
            predictor,
            session: RwLock::new(SessionManager::new(client.clone(), store.clone())),
            chat: RwLock::new(ChatWidget::new(client)),
            shelf: BlogShelf::new(store),
            dashboard: RwLock::new(None),
            latest_prediction: RwLock::new(Latest::new()),
        }
    }

    async fn user_name(&self) -> Option<String> {
        self.session.read().await.user().map(|u| u.display_name())
    }

    async fn token(&self) -> Option<String> {
        self.session.read().await.token().map(str::to_string)
    }

    /// Backend client and token, copied out so no lock is held over a request
    async fn session_client(&self) -> (ScoreSightClient, Option<String>) {
        let session = self.session.read().await;
        (
            session.client().clone(),
            session.token().map(str::to_string),
        )
    }

    /// Loads the dashboard on first use; later calls reuse it
    async fn dashboard(&self) -> DashboardData {
        if let Some(data) = self.dashboard.read().await.as_ref() {
            return data.clone();
        }
        let token = self.token().await;
        let data =
            fetch_dashboard(&self.predictor, FEATURED_MATCHES, HOME_NEWS, token.as_deref()).await;
        *self.dashboard.write().await = Some(data.clone());
        data
    }

    async fn team_names(&self) -> Vec<String> {
        let cached = self
            .dashboard
            .read()
            .await
            .as_ref()
            .map(|d| d.teams.clone())
            .filter(|teams| !teams.is_empty());
        cached
            .unwrap_or_else(sample_teams)
            .into_iter()
            .map(|t| t.name)
            .collect()
    }
}

fn provenance_label(provenance: Option<Provenance>) -> String {
    provenance.map(|p| p.as_str()).unwrap_or("unavailable").to_string()
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let data = state.dashboard().await;

    let featured = data
        .featured
        .iter()
        .map(|m| FeaturedView {
            date: m.fixture.date.clone(),
            home: m.fixture.home_team.name.clone(),
            away: m.fixture.away_team.name.clone(),
            prediction: match (&m.prediction, m.provenance) {
                (Some(p), Some(provenance)) => Some(PredictionView::new(p, provenance, None)),
                _ => None,
            },
            error: m.error.clone(),
        })
        .collect();

    let results = data
        .fixtures
        .iter()
        .filter_map(|f| {
            f.final_score().map(|(h, a)| ResultView {
                date: f.date.clone(),
                home: f.home_team.name.clone(),
                away: f.away_team.name.clone(),
                score: format!("{} - {}", h, a),
            })
        })
        .take(5)
        .collect();

    let headlines = data
        .news
        .iter()
        .take(3)
        .map(|a| ArticleView {
            id: a.id.clone(),
            title: a.title.clone(),
            excerpt: a.excerpt.clone(),
            source: a.source.clone(),
            category: format!("{:?}", a.category).to_lowercase(),
            link: a.link.clone(),
            saved: false,
        })
        .collect();

    let template = HomeTemplate {
        active_page: "home".to_string(),
        user: state.user_name().await,
        fixtures_provenance: provenance_label(data.fixtures_provenance),
        news_provenance: provenance_label(data.news_provenance),
        featured,
        results,
        headlines,
    };

    HtmlTemplate(template).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct PredictQuery {
    home: Option<String>,
    away: Option<String>,
    date: Option<String>,
}

async fn predict(
    State(state): State<SharedState>,
    Query(query): Query<PredictQuery>,
) -> impl IntoResponse {
    let mut template = PredictTemplate {
        active_page: "predict".to_string(),
        user: state.user_name().await,
        teams: state.team_names().await,
        home: query.home.clone().unwrap_or_default(),
        away: query.away.clone().unwrap_or_default(),
        result: None,
        error: None,
        notice: None,
    };

    // Plain page load, nothing submitted yet
    if query.home.is_none() && query.away.is_none() {
        return HtmlTemplate(template).into_response();
    }

    let mut request = PredictionRequest::new(template.home.clone(), template.away.clone());
    if let Some(date) = query.date.filter(|d| !d.trim().is_empty()) {
        request = request.with_date(date);
    }

    let token = state.token().await;
    let (ticket, outcome) = state.predictor.predict(&request, token.as_deref()).await;

    match settle(outcome) {
        Ok((prediction, provenance, reason)) => {
            let view = PredictionView::new(&prediction, provenance, reason);
            let mut latest = state.latest_prediction.write().await;
            if latest.accept(ticket, view.clone()) {
                template.result = Some(view);
                let session = state.session.read().await;
                // Synthesized predictions do not count towards the user's stats
                if provenance == Provenance::Live && session.is_authenticated() {
                    if let Err(e) = session.record_prediction(&request.home_team) {
                        tracing::warn!("Failed to record prediction: {}", e);
                    }
                }
            } else {
                template.notice =
                    Some("A newer prediction was requested; showing that one instead.".to_string());
                template.result = latest.get().cloned();
            }
        }
        Err(e) => template.error = Some(e.user_message()),
    }

    HtmlTemplate(template).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct HalfTimeQuery {
    home: Option<String>,
    away: Option<String>,
    home_score: Option<String>,
    away_score: Option<String>,
}

fn parse_goals(value: &str) -> Result<u32, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| ApiError::Validation("Scores must be whole numbers".to_string()))
}

async fn half_time(
    State(state): State<SharedState>,
    Query(query): Query<HalfTimeQuery>,
) -> impl IntoResponse {
    let mut template = HalfTimeTemplate {
        active_page: "half_time".to_string(),
        user: state.user_name().await,
        teams: state.team_names().await,
        home: query.home.clone().unwrap_or_default(),
        away: query.away.clone().unwrap_or_default(),
        home_score: query.home_score.clone().unwrap_or_default(),
        away_score: query.away_score.clone().unwrap_or_default(),
        half_time_score: String::new(),
        momentum: String::new(),
        comeback: String::new(),
        result: None,
        error: None,
    };

    if query.home.is_none() && query.away.is_none() {
        return HtmlTemplate(template).into_response();
    }

    let scores = parse_goals(&template.home_score)
        .and_then(|home| parse_goals(&template.away_score).map(|away| (home, away)));
    let (home_score, away_score) = match scores {
        Ok(scores) => scores,
        Err(e) => {
            template.error = Some(e.user_message());
            return HtmlTemplate(template).into_response();
        }
    };

    let request = HalfTimeRequest::new(
        template.home.clone(),
        template.away.clone(),
        home_score,
        away_score,
    );
    let (_, outcome) = state.predictor.predict_half_time(&request).await;

    match settle(outcome) {
        Ok((half_time, provenance, reason)) => {
            template.half_time_score =
                format!("{} - {}", half_time.half_time_score.0, half_time.half_time_score.1);
            template.momentum = format!("{:?}", half_time.momentum).to_lowercase();
            template.comeback = half_time.comeback_likelihood.as_str().to_string();
            template.result = Some(PredictionView::new(&half_time.prediction, provenance, reason));
        }
        Err(e) => template.error = Some(e.user_message()),
    }

    HtmlTemplate(template).into_response()
}

async fn team(State(state): State<SharedState>, Path(name): Path<String>) -> impl IntoResponse {
    let outcome = state.predictor.client().team_analysis(&name).await;

    let mut template = TeamTemplate {
        active_page: "teams".to_string(),
        user: state.user_name().await,
        team: name,
        provenance: String::new(),
        played: 0,
        wins: 0,
        draws: 0,
        losses: 0,
        goals_for: 0,
        goals_against: 0,
        goal_difference: 0,
        points: 0,
        form: String::new(),
        home_record: String::new(),
        away_record: String::new(),
        error: None,
    };

    match settle(outcome) {
        Ok((analysis, provenance, _)) => {
            template.provenance = provenance.as_str().to_string();
            template.played = analysis.played;
            template.wins = analysis.wins;
            template.draws = analysis.draws;
            template.losses = analysis.losses;
            template.goals_for = analysis.goals_for;
            template.goals_against = analysis.goals_against;
            template.goal_difference = analysis.goal_difference();
            template.points = analysis.points();
            template.form = analysis.form_string();
            template.home_record = format!(
                "W{} D{} L{}",
                analysis.home.wins, analysis.home.draws, analysis.home.losses
            );
            template.away_record = format!(
                "W{} D{} L{}",
                analysis.away.wins, analysis.away.draws, analysis.away.losses
            );
            if analysis.played == 0 {
                template.error = Some(format!("No finished matches found for {}", template.team));
            }
        }
        Err(e) => template.error = Some(e.user_message()),
    }

    HtmlTemplate(template).into_response()
}

async fn render_news(state: &AppState, error: Option<String>) -> Response {
    let outcome = state.predictor.client().news(DEFAULT_NEWS_LIMIT).await;
    let provenance = provenance_label(outcome.provenance());
    let saved = state.shelf.saved_articles().unwrap_or_default();

    let articles = outcome
        .into_value()
        .unwrap_or_default()
        .into_iter()
        .map(|a| ArticleView {
            saved: saved.contains(&a.id),
            category: format!("{:?}", a.category).to_lowercase(),
            id: a.id,
            title: a.title,
            excerpt: a.excerpt,
            source: a.source,
            link: a.link,
        })
        .collect();

    let posts = state
        .shelf
        .posts()
        .unwrap_or_default()
        .into_iter()
        .map(|p| PostView {
            id: p.id,
            title: p.title,
            excerpt: p.excerpt,
            author: p.author.name,
            tags: p.tags.join(", "),
        })
        .collect();

    let template = NewsTemplate {
        active_page: "news".to_string(),
        user: state.user_name().await,
        provenance,
        articles,
        posts,
        error,
    };
    HtmlTemplate(template).into_response()
}

async fn news(State(state): State<SharedState>) -> impl IntoResponse {
    render_news(&state, None).await
}

async fn toggle_saved(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = state.shelf.toggle_saved(&id) {
        tracing::warn!("Failed to update saved articles: {}", e);
    }
    Redirect::to("/news")
}

#[derive(Debug, Deserialize)]
struct PostForm {
    title: String,
    content: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    tags: String,
}

async fn publish_post(
    State(state): State<SharedState>,
    Form(form): Form<PostForm>,
) -> Response {
    let user = state.session.read().await.user().cloned();
    let Some(user) = user else {
        return render_news(&state, Some("Please log in to publish a post".to_string())).await;
    };

    let draft = BlogDraft {
        title: form.title,
        content: form.content,
        excerpt: Some(form.excerpt),
        tags: form.tags.split(',').map(str::to_string).collect(),
    };
    match state.shelf.publish(draft, &user) {
        Ok(post) => {
            tracing::info!("Published {}", post.id);
            Redirect::to("/news").into_response()
        }
        Err(e) => render_news(&state, Some(e.user_message())).await,
    }
}

async fn delete_post(State(state): State<SharedState>, Path(id): Path<String>) -> impl IntoResponse {
    if let Err(e) = state.shelf.delete(&id) {
        tracing::warn!("Failed to delete post {}: {}", id, e);
    }
    Redirect::to("/news")
}

async fn render_chat(state: &AppState, error: Option<String>) -> Response {
    let messages = state
        .chat
        .read()
        .await
        .messages()
        .iter()
        .map(|m| MessageView {
            from_user: m.role == ChatRole::User,
            content: m.content.clone(),
            source: m.source.clone(),
            confidence: m.confidence.map(|c| c.as_str().to_string()),
            time: m.timestamp.format("%H:%M").to_string(),
        })
        .collect();

    let template = ChatTemplate {
        active_page: "chat".to_string(),
        user: state.user_name().await,
        messages,
        error,
    };
    HtmlTemplate(template).into_response()
}

async fn chat(State(state): State<SharedState>) -> impl IntoResponse {
    render_chat(&state, None).await
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    message: String,
}

async fn send_chat(State(state): State<SharedState>, Form(form): Form<ChatForm>) -> Response {
    let token = state.token().await;
    let (pending, client) = {
        let mut chat = state.chat.write().await;
        (chat.prepare(&form.message), chat.client().clone())
    };
    let pending = match pending {
        Ok(pending) => pending,
        Err(e) => return render_chat(&state, Some(e.user_message())).await,
    };

    let result = pending.send(&client, token.as_deref()).await;
    state.chat.write().await.complete(result);
    render_chat(&state, None).await
}

async fn clear_chat(State(state): State<SharedState>) -> impl IntoResponse {
    state.chat.write().await.clear();
    Redirect::to("/chat")
}

async fn render_account(state: &AppState, error: Option<String>) -> Response {
    let session = state.session.read().await;
    let stats = session.stats().unwrap_or_default();
    let template = AccountTemplate {
        active_page: "account".to_string(),
        user: session.user().map(|u| u.display_name()),
        email: session.user().map(|u| u.email.clone()).unwrap_or_default(),
        predictions_made: stats.predictions_made,
        correct_predictions: stats.correct_predictions,
        accuracy: stats.accuracy(),
        favorite_team: stats.favorite_team.clone().unwrap_or_default(),
        error,
    };
    HtmlTemplate(template).into_response()
}

async fn account(State(state): State<SharedState>) -> impl IntoResponse {
    render_account(&state, None).await
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(State(state): State<SharedState>, Form(form): Form<LoginForm>) -> Response {
    let (client, _) = state.session_client().await;
    let result = match authenticate(&client, &form.email, &form.password).await {
        Ok(user) => state.session.write().await.establish(user).map(|_| ()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Redirect::to("/account").into_response(),
        Err(e) => render_account(&state, Some(auth_failure_message(AuthAction::Login, &e))).await,
    }
}

#[derive(Debug, Deserialize)]
struct SignupForm {
    email: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

async fn signup(State(state): State<SharedState>, Form(form): Form<SignupForm>) -> Response {
    let (client, _) = state.session_client().await;
    let registered = register(
        &client,
        &form.email,
        &form.password,
        &form.first_name,
        &form.last_name,
    )
    .await;
    let result = match registered {
        Ok(user) => state.session.write().await.establish(user).map(|_| ()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Redirect::to("/account").into_response(),
        Err(e) => {
            render_account(&state, Some(auth_failure_message(AuthAction::Signup, &e))).await
        }
    }
}

async fn logout(State(state): State<SharedState>) -> Response {
    let (client, token) = state.session_client().await;
    revoke(&client, token.as_deref()).await;
    let result = state.session.write().await.end_session();
    match result {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => render_account(&state, Some(ApiError::from(e).user_message())).await,
    }
}

fn app(state: SharedState) -> Router {
    Router::new()
        // This will serve files from the "static" directory at the "/static" URL path
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(home))
        .route("/predict", get(predict))
        .route("/half-time", get(half_time))
        .route("/teams/:name", get(team))
        .route("/news", get(news))
        .route("/news/:id/save", post(toggle_saved))
        .route("/blog", post(publish_post))
        .route("/blog/:id/delete", post(delete_post))
        .route("/chat", get(chat).post(send_chat))
        .route("/chat/clear", post(clear_chat))
        .route("/account", get(account))
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt::init();

    let client = ScoreSightClient::from_config(&config)?;
    let store: Arc<dyn SessionStore> = Arc::new(
        FileStore::open(&config.store_path)
            .with_context(|| format!("Failed to open session store {}", config.store_path))?,
    );
    let predictor = Predictor::new(client.clone(), config.predict_endpoint);
    let state = Arc::new(AppState::new(client, predictor, store));

    state.session.write().await.bootstrap().await;

    println!("Fetching dashboard data from {}...", config.api_url);
    let data = state.dashboard().await;
    println!("Data loaded");
    println!(
        "  - {} teams ({})",
        data.teams.len(),
        provenance_label(data.teams_provenance)
    );
    println!(
        "  - {} fixtures ({})",
        data.fixtures.len(),
        provenance_label(data.fixtures_provenance)
    );
    println!(
        "  - {} news articles ({})",
        data.news.len(),
        provenance_label(data.news_provenance)
    );

    println!("\nStarting web server at http://{}", config.web_addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&config.web_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.web_addr))?;

    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use scoresight::store::MemoryStore;
    use scoresight::PredictEndpoint;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        // Nothing listens on port 9, so every backend call fails fast
        let client = ScoreSightClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let predictor = Predictor::new(client.clone(), PredictEndpoint::Simple).with_seed(7);
        Arc::new(AppState::new(client, predictor, Arc::new(MemoryStore::new())))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get_page(state: SharedState, uri: &str) -> (StatusCode, String) {
        let response = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_text(response).await)
    }

    #[tokio::test]
    async fn test_same_team_shows_validation_message() {
        let (status, body) = get_page(test_state(), "/predict?home=Arsenal&away=Arsenal").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Home and Away teams must be different"));
        assert!(!body.contains("badge-fallback"));
    }

    #[tokio::test]
    async fn test_offline_prediction_is_marked_fallback() {
        let (status, body) = get_page(test_state(), "/predict?home=Arsenal&away=Chelsea").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("badge-fallback"));
        assert!(body.contains("Arsenal"));
    }

    #[tokio::test]
    async fn test_half_time_rejects_bad_scores() {
        let (_, body) = get_page(
            test_state(),
            "/half-time?home=Arsenal&away=Chelsea&home_score=two&away_score=0",
        )
        .await;
        assert!(body.contains("Scores must be whole numbers"));
    }

    #[tokio::test]
    async fn test_home_renders_sample_data_when_offline() {
        let (status, body) = get_page(test_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("badge-fallback"));
    }

    #[tokio::test]
    async fn test_blank_chat_message_is_rejected() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("message=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_text(response).await;
        assert!(body.contains("Message cannot be empty"));
        assert_eq!(state.chat.read().await.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_prediction_is_not_counted_in_stats() {
        let state = test_state();
        state
            .session
            .write()
            .await
            .establish(scoresight::User {
                id: "u1".to_string(),
                email: "fan@example.com".to_string(),
                first_name: "Sam".to_string(),
                last_name: String::new(),
                token: "t".to_string(),
            })
            .unwrap();

        let (_, body) = get_page(state.clone(), "/predict?home=Arsenal&away=Chelsea").await;
        assert!(body.contains("badge-fallback"));

        let stats = state.session.read().await.stats().unwrap();
        assert_eq!(stats.predictions_made, 0);
        assert_eq!(stats.favorite_team, None);
    }

    #[tokio::test]
    async fn test_news_page_requests_default_limit() {
        use axum::extract::Query as QueryParams;
        use axum::Json;
        use std::collections::HashMap;

        let seen = Arc::new(std::sync::Mutex::new(None::<String>));
        let recorder = seen.clone();
        let backend = Router::new().route(
            "/api/news/epl",
            get(move |QueryParams(params): QueryParams<HashMap<String, String>>| {
                let recorder = recorder.clone();
                async move {
                    *recorder.lock().unwrap() = params.get("limit").cloned();
                    Json(serde_json::json!({
                        "success": true,
                        "data": [{"id": "n1", "title": "Saka signs new deal", "summary": "Long term"}]
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });

        let client = ScoreSightClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let predictor = Predictor::new(client.clone(), PredictEndpoint::Simple).with_seed(7);
        let state = Arc::new(AppState::new(client, predictor, Arc::new(MemoryStore::new())));

        let (status, body) = get_page(state, "/news").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("badge-live"));
        assert!(body.contains("Saka signs new deal"));
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(DEFAULT_NEWS_LIMIT.to_string())
        );
    }

    #[tokio::test]
    async fn test_slow_login_does_not_block_other_pages() {
        use axum::Json;

        let backend = Router::new().route(
            "/api/auth/login",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({
                    "success": true,
                    "token": "slow-token",
                    "user": {"id": "u1", "email": "fan@example.com"}
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });

        let client = ScoreSightClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let predictor = Predictor::new(client.clone(), PredictEndpoint::Simple).with_seed(7);
        let state = Arc::new(AppState::new(client, predictor, Arc::new(MemoryStore::new())));

        let login = tokio::spawn(app(state.clone()).oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("email=fan%40example.com&password=secret"))
                .unwrap(),
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let page = tokio::time::timeout(Duration::from_millis(500), get_page(state.clone(), "/predict"))
            .await
            .expect("page blocked behind the pending login");
        assert_eq!(page.0, StatusCode::OK);

        let response = login.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(state.session.read().await.is_authenticated());
    }
}
