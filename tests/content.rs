mod common;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{offline_client, MockBackend};
use scoresight::api::chat::{ChatFailure, CONTEXT_WINDOW};
use scoresight::{
    fetch_dashboard, ApiError, ChatRole, ChatTurn, ChatWidget, PredictEndpoint, Predictor,
    Provenance,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn fixture(id: u64, home: &str, away: &str, date: &str, score: Option<(u32, u32)>) -> Value {
    let full_time = match score {
        Some((h, a)) => json!({"home": h, "away": a}),
        None => json!({"home": null, "away": null}),
    };
    let status = if score.is_some() { "FINISHED" } else { "SCHEDULED" };
    json!({
        "id": id,
        "homeTeam": {"id": id, "name": home, "shortName": home, "crest": ""},
        "awayTeam": {"id": id + 100, "name": away, "shortName": away, "crest": ""},
        "date": date,
        "status": status,
        "score": {"fullTime": full_time}
    })
}

#[tokio::test]
async fn test_blank_chat_message_sends_nothing() {
    let backend = MockBackend::start(Router::new().route(
        "/api/chat/message",
        post(|| async { Json(json!({"response": "hi"})) }),
    ))
    .await;

    let mut chat = ChatWidget::new(backend.client());
    for input in ["", "   ", "\t"] {
        assert!(matches!(
            chat.send(input, None).await,
            Err(ApiError::Validation(_))
        ));
    }
    assert_eq!(backend.hits(), 0);
    assert_eq!(chat.messages().len(), 1);
}

#[tokio::test]
async fn test_chat_sends_bounded_context() {
    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let backend = MockBackend::start(Router::new().route(
        "/api/chat/message",
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                let context = body["conversation"].as_array().map(Vec::len).unwrap_or(0);
                recorder.lock().unwrap().push(context);
                Json(json!({
                    "response": format!("You said: {}", body["message"].as_str().unwrap_or("")),
                    "source": "team_analyzer",
                    "confidence": "medium"
                }))
            }
        }),
    ))
    .await;

    let mut chat = ChatWidget::new(backend.client());
    for i in 0..8 {
        let turn = chat.send(&format!("question {}", i), None).await.unwrap();
        assert!(matches!(turn, ChatTurn::Reply(_)));
    }

    let last = chat.messages().last().unwrap();
    assert_eq!(last.role, ChatRole::Assistant);
    assert_eq!(last.content, "You said: question 7");
    assert_eq!(last.source.as_deref(), Some("team_analyzer"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], 1);
    assert!(seen.iter().all(|&n| n <= CONTEXT_WINDOW));
    assert_eq!(*seen.last().unwrap(), CONTEXT_WINDOW);
}

#[tokio::test]
async fn test_chat_failures_become_assistant_notices() {
    let backend = MockBackend::start(Router::new().route(
        "/api/chat/message",
        post(|| async { StatusCode::UNAUTHORIZED }),
    ))
    .await;
    let mut chat = ChatWidget::new(backend.client());
    match chat.send("Who wins the league?", None).await.unwrap() {
        ChatTurn::Failed { failure, notice } => {
            assert_eq!(failure, ChatFailure::Unauthenticated);
            assert_eq!(notice.role, ChatRole::Assistant);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(chat.messages().len(), 3);

    let mut offline = ChatWidget::new(offline_client().await);
    match offline.send("Anyone there?", None).await.unwrap() {
        ChatTurn::Failed { failure, .. } => assert_eq!(failure, ChatFailure::Unreachable),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fixtures_fall_back_to_matches_path() {
    let backend = MockBackend::start(Router::new().route(
        "/api/matches",
        get(|| async {
            Json(json!({"matches": [
                fixture(1, "Arsenal FC", "Chelsea FC", "2024-03-01T15:00:00Z", Some((2, 1))),
                fixture(2, "Chelsea FC", "Arsenal FC", "2024-03-08T15:00:00Z", Some((0, 0)))
            ]}))
        }),
    ))
    .await;

    let client = backend.client();
    let outcome = client.fixtures().await;
    assert!(outcome.is_live());
    assert_eq!(outcome.value().map(Vec::len), Some(2));

    let analysis = client.team_analysis("Arsenal FC").await.into_value().unwrap();
    assert_eq!(analysis.played, 2);
    assert_eq!(analysis.wins, 1);
    assert_eq!(analysis.draws, 1);
    assert_eq!(analysis.points(), 4);
}

#[tokio::test]
async fn test_news_falls_back_when_feed_is_empty() {
    let backend = MockBackend::start(Router::new().route(
        "/api/news/epl",
        get(|| async { Json(json!({"success": false, "data": []})) }),
    ))
    .await;

    let outcome = backend.client().news(10).await;
    assert!(outcome.is_fallback());
    assert!(!outcome.into_value().unwrap().is_empty());
}

#[tokio::test]
async fn test_live_news_is_categorized() {
    let backend = MockBackend::start(Router::new().route(
        "/api/news/epl",
        get(|| async {
            Json(json!({"success": true, "data": [
                {"id": "a1", "title": "Star striker ruled out with injury", "summary": "Out for weeks", "source": "BBC Sport"},
                {"title": "Club agree transfer deal"}
            ]}))
        }),
    ))
    .await;

    let articles = backend.client().news(10).await.into_value().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].id, "a1");
    assert_eq!(articles[0].source, "BBC Sport");
    assert_eq!(articles[1].id, "news-1");
    assert_eq!(articles[1].likes, 0);
}

#[tokio::test]
async fn test_dashboard_tags_each_section() {
    let backend = MockBackend::start(
        Router::new()
            .route(
                "/api/teams",
                get(|| async {
                    Json(json!({"teams": [
                        {"id": 57, "name": "Arsenal FC", "shortName": "Arsenal", "crest": ""}
                    ]}))
                }),
            )
            .route(
                "/api/fixtures",
                get(|| async {
                    Json(json!({"fixtures": [
                        fixture(1, "Arsenal FC", "Chelsea FC", "2030-08-01T15:00:00Z", None),
                        fixture(2, "Liverpool FC", "Everton FC", "2030-08-02T15:00:00Z", None)
                    ]}))
                }),
            ),
    )
    .await;

    let predictor = Predictor::new(backend.client(), PredictEndpoint::Simple).with_seed(3);
    let data = fetch_dashboard(&predictor, 1, 5, None).await;

    assert_eq!(data.teams_provenance, Some(Provenance::Live));
    assert_eq!(data.fixtures_provenance, Some(Provenance::Live));
    assert_eq!(data.news_provenance, Some(Provenance::Fallback));
    assert_eq!(data.featured.len(), 1);
    assert_eq!(data.featured[0].fixture.home_team.name, "Arsenal FC");
    assert_eq!(data.featured[0].provenance, Some(Provenance::Fallback));
}
