#![allow(dead_code)]

use axum::extract::Request;
use axum::Router;
use scoresight::ScoreSightClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::util::MapRequestLayer;

/// In-process stand-in for the prediction backend, bound to an ephemeral port
pub struct MockBackend {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub async fn start(router: Router) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = router.layer(MapRequestLayer::new(move |req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            req
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            hits,
        }
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> ScoreSightClient {
        ScoreSightClient::new(&self.url, Duration::from_secs(5)).unwrap()
    }
}

/// URL of a port that was just released, so connections are refused
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub async fn offline_client() -> ScoreSightClient {
    ScoreSightClient::new(closed_port_url().await, Duration::from_secs(2)).unwrap()
}

pub fn user_json(token: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "user-1",
        "email": "fan@example.com",
        "firstName": "Sam",
        "lastName": "Fan",
        "token": token
    })
}
