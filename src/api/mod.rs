pub mod auth;
pub mod chat;
pub mod client;
pub mod error;
pub mod half_time;
pub mod news;
pub mod normalize;
pub mod predict;
pub mod teams;

pub use auth::{AuthState, SessionManager};
pub use chat::{ChatTurn, ChatWidget};
pub use client::ScoreSightClient;
pub use error::{ApiError, FallbackReason, Outcome, Provenance};
pub use half_time::HalfTimeRequest;
pub use news::{BlogDraft, BlogShelf};
pub use predict::{PredictEndpoint, PredictionRequest, Predictor};
