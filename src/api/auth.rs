use super::client::ScoreSightClient;
use super::error::ApiError;
use crate::models::{User, UserStats};
use crate::utils::store::{
    load_json, save_json, stats_key, SessionStore, StoreError, TOKEN_KEY, USER_KEY,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LOGIN_PATH: &str = "/api/auth/login";
const SIGNUP_PATH: &str = "/api/auth/signup";
const CHECK_PATH: &str = "/api/auth/check";
const LOGOUT_PATH: &str = "/api/logout";

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    token: Option<String>,
}

impl AuthResponse {
    fn into_user(self) -> Result<User, ApiError> {
        match (self.success, self.user) {
            (true, Some(mut user)) => {
                if user.token.is_empty() {
                    user.token = self.token.unwrap_or_default();
                }
                Ok(user)
            }
            _ => Err(ApiError::Backend(
                self.message
                    .unwrap_or_else(|| "Authentication was not successful".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    user: Option<User>,
}

impl ScoreSightClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = self.post(LOGIN_PATH).json(&LoginBody { email, password });
        let response: AuthResponse = self.send_json(request).await?;
        response.into_user()
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, ApiError> {
        let request = self.post(SIGNUP_PATH).json(&SignupBody {
            email,
            password,
            first_name,
            last_name,
        });
        let response: AuthResponse = self.send_json(request).await?;
        response.into_user()
    }

    /// Returns the user if the token is still accepted, `None` if the backend
    /// answered but does not recognise it
    pub async fn check_auth(&self, token: &str) -> Result<Option<User>, ApiError> {
        let request = self.get(CHECK_PATH).bearer_auth(token);
        let response: CheckResponse = self.send_json(request).await?;
        Ok(match (response.authenticated, response.user) {
            (true, Some(user)) => Some(user),
            _ => None,
        })
    }

    pub async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let mut request = self.post(LOGOUT_PATH);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send_empty(request).await
    }
}

/// Where the client believes the user stands
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    Authenticated(User),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Signup,
}

/// User-facing text for a failed login or signup
pub fn auth_failure_message(action: AuthAction, err: &ApiError) -> String {
    match (action, err) {
        (_, ApiError::Validation(msg)) => msg.clone(),
        (_, ApiError::Transport(_)) => {
            "Network error. Check your connection and try again!".to_string()
        }
        (AuthAction::Login, ApiError::Unauthorized(_)) => {
            "Wrong email or password.".to_string()
        }
        (AuthAction::Signup, ApiError::Status { status: 400, .. }) => {
            "You're already registered. Try logging in instead.".to_string()
        }
        (AuthAction::Signup, ApiError::Status { status: 422, .. }) => {
            "Check your details and try again.".to_string()
        }
        (AuthAction::Login, _) => "Login failed. Please try again.".to_string(),
        (AuthAction::Signup, _) => "Signup failed. Please try again.".to_string(),
    }
}

fn require_credentials<'a>(email: &'a str, password: &str) -> Result<&'a str, ApiError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Please enter your email and password".to_string(),
        ));
    }
    Ok(email)
}

/// Validate and log in without touching any session state
pub async fn authenticate(
    client: &ScoreSightClient,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let email = require_credentials(email, password)?;
    client.login(email, password).await
}

/// Validate and sign up without touching any session state
pub async fn register(
    client: &ScoreSightClient,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, ApiError> {
    let email = require_credentials(email, password)?;
    client
        .signup(email, password, first_name.trim(), last_name.trim())
        .await
}

/// Best-effort logout call; failures are only logged
pub async fn revoke(client: &ScoreSightClient, token: Option<&str>) {
    if let Err(e) = client.logout(token).await {
        tracing::warn!("Logout request failed, clearing local session anyway: {}", e);
    }
}

/// Owns the session lifecycle: bootstrap once, then login/signup/logout.
///
/// ```text
/// Loading --bootstrap--> Authenticated | Unauthenticated
/// Unauthenticated --login/signup--> Authenticated
/// Authenticated --logout--> Unauthenticated
/// ```
pub struct SessionManager {
    client: ScoreSightClient,
    store: Arc<dyn SessionStore>,
    state: AuthState,
}

impl SessionManager {
    pub fn new(client: ScoreSightClient, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            state: AuthState::Loading,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.user()
            .map(|u| u.token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Decide whether the persisted session is still valid.
    ///
    /// Runs once; later calls return the current state without a request.
    /// Any failure clears the persisted session.
    pub async fn bootstrap(&mut self) -> &AuthState {
        if self.state != AuthState::Loading {
            return &self.state;
        }

        let token = self.store.get(TOKEN_KEY).ok().flatten();
        let stored_user: Option<User> = load_json(self.store.as_ref(), USER_KEY).ok().flatten();

        let (token, stored_user) = match (token, stored_user) {
            (Some(token), Some(user)) if !token.is_empty() => (token, user),
            _ => {
                tracing::debug!("No persisted session");
                self.clear_persisted();
                self.state = AuthState::Unauthenticated;
                return &self.state;
            }
        };

        match self.client.check_auth(&token).await {
            Ok(Some(mut user)) => {
                if user.token.is_empty() {
                    user.token = token;
                }
                tracing::info!("Restored session for {}", stored_user.email);
                self.state = AuthState::Authenticated(user);
            }
            Ok(None) => {
                tracing::info!("Persisted session is no longer valid");
                self.clear_persisted();
                self.state = AuthState::Unauthenticated;
            }
            Err(e) => {
                tracing::warn!("Session check failed: {}", e);
                self.clear_persisted();
                self.state = AuthState::Unauthenticated;
            }
        }

        &self.state
    }

    pub fn client(&self) -> &ScoreSightClient {
        &self.client
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User, ApiError> {
        let user = authenticate(&self.client, email, password).await?;
        self.establish(user)
    }

    pub async fn signup(
        &mut self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<&User, ApiError> {
        let user = register(&self.client, email, password, first_name, last_name).await?;
        self.establish(user)
    }

    /// Tell the backend, then forget the session no matter what it said
    pub async fn logout(&mut self) -> Result<(), StoreError> {
        let token = self.token().map(str::to_string);
        revoke(&self.client, token.as_deref()).await;
        self.end_session()
    }

    /// Adopt a user returned by `authenticate` or `register` and persist it
    pub fn establish(&mut self, user: User) -> Result<&User, ApiError> {
        self.store.set(TOKEN_KEY, &user.token)?;
        save_json(self.store.as_ref(), USER_KEY, &user)?;
        tracing::info!("Signed in as {}", user.email);
        self.state = AuthState::Authenticated(user);
        self.user()
            .ok_or_else(|| ApiError::Backend("session was not established".to_string()))
    }

    /// Drop the local session. Both keys are always attempted; the first
    /// failure is reported.
    pub fn end_session(&mut self) -> Result<(), StoreError> {
        self.state = AuthState::Unauthenticated;
        let token = self.store.remove(TOKEN_KEY);
        let user = self.store.remove(USER_KEY);
        tracing::info!("Logged out");
        token.and(user)
    }

    /// Cached prediction stats for the logged-in user
    pub fn stats(&self) -> Result<UserStats, StoreError> {
        let Some(user) = self.user() else {
            return Ok(UserStats::default());
        };
        Ok(load_json(self.store.as_ref(), &stats_key(&user.id))?.unwrap_or_default())
    }

    /// Count a prediction the user made; the first team they predict becomes their favourite
    pub fn record_prediction(&self, team: &str) -> Result<UserStats, StoreError> {
        let Some(user) = self.user() else {
            return Ok(UserStats::default());
        };
        let mut stats = self.stats()?;
        stats.predictions_made += 1;
        if stats.favorite_team.is_none() {
            stats.favorite_team = Some(team.to_string());
        }
        save_json(self.store.as_ref(), &stats_key(&user.id), &stats)?;
        Ok(stats)
    }

    /// Record whether a finished prediction turned out right
    pub fn record_result(&self, correct: bool) -> Result<UserStats, StoreError> {
        let Some(user) = self.user() else {
            return Ok(UserStats::default());
        };
        let mut stats = self.stats()?;
        if correct {
            stats.correct_predictions = (stats.correct_predictions + 1).min(stats.predictions_made);
        }
        save_json(self.store.as_ref(), &stats_key(&user.id), &stats)?;
        Ok(stats)
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to clear {}: {}", key, e);
            }
        }
    }
}
