//! Signup, signin, subscription and the cookie-backed session behind them.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

use crate::config::Settings;
use crate::error::{ApiError, AppError, Result};
use crate::state::AppState;
use crate::store::{NewUser, SessionData, User};
use crate::templates::{self, HomePage};
use crate::util::encode_component;

pub const SESSION_COOKIE: &str = "vibeverse.sid";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/signup", get(signup_page).post(signup))
        .route("/signin", get(signin_page).post(signin))
        .route("/home", get(home))
        .route("/subscribe", get(subscribe_page).post(subscribe))
        .route("/signout", get(signout).post(signout))
}

// ── Sessions ────────────────────────────────────────────────────────────────

struct Session {
    sid: Option<String>,
    data: SessionData,
}

impl Session {
    fn user_id(&self) -> Option<i32> {
        self.data.user_id
    }
}

fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn session_cookie(settings: &Settings, sid: String) -> Cookie<'static> {
    let same_site = if settings.production {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build((SESSION_COOKIE, sid))
        .path("/")
        .http_only(true)
        .secure(settings.production)
        .same_site(same_site)
        .max_age(time::Duration::seconds(settings.session_ttl.as_secs() as i64))
        .build()
}

async fn load_session(state: &AppState, jar: &SignedCookieJar) -> Result<Session> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(Session {
            sid: None,
            data: SessionData::default(),
        });
    };
    let sid = cookie.value().to_string();
    let data = state.sessions.load(&sid).await?.unwrap_or_default();
    Ok(Session {
        sid: Some(sid),
        data,
    })
}

/// Issues a fresh session id for `user_id`, so a pre-login id is never reused.
async fn start_session(state: &AppState, jar: SignedCookieJar, user_id: i32) -> Result<SignedCookieJar> {
    let sid = new_session_id();
    let data = SessionData {
        user_id: Some(user_id),
    };
    state
        .sessions
        .save(&sid, &data, state.settings.session_ttl)
        .await?;
    Ok(jar.add(session_cookie(&state.settings, sid)))
}

async fn end_session(state: &AppState, jar: SignedCookieJar, session: &Session) -> SignedCookieJar {
    if let Some(sid) = &session.sid {
        if let Err(e) = state.sessions.destroy(sid).await {
            tracing::error!("Failed to destroy session: {e}");
        }
    }
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn redirect_with_error(path: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?error={}", encode_component(message)))
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "An error occurred").into_response()
}

// ── Pages ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorQuery {
    error: Option<String>,
}

async fn landing(State(state): State<AppState>, jar: SignedCookieJar) -> Html<String> {
    let logged_in = match load_session(&state, &jar).await {
        Ok(session) => session.user_id().is_some(),
        Err(e) => {
            tracing::error!("Failed to load session: {e}");
            false
        }
    };
    Html(templates::landing(logged_in))
}

async fn signup_page(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<ErrorQuery>,
) -> Response {
    if let Ok(session) = load_session(&state, &jar).await {
        if session.user_id().is_some() {
            return Redirect::to("/home").into_response();
        }
    }
    Html(templates::signup(query.error.as_deref())).into_response()
}

async fn signin_page(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<ErrorQuery>,
) -> Response {
    if let Ok(session) = load_session(&state, &jar).await {
        if session.user_id().is_some() {
            return Redirect::to("/home").into_response();
        }
    }
    Html(templates::signin(query.error.as_deref())).into_response()
}

// ── Signup / signin ─────────────────────────────────────────────────────────

/// Result of an auth attempt that did not fail internally.
enum AuthOutcome {
    SignedIn(i32),
    Rejected(&'static str),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupForm {
    email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
    world_name: Option<String>,
}

#[derive(Deserialize)]
struct SigninForm {
    email: Option<String>,
    password: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn is_valid_world_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Custom(format!("Password hashing task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Custom(format!("Password verification task failed: {e}")))?
        .map_err(AppError::from)
}

async fn register(state: &AppState, form: SignupForm) -> Result<AuthOutcome> {
    let (Some(email), Some(password), Some(confirm), Some(world_name)) = (
        non_empty(form.email),
        non_empty(form.password),
        non_empty(form.confirm_password),
        non_empty(form.world_name),
    ) else {
        return Ok(AuthOutcome::Rejected("All fields are required"));
    };
    if password != confirm {
        return Ok(AuthOutcome::Rejected("Passwords do not match"));
    }
    if !is_valid_world_name(&world_name) {
        return Ok(AuthOutcome::Rejected(
            "World name must be lowercase, numbers, and dashes only",
        ));
    }
    let email = email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Ok(AuthOutcome::Rejected("Email already registered"));
    }

    let password_hash = hash_password(password, state.settings.password_hash_cost).await?;
    let world_id = match state.api.create_world(&world_name).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to create world for {email}: {e}");
            return Ok(AuthOutcome::Rejected("Failed to create world"));
        }
    };

    let user = state
        .users
        .create(NewUser {
            email,
            password_hash,
            world_id: Some(world_id),
        })
        .await?;
    tracing::info!("Registered user {} with world {:?}", user.id, user.world_id);
    Ok(AuthOutcome::SignedIn(user.id))
}

async fn authenticate(state: &AppState, form: SigninForm) -> Result<AuthOutcome> {
    let (Some(email), Some(password)) = (non_empty(form.email), non_empty(form.password)) else {
        return Ok(AuthOutcome::Rejected("Email and password are required"));
    };
    let email = email.trim().to_lowercase();
    let Some(user) = state.users.find_by_email(&email).await? else {
        return Ok(AuthOutcome::Rejected("Invalid email or password"));
    };
    if !verify_password(password, user.password_hash).await? {
        return Ok(AuthOutcome::Rejected("Invalid email or password"));
    }
    Ok(AuthOutcome::SignedIn(user.id))
}

async fn finish_auth(
    state: &AppState,
    jar: SignedCookieJar,
    outcome: Result<AuthOutcome>,
    form_path: &str,
) -> Response {
    match outcome {
        Ok(AuthOutcome::SignedIn(user_id)) => match start_session(state, jar, user_id).await {
            Ok(jar) => (jar, Redirect::to("/home")).into_response(),
            Err(e) => {
                tracing::error!("Failed to start session: {e}");
                redirect_with_error(form_path, "Session error. Please try again.").into_response()
            }
        },
        Ok(AuthOutcome::Rejected(message)) => redirect_with_error(form_path, message).into_response(),
        Err(e) => {
            tracing::error!("Authentication failed: {e}");
            redirect_with_error(form_path, "An error occurred. Please try again.").into_response()
        }
    }
}

async fn signup(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Form(form), _): WithRejection<Form<SignupForm>, ApiError>,
) -> Response {
    let outcome = register(&state, form).await;
    finish_auth(&state, jar, outcome, "/signup").await
}

async fn signin(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Form(form), _): WithRejection<Form<SigninForm>, ApiError>,
) -> Response {
    let outcome = authenticate(&state, form).await;
    finish_auth(&state, jar, outcome, "/signin").await
}

// ── Signed-in pages ─────────────────────────────────────────────────────────

/// The signed-in user, or the response to send instead.
async fn require_user(
    state: &AppState,
    jar: SignedCookieJar,
) -> std::result::Result<User, Response> {
    let session = load_session(state, &jar).await.map_err(|e| {
        tracing::error!("Failed to load session: {e}");
        server_error()
    })?;
    let Some(user_id) = session.user_id() else {
        return Err(Redirect::to("/signin").into_response());
    };
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            tracing::warn!("Session references unknown user {user_id}");
            let jar = end_session(state, jar, &session).await;
            Err((jar, Redirect::to("/signin")).into_response())
        }
        Err(e) => {
            tracing::error!("Failed to load user {user_id}: {e}");
            Err(server_error())
        }
    }
}

async fn home(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let user = match require_user(&state, jar).await {
        Ok(found) => found,
        Err(response) => return response,
    };
    Html(templates::home(&HomePage {
        email: &user.email,
        world_id: user.world_id.as_deref(),
        subscribed: user.subscribed,
        member_since: user.created_at.date().to_string(),
    }))
    .into_response()
}

async fn subscribe_page(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    match require_user(&state, jar).await {
        Ok(_) => Html(templates::subscribe()).into_response(),
        Err(response) => response,
    }
}

async fn subscribe(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let user = match require_user(&state, jar).await {
        Ok(found) => found,
        Err(response) => return response,
    };
    match state.users.update_subscription(user.id, true).await {
        Ok(_) => {
            tracing::info!("User {} subscribed", user.id);
            Redirect::to("/home").into_response()
        }
        Err(e) => {
            tracing::error!("Failed to update subscription for user {}: {e}", user.id);
            server_error()
        }
    }
}

async fn signout(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = load_session(&state, &jar).await.unwrap_or(Session {
        sid: jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
        data: SessionData::default(),
    });
    let jar = end_session(&state, jar, &session).await;
    (jar, Redirect::to("/")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use crate::state::testing::{self, post_form, send};
    use axum::body::Body;
    use axum::http::Request;
    use reqwest::Method;
    use serde_json::json;

    const INSTANCES_URL: &str = "https://api.test/v1/worlds/proj/web-world-instances/";

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::post(uri)
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap()
    }

    const SIGNUP: &str =
        "email=Ada%40example.com&password=pw123&confirmPassword=pw123&worldName=ada-world";

    #[test]
    fn test_world_name_rules() {
        assert!(is_valid_world_name("my-world-2"));
        assert!(!is_valid_world_name("My World"));
        assert!(!is_valid_world_name(""));
        assert!(!is_valid_world_name("under_score"));
    }

    #[test]
    fn test_session_cookie_flags() {
        let mut settings = Settings::for_tests();
        let cookie = session_cookie(&settings, "abc".into());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));

        settings.production = true;
        let cookie = session_cookie(&settings, "abc".into());
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(new_session_id().len(), 48);
    }

    #[tokio::test]
    async fn test_signup_signin_subscribe_signout() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::POST, INSTANCES_URL, json!({ "id": "ada-world-id" }));
        let app = router(state);

        let response = send(app.clone(), post_form("/signup", SIGNUP)).await;
        assert_eq!(response.location(), Some("/home"));
        let cookie = response.cookies();
        assert!(cookie.starts_with(SESSION_COOKIE));

        let response = send(app.clone(), get_with_cookie("/home", &cookie)).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.text();
        assert!(body.contains("ada@example.com"));
        assert!(body.contains("/world/ada-world-id/web"));
        assert!(body.contains(r#"href="/subscribe""#));

        let response = send(app.clone(), post_with_cookie("/subscribe", &cookie)).await;
        assert_eq!(response.location(), Some("/home"));
        let response = send(app.clone(), get_with_cookie("/home", &cookie)).await;
        assert!(response.text().contains("Subscribed"));

        let response = send(app.clone(), post_with_cookie("/signout", &cookie)).await;
        assert_eq!(response.location(), Some("/"));
        let response = send(app.clone(), get_with_cookie("/home", &cookie)).await;
        assert_eq!(response.location(), Some("/signin"));

        let response = send(
            app.clone(),
            post_form("/signin", "email=ada%40example.com&password=wrong"),
        )
        .await;
        assert_eq!(
            response.location(),
            Some("/signin?error=Invalid%20email%20or%20password")
        );

        let response = send(
            app,
            post_form("/signin", "email=ada%40example.com&password=pw123"),
        )
        .await;
        assert_eq!(response.location(), Some("/home"));
        assert!(!response.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_signup_rejections() {
        let (mock, state) = testing::state();
        mock.reply_json(Method::POST, INSTANCES_URL, json!({ "id": "w" }));
        let app = router(state);

        let mismatch = "email=a%40b.c&password=one&confirmPassword=two&worldName=w";
        let response = send(app.clone(), post_form("/signup", mismatch)).await;
        assert_eq!(
            response.location(),
            Some("/signup?error=Passwords%20do%20not%20match")
        );

        let bad_name = "email=a%40b.c&password=pw&confirmPassword=pw&worldName=Bad%20Name";
        let response = send(app.clone(), post_form("/signup", bad_name)).await;
        assert_eq!(
            response.location(),
            Some("/signup?error=World%20name%20must%20be%20lowercase%2C%20numbers%2C%20and%20dashes%20only")
        );

        send(app.clone(), post_form("/signup", SIGNUP)).await;
        let response = send(app, post_form("/signup", SIGNUP)).await;
        assert_eq!(
            response.location(),
            Some("/signup?error=Email%20already%20registered")
        );
    }

    #[tokio::test]
    async fn test_non_form_body_is_bad_request() {
        let (_, state) = testing::state();
        let request = Request::post("/signin")
            .header("content-type", "text/plain")
            .body(Body::from("email=a"))
            .unwrap();
        let response = send(router(state), request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["error"].is_string());
    }

    #[tokio::test]
    async fn test_signed_out_pages() {
        let (_, state) = testing::state();
        let app = router(state);

        let response = send(app.clone(), testing::get("/home")).await;
        assert_eq!(response.location(), Some("/signin"));
        let response = send(app.clone(), testing::get("/subscribe")).await;
        assert_eq!(response.location(), Some("/signin"));

        let response = send(app.clone(), testing::get("/signin?error=Oops")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.text().contains("Oops"));

        let response = send(app, testing::get("/")).await;
        assert!(response.text().contains(r#"href="/signup""#));
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_ignored() {
        let (_, state) = testing::state();
        let response = send(
            router(state),
            get_with_cookie("/home", &format!("{SESSION_COOKIE}=forged")),
        )
        .await;
        assert_eq!(response.location(), Some("/signin"));
    }
}
