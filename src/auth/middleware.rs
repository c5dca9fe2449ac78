//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::{Duration, UtcOffset};

use crate::{
    AppState, Error,
    auth::{
        UserID,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        get_user_by_id,
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    error_page::ErrorPage,
    timezone::get_local_offset,
};

/// The subset of [AppState] used by the auth guards.
#[derive(Clone)]
pub struct AuthState {
    pub cookie_key: Key,
    pub cookie_duration: Duration,
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// A request that carried a valid auth token.
struct Authenticated {
    jar: PrivateCookieJar,
    user_id: UserID,
    local_offset: UtcOffset,
}

/// Read the auth token from the request cookies.
///
/// Returns `None` and logs the reason when the request must be rejected.
async fn authenticate(state: &AuthState, parts: &mut Parts) -> Option<Authenticated> {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!(
            "Unknown timezone {}, rejecting request.",
            state.local_timezone
        );
        return None;
    };

    let jar = PrivateCookieJar::from_request_parts(parts, state)
        .await
        .inspect_err(|error| tracing::error!("Could not read the cookie jar: {error:?}"))
        .ok()?;

    match get_token_from_cookies(&jar) {
        Ok(token) => Some(Authenticated {
            jar,
            user_id: token.user_id,
            local_offset,
        }),
        Err(error) => {
            tracing::debug!("Rejecting request without a valid token: {error}");
            None
        }
    }
}

/// Push back the expiry of the auth cookie and add it to `response`.
///
/// The response is left untouched if the cookie cannot be updated.
fn refresh_auth_cookie(
    auth: Authenticated,
    cookie_duration: Duration,
    mut response: Response,
) -> Response {
    let jar = match extend_auth_cookie_duration_if_needed(
        auth.jar,
        cookie_duration,
        auth.local_offset,
    ) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not extend the auth cookie: {error:?}");
            return response;
        }
    };

    let jar_response = jar.into_response();
    for value in jar_response.headers().get_all(SET_COOKIE) {
        response.headers_mut().append(SET_COOKIE, value.to_owned());
    }

    response
}

/// Run `request` for a logged in user and refresh their cookie afterwards.
///
/// The user ID is added to the request extensions, so handlers behind the
/// guard can take `Extension(user_id): Extension<UserID>`. Requests without a
/// valid cookie get the response from `reject`, which receives the log-in URL
/// that returns the user to the page they wanted.
async fn guard_request(
    state: AuthState,
    request: Request,
    next: Next,
    reject: impl Fn(&str) -> Response,
) -> Response {
    let log_in_url = build_log_in_redirect_url(&request)
        .or_else(|| build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW))
        .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned());

    let (mut parts, body) = request.into_parts();
    let Some(auth) = authenticate(&state, &mut parts).await else {
        return reject(&log_in_url);
    };

    parts.extensions.insert(auth.user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    refresh_auth_cookie(auth, state.cookie_duration, response)
}

/// Middleware for pages: clients without a valid auth cookie are redirected to the log-in page.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    guard_request(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware for HTMX requests: clients without a valid auth cookie receive an HTMX redirect to the log-in page.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard_request(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware for the JSON API: clients without a valid auth cookie receive a 401 JSON error.
pub async fn auth_guard_json(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard_request(state, request, next, |_| {
        let mut response = Error::CookieMissing.into_json_response();
        *response.status_mut() = StatusCode::UNAUTHORIZED;
        response
    })
    .await
}

/// The state needed to check whether the logged in user is a superuser.
#[derive(Debug, Clone)]
pub struct SuperuserState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SuperuserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn is_superuser(state: &SuperuserState, user_id: UserID) -> Result<bool, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(user_id, &connection).map(|user| user.is_superuser)
}

/// Middleware for admin routes, must be layered inside one of the auth guards.
///
/// Requests from users that are not superusers are answered with 403 JSON.
pub async fn superuser_guard(
    State(state): State<SuperuserState>,
    Extension(user_id): Extension<UserID>,
    request: Request,
    next: Next,
) -> Response {
    match is_superuser(&state, user_id) {
        Ok(true) => next.run(request).await,
        Ok(false) | Err(Error::NotFound) => {
            tracing::warn!("User {user_id} tried to access admin route {}", request.uri());
            Error::Forbidden.into_json_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// Like [superuser_guard], but answers with the 403 page for HTML routes.
pub async fn superuser_guard_page(
    State(state): State<SuperuserState>,
    Extension(user_id): Extension<UserID>,
    request: Request,
    next: Next,
) -> Response {
    match is_superuser(&state, user_id) {
        Ok(true) => next.run(request).await,
        Ok(false) | Err(Error::NotFound) => {
            tracing::warn!("User {user_id} tried to access admin page {}", request.uri());
            ErrorPage::Forbidden.into_response()
        }
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Router,
        extract::State,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use axum_test::TestServer;
    use serde_json::Value;
    use sha2::Digest;
    use time::{Duration, OffsetDateTime, UtcOffset};

    use crate::{
        Error,
        auth::{
            AuthState, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, UserID, auth_guard, auth_guard_hx,
            auth_guard_json, set_auth_cookie,
        },
        endpoints::{self, format_endpoint},
    };

    async fn test_handler() -> Html<&'static str> {
        Html("<h1>Hello, World!</h1>")
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(jar, UserID::new(1), state.cookie_duration, UtcOffset::UTC)
    }

    const TEST_LOG_IN_ROUTE_PATH: &str = "/log_in/{user_id}";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_HX_ROUTE: &str = "/api/hx";
    const TEST_JSON_ROUTE: &str = "/api/json";

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let hash = sha2::Sha512::digest("nafstenoas");
        let state = AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration,
            local_timezone: "Etc/UTC".to_owned(),
        };

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .merge(
                Router::new()
                    .route(TEST_HX_ROUTE, post(test_handler))
                    .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
            )
            .merge(
                Router::new()
                    .route(TEST_JSON_ROUTE, get(test_handler))
                    .route_layer(middleware::from_fn_with_state(
                        state.clone(),
                        auth_guard_json,
                    )),
            )
            .route(TEST_LOG_IN_ROUTE_PATH, post(stub_log_in_route))
            .with_state(state);

        TestServer::new(app)
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(2),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookie() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE_PATH, 1))
            .await;

        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn auth_guard_extends_valid_cookie_duration() {
        let server = get_test_server(Duration::seconds(5));
        let response = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE_PATH, 1))
            .await;
        let jar = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(jar).await;

        let auth_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close(
            auth_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + Duration::seconds(5),
        );
        assert_eq!(auth_cookie.secure(), Some(true));
        assert_eq!(auth_cookie.http_only(), Some(true));
        assert_eq!(auth_cookie.same_site(), Some(SameSite::Strict));
    }

    #[tokio::test]
    async fn get_protected_route_with_no_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        let expected_query =
            serde_urlencoded::to_string([("redirect_url", TEST_PROTECTED_ROUTE)]).unwrap();
        let expected_location = format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query);
        assert_eq!(response.header("location"), expected_location);
    }

    #[tokio::test]
    async fn get_protected_route_with_invalid_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn hx_route_without_cookie_returns_hx_redirect() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server
            .post(TEST_HX_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", "http://localhost/accounts")
            .await;

        response.assert_status_ok();
        let expected_query = serde_urlencoded::to_string([("redirect_url", "/accounts")]).unwrap();
        assert_eq!(
            response.header("hx-redirect"),
            format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query)
        );
    }

    #[tokio::test]
    async fn json_route_without_cookie_returns_401() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.get(TEST_JSON_ROUTE).await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
}

#[cfg(test)]
mod superuser_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, middleware, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::Value;

    use crate::{
        auth::{PasswordHash, Role, Username, create_user},
        db::initialize,
    };

    use super::{SuperuserState, superuser_guard};

    async fn admin_handler() -> &'static str {
        "secret"
    }

    fn get_test_server(role: Role) -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            Username::new("someone").unwrap(),
            PasswordHash::new_unchecked("hash"),
            None,
            role,
            &connection,
        )
        .unwrap();
        let state = SuperuserState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route("/admin/api/thing", get(admin_handler))
            .route_layer(middleware::from_fn_with_state(state, superuser_guard))
            .layer(Extension(user.id));

        TestServer::new(app)
    }

    #[tokio::test]
    async fn superuser_passes() {
        let server = get_test_server(Role::Superuser);

        let response = server.get("/admin/api/thing").await;

        response.assert_status_ok();
        response.assert_text("secret");
    }

    #[tokio::test]
    async fn regular_user_gets_403_json() {
        let server = get_test_server(Role::Regular);

        let response = server.get("/admin/api/thing").await;

        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body, serde_json::json!({"success": false, "error": "Access denied"}));
    }
}
