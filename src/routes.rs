// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{ai, auth, quizzes, session},
    state::AppState,
    utils::jwt::{auth_middleware, optional_auth_middleware},
};

/// Uploaded documents may be scanned PDFs.
const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Auth, quiz management and AI routes require a bearer token.
/// * Session routes accept users, guests and anonymous callers.
/// * Live polling routes are public.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let ai_routes = Router::new()
        .route("/generate", post(ai::generate))
        .route("/review", post(ai::review))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let quiz_routes = Router::new()
        .route(
            "/api/quizzes",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/api/quizzes/{code}",
            get(quizzes::dashboard).delete(quizzes::delete_quiz),
        )
        .route("/api/quizzes/{code}/end", post(quizzes::end_session))
        .route(
            "/api/quizzes/{code}/history",
            get(quizzes::history).delete(quizzes::delete_history),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let session_routes = Router::new()
        .route("/api/sessions/join", post(session::join_session))
        .route("/api/quizzes/{code}/play", get(session::play))
        .route("/api/quizzes/{code}/submit", post(session::submit_answers))
        .route("/api/quizzes/{code}/results", get(session::results))
        .route("/api/quizzes/{code}/check_answers", get(session::check_answers))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let live_routes = Router::new()
        .route("/api/quizzes/{code}/live_count", get(session::live_count))
        .route("/api/quizzes/{code}/live_scoreboard", get(session::live_scoreboard))
        .route(
            "/api/quizzes/{code}/live_participants",
            get(session::live_participants),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/ai", ai_routes)
        .merge(quiz_routes)
        .merge(session_routes)
        .merge(live_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
