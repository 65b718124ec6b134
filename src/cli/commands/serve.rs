//! Web interface and HTTP API.
//!
//! Serves the search page plus JSON and server-sent-event endpoints. Every
//! request runs its own pipeline; the only shared state is read-only.

use crate::cli::Output;
use crate::config::Settings;
use crate::dataset::load_guest_list;
use crate::orchestrator::{Orchestrator, SearchOutcome};
use crate::present::{guest_notice, html, render_cards, AnswerSlot};
use crate::rag::{Answer, ContextStatus};
use crate::retrieval::GuestFilter;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
    guests: Vec<String>,
    show_name: String,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, guests: Vec<String>) -> Self {
        let show_name = orchestrator
            .prompts()
            .variables
            .get("show_name")
            .cloned()
            .unwrap_or_else(|| "Podcast".to_string());

        Self {
            orchestrator,
            guests,
            show_name,
        }
    }
}

/// Build the router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(page))
        .route("/health", get(health))
        .route("/guests", get(guests))
        .route("/ask", post(ask))
        .route("/ask/stream", post(ask_stream))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let guests = match load_guest_list(&settings.data_path()) {
        Ok(guests) => guests,
        Err(e) => {
            Output::warning(&format!("Guest selector disabled: {}", e));
            Vec::new()
        }
    };

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState::new(orchestrator, guests));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("podquery server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Search page", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Guests", "GET  /guests");
    Output::kv("Ask", "POST /ask");
    Output::kv("Ask (SSE)", "POST /ask/stream");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct PageParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    guest: Option<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    guest: Option<String>,
}

#[derive(Serialize)]
struct GuestsResponse {
    guests: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn guests(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(GuestsResponse {
        guests: state.guests.clone(),
    })
}

async fn page(State(state): State<Arc<AppState>>, Query(params): Query<PageParams>) -> Html<String> {
    let filter = GuestFilter::new(params.guest);
    let query = params.q.unwrap_or_default();

    let report = if query.trim().is_empty() {
        None
    } else {
        // The page is rendered in one piece, so the answer is collected first.
        Some(state.orchestrator.ask_with(&query, &filter, false, |_| {}).await)
    };

    Html(html::render_page(
        &state.show_name,
        &state.guests,
        filter.guest(),
        report.as_ref(),
    ))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    if req.question.trim().is_empty() {
        return bad_request("Question is required");
    }

    let filter = GuestFilter::new(req.guest);
    let report = state.orchestrator.ask_with(&req.question, &filter, false, |_| {}).await;
    Json(report).into_response()
}

async fn ask_stream(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    if req.question.trim().is_empty() {
        return bad_request("Question is required");
    }

    let filter = GuestFilter::new(req.guest);
    let events = answer_events(&state, &req.question, &filter).await;
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// Event sequence for one streamed interaction: `results`, then `delta`s or an `error`, then `done`.
async fn answer_events(
    state: &AppState,
    question: &str,
    filter: &GuestFilter,
) -> BoxStream<'static, Result<Event, Infallible>> {
    let (head, body) = match state.orchestrator.search(question, filter).await {
        Ok(outcome) => {
            let mut head = vec![results_event(&outcome, filter)];
            let body = match outcome.status {
                ContextStatus::Selected => answer_body(state, &outcome).await,
                ContextStatus::Overflow => {
                    head.push(error_event(&AnswerSlot::NoContext));
                    stream::empty().boxed()
                }
                ContextStatus::NoResults => {
                    head.push(error_event(&AnswerSlot::NoResults));
                    stream::empty().boxed()
                }
            };
            (head, body)
        }
        Err(e) => {
            warn!("Search failed: {}", e);
            let head = vec![error_event(&AnswerSlot::for_search_error(&e))];
            (head, stream::empty().boxed())
        }
    };

    stream::iter(head)
        .chain(body)
        .chain(stream::once(async { sse_event("done", serde_json::json!({})) }))
        .map(Ok::<Event, Infallible>)
        .boxed()
}

async fn answer_body(state: &AppState, outcome: &SearchOutcome) -> BoxStream<'static, Event> {
    let fallback = state.orchestrator.settings().generation.fallback_message.clone();

    match state.orchestrator.generate(outcome, true).await {
        Ok(Answer::Complete(text)) => stream::once(async move { delta_event(&text) }).boxed(),
        Ok(Answer::Stream(chunks)) => stream::unfold(Some(chunks), move |chunks| {
            let fallback = fallback.clone();
            async move {
                let mut chunks = chunks?;
                match chunks.next().await {
                    Some(Ok(text)) => Some((delta_event(&text), Some(chunks))),
                    Some(Err(e)) => {
                        warn!("Answer stream failed: {}", e);
                        // Stop after the error event.
                        Some((error_event(&AnswerSlot::Fallback(fallback)), None))
                    }
                    None => None,
                }
            }
        })
        .boxed(),
        Err(e) => {
            warn!("Answer generation failed: {}", e);
            let event = error_event(&AnswerSlot::Fallback(fallback));
            stream::once(async move { event }).boxed()
        }
    }
}

fn sse_event(name: &str, data: serde_json::Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

fn results_event(outcome: &SearchOutcome, filter: &GuestFilter) -> Event {
    sse_event(
        "results",
        serde_json::json!({
            "request_id": outcome.request_id,
            "guest_notice": guest_notice(filter),
            "status": outcome.status,
            "cards": render_cards(&outcome.ranked),
        }),
    )
}

fn delta_event(text: &str) -> Event {
    sse_event("delta", serde_json::json!({ "content": text }))
}

fn error_event(slot: &AnswerSlot) -> Event {
    let kind = match slot {
        AnswerSlot::SearchUnavailable(_) => "search_unavailable",
        AnswerSlot::NoContext => "no_context",
        AnswerSlot::NoResults => "no_results",
        AnswerSlot::InvalidQuestion(_) => "invalid_input",
        AnswerSlot::Failed(_) => "failed",
        AnswerSlot::Fallback(_) | AnswerSlot::Answered(_) => "generation",
    };
    sse_event("error", serde_json::json!({ "kind": kind, "message": slot.message() }))
}
