use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::auth::{verify_csrf, Requester, RequireAdmin};
use crate::binding::ArticleKey;
use crate::error::{BridgeError, BridgeResult};
use crate::feed::{FeedAssembler, FeedContext};
use crate::forum::PageWindow;
use crate::linkback;
use crate::origin::{request_origin, CorsGrant, Dropped, OriginGate};
use crate::publish::{PublishCoordinator, PublishForm, PublishOutcome};
use crate::reaction::{ReactionKind, ReactionResponse, ReactionToggler};
use crate::redirect;
use crate::reply::{self, ReplyForm};
use crate::settings::{BridgeSettings, SettingsUpdate};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/comments/get/:namespace/:id",
            get(comments_feed).options(preflight),
        )
        .route(
            "/comments/get/:namespace/:id/:page",
            get(comments_feed).options(preflight),
        )
        .route("/comments/reply", post(reply_handler).options(preflight))
        .route("/comments/publish", post(publish_handler).options(preflight))
        .route("/comments/vote", post(vote_handler).options(preflight))
        .route("/comments/bookmark", post(bookmark_handler).options(preflight))
        .route("/api/posts/:pid/linkback", get(post_linkback))
        .route(
            "/api/admin/blog-comments",
            get(admin_settings).post(admin_update_settings),
        )
        .route("/healthz", get(health))
}

// ========== Helpers ==========

/// `{error}` body with the status matching the error.
fn error_response(err: &BridgeError) -> Response {
    (err.status(), Json(json!({ "error": err.to_string() }))).into_response()
}

fn form_error(rejection: &FormRejection) -> BridgeError {
    BridgeError::malformed("body", rejection.body_text())
}

/// Fresh settings snapshot for this request.
async fn load_settings(state: &AppState) -> Result<BridgeSettings, Response> {
    state.services.settings.load().await.map_err(|e| {
        error!(error = %e, "Failed to load bridge settings");
        error_response(&BridgeError::Upstream(e))
    })
}

/// Settings plus the CORS grant, or the response that ends the request.
async fn gate(state: &AppState, headers: &HeaderMap) -> Result<(BridgeSettings, CorsGrant), Response> {
    let settings = load_settings(state).await?;
    let registry = settings.registry();
    let grant = OriginGate::new(&registry)
        .authorize(headers)
        .map_err(|_| Dropped.into_response())?;
    Ok((settings, grant))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

// ========== Widget Routes ==========

async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match gate(&state, &headers).await {
        Ok((_, grant)) => grant.preflight(),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
struct FeedPath {
    namespace: String,
    id: String,
    page: Option<String>,
}

async fn comments_feed(
    State(state): State<AppState>,
    requester: Requester,
    headers: HeaderMap,
    Path(path): Path<FeedPath>,
) -> Response {
    let (settings, grant) = match gate(&state, &headers).await {
        Ok(gated) => gated,
        Err(response) => return response,
    };

    let page = path
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let key = ArticleKey::new(Some(path.namespace.as_str()), path.id);

    let result: BridgeResult<_> = async {
        let tid = state.services.bindings.get(&key).await?;
        let ctx = FeedContext {
            uid: requester.uid,
            window: PageWindow::for_page(page),
            template: state.template.clone(),
            token: requester.csrf_token(),
        };
        FeedAssembler::new(&state.services)
            .assemble(tid, ctx, &settings)
            .await
    }
    .await;

    match result {
        Ok(payload) => grant.wrap(Json(payload)),
        Err(e) => {
            error!(
                error = %e,
                namespace = %key.namespace,
                article_id = %key.article_id,
                "Failed to assemble comment feed"
            );
            grant.wrap(error_response(&e))
        }
    }
}

async fn reply_handler(
    State(state): State<AppState>,
    requester: Requester,
    headers: HeaderMap,
    form: Result<Form<ReplyForm>, FormRejection>,
) -> Response {
    let grant = match gate(&state, &headers).await {
        Ok((_, grant)) => grant,
        Err(response) => return response,
    };

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return grant.wrap(error_response(&form_error(&rejection))),
    };
    let Some(url) = form.url.clone().filter(|u| !u.is_empty()) else {
        return grant.wrap(error_response(&BridgeError::malformed("url", "missing")));
    };

    let outcome = match verify_csrf(&requester, &headers, form.csrf.as_deref()) {
        Ok(()) => reply::submit(state.services.threads.as_ref(), &form, requester.uid).await,
        Err(e) => Err(e),
    };

    let location = match &outcome {
        Ok(_) => redirect::after_reply(&url, None),
        Err(e) => {
            warn!(error = %e, uid = requester.uid, "Reply from embedded widget failed");
            redirect::after_reply(&url, Some(&e.to_string()))
        }
    };

    grant.wrap((StatusCode::FOUND, [(header::LOCATION, location)]))
}

async fn publish_handler(
    State(state): State<AppState>,
    requester: Requester,
    headers: HeaderMap,
    form: Result<Form<PublishForm>, FormRejection>,
) -> Response {
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    // Publish answers untrusted origins too, just without CORS headers.
    let registry = settings.registry();
    let grant = OriginGate::new(&registry).authorize(&headers).ok();

    let result = async {
        let Form(form) = form.map_err(|rejection| form_error(&rejection))?;
        verify_csrf(&requester, &headers, form.csrf.as_deref())?;
        let request = form.into_request(
            requester.uid,
            request_origin(&headers).map(str::to_string),
            header_str(&headers, header::REFERER),
        )?;
        PublishCoordinator::new(&state.services)
            .publish(&request, &settings)
            .await
    }
    .await;

    let response = match result {
        Ok(outcome) => {
            if let PublishOutcome::Degraded { tid, failures, .. } = &outcome {
                warn!(tid, failures = failures.len(), "Publish completed with failures");
            }
            (
                StatusCode::FOUND,
                [(header::LOCATION, outcome.redirect().to_string())],
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, uid = requester.uid, "Publish failed");
            error_response(&e)
        }
    };

    match grant {
        Some(grant) => grant.wrap(response),
        None => response,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactionForm {
    to_pid: Option<String>,
    is_upvote: Option<String>,
    is_bookmark: Option<String>,
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
}

impl ReactionForm {
    fn direction(&self, kind: ReactionKind) -> Option<&str> {
        match kind {
            ReactionKind::Vote => self.is_upvote.as_deref(),
            ReactionKind::Bookmark => self.is_bookmark.as_deref(),
        }
    }
}

async fn vote_handler(
    State(state): State<AppState>,
    requester: Requester,
    headers: HeaderMap,
    form: Result<Form<ReactionForm>, FormRejection>,
) -> Response {
    toggle_reaction(&state, &requester, &headers, form, ReactionKind::Vote).await
}

async fn bookmark_handler(
    State(state): State<AppState>,
    requester: Requester,
    headers: HeaderMap,
    form: Result<Form<ReactionForm>, FormRejection>,
) -> Response {
    toggle_reaction(&state, &requester, &headers, form, ReactionKind::Bookmark).await
}

async fn toggle_reaction(
    state: &AppState,
    requester: &Requester,
    headers: &HeaderMap,
    form: Result<Form<ReactionForm>, FormRejection>,
    kind: ReactionKind,
) -> Response {
    let grant = match gate(state, headers).await {
        Ok((_, grant)) => grant,
        Err(response) => return response,
    };

    let result = async {
        let Form(form) = form.map_err(|rejection| form_error(&rejection))?;
        verify_csrf(requester, headers, form.csrf.as_deref())?;
        ReactionToggler::new(state.services.reactions.as_ref())
            .toggle(
                kind,
                form.direction(kind),
                form.to_pid.as_deref(),
                requester.uid,
            )
            .await
    }
    .await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, ?kind, uid = requester.uid, "Reaction toggle failed");
            e.status()
        }
    };

    grant.wrap((status, Json(ReactionResponse::from(&result))))
}

// ========== Forum Routes ==========

async fn post_linkback(State(state): State<AppState>, Path(pid): Path<i64>) -> Response {
    let result = async {
        let settings = state.services.settings.load().await?;
        linkback::for_post(state.services.threads.as_ref(), pid, &settings).await
    }
    .await;

    match result {
        Ok(linkback) => Json(json!({ "linkback": linkback })).into_response(),
        Err(e) => {
            error!(error = %e, pid, "Failed to build linkback");
            error_response(&e)
        }
    }
}

async fn admin_settings(State(state): State<AppState>, _admin: RequireAdmin) -> Response {
    match load_settings(&state).await {
        Ok(settings) => Json(settings).into_response(),
        Err(response) => response,
    }
}

async fn admin_update_settings(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    headers: HeaderMap,
    form: Result<Form<SettingsUpdate>, FormRejection>,
) -> Response {
    let result = async {
        let Form(update) = form.map_err(|rejection| form_error(&rejection))?;
        verify_csrf(&admin, &headers, update.csrf.as_deref())?;
        for (key, value) in update.pairs() {
            state.services.settings.set(key, &value).await?;
        }
        info!(uid = admin.uid, "Blog comments settings updated");
        Ok::<_, BridgeError>(state.services.settings.load().await?)
    }
    .await;

    match result {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => {
            warn!(error = %e, uid = admin.uid, "Settings update rejected");
            error_response(&e)
        }
    }
}

// ========== Health ==========

async fn health() -> &'static str {
    "OK"
}
