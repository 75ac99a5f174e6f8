use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use esync_domain::{CompanyState, DriveChannelState, TenantId};
use esync_drive::parse_folder_id;
use esync_embed::ModelHint;
use esync_engine::BatchTask;
use esync_search::SearchIndex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::trigger::{parse_trigger, Trigger};

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.artifacts.list("").await?;
    Ok(StatusCode::OK)
}

// ── Vectorize ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VectorizeBody {
    pub uuid: TenantId,
    pub drive_url: String,
    pub use_embed_v4: Option<bool>,
}

pub async fn post_vectorize(
    State(state): State<AppState>,
    Json(body): Json<VectorizeBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let handle = state
        .dispatcher
        .dispatch_single(&body.uuid, &body.drive_url, body.use_embed_v4.unwrap_or(false))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "vectorize run dispatched",
            "execution_info": handle.to_string(),
            "job_name": format!("sync-{}", body.uuid),
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VectorizeBatchTask {
    pub uuid: TenantId,
    pub drive_url: String,
    #[allow(dead_code)]
    pub company_name: Option<String>,
    #[allow(dead_code)]
    pub use_embed_v4: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VectorizeBatchBody {
    pub tasks: Vec<VectorizeBatchTask>,
}

pub async fn post_vectorize_batch(
    State(state): State<AppState>,
    Json(body): Json<VectorizeBatchBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task_count = body.tasks.len();
    let tasks: Vec<BatchTask> = body
        .tasks
        .into_iter()
        .map(|t| BatchTask {
            uuid: t.uuid,
            drive_url: t.drive_url,
        })
        .collect();

    state.dispatcher.dispatch_batch(&tasks)?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "task_count": task_count }))))
}

// ── Search ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub uuid: TenantId,
    pub q: Option<String>,
    pub top_k: Option<usize>,
    /// Legacy alias for `top_k`.
    pub top_n: Option<usize>,
    pub trigger: Option<String>,
    /// Legacy alias for `trigger`.
    pub search_model: Option<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

const DEFAULT_TOP_K: usize = 10;

async fn run_search(state: AppState, params: SearchParams) -> Result<Json<Value>, ApiError> {
    let trigger_raw = params
        .trigger
        .as_deref()
        .or(params.search_model.as_deref())
        .ok_or_else(|| ApiError::bad_request("missing trigger"))?;
    let trigger = parse_trigger(trigger_raw).ok_or_else(|| ApiError::bad_request(format!("invalid trigger: {trigger_raw}")))?;

    let top_k = params.top_k.or(params.top_n).unwrap_or(DEFAULT_TOP_K);
    let exclude: HashSet<String> = params.exclude_files.into_iter().collect();

    let index = SearchIndex::load(&state.artifacts, &params.uuid).await?;

    let hits = match trigger {
        Trigger::Standard | Trigger::Shuffle => {
            let q = params.q.ok_or_else(|| ApiError::bad_request("missing q"))?;
            let translated = state
                .translator
                .translate_to_english(&q)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "query translation failed, falling back to original text");
                    q
                });
            let query_embedding = state.embedder.embed_text(&translated, ModelHint::TextV3).await?;
            if trigger == Trigger::Standard {
                index.search_ranked(&query_embedding, top_k, &exclude)
            } else {
                index.search_shuffle(&query_embedding, top_k, None, &exclude)
            }
        }
        Trigger::Random => index.search_random(top_k, &exclude),
    };

    Ok(Json(json!({ "results": hits })))
}

pub async fn get_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    run_search(state, params).await
}

pub async fn post_search(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    run_search(state, params).await
}

// ── Drive watch ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WatchBody {
    pub uuid: TenantId,
    pub drive_url: String,
    pub company_name: Option<String>,
    pub callback_url: Option<String>,
    pub use_embed_v4: Option<bool>,
}

pub async fn post_drive_watch(
    State(state): State<AppState>,
    Json(body): Json<WatchBody>,
) -> Result<Json<Value>, ApiError> {
    let folder_id = parse_folder_id(&body.drive_url).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let drive_id = state.drive.get_drive_id(&folder_id).await?;

    let existing = state.watch_state.load_channel(drive_id.as_deref()).await?;
    let now = Utc::now();

    let (channel, is_new_channel, drive_channel_created) = match existing {
        Some(channel) if channel.expiration > now => (channel, false, false),
        _ => {
            let callback_url = body
                .callback_url
                .clone()
                .or_else(|| state.config.drive_watch_callback_url.clone())
                .ok_or_else(|| ApiError::bad_request("no callback_url configured or supplied"))?;
            let page_token = state.drive.get_start_page_token(drive_id.as_deref()).await?;
            let channel_id = Uuid::new_v4();
            let handle = state
                .drive
                .watch_create(&page_token, drive_id.as_deref(), &callback_url, channel_id, state.config.drive_watch_ttl_seconds)
                .await?;
            let channel = DriveChannelState {
                drive_id: drive_id.clone(),
                channel_id,
                resource_id: handle.resource_id,
                expiration: handle.expiration,
                page_token,
            };
            state.watch_state.save_channel(&channel).await?;
            (channel, true, true)
        }
    };

    let company = CompanyState {
        uuid: body.uuid,
        drive_url: body.drive_url,
        folder_id,
        drive_id: drive_id.clone(),
        use_embed_v4: body.use_embed_v4.unwrap_or(false),
        last_job_trigger_ts: None,
    };
    state.watch_state.save_company(&company).await?;

    if let Some(name) = &body.company_name {
        warn!(uuid = %company.uuid, company_name = %name, "company_name is accepted but not persisted by the watch state store");
    }

    Ok(Json(json!({
        "channel_id": channel.channel_id,
        "resource_id": channel.resource_id,
        "expiration": channel.expiration,
        "drive_id": channel.drive_id,
        "is_new_channel": is_new_channel,
        "drive_channel_created": drive_channel_created,
    })))
}

pub async fn delete_drive_watch(
    State(state): State<AppState>,
    Path(uuid): Path<TenantId>,
) -> Result<Json<Value>, ApiError> {
    let company = state
        .watch_state
        .load_company(&uuid)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("company '{uuid}' not found")))?;

    state.watch_state.delete_company(&uuid).await?;

    let remaining = state.watch_state.list_companies_for_drive(company.drive_id.as_deref()).await?;
    let mut stopped = false;
    if remaining.is_empty() {
        if let Some(channel) = state.watch_state.load_channel(company.drive_id.as_deref()).await? {
            state.drive.watch_stop(channel.channel_id, &channel.resource_id).await?;
            state.watch_state.delete_channel(company.drive_id.as_deref()).await?;
            stopped = true;
        }
    }

    Ok(Json(json!({ "stopped": stopped })))
}

// ── Drive notifications ───────────────────────────────────────────────────────

pub async fn post_drive_notifications(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let channel_id = headers
        .get("X-Goog-Channel-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());
    let Some(channel_id) = channel_id else {
        warn!("notification missing or malformed X-Goog-Channel-Id");
        return StatusCode::NO_CONTENT;
    };

    let resource_state = headers
        .get("X-Goog-Resource-State")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let changed_types: Option<Vec<String>> = headers
        .get("X-Goog-Changed")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').map(str::trim).map(str::to_string).collect());

    match state.router.handle(channel_id, &resource_state, changed_types.as_deref()).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "notification processed");
        }
        Err(e) => {
            warn!(error = %e, "notification router failed");
        }
    }

    StatusCode::NO_CONTENT
}

// ── Re-register ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ReRegisterBody {
    pub uuids: Option<Vec<TenantId>>,
}

pub async fn post_drive_watch_reregister(
    State(state): State<AppState>,
    Json(body): Json<ReRegisterBody>,
) -> Result<Json<Value>, ApiError> {
    let companies = match body.uuids {
        Some(uuids) => {
            let mut out = Vec::with_capacity(uuids.len());
            for uuid in uuids {
                if let Some(company) = state.watch_state.load_company(&uuid).await? {
                    out.push(company);
                }
            }
            out
        }
        None => state.watch_state.list_all_companies().await?,
    };

    let mut drive_ids: Vec<Option<String>> = companies.into_iter().map(|c| c.drive_id).collect();
    drive_ids.sort();
    drive_ids.dedup();

    let mut re_registered = 0usize;
    for drive_id in drive_ids {
        let Some(callback_url) = state.config.drive_watch_callback_url.clone() else {
            warn!("skipping re-registration, no callback_url configured");
            continue;
        };
        if let Some(old) = state.watch_state.load_channel(drive_id.as_deref()).await? {
            let _ = state.drive.watch_stop(old.channel_id, &old.resource_id).await;
        }
        let page_token = state.drive.get_start_page_token(drive_id.as_deref()).await?;
        let channel_id = Uuid::new_v4();
        let handle = state
            .drive
            .watch_create(&page_token, drive_id.as_deref(), &callback_url, channel_id, state.config.drive_watch_ttl_seconds)
            .await?;
        let channel = DriveChannelState {
            drive_id: drive_id.clone(),
            channel_id,
            resource_id: handle.resource_id,
            expiration: handle.expiration,
            page_token,
        };
        state.watch_state.save_channel(&channel).await?;
        re_registered += 1;
    }

    Ok(Json(json!({ "channels_re_registered": re_registered })))
}

// ── Auto-update (scheduler trigger) ───────────────────────────────────────────

pub async fn post_auto_update(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let report = state.scheduler.run_once().await?;
    Ok(Json(json!(report)))
}
