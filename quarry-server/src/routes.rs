use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use quarry_core::{Metadata, MetadataFilter, NewDocument, SearchResult};
use quarry_retrieval::SearchRequest;
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

/// Query string shared by both search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(rename = "topK")]
    pub top_k: Option<i64>,
    #[serde(rename = "minScore")]
    pub min_score: Option<f32>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        Self {
            id: result.document.id,
            content: result.document.content,
            metadata: result.document.metadata,
            score: result.score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentsBody {
    pub documents: Vec<NewDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentsResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub documents: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;
    let request = search_request(&state, &params)?;
    run_search(&state, request).await
}

/// Same as [`search`], restricted to documents whose `category` equals the
/// given value.
pub async fn search_filtered(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;
    let category = params
        .category
        .clone()
        .ok_or_else(|| ApiError::invalid("category is required"))?;
    let request =
        search_request(&state, &params)?.with_filter(MetadataFilter::eq("category", category));
    run_search(&state, request).await
}

pub async fn add_documents(
    State(state): State<AppState>,
    body: Result<Json<AddDocumentsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AddDocumentsResponse>), ApiError> {
    let Json(body) =
        body.map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
    let ids = state
        .documents
        .add_documents_with(body.documents, &state.call_options())
        .await?;
    Ok((StatusCode::CREATED, Json(AddDocumentsResponse { ids })))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    match state.store.count().await {
        Ok(documents) => (
            StatusCode::OK,
            Json(Health {
                status: "ok".to_string(),
                documents,
            }),
        ),
        Err(error) => {
            tracing::warn!(%error, "health check could not reach the index");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Health {
                    status: "degraded".to_string(),
                    documents: None,
                }),
            )
        }
    }
}

fn search_request(state: &AppState, params: &SearchParams) -> Result<SearchRequest, ApiError> {
    let query = params
        .query
        .clone()
        .ok_or_else(|| ApiError::invalid("query is required"))?;
    let top_k = match params.top_k {
        None => state.settings.default_top_k,
        Some(top_k) if top_k <= 0 => {
            return Err(ApiError::invalid("topK must be greater than zero"));
        }
        Some(top_k) => usize::try_from(top_k).unwrap_or(usize::MAX),
    };

    let request = SearchRequest::new(query, top_k);
    Ok(match params.min_score {
        Some(min_score) => request.with_min_score(min_score),
        None => request,
    })
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let hits = state
        .engine
        .search_with(&request, &state.call_options())
        .await?;
    Ok(Json(hits.into_iter().map(SearchHit::from).collect()))
}
