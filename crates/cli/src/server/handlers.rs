use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use landing_kit_core::{Brief, EditRequest};
use landing_kit_deployer::{Deployer, FirebaseTarget, NetlifyTarget, PublishTarget};
use landing_kit_generator::{PromptPair, build_edit_prompt, build_generation_prompt};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub brief: Option<Brief>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(default)]
    pub html_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseDeployRequest {
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

/// Generated document wrapped the way browser clients already parse
/// Gemini responses: `candidates[0].content.parts[0].text`.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

impl GenerationResponse {
    pub fn from_text(text: String) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part { text }],
                },
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub message: String,
    pub url: String,
}

pub async fn index() -> &'static str {
    "Landing Kit API is up and running"
}

pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let Json(request) = payload?;
    let brief = request
        .brief
        .ok_or_else(|| ApiError::validation("Brief is incomplete: missing 'brief'"))?;

    let report = landing_kit_validator::validate_brief(&brief);
    if !report.is_valid() {
        return Err(ApiError::Validation {
            message: "Brief is incomplete".to_string(),
            details: Some(report.summary()),
        });
    }
    for warning in &report.warnings {
        tracing::warn!(%warning, "brief accepted with warning");
    }

    let prompts = build_generation_prompt(&brief)?;
    tracing::info!(product = brief.product_name().unwrap_or_default(), "generating landing page");
    run_generation(&state, &prompts).await
}

pub async fn edit(
    State(state): State<AppState>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let Json(request) = payload?;
    let (current_code, instruction) = landing_kit_validator::validate_edit_request(&request)?;

    let prompts = build_edit_prompt(current_code, instruction);
    tracing::info!(code_bytes = current_code.len(), "editing landing page");
    run_generation(&state, &prompts).await
}

async fn run_generation(state: &AppState, prompts: &PromptPair) -> Result<Json<GenerationResponse>, ApiError> {
    let generator = state.generator()?;
    let text = generator.generate(prompts).await?;
    Ok(Json(GenerationResponse::from_text(text)))
}

pub async fn deploy_netlify(
    State(state): State<AppState>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError> {
    let Json(request) = payload?;
    let html = required(request.html_content.as_deref(), "htmlContent")?;

    let api = state.netlify()?;
    publish(PublishTarget::Netlify(NetlifyTarget::new(api)), html).await
}

pub async fn deploy_firebase(
    State(state): State<AppState>,
    payload: Result<Json<FirebaseDeployRequest>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError> {
    let Json(request) = payload?;
    let html = required(request.html_content.as_deref(), "htmlContent")?;
    let site_id = required(request.site_id.as_deref(), "siteId")?;
    landing_kit_validator::validate_site_id(site_id)?;

    let target = FirebaseTarget::new(
        state.hosting.clone(),
        state.firebase_auth.clone(),
        state.firebase_project.clone(),
        site_id,
    );
    publish(PublishTarget::Firebase(target), html).await
}

async fn publish(target: PublishTarget, html: &str) -> Result<Json<DeployResponse>, ApiError> {
    let provider = target.provider();
    tracing::info!(%provider, bytes = html.len(), "publishing landing page");

    let result = target.deploy(html).await?;
    Ok(Json(DeployResponse {
        message: format!("{} deploy succeeded!", provider),
        url: result.url,
    }))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| landing_kit_core::Error::MissingField(field.to_string()).into())
}
