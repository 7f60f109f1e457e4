use serde::Serialize;
use url::Url;
use worker::{Context, Env, Request, Response, Result, RouteContext, Router};

use crate::batch::extract_batch;
use crate::error::ApiError;
use crate::models::{BatchTableDetectionResult, DetectRequest, Source, SourceResponse, TableData};
use crate::options::DetectorConfig;
use crate::source::classify_source;

pub const CONFIG_VAR: &str = "DETECTOR_CONFIG";
pub const SOURCE_HEADER: &str = "X-Chat-Source";

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: DetectorConfig,
}

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = match load_config(&env) {
        Ok(config) => config,
        Err(error) => {
            worker::console_error!("rejecting request, detector config is invalid: {error}");
            return error.into_response();
        }
    };

    let state = AppState { config };

    Router::with_data(state)
        .post_async("/api/v1/tables", tables_route)
        .post_async("/api/v1/tables/:index", table_route)
        .get_async("/api/v1/source", source_route)
        .run(req, env)
        .await
}

fn load_config(env: &Env) -> Result<DetectorConfig, ApiError> {
    match env.var(CONFIG_VAR) {
        Ok(raw) => Ok(DetectorConfig::from_json(&raw.to_string())?),
        Err(_) => Ok(DetectorConfig::default()),
    }
}

async fn tables_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match tables_response(&mut req, &ctx.data.config).await {
        Ok(response) => tagged_json(&response, response.source),
        Err(error) => error.into_response(),
    }
}

async fn table_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match table_response(&mut req, &ctx).await {
        Ok(response) => tagged_json(&response, response.source),
        Err(error) => error.into_response(),
    }
}

async fn source_route(req: Request, _ctx: RouteContext<AppState>) -> Result<Response> {
    match source_response(&req) {
        Ok(response) => tagged_json(&response, response.source),
        Err(error) => error.into_response(),
    }
}

async fn tables_response(
    req: &mut Request,
    config: &DetectorConfig,
) -> Result<BatchTableDetectionResult, ApiError> {
    let request = parse_detect_request(req).await?;
    let (batch, report) = extract_batch(
        &request.url,
        &request.html,
        request.chat_title,
        config.clone(),
    )?;

    worker::console_log!(
        "detected {} table(s) on {} page via {} ({} issue(s))",
        batch.count,
        batch.source.as_str(),
        report.detector,
        report.issues.len()
    );
    Ok(batch)
}

async fn table_response(
    req: &mut Request,
    ctx: &RouteContext<AppState>,
) -> Result<TableData, ApiError> {
    let index = ctx
        .param("index")
        .ok_or_else(|| ApiError::InvalidTableIndex("missing".to_string()))?
        .parse::<usize>()?;
    let batch = tables_response(req, &ctx.data.config).await?;

    let count = batch.count;
    batch
        .tables
        .into_iter()
        .nth(index)
        .map(|result| result.table)
        .ok_or(ApiError::TableNotFound { index, count })
}

fn source_response(req: &Request) -> Result<SourceResponse, ApiError> {
    let url = page_url_param(req)?;
    let source = classify_source(&url);
    Ok(SourceResponse { url, source })
}

async fn parse_detect_request(req: &mut Request) -> Result<DetectRequest, ApiError> {
    let body = req.text().await?;
    let request = serde_json::from_str::<DetectRequest>(&body)?;
    Url::parse(&request.url)?;
    if request.html.trim().is_empty() {
        return Err(ApiError::EmptyPage);
    }
    Ok(request)
}

fn tagged_json<T>(payload: &T, source: Source) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    let headers = response.headers_mut();
    headers.set("Cache-Control", "no-store")?;
    headers.set(SOURCE_HEADER, source.as_str())?;
    Ok(response)
}

fn page_url_param(req: &Request) -> Result<String, ApiError> {
    req.url()?
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingPageUrl)
}
