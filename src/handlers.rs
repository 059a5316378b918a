// src/handlers.rs
use crate::{AppState, errors::LensError, pipeline::RunOptions};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::info;
use serde::Deserialize;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/upload", web::post().to(upload_image))
            .route("/fetch", web::post().to(fetch_image))
            .route("/open-file", web::post().to(open_file))
            .route("/session", web::get().to(get_session))
            .route("/pipeline/start", web::post().to(start_pipeline))
            .route("/pipeline/reset", web::post().to(reset_pipeline))
            .route("/history", web::get().to(list_history))
            .route("/history/{id}/open", web::post().to(open_history))
            .route("/history/{id}", web::delete().to(delete_history)),
    )
    .route("/health", web::get().to(health_check));
}

pub async fn upload_image(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    while let Some(mut field) = payload.try_next().await? {
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or("upload")
            .to_string();

        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }
        if image_data.is_empty() {
            continue;
        }

        let image = data
            .ingestor
            .from_bytes(&image_data)
            .map_err(LensError::from)?;
        info!("Received {} ({})", filename, image.mime_type());

        let snapshot = data.pipeline.stage(image).await?;
        return Ok(HttpResponse::Ok().json(snapshot.as_ref()));
    }

    Err(LensError::Validation("No image file in upload".to_string()).into())
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub url: String,
}

pub async fn fetch_image(
    data: web::Data<AppState>,
    body: web::Json<FetchRequest>,
) -> Result<HttpResponse, LensError> {
    if body.url.trim().is_empty() {
        return Err(LensError::Validation("url must not be empty".to_string()));
    }

    let image = data.ingestor.from_url(&body.url).await?;
    let snapshot = data.pipeline.stage(image).await?;

    Ok(HttpResponse::Ok().json(snapshot.as_ref()))
}

#[derive(Debug, Deserialize)]
pub struct OpenFileRequest {
    pub path: String,
}

/// Stages a picture that is already on this machine's disk.
pub async fn open_file(
    data: web::Data<AppState>,
    body: web::Json<OpenFileRequest>,
) -> Result<HttpResponse, LensError> {
    if body.path.trim().is_empty() {
        return Err(LensError::Validation("path must not be empty".to_string()));
    }

    let image = data.ingestor.from_file(body.path.trim()).await?;
    info!("Opened {} ({})", body.path.trim(), image.mime_type());
    let snapshot = data.pipeline.stage(image).await?;

    Ok(HttpResponse::Ok().json(snapshot.as_ref()))
}

pub async fn get_session(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.pipeline.snapshot().await.as_ref())
}

/// Accepts the staged image and runs the pipeline in the background; the
/// caller polls `/session` for progress.
pub async fn start_pipeline(
    data: web::Data<AppState>,
    options: Option<web::Json<RunOptions>>,
) -> Result<HttpResponse, LensError> {
    let options = options.map(|json| json.into_inner()).unwrap_or_default();
    let image = data
        .pipeline
        .snapshot()
        .await
        .original_image
        .clone()
        .ok_or_else(|| LensError::Validation("No image staged; upload or fetch one first".to_string()))?;

    let snapshot = data.pipeline.start(image, options).await?;
    Ok(HttpResponse::Accepted().json(snapshot.as_ref()))
}

pub async fn reset_pipeline(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.pipeline.reset().await.as_ref())
}

pub async fn list_history(data: web::Data<AppState>) -> Result<HttpResponse, LensError> {
    let items = data.pipeline.refresh_history().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "items": items.as_ref(),
        "count": items.len()
    })))
}

pub async fn open_history(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, LensError> {
    let snapshot = data.pipeline.open_history(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot.as_ref()))
}

pub async fn delete_history(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, LensError> {
    let items = data.pipeline.delete_history(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "items": items.as_ref(),
        "count": items.len()
    })))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "gourmet-lens",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
