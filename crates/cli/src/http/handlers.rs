//! Request handlers. Each one forwards to a single `BucketGateway` operation
//! and renders its outcome as a plain-text body or an archive stream.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bgw_core::{BucketGateway, BulkReport, FolderArchive};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::error::AppError;
use crate::commands::put::guess_content_type;

/// `?from=&to=` for the rename endpoints
#[derive(Debug, Deserialize)]
pub struct RenameQuery {
    pub from: String,
    pub to: String,
}

/// `PUT /objects/{*key}`: spool the body to disk, then upload without overwriting
pub async fn upload_object(
    State(gateway): State<BucketGateway>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| guess_content_type(std::path::Path::new(&key)));

    let spool = match &gateway.settings().scratch_dir {
        Some(dir) => tempfile::Builder::new()
            .prefix("bgw-upload-")
            .tempfile_in(dir)?,
        None => tempfile::Builder::new().prefix("bgw-upload-").tempfile()?,
    };

    let mut file = tokio::fs::File::from_std(spool.reopen()?);
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| AppError::bad_request(format!("reading request body: {e}")))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    gateway.upload_file(&key, spool.path(), &content_type).await?;

    Ok(text(StatusCode::CREATED, format!("File: '{key}' uploaded")))
}

/// `GET /objects/{*key}`: redirect to a presigned URL
pub async fn download_object(
    State(gateway): State<BucketGateway>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let presigned = gateway.download_file(&key).await?;
    let location = HeaderValue::from_str(&presigned.url)
        .map_err(|e| AppError::internal(format!("presigned URL is not a valid header: {e}")))?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// `DELETE /objects/{*key}`
pub async fn delete_object(
    State(gateway): State<BucketGateway>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    gateway.delete_file(&key).await?;
    Ok(text(StatusCode::OK, format!("File: '{key}' deleted")))
}

/// `POST /rename?from=&to=`
pub async fn rename_object(
    State(gateway): State<BucketGateway>,
    Query(query): Query<RenameQuery>,
) -> Result<Response, AppError> {
    gateway.rename_file(&query.from, &query.to).await?;
    Ok(text(
        StatusCode::OK,
        format!("File: '{}' renamed to '{}'", query.from, query.to),
    ))
}

/// `GET /folders/{*dir}`
pub async fn download_folder(
    State(gateway): State<BucketGateway>,
    Path(dir): Path<String>,
) -> Result<Response, AppError> {
    let archive = gateway.download_folder(&dir).await?;
    archive_response(archive).await
}

/// `GET /bucket`
pub async fn download_bucket(State(gateway): State<BucketGateway>) -> Result<Response, AppError> {
    let archive = gateway.download_bucket(None).await?;
    archive_response(archive).await
}

/// `DELETE /folders/{*dir}`
pub async fn delete_folder(
    State(gateway): State<BucketGateway>,
    Path(dir): Path<String>,
) -> Result<Response, AppError> {
    let report = gateway.delete_folder(&dir).await?;
    Ok(bulk_response("delete", "Deleted", &dir, &report))
}

/// `POST /rename-folder?from=&to=`
pub async fn rename_folder(
    State(gateway): State<BucketGateway>,
    Query(query): Query<RenameQuery>,
) -> Result<Response, AppError> {
    let report = gateway.rename_folder(&query.from, &query.to).await?;
    Ok(bulk_response("rename", "Renamed", &query.from, &report))
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn archive_response(archive: FolderArchive) -> Result<Response, AppError> {
    let file_name = archive.file_name().to_string();
    let size = archive.size();
    let disposition = HeaderValue::from_str(&format!("attachment; filename={file_name}"))
        .map_err(|e| AppError::internal(format!("archive name is not a valid header: {e}")))?;

    let stream = archive.into_stream().await?;

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("content-description"),
        HeaderValue::from_static("File Transfer"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}

fn bulk_response(verb: &str, past: &str, folder: &str, report: &BulkReport) -> Response {
    let total = report.items.len();
    let succeeded = report.succeeded();

    if report.all_succeeded() {
        return text(
            StatusCode::OK,
            format!("{past} {succeeded} object(s) under '{folder}/'"),
        );
    }

    let mut body = format!(
        "Failed to {verb} {} of {total} object(s) under '{folder}/'",
        total - succeeded
    );
    for item in report.failures() {
        body.push('\n');
        body.push_str(&item.key);
        body.push_str(": ");
        body.push_str(item.message.as_deref().unwrap_or("failed"));
    }
    text(StatusCode::INTERNAL_SERVER_ERROR, body)
}
