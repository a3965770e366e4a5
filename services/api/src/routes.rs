use crate::infra::AppState;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::json;
use tenant_arrears::error::AppError;
use tenant_arrears::workflows::arrears::{ArrearsReportSummary, ReportRow, RowWarning};
use tracing::info;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

pub(crate) fn arrears_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/arrears/report",
            post(arrears_report_endpoint).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// The two workbooks posted as `arrears` and `residents` multipart fields.
struct ReportUploads {
    arrears: Bytes,
    residents: Bytes,
}

impl ReportUploads {
    async fn collect(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut arrears = None;
        let mut residents = None;

        while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
            let name = field.name().map(str::to_owned);
            let bytes = field.bytes().await.map_err(upload_error)?;
            match name.as_deref() {
                Some("arrears") => arrears = Some(bytes),
                Some("residents") => residents = Some(bytes),
                _ => {}
            }
        }

        Ok(Self {
            arrears: arrears.ok_or_else(|| missing_field("arrears"))?,
            residents: residents.ok_or_else(|| missing_field("residents"))?,
        })
    }
}

fn upload_error(err: MultipartError) -> AppError {
    AppError::Upload(err.to_string())
}

fn missing_field(name: &str) -> AppError {
    AppError::Upload(format!("missing '{name}' file field"))
}

/// JSON view of a merge, returned instead of the workbook when the client
/// asks for `application/json`.
#[derive(Debug, Serialize)]
struct ReportPreview<'a> {
    file_name: &'a str,
    summary: ArrearsReportSummary,
    warnings: &'a [RowWarning],
    rows: &'a [ReportRow],
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("application/json"))
}

fn content_disposition(file_name: &str, date: NaiveDate) -> String {
    format!(
        "attachment; filename=\"arrears-report-{}.xlsx\"; filename*=UTF-8''{}",
        date.format("%Y-%m-%d"),
        urlencoding::encode(file_name)
    )
}

pub(crate) async fn arrears_report_endpoint(
    Extension(state): Extension<AppState>,
    request_headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let uploads = ReportUploads::collect(&mut multipart).await?;
    let generated = state
        .generator
        .generate(&uploads.arrears, &uploads.residents)?;

    let summary = generated.report.summary();
    let today = Local::now().date_naive();
    let file_name = state.generator.report_file_name(today);
    info!(%file_name, rows = summary.rows_written, "serving arrears report");

    if wants_json(&request_headers) {
        let preview = ReportPreview {
            file_name: &file_name,
            summary,
            warnings: &generated.report.warnings,
            rows: &generated.report.rows,
        };
        return Ok(Json(preview).into_response());
    }

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&file_name, today),
        ),
        (
            HeaderName::from_static("x-report-rows"),
            summary.rows_written.to_string(),
        ),
        (
            HeaderName::from_static("x-report-unmatched"),
            summary.unmatched_residents.to_string(),
        ),
        (
            HeaderName::from_static("x-report-warnings"),
            summary.warnings.to_string(),
        ),
    ];

    Ok((StatusCode::OK, headers, generated.workbook).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rust_xlsxwriter::Workbook;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tenant_arrears::config::DEFAULT_RESIDENT_SHEET;
    use tenant_arrears::workflows::arrears::ArrearsReportGenerator;
    use tower::ServiceExt;

    const BOUNDARY: &str = "arrears-test-boundary";

    fn build_router(ready: bool) -> Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            generator: Arc::new(ArrearsReportGenerator::default()),
        };
        arrears_routes().layer(Extension(state))
    }

    fn arrears_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 2, "代碼").expect("header");
        sheet.write_string(1, 2, "530902").expect("code");
        sheet
            .write_string(1, 7, "2026/01/31~2026/01/31")
            .expect("period");
        sheet.write_number(1, 10, 1500).expect("amount");
        sheet.write_string(2, 2, "530903").expect("code");
        sheet.write_string(2, 7, "2026/01/31").expect("period");
        sheet.write_string(2, 10, "待確認").expect("amount");
        workbook.save_to_buffer().expect("save")
    }

    fn resident_workbook(sheet_name: &str) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).expect("sheet name");
        sheet.write_string(0, 2, "地址").expect("header");
        sheet
            .write_string(1, 2, "新北市新店區中央路153號9樓之2")
            .expect("address");
        sheet.write_string(1, 7, "王小明").expect("name");
        sheet.write_string(1, 8, "0912345678").expect("phone");
        workbook.save_to_buffer().expect("save")
    }

    fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.xlsx\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(parts: &[(&str, &[u8])]) -> Request<Body> {
        upload_request_accepting(parts, "*/*")
    }

    fn upload_request_accepting(parts: &[(&str, &[u8])], accept: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(header::ACCEPT, accept)
            .uri("/api/v1/arrears/report")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("request")
    }

    async fn read_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn upload_returns_report_workbook() {
        let arrears = arrears_workbook();
        let residents = resident_workbook(DEFAULT_RESIDENT_SHEET);

        let response = build_router(true)
            .oneshot(upload_request(&[
                ("arrears", &arrears),
                ("residents", &residents),
            ]))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            XLSX_CONTENT_TYPE
        );
        assert_eq!(response.headers()["x-report-rows"], "1");
        assert_eq!(response.headers()["x-report-unmatched"], "0");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii header");
        assert!(disposition.starts_with("attachment; filename=\"arrears-report-"));
        assert!(disposition.contains(&urlencoding::encode("處理結果_").into_owned()));

        let body = to_bytes(response.into_body(), 10 * 1024 * 1024)
            .await
            .expect("body");
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn json_accept_returns_report_preview() {
        let arrears = arrears_workbook();
        let residents = resident_workbook(DEFAULT_RESIDENT_SHEET);

        let response = build_router(true)
            .oneshot(upload_request_accepting(
                &[("arrears", &arrears), ("residents", &residents)],
                "application/json",
            ))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert!(payload["file_name"]
            .as_str()
            .expect("file name")
            .starts_with("處理結果_"));
        assert_eq!(
            payload["summary"],
            json!({
                "rows_written": 1,
                "skipped_without_code": 0,
                "unmatched_residents": 0,
                "warnings": 1,
            })
        );
        assert_eq!(
            payload["warnings"],
            json!([{ "row": 3, "kind": "malformed_amount", "raw": "待確認" }])
        );
        assert_eq!(
            payload["rows"],
            json!([{
                "address": "新北市新店區中央路153號9樓之2",
                "resident_name": "王小明",
                "fee_period": "115年1月",
                "fee_category": "parking_cleaning",
                "display_amount": "1,500",
                "display_phone": "0912-345-678",
            }])
        );
    }

    #[tokio::test]
    async fn missing_resident_sheet_is_unprocessable() {
        let arrears = arrears_workbook();
        let residents = resident_workbook("Sheet1");

        let response = build_router(true)
            .oneshot(upload_request(&[
                ("arrears", &arrears),
                ("residents", &residents),
            ]))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = read_json(response).await;
        let message = payload["error"].as_str().expect("error message");
        assert!(message.contains(DEFAULT_RESIDENT_SHEET));
    }

    #[tokio::test]
    async fn missing_upload_field_is_bad_request() {
        let arrears = arrears_workbook();

        let response = build_router(true)
            .oneshot(upload_request(&[("arrears", &arrears)]))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(
            payload["error"],
            "invalid upload: missing 'residents' file field"
        );
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let response = build_router(false)
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(response).await["status"], "initializing");
    }
}
