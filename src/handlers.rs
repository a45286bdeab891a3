// src/handlers.rs
use crate::{
    AppState,
    catalog::DefectCategories,
    errors::AnalysisError,
    models::*,
    services::{BatchItem, BatchProcessor},
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Registers the routes and the body limits they share.
pub fn configure_routes(cfg: &mut web::ServiceConfig, max_payload_bytes: usize) {
    cfg.app_data(json_config(max_payload_bytes))
        .app_data(web::PayloadConfig::new(max_payload_bytes))
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health_check))
        .route("/supported-products", web::get().to(supported_products))
        .route("/analyze-image", web::post().to(analyze_image))
        .route("/analyze-batch", web::post().to(analyze_batch));
}

// Malformed or oversized JSON bodies answer with the same {error, message} shape.
fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            AnalysisError::Validation(format!("Invalid JSON body: {}", err)).into()
        })
}

/// Runs CPU-bound analysis on the blocking pool under the request timeout.
async fn run_blocking<T, F>(timeout: Duration, job: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = match tokio::time::timeout(timeout, web::block(job)).await {
        Err(_) => Err(AnalysisError::Timeout(timeout.as_secs())),
        Ok(Err(e)) => Err(AnalysisError::Pipeline(format!("Analysis worker failed: {}", e))),
        Ok(Ok(result)) => result,
    };

    if let Err(e) = &outcome {
        if e.is_client_error() {
            log::warn!("Rejected analysis request: {}", e);
        } else {
            log::error!("Analysis failed: {}", e);
        }
    }
    outcome
}

pub async fn analyze_image(
    body: web::Json<AnalyzeImageBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let started = Instant::now();
    let body = body.into_inner();

    let image_data = data
        .analyzer
        .decoder()
        .decode_base64_payload(&body.image_data)
        .inspect_err(|e| log::warn!("Rejected analysis {}: {}", body.analysis_id, e))?;

    let request = AnalysisRequest {
        image_data,
        product_type: ProductCategory::from_name(&body.product_type),
        analysis_id: body.analysis_id,
    };

    let analyzer = data.analyzer.clone();
    let result = run_blocking(data.settings.request_timeout, move || {
        analyzer.analyze_since(&request, started)
    })
    .await?;

    Ok(HttpResponse::Ok().json(&result))
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub product_type: Option<String>,
}

pub async fn analyze_batch(
    mut payload: Multipart,
    query: web::Query<BatchQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let max_bytes = data.settings.max_payload_bytes;
    let mut received = 0usize;
    let mut items = Vec::new();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AnalysisError::Validation(format!("Malformed multipart upload: {}", e)))?
    {
        if field.content_disposition().get_filename().is_none() {
            log::debug!("Skipping non-file multipart field {:?}", field.name());
            continue;
        }

        // Collect image data
        let mut image_data = BytesMut::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AnalysisError::Validation(format!("Failed to read upload: {}", e)))?
        {
            received += chunk.len();
            if received > max_bytes {
                return Err(AnalysisError::Validation(format!(
                    "Batch upload exceeds {} bytes",
                    max_bytes
                ))
                .into());
            }
            image_data.extend_from_slice(&chunk);
        }

        items.push(BatchItem::new(image_data.to_vec()));
    }

    let processor = match &query.product_type {
        Some(name) => {
            let category = ProductCategory::from_name(name);
            log::info!("Batch default product overridden to {}", category);
            Arc::new(BatchProcessor::new(data.analyzer.clone(), category))
        }
        None => data.batch_processor.clone(),
    };

    log::info!(
        "Received batch of {} images ({} bytes) for {}",
        items.len(),
        received,
        processor.default_product()
    );

    let timeout = data.settings.request_timeout;
    let batch = run_blocking(timeout, move || processor.process(items)).await?;

    Ok(HttpResponse::Ok().json(&batch))
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Agricultural Computer Vision API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "endpoints": {
            "analyze-image": "POST /analyze-image - Analyze a single image",
            "analyze-batch": "POST /analyze-batch - Analyze a batch of images",
            "supported-products": "GET /supported-products - Product categories and defect types",
            "health": "GET /health - Service health"
        }
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "agrovision"
    }))
}

#[derive(Serialize)]
struct SupportedProducts<'a> {
    supported_products: Vec<&'a str>,
    defect_categories: DefectCategories<'a>,
}

pub async fn supported_products(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(SupportedProducts {
        supported_products: data.catalog.supported_products(),
        defect_categories: data.catalog.defect_categories(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductCatalog;
    use crate::config::Settings;
    use crate::test_support::{encode_png_gray, encode_png_rgb, noise};
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, ResponseError, test};
    use base64::{Engine as _, engine::general_purpose};

    const BOUNDARY: &str = "agrovision-test-boundary";

    fn app_state() -> AppState {
        AppState::new(
            Arc::new(Settings::default()),
            Arc::new(ProductCatalog::default()),
        )
    }

    fn multipart_body(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    macro_rules! init_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(app_state()))
                    .configure(|cfg| {
                        configure_routes(cfg, Settings::default().max_payload_bytes)
                    }),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn analyze_image_echoes_identifier() {
        let app = init_app!();
        let png = encode_png_gray(200, 200, |_, _| 128);
        let payload = serde_json::json!({
            "image_data": format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&png)),
            "product_type": "Potato",
            "analysis_id": "lot-7/crate-3"
        });

        let req = test::TestRequest::post()
            .uri("/analyze-image")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["analysis_id"], "lot-7/crate-3");
        assert_eq!(body["product_type"], "Potato");
        assert_eq!(body["texture_analysis"]["texture_type"], "Smooth");
        assert!(body["defects"].as_array().unwrap().len() <= 2);
        let mm = body["size_measurements"]["diameter_mm"].as_f64().unwrap();
        assert!((24.0 - 1e-9..=32.0 + 1e-9).contains(&mm));
    }

    #[actix_web::test]
    async fn malformed_base64_is_a_bad_request() {
        let app = init_app!();
        let req = test::TestRequest::post()
            .uri("/analyze-image")
            .set_json(serde_json::json!({
                "image_data": "%%% not base64 %%%",
                "product_type": "Apple",
                "analysis_id": "bad-1"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Image decode error");
        assert!(body["message"].as_str().unwrap().contains("base64"));
        assert!(body.get("defects").is_none());
    }

    #[actix_web::test]
    async fn batch_summary_matches_items() {
        let app = init_app!();
        let body = multipart_body(&[
            ("a.png", encode_png_rgb(200, 200, |x, y| [noise(x, y), 0, 0])),
            ("b.png", encode_png_gray(150, 150, |_, _| 80)),
            ("c.png", encode_png_rgb(180, 220, |_, _| [40, 160, 40])),
        ]);

        let req = test::TestRequest::post()
            .uri("/analyze-batch")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let batch: BatchResult = test::read_body_json(resp).await;
        assert_eq!(batch.total_images, 3);
        let defects: usize = batch.results.iter().map(|r| r.defects.len()).sum();
        assert_eq!(batch.summary.total_defects, defects);
        let mean = batch.results.iter().map(|r| r.confidence_score).sum::<f64>() / 3.0;
        assert!((batch.summary.average_confidence - mean).abs() < 1e-9);
        assert!(batch.results.iter().all(|r| r.product_type == ProductCategory::Apple));
    }

    #[actix_web::test]
    async fn wrongly_typed_json_is_a_validation_error() {
        let app = init_app!();
        let req = test::TestRequest::post()
            .uri("/analyze-image")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload(r#"{"image_data": 1}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Validation error");
        assert!(body["message"].as_str().unwrap().contains("Invalid JSON body"));
    }

    #[actix_web::test]
    async fn slow_job_times_out() {
        let outcome: Result<(), AnalysisError> =
            run_blocking(Duration::from_millis(10), || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        let err = outcome.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout(_)));

        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Image analysis timeout");
        assert!(body["message"].is_string());
    }

    #[actix_web::test]
    async fn empty_upload_fails_whole_batch() {
        let app = init_app!();
        let body = multipart_body(&[
            ("a.png", encode_png_gray(150, 150, |_, _| 80)),
            ("empty.png", Vec::new()),
            ("c.png", encode_png_rgb(150, 150, |_, _| [40, 160, 40])),
        ]);

        let req = test::TestRequest::post()
            .uri("/analyze-batch")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Image decode error");
    }

    #[actix_web::test]
    async fn batch_with_corrupt_image_fails_whole_batch() {
        let app = init_app!();
        let body = multipart_body(&[
            ("a.png", encode_png_gray(150, 150, |_, _| 80)),
            ("b.png", b"truncated".to_vec()),
        ]);

        let req = test::TestRequest::post()
            .uri("/analyze-batch?product_type=Orange")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn metadata_endpoints() {
        let app = init_app!();

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "active");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());

        let req = test::TestRequest::get().uri("/supported-products").to_request();
        let raw = test::call_and_read_body(&app, req).await;
        let body: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            body["supported_products"],
            serde_json::json!(["Apple", "Orange", "Tomato", "Potato"])
        );
        assert_eq!(body["defect_categories"]["Potato"][0], "Deep Eye");

        // Vocabularies are listed in the same order as the products.
        let raw = std::str::from_utf8(&raw).unwrap();
        let keys: Vec<usize> = ["Apple", "Orange", "Tomato", "Potato"]
            .iter()
            .map(|name| raw.find(&format!("\"{}\":[", name)).unwrap())
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]), "{}", raw);
    }
}
