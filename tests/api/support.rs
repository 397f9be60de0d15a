// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for driving the OCR router in tests

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use paddle_ocr_server::{
    api::{create_app, AppState},
    vision::{
        ocr::{EngineError, RecognitionEngine, TextRegion},
        PixelBuffer, VisionModelManager,
    },
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "----ocr-test-boundary";

/// Engine double that counts calls and replays scripted results
pub struct StubEngine {
    calls: AtomicUsize,
    scripted: Mutex<VecDeque<Result<Vec<String>, EngineError>>>,
    fallback: Vec<String>,
    delay: Option<Duration>,
}

impl StubEngine {
    pub fn returning(lines: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            scripted: Mutex::new(VecDeque::new()),
            fallback: lines.iter().map(|s| s.to_string()).collect(),
            delay: None,
        }
    }

    /// Queue a one-off result served before the fallback
    pub fn then(self, result: Result<Vec<String>, EngineError>) -> Self {
        self.scripted.lock().unwrap().push_back(result);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecognitionEngine for StubEngine {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<TextRegion>, EngineError> {
        assert!(image.width() > 0 && image.height() > 0);
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let next = self.scripted.lock().unwrap().pop_front();
        let lines = match next {
            Some(result) => result?,
            None => self.fallback.clone(),
        };
        Ok(lines.into_iter().map(TextRegion::from_text).collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub struct TestServer {
    pub app: Router,
    pub engine: Arc<StubEngine>,
}

impl TestServer {
    pub fn new(engine: StubEngine) -> Self {
        Self::with_limits(engine, 1024 * 1024, Duration::from_secs(5))
    }

    pub fn with_limits(engine: StubEngine, max_upload_bytes: usize, timeout: Duration) -> Self {
        let engine = Arc::new(engine);
        let manager = VisionModelManager::with_engine(engine.clone(), 2, timeout);
        let state = Arc::new(AppState::new(Arc::new(manager), max_upload_bytes));
        Self {
            app: create_app(state),
            engine,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, headers, json)
    }

    pub async fn upload(&self, bytes: &[u8]) -> (StatusCode, HeaderMap, serde_json::Value) {
        self.send(ocr_request(&[Part::file("file", "upload.png", bytes)]))
            .await
    }
}

pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }

    pub fn text(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: None,
            data,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match part.file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                part.name, file_name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn ocr_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/ocr")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x % 8 < 4 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
