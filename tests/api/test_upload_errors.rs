// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload rejection tests: nothing here may reach the engine

use super::support::{ocr_request, png_bytes, Part, StubEngine, TestServer};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use std::time::Duration;

#[tokio::test]
async fn test_zero_byte_upload_is_rejected() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let (status, _, body) = server.upload(&[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "empty_upload");
    assert!(body.get("text").is_none());
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let (status, _, body) = server.upload(b"%PDF-1.7 definitely not a raster").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "unreadable_image");
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_truncated_png_is_rejected() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));
    let image = png_bytes(64, 64);

    let (status, _, body) = server.upload(&image[..image.len() / 3]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "unreadable_image");
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_missing_file_field() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let (status, _, body) = server
        .send(ocr_request(&[Part::text("comment", b"no file here")]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "file");
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_non_multipart_body() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/ocr")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"image":"aGVsbG8="}"#))
        .unwrap();
    let (status, _, body) = server.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_request");
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_oversized_file_is_413() {
    let server = TestServer::with_limits(
        StubEngine::returning(&["HELLO"]),
        1024,
        Duration::from_secs(5),
    );
    let payload = vec![0u8; 4096];

    let (status, _, body) = server.upload(&payload).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error_type"], "payload_too_large");
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_body_over_limit_is_413() {
    let server = TestServer::with_limits(
        StubEngine::returning(&["HELLO"]),
        1024,
        Duration::from_secs(5),
    );
    let payload = vec![7u8; 256 * 1024];

    let (status, _, _) = server.upload(&payload).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(server.engine.calls(), 0);
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/ocr")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.send(request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejection_does_not_poison_service() {
    let server = TestServer::new(StubEngine::returning(&["HELLO"]));

    let (status, _, _) = server.upload(b"garbage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = server.upload(&png_bytes(32, 32)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "HELLO");
}
