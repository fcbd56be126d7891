//! HTTP-level tests for the backend client against a mock server.

use lectern_api_client::{ApiClient, InitiateUploadRequest};
use lectern_core::models::{CompletedPart, VideoStatus};

fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(server.url(), "test-token".to_string()).unwrap()
}

#[tokio::test]
async fn initiate_upload_posts_metadata_and_carries_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/videos/initiate_upload/")
        .match_header("authorization", "Bearer test-token")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "file_name": "lecture.mp4",
            "file_size": 15_728_640u64,
            "file_type": "video/mp4",
        })))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "video_id": "vid-1",
                "upload_id": "up-1",
                "presigned_url": null,
                "s3_key": "media/vid-1.mp4"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client
        .initiate_upload(&InitiateUploadRequest {
            title: "lecture.mp4".to_string(),
            description: String::new(),
            file_name: "lecture.mp4".to_string(),
            file_size: 15_728_640,
            file_type: "video/mp4".to_string(),
            duration: 180.0,
        })
        .await
        .unwrap();

    assert_eq!(response.video_id, "vid-1");
    assert_eq!(response.upload_id, "up-1");
    assert_eq!(response.s3_key, "media/vid-1.mp4");
    mock.assert_async().await;
}

#[tokio::test]
async fn part_upload_url_decodes_html_entities() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/videos/get_presigned_url/")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "presigned_url":
                    "https://bucket.s3.amazonaws.com/k?uploadId=a&amp;partNumber=2&amp;sig=x"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let url = client.part_upload_url("vid-1", 2, 5_242_880).await.unwrap();
    assert_eq!(
        url,
        "https://bucket.s3.amazonaws.com/k?uploadId=a&partNumber=2&sig=x"
    );
}

#[tokio::test]
async fn complete_upload_sends_ordered_parts_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/videos/complete_upload/")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "video_id": "vid-1",
            "parts": [
                {"PartNumber": 1, "ETag": "\"a\""},
                {"PartNumber": 2, "ETag": "\"b\""}
            ]
        })))
        .with_status(200)
        .with_body("{\"ok\": true}")
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .complete_upload(
            "vid-1",
            vec![
                CompletedPart {
                    part_number: 1,
                    etag: "\"a\"".to_string(),
                },
                CompletedPart {
                    part_number: 2,
                    etag: "\"b\"".to_string(),
                },
            ],
        )
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn video_status_parses_lifecycle_states() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/videos/vid-1/")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": "vid-1",
                "status": "ready",
                "cloudfront_url": "https://cdn.example.com/vid-1/master.m3u8"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let status = client.video_status("vid-1").await.unwrap();
    assert_eq!(status.status, VideoStatus::Ready);
    assert_eq!(
        status.cloudfront_url.as_deref(),
        Some("https://cdn.example.com/vid-1/master.m3u8")
    );
}

#[tokio::test]
async fn non_success_status_surfaces_error_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/videos/missing/signed_url/")
        .with_status(404)
        .with_body("{\"error\": \"video not found\"}")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.signed_url("missing").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "got: {message}");
}
