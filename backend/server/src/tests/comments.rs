use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::harness::{ALICE, BOB, TestHarness, read};

#[tokio::test]
async fn comment_is_trimmed_and_attributed() {
    let harness = TestHarness::setup().await;

    let (status, body) = harness
        .post("/comments/4", Some(ALICE), json!({ "text": "  so clean  " }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let comment = &body["comment"];
    assert_eq!(comment["text"], "so clean");
    assert_eq!(comment["editId"], 4);
    assert_eq!(comment["userId"], "alice");
    assert_eq!(comment["username"], "Alice");
    assert!(comment["avatar"].as_str().unwrap().contains("name=Alice"));
    assert!(!comment["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn username_falls_back_to_email_local_part() {
    let harness = TestHarness::setup().await;

    let (_, body) = harness
        .post("/comments/4", Some(BOB), json!({ "text": "fire" }))
        .await;
    assert_eq!(body["comment"]["username"], "bob");
}

#[tokio::test]
async fn blank_or_missing_text_is_rejected() {
    let harness = TestHarness::setup().await;

    for payload in [json!({ "text": "   " }), json!({})] {
        let (status, body) = harness.post("/comments/4", Some(ALICE), payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Comment text is required");
    }

    let (status, body) = read(
        harness
            .send(Method::POST, "/comments/4", Some(ALICE), Some(json!("not an object")))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
}

#[tokio::test]
async fn comments_list_oldest_first() {
    let harness = TestHarness::setup().await;

    for text in ["first", "second", "third"] {
        harness
            .post("/comments/6", Some(ALICE), json!({ "text": text }))
            .await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let (status, body) = harness.get("/comments/6", None).await;
    assert_eq!(status, StatusCode::OK);

    let texts: Vec<&str> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|comment| comment["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn only_the_author_can_delete() {
    let harness = TestHarness::setup().await;

    let (_, body) = harness
        .post("/comments/8", Some(ALICE), json!({ "text": "mine" }))
        .await;
    let path = format!("/comments/8/{}", body["comment"]["id"].as_str().unwrap());

    let (status, body) = read(harness.send(Method::DELETE, &path, Some(BOB), None).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized to delete this comment");

    let (status, _) = read(harness.send(Method::DELETE, &path, None, None).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = read(harness.send(Method::DELETE, &path, Some(ALICE), None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = read(harness.send(Method::DELETE, &path, Some(ALICE), None).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment not found");

    let (_, body) = harness.get("/comments/8", None).await;
    assert_eq!(body["comments"], json!([]));
}
