mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use checkin::config::DispatchConfig;
use common::{test_app, ORGANIZER_KEY, SCANNER_KEY};

#[tokio::test]
async fn organizer_adds_and_reads_participants() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    let uri = format!("/api/v1/events/{}/participants", event.id);

    let (status, body) = t
        .request(
            Method::POST,
            &uri,
            Some(ORGANIZER_KEY),
            Some(json!({ "name": "Ada", "email": "  Ada@Example.COM " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["participant"]["email"], "ada@example.com");
    assert_eq!(body["participant"]["qrSent"], false);
    let id = body["participant"]["id"].as_str().unwrap().to_string();

    let (status, body) = t.request(Method::GET, &uri, Some(ORGANIZER_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participants"].as_array().unwrap().len(), 1);

    let (status, body) = t
        .request(Method::GET, &format!("{uri}/{id}"), Some(ORGANIZER_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participant"]["name"], "Ada");
}

#[tokio::test]
async fn duplicate_email_in_event_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    let other = t.event("Career Fair");
    let add = |event_id: Uuid, email: &str| {
        (
            format!("/api/v1/events/{event_id}/participants"),
            json!({ "name": "Ada", "email": email }),
        )
    };

    let (uri, body) = add(event.id, "ada@example.com");
    let (status, _) = t.request(Method::POST, &uri, Some(ORGANIZER_KEY), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (uri, body) = add(event.id, "ADA@example.com");
    let (status, response) = t.request(Method::POST, &uri, Some(ORGANIZER_KEY), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "Email already registered for this event");

    let (uri, body) = add(other.id, "ada@example.com");
    let (status, _) = t.request(Method::POST, &uri, Some(ORGANIZER_KEY), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn participant_of_another_event_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    let other = t.event("Career Fair");
    let participant = t.participant(&other, "ada@example.com").await;

    let (status, body) = t
        .request(
            Method::GET,
            &format!("/api/v1/events/{}/participants/{}", event.id, participant.id),
            Some(ORGANIZER_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Participant not found");
}

#[tokio::test]
async fn participant_routes_reject_scanners_and_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    let uri = format!("/api/v1/events/{}/participants", event.id);

    let (status, _) = t.request(Method::GET, &uri, Some(SCANNER_KEY), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .request(
            Method::POST,
            &uri,
            Some(ORGANIZER_KEY),
            Some(json!({ "name": " ", "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .request(
            Method::GET,
            &format!("/api/v1/events/{}/participants", Uuid::new_v4()),
            Some(ORGANIZER_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");
}
