mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use checkin::config::DispatchConfig;
use common::{test_app, ADMIN_KEY, ORGANIZER_KEY, SCANNER_KEY};

fn scan_uri(event_id: Uuid) -> String {
    format!("/api/v1/events/{event_id}/qr/scan")
}

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;

    let (status, body) = t
        .request(Method::GET, "/api/v1/admin/keys", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn missing_key_stays_unauthorized_during_key_store_outage() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    t.keystore.set_offline(true);

    let (status, _) = t
        .request(Method::POST, &scan_uri(Uuid::new_v4()), None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn key_store_outage_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    t.keystore.set_offline(true);

    for key in [SCANNER_KEY, "random-invalid-key"] {
        let (status, body) = t
            .request(Method::POST, &scan_uri(Uuid::new_v4()), Some(key), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "key {key}");
        assert_eq!(body, json!({ "error": "Authorization subsystem unavailable" }));
    }
}

#[tokio::test]
async fn admin_key_passes_and_wrong_key_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;

    let (status, body) = t
        .request(Method::GET, "/api/v1/admin/keys", Some(ADMIN_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keys"].as_array().unwrap().len(), 2);

    let (status, body) = t
        .request(Method::GET, "/api/v1/admin/keys", Some("WRONG"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn role_mismatch_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");

    let (status, body) = t
        .request(
            Method::POST,
            &format!("/api/v1/events/{}/qr/send", event.id),
            Some(SCANNER_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = t
        .request(Method::POST, &scan_uri(event.id), Some(ORGANIZER_KEY), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repeated_scan_conflicts_and_other_activity_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    t.activity(&event, "A1");
    t.activity(&event, "A2");
    let participant = t.participant(&event, "ada@example.com").await;
    let scan = |qr: &str| json!({ "ticketId": participant.id, "activityQrId": qr });

    let (status, body) = t
        .request(Method::POST, &scan_uri(event.id), Some(SCANNER_KEY), Some(scan("A1")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Activity scanned successfully");

    let (status, body) = t
        .request(Method::POST, &scan_uri(event.id), Some(SCANNER_KEY), Some(scan("A1")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Activity already scanned");
    assert_eq!(
        t.store.participant(participant.id).unwrap().scanned_activities.len(),
        1
    );

    let (status, _) = t
        .request(Method::POST, &scan_uri(event.id), Some(ADMIN_KEY), Some(scan("A2")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        t.store.participant(participant.id).unwrap().scanned_activities.len(),
        2
    );
}

#[tokio::test]
async fn cross_event_scans_report_which_side_mismatched() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event_a = t.event("A");
    let event_b = t.event("B");
    t.activity(&event_b, "qr-b");
    t.activity(&event_a, "qr-a");
    let in_a = t.participant(&event_a, "a@example.com").await;
    let in_b = t.participant(&event_b, "b@example.com").await;

    let (status, body) = t
        .request(
            Method::POST,
            &scan_uri(event_a.id),
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": in_a.id, "activityQrId": "qr-b" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Activity does not belong to this event");

    let (status, body) = t
        .request(
            Method::POST,
            &scan_uri(event_a.id),
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": in_b.id, "activityQrId": "qr-a" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Participant does not belong to this event");
}

#[tokio::test]
async fn scan_requires_both_fields_in_body() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");

    for body in [
        None,
        Some(json!({})),
        Some(json!({ "ticketId": Uuid::new_v4() })),
        Some(json!({ "ticketId": "  ", "activityQrId": "A1" })),
    ] {
        let (status, response) = t
            .request(Method::POST, &scan_uri(event.id), Some(SCANNER_KEY), body)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "ticketId and activityQrId are required");
    }
}

#[tokio::test]
async fn malformed_identifiers_are_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");

    let (status, body) = t
        .request(
            Method::POST,
            &scan_uri(event.id),
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": "participant-1", "activityQrId": "A1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ticketId");

    let (status, _) = t
        .request(
            Method::POST,
            "/api/v1/events/event-A/qr/scan",
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": Uuid::new_v4(), "activityQrId": "A1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_entities_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;
    let event = t.event("Hack Night");
    let participant = t.participant(&event, "ada@example.com").await;

    let (status, body) = t
        .request(
            Method::POST,
            &scan_uri(Uuid::new_v4()),
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": participant.id, "activityQrId": "A1" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");

    let (status, body) = t
        .request(
            Method::POST,
            &scan_uri(event.id),
            Some(SCANNER_KEY),
            Some(json!({ "ticketId": participant.id, "activityQrId": "missing" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Activity not found");
}
