mod common;

use axum::http::{Method, StatusCode};
use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;

use checkin::config::DispatchConfig;
use checkin::models::Participant;
use checkin::notify::{FallbackTransport, HttpFallback, NotificationEnvelope};
use common::{test_app, ADMIN_KEY, ORGANIZER_KEY};

fn write_qr(dir: &Path, participant: &Participant) {
    std::fs::write(dir.join(format!("{}.png", participant.id)), b"\x89PNG").unwrap();
}

fn send_uri(event_id: uuid::Uuid) -> String {
    format!("/api/v1/events/{event_id}/qr/send")
}

#[tokio::test]
async fn send_queues_envelopes_and_skips_notified_participants() {
    let dir = tempfile::tempdir().unwrap();
    let config = DispatchConfig {
        stream: Some("emails".into()),
        ..DispatchConfig::default()
    };
    let t = test_app(config, dir.path()).await;
    let event = t.event("Hack Night");
    let fresh = t.participant(&event, "fresh@example.com").await;
    let notified = t.participant(&event, "done@example.com").await;
    {
        use checkin::db::ParticipantStore;
        t.store.set_qr_sent(notified.id, true).await.unwrap();
    }
    write_qr(dir.path(), &fresh);

    let (status, body) = t
        .request(
            Method::POST,
            &send_uri(event.id),
            Some(ORGANIZER_KEY),
            Some(json!({ "emailBody": "Hi {name}, see you at {event}" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "QR code emails processed.");
    assert_eq!(body["total"], 2);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["queued"], 1);
    assert_eq!(body["fallbackSent"], 0);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["failed"], 0);

    let published = t.keystore.published();
    assert_eq!(published.len(), 1);
    let envelope: NotificationEnvelope = serde_json::from_str(&published[0].1).unwrap();
    assert_eq!(envelope.to, vec!["fresh@example.com".to_string()]);
    assert!(envelope.text.starts_with("Hi Ada, see you at Hack Night"));
    assert_eq!(envelope.attachments[0].filename, format!("{}.png", fresh.id));

    assert!(t.store.participant(fresh.id).unwrap().qr_sent);
    assert!(!dir.path().join(format!("{}.png", fresh.id)).exists());
}

#[tokio::test]
async fn stream_outage_uses_email_service() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/email/send")
                .header("x-service-token", "svc-token")
                .json_body_partial(r#"{ "schemaVersion": "1.0", "subject": "Your Event QR Code" }"#);
            then.status(202);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = DispatchConfig {
        stream: Some("emails".into()),
        fallback_url: Some(server.base_url()),
        fallback_token: Some("svc-token".into()),
        ..DispatchConfig::default()
    };
    let t = test_app(config, dir.path()).await;
    let event = t.event("Hack Night");
    let a = t.participant(&event, "a@example.com").await;
    let b = t.participant(&event, "b@example.com").await;
    write_qr(dir.path(), &a);
    write_qr(dir.path(), &b);
    t.keystore.set_offline(true);

    let (status, body) = t
        .request(Method::POST, &send_uri(event.id), Some(ADMIN_KEY), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 2);
    assert_eq!(body["fallbackSent"], 2);
    assert_eq!(body["queued"], 0);
    mock.assert_hits_async(2).await;
    assert!(t.store.participant(a.id).unwrap().qr_sent);
    assert!(t.store.participant(b.id).unwrap().qr_sent);
}

#[tokio::test]
async fn failed_recipient_is_reported_and_left_unsent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/email/send");
            then.status(500);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = DispatchConfig {
        fallback_url: Some(server.base_url()),
        concurrency: 2,
        ..DispatchConfig::default()
    };
    let t = test_app(config, dir.path()).await;
    let event = t.event("Hack Night");
    let with_image = t.participant(&event, "a@example.com").await;
    let without_image = t.participant(&event, "b@example.com").await;
    write_qr(dir.path(), &with_image);

    let (status, body) = t
        .request(Method::POST, &send_uri(event.id), Some(ADMIN_KEY), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["failed"], 2);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .any(|e| e["recipient"] == "a@example.com" && e["error"].as_str().unwrap().contains("500")));
    assert!(errors.iter().any(|e| e["recipient"] == "b@example.com"));
    assert!(!t.store.participant(with_image.id).unwrap().qr_sent);
    assert!(!t.store.participant(without_image.id).unwrap().qr_sent);
    assert!(!dir.path().join(format!("{}.png", with_image.id)).exists());
}

#[tokio::test]
async fn send_to_missing_event_is_not_found_and_empty_event_is_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let t = test_app(DispatchConfig::default(), dir.path()).await;

    let (status, body) = t
        .request(Method::POST, &send_uri(uuid::Uuid::new_v4()), Some(ADMIN_KEY), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");

    let event = t.event("Empty");
    let (status, body) = t
        .request(Method::POST, &send_uri(event.id), Some(ADMIN_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn http_fallback_omits_token_header_when_unset() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/email/send")
                .matches(|req| {
                    req.headers.as_ref().map_or(true, |headers| {
                        !headers
                            .iter()
                            .any(|(name, _)| name.eq_ignore_ascii_case("x-service-token"))
                    })
                });
            then.status(200);
        })
        .await;

    let fallback = HttpFallback::new(&server.base_url(), None).unwrap();
    let envelope = NotificationEnvelope::new(vec!["a@example.com".into()], "s", "t", &[]);
    fallback.deliver(&envelope).await.unwrap();
    mock.assert_async().await;
}
