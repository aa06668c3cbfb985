use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use tablebook_sdk::prelude::*;
use tablebook_sdk::BOOKING_FAILED;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/api", server.uri()))
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn booking_json(table: &str, user: &str, day: &str) -> serde_json::Value {
    json!({
        "_id": format!("{table}-{user}"),
        "tableId": table,
        "userId": user,
        "date": day,
        "startTime": "18:00",
        "endTime": "19:00",
        "guests": 2
    })
}

async fn mount_roster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "tableId": "T1", "capacity": 4 },
            { "tableId": "T2", "capacity": 2 }
        ])))
        .mount(server)
        .await;
}

fn draft() -> BookingDraft {
    BookingDraft::new()
        .table("T1")
        .date(date(1))
        .user("alice")
        .window(time(18), time(19))
        .guests(2)
}

#[tokio::test]
async fn test_load_tables() {
    let server = MockServer::start().await;
    mount_roster(&server).await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let outcome = orchestrator.load_tables().await;

    assert!(outcome.is_success());
    assert_eq!(
        orchestrator.cache().tables().await,
        vec![Table::new("T1", 4), Table::new("T2", 2)]
    );
}

#[tokio::test]
async fn test_query_by_date_hits_date_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/2024-05-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([booking_json(
                "T1",
                "alice",
                "2024-05-01T00:00:00.000Z"
            )])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let outcome = orchestrator.query_by_date(date(1)).await;

    let bookings = outcome.into_value().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].date, date(1));
    assert_eq!(bookings[0].record_id.as_deref(), Some("T1-alice"));
}

#[tokio::test]
async fn test_user_id_is_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/user/jane%20doe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let outcome = orchestrator.query_by_user("jane doe").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.message(), "Bookings loaded");
}

#[tokio::test]
async fn test_submit_posts_booking() {
    let server = MockServer::start().await;
    mount_roster(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .and(body_json(json!({
            "tableId": "T1",
            "userId": "alice",
            "date": "2024-05-01",
            "startTime": "18:00",
            "endTime": "19:00",
            "guests": 2
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "created" })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    orchestrator.load_tables().await;
    let outcome = orchestrator.submit_booking(&draft()).await;

    assert!(outcome.is_success(), "{}", outcome.message());
    assert_eq!(outcome.message(), "Booking Successful!");
}

#[tokio::test]
async fn test_conflict_message_is_verbatim() {
    let server = MockServer::start().await;
    mount_roster(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Table already booked" })),
        )
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    orchestrator.load_tables().await;
    let outcome = orchestrator.submit_booking(&draft()).await;

    assert_eq!(outcome.message(), "Table already booked");
    assert!(matches!(
        outcome.error(),
        Some(BookingError::Rejected { status: 409, .. })
    ));
}

#[tokio::test]
async fn test_falsy_submit_body_is_failure() {
    let server = MockServer::start().await;
    mount_roster(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    orchestrator.load_tables().await;
    let outcome = orchestrator.submit_booking(&draft()).await;

    assert!(outcome.is_failure());
    assert_eq!(outcome.message(), BOOKING_FAILED);
}

#[tokio::test]
async fn test_unreachable_authority_is_transport_error() {
    let orchestrator = BookingOrchestrator::connect(
        &ClientConfig::new("http://127.0.0.1:1/api").with_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    let outcome = orchestrator.load_tables().await;

    assert!(outcome.error().unwrap().is_transport());
    assert!(outcome.is_retryable());
    assert!(orchestrator.cache().tables().await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let outcome = orchestrator.load_calendar().await;

    assert!(matches!(
        outcome.error(),
        Some(BookingError::InvalidResponse(_))
    ));
    assert_eq!(outcome.message(), "Failed to fetch bookings. Please retry.");
}

#[tokio::test]
async fn test_latest_date_selection_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/2024-05-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([booking_json("T1", "alice", "2024-05-01")]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/2024-05-02"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([booking_json("T2", "bob", "2024-05-02")])),
        )
        .mount(&server)
        .await;

    let orchestrator = Arc::new(BookingOrchestrator::connect(&config(&server)).unwrap());
    let slow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.query_by_date(date(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fast = orchestrator.query_by_date(date(2)).await;
    let slow = slow.await.unwrap();

    assert!(!fast.superseded);
    assert!(slow.superseded);
    let rows = orchestrator.cache().bookings_by_date().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].table_id, "T2");
}

#[tokio::test]
async fn test_cancel_then_refresh_user_bookings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bookings/deletebooking"))
        .and(body_json(booking_json("T1", "alice", "2024-05-01")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "deleted" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/user/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let target: Booking =
        serde_json::from_value(booking_json("T1", "alice", "2024-05-01")).unwrap();
    let outcome = orchestrator.cancel_booking(&target).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.message(), "Booking successfully canceled!");
    assert!(orchestrator.cache().bookings_by_user().await.is_empty());
    assert!(orchestrator.cache().meta(SliceKind::ByUser).await.generation > 0);
}

#[tokio::test]
async fn test_plain_text_confirmation_is_success() {
    let server = MockServer::start().await;
    mount_roster(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_string("Booking created"))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    orchestrator.load_tables().await;
    let outcome = orchestrator.submit_booking(&draft()).await;

    assert!(outcome.is_success(), "{}", outcome.message());
    assert_eq!(outcome.message(), "Booking Successful!");
}

#[tokio::test]
async fn test_cancel_echoes_stored_tuple() {
    let server = MockServer::start().await;
    let stored = json!({
        "_id": "665f1c",
        "tableId": "T1",
        "userId": "alice",
        "date": "2024-05-01T00:00:00.000Z",
        "startTime": "18:00:00",
        "endTime": "19:00:00",
        "guests": 2
    });
    Mock::given(method("GET"))
        .and(path("/api/bookings/user/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored.clone()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/user/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bookings/deletebooking"))
        .and(body_json(stored))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "deleted" })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = BookingOrchestrator::connect(&config(&server)).unwrap();
    let listed = orchestrator.query_by_user("alice").await.into_value().unwrap();
    let outcome = orchestrator.cancel_booking(&listed[0]).await;

    assert!(outcome.is_success(), "{}", outcome.message());
    assert!(orchestrator.cache().bookings_by_user().await.is_empty());
}
