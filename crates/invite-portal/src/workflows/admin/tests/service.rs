use super::common::*;
use crate::workflows::admin::domain::{RecordStatus, SortDirection, SortKey, SortState};
use crate::workflows::admin::service::AdminError;
use crate::workflows::admin::viewer::RecordQuery;
use crate::workflows::intake::domain::SessionId;
use crate::workflows::window::SystemConfig;

async fn logged_in(harness: &Harness) -> SessionId {
    harness
        .service
        .login(PASSWORD)
        .await
        .expect("login succeeds")
        .session_id
}

#[tokio::test]
async fn wrong_password_is_an_auth_failure() {
    let harness = default_harness();
    let err = harness
        .service
        .login("guess")
        .await
        .expect_err("password rejected");
    assert!(matches!(err, AdminError::AuthFailed));
    assert_eq!(harness.backend.fetches(), 0);
}

#[tokio::test]
async fn login_loads_records_and_window() {
    let harness = default_harness();
    assert!(!harness.gate.is_open());

    let view = harness.service.login(PASSWORD).await.expect("login");
    assert_eq!(view.total, 23);
    assert_eq!(view.config, window_config());
    assert!(view.window.open);
    assert!(harness.gate.is_open(), "gate follows the fetched config");
}

#[tokio::test]
async fn records_are_paged_by_ten() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let first = harness
        .service
        .records(&id, &RecordQuery::default())
        .await
        .expect("records");
    assert_eq!(first.page.page_count, 3);
    assert_eq!(first.page.items.len(), 10);
    assert_eq!(first.page.items[0].id, "R001");
    assert_eq!(first.regions, vec!["south", "east", "north"]);
    assert_eq!(first.identities, vec!["student", "parent"]);

    let last = harness
        .service
        .records(
            &id,
            &RecordQuery {
                page: Some(3),
                ..RecordQuery::default()
            },
        )
        .await
        .expect("records");
    assert_eq!(last.page.items.len(), 3);
    assert_eq!(last.page.total, 23);
}

#[tokio::test]
async fn search_and_filters_combine() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let query = RecordQuery {
        search: Some("test@".to_string()),
        ..RecordQuery::default()
    };
    let found = harness.service.records(&id, &query).await.expect("records");
    let ids: Vec<_> = found.page.items.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["R005", "R010", "R015", "R020"]);

    let query = RecordQuery {
        search: Some("test@".to_string()),
        status: Some("expired".to_string()),
        ..RecordQuery::default()
    };
    let found = harness.service.records(&id, &query).await.expect("records");
    let ids: Vec<_> = found.page.items.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["R020"]);
}

#[tokio::test]
async fn session_sort_toggles_and_query_sort_wins() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let sort = harness
        .service
        .toggle_sort(&id, SortKey::Id)
        .await
        .expect("sort");
    assert_eq!(sort, SortState::ascending(SortKey::Id));
    let sort = harness
        .service
        .toggle_sort(&id, SortKey::Id)
        .await
        .expect("sort");
    assert_eq!(sort.direction, SortDirection::Descending);

    let view = harness
        .service
        .records(&id, &RecordQuery::default())
        .await
        .expect("records");
    assert_eq!(view.page.items[0].id, "R023");

    let explicit = RecordQuery {
        sort: Some(SortKey::Code),
        ..RecordQuery::default()
    };
    let view = harness.service.records(&id, &explicit).await.expect("records");
    assert_eq!(view.page.items[0].code, "INV-8977");
    assert_eq!(view.sort, Some(SortState::ascending(SortKey::Code)));
}

#[tokio::test]
async fn stats_cover_the_whole_record_set() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let stats = harness.service.stats(&id).await.expect("stats");
    assert_eq!(stats.total, 23);
    assert_eq!(stats.active, 18);
    assert_eq!(stats.today, 4);
    assert_eq!(stats.with_scores, 1, "placeholder scores are excluded");
    assert_eq!(stats.rank_percent[0].count, 1);
    assert_eq!(stats.rank_count[0].count, 1);
}

#[tokio::test]
async fn confirmed_status_toggle_updates_local_record() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let record = harness
        .service
        .toggle_status(&id, "R004")
        .await
        .expect("toggle");
    assert_eq!(record.status, RecordStatus::Active);
    assert_eq!(
        harness.backend.status_updates(),
        vec![("R004".to_string(), RecordStatus::Active)]
    );

    let handle = harness.service.session(&id).expect("session");
    let session = handle.lock().await;
    let stored = session.viewer().find("R004").expect("record kept");
    assert_eq!(stored.status, RecordStatus::Active);
}

#[tokio::test]
async fn refused_status_toggle_leaves_record_untouched() {
    let harness = harness(FakeBackend::new(records(), window_config()).refusing_mutations());
    let id = logged_in(&harness).await;

    let err = harness
        .service
        .toggle_status(&id, "R001")
        .await
        .expect_err("backend refuses");
    assert!(matches!(err, AdminError::Backend(_)));

    let handle = harness.service.session(&id).expect("session");
    let session = handle.lock().await;
    assert_eq!(
        session.viewer().find("R001").map(|r| r.status),
        Some(RecordStatus::Active)
    );
}

#[tokio::test]
async fn unknown_record_is_not_sent_to_backend() {
    let harness = default_harness();
    let id = logged_in(&harness).await;
    let err = harness
        .service
        .toggle_status(&id, "R999")
        .await
        .expect_err("unknown record");
    assert!(matches!(err, AdminError::RecordNotFound(ref missing) if missing == "R999"));
    assert!(harness.backend.status_updates().is_empty());
}

#[tokio::test]
async fn config_update_reaches_backend_and_gate() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let closed = SystemConfig::new("2025-01-01T00:00:00", None);
    let status = harness
        .service
        .update_config(&id, closed.clone())
        .await
        .expect("update");
    assert!(!status.open);
    assert_eq!(status.start, "2025/01/01 00:00");
    assert_eq!(harness.backend.stored_config(), closed);
    assert_eq!(harness.gate.config(), closed);
}

#[tokio::test]
async fn refused_config_update_keeps_gate() {
    let harness = harness(FakeBackend::new(records(), window_config()).refusing_mutations());
    let id = logged_in(&harness).await;

    let err = harness
        .service
        .update_config(&id, SystemConfig::default())
        .await
        .expect_err("backend refuses");
    assert!(matches!(err, AdminError::Backend(_)));
    assert_eq!(harness.gate.config(), window_config());
    assert!(harness.gate.is_open());
}

#[tokio::test]
async fn refresh_picks_up_new_records() {
    let harness = default_harness();
    let id = logged_in(&harness).await;
    harness.backend.push_record(record(24));

    let view = harness.service.refresh(&id).await.expect("refresh");
    assert_eq!(view.total, 24);
    assert_eq!(harness.backend.fetches(), 2);
}

#[tokio::test]
async fn export_names_file_by_date() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    let file = harness.service.export_csv(&id).await.expect("export");
    assert!(file.filename.starts_with("export_users_2024-03-1"));
    assert!(file.filename.ends_with(".csv"));
    assert!(file.bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(file.bytes).expect("utf-8");
    assert_eq!(text.lines().count(), 24);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let harness = default_harness();
    let id = logged_in(&harness).await;

    harness.service.logout(&id).expect("logout");
    let err = harness
        .service
        .stats(&id)
        .await
        .expect_err("session gone");
    assert!(matches!(err, AdminError::SessionNotFound));
    assert!(matches!(
        harness.service.logout(&id),
        Err(AdminError::SessionNotFound)
    ));
}

#[tokio::test]
async fn idle_operator_sessions_are_dropped_at_next_login() {
    let harness = default_harness();
    let idle = logged_in(&harness).await;
    let active = logged_in(&harness).await;

    harness.clock.advance(chrono::Duration::minutes(20));
    harness.service.stats(&active).await.expect("active session");
    harness.clock.advance(chrono::Duration::minutes(15));
    let fresh = logged_in(&harness).await;

    assert_eq!(harness.service.live_sessions(), 2);
    let err = harness
        .service
        .stats(&idle)
        .await
        .expect_err("idle session dropped");
    assert!(matches!(err, AdminError::SessionNotFound));
    harness.service.stats(&active).await.expect("active kept");
    harness.service.stats(&fresh).await.expect("fresh kept");
}
