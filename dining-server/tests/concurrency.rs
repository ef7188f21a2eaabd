//! 并发测试 - 桌台独占、订单项合并、分类解析
//!
//! 多线程运行时 + 文件数据库 (多连接)，真实竞争同一行

mod common;

use futures::future::join_all;
use shared::error::ErrorCode;
use shared::models::SessionStatus;
use std::collections::HashSet;

const CONCURRENCY: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_admit_exactly_one() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "T5").await;

    let results = join_all((0..CONCURRENCY).map(|_| {
        let sessions = state.sessions.clone();
        let table_id = table.id;
        tokio::spawn(async move { sessions.create_session(table_id).await })
    }))
    .await;

    let mut created = 0;
    let mut occupied = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(session) => {
                assert_eq!(session.status, SessionStatus::Active);
                created += 1;
            }
            Err(e) => {
                assert_eq!(e.code, ErrorCode::TableOccupied, "unexpected error: {e}");
                occupied += 1;
            }
        }
    }
    assert_eq!(created, 1);
    assert_eq!(occupied, CONCURRENCY - 1);

    let live = state.sessions.list_active_sessions().await.unwrap();
    assert_eq!(live.iter().filter(|s| s.table_id == table.id).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_to_one_table_admit_exactly_one() {
    let server = common::start().await;
    let state = &server.state;

    let target = common::table(state, "Terrace").await;
    let mut session_ids = Vec::new();
    for i in 0..8 {
        let t = common::table(state, &format!("Hall {i}")).await;
        session_ids.push(state.sessions.create_session(t.id).await.unwrap().id);
    }

    let results = join_all(session_ids.iter().map(|&id| {
        let sessions = state.sessions.clone();
        let target_id = target.id;
        tokio::spawn(async move { sessions.change_table(id, target_id).await })
    }))
    .await;

    let moved = results
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .filter(|r| match r {
            Ok(_) => true,
            Err(e) => {
                assert_eq!(e.code, ErrorCode::TableOccupied);
                false
            }
        })
        .count();
    assert_eq!(moved, 1);
    assert!(!state.tables.is_available(target.id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_item_additions_merge_into_one_line() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "T1").await;
    let item = common::menu_item(state, "Espresso", "Drinks").await;
    let session = state.sessions.create_session(table.id).await.unwrap();
    let order = state.orders.create_order(session.id).await.unwrap();

    let results = join_all((1..=CONCURRENCY as i64).map(|qty| {
        let orders = state.orders.clone();
        let (order_id, item_id) = (order.id, item.id);
        tokio::spawn(async move { orders.add_order_item(order_id, item_id, qty).await })
    }))
    .await;
    for result in results {
        result.expect("task panicked").expect("add item");
    }

    let lines = state.orders.get_order_items(order.id).await.unwrap();
    let expected: i64 = (1..=CONCURRENCY as i64).sum();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_category_resolution_converges() {
    let server = common::start().await;
    let state = &server.state;

    let spellings = ["Desserts", "desserts", " DESSERTS ", "Desserts"];
    let results = join_all((0..CONCURRENCY).map(|i| {
        let categories = state.categories.clone();
        let name = spellings[i % spellings.len()];
        tokio::spawn(async move { categories.resolve_or_create(name).await })
    }))
    .await;

    let ids: HashSet<i64> = results
        .into_iter()
        .map(|r| r.expect("task panicked").expect("resolve"))
        .collect();
    assert_eq!(ids.len(), 1);

    let stored = state.categories.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].name.eq_ignore_ascii_case("desserts"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_status_updates_apply_once() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "T9").await;
    let session = state.sessions.create_session(table.id).await.unwrap();

    let results = join_all((0..8).map(|_| {
        let sessions = state.sessions.clone();
        let id = session.id;
        tokio::spawn(async move { sessions.update_session_status(id, SessionStatus::Pending).await })
    }))
    .await;

    let applied = results
        .into_iter()
        .filter(|r| r.as_ref().expect("task panicked").is_ok())
        .count();
    assert_eq!(applied, 1);
    assert_eq!(
        state.sessions.get_session(session.id).await.unwrap().status,
        SessionStatus::Pending
    );
}
