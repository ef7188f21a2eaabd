//! 端到端场景 - 开台、点单、状态流转、取消窗口、限流

mod common;

use dining_server::{Config, RateLimitConfig, RateLimiter};
use shared::error::{ErrorCode, ErrorKind};
use shared::models::{OrderStatus, SessionStatus};
use std::time::Duration;

#[tokio::test]
async fn full_dining_flow() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "Window 2").await;
    let soup = common::menu_item(state, "Soup", "Starters").await;
    let bread = common::menu_item(state, "Bread", "starters").await;
    assert_eq!(soup.category_id, bread.category_id);

    let session = state.sessions.create_session(table.id).await.unwrap();
    let order = state.orders.create_order(session.id).await.unwrap();

    state.orders.add_order_item(order.id, soup.id, 2).await.unwrap();
    state.orders.add_order_item(order.id, soup.id, 3).await.unwrap();
    state.orders.add_order_item(order.id, bread.id, 1).await.unwrap();

    let items = state.orders.get_order_items(order.id).await.unwrap();
    let soup_line = items.iter().find(|i| i.menu_item_id == soup.id).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(soup_line.quantity, 5);

    for next in [OrderStatus::Pending, OrderStatus::Preparing, OrderStatus::Served] {
        state.orders.update_order_status(order.id, next).await.unwrap();
    }
    let err = state
        .orders
        .update_order_status(order.id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    state
        .sessions
        .update_session_status(session.id, SessionStatus::Pending)
        .await
        .unwrap();
    let closed = state
        .sessions
        .update_session_status(session.id, SessionStatus::Completed)
        .await
        .unwrap();
    assert!(closed.completed_at.is_some());

    // Table is free for the next party
    let next = state.sessions.create_session(table.id).await.unwrap();
    assert_eq!(next.table_id, table.id);
    assert_eq!(
        state.orders.get_order_items_by_session(session.id).await.unwrap().len(),
        2
    );

    server.state.shutdown().await;
}

#[tokio::test]
async fn out_of_stock_item_is_rejected() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "T1").await;
    let item = common::menu_item(state, "Oysters", "Seafood").await;
    state.menu.set_availability(item.id, false).await.unwrap();

    let session = state.sessions.create_session(table.id).await.unwrap();
    let order = state.orders.create_order(session.id).await.unwrap();
    let err = state
        .orders
        .add_order_item(order.id, item.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProductOutOfStock);
    assert_eq!(err.http_status().as_u16(), 400);
}

#[tokio::test]
async fn cancellation_after_window_is_rejected() {
    let mut config = Config::default();
    config.order_cancel_window_secs = 0;
    let server = common::start_with(config).await;
    let state = &server.state;
    let table = common::table(state, "T1").await;
    let session = state.sessions.create_session(table.id).await.unwrap();
    let order = state.orders.create_order(session.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let err = state
        .orders
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderCancelWindowExpired);
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn cancellation_inside_window_succeeds() {
    let server = common::start().await;
    let state = &server.state;
    let table = common::table(state, "T1").await;
    let session = state.sessions.create_session(table.id).await.unwrap();
    let order = state.orders.create_order(session.id).await.unwrap();
    state
        .orders
        .update_order_status(order.id, OrderStatus::Pending)
        .await
        .unwrap();

    let cancelled = state
        .orders
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_small_bucket() {
    let limiter = RateLimiter::new(RateLimitConfig {
        requests_per_second: 5.0,
        burst_size: 5,
        cleanup_interval: Duration::from_secs(60),
        idle_timeout: Duration::from_secs(300),
    });

    for _ in 0..5 {
        assert!(limiter.allow("pos-terminal"));
    }
    assert!(!limiter.allow("pos-terminal"));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(limiter.allow("pos-terminal"));
    limiter.stop();
}
