//! 集成测试公共工具

#![allow(dead_code)]

use dining_server::db::DbService;
use dining_server::{Config, ServerState};
use shared::models::{DiningTable, DiningTableCreate, MenuItem, MenuItemCreate};
use tempfile::TempDir;

/// On-disk database with a real connection pool
pub struct TestServer {
    pub state: ServerState,
    _dir: TempDir,
}

pub async fn start() -> TestServer {
    start_with(Config::default()).await
}

pub async fn start_with(mut config: Config) -> TestServer {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("dining.db");
    config.database_path = path.to_string_lossy().into_owned();
    config.db_max_connections = 8;

    let db = DbService::new(&config.database_path, config.db_max_connections)
        .await
        .expect("open database");
    TestServer {
        state: ServerState::with_db(&config, db),
        _dir: dir,
    }
}

pub async fn table(state: &ServerState, name: &str) -> DiningTable {
    state
        .tables
        .create_table(DiningTableCreate {
            name: name.to_string(),
            capacity: Some(4),
        })
        .await
        .expect("create table")
}

pub async fn menu_item(state: &ServerState, name: &str, category: &str) -> MenuItem {
    state
        .menu
        .create_menu_item(MenuItemCreate {
            name: name.to_string(),
            category_name: category.to_string(),
            price: 9.5,
        })
        .await
        .expect("create menu item")
}
