#![allow(dead_code)]

//! Test infrastructure for ls-server integration tests

use ls_config::{LifecycleConfig, ServerConfig};
use ls_core::{LaunchConfig, LocalServerManager};
use ls_server::HttpServiceLauncher;

use std::sync::Arc;
use std::time::Duration;

/// Launch parameters on loopback with an OS-assigned port
pub fn loopback_config(name: &str) -> LaunchConfig {
    LaunchConfig {
        host: String::from("127.0.0.1"),
        port: 0,
        public_host: String::from("127.0.0.1"),
        advertised_name: name.to_string(),
        startup_timeout: Duration::from_secs(5),
    }
}

/// Manager over the real HTTP launcher, bound to loopback
pub fn http_manager() -> LocalServerManager {
    let launcher = HttpServiceLauncher::new().expect("Failed to build launcher");
    let server = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let lifecycle = LifecycleConfig {
        startup_timeout_secs: 5,
        shutdown_timeout_secs: 5,
        health_check_interval_secs: 1,
        ..LifecycleConfig::default()
    };

    LocalServerManager::new(Arc::new(launcher), server, lifecycle)
}

pub async fn get_json(url: &str) -> serde_json::Value {
    let body = reqwest::get(url)
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body read failed");
    serde_json::from_str(&body).expect("invalid JSON")
}
