use crate::tests::{FakeLauncher, manager, recorder, states, test_lifecycle};
use crate::{
    CapabilityAllowList, ControlSurfaceGateway, GatewayError, LocalServerManager, Operation,
    PairingCodeGenerator, RenderOptions, ServiceState, StartOptions, SurfaceId,
};

use std::sync::Arc;

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, eq, ok, some, starts_with};
use ls_config::{GatewayConfig, PairingConfig, ServerConfig};

fn gateway_for(manager: LocalServerManager) -> ControlSurfaceGateway {
    let allow_list = CapabilityAllowList::from_config(&GatewayConfig::default()).unwrap();
    ControlSurfaceGateway::new(
        manager,
        PairingCodeGenerator::new(PairingConfig::default()),
        allow_list,
    )
}

fn gateway(launcher: &FakeLauncher) -> ControlSurfaceGateway {
    gateway_for(manager(launcher))
}

fn gateway_with_server(launcher: &FakeLauncher, server: ServerConfig) -> ControlSurfaceGateway {
    gateway_for(LocalServerManager::new(
        Arc::new(launcher.clone()),
        server,
        test_lifecycle(),
    ))
}

fn main_surface() -> SurfaceId {
    SurfaceId::from("main")
}

// =========================================================================
// Allow-list
// =========================================================================

#[test]
fn given_default_config_when_built_then_settings_cannot_start() {
    let allow_list = CapabilityAllowList::from_config(&GatewayConfig::default()).unwrap();
    let settings = SurfaceId::from("settings");

    assert!(allow_list.permits(&settings, Operation::GetStatus));
    assert!(!allow_list.permits(&settings, Operation::Start));
    assert!(!allow_list.permits(&settings, Operation::Stop));
    for operation in Operation::ALL {
        assert!(allow_list.permits(&main_surface(), operation));
    }
}

#[test]
fn given_unknown_operation_name_when_built_then_invalid_allow_list() {
    // Given
    let mut config = GatewayConfig::default();
    config
        .allow
        .insert(String::from("rogue"), vec![String::from("reboot")]);

    // When
    let result = CapabilityAllowList::from_config(&config);

    // Then
    let Err(GatewayError::InvalidAllowList {
        surface, operation, ..
    }) = result
    else {
        panic!("expected InvalidAllowList");
    };
    assert_that!(surface, eq("rogue"));
    assert_that!(operation, eq("reboot"));
}

#[test]
fn given_operation_names_when_parsed_then_round_trip() {
    for operation in Operation::ALL {
        assert_that!(Operation::from_name(operation.as_str()), some(eq(operation)));
    }
    assert!(Operation::from_name("Start").is_none());
}

// =========================================================================
// Authorization
// =========================================================================

#[tokio::test]
async fn given_unauthorized_surface_when_start_then_rejected_before_manager() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);

    // When
    let result = gateway
        .start(&SurfaceId::from("settings"), Some(StartOptions::default()))
        .await;

    // Then
    let Err(error) = result else {
        panic!("settings surface must not start the server");
    };
    assert_that!(error.error_code(), eq("UNAUTHORIZED"));
    assert_that!(launcher.launch_count(), eq(0));
    assert_that!(
        gateway.get_status(&main_surface()).unwrap().state(),
        eq(ServiceState::Stopped)
    );
}

#[tokio::test]
async fn given_running_service_when_settings_stops_then_denied_and_still_running() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    gateway.start(&main_surface(), None).await.unwrap();

    // When
    let result = gateway.stop(&SurfaceId::from("settings")).await;

    // Then
    assert!(matches!(result, Err(GatewayError::Unauthorized { .. })));
    assert_that!(launcher.shutdown_count(), eq(0));
    assert_that!(
        gateway.get_status(&SurfaceId::from("settings")).unwrap().state(),
        eq(ServiceState::Running)
    );
}

#[tokio::test]
async fn given_unknown_surface_when_any_operation_then_unauthorized() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    let stranger = SurfaceId::from("stranger");

    assert!(matches!(
        gateway.stop(&stranger).await,
        Err(GatewayError::Unauthorized { .. })
    ));
    assert!(matches!(
        gateway.get_status(&stranger),
        Err(GatewayError::Unauthorized { .. })
    ));
    assert!(matches!(
        gateway.subscribe(&stranger, |_| {}),
        Err(GatewayError::Unauthorized { .. })
    ));
    assert!(matches!(
        gateway.make_pairing_image(&stranger, Some("x"), None),
        Err(GatewayError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn given_low_port_when_start_then_invalid_options_without_launch() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);

    let result = gateway
        .start(&main_surface(), Some(StartOptions::with_port(80)))
        .await;

    assert!(matches!(result, Err(GatewayError::InvalidOptions { .. })));
    assert_that!(launcher.launch_count(), eq(0));
}

#[tokio::test]
async fn given_overlong_name_when_start_then_invalid_options() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    let options = StartOptions {
        advertised_name: Some("n".repeat(65)),
        ..StartOptions::default()
    };

    let result = gateway.start(&main_surface(), Some(options)).await;

    assert!(matches!(result, Err(GatewayError::InvalidOptions { .. })));
}

#[tokio::test]
async fn given_wildcard_host_without_public_host_when_start_then_invalid_options() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    let options = StartOptions {
        host: Some(String::from("0.0.0.0")),
        ..StartOptions::with_port(8080)
    };

    // When
    let result = gateway.start(&main_surface(), Some(options)).await;

    // Then
    let Err(error) = result else {
        panic!("a wildcard host must not be advertised");
    };
    assert_that!(error.error_code(), eq("INVALID_OPTIONS"));
    assert_that!(error.to_string(), contains_substring("0.0.0.0"));
    assert_that!(launcher.launch_count(), eq(0));
}

#[tokio::test]
async fn given_wildcard_host_with_public_host_when_start_then_advertises_public_host() {
    // Given
    let launcher = FakeLauncher::new();
    let server = ServerConfig {
        public_host: Some(String::from("192.168.1.50")),
        ..ServerConfig::default()
    };
    let gateway = gateway_with_server(&launcher, server);
    let options = StartOptions {
        host: Some(String::from("0.0.0.0")),
        ..StartOptions::with_port(8080)
    };

    // When
    let status = gateway.start(&main_surface(), Some(options)).await.unwrap();

    // Then
    assert_that!(status.address(), some(eq("http://192.168.1.50:8080")));
}

// =========================================================================
// Proxying
// =========================================================================

#[tokio::test]
async fn given_main_surface_when_start_and_stop_then_proxied_to_manager() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    let (recorded, callback) = recorder();
    let _subscription = gateway.subscribe(&main_surface(), callback).unwrap();

    // When
    let status = gateway.start(&main_surface(), None).await.unwrap();
    let stopped = gateway.stop(&main_surface()).await;

    // Then
    assert_that!(status.address(), some(eq("http://127.0.0.1:8000")));
    assert_that!(stopped, ok(anything()));
    assert_that!(
        states(&recorded),
        eq(&vec![
            ServiceState::Stopped,
            ServiceState::Starting,
            ServiceState::Running,
            ServiceState::Stopping,
            ServiceState::Stopped,
        ])
    );
}

#[tokio::test]
async fn given_running_service_when_late_subscriber_joins_then_receives_running_with_address() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    gateway.start(&main_surface(), None).await.unwrap();

    // When
    let (recorded, callback) = recorder();
    let _subscription = gateway
        .subscribe(&SurfaceId::from("settings"), callback)
        .unwrap();

    // Then
    let received = recorded.lock().unwrap().clone();
    assert_that!(received.len(), eq(1));
    assert_that!(received[0].state(), eq(ServiceState::Running));
    assert!(received[0].address().is_some_and(|a| !a.is_empty()));
}

#[test]
fn given_subscription_when_unsubscribed_twice_via_gateway_then_no_op() {
    // Given
    let launcher = FakeLauncher::new();
    let manager = manager(&launcher);
    let gateway = gateway_for(manager.clone());
    let subscription = gateway.subscribe(&main_surface(), |_| {}).unwrap();

    // When
    let first = gateway.unsubscribe(&main_surface(), &subscription);
    let second = gateway.unsubscribe(&main_surface(), &subscription);

    // Then
    assert_that!(first, ok(anything()));
    assert_that!(second, ok(anything()));
    assert!(!subscription.is_active());
    assert_that!(manager.status_channel().subscriber_count(), eq(0));
}

#[tokio::test]
async fn given_second_start_via_gateway_when_running_then_already_running_code() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    gateway.start(&main_surface(), None).await.unwrap();

    let Err(error) = gateway.start(&main_surface(), None).await else {
        panic!("second start must fail");
    };

    assert_that!(error.error_code(), eq("ALREADY_RUNNING"));
}

// =========================================================================
// Pairing
// =========================================================================

#[tokio::test]
async fn given_stopped_service_when_pairing_for_current_address_then_service_not_running() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);

    let result = gateway.pairing_image_for_current_address(&main_surface(), None);

    assert!(matches!(result, Err(GatewayError::ServiceNotRunning { .. })));
}

#[tokio::test]
async fn given_running_service_when_pairing_for_current_address_then_image_rendered() {
    // Given
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    gateway.start(&main_surface(), None).await.unwrap();

    // When
    let image = gateway
        .pairing_image_for_current_address(
            &SurfaceId::from("settings"),
            Some(RenderOptions {
                width: Some(128),
                ..RenderOptions::default()
            }),
        )
        .unwrap();

    // Then
    assert_that!(image.width(), eq(128));
    assert_that!(image.data_uri(), starts_with("data:image/svg+xml;base64,"));
}

#[test]
fn given_oversized_text_when_pairing_via_gateway_then_encoding_error() {
    let launcher = FakeLauncher::new();
    let gateway = gateway(&launcher);
    let oversized = "x".repeat(4000);

    let result = gateway.make_pairing_image(&main_surface(), Some(&oversized), None);

    let Err(error) = result else {
        panic!("oversized text must fail");
    };
    assert_that!(error.error_code(), eq("ENCODING_ERROR"));
    assert_that!(
        gateway.make_pairing_image(&main_surface(), Some(""), None),
        ok(anything())
    );
}
