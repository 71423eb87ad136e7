//! Restart request coalescing, debouncing and deferred triggers

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use fabop_core::{
    CertKind, ComponentStatus, RequestStatus, RestartManagerConfig, RestartQueueConfig,
    RestartReason,
};
use fabop_restart::{RestartManager, TriggerOutcome, OPERATOR_CONFIG};
use fabop_testkit::*;
use std::sync::Arc;

fn manager(effects: &TestEffects) -> RestartManager<TestEffects> {
    RestartManager::new(Arc::new(effects.clone()), config_with_jitter(10))
}

fn requests(effects: &TestEffects) -> RestartManagerConfig {
    effects
        .config_maps
        .document(OPERATOR_CONFIG, TEST_NAMESPACE)
        .unwrap_or_default()
}

fn peer_queues(effects: &TestEffects) -> RestartQueueConfig {
    effects
        .config_maps
        .document("peer-restart-config", TEST_NAMESPACE)
        .unwrap_or_default()
}

#[tokio::test]
async fn re_requesting_keeps_original_request_time() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");
    let start = effects.clock.current();

    manager.for_admin_cert_update(&peer1).await.unwrap();
    effects.clock.advance(minutes(3));
    manager.for_admin_cert_update(&peer1).await.unwrap();

    let doc = requests(&effects);
    let request = &doc.instance("peer1").unwrap().requests[&RestartReason::AdminCertUpdate];
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.requested_at, Some(start));
    assert_eq!(effects.config_maps.write_count(), 1);
}

#[tokio::test]
async fn first_request_restarts_immediately() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");

    manager
        .for_cert_update(CertKind::Tls, &peer1)
        .await
        .unwrap();
    let outcome = manager.trigger_if_needed(&peer1).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::Restarted(vec![RestartReason::TlsUpdate]));

    let doc = requests(&effects);
    let request = &doc.instance("peer1").unwrap().requests[&RestartReason::TlsUpdate];
    assert_eq!(request.status, RequestStatus::Complete);
    assert_eq!(request.last_action_at, Some(effects.clock.current()));
    assert_eq!(request.requested_at, None);

    let queues = peer_queues(&effects);
    let head = queues.head("org1").unwrap();
    assert_eq!(head.cr_name, "peer1");
    assert_eq!(head.reason, "tlsUpdate");
    assert_eq!(head.status, ComponentStatus::Pending);
}

#[tokio::test]
async fn pending_reasons_are_joined_in_stable_order() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let orderer1 = orderer("orderer1", "ordererorg");

    manager.for_migration(&orderer1).await.unwrap();
    manager.for_node_ou(&orderer1).await.unwrap();
    manager.for_admin_cert_update(&orderer1).await.unwrap();
    assert_eq!(
        manager.pending_reasons(&orderer1).await.unwrap(),
        vec![
            RestartReason::AdminCertUpdate,
            RestartReason::Migration,
            RestartReason::NodeOU
        ]
    );

    manager.trigger_if_needed(&orderer1).await.unwrap();

    let queues: RestartQueueConfig = effects
        .config_maps
        .document("orderer-restart-config", TEST_NAMESPACE)
        .unwrap();
    assert_eq!(
        queues.head("ordererorg").unwrap().reason,
        "adminCertUpdate,migration,nodeOU"
    );
    assert!(manager.pending_reasons(&orderer1).await.unwrap().is_empty());
}

#[tokio::test]
async fn nothing_pending_is_idle() {
    let effects = TestEffects::new();
    let manager = manager(&effects);

    let outcome = manager.trigger_if_needed(&peer("peer1", "org1")).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::Idle);
    assert_eq!(effects.config_maps.write_count(), 0);
}

#[tokio::test]
async fn request_after_wait_window_restarts_immediately() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");

    manager.for_config_override(&peer1).await.unwrap();
    manager.trigger_if_needed(&peer1).await.unwrap();

    effects.clock.advance(minutes(11));
    manager.for_config_override(&peer1).await.unwrap();
    assert_matches!(
        manager.trigger_if_needed(&peer1).await.unwrap(),
        TriggerOutcome::Restarted(_)
    );
    assert!(!manager.has_timer(&peer1));
    assert_eq!(peer_queues(&effects).queued_len(), 2);
}

#[tokio::test]
async fn request_inside_wait_window_arms_one_timer() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");
    let start = effects.clock.current();

    manager.for_migration(&peer1).await.unwrap();
    manager.trigger_if_needed(&peer1).await.unwrap();

    effects.clock.advance(minutes(5));
    manager.for_migration(&peer1).await.unwrap();

    let first = manager.trigger_if_needed(&peer1).await.unwrap();
    assert_eq!(
        first,
        TriggerOutcome::Deferred {
            until: start + minutes(10),
            armed: true
        }
    );
    assert!(manager.has_timer(&peer1));

    let second = manager.trigger_if_needed(&peer1).await.unwrap();
    assert_matches!(second, TriggerOutcome::Deferred { armed: false, .. });
    assert_eq!(peer_queues(&effects).queued_len(), 1);

    settle().await;

    assert!(!manager.has_timer(&peer1));
    assert_eq!(effects.clock.sleeps(), vec![5 * 60 * 1_000]);
    assert!(manager.pending_reasons(&peer1).await.unwrap().is_empty());

    let queues = peer_queues(&effects);
    assert_eq!(queues.queued_len(), 2);
    assert_eq!(queues.queues["org1"][1].reason, "migration");
}

#[tokio::test]
async fn timer_with_nothing_pending_does_nothing() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");

    manager.for_restart_action(&peer1).await.unwrap();
    manager.trigger_if_needed(&peer1).await.unwrap();
    effects.clock.advance(minutes(1));
    manager.for_restart_action(&peer1).await.unwrap();
    assert_matches!(
        manager.trigger_if_needed(&peer1).await.unwrap(),
        TriggerOutcome::Deferred { armed: true, .. }
    );

    let cleared = manager.clear_restart_config(&peer1).await.unwrap();
    assert_eq!(cleared, vec![RestartReason::RestartAction]);

    settle().await;

    assert_eq!(peer_queues(&effects).queued_len(), 1);
    assert_eq!(effects.deployments.restarts(), Vec::<String>::new());
}

#[tokio::test]
async fn cancelled_timer_leaves_request_pending() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let peer1 = peer("peer1", "org1");

    manager.for_config_map_update(&peer1).await.unwrap();
    manager.trigger_if_needed(&peer1).await.unwrap();
    effects.clock.advance(minutes(2));
    manager.for_config_map_update(&peer1).await.unwrap();
    manager.trigger_if_needed(&peer1).await.unwrap();

    manager.cancel_timers();
    settle().await;

    assert!(!manager.has_timer(&peer1));
    assert_eq!(
        manager.pending_reasons(&peer1).await.unwrap(),
        vec![RestartReason::ConfigMapUpdate]
    );
    assert_eq!(peer_queues(&effects).queued_len(), 1);
}

#[tokio::test]
async fn clear_without_requests_writes_nothing() {
    let effects = TestEffects::new();
    let manager = manager(&effects);

    let cleared = manager.clear_restart_config(&ca("ca1", "org1")).await.unwrap();
    assert!(cleared.is_empty());
    assert_eq!(effects.config_maps.write_count(), 0);
}

#[tokio::test]
async fn console_restart_bypasses_the_queue() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let console = console("console");

    manager.for_restart_action(&console).await.unwrap();
    manager.trigger_if_needed(&console).await.unwrap();

    assert_eq!(effects.deployments.restarts(), vec!["fabric/console".to_string()]);
    let doc: RestartQueueConfig = effects
        .config_maps
        .document("console-restart-config", TEST_NAMESPACE)
        .unwrap();
    assert!(doc.queues.is_empty());
    assert_eq!(doc.log["console"][0].status, ComponentStatus::Restarted);
    assert_eq!(doc.log["console"][0].reason, "restartAction");
    assert_eq!(
        doc.log["console"][0].last_checked_at,
        Some(effects.clock.current())
    );
}

#[tokio::test]
async fn failed_restart_leaves_requests_pending_for_retry() {
    let effects = TestEffects::new();
    let manager = manager(&effects);
    let console = console("console");
    let start = effects.clock.current();
    effects.deployments.fail_restarts_of("console", TEST_NAMESPACE);

    manager.for_restart_action(&console).await.unwrap();
    effects.clock.advance(minutes(1));
    assert!(manager.trigger_if_needed(&console).await.is_err());

    let doc = requests(&effects);
    let request = &doc.instance("console").unwrap().requests[&RestartReason::RestartAction];
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.requested_at, Some(start));
    assert_eq!(request.last_action_at, None);

    effects.deployments.recover("console", TEST_NAMESPACE);
    assert_eq!(
        manager.trigger_if_needed(&console).await.unwrap(),
        TriggerOutcome::Restarted(vec![RestartReason::RestartAction])
    );
    assert_eq!(effects.deployments.restarts(), vec!["fabric/console".to_string()]);
}
