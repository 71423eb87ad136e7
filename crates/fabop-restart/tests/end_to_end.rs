//! Request to completed restart, through both documents

#![allow(clippy::unwrap_used)]

use fabop_core::{
    ComponentStatus, ComponentType, RequestStatus, RestartManagerConfig, RestartReason,
};
use fabop_restart::{RestartManager, TriggerOutcome, OPERATOR_CONFIG};
use fabop_testkit::*;
use std::sync::Arc;

#[tokio::test]
async fn admin_cert_update_restarts_peer_once() {
    let effects = TestEffects::with_seed(7);
    let manager = RestartManager::new(Arc::new(effects.clone()), config_with_jitter(10));
    let peer1 = peer("peer1", "org1");
    effects.pods.set_ready_pods("peer1", TEST_NAMESPACE, &["peer1-7d9f-old"]);

    manager.for_admin_cert_update(&peer1).await.unwrap();
    assert_eq!(
        manager.trigger_if_needed(&peer1).await.unwrap(),
        TriggerOutcome::Restarted(vec![RestartReason::AdminCertUpdate])
    );

    let requests: RestartManagerConfig = effects
        .config_maps
        .document(OPERATOR_CONFIG, TEST_NAMESPACE)
        .unwrap();
    assert_eq!(
        requests.instance("peer1").unwrap().requests[&RestartReason::AdminCertUpdate].status,
        RequestStatus::Complete
    );

    let stagger = manager.stagger();
    let queued = stagger
        .queue_snapshot(ComponentType::Peer, TEST_NAMESPACE)
        .await
        .unwrap();
    assert_eq!(queued.queues["org1"].len(), 1);
    assert_eq!(queued.queues["org1"][0].cr_name, "peer1");
    assert_eq!(queued.queues["org1"][0].status, ComponentStatus::Pending);

    assert!(stagger.reconcile(ComponentType::Peer, TEST_NAMESPACE).await.unwrap());
    let waiting = stagger
        .queue_snapshot(ComponentType::Peer, TEST_NAMESPACE)
        .await
        .unwrap();
    assert_eq!(waiting.queues["org1"][0].status, ComponentStatus::Waiting);
    assert_eq!(
        waiting.queues["org1"][0].pod_name.as_deref(),
        Some("peer1-7d9f-old")
    );

    effects.clock.advance(minutes(1));
    effects
        .pods
        .set_ready_pods("peer1", TEST_NAMESPACE, &["peer1-8c2a-new"]);
    assert!(!stagger.reconcile(ComponentType::Peer, TEST_NAMESPACE).await.unwrap());

    let done = stagger
        .queue_snapshot(ComponentType::Peer, TEST_NAMESPACE)
        .await
        .unwrap();
    assert!(done.queues["org1"].is_empty());
    assert_eq!(done.log["peer1"].len(), 1);
    assert_eq!(done.log["peer1"][0].status, ComponentStatus::Completed);
    assert_eq!(done.log["peer1"][0].reason, "adminCertUpdate");
    assert_eq!(effects.deployments.restart_count("peer1", TEST_NAMESPACE), 1);
}
