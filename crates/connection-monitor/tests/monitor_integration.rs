use std::time::Duration;

use pathwatch_detector_core::{
    DeadlineKind, DetectionDeadlines, DetectorConfig, DetectorState, Timestamp,
};
use pathwatch_monitor::{ConnectionMonitor, Error, MonitorConfig, MonitorEvent};
use tokio::sync::mpsc::error::TryRecvError;

const PTO: Duration = Duration::from_millis(100);

fn staged_config(close_on_blackhole: bool) -> MonitorConfig {
    MonitorConfig {
        connection_label: "conn-test".to_string(),
        close_on_blackhole,
        detector: DetectorConfig {
            path_degrading_ptos: 4,
            path_mtu_reduction_ptos: 6,
            blackhole_ptos: 8,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn detected(kind: DeadlineKind, at_ms: u64) -> MonitorEvent {
    MonitorEvent::Detected {
        connection: "conn-test".to_string(),
        kind,
        at: Timestamp::from_millis(at_ms),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stages_fire_in_order_without_progress() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    monitor.on_forward_progress(PTO).await.unwrap();
    assert!(monitor.is_detection_in_progress().await.unwrap());

    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 400));
    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::MtuReduction, 600));
    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::Blackhole, 800));

    let status = monitor.status().await.unwrap();
    assert_eq!(status.state, DetectorState::Idle);
    assert_eq!(status.alarm_deadline, None);

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_forward_progress_postpones_detection() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();

    for _ in 0..10 {
        monitor.on_forward_progress(PTO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    // Last progress at 2.7s; the round's path degrading deadline is 3.1s
    let status = monitor.status().await.unwrap();
    assert_eq!(status.now, Timestamp::from_millis(3000));
    assert_eq!(status.alarm_deadline, Some(Timestamp::from_millis(3100)));

    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 3100));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_degrading_drops_pending_stage() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    monitor.on_forward_progress(PTO).await.unwrap();

    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 400));

    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.on_forward_progress(PTO).await.unwrap();
    let status = monitor.status().await.unwrap();
    assert_eq!(status.alarm_deadline, Some(Timestamp::from_millis(900)));

    // The mtu deadline of the first round (600ms) never fires
    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 900));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_blackhole_closes_and_rejects_progress() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(true)).unwrap();
    monitor
        .restart(DetectionDeadlines::blackhole_only(Timestamp::from_millis(250)))
        .await
        .unwrap();

    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::Blackhole, 250));
    assert_eq!(
        events.recv().await.unwrap(),
        MonitorEvent::Closed {
            connection: "conn-test".to_string(),
            at: Timestamp::from_millis(250),
        }
    );

    let err = monitor.on_forward_progress(PTO).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Detector(pathwatch_detector_core::Error::PermanentlyStopped)
    ));
    assert_eq!(monitor.status().await.unwrap().state, DetectorState::Disabled);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_soft_stop_then_restart() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    monitor.on_forward_progress(PTO).await.unwrap();
    monitor.stop(false).await.unwrap();
    assert!(!monitor.is_detection_in_progress().await.unwrap());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    monitor.on_forward_progress(PTO).await.unwrap();
    assert!(monitor.is_detection_in_progress().await.unwrap());
    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 2400));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_permanent_stop() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    monitor.on_forward_progress(PTO).await.unwrap();
    monitor.stop(true).await.unwrap();

    assert!(monitor.on_forward_progress(PTO).await.is_err());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_far_future_deadline_keeps_monitor_alive() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    let far = Timestamp::from_secs(u64::MAX);
    monitor
        .restart(DetectionDeadlines::blackhole_only(far))
        .await
        .unwrap();

    let status = monitor.status().await.unwrap();
    assert_eq!(status.now, Timestamp::ZERO);
    assert_eq!(status.alarm_deadline, Some(far));
    assert!(status.is_detection_in_progress());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    monitor.on_forward_progress(PTO).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), detected(DeadlineKind::PathDegrading, 3_600_400));
    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_huge_pto_saturates_deadlines() {
    let (monitor, mut events) = ConnectionMonitor::spawn(staged_config(false)).unwrap();
    monitor
        .on_forward_progress(Duration::from_secs(u64::MAX / 2))
        .await
        .unwrap();

    let status = monitor.status().await.unwrap();
    assert_eq!(status.alarm_deadline, Some(Timestamp::MAX));

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(monitor.is_detection_in_progress().await.unwrap());

    monitor.stop(false).await.unwrap();
    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejects_invalid_config() {
    let config = MonitorConfig {
        event_channel_capacity: 0,
        ..Default::default()
    };
    assert!(matches!(ConnectionMonitor::spawn(config), Err(Error::Config(_))));

    let config = MonitorConfig {
        detector: DetectorConfig {
            blackhole_ptos: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        ConnectionMonitor::spawn(config),
        Err(Error::Detector(_))
    ));
}

#[tokio::test]
async fn test_default_label_and_shutdown() {
    let (monitor, _events) = ConnectionMonitor::spawn(MonitorConfig::default()).unwrap();
    let label = monitor.label().to_string();
    assert_eq!(label, "connection");
    monitor.shutdown().await.unwrap();
}
