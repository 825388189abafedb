use std::sync::Arc;
use std::time::Duration;

use pulsecake_detector::{DetectorConfig, FailureDetector};
use pulsecake_transport::Transport;

fn config() -> DetectorConfig {
    DetectorConfig::default()
        .with_start_delay(Duration::from_millis(100))
        .with_beat_interval(Duration::from_millis(50))
        .with_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn test_unopened_neighbor_is_reported() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = test_helper::directory_with_ids(&["gray", "lynch", "mills"]);
    let gray = Arc::new(Transport::open("gray", &directory).await?);
    let lynch = Arc::new(Transport::open("lynch", &directory).await?);

    // mills is in the directory but never opens a transport.
    let gray_detector = FailureDetector::start(gray.clone(), ["lynch", "mills"], config())?;
    let lynch_detector = FailureDetector::start(lynch.clone(), ["gray"], config())?;

    let suspicion = tokio::time::timeout(Duration::from_secs(5), gray_detector.next_suspicion())
        .await?
        .expect("Detector should be running");
    assert_eq!(suspicion.neighbor, "mills");
    assert_eq!(suspicion.to_string(), "mills failed");

    tokio::time::sleep(Duration::from_millis(600)).await;
    for suspicion in gray_detector.suspicions().try_iter() {
        assert_eq!(suspicion.neighbor, "mills", "lynch is alive");
    }
    assert!(lynch_detector.suspicions().try_iter().next().is_none(), "gray is alive");

    let stats = gray_detector.statistics();
    assert!(stats.heartbeats_sent() > 0);
    assert!(stats.heartbeat_failures() > 0, "mills never bound an address");
    assert!(stats.messages_received() > 0);

    gray_detector.shutdown();
    lynch_detector.shutdown();
    gray.close().await?;
    lynch.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_closed_neighbor_is_reported() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = test_helper::directory_with_ids(&["gray", "lynch"]);
    let gray = Arc::new(Transport::open("gray", &directory).await?);
    let lynch = Arc::new(Transport::open("lynch", &directory).await?);

    let gray_detector = FailureDetector::start(gray.clone(), ["lynch"], config())?;
    let lynch_detector = FailureDetector::start(lynch.clone(), ["gray"], config())?;

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(gray_detector.suspicions().try_iter().next().is_none());

    lynch_detector.shutdown();
    lynch.close().await?;

    let suspicion = tokio::time::timeout(Duration::from_secs(5), gray_detector.next_suspicion())
        .await?
        .expect("Detector should be running");
    assert_eq!(suspicion.neighbor, "lynch");

    gray_detector.shutdown();
    gray.close().await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_silent_neighbor_reported_every_window() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    const WINDOWS: u32 = 10;
    let timeout = Duration::from_millis(200);
    let config = DetectorConfig::default()
        .with_start_delay(Duration::from_millis(50))
        .with_beat_interval(Duration::from_millis(50))
        .with_timeout(timeout);

    let directory = test_helper::directory_with_ids(&["gray", "mills"]);
    let gray = Arc::new(Transport::open("gray", &directory).await?);
    let detector = FailureDetector::start(gray.clone(), ["mills"], config)?;

    let first = tokio::time::timeout(Duration::from_secs(5), detector.next_suspicion())
        .await?
        .expect("Detector should be running");
    assert_eq!(first.neighbor, "mills");

    tokio::time::sleep(timeout * WINDOWS + timeout / 2).await;

    let reports = detector.suspicions().try_iter().collect::<Vec<_>>();
    for suspicion in reports.iter() {
        assert_eq!(suspicion.neighbor, "mills");
        assert!(suspicion.silent_for >= timeout, "{suspicion:?}");
    }
    // One report per window, a stalled test runner may push the last one out.
    let count = reports.len() as u32;
    assert!(
        (WINDOWS - 1..=WINDOWS).contains(&count),
        "Expected one report per timeout window, got {count} over {WINDOWS} windows"
    );

    detector.shutdown();
    gray.close().await?;

    Ok(())
}
