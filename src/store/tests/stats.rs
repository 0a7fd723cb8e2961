use std::sync::Arc;

use crate::gateway::ReportFilters;
use crate::messages;
use crate::store::{FetchStatus, ReportStore, StatsQuery};
use crate::testing::{Failure, FakeGateway, Op};

#[tokio::test]
async fn load_runs_once_and_refresh_refetches() {
    let gateway = Arc::new(FakeGateway::with_reports(3));
    let stats = StatsQuery::new(gateway.clone());

    stats.load().await.unwrap();
    stats.load().await.unwrap();
    assert_eq!(gateway.count(Op::Stats), 1);

    let state = stats.snapshot();
    assert_eq!(state.status, FetchStatus::Ready);
    assert_eq!(state.stats.map(|s| s.submitted_teachers), Some(4));

    stats.refresh().await.unwrap();
    assert_eq!(gateway.count(Op::Stats), 2);
}

#[tokio::test]
async fn failed_refresh_keeps_last_counts() {
    let gateway = Arc::new(FakeGateway::with_reports(3));
    let stats = StatsQuery::new(gateway.clone());
    stats.load().await.unwrap();
    let before = stats.snapshot().stats;

    gateway.fail(Op::Stats, Failure::Server(503));
    assert!(stats.refresh().await.is_err());

    let state = stats.snapshot();
    assert_eq!(state.status, FetchStatus::Error);
    assert_eq!(state.stats, before);
    assert_eq!(state.error.as_deref(), Some(messages::STATS_FAILED));
}

#[tokio::test]
async fn stats_failure_does_not_block_the_report_list() {
    let gateway = Arc::new(FakeGateway::with_reports(12));
    gateway.fail(Op::Stats, Failure::Server(500));
    let stats = StatsQuery::new(gateway.clone());
    let store = ReportStore::new(gateway.clone(), 10);

    let (stats_result, list_result) =
        tokio::join!(stats.load(), store.fetch(1, ReportFilters::default()));

    assert!(stats_result.is_err());
    list_result.unwrap();
    assert_eq!(stats.snapshot().status, FetchStatus::Error);
    assert_eq!(store.status(), FetchStatus::Ready);
    assert_eq!(store.records().len(), 10);
}

#[tokio::test]
async fn superseded_refresh_does_not_overwrite_newer_outcome() {
    let gateway = Arc::new(FakeGateway::with_reports(3));
    let release = gateway.gate(Op::Stats);
    let stats = StatsQuery::new(gateway.clone());
    let stats = &stats;
    let failing = gateway.clone();

    let (slow, fast) = tokio::join!(stats.refresh(), async move {
        failing.fail(Op::Stats, Failure::Server(500));
        let result = stats.refresh().await;
        let _ = release.send(());
        result
    });
    slow.unwrap();
    assert!(fast.is_err());

    let state = stats.snapshot();
    assert_eq!(state.status, FetchStatus::Error);
    assert_eq!(state.stats, None);
    assert_eq!(state.error.as_deref(), Some(messages::STATS_FAILED));
}
