use async_trait::async_trait;
use bcbcast::collector::Collector;
use bcbcast::core::data::DateWindow;
use bcbcast::utils::error::{AppError, AppResult};
use bcbcast::{Catalog, Observation, SeriesSource};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every window with one observation on its first day; series in
/// `failing` return a network error.
#[derive(Default)]
struct FakeSource {
    failing: Vec<u32>,
    calls: Mutex<Vec<(u32, Option<DateWindow>)>>,
}

impl FakeSource {
    fn failing(ids: &[u32]) -> Self {
        Self {
            failing: ids.to_vec(),
            ..Self::default()
        }
    }

    fn calls_for(&self, series_id: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == series_id)
            .count()
    }
}

#[async_trait]
impl SeriesSource for FakeSource {
    async fn fetch(&self, series_id: u32, window: Option<DateWindow>) -> AppResult<Vec<Observation>> {
        self.calls.lock().unwrap().push((series_id, window));
        if self.failing.contains(&series_id) {
            return Err(AppError::Network(format!("series {} unavailable", series_id)));
        }
        let date = window
            .map(|w| w.start)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        Ok(vec![
            Observation::new(date, 1.0),
            Observation::new(date + chrono::Duration::days(1), 2.0),
        ])
    }
}

/// Holds every fetch open for a moment and remembers the most fetches
/// seen in flight at once.
#[derive(Default)]
struct SlowSource {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

#[async_trait]
impl SeriesSource for SlowSource {
    async fn fetch(&self, _series_id: u32, _window: Option<DateWindow>) -> AppResult<Vec<Observation>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![Observation::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 1.0)])
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn failing_indicator_does_not_abort_batch() {
    let source = Arc::new(FakeSource::failing(&[11]));
    let collector = Collector::new(source.clone(), Catalog::default()).with_concurrency(2);
    let window = DateWindow::new(date(2023, 1, 1), date(2023, 12, 31));

    let keys = vec!["ipca".to_string(), "selic".to_string(), "igpm".to_string()];
    let outcome = collector.collect_batch(&keys, Some(window)).await.unwrap();

    assert_eq!(outcome.requested(), 3);
    assert!(outcome.series.contains_key("ipca"));
    assert!(outcome.series.contains_key("igpm"));
    assert!(outcome.failures["selic"].contains("unavailable"));
    assert_eq!(outcome.stats.failed_requests, 1);
    assert_eq!(outcome.stats.successful_requests, 2);
    assert_eq!(outcome.stats.total_records, 4);
}

#[tokio::test]
async fn daily_series_are_fetched_in_ten_year_chunks() {
    let source = Arc::new(FakeSource::default());
    let collector = Collector::new(source.clone(), Catalog::default());

    let outcome = collector
        .collect_all(20, &["selic".to_string(), "ipca".to_string()], date(2024, 12, 31))
        .await
        .unwrap();

    // 7301 inclusive days split into windows of at most 3650 days
    assert_eq!(source.calls_for(11), 3);
    assert_eq!(source.calls_for(433), 1);
    assert_eq!(outcome.series["selic"].len(), 6);
    assert_eq!(outcome.series["ipca"].len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_never_exceeds_concurrency_limit() {
    let source = Arc::new(SlowSource::default());
    let collector = Collector::new(source.clone(), Catalog::default()).with_concurrency(2);

    let keys: Vec<String> = ["ipca", "igpm", "inpc", "divida_pib", "transacoes", "resultado_primario"]
        .iter()
        .map(|k| k.to_string())
        .collect();
    let outcome = collector.collect_batch(&keys, None).await.unwrap();

    assert_eq!(outcome.series.len(), 6);
    assert_eq!(source.total.load(Ordering::SeqCst), 6);
    let peak = source.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak concurrency was {}", peak);
}

#[tokio::test]
async fn collect_all_with_absurd_years_is_an_error() {
    let source = Arc::new(FakeSource::default());
    let collector = Collector::new(source.clone(), Catalog::default());

    let err = collector
        .collect_all(u32::MAX, &["ipca".to_string()], date(2024, 12, 31))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Config(_)));
    assert!(source.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_key_is_rejected_before_any_request() {
    let source = Arc::new(FakeSource::default());
    let collector = Collector::new(source.clone(), Catalog::default());

    let err = collector
        .collect_batch(&["ipca".to_string(), "bitcoin".to_string()], None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bitcoin"));
    assert!(source.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn available_period_spans_full_history() {
    let collector = Collector::new(Arc::new(FakeSource::default()), Catalog::default());
    let period = collector.available_period("ipca").await.unwrap();

    assert_eq!(period.first, date(2000, 1, 1));
    assert_eq!(period.last, date(2000, 1, 2));
    assert_eq!(period.count, 2);
}

#[tokio::test]
async fn api_status_follows_source_ping() {
    let up = Collector::new(Arc::new(FakeSource::default()), Catalog::default());
    assert!(up.check_api_status().await);

    let down = Collector::new(Arc::new(FakeSource::failing(&[433])), Catalog::default());
    assert!(!down.check_api_status().await);
}

#[tokio::test]
#[ignore = "hits the live BCB API"]
async fn live_sgs_answers_for_ipca() {
    use bcbcast::collector::SgsClient;
    use bcbcast::config::CollectionConfig;

    let client = SgsClient::new(&CollectionConfig::default()).unwrap();
    let collector = Collector::new(Arc::new(client), Catalog::default());
    let series = collector
        .collect("ipca", Some(DateWindow::new(date(2023, 1, 1), date(2023, 12, 31))))
        .await
        .unwrap();
    assert_eq!(series.len(), 12);
}
