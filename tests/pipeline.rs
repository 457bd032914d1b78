use bcbcast::config::{MlConfig, ReportConfig};
use bcbcast::core::traits::SeriesStore;
use bcbcast::forecast::TrainOptions;
use bcbcast::{Catalog, Observation, Predictor, ReportGenerator, Series, SqliteStore};
use chrono::{Datelike, Months, NaiveDate};
use std::sync::Arc;
use tempfile::TempDir;

/// Six years of monthly inflation-like values with a yearly cycle
fn seasonal_series() -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    (0..72u32)
        .map(|i| {
            let date = start.checked_add_months(Months::new(i)).unwrap();
            let phase = std::f64::consts::TAU * date.month() as f64 / 12.0;
            Observation::new(date, 0.4 + 0.3 * phase.sin() + 0.002 * i as f64)
        })
        .collect()
}

struct Fixture {
    dir: TempDir,
    store: Arc<SqliteStore>,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("economic_data.db")).await.unwrap());
        store
            .save_series(&Series::new("ipca", 433, seasonal_series()))
            .await
            .unwrap();
        Self { dir, store }
    }

    fn ml_config(&self) -> MlConfig {
        MlConfig {
            models_dir: self.dir.path().join("models"),
            n_estimators: 12,
            ..MlConfig::default()
        }
    }

    fn predictor(&self) -> Predictor {
        Predictor::new(self.store.clone(), self.ml_config())
    }
}

#[tokio::test]
async fn train_then_forecast_monthly_series() {
    let fixture = Fixture::new().await;
    let predictor = fixture.predictor();

    assert_eq!(predictor.trainable_indicators().await.unwrap(), vec!["ipca".to_string()]);

    let options = TrainOptions {
        test_size: 0.2,
        window: 6,
    };
    let metrics = predictor.train("ipca", options).await.unwrap();
    // 72 months minus the 6 lag months, split 80/20
    assert_eq!(metrics.samples_train, 52);
    assert_eq!(metrics.samples_test, 14);
    assert!(metrics.rmse.is_finite() && metrics.rmse >= 0.0);

    assert!(predictor.model_path("ipca").exists());
    assert_eq!(predictor.saved_models().unwrap(), vec!["ipca".to_string()]);
    assert!(predictor.model_status("ipca").exists);
    assert!(!predictor.model_status("selic").exists);

    let forecast = predictor.predict_future("ipca", 6).await.unwrap();
    assert_eq!(forecast.last_observed, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
    assert_eq!(forecast.points.len(), 6);
    assert_eq!(forecast.points[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    assert_eq!(forecast.points[5].date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    // Tree predictions are averages of training targets
    for point in &forecast.points {
        assert!(point.value > -0.2 && point.value < 1.2, "{} out of range", point.value);
    }

    let importances = predictor.feature_importance("ipca").unwrap();
    assert_eq!(importances.len(), 6 + 4);
    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(importances.windows(2).all(|w| w[0].1 >= w[1].1));
}

#[tokio::test]
async fn training_is_deterministic_for_a_seed() {
    let fixture = Fixture::new().await;
    let predictor = fixture.predictor();
    let options = TrainOptions::from(predictor.config());

    let first = predictor.train("ipca", options).await.unwrap();
    let forecast_a = predictor.predict_future("ipca", 3).await.unwrap();
    let second = predictor.train("ipca", options).await.unwrap();
    let forecast_b = predictor.predict_future("ipca", 3).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(forecast_a.points, forecast_b.points);
}

#[tokio::test]
async fn forecasting_without_model_or_data_fails() {
    let fixture = Fixture::new().await;
    let predictor = fixture.predictor();

    assert!(predictor.predict_future("ipca", 3).await.is_err());
    assert!(predictor.train("selic", TrainOptions::from(predictor.config())).await.is_err());
    assert!(predictor.predict_future("ipca", 0).await.is_err());
    assert!(predictor.predict_future("ipca", 25).await.is_err());
}

#[tokio::test]
async fn report_includes_trained_forecasts_and_lists_files() {
    let fixture = Fixture::new().await;
    let predictor = fixture.predictor();
    predictor
        .train("ipca", TrainOptions::from(predictor.config()))
        .await
        .unwrap();

    let config = ReportConfig {
        output_dir: fixture.dir.path().join("reports"),
        ..ReportConfig::default()
    };
    let generator = ReportGenerator::new(fixture.store.clone(), fixture.predictor(), Catalog::default(), config);
    assert!(generator.list_reports().unwrap().is_empty());

    let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
    let generated = generator.generate(12, today, true).await.unwrap();
    let report = &generated.report;

    assert_eq!(report.indicators.len(), 1);
    let ipca = report.indicator("ipca").unwrap();
    assert_eq!(ipca.last_value, seasonal_series().last().map(|o| o.value));
    assert!(!ipca.insights.is_empty());
    assert!(report.correlations.is_empty());
    assert_eq!(report.predictions.len(), 1);
    assert_eq!(report.predictions[0].forecast.len(), 6);
    assert!(!report.executive_summary.is_empty());

    let json = std::fs::read_to_string(&generated.json_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["indicators"][0]["key"], "ipca");

    let html_path = generated.html_path.as_ref().unwrap();
    let html = std::fs::read_to_string(html_path).unwrap();
    assert!(html.contains("<svg"));

    let files = generator.list_reports().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.name.starts_with("economic_report_")));
}

#[tokio::test]
async fn report_without_html_writes_json_only() {
    let fixture = Fixture::new().await;
    let config = ReportConfig {
        output_dir: fixture.dir.path().join("reports"),
        ..ReportConfig::default()
    };
    let generator = ReportGenerator::new(fixture.store.clone(), fixture.predictor(), Catalog::default(), config);

    let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
    let generated = generator.generate(6, today, false).await.unwrap();

    assert!(generated.html_path.is_none());
    assert!(generated.json_path.exists());
    assert!(generated.report.predictions.is_empty());
    assert_eq!(generator.list_reports().unwrap().len(), 1);
}

#[tokio::test]
async fn report_with_huge_lookback_errors_instead_of_panicking() {
    let fixture = Fixture::new().await;
    let config = ReportConfig {
        output_dir: fixture.dir.path().join("reports"),
        ..ReportConfig::default()
    };
    let generator = ReportGenerator::new(fixture.store.clone(), fixture.predictor(), Catalog::default(), config);

    let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
    let err = generator.economic_overview(100_000_000, today).await.unwrap_err();
    assert!(matches!(err, bcbcast::utils::error::AppError::Config(_)));
    assert!(generator.list_reports().unwrap().is_empty());
}
