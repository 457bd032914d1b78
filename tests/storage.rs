use bcbcast::core::traits::SeriesStore;
use bcbcast::{Observation, Series, SqliteStore};
use chrono::NaiveDate;
use tempfile::TempDir;

fn monthly(year: i32, values: &[f64]) -> Vec<Observation> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Observation::new(NaiveDate::from_ymd_opt(year, i as u32 + 1, 1).unwrap(), *v))
        .collect()
}

#[tokio::test]
async fn data_survives_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("economic_data.db");

    let store = SqliteStore::open(&path).await.unwrap();
    store
        .save_series(&Series::new("ipca", 433, monthly(2024, &[0.42, 0.83, 0.16])))
        .await
        .unwrap();
    store.close().await;

    let reopened = SqliteStore::open(&path).await.unwrap();
    reopened.ping().await.unwrap();
    let loaded = reopened.load_series("ipca", None, None).await.unwrap();
    assert_eq!(loaded, monthly(2024, &[0.42, 0.83, 0.16]));
    assert_eq!(reopened.count("ipca").await.unwrap(), 3);
}

#[tokio::test]
async fn recollecting_overlapping_period_keeps_one_row_per_date() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&dir.path().join("db.sqlite")).await.unwrap();

    store
        .save_series(&Series::new("igpm", 189, monthly(2024, &[1.0, 2.0, 3.0, 4.0])))
        .await
        .unwrap();
    store
        .save_series(&Series::new("igpm", 189, monthly(2024, &[1.0, 2.5, 3.5, 4.0, 5.0, 6.0])))
        .await
        .unwrap();

    let loaded = store.load_series("igpm", None, None).await.unwrap();
    assert_eq!(loaded.len(), 6);
    assert_eq!(loaded[1].value, 2.5);

    let summaries = store.summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].last_value, Some(6.0));
}

#[tokio::test]
async fn purge_empties_everything() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&dir.path().join("db.sqlite")).await.unwrap();
    store
        .save_series(&Series::new("ipca", 433, monthly(2023, &[0.5, 0.6])))
        .await
        .unwrap();
    store
        .save_series(&Series::new("inpc", 188, monthly(2023, &[0.4])))
        .await
        .unwrap();

    assert_eq!(store.purge().await.unwrap(), 3);
    assert!(store.summaries().await.unwrap().is_empty());
    assert!(store.load_series("ipca", None, None).await.unwrap().is_empty());
}
