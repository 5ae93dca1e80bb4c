//! Integration tests for the delivery-time model builder.
//!
//! A synthetic table shaped like the cleaned delivery data is fitted once with
//! the default configuration and shared by the tests below.

use eta_learning::{
    ARTIFACT_FORMAT_VERSION, DEFAULT_TARGET, LearningError, ModelBuilder, ModelConfig,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

// ============================================================================
// Helper Functions
// ============================================================================

const ROWS: usize = 1000;

const WEATHER: [&str; 4] = ["Sunny", "Cloudy", "Fog", "Stormy"];
const TRAFFIC: [&str; 4] = ["Low", "Medium", "High", "Jam"];
const ORDERS: [&str; 3] = ["Snack", "Meal", "Drinks"];
const VEHICLES: [&str; 3] = ["motorcycle", "scooter", "electric_scooter"];
const CITIES: [&str; 3] = ["Urban", "Metropolitian", "Semi-Urban"];

/// Cleaned orders whose delivery time grows with distance, traffic and
/// festival days, plus a little noise. Every distance is distinct.
fn synthetic_orders(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut age = Vec::with_capacity(n);
    let mut ratings = Vec::with_capacity(n);
    let mut condition = Vec::with_capacity(n);
    let mut multiple = Vec::with_capacity(n);
    let mut distance = Vec::with_capacity(n);
    let mut weather = Vec::with_capacity(n);
    let mut traffic = Vec::with_capacity(n);
    let mut order = Vec::with_capacity(n);
    let mut vehicle = Vec::with_capacity(n);
    let mut festival = Vec::with_capacity(n);
    let mut city = Vec::with_capacity(n);
    let mut minutes = Vec::with_capacity(n);

    for i in 0..n {
        let d = rng.gen_range(0.5..12.0) + i as f64 * 1e-6;
        let t = rng.gen_range(0..TRAFFIC.len());
        let fest = rng.gen_bool(0.1);

        let time = 12.0 + 2.5 * d + 5.0 * t as f64 + if fest { 10.0 } else { 0.0 } + rng.gen_range(-2.0..2.0);

        age.push(rng.gen_range(20..40) as f64);
        ratings.push(rng.gen_range(35..=50) as f64 / 10.0);
        condition.push(rng.gen_range(0..3) as i64);
        multiple.push(rng.gen_range(0..3) as f64);
        distance.push(d);
        weather.push(WEATHER[rng.gen_range(0..WEATHER.len())]);
        traffic.push(TRAFFIC[t]);
        order.push(ORDERS[rng.gen_range(0..ORDERS.len())]);
        vehicle.push(VEHICLES[rng.gen_range(0..VEHICLES.len())]);
        festival.push(if fest { "Yes" } else { "No" });
        city.push(CITIES[rng.gen_range(0..CITIES.len())]);
        minutes.push(time.round() as i64);
    }

    df!(
        "Delivery_person_Age" => age,
        "Delivery_person_Ratings" => ratings,
        "Vehicle_condition" => condition,
        "multiple_deliveries" => multiple,
        "distance_miles" => distance,
        "Weatherconditions" => weather,
        "Road_traffic_density" => traffic,
        "Type_of_order" => order,
        "Type_of_vehicle" => vehicle,
        "Festival" => festival,
        "City" => city,
        DEFAULT_TARGET => minutes,
    )
    .unwrap()
}

fn orders() -> &'static DataFrame {
    static ORDERS_DF: OnceLock<DataFrame> = OnceLock::new();
    ORDERS_DF.get_or_init(|| synthetic_orders(ROWS, 7))
}

fn fitted() -> &'static ModelBuilder {
    static FITTED: OnceLock<ModelBuilder> = OnceLock::new();
    FITTED.get_or_init(|| {
        let mut builder = ModelBuilder::for_training(orders(), ModelConfig::default()).unwrap();
        builder.fit().unwrap();
        builder
    })
}

fn sorted_distances(df: &DataFrame) -> Vec<f64> {
    let mut values: Vec<f64> = df
        .column("distance_miles")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

fn targets(df: &DataFrame) -> Vec<f64> {
    df.column(DEFAULT_TARGET)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

// ============================================================================
// Partitioning
// ============================================================================

#[test]
fn test_split_sizes_are_90_5_5() {
    let sizes = fitted().partitions().unwrap().sizes();
    assert_eq!((sizes.train, sizes.validation, sizes.test), (900, 50, 50));
}

#[test]
fn test_partitions_cover_input_without_overlap() {
    let split = fitted().partitions().unwrap();

    let mut union = sorted_distances(&split.train.x);
    union.extend(sorted_distances(&split.validation.x));
    union.extend(sorted_distances(&split.test.x));
    union.sort_by(f64::total_cmp);

    // distances are unique per row, so equal multisets mean disjoint partitions
    assert_eq!(union, sorted_distances(orders()));
}

#[test]
fn test_same_seed_same_split() {
    let again = ModelBuilder::for_training(orders(), ModelConfig::default()).unwrap();
    let (_, x_test, _, y_test) = again.split().unwrap();
    let (_, fitted_x_test, _, fitted_y_test) = fitted().split().unwrap();

    assert_eq!(sorted_distances(x_test), sorted_distances(fitted_x_test));
    assert_eq!(y_test, fitted_y_test);
}

// ============================================================================
// Fitting and scoring
// ============================================================================

#[test]
fn test_learns_delivery_time() {
    let builder = fitted();
    assert!(builder.is_fitted());

    let metrics = builder.evaluate(None).unwrap();
    assert_eq!(metrics.n_samples, 50);
    assert!(metrics.r2 > 0.5, "test R² too low: {}", metrics.r2);
    assert!(metrics.r2 <= 1.0);
    assert!(metrics.mae < 10.0, "test MAE too high: {}", metrics.mae);

    let validation = builder.validation_metrics().unwrap();
    assert_eq!(validation.n_samples, 50);
    assert!(validation.r2 > 0.5, "validation R² too low: {}", validation.r2);
}

#[test]
fn test_score_on_explicit_table() {
    let fresh = synthetic_orders(40, 99);
    let y = targets(&fresh);

    let r2 = fitted().score(Some((&fresh, y.as_slice()))).unwrap();
    assert!(r2 <= 1.0);
    assert!(r2 > 0.0, "R² on unseen orders: {}", r2);
}

#[test]
fn test_score_length_mismatch() {
    let fresh = synthetic_orders(10, 3);
    let y: &[f64] = &[20.0, 30.0];
    let err = fitted().score(Some((&fresh, y))).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_DATA");
}

#[test]
fn test_model_info() {
    let info = fitted().info();
    assert_eq!(info.target_column, DEFAULT_TARGET);
    assert_eq!(info.features.len(), 11);
    assert_eq!(info.base_learners, ["GradientBoosting", "DecisionTree", "Knn"]);
    assert_eq!(info.meta_learner, "RandomForest");
    // 5 numeric + 4 + 4 + 3 + 3 + 2 + 3 categories
    assert_eq!(info.encoded_width, 24);
    assert!(info.is_fitted);
    assert!(info.created_at.is_none());
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn test_predict_defaults_to_test_partition() {
    let predictions = fitted().predict(None).unwrap();
    assert_eq!(predictions.len(), 50);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_unseen_category_predicts_finite() {
    let mut fresh = synthetic_orders(5, 11);
    fresh
        .with_column(Column::new("Weatherconditions".into(), ["Sandstorms"; 5]))
        .unwrap();
    fresh
        .with_column(Column::new("City".into(), ["Rural"; 5]))
        .unwrap();

    let predictions = fitted().predict(Some(&fresh)).unwrap();
    assert_eq!(predictions.len(), 5);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_predict_missing_feature() {
    let fresh = synthetic_orders(5, 11).drop("Festival").unwrap();
    let err = fitted().predict(Some(&fresh)).unwrap_err();
    assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "Festival"));
}

#[test]
fn test_unfitted_builder_errors() {
    let builder = ModelBuilder::for_training(orders(), ModelConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(builder.predict(None), Err(LearningError::NotFitted)));
    assert!(matches!(builder.score(None), Err(LearningError::NotFitted)));
    assert!(matches!(
        builder.save(dir.path().join("model.json")),
        Err(LearningError::NotFitted)
    ));
    assert!(!dir.path().join("model.json").exists());
}

#[test]
fn test_missing_column_at_construction() {
    let df = orders().drop("distance_miles").unwrap();
    let err = ModelBuilder::for_training(&df, ModelConfig::default()).unwrap_err();
    assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "distance_miles"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stacking_model.json");
    fitted().save(&path).unwrap();

    let restored = ModelBuilder::load(&path).unwrap();
    assert!(restored.is_fitted());
    assert_eq!(restored.config(), fitted().config());
    assert!(restored.info().created_at.is_some());
    // every fitted threshold, mean and scale reloads bit for bit
    assert!(restored.pipeline() == fitted().pipeline());

    let (_, x_test, _, _) = fitted().split().unwrap();
    assert_eq!(
        restored.predict(Some(x_test)).unwrap(),
        fitted().predict(None).unwrap()
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelBuilder::load(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.error_code(), "FILE_ACCESS_ERROR");
}

#[test]
fn test_load_rejects_other_format_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.json");
    let future = serde_json::json!({
        "format_version": ARTIFACT_FORMAT_VERSION + 1,
        "created_at": "2026-01-01T00:00:00Z",
        "layout": "unknown to this build",
    });
    std::fs::write(&path, future.to_string()).unwrap();

    let err = ModelBuilder::load(&path).unwrap_err();
    assert!(matches!(
        err,
        LearningError::UnsupportedArtifact { found, expected }
            if found == ARTIFACT_FORMAT_VERSION + 1 && expected == ARTIFACT_FORMAT_VERSION
    ));
}

#[test]
fn test_load_rejects_non_artifact_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.json");
    std::fs::write(&path, r#"{"name": "not a model"}"#).unwrap();

    let err = ModelBuilder::load(&path).unwrap_err();
    assert_eq!(err.error_code(), "JSON_ERROR");
}

#[test]
fn test_restored_builder_needs_explicit_data() {
    let restored = ModelBuilder::from_artifact(fitted().to_artifact().unwrap()).unwrap();
    assert!(matches!(restored.predict(None), Err(LearningError::NoTrainingData)));
    assert!(matches!(restored.score(None), Err(LearningError::NoTrainingData)));
    assert!(restored.info().split.is_none());
}
