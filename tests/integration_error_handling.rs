//! Error behavior across the public API: validation failures fail fast
//! with specific kinds, batch operations stay resilient.

use chrono::NaiveDate;
use var_dynamics::{
    escalate, AnalysisConfig, FittedVarModel, Frequency, InterpolationMethod,
    InterpolationOptions, MultivariateSeries, TimeSeries, VarAnalysisError, VarPipeline,
};

fn d(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
}

fn annual_series(name: &str, values: &[f64]) -> TimeSeries {
    let index = Frequency::Annual.date_range(d(2000), d(2000 + values.len() as i32 - 1));
    TimeSeries::from_parts(name, index, values.to_vec()).unwrap()
}

#[test]
fn unknown_frequency_label_is_rejected() {
    match Frequency::parse("W") {
        Err(VarAnalysisError::InvalidFrequency { frequency }) => assert_eq!(frequency, "W"),
        other => panic!("expected InvalidFrequency, got {:?}", other),
    }
}

#[test]
fn log_interpolation_rejects_non_positive_values() {
    let ts = annual_series("x", &[10.0, -1.0, 30.0]);
    let err = escalate(
        &ts,
        Frequency::Monthly,
        InterpolationMethod::Linear,
        &InterpolationOptions {
            log_transform: true,
            ..InterpolationOptions::default()
        },
    )
    .unwrap_err();
    assert_eq!(err, VarAnalysisError::NonPositiveForLog);
}

#[test]
fn higher_order_methods_name_themselves_in_errors() {
    let ts = annual_series("x", &[1.0, 2.0]);
    let err = escalate(
        &ts,
        Frequency::Quarterly,
        InterpolationMethod::Polynomial,
        &InterpolationOptions::default(),
    )
    .unwrap_err();
    match err {
        VarAnalysisError::InsufficientPoints { method, .. } => assert_eq!(method, "polynomial"),
        other => panic!("expected InsufficientPoints, got {:?}", other),
    }
}

#[test]
fn duplicate_timestamps_are_rejected_at_construction() {
    let result = TimeSeries::new(
        "x",
        vec![(d(2001), 1.0), (d(2001), 2.0), (d(2002), 3.0)],
    );
    assert!(result.is_err());
}

#[test]
fn var_fit_validates_lag_order() {
    let index = Frequency::Annual.date_range(d(2000), d(2019));
    let a: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();
    let b: Vec<f64> = (0..20).map(|i| (i as f64 * 1.3).cos()).collect();
    let series = MultivariateSeries::from_columns(vec![
        TimeSeries::from_parts("a", index.clone(), a).unwrap(),
        TimeSeries::from_parts("b", index, b).unwrap(),
    ])
    .unwrap();

    assert!(matches!(
        FittedVarModel::fit(&series, 0),
        Err(VarAnalysisError::InvalidParameter { .. })
    ));
    assert!(matches!(
        FittedVarModel::fit(&series, 20),
        Err(VarAnalysisError::InvalidParameter { .. })
    ));
    assert!(FittedVarModel::fit(&series, 1).is_ok());
}

#[test]
fn pipeline_rejects_series_too_short_for_adf() {
    let index = Frequency::Annual.date_range(d(2000), d(2005));
    let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let series = MultivariateSeries::from_columns(vec![
        TimeSeries::from_parts("a", index, values).unwrap()
    ])
    .unwrap();
    let pipeline = VarPipeline::new(AnalysisConfig::default()).unwrap();
    assert!(matches!(
        pipeline.run(&series, "a"),
        Err(VarAnalysisError::InsufficientData { .. })
    ));
}

#[test]
fn pipeline_config_validation_fails_fast() {
    let config = AnalysisConfig {
        adf_alpha: 2.0,
        ..AnalysisConfig::default()
    };
    assert!(VarPipeline::new(config).is_err());
}
