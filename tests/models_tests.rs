// Model serialization tests (JSON camelCase, upper-case aggregation kinds, wincode roundtrip)

use statbins::models::*;

#[test]
fn test_aggregation_type_serializes_upper_case() {
    let json = serde_json::to_string(&AggregationType::Latest).unwrap();
    assert_eq!(json, "\"LATEST\"");
    let back: AggregationType = serde_json::from_str("\"AVG\"").unwrap();
    assert_eq!(back, AggregationType::Avg);
}

#[test]
fn test_aggregation_set_serializes_as_list() {
    let set: AggregationSet = [AggregationType::Sum, AggregationType::Min]
        .into_iter()
        .collect();
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, r#"["MIN","SUM"]"#);
    let back: AggregationSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
}

#[test]
fn test_basic_time_bin_json_has_only_avg_var_count() {
    let bin = TimeBin {
        avg: Some(1.5),
        var: Some(0.5),
        count: 2.0,
        ..Default::default()
    };
    let value = serde_json::to_value(&bin).unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "avg": 1.5, "var": 0.5, "count": 2.0 })
    );
}

#[test]
fn test_time_bin_missing_fields_deserialize_as_none() {
    let bin: TimeBin = serde_json::from_str(r#"{"count": 0.0, "sum": 8.0}"#).unwrap();
    assert_eq!(bin.sum, Some(8.0));
    assert!(bin.avg.is_none());
    assert!(bin.latest.is_none());
}

#[test]
fn test_time_bin_variance_helpers_without_avg() {
    let bin = TimeBin {
        max: Some(3.0),
        ..Default::default()
    };
    assert_eq!(bin.population_variance(), None);
    assert_eq!(bin.sample_variance(), None);
    assert_eq!(bin.std_dev(), None);
}

#[test]
fn test_service_stat_snapshot_wincode_roundtrip() {
    let stat = ServiceStatSnapshot {
        name: "latency".into(),
        latest_value: 3.0,
        accumulated_value: 10.0,
        version: 4,
        last_update_micros_utc: 1_000,
        unit: Some("ms".into()),
        source_time_micros_utc: None,
        service_reference: None,
        log_histogram: Some(LogHistogram {
            bins: [1; LOG_HISTOGRAM_BINS],
        }),
        time_series_stats: Some(TimeSeriesSnapshot {
            bins: vec![BinEntry {
                key: 0,
                bin: TimeBin {
                    latest: Some(3.0),
                    ..Default::default()
                },
            }],
            num_bins: 2,
            bin_duration_millis: 1000,
            aggregation_types: vec![AggregationType::Latest],
            rounding_factor: 10_000_000,
        }),
    };
    let bytes = wincode::serialize(&stat).unwrap();
    let back: ServiceStatSnapshot = wincode::deserialize(&bytes).unwrap();
    assert_eq!(back, stat);
}
