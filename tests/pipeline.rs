//! End-to-end runs over CSV input and on-disk model files

use approx::assert_relative_eq;
use hcp_engine::{
    hcp::InputColumns,
    load_hcps, load_hcps_from_reader,
    market::{attribute, decompose, AttributionConfig, CompetitorCluster},
    output::write_csv,
    scoring::{AlignmentPolicy, SlotReport},
    Channel, Engine, EngineConfig, EngineError, ModelKey, ModelRegistry, NgdClass, Outcome,
    Product, Segment,
};
use std::fs;
use std::path::Path;

const INPUT: &str = "\
id,specialty,ibsa_volume_trx,ibsa_share_pct_trx,ibsa_volume_nrx,ibsa_share_pct_nrx,tenure_years,calls_90d,samples_90d
1001,Endocrinology,25,50,6,30,4,10,2
1002,Family Medicine,40,0,9,,1,2,0
1003,Rheumatology,100,200,12,-5,8,20,5
1004,Physical Medicine & Rehab,18,12.5,3,10,2,6,1
1005,Pediatrics,0,35,0,0,0,0,0
";

fn write_models(dir: &Path) {
    let models = [
        (
            "tirosint_call_success",
            r#"{"kind": "logistic", "weights": [0.1, 0.2, 0.3], "intercept": -1.0}"#,
        ),
        (
            "flector_call_success",
            r#"{"kind": "logistic", "weights": [0.05, 0.1, 0.1], "intercept": -0.5}"#,
        ),
        (
            "tirosint_prescription_lift",
            r#"{"kind": "linear", "weights": [0.5, 0.4, 0.2], "intercept": 0.0}"#,
        ),
        (
            "flector_prescription_lift",
            r#"{"kind": "linear", "weights": [0.1, 0.2, 0.3], "intercept": 1.0}"#,
        ),
        (
            "tirosint_ngd_category",
            r#"{"kind": "logistic", "weights": [0.0, 0.05, 0.0], "intercept": 0.0}"#,
        ),
        (
            "tirosint_wallet_share_growth",
            r#"{"kind": "linear", "weights": [0.1, 0.0, 0.0], "intercept": 0.2}"#,
        ),
        (
            "flector_wallet_share_growth",
            r#"{"kind": "linear", "weights": [0.0, 0.05, 0.0], "intercept": 0.1}"#,
        ),
        // wrong width: four inputs against a three-column batch
        ("licart_wallet_share_growth", r#"{"kind": "linear", "weights": [1.0, 1.0, 1.0, 1.0]}"#),
        // corrupt file
        ("licart_call_success", "{ this is not json"),
    ];
    for (stem, body) in models {
        fs::write(dir.join(format!("{stem}.json")), body).unwrap();
    }
}

fn run_to_string(config: EngineConfig, models: &Path) -> String {
    let batch = load_hcps_from_reader(INPUT.as_bytes(), &config.input).unwrap();
    let engine = Engine::new(config, ModelRegistry::load_dir(models));
    let result = engine.run(&batch);
    let mut buf = Vec::new();
    write_csv(&result, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn identical_input_produces_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    write_models(dir.path());

    let a = run_to_string(EngineConfig::default(), dir.path());
    let b = run_to_string(EngineConfig::default(), dir.path());
    assert_eq!(a, b);

    let sequential = EngineConfig { parallel: false, ..Default::default() };
    assert_eq!(a, run_to_string(sequential, dir.path()));
}

#[test]
fn unavailable_and_mismatched_models_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    write_models(dir.path());

    let batch = load_hcps_from_reader(INPUT.as_bytes(), &InputColumns::default()).unwrap();
    assert_eq!(batch.feature_width(), 3);

    let registry = ModelRegistry::load_dir(dir.path());
    assert_eq!(registry.available_count(), 8);

    let result = Engine::new(EngineConfig::default(), registry).run(&batch);
    assert_eq!(result.report.scored_count(), 7);

    let licart_wsg = ModelKey::new(Product::Licart, Outcome::WalletShareGrowth);
    assert!(matches!(result.report.slots[&licart_wsg], SlotReport::Skipped { .. }));
    let licart_cs = ModelKey::new(Product::Licart, Outcome::CallSuccess);
    assert!(matches!(result.report.slots[&licart_cs], SlotReport::Unavailable { .. }));

    let mut buf = Vec::new();
    write_csv(&result, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert!(header.contains(&"tirosint_call_success_prob"));
    assert!(!header.contains(&"licart_wallet_share_growth_pred"));
    assert!(!header.contains(&"licart_call_success_pred"));
    assert!(header.contains(&"segment"));
    assert_eq!(text.lines().count(), 6);

    // source columns lead, unchanged, and are not repeated
    let source: Vec<&str> = INPUT.lines().next().unwrap().split(',').collect();
    assert_eq!(&header[..source.len()], &source[..]);
    assert_eq!(header.iter().filter(|h| **h == "ibsa_volume_trx").count(), 1);
    assert_eq!(header[source.len()], "tirosint_call_success_pred");

    let first: Vec<&str> = lines.next().unwrap().split(',').collect();
    let expected = ["1001", "Endocrinology", "25", "50", "6", "30", "4", "10", "2"];
    assert_eq!(&first[..source.len()], &expected);
}

#[test]
fn lossy_alignment_scores_every_loadable_model() {
    let dir = tempfile::tempdir().unwrap();
    write_models(dir.path());
    let batch = load_hcps_from_reader(INPUT.as_bytes(), &InputColumns::default()).unwrap();
    let config = EngineConfig { alignment: AlignmentPolicy::Lossy, ..Default::default() };
    let result = Engine::new(config, ModelRegistry::load_dir(dir.path())).run(&batch);
    assert_eq!(result.report.scored_count(), 8);
}

#[test]
fn decomposition_invariants_hold_for_every_row() {
    let dir = tempfile::tempdir().unwrap();
    write_models(dir.path());
    let batch = load_hcps_from_reader(INPUT.as_bytes(), &InputColumns::default()).unwrap();
    let engine = Engine::new(EngineConfig::default(), ModelRegistry::load_dir(dir.path()));
    let result = engine.run(&batch);

    for row in &result.rows {
        for channel in Channel::ALL {
            let out = row.channel(channel);
            assert!(out.snapshot.competitor_volume >= 0.0);
            assert!(out.snapshot.total_market_volume >= out.snapshot.ibsa_volume);
            let attributed = out.attribution.total();
            let expected = out.snapshot.competitor_volume;
            assert!(
                (attributed - expected).abs() <= 1e-6 * expected.max(1.0),
                "{} {channel}: attributed {attributed} vs competitor {expected}",
                row.id
            );
            for (_, v) in out.attribution.iter() {
                assert!(v >= 0.0);
            }
        }
    }

    let first = result.rows[0].channel(Channel::Trx);
    assert_relative_eq!(first.snapshot.total_market_volume, 50.0, epsilon = 1e-9);
    assert_relative_eq!(first.snapshot.competitor_volume, 25.0, epsilon = 1e-9);

    let zero_share = result.rows[1].channel(Channel::Trx);
    assert_eq!(zero_share.snapshot.total_market_volume, 40.0);
    assert_eq!(zero_share.snapshot.competitor_volume, 0.0);

    let inconsistent = result.rows[2].channel(Channel::Trx);
    assert_relative_eq!(inconsistent.snapshot.implied_market_volume, 50.0, epsilon = 1e-9);
    assert_eq!(inconsistent.snapshot.competitor_volume, 0.0);
}

#[test]
fn conservation_over_adversarial_grid() {
    let cfg = AttributionConfig::default();
    let boosted = AttributionConfig { specialty_boost: 1e300, ..Default::default() };
    let volumes = [0.0, 0.001, 1.0, 37.0, 1e6, 1e300, 1e307, f64::MAX];
    let shares = [
        None,
        Some(-10.0),
        Some(0.0),
        Some(1e-310),
        Some(f64::MIN_POSITIVE),
        Some(0.01),
        Some(33.3),
        Some(100.0),
        Some(250.0),
    ];
    let weights = [
        [0.0, 0.0, 0.0],
        [-1.0, 2.0, 0.5],
        [1e-9, 0.0, 0.0],
        [5.0, 5.0, 5.0],
        [1e300, 1e-300, 0.0],
    ];
    let specialties = [
        "",
        "ENDOCRINOLOGY",
        "thyroid / sports / neurology",
        "Dermatology",
    ];

    for &volume in &volumes {
        for &share in &shares {
            let snap = decompose(volume, share);
            assert!(snap.implied_market_volume.is_finite(), "{volume} {share:?}");
            assert!(snap.total_market_volume.is_finite(), "{volume} {share:?}");
            assert!(snap.competitor_volume.is_finite(), "{volume} {share:?}");
            assert!(snap.competitor_volume >= 0.0);
            assert!(snap.total_market_volume >= snap.ibsa_volume);
            for &w in &weights {
                for specialty in specialties {
                    for c in [&cfg, &boosted] {
                        let r = attribute(snap.competitor_volume, w, specialty, c);
                        let total = r.total();
                        assert!(total.is_finite(), "{volume} {share:?} {w:?} {specialty}");
                        let diff = (total - snap.competitor_volume).abs();
                        assert!(
                            diff <= 1e-6 * snap.competitor_volume || diff < 1e-12,
                            "{volume} {share:?} {w:?} {specialty}: {total} vs {}",
                            snap.competitor_volume
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn default_share_fallback_with_zero_weights() {
    let cfg = AttributionConfig::default();
    let r = attribute(100.0, [0.0; 3], "General Practice", &cfg);
    assert_relative_eq!(r.get(CompetitorCluster::Levothyroxine), 40.0, epsilon = 1e-9);
    assert_relative_eq!(r.get(CompetitorCluster::OralNsaid), 35.0, epsilon = 1e-9);
    assert_relative_eq!(r.get(CompetitorCluster::TopicalAnalgesic), 25.0, epsilon = 1e-9);
}

#[test]
fn scoring_path_produces_expected_labels() {
    let dir = tempfile::tempdir().unwrap();
    write_models(dir.path());
    let batch = load_hcps_from_reader(INPUT.as_bytes(), &InputColumns::default()).unwrap();
    let engine = Engine::new(EngineConfig::default(), ModelRegistry::load_dir(dir.path()));
    let result = engine.run(&batch);

    // 1003: features (8, 20, 5)
    // tirosint cs: sigmoid(0.8 + 4 + 1.5 - 1) = sigmoid(5.3)
    // flector cs: sigmoid(0.4 + 2 + 0.5 - 0.5) = sigmoid(2.4)
    // lift: (4 + 8 + 1) + (0.8 + 4 + 1.5 + 1) = 20.3
    let row = &result.rows[2];
    let expected_cs = (1.0 / (1.0 + (-5.3f64).exp()) + 1.0 / (1.0 + (-2.4f64).exp())) / 2.0;
    assert_relative_eq!(row.metrics.call_success_prob, expected_cs, epsilon = 1e-12);
    assert_relative_eq!(row.metrics.forecasted_lift, 20.3, epsilon = 1e-9);
    assert_eq!(row.assignment.segment, Segment::Champions);
    // ngd: sigmoid(0.05 * 20) = sigmoid(1.0) ≈ 0.731 -> Grower
    assert_eq!(row.metrics.ngd_classification, NgdClass::Grower);

    // 1005: all-zero features
    // cs: mean(sigmoid(-1), sigmoid(-0.5)) ≈ 0.323, lift 1.0 -> churn ≈ 0.677
    let quiet = &result.rows[4];
    assert_eq!(quiet.assignment.segment, Segment::AtRisk);
    assert_eq!(quiet.metrics.ngd_classification, NgdClass::Grower);
}

#[test]
fn missing_identifier_column_fails_before_processing() {
    let csv = "npi,specialty,ibsa_volume_trx\n1,Endo,3\n";
    let err = load_hcps_from_reader(csv.as_bytes(), &InputColumns::default()).unwrap_err();
    assert!(matches!(err, EngineError::MissingColumn { ref column } if column == "id"));
}

#[test]
fn load_from_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hcps.csv");
    fs::write(&path, INPUT).unwrap();
    let batch = load_hcps(&path, &InputColumns::default()).unwrap();
    assert_eq!(batch.len(), 5);
    assert_eq!(batch.records[3].trx.share_pct, Some(12.5));
}
