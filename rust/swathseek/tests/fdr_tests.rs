use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use swathseek::fdr::{
    FdrEngine,
    FdrEntry,
    FdrParams,
    IdentifyStatus,
};

fn engine(cutoff: f64) -> FdrEngine {
    FdrEngine::new(FdrParams {
        fdr_cutoff: cutoff,
        retain_cutoff: None,
    })
}

#[test]
fn test_two_targets_two_decoys() {
    let entries = vec![
        FdrEntry::new(0.7, false, "T2"),
        FdrEntry::new(0.3, true, "D2"),
        FdrEntry::new(0.9, false, "T1"),
        FdrEntry::new(0.8, true, "D1"),
    ];
    let report = engine(0.01).evaluate(entries);
    let names: Vec<&str> = report.entries.iter().map(|e| e.meta).collect();
    assert_eq!(names, vec!["T1", "D1", "T2", "D2"]);

    let e = &report.entries;
    assert_eq!(e[0].fdr, Some(0.0));
    assert_eq!(e[0].q_value, Some(0.0));
    // 0.8 is closer to 0.9 than to 0.7.
    assert_eq!(e[1].fdr, Some(0.0));
    assert_eq!(e[1].q_value, Some(0.0));
    assert_eq!(e[2].fdr, Some(0.5));
    assert_eq!(e[2].q_value, Some(0.5));
    // Nothing below the last decoy.
    assert_eq!(e[3].fdr, None);
    assert_eq!(e[3].q_value, None);

    assert_eq!(e[0].status, IdentifyStatus::Identified);
    assert_eq!(e[2].status, IdentifyStatus::NotIdentified);
    assert_eq!(report.summary.total_targets, 2);
    assert_eq!(report.summary.total_decoys, 2);
    assert_eq!(report.summary.identified_targets, 1);
    assert_eq!(report.summary.identified_decoys, 1);
    assert_eq!(report.summary.min_total_score, Some(0.8));
}

#[test]
fn test_q_values_are_monotone() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let entries: Vec<FdrEntry<()>> = (0..2000)
        .map(|i| {
            let is_decoy = i % 2 == 1;
            let shift = if is_decoy { 0.0 } else { 1.5 };
            FdrEntry::new(rng.gen_range(0.0..3.0) + shift, is_decoy, ())
        })
        .collect();
    let report = engine(0.01).evaluate(entries);

    let mut last_q = 0.0;
    let mut last_score = f64::INFINITY;
    for e in report.entries.iter() {
        assert!(e.score <= last_score);
        last_score = e.score;
        if e.is_decoy {
            continue;
        }
        let q = e.q_value.unwrap();
        let fdr = e.fdr.unwrap();
        assert!(q >= last_q);
        assert!(q <= fdr);
        last_q = q;
    }
    let summary = &report.summary;
    assert_eq!(summary.total_targets + summary.total_decoys, 2000);
    assert!(summary.identified_targets > 0);

    let binned: usize = report
        .distribution
        .bands
        .iter()
        .map(|b| b.targets + b.decoys)
        .sum();
    let with_fdr = report.entries.iter().filter(|e| e.fdr.is_some()).count();
    assert_eq!(binned, with_fdr);
}

#[test]
fn test_retain_cutoff_drops_null_and_high_fdr() {
    let entries = vec![
        FdrEntry::new(0.9, false, 1),
        FdrEntry::new(0.8, true, 2),
        FdrEntry::new(0.7, false, 3),
        FdrEntry::new(0.3, true, 4),
    ];
    let report = FdrEngine::new(FdrParams {
        fdr_cutoff: 0.01,
        retain_cutoff: Some(0.1),
    })
    .evaluate(entries);
    let kept: Vec<i32> = report.entries.iter().map(|e| e.meta).collect();
    assert_eq!(kept, vec![1, 2]);
    // Summary counts are taken before filtering.
    assert_eq!(report.summary.total_targets, 2);
}
