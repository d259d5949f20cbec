use std::sync::Mutex;
use swathquery::{
    BlockIndex,
    DecoyVariant,
    Fragment,
    InMemoryRun,
    MsLevel,
    PeptideCoordinate,
    RtTolerance,
    RunArchive,
    RunArchiveWriter,
    SpectraMap,
    SpectraProvider,
    Spectrum,
};
use swathseek::data_sources::SpeclibEntry;
use swathseek::errors::Result;
use swathseek::fdr::{
    FdrReport,
    IdentifyStatus,
};
use swathseek::ml::{
    Classifier,
    LearningParams,
};
use swathseek::peaks::pick_max_peak;
use swathseek::pipeline::{
    IrtResult,
    PeptideResult,
    ResultRecord,
};
use swathseek::rt_calibration::IrtParams;
use swathseek::{
    AnalysisParams,
    Calibration,
    ResultSink,
    RunAnalyzer,
    RunStatus,
    ScoreType,
    SignalConditioner,
    Speclib,
    TaskSink,
    WeightVector,
};

/// (m/z, apex rt, height) triplets on a 1 s grid over 0..200 s.
fn peak_map(peaks: &[(f64, f32, f32)]) -> SpectraMap {
    let scans = (0..200)
        .map(|i| {
            let rt = i as f32;
            let pairs = peaks
                .iter()
                .map(|&(mz, center, height)| {
                    let y = height * (-((rt - center).powi(2)) / (2.0 * 16.0)).exp();
                    (mz, y + 1.0)
                })
                .collect();
            (rt, Spectrum::from_unsorted_pairs(pairs))
        })
        .collect();
    SpectraMap::from_unsorted(scans)
}

fn sample_block() -> SpectraMap {
    peak_map(&[
        // Target, coeluting at the library RT with library ratios.
        (702.3468, 100.0, 1000.0),
        (605.2940, 100.0, 600.0),
        (504.2463, 100.0, 300.0),
        // Decoy, two of three fragments coelute away from the library RT.
        (687.3000, 60.0, 200.0),
        (590.2500, 60.0, 120.0),
        (489.2000, 150.0, 60.0),
    ])
}

/// Prior weights and no MS1 trace, the synthetic runs carry MS2 only.
fn prior_params() -> AnalysisParams {
    let mut params = AnalysisParams {
        learning: LearningParams {
            classifier: Classifier::Prior,
            ..LearningParams::default()
        },
        ..AnalysisParams::default()
    };
    params.extraction.with_ms1 = false;
    params
}

#[derive(Default)]
struct RecordingSink {
    blocks: Vec<(Option<(f64, f64)>, Vec<String>)>,
    weights: Option<WeightVector>,
    fdr: Option<FdrReport<ResultRecord>>,
    calibration: Option<IrtResult>,
}

impl ResultSink for RecordingSink {
    fn write_calibration(&mut self, calibration: &IrtResult) -> Result<()> {
        assert!(self.blocks.is_empty());
        self.calibration = Some(calibration.clone());
        Ok(())
    }

    fn write_block(&mut self, block: &BlockIndex, results: &[PeptideResult]) -> Result<()> {
        let refs = results
            .iter()
            .map(|r| format!("{}:{}", r.peptide_ref, r.is_decoy))
            .collect();
        self.blocks.push((block.window, refs));
        Ok(())
    }

    fn write_weights(&mut self, weights: &WeightVector) -> Result<()> {
        self.weights = Some(*weights);
        Ok(())
    }

    fn write_fdr(&mut self, report: &FdrReport<ResultRecord>) -> Result<()> {
        self.fdr = Some(report.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingTasks {
    messages: Mutex<Vec<String>>,
    progress: Mutex<Vec<(usize, usize)>>,
    status: Mutex<Option<RunStatus>>,
}

impl TaskSink for RecordingTasks {
    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn progress(&self, done: usize, total: usize) {
        self.progress.lock().unwrap().push((done, total));
    }

    fn finish(&self, status: &RunStatus) {
        *self.status.lock().unwrap() = Some(status.clone());
    }
}

#[test]
fn test_coeluting_gaussians_give_one_feature() {
    let coord = PeptideCoordinate::sample();
    let analyzer = RunAnalyzer::new(AnalysisParams::default());
    let ms2 = sample_block();

    let conditioner = SignalConditioner::new(analyzer.params().signal);
    let rts = ms2.rts();
    let mut scratch = Vec::new();
    for f in coord.fragments() {
        let raw: Vec<f32> = ms2
            .spectra()
            .iter()
            .map(|s| s.window_sum(f.mz - 0.01, f.mz + 0.01))
            .collect();
        let c = conditioner.condition(rts, &raw, &mut scratch);
        let max = pick_max_peak(rts, &c.smoothed, &c.fine_snr, &analyzer.params().peaks)
            .expect("every fragment has a peak");
        assert!((max.apex_rt - 100.0).abs() <= 1.0, "apex at {}", max.apex_rt);
    }

    let out = analyzer.process_block(&[coord], &ms2, None).unwrap();
    assert_eq!(out.results.len(), 1);
    let result = &out.results[0];
    assert_eq!(result.features.len(), 1);
    let top = result.top_feature().unwrap();
    assert!((top.apex_rt - 100.0).abs() <= 1.0);
    assert!(top.scores[ScoreType::XcorrShape] > 0.99);
    assert!(top.scores[ScoreType::XcorrCoelution] < 0.5);
    assert!(top.scores[ScoreType::NormRtScore] <= 1.0);
}

#[test]
fn test_in_memory_run_end_to_end() {
    let run = InMemoryRun::new("run_a")
        .with_ms2_block((390.0, 410.0), sample_block())
        .with_ms2_block((500.0, 520.0), peak_map(&[(300.0, 50.0, 100.0)]));
    let analyzer = RunAnalyzer::new(prior_params());
    let mut sink = RecordingSink::default();
    let tasks = RecordingTasks::default();

    let report = analyzer
        .run(&run, &Speclib::sample(), &mut sink, &tasks)
        .unwrap();

    assert_eq!(report.run_id, "run_a");
    // The second window holds no library entries.
    assert_eq!(report.blocks_processed, 1);
    assert_eq!(report.peptides_scored, 2);
    assert_eq!(report.skipped.total(), 0);
    assert_eq!(report.weights, WeightVector::prior());

    assert_eq!(sink.blocks.len(), 1);
    assert_eq!(sink.blocks[0].0, Some((390.0, 410.0)));
    assert_eq!(
        sink.blocks[0].1,
        vec!["PEPTIDE_2:false".to_string(), "PEPTIDE_2:true".to_string()]
    );
    assert_eq!(sink.weights, Some(WeightVector::prior()));

    let fdr = sink.fdr.unwrap();
    assert_eq!(fdr.summary.total_targets, 1);
    assert_eq!(fdr.summary.total_decoys, 1);
    let target = &fdr.entries[0];
    assert!(!target.is_decoy);
    assert_eq!(target.fdr, Some(0.0));
    assert_eq!(target.status, IdentifyStatus::Identified);
    assert_eq!(target.meta.run_id, "run_a");
    assert_eq!(target.meta.q_value, Some(0.0));
    assert!(target.meta.identified);
    assert!((target.meta.apex_rt - 100.0).abs() <= 1.0);
    let decoy = &fdr.entries[1];
    assert!(decoy.is_decoy);
    assert_eq!(decoy.fdr, None);
    assert!(!decoy.meta.identified);

    assert_eq!(*tasks.status.lock().unwrap(), Some(RunStatus::Completed));
    assert_eq!(tasks.progress.lock().unwrap().last(), Some(&(2, 2)));
    assert!(!tasks.messages.lock().unwrap().is_empty());
}

#[test]
fn test_archive_run_matches_in_memory_run() {
    let dir = std::env::temp_dir().join(format!("swathseek_archive_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run_b.swath");
    let _ = std::fs::remove_file(&path);

    let mut writer = RunArchiveWriter::create(&path, "run_b").unwrap();
    writer
        .write_block(MsLevel::Ms2, Some((390.0, 410.0)), &sample_block())
        .unwrap();
    writer.finish().unwrap();
    let archive = RunArchive::open(&path).unwrap();
    assert_eq!(archive.run_id(), "run_b");

    let analyzer = RunAnalyzer::new(prior_params());
    let mut from_disk = RecordingSink::default();
    let disk_report = analyzer
        .run(&archive, &Speclib::sample(), &mut from_disk, &RecordingTasks::default())
        .unwrap();

    let memory = InMemoryRun::new("run_b").with_ms2_block((390.0, 410.0), sample_block());
    let mut in_memory = RecordingSink::default();
    let memory_report = analyzer
        .run(&memory, &Speclib::sample(), &mut in_memory, &RecordingTasks::default())
        .unwrap();

    assert_eq!(disk_report.peptides_scored, memory_report.peptides_scored);
    assert_eq!(disk_report.summary, memory_report.summary);
    let scores = |s: &RecordingSink| -> Vec<f64> {
        s.fdr
            .as_ref()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.score)
            .collect()
    };
    assert_eq!(scores(&from_disk), scores(&in_memory));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_ms1_fails_the_run() {
    let run = InMemoryRun::new("run_c").with_ms2_block((390.0, 410.0), sample_block());
    let mut params = prior_params();
    params.extraction.with_ms1 = true;
    let analyzer = RunAnalyzer::new(params);
    let mut sink = RecordingSink::default();
    let tasks = RecordingTasks::default();

    let res = analyzer.run(&run, &Speclib::sample(), &mut sink, &tasks);
    assert!(res.is_err());
    assert!(sink.blocks.is_empty());
    assert!(matches!(
        *tasks.status.lock().unwrap(),
        Some(RunStatus::Failed { .. })
    ));
}

#[test]
fn test_run_without_decoy_features_fails_learning() {
    // Only the target signal, so the decoy is skipped and nothing can be
    // learned or ranked.
    let ms2 = peak_map(&[
        (702.3468, 100.0, 1000.0),
        (605.2940, 100.0, 600.0),
        (504.2463, 100.0, 300.0),
    ]);
    let run = InMemoryRun::new("run_d").with_ms2_block((390.0, 410.0), ms2);
    let analyzer = RunAnalyzer::new(prior_params());
    let mut sink = RecordingSink::default();
    let tasks = RecordingTasks::default();

    let res = analyzer.run(&run, &Speclib::sample(), &mut sink, &tasks);
    assert!(res.is_err());
    // Block results are written before learning.
    assert_eq!(sink.blocks.len(), 1);
    assert!(sink.fdr.is_none());
}

const ANCHOR_SLOPE: f32 = 2.0;
const ANCHOR_INTERCEPT: f32 = 20.0;

fn fragments(first_mz: f64) -> Vec<Fragment> {
    [100.0, 60.0, 30.0]
        .into_iter()
        .enumerate()
        .map(|(k, intensity)| Fragment {
            mz: first_mz + 10.0 * k as f64,
            intensity,
            label: format!("y{}", 6 - k),
        })
        .collect()
}

/// Six anchors eluting at `ANCHOR_SLOPE * library_rt + ANCHOR_INTERCEPT`,
/// optionally a seventh far off the line, each with a decoy whose fragments
/// do not coelute.
fn anchor_run(with_outlier: bool) -> (InMemoryRun, Speclib) {
    let mut entries = Vec::new();
    let mut peaks = Vec::new();
    let mut anchors: Vec<(String, f32, f32)> = (0..6)
        .map(|i| {
            let library_rt = 10.0 + 10.0 * i as f32;
            (
                format!("IRT_{}", i),
                library_rt,
                ANCHOR_SLOPE * library_rt + ANCHOR_INTERCEPT,
            )
        })
        .collect();
    if with_outlier {
        anchors.push(("IRT_OFF".into(), 35.0, 180.0));
    }
    for (i, (name, library_rt, run_rt)) in anchors.into_iter().enumerate() {
        let target = fragments(500.0 + 50.0 * i as f64);
        let decoy = fragments(860.0 + 50.0 * i as f64);
        for (f, height) in target.iter().zip([1000.0, 600.0, 300.0]) {
            peaks.push((f.mz, run_rt, height));
        }
        peaks.push((decoy[0].mz, 30.0, 200.0));
        peaks.push((decoy[1].mz, 30.0, 120.0));
        peaks.push((decoy[2].mz, 170.0, 60.0));
        entries.push(SpeclibEntry {
            peptide_ref: name,
            sequence: "PEPTIDE".into(),
            mod_deltas: Vec::new(),
            precursor_mz: 400.0 + i as f64,
            charge: 2,
            library_rt,
            proteins: vec!["IRT".into()],
            fragments: target,
            decoy: Some(DecoyVariant {
                sequence: "PDITPEE".into(),
                mod_deltas: Vec::new(),
                fragments: decoy,
            }),
        });
    }
    let run = InMemoryRun::new("run_irt").with_ms2_block((395.0, 420.0), peak_map(&peaks));
    (run, Speclib::from_entries(entries).unwrap())
}

#[test]
fn test_calibration_from_anchors_recovers_the_line() {
    let (run, library) = anchor_run(true);
    let analyzer = RunAnalyzer::new(prior_params());

    let res = analyzer
        .calibrate(&run, &library, &IrtParams::default())
        .unwrap();
    assert!((res.slope_intercept.slope - ANCHOR_SLOPE as f64).abs() < 0.01);
    assert!((res.slope_intercept.intercept - ANCHOR_INTERCEPT as f64).abs() < 0.5);
    assert_eq!(res.selected.len(), 6);
    assert_eq!(res.unselected.len(), 1);
    assert_eq!(res.unselected[0].peptide_ref, "IRT_OFF");
    for anchor in res.selected.iter() {
        let expected = ANCHOR_SLOPE * anchor.library_rt + ANCHOR_INTERCEPT;
        assert!((anchor.run_rt - expected).abs() <= 1.0, "{:?}", anchor);
    }

    // Restricting the anchors to a named subset.
    let params = IrtParams {
        peptides: vec!["IRT_0".into(), "IRT_2".into(), "IRT_5".into()],
        ..IrtParams::default()
    };
    let res = analyzer.calibrate(&run, &library, &params).unwrap();
    let mut names: Vec<&str> = res.selected.iter().map(|a| a.peptide_ref.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["IRT_0", "IRT_2", "IRT_5"]);
    assert!((res.slope_intercept.slope - ANCHOR_SLOPE as f64).abs() < 0.01);
}

#[test]
fn test_run_calibrated_from_anchors() {
    let (run, library) = anchor_run(false);
    let mut params = prior_params();
    params.calibration = Calibration::FromRun(IrtParams::default());
    // Narrow enough that uncalibrated windows would miss the late anchors.
    params.extraction.rt = RtTolerance::Seconds(30.0);
    let analyzer = RunAnalyzer::new(params);
    let mut sink = RecordingSink::default();
    let tasks = RecordingTasks::default();

    let report = analyzer.run(&run, &library, &mut sink, &tasks).unwrap();
    let calibration = report.calibration.unwrap();
    assert!((calibration.slope_intercept.slope - ANCHOR_SLOPE as f64).abs() < 0.01);
    assert_eq!(sink.calibration, Some(calibration));
    assert_eq!(sink.blocks.len(), 1);

    let fdr = sink.fdr.unwrap();
    assert_eq!(fdr.summary.total_targets, 6);
    for entry in fdr.entries.iter().filter(|e| !e.is_decoy) {
        let i: f32 = entry.meta.peptide_ref["IRT_".len()..].parse().unwrap();
        let expected = ANCHOR_SLOPE * (10.0 + 10.0 * i) + ANCHOR_INTERCEPT;
        assert!(
            (entry.meta.apex_rt - expected).abs() <= 1.0,
            "{} at {}",
            entry.meta.peptide_ref,
            entry.meta.apex_rt
        );
    }
    assert_eq!(*tasks.status.lock().unwrap(), Some(RunStatus::Completed));
}
