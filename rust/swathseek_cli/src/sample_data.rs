/// Writes a small synthetic DIA run archive plus matching library and
/// config, for smoke testing the `swathseek` binary end to end.
///
/// Peptide sequences are random tryptic-looking strings. Targets elute as
/// Gaussians near their library RT (most of them, some are left out),
/// decoys never elute and every scan carries random noise peaks.
use clap::{
    Parser,
    Subcommand,
};
use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::path::{
    Path,
    PathBuf,
};
use swathquery::models::ion_ladder::{
    averagine_isotopes,
    IonLadder,
};
use swathquery::{
    DecoyVariant,
    Fragment,
    MsLevel,
    RunArchiveWriter,
    SpectraMap,
    Spectrum,
};
use swathseek::data_sources::SpeclibEntry;
use swathseek::Speclib;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const PROTON: f64 = 1.007276;
const NEUTRON: f64 = 1.00335;
const RESIDUES: &[u8] = b"ACDEFGHILMNPQSTVWY";
const CYCLE_SECONDS: f32 = 2.0;
const GRADIENT_SECONDS: f32 = 600.0;
const FIRST_WINDOW: f64 = 400.0;
const WINDOW_WIDTH: f64 = 25.0;
const NUM_WINDOWS: usize = 24;
const PEAK_SIGMA: f32 = 4.0;
const NOISE_PEAKS: usize = 40;
const FRAGMENTS_PER_PEPTIDE: usize = 6;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Write `sample.swath`, `library.json` and `config.json`
    Generate {
        #[arg(short, long)]
        output_dir: PathBuf,
        #[arg(short, long, default_value_t = 500)]
        peptides: usize,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
    /// Parse a library file and print it
    Parse {
        #[arg(short, long)]
        library: PathBuf,
    },
}

struct SyntheticPeptide {
    entry: SpeclibEntry,
    neutral_mass: f64,
    /// Run RT of the apex, `None` when the peptide is absent from the run.
    apex_rt: Option<f32>,
    abundance: f32,
}

fn random_sequence(rng: &mut ChaCha8Rng) -> String {
    let len = rng.gen_range(7..14);
    let mut seq: String = (0..len)
        .map(|_| RESIDUES[rng.gen_range(0..RESIDUES.len())] as char)
        .collect();
    seq.push(if rng.gen_bool(0.5) { 'K' } else { 'R' });
    seq
}

/// The largest singly charged y ions inside the usual fragment range.
fn pick_fragments(ladder: &IonLadder, intensities: &[f32]) -> Vec<Fragment> {
    ladder
        .y_singly()
        .iter()
        .enumerate()
        .skip(2)
        .filter(|(_, mz)| (250.0..1500.0).contains(*mz))
        .rev()
        .take(intensities.len())
        .zip(intensities.iter())
        .map(|((i, mz), intensity)| Fragment {
            mz: *mz,
            intensity: *intensity,
            label: format!("y{}", i + 1),
        })
        .collect()
}

fn build_peptides(n: usize, rng: &mut ChaCha8Rng) -> Result<Vec<SyntheticPeptide>, Box<dyn Error>> {
    let upper = FIRST_WINDOW + WINDOW_WIDTH * NUM_WINDOWS as f64;
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let sequence = random_sequence(rng);
        let ladder = IonLadder::try_new(&sequence, &[], 1).map_err(|e| format!("{:?}", e))?;
        let (Some(b_last), Some(y1)) = (ladder.b_singly().last(), ladder.y_singly().first()) else {
            continue;
        };
        let neutral_mass = b_last + y1 - 2.0 * PROTON;
        let charge = 2u8;
        let precursor_mz = (neutral_mass + charge as f64 * PROTON) / charge as f64;
        if !(FIRST_WINDOW..upper).contains(&precursor_mz) {
            continue;
        }

        let intensities: Vec<f32> = (0..FRAGMENTS_PER_PEPTIDE)
            .map(|_| rng.gen_range(10.0..100.0))
            .collect();
        let fragments = pick_fragments(&ladder, &intensities);
        if fragments.len() < 3 {
            continue;
        }

        let mut decoy_sequence: String = sequence[..sequence.len() - 1].chars().rev().collect();
        decoy_sequence.push_str(&sequence[sequence.len() - 1..]);
        let decoy_ladder =
            IonLadder::try_new(&decoy_sequence, &[], 1).map_err(|e| format!("{:?}", e))?;
        let decoy_fragments = pick_fragments(&decoy_ladder, &intensities);

        let library_rt = rng.gen_range(30.0..(GRADIENT_SECONDS - 30.0));
        let apex_rt = rng
            .gen_bool(0.8)
            .then(|| library_rt + rng.gen_range(-5.0..5.0));
        let abundance = 10f32.powf(rng.gen_range(2.0..4.0));
        let i = out.len();
        out.push(SyntheticPeptide {
            entry: SpeclibEntry {
                peptide_ref: format!("SYN_{:05}", i),
                sequence,
                mod_deltas: Vec::new(),
                precursor_mz,
                charge,
                library_rt,
                proteins: vec![format!("SYNPROT_{:03}", i / 10)],
                fragments,
                decoy: Some(DecoyVariant {
                    sequence: decoy_sequence,
                    mod_deltas: Vec::new(),
                    fragments: decoy_fragments,
                }),
            },
            neutral_mass,
            apex_rt,
            abundance,
        });
    }
    Ok(out)
}

fn elution(peptide: &SyntheticPeptide, rt: f32) -> Option<f32> {
    let apex = peptide.apex_rt?;
    let d = rt - apex;
    if d.abs() > 4.0 * PEAK_SIGMA {
        return None;
    }
    Some(peptide.abundance * (-(d * d) / (2.0 * PEAK_SIGMA * PEAK_SIGMA)).exp())
}

fn noise(rng: &mut ChaCha8Rng, pairs: &mut Vec<(f64, f32)>) {
    for _ in 0..NOISE_PEAKS {
        pairs.push((rng.gen_range(150.0..1500.0), rng.gen_range(1.0..30.0)));
    }
}

fn num_cycles() -> usize {
    (GRADIENT_SECONDS / CYCLE_SECONDS) as usize
}

fn ms1_map(peptides: &[SyntheticPeptide], rng: &mut ChaCha8Rng) -> SpectraMap {
    let scans = (0..num_cycles())
        .map(|cycle| {
            let rt = cycle as f32 * CYCLE_SECONDS;
            let mut pairs = Vec::new();
            noise(rng, &mut pairs);
            for p in peptides {
                let Some(y) = elution(p, rt) else {
                    continue;
                };
                let charge = p.entry.charge as f64;
                for (k, ratio) in averagine_isotopes(p.neutral_mass, 3).into_iter().enumerate() {
                    pairs.push((p.entry.precursor_mz + k as f64 * NEUTRON / charge, y * ratio as f32));
                }
            }
            (rt, Spectrum::from_unsorted_pairs(pairs))
        })
        .collect();
    SpectraMap::from_unsorted(scans)
}

fn ms2_map(window: usize, peptides: &[&SyntheticPeptide], rng: &mut ChaCha8Rng) -> SpectraMap {
    let offset = (window + 1) as f32 * CYCLE_SECONDS / (NUM_WINDOWS + 1) as f32;
    let scans = (0..num_cycles())
        .map(|cycle| {
            let rt = cycle as f32 * CYCLE_SECONDS + offset;
            let mut pairs = Vec::new();
            noise(rng, &mut pairs);
            for p in peptides {
                let Some(y) = elution(p, rt) else {
                    continue;
                };
                for f in p.entry.fragments.iter() {
                    pairs.push((f.mz, y * f.intensity / 100.0));
                }
            }
            (rt, Spectrum::from_unsorted_pairs(pairs))
        })
        .collect();
    SpectraMap::from_unsorted(scans)
}

fn generate(output_dir: &Path, n: usize, seed: u64) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(output_dir)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let peptides = build_peptides(n, &mut rng)?;
    info!(
        "Built {} peptides, {} present in the run",
        peptides.len(),
        peptides.iter().filter(|p| p.apex_rt.is_some()).count()
    );

    let archive_path = output_dir.join("sample.swath");
    let mut writer = RunArchiveWriter::create(&archive_path, "sample_run")?;
    writer.write_block(MsLevel::Ms1, None, &ms1_map(&peptides, &mut rng))?;
    for w in 0..NUM_WINDOWS {
        let lo = FIRST_WINDOW + w as f64 * WINDOW_WIDTH;
        let hi = lo + WINDOW_WIDTH;
        let in_window: Vec<&SyntheticPeptide> = peptides
            .iter()
            .filter(|p| (lo..hi).contains(&p.entry.precursor_mz))
            .collect();
        writer.write_block(MsLevel::Ms2, Some((lo, hi)), &ms2_map(w, &in_window, &mut rng))?;
    }
    let index = writer.finish()?;
    info!("Wrote {} MS2 blocks to {}", index.ms2.len(), archive_path.display());

    let library_path = output_dir.join("library.json");
    let entries: Vec<&SpeclibEntry> = peptides.iter().map(|p| &p.entry).collect();
    std::fs::write(&library_path, serde_json::to_string(&entries)?)?;
    info!("Wrote library to {}", library_path.display());

    let config_path = output_dir.join("config.json");
    let config = serde_json::json!({
        "input": {
            "run_archive": archive_path,
            "library": library_path,
        },
        "analysis": {},
        "output": {
            "directory": output_dir.join("results"),
        },
    });
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    info!("Wrote config to {}", config_path.display());
    Ok(())
}

fn parse_library(path: &Path) -> Result<(), Box<dyn Error>> {
    let speclib = Speclib::from_file(path).map_err(|e| format!("{:?}", e))?;
    println!("{}", serde_json::to_string_pretty(&speclib)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        SubCommands::Generate {
            output_dir,
            peptides,
            seed,
        } => generate(output_dir, *peptides, *seed),
        SubCommands::Parse { library } => parse_library(library),
    }
}
