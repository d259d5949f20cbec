use crate::errors::LibraryReadingError;
use crate::rt_calibration::RtCalibration;
use crate::traits::CoordinateProvider;
use serde::{
    Deserialize,
    Serialize,
};
use std::io::{
    BufRead,
    BufReader,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;
use swathquery::{
    DecoyVariant,
    Fragment,
    PeptideCoordinate,
    RtTolerance,
    RtWindow,
};

/// One library precursor as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeclibEntry {
    pub peptide_ref: String,
    pub sequence: String,
    #[serde(default)]
    pub mod_deltas: Vec<(usize, f64)>,
    pub precursor_mz: f64,
    pub charge: u8,
    pub library_rt: f32,
    #[serde(default)]
    pub proteins: Vec<String>,
    pub fragments: Vec<Fragment>,
    #[serde(default)]
    pub decoy: Option<DecoyVariant>,
}

impl SpeclibEntry {
    pub fn sample() -> Self {
        PeptideCoordinate::sample().into()
    }
}

impl TryFrom<SpeclibEntry> for PeptideCoordinate {
    type Error = LibraryReadingError;

    fn try_from(x: SpeclibEntry) -> Result<Self, Self::Error> {
        if !(x.precursor_mz.is_finite() && x.precursor_mz > 0.0) || x.charge == 0 {
            return Err(LibraryReadingError::InvalidEntry {
                peptide_ref: x.peptide_ref,
                context: format!(
                    "bad precursor (mz {}, charge {})",
                    x.precursor_mz, x.charge
                ),
            });
        }
        let peptide_ref = x.peptide_ref.clone();
        let coord = PeptideCoordinate::try_new(
            x.peptide_ref,
            x.sequence,
            x.mod_deltas,
            x.precursor_mz,
            x.charge,
            x.library_rt,
            RtWindow::Unbounded,
            x.fragments,
            x.decoy,
        )
        .map_err(|e| LibraryReadingError::InvalidEntry {
            peptide_ref,
            context: format!("{:?}", e),
        })?;
        Ok(coord.with_proteins(x.proteins))
    }
}

impl From<PeptideCoordinate> for SpeclibEntry {
    fn from(x: PeptideCoordinate) -> Self {
        SpeclibEntry {
            fragments: x.fragments().to_vec(),
            decoy: x.decoy().cloned(),
            peptide_ref: x.peptide_ref,
            sequence: x.sequence,
            mod_deltas: x.mod_deltas,
            precursor_mz: x.precursor_mz,
            charge: x.charge,
            library_rt: x.library_rt,
            proteins: x.proteins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeclibFormat {
    /// A single JSON array of entries.
    Json,
    NdJson,
    NdJsonZstd,
}

impl SpeclibFormat {
    pub fn detect_from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy().to_lowercase();
        if path_str.ends_with(".ndjson.zst") {
            SpeclibFormat::NdJsonZstd
        } else if path_str.ends_with(".ndjson") {
            SpeclibFormat::NdJson
        } else {
            SpeclibFormat::Json
        }
    }
}

/// Spectral library held in memory, sorted by precursor m/z.
#[derive(Debug, Clone, Default)]
pub struct Speclib {
    elems: Vec<PeptideCoordinate>,
}

impl Serialize for Speclib {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let entries: Vec<SpeclibEntry> = self.elems.iter().map(|x| x.clone().into()).collect();
        entries.serialize(serializer)
    }
}

impl Speclib {
    pub fn from_entries(entries: Vec<SpeclibEntry>) -> Result<Self, LibraryReadingError> {
        let mut elems = entries
            .into_iter()
            .map(PeptideCoordinate::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        elems.sort_by(|a, b| a.precursor_mz.total_cmp(&b.precursor_mz));
        Ok(Self { elems })
    }

    pub fn from_file(path: &Path) -> Result<Self, LibraryReadingError> {
        Self::from_file_with_format(path, SpeclibFormat::detect_from_path(path))
    }

    pub fn from_file_with_format(
        path: &Path,
        format: SpeclibFormat,
    ) -> Result<Self, LibraryReadingError> {
        let file =
            std::fs::File::open(path).map_err(|e| LibraryReadingError::FileReadingError {
                source: e,
                context: "Error opening speclib file",
                path: PathBuf::from(path),
            })?;
        match format {
            SpeclibFormat::Json => Self::from_json_reader(BufReader::new(file)),
            SpeclibFormat::NdJson => Self::from_ndjson_reader(BufReader::new(file)),
            SpeclibFormat::NdJsonZstd => {
                let decoder =
                    zstd::Decoder::new(file).map_err(|e| LibraryReadingError::FileReadingError {
                        source: e,
                        context: "Error creating ZSTD decoder",
                        path: PathBuf::from(path),
                    })?;
                Self::from_ndjson_reader(BufReader::new(decoder))
            }
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, LibraryReadingError> {
        let entries: Vec<SpeclibEntry> = serde_json::from_reader(reader).map_err(|e| {
            LibraryReadingError::SpeclibParsingError {
                source: e,
                context: "Error parsing JSON speclib",
            }
        })?;
        Self::from_entries(entries)
    }

    pub fn from_ndjson_reader<R: BufRead>(reader: R) -> Result<Self, LibraryReadingError> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| LibraryReadingError::FileReadingError {
                source: e,
                context: "Error reading line",
                path: PathBuf::new(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SpeclibEntry = serde_json::from_str(&line).map_err(|e| {
                LibraryReadingError::SpeclibParsingError {
                    source: e,
                    context: "Error parsing NDJSON line",
                }
            })?;
            entries.push(entry);
        }
        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn as_slice(&self) -> &[PeptideCoordinate] {
        &self.elems
    }

    /// Entries with precursor m/z in `[lo, hi)`.
    pub fn in_window(&self, lo: f64, hi: f64) -> &[PeptideCoordinate] {
        let start = self.elems.partition_point(|c| c.precursor_mz < lo);
        let end = self.elems.partition_point(|c| c.precursor_mz < hi);
        &self.elems[start..end.max(start)]
    }

    pub fn sample() -> Self {
        Self {
            elems: vec![PeptideCoordinate::sample()],
        }
    }
}

impl FromStr for Speclib {
    type Err = LibraryReadingError;

    /// Accepts either a JSON array or newline delimited entries.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim_start().starts_with('[') {
            Self::from_json_reader(s.as_bytes())
        } else {
            Self::from_ndjson_reader(s.as_bytes())
        }
    }
}

impl CoordinateProvider for Speclib {
    fn coordinates(
        &self,
        window: (f64, f64),
        calibration: &dyn RtCalibration,
        rt: &RtTolerance,
    ) -> Vec<PeptideCoordinate> {
        let targets = self.in_window(window.0, window.1);
        let mut out = Vec::with_capacity(targets.len() * 2);
        for target in targets {
            let mut coord = target.clone();
            coord.rt_window = RtWindow::around(calibration.predict(coord.library_rt), rt);
            if let Some(decoy) = coord.as_decoy() {
                out.push(coord);
                out.push(decoy);
            } else {
                out.push(coord);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt_calibration::{
        Calibration,
        SlopeIntercept,
    };

    fn entry(name: &str, mz: f64) -> SpeclibEntry {
        SpeclibEntry {
            peptide_ref: name.into(),
            precursor_mz: mz,
            ..SpeclibEntry::sample()
        }
    }

    #[test]
    fn test_entries_sorted_and_windowed() {
        let lib = Speclib::from_entries(vec![
            entry("C", 520.0),
            entry("A", 405.0),
            entry("B", 425.0),
        ])
        .unwrap();
        assert_eq!(lib.len(), 3);
        assert_eq!(lib.as_slice()[0].peptide_ref, "A");
        let hits = lib.in_window(400.0, 425.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].peptide_ref, "A");
        assert!(lib.in_window(600.0, 700.0).is_empty());
    }

    #[test]
    fn test_coordinates_carry_decoys_and_calibrated_windows() {
        let lib = Speclib::from_entries(vec![entry("A", 405.0)]).unwrap();
        let cal = Calibration::SlopeIntercept(SlopeIntercept {
            slope: 2.0,
            intercept: 10.0,
        });
        let coords = lib.coordinates((400.0, 425.0), &cal, &RtTolerance::Seconds(60.0));
        assert_eq!(coords.len(), 2);
        assert!(!coords[0].is_decoy);
        assert!(coords[1].is_decoy);
        assert_eq!(
            coords[0].rt_window,
            RtWindow::Bounded {
                start: 150.0,
                end: 270.0
            }
        );
        assert_eq!(coords[1].rt_window, coords[0].rt_window);
    }

    #[test]
    fn test_parse_json_and_ndjson() {
        let one = serde_json::to_string(&entry("A", 405.0)).unwrap();
        let two = serde_json::to_string(&entry("B", 410.0)).unwrap();

        let ndjson = format!("{}\n\n{}\n", one, two);
        let lib: Speclib = ndjson.parse().unwrap();
        assert_eq!(lib.len(), 2);

        let json = format!("[{}, {}]", one, two);
        let lib: Speclib = json.parse().unwrap();
        assert_eq!(lib.len(), 2);

        let round = serde_json::to_string(&lib).unwrap();
        let lib2: Speclib = round.parse().unwrap();
        assert_eq!(lib2.as_slice(), lib.as_slice());
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let mut bad = entry("A", 405.0);
        bad.fragments.clear();
        assert!(matches!(
            Speclib::from_entries(vec![bad]),
            Err(LibraryReadingError::InvalidEntry { .. })
        ));

        let mut bad = entry("B", 405.0);
        bad.charge = 0;
        assert!(Speclib::from_entries(vec![bad]).is_err());

        assert!("[{\"peptide_ref\": 1}]".parse::<Speclib>().is_err());
    }
}
