pub mod export;
pub mod filter;
pub mod metrics;
pub mod series;
mod util;

pub use anyhow::{Context, Error};
use chrono::NaiveDate;
use qu::ick_use::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

pub use crate::{
    filter::FilterCriteria,
    metrics::{aggregate, DiagnosisStats, Metrics},
    series::{build_series, Chart, ChartRenderer, SeriesPoint},
    util::{header, path_exists},
};
use crate::util::{opt_iso_date, optional_string};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Deserialize)]
struct VisitRecordRaw {
    #[serde(rename = "PatientID")]
    patient_id: ArcStr,
    #[serde(rename = "Date", deserialize_with = "opt_iso_date")]
    date: Option<NaiveDate>,
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Gender")]
    gender: ArcStr,
    #[serde(rename = "Diagnosis")]
    diagnosis: ArcStr,
    #[serde(rename = "LabResults")]
    lab_result: Option<f64>,
    #[serde(rename = "Medication", deserialize_with = "optional_string")]
    medication: Option<ArcStr>,
    #[serde(rename = "VisitType")]
    visit_type: ArcStr,
    #[serde(rename = "Outcome")]
    outcome: ArcStr,
}

/// A row in the visits dataset: one clinical encounter.
///
/// `diagnosis` may be empty. Such records still appear in the table and the
/// chart, but the metrics aggregator skips them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub patient_id: ArcStr,
    pub date: NaiveDate,
    pub age: u32,
    pub gender: ArcStr,
    pub diagnosis: ArcStr,
    pub lab_result: f64,
    pub medication: Option<ArcStr>,
    pub visit_type: ArcStr,
    pub outcome: ArcStr,
}

impl VisitRecord {
    /// `None` when the row is missing its date or lab result. Incomplete
    /// rows are discarded here, at the load boundary; the pipeline assumes
    /// both fields are present.
    fn from_raw(raw: VisitRecordRaw) -> Option<Self> {
        match (raw.date, raw.lab_result) {
            (Some(date), Some(lab_result)) => Some(VisitRecord {
                patient_id: raw.patient_id,
                date,
                age: raw.age,
                gender: raw.gender,
                diagnosis: raw.diagnosis,
                lab_result,
                medication: raw.medication,
                visit_type: raw.visit_type,
                outcome: raw.outcome,
            }),
            _ => None,
        }
    }

    /// Whether this visit ended in an adverse outcome ("Admitted", any
    /// capitalization).
    pub fn is_adverse(&self) -> bool {
        self.outcome.eq_ignore_ascii_case("admitted")
    }
}

/// The loaded list of visit records, with a pre-built index for the
/// `patient_id` field.
///
/// The store is read-only within one processing cycle: filtering always
/// produces a new `Visits`, and a data refresh replaces the store wholesale
/// rather than mutating it.
pub struct Visits {
    els: Arc<Vec<VisitRecord>>,
    id_idx: BTreeMap<ArcStr, Vec<usize>>,
}

impl Visits {
    pub fn load_orig(path: impl AsRef<Path>) -> Result<Self> {
        let raw: Vec<VisitRecordRaw> = load_orig(path)?;
        let total = raw.len();
        let els: Vec<VisitRecord> = raw.into_iter().filter_map(VisitRecord::from_raw).collect();
        let dropped = total - els.len();
        if dropped > 0 {
            event!(
                Level::INFO,
                "dropped {} of {} rows missing a date or lab result",
                dropped,
                total
            );
        }
        Ok(Self::new(els))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(load(path)?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result {
        Ok(save(&self.els, path)?)
    }

    pub fn visits_for_patient(&self, id: &str) -> impl Iterator<Item = &VisitRecord> + '_ {
        let idxs = match self.id_idx.get(id) {
            Some(idxs) => &idxs[..],
            None => &[],
        };
        idxs.iter().map(|idx| {
            self.els
                .get(*idx)
                .expect("inconsistent visit patient_id index")
        })
    }

    /// Number of distinct patients among the loaded visits.
    pub fn patient_count(&self) -> usize {
        self.id_idx.len()
    }

    /// Iterate over visits in this store.
    pub fn iter(&self) -> impl Iterator<Item = VisitRecord> + '_ {
        self.els.iter().cloned()
    }

    pub fn iter_ref(&self) -> impl Iterator<Item = &VisitRecord> + '_ {
        self.els.iter()
    }

    /// Get a `Visits` object containing only visits that match the filter.
    pub fn filter(&self, f: impl Fn(&VisitRecord) -> bool) -> Self {
        Visits::new(self.iter().filter(f).collect())
    }

    /// Apply the dashboard filter criteria, keeping input order.
    pub fn apply_criteria(&self, criteria: &FilterCriteria) -> Self {
        self.filter(|visit| criteria.matches(visit))
    }

    pub fn retain(&mut self, f: impl Fn(&VisitRecord) -> bool) {
        Arc::make_mut(&mut self.els).retain(f);
        // dropping elements invalidates the positions in id_idx
        self.rebuild_index();
    }

    /// The distinct categorical values present in the data, for populating
    /// the dashboard's filter selectors.
    pub fn filter_options(&self) -> FilterOptions {
        let mut options = FilterOptions::default();
        for visit in self.els.iter() {
            // an empty diagnosis is a gap in the data, not a selectable option
            if !visit.diagnosis.is_empty() {
                options.diagnoses.insert(visit.diagnosis.clone());
            }
            options.genders.insert(visit.gender.clone());
            options.visit_types.insert(visit.visit_type.clone());
        }
        options
    }

    fn new(els: Vec<VisitRecord>) -> Self {
        let mut this = Visits {
            els: els.into(),
            id_idx: BTreeMap::new(),
        };
        this.rebuild_index();
        this
    }

    fn rebuild_index(&mut self) {
        self.id_idx.clear();
        for (idx, el) in self.els.iter().enumerate() {
            self.id_idx
                .entry(el.patient_id.clone())
                .or_insert(vec![])
                .push(idx);
        }
    }
}

impl Deref for Visits {
    type Target = [VisitRecord];
    fn deref(&self) -> &Self::Target {
        &*self.els
    }
}

/// Distinct values for each categorical filter dimension.
///
/// B tree sets so the selectors come out sorted and deduplicated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    pub diagnoses: BTreeSet<ArcStr>,
    pub genders: BTreeSet<ArcStr>,
    pub visit_types: BTreeSet<ArcStr>,
}

/// Load data into memory.
fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    fn inner<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let path = output_path(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let reader = io::BufReader::new(fs::File::open(path)?);
        bincode::deserialize_from(reader).map_err(Into::into)
    }
    let path = path.as_ref();
    check_extension(path, "bin")?;

    inner(path).with_context(|| format!("unable to load data from \"{}\"", path.display()))
}

/// Save data to disk.
fn save<T: Serialize>(contents: &[T], path: impl AsRef<Path>) -> Result {
    fn inner<T: Serialize>(contents: &[T], path: &Path) -> Result {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create parent")?;
        }
        if util::path_exists(path)? {
            event!(
                Level::WARN,
                "overwriting existing file at \"{}\"",
                path.display()
            );
        }
        let mut out = io::BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(&mut out, contents)?;
        Ok(())
    }
    let path = path.as_ref();
    let path = output_path(path);
    check_extension(&path, "bin")?;

    inner(contents, &path).with_context(|| format!("unable to save data to \"{}\"", path.display()))
}

/// Load data into memory from the original database extract.
fn load_orig<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, anyhow::Error> {
    let path = path.as_ref();
    let path = orig_path(path);
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)?
        .into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("while loading \"{}\"", path.display()))
}

/// Note: No protection from escaping the root directory.
pub fn orig_path(input: &Path) -> PathBuf {
    Path::new("data/orig").join(input)
}

/// Note: No protection from escaping the root directory.
pub fn output_path(input: &Path) -> PathBuf {
    Path::new("data/output").join(input)
}

pub fn check_extension(path: &Path, ext: &str) -> Result<()> {
    ensure!(
        matches!(path.extension(), Some(p) if p == ext),
        "filename should end with `.{}`",
        ext
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{VisitRecord, VisitRecordRaw, Visits};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn visit(patient_id: &str, diagnosis: &str) -> VisitRecord {
        VisitRecord {
            patient_id: patient_id.into(),
            date: date("2024-01-15"),
            age: 40,
            gender: "Female".into(),
            diagnosis: diagnosis.into(),
            lab_result: 100.0,
            medication: None,
            visit_type: "Routine Checkup".into(),
            outcome: "Discharged".into(),
        }
    }

    #[test]
    fn raw_rows_missing_required_fields_are_dropped() {
        let complete = VisitRecordRaw {
            patient_id: "1".into(),
            date: Some(date("2024-01-15")),
            age: 45,
            gender: "Male".into(),
            diagnosis: "Hypertension".into(),
            lab_result: Some(150.0),
            medication: None,
            visit_type: "Routine Checkup".into(),
            outcome: "Admitted".into(),
        };
        let no_date = VisitRecordRaw {
            date: None,
            ..complete.clone()
        };
        let no_lab = VisitRecordRaw {
            lab_result: None,
            ..complete.clone()
        };

        assert!(VisitRecord::from_raw(complete).is_some());
        assert!(VisitRecord::from_raw(no_date).is_none());
        assert!(VisitRecord::from_raw(no_lab).is_none());
    }

    #[test]
    fn adverse_outcome_is_case_insensitive() {
        let mut v = visit("1", "Flu");
        for outcome in ["Admitted", "admitted", "ADMITTED"] {
            v.outcome = outcome.into();
            assert!(v.is_adverse());
        }
        v.outcome = "Discharged".into();
        assert!(!v.is_adverse());
    }

    #[test]
    fn filter_options_are_distinct_and_skip_empty_diagnoses() {
        let visits = Visits::new(vec![
            visit("1", "Flu"),
            visit("2", "Flu"),
            visit("3", ""),
            visit("4", "Asthma"),
        ]);
        let options = visits.filter_options();
        assert_eq!(
            options.diagnoses.iter().map(|d| &**d).collect::<Vec<_>>(),
            ["Asthma", "Flu"]
        );
        assert_eq!(options.genders.len(), 1);
        assert_eq!(options.visit_types.len(), 1);
    }

    #[test]
    fn patient_index_groups_repeat_visits() {
        let visits = Visits::new(vec![
            visit("1", "Flu"),
            visit("2", "Flu"),
            visit("1", "Asthma"),
        ]);
        assert_eq!(visits.patient_count(), 2);
        assert_eq!(visits.visits_for_patient("1").count(), 2);
        assert_eq!(visits.visits_for_patient("9").count(), 0);
    }

    #[test]
    fn retain_keeps_the_patient_index_consistent() {
        let mut visits = Visits::new(vec![
            visit("1", "Flu"),
            visit("2", "Asthma"),
            visit("1", "Cold"),
        ]);
        visits.retain(|v| &*v.patient_id == "2");

        assert_eq!(visits.len(), 1);
        assert_eq!(visits.patient_count(), 1);
        assert_eq!(visits.visits_for_patient("1").count(), 0);
        let kept: Vec<&str> = visits
            .visits_for_patient("2")
            .map(|v| &*v.diagnosis)
            .collect();
        assert_eq!(kept, ["Asthma"]);
    }
}
