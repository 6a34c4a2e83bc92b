//! Filtering the loaded record set by the dashboard's criteria.
use crate::{ArcStr, VisitRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The combined constraints applied by the dashboard's filter controls.
///
/// An empty set or an absent date bound is "no constraint on this
/// dimension", never "match nothing". All five dimensions are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub diagnoses: BTreeSet<ArcStr>,
    pub genders: BTreeSet<ArcStr>,
    pub visit_types: BTreeSet<ArcStr>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnosis(mut self, diagnosis: impl Into<ArcStr>) -> Self {
        self.diagnoses.insert(diagnosis.into());
        self
    }

    pub fn gender(mut self, gender: impl Into<ArcStr>) -> Self {
        self.genders.insert(gender.into());
        self
    }

    pub fn visit_type(mut self, visit_type: impl Into<ArcStr>) -> Self {
        self.visit_types.insert(visit_type.into());
        self
    }

    pub fn from(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn to(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    /// True when no dimension constrains anything, so `apply` is the
    /// identity.
    pub fn is_empty(&self) -> bool {
        self.diagnoses.is_empty()
            && self.genders.is_empty()
            && self.visit_types.is_empty()
            && self.from_date.is_none()
            && self.to_date.is_none()
    }

    /// Whether `visit` satisfies every constrained dimension.
    ///
    /// Categorical matches are exact: a differently-cased diagnosis does
    /// not match. Date bounds are inclusive at both ends.
    pub fn matches(&self, visit: &VisitRecord) -> bool {
        (self.diagnoses.is_empty() || self.diagnoses.contains(&visit.diagnosis))
            && (self.genders.is_empty() || self.genders.contains(&visit.gender))
            && (self.visit_types.is_empty() || self.visit_types.contains(&visit.visit_type))
            && self.from_date.map_or(true, |from| visit.date >= from)
            && self.to_date.map_or(true, |to| visit.date <= to)
    }
}

/// Apply `criteria` to `records`, preserving input order.
pub fn apply(records: &[VisitRecord], criteria: &FilterCriteria) -> Vec<VisitRecord> {
    records
        .iter()
        .filter(|visit| criteria.matches(visit))
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::{apply, FilterCriteria};
    use crate::VisitRecord;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn visit(id: &str, diagnosis: &str, gender: &str, visit_type: &str, day: &str) -> VisitRecord {
        VisitRecord {
            patient_id: id.into(),
            date: date(day),
            age: 40,
            gender: gender.into(),
            diagnosis: diagnosis.into(),
            lab_result: 100.0,
            medication: None,
            visit_type: visit_type.into(),
            outcome: "Discharged".into(),
        }
    }

    fn sample() -> Vec<VisitRecord> {
        vec![
            visit("1", "Hypertension", "Male", "Routine Checkup", "2024-01-15"),
            visit("2", "Asthma", "Female", "Emergency", "2024-02-10"),
            visit("3", "Hypertension", "Female", "Routine Checkup", "2024-03-20"),
        ]
    }

    fn ids(records: &[VisitRecord]) -> Vec<&str> {
        records.iter().map(|r| &*r.patient_id).collect()
    }

    #[test]
    fn empty_criteria_is_identity() {
        let records = sample();
        let criteria = FilterCriteria::new();
        assert!(criteria.is_empty());
        assert_eq!(ids(&apply(&records, &criteria)), ids(&records));
    }

    #[test]
    fn single_dimension() {
        let records = sample();
        assert_eq!(
            ids(&apply(&records, &FilterCriteria::new().diagnosis("Hypertension"))),
            ["1", "3"]
        );
        assert_eq!(
            ids(&apply(&records, &FilterCriteria::new().gender("Male"))),
            ["1"]
        );
        assert_eq!(
            ids(&apply(&records, &FilterCriteria::new().visit_type("Emergency"))),
            ["2"]
        );
    }

    #[test]
    fn multi_valued_dimension_is_a_union() {
        let records = sample();
        let criteria = FilterCriteria::new().diagnosis("Asthma").diagnosis("Hypertension");
        assert_eq!(ids(&apply(&records, &criteria)), ["1", "2", "3"]);
    }

    #[test]
    fn dimensions_are_conjunctive() {
        let records = sample();
        let criteria = FilterCriteria::new().diagnosis("Hypertension").gender("Female");
        assert_eq!(ids(&apply(&records, &criteria)), ["3"]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let records = sample();
        let criteria = FilterCriteria::new()
            .from(date("2024-01-15"))
            .to(date("2024-02-10"));
        assert_eq!(ids(&apply(&records, &criteria)), ["1", "2"]);

        // a bound alone also works
        let criteria = FilterCriteria::new().from(date("2024-02-11"));
        assert_eq!(ids(&apply(&records, &criteria)), ["3"]);
    }

    #[test]
    fn diagnosis_match_is_case_sensitive() {
        let records = sample();
        let criteria = FilterCriteria::new().diagnosis("hypertension");
        assert!(apply(&records, &criteria).is_empty());
    }

    #[test]
    fn no_match_yields_empty_not_error() {
        let records = sample();
        let criteria = FilterCriteria::new().diagnosis("Cold");
        assert!(apply(&records, &criteria).is_empty());
        assert!(apply(&[], &criteria).is_empty());
    }

    #[test]
    fn idempotent_under_reapplication() {
        let records = sample();
        let criteria = FilterCriteria::new().gender("Female");
        let once = apply(&records, &criteria);
        let twice = apply(&once, &criteria);
        assert_eq!(ids(&once), ids(&twice));
    }
}
