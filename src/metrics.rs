//! Per-diagnosis summary metrics for the dashboard widgets.
use crate::{ArcStr, VisitRecord};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum number of entries in the `top_diagnoses` ranking.
pub const TOP_DIAGNOSES: usize = 3;

/// Summary statistics for one diagnosis group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosisStats {
    pub visit_count: usize,
    /// Mean lab result over the group, rounded to 2 decimal places.
    pub average_lab_result: f64,
    /// Percentage of visits in the group with an adverse outcome, rounded
    /// to 2 decimal places.
    pub adverse_outcome_rate: f64,
}

/// The metrics payload handed to the summary widgets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub by_diagnosis: BTreeMap<ArcStr, DiagnosisStats>,
    /// Diagnoses ranked by visit count, most frequent first, at most
    /// [`TOP_DIAGNOSES`] entries. Equal counts are ordered by diagnosis
    /// name so the ranking is deterministic.
    pub top_diagnoses: Vec<ArcStr>,
}

#[derive(Default)]
struct Accum {
    visits: usize,
    lab_total: f64,
    adverse: usize,
}

impl Accum {
    fn finish(self) -> DiagnosisStats {
        // visits >= 1: a group only exists once a record contributed to it
        DiagnosisStats {
            visit_count: self.visits,
            average_lab_result: round2(self.lab_total / self.visits as f64),
            adverse_outcome_rate: round2(self.adverse as f64 / self.visits as f64 * 100.),
        }
    }
}

/// Group `records` by their exact diagnosis string and compute each group's
/// summary statistics, plus the top-diagnoses ranking.
///
/// Records with an empty diagnosis are skipped entirely. Grouping keys are
/// matched case- and whitespace-sensitively, so "flu" and "Flu" form
/// separate groups. The empty input yields empty outputs.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a VisitRecord>) -> Metrics {
    // B tree so groups come out in a predictable order.
    let mut groups: BTreeMap<ArcStr, Accum> = BTreeMap::new();
    for visit in records {
        if visit.diagnosis.is_empty() {
            continue;
        }
        let acc = groups.entry(visit.diagnosis.clone()).or_default();
        acc.visits += 1;
        acc.lab_total += visit.lab_result;
        if visit.is_adverse() {
            acc.adverse += 1;
        }
    }

    let top_diagnoses = groups
        .iter()
        .sorted_by(|(name_a, a), (name_b, b)| {
            b.visits.cmp(&a.visits).then_with(|| name_a.cmp(name_b))
        })
        .take(TOP_DIAGNOSES)
        .map(|(name, _)| name.clone())
        .collect();

    let by_diagnosis = groups
        .into_iter()
        .map(|(name, acc)| (name, acc.finish()))
        .collect();

    Metrics {
        by_diagnosis,
        top_diagnoses,
    }
}

impl Metrics {
    /// HTML fragment for the "average lab results" widget, one line per
    /// diagnosis.
    pub fn average_lab_results_html(&self) -> String {
        self.widget_html(|stats| format!("{:.2}", stats.average_lab_result))
    }

    /// HTML fragment for the "adverse outcomes" widget.
    pub fn adverse_outcomes_html(&self) -> String {
        self.widget_html(|stats| format!("{:.2}%", stats.adverse_outcome_rate))
    }

    /// HTML fragment for the "visits by diagnosis" widget.
    pub fn visits_by_diagnosis_html(&self) -> String {
        self.widget_html(|stats| format!("{} visits", stats.visit_count))
    }

    fn widget_html(&self, value: impl Fn(&DiagnosisStats) -> String) -> String {
        let mut out = String::new();
        for (diagnosis, stats) in &self.by_diagnosis {
            out.push_str("<strong>");
            html_escape::encode_text_to_string(diagnosis, &mut out);
            out.push_str(":</strong> ");
            html_escape::encode_text_to_string(&value(stats), &mut out);
            out.push_str("<br>");
        }
        out
    }
}

/// Round to 2 decimal places, halves away from zero.
fn round2(val: f64) -> f64 {
    (val * 100.).round() / 100.
}
