//! The time-ordered lab-result series behind the dashboard chart.
use crate::VisitRecord;
use chrono::NaiveDate;

/// One chart point: the visit date and the lab result recorded on it.
pub type SeriesPoint = (NaiveDate, f64);

/// Build the chart series: one `(date, lab result)` pair per record,
/// ascending by date.
///
/// The sort is stable, so records sharing a date keep their input order.
/// An empty subset gives an empty series and the chart simply draws no
/// points. No resampling or interpolation happens here.
pub fn build_series<'a>(records: impl IntoIterator<Item = &'a VisitRecord>) -> Vec<SeriesPoint> {
    let mut series: Vec<SeriesPoint> = records
        .into_iter()
        .map(|visit| (visit.date, visit.lab_result))
        .collect();
    series.sort_by_key(|(date, _)| *date);
    series
}

/// A chart backend the pipeline hands series data to.
///
/// Whether pushing data means drawing a fresh chart or updating one that is
/// already on screen is the renderer's business; the pipeline never
/// inspects renderer internals.
pub trait ChartRenderer {
    /// Draw a new chart from `series`.
    fn render(&mut self, series: &[SeriesPoint]);
    /// Replace the data of an already-drawn chart.
    fn update(&mut self, series: &[SeriesPoint]);
}

/// Owns the drawn/not-yet-drawn state of one chart, so callers only ever
/// push a series at it.
pub struct Chart<R> {
    renderer: R,
    rendered: bool,
}

impl<R: ChartRenderer> Chart<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            rendered: false,
        }
    }

    /// Hand `series` to the renderer, drawing on first use and updating
    /// afterwards.
    pub fn push(&mut self, series: &[SeriesPoint]) {
        if self.rendered {
            self.renderer.update(series);
        } else {
            self.renderer.render(series);
            self.rendered = true;
        }
    }

    pub fn into_inner(self) -> R {
        self.renderer
    }
}
