use chrono::NaiveDate;
use clap::Parser;
use clinic_dashboard::{
    aggregate, build_series, header, Chart, ChartRenderer, FilterCriteria, SeriesPoint, Visits,
};
use qu::ick_use::*;
use term_data_table::{Cell, Row, Table};

#[derive(Parser)]
struct Opt {
    /// Keep only visits with one of these diagnoses (exact match).
    #[clap(short, long)]
    diagnosis: Vec<String>,
    /// Keep only visits with one of these genders.
    #[clap(short, long)]
    gender: Vec<String>,
    /// Keep only visits with one of these visit types.
    #[clap(short = 't', long)]
    visit_type: Vec<String>,
    /// Keep only visits on or after this date (yyyy-mm-dd).
    #[clap(long)]
    from_date: Option<NaiveDate>,
    /// Keep only visits on or before this date (yyyy-mm-dd).
    #[clap(long)]
    to_date: Option<NaiveDate>,
    /// Print the metrics payload as JSON instead of tables.
    #[clap(long)]
    json: bool,
    /// Print the distinct values available to each filter, then exit.
    #[clap(long)]
    list_options: bool,
}

/// Renders the lab-result series as a table of points.
#[derive(Default)]
struct TableChart;

impl ChartRenderer for TableChart {
    fn render(&mut self, series: &[SeriesPoint]) {
        if series.is_empty() {
            println!("no data points");
            return;
        }
        let mut table = Table::new().with_row(
            Row::new()
                .with_cell(Cell::from("Date"))
                .with_cell(Cell::from("Lab result")),
        );
        for (date, value) in series {
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(date.to_string()))
                    .with_cell(Cell::from(value.to_string())),
            );
        }
        println!("{}", table);
    }

    fn update(&mut self, series: &[SeriesPoint]) {
        self.render(series)
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let visits = Visits::load("visits.bin")?;

    if opt.list_options {
        let options = visits.filter_options();
        header("Diagnoses");
        for diagnosis in &options.diagnoses {
            println!("{}", diagnosis);
        }
        header("Genders");
        for gender in &options.genders {
            println!("{}", gender);
        }
        header("Visit types");
        for visit_type in &options.visit_types {
            println!("{}", visit_type);
        }
        return Ok(());
    }

    let criteria = FilterCriteria {
        diagnoses: opt.diagnosis.into_iter().map(Into::into).collect(),
        genders: opt.gender.into_iter().map(Into::into).collect(),
        visit_types: opt.visit_type.into_iter().map(Into::into).collect(),
        from_date: opt.from_date,
        to_date: opt.to_date,
    };
    let filtered = visits.apply_criteria(&criteria);
    let metrics = aggregate(filtered.iter_ref());
    let series = build_series(filtered.iter_ref());

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    header("Filtered data");
    println!("visits: {} of {}", filtered.len(), visits.len());
    println!("patients: {}", filtered.patient_count());

    header("Metrics by diagnosis");
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Diagnosis"))
            .with_cell(Cell::from("Visits"))
            .with_cell(Cell::from("Avg lab result"))
            .with_cell(Cell::from("Adverse outcomes")),
    );
    for (diagnosis, stats) in &metrics.by_diagnosis {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(diagnosis.to_string()))
                .with_cell(Cell::from(stats.visit_count.to_string()))
                .with_cell(Cell::from(format!("{:.2}", stats.average_lab_result)))
                .with_cell(Cell::from(format!("{:.2}%", stats.adverse_outcome_rate))),
        );
    }
    println!("{}", table);

    header("Top diagnoses");
    for (idx, diagnosis) in metrics.top_diagnoses.iter().enumerate() {
        let count = metrics.by_diagnosis[diagnosis].visit_count;
        println!("{}. {} ({} visits)", idx + 1, diagnosis, count);
    }

    header("Lab results over time");
    let mut chart = Chart::new(TableChart::default());
    chart.push(&series);

    Ok(())
}
