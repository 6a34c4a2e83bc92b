use chrono::NaiveDate;
use clap::Parser;
use clinic_dashboard::{export, path_exists, FilterCriteria, Visits};
use qu::ick_use::*;
use std::{fs, io, path::PathBuf};

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
    /// Write the CSV here instead of to stdout.
    #[clap(long)]
    save: Option<PathBuf>,
    /// If set, allow overwriting an existing file at the save location
    #[clap(long)]
    overwrite: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let visits = Visits::load("visits.bin")?;
    let criteria = FilterCriteria {
        diagnoses: opt.diagnosis.into_iter().map(Into::into).collect(),
        genders: opt.gender.into_iter().map(Into::into).collect(),
        visit_types: opt.visit_type.into_iter().map(Into::into).collect(),
        from_date: opt.from_date,
        to_date: opt.to_date,
    };
    let filtered = visits.apply_criteria(&criteria);

    match &opt.save {
        Some(path) => {
            ensure!(
                opt.overwrite || !path_exists(path)?,
                "\"{}\" already exists (use --overwrite to replace it)",
                path.display()
            );
            let out = io::BufWriter::new(fs::File::create(path)?);
            export::write_csv(&filtered, out)?;
            event!(
                Level::INFO,
                "wrote {} visits to \"{}\"",
                filtered.len(),
                path.display()
            );
        }
        None => export::write_csv(&filtered, io::stdout().lock())?,
    }
    Ok(())
}
