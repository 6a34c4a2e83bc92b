use clap::Parser;
use clinic_dashboard::Visits;
use qu::ick_use::*;
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    /// The extract to import, relative to the original-data directory.
    #[clap(default_value = "patient_data.csv")]
    extract: PathBuf,
}

#[qu::ick]
fn main(opt: Opt) -> Result {
    let visits = Visits::load_orig(&opt.extract)?;
    visits.save("visits.bin")?;
    println!(
        "imported {} visits across {} patients",
        visits.len(),
        visits.patient_count()
    );
    Ok(())
}
