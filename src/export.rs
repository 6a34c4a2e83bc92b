//! CSV export of the currently filtered records.
use crate::{Result, VisitRecord};
use std::io;

/// Column headers of the exported file.
///
/// The order is a compatibility contract with downstream consumers of the
/// export: patient ID, date, age, gender, diagnosis, lab result,
/// medication, visit type, outcome.
pub const CSV_HEADERS: [&str; 9] = [
    "Patient ID",
    "Date",
    "Age",
    "Gender",
    "Diagnosis",
    "Lab Results",
    "Medication",
    "Visit Type",
    "Outcome",
];

/// Write `records` as CSV, header row first, one row per record.
pub fn write_csv(records: &[VisitRecord], out: impl io::Write) -> Result {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADERS)?;
    for visit in records {
        let date = visit.date.to_string();
        let age = visit.age.to_string();
        let lab_result = visit.lab_result.to_string();
        writer.write_record([
            &*visit.patient_id,
            date.as_str(),
            age.as_str(),
            &*visit.gender,
            &*visit.diagnosis,
            lab_result.as_str(),
            visit.medication.as_deref().unwrap_or(""),
            &*visit.visit_type,
            &*visit.outcome,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// `write_csv` into a string, for handing the export straight to a
/// download response.
pub fn to_csv_string(records: &[VisitRecord]) -> Result<String> {
    let mut out = Vec::new();
    write_csv(records, &mut out)?;
    Ok(String::from_utf8(out)?)
}
