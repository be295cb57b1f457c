//! Scoring of many patients from a CSV file.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use log::{error, info};

use crate::error::Result;
use crate::pipeline::{ModelContext, PredictionResult};
use crate::records::RawInput;

pub const RESULT_HEADERS: [&str; 3] = ["label", "probability", "risk"];

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawInput>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut inputs = Vec::new();
    for row in reader.deserialize() {
        inputs.push(row?);
    }
    Ok(inputs)
}

/// Assesses every input in order; the first failure aborts the batch.
pub fn score(context: &ModelContext, inputs: &[RawInput]) -> Result<Vec<PredictionResult>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            context.assess(raw).map_err(|err| {
                error!("Row {} could not be scored: {}", index + 1, err);
                err
            })
        })
        .collect()
}

pub fn write_csv<W: Write>(writer: W, inputs: &[RawInput], results: &[PredictionResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(RawInput::HEADERS.iter().chain(RESULT_HEADERS.iter()))?;

    for (raw, result) in inputs.iter().zip(results) {
        let mut record = raw.to_record();
        record.push(u8::from(result.label).to_string());
        record.push(format!("{:.6}", result.probability));
        record.push(result.risk.label().to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads, scores and writes a whole batch, returning the number of rows.
pub fn run<R: Read, W: Write>(context: &ModelContext, reader: R, writer: W) -> Result<usize> {
    let inputs = read_csv(reader)?;
    info!("Scoring {} rows", inputs.len());
    let results = score(context, &inputs)?;
    write_csv(writer, &inputs, &results)?;
    Ok(inputs.len())
}

/// Scores the CSV at `input` into `output`, or stdout when `None`. The output
/// file is only created once every row has been scored.
pub fn run_files(context: &ModelContext, input: &Path, output: Option<&Path>) -> Result<usize> {
    let inputs = read_csv(File::open(input)?)?;
    info!("Scoring {} rows from {:?}", inputs.len(), input);
    let results = score(context, &inputs)?;
    match output {
        Some(path) => write_csv(File::create(path)?, &inputs, &results)?,
        None => write_csv(io::stdout().lock(), &inputs, &results)?,
    }
    Ok(inputs.len())
}
