use std::path::Path;

use anyhow::{anyhow, Context};

use crate::angle::CelestialAngle;
use crate::detection::CatalogMatch;

// Accepted header names per column, first match wins.
const X_COLUMNS: &[&str] = &["field_x", "pixel_x", "x"];
const Y_COLUMNS: &[&str] = &["field_y", "pixel_y", "y"];
const RA_COLUMNS: &[&str] = &["field_ra", "ra"];
const DEC_COLUMNS: &[&str] = &["field_dec", "dec"];
const CONFIDENCE_COLUMNS: &[&str] = &["match_weight", "match_confidence", "confidence"];

fn column(headers: &csv::StringRecord, names: &[&str]) -> anyhow::Result<usize> {
    names
        .iter()
        .find_map(|name| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| anyhow!("missing column, expected one of {names:?}"))
}

fn cell<'a>(record: &'a csv::StringRecord, index: usize, row: usize) -> anyhow::Result<&'a str> {
    record
        .get(index)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("row {row}: empty cell in column {index}"))
}

/// Read a plate-solver correspondence table.
///
/// Columns are located by header name (`field_x`, `field_y`, `field_ra`,
/// `field_dec`, `match_weight`, or the aliases `x`, `y`, `ra`, `dec`,
/// `confidence`). RA and Dec cells hold decimal degrees or sexagesimal text
/// (`05:34:31.9`, `-05 23 28`). Extra columns are ignored.
pub fn read_matches_csv<P: AsRef<Path>>(file: P) -> anyhow::Result<Vec<CatalogMatch>> {
    let path = file.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening match table {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let ix = column(&headers, X_COLUMNS)?;
    let iy = column(&headers, Y_COLUMNS)?;
    let ira = column(&headers, RA_COLUMNS)?;
    let idec = column(&headers, DEC_COLUMNS)?;
    let iconf = column(&headers, CONFIDENCE_COLUMNS)?;

    rdr.records()
        .enumerate()
        .map(|(i, result)| {
            let row = i + 1;
            let record = result?;
            let number = |index: usize| -> anyhow::Result<f64> {
                let text = cell(&record, index, row)?;
                text.parse::<f64>()
                    .with_context(|| format!("row {row}: bad number {text:?}"))
            };
            let angle = |index: usize| -> anyhow::Result<CelestialAngle> {
                let text = cell(&record, index, row)?;
                text.parse::<CelestialAngle>()
                    .with_context(|| format!("row {row}"))
            };

            Ok(CatalogMatch {
                pixel_x: number(ix)?,
                pixel_y: number(iy)?,
                ra: angle(ira)?,
                dec: angle(idec)?,
                match_confidence: number(iconf)?,
            })
        })
        .collect::<anyhow::Result<Vec<CatalogMatch>>>()
        .with_context(|| format!("reading match table {}", path.display()))
}
