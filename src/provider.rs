//! Input providers for loading attack jobs from files

use crate::attack::AttackTarget;
use crate::exposure::{Exposure, ExposureKind};
use crate::math::parse_integer_decimal_strict;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::{self, Read};

/// One attack job as it appears on the wire: decimal strings for the big
/// integers, so JSON and CSV carry them without precision loss.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    pub n: String,
    pub e: String,
    pub d0: String,
    pub x_bound: String,
    pub modulus: String,
    pub exposure: String,
    /// Known low-bit count, required for LSB jobs.
    #[serde(default)]
    pub shift: Option<u32>,
}

impl TryFrom<JobInput> for AttackTarget {
    type Error = anyhow::Error;

    fn try_from(input: JobInput) -> Result<Self> {
        let n = parse_integer_decimal_strict(&input.n).context("Invalid n")?;
        let e = parse_integer_decimal_strict(&input.e).context("Invalid e")?;
        let d0 = parse_integer_decimal_strict(&input.d0).context("Invalid d0")?;
        let bound = parse_integer_decimal_strict(&input.x_bound).context("Invalid x_bound")?;
        let modulus = parse_integer_decimal_strict(&input.modulus).context("Invalid modulus")?;
        let kind: ExposureKind = input.exposure.parse()?;

        let shift = match (kind, input.shift) {
            (ExposureKind::Msb, None) | (ExposureKind::Msb, Some(0)) => 0,
            (ExposureKind::Msb, Some(_)) => bail!("MSB jobs must not set a shift"),
            (ExposureKind::Lsb, Some(shift)) if shift > 0 => shift,
            (ExposureKind::Lsb, _) => bail!("LSB jobs require a positive shift"),
        };

        let exposure = Exposure::new(kind, d0, shift, bound)?;
        Ok(AttackTarget {
            n,
            e,
            modulus,
            exposure,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Csv,
}

pub fn load_jobs(input: &str) -> Result<Vec<AttackTarget>> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };

    parse_jobs(&content)
}

pub fn parse_jobs(content: &str) -> Result<Vec<AttackTarget>> {
    let format = detect_format(content)?;
    let inputs = match format {
        Format::Json => parse_json(content)?,
        Format::Csv => parse_csv(content)?,
    };

    inputs.into_iter().map(AttackTarget::try_from).collect()
}

const BOM: &str = "\u{FEFF}";

pub fn detect_format(content: &str) -> Result<Format> {
    let trimmed = content.strip_prefix(BOM).unwrap_or(content).trim_start();

    if trimmed.starts_with('[') {
        return Ok(Format::Json);
    }

    if let Some(first_line) = trimmed.lines().next() {
        let columns: Vec<String> = first_line
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .collect();
        let has_n = columns.iter().any(|c| c == "n");
        let has_e = columns.iter().any(|c| c == "e");
        let has_d0 = columns.iter().any(|c| c == "d0");
        if has_n && has_e && has_d0 {
            return Ok(Format::Csv);
        }
    }

    bail!("Unable to detect input format. Use JSON array or CSV with n,e,d0 header.")
}

fn parse_json(content: &str) -> Result<Vec<JobInput>> {
    Ok(serde_json::from_str(content)?)
}

fn parse_csv(content: &str) -> Result<Vec<JobInput>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut inputs = Vec::new();
    for result in reader.deserialize() {
        inputs.push(result?);
    }
    Ok(inputs)
}
