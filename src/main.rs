//! CLI for partial key exposure attacks on prime-power RSA

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keygap::attack::{
    recommended_parameters, sweep, AttackOutcome, AttackTarget, BruteForceAttack,
    CoppersmithAttack,
};
use keygap::exposure::{Exposure, ExposureKind};
use keygap::provider::load_jobs;
use keygap::rsa::{self, RsaConfig};
use keygap::verify;
use rug::integer::Order;
use rug::{Integer, Rational};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "keygap")]
#[command(about = "Partial key exposure attacks on prime-power RSA")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Attack jobs loaded from a file or stdin
    Attack {
        #[arg(default_value = "-")]
        input: String,

        #[arg(
            long,
            default_value = "lattice",
            help = "Attack method: lattice, brute-force"
        )]
        method: String,

        #[arg(long, default_value = "3", help = "Powers of f used as lattice rows")]
        m: u32,

        #[arg(long, default_value = "2", help = "Extra shifted rows x^i * f^m")]
        t: u32,

        #[arg(long, default_value = "0.99", help = "Lovász parameter in (0.25, 1)")]
        delta: f64,

        #[arg(long, help = "Abort reduction after this many basis reduction steps")]
        max_steps: Option<u64>,

        #[arg(long, help = "Try several m,t pairs, e.g. \"2,1;3,2;4,3\"")]
        sweep: Option<String>,

        #[arg(
            long,
            default_value = "4",
            help = "Worker threads for sweeps and brute force"
        )]
        threads: usize,

        #[arg(long, help = "Cap on brute-force candidates")]
        max_attempts: Option<u64>,
    },
    /// Generate a key, drop bits from d, and attack the result end to end
    Demo {
        #[arg(long, default_value = "20", help = "Bit length of each prime")]
        bit_length: u32,

        #[arg(long, default_value = "2", help = "Power of p in the modulus")]
        r: u32,

        #[arg(long, default_value = "1", help = "Power of q in the modulus")]
        s: u32,

        #[arg(
            long,
            default_value = "0.7",
            help = "Fraction of exponent bits exposed"
        )]
        ratio: f64,

        #[arg(long, default_value = "msb", help = "Exposure direction: msb, lsb")]
        exposure: String,

        #[arg(long, help = "Lattice parameter m (default: preset for the bit length)")]
        m: Option<u32>,

        #[arg(long, help = "Lattice parameter t (default: preset for the bit length)")]
        t: Option<u32>,

        #[arg(long, help = "Seed for reproducible key generation")]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(all_recovered) => {
            if all_recovered {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Attack {
            input,
            method,
            m,
            t,
            delta,
            max_steps,
            sweep: sweep_grid,
            threads,
            max_attempts,
        } => {
            let delta = parse_delta(delta)?;
            let jobs = load_jobs(&input)?;
            if jobs.is_empty() {
                bail!("No attack jobs in input");
            }

            let mut outputs = Vec::new();
            let mut keys_recovered = 0;
            for (index, job) in jobs.iter().enumerate() {
                let (outcome, winner) = run_job(
                    job,
                    &method,
                    m,
                    t,
                    &delta,
                    max_steps,
                    sweep_grid.as_deref(),
                    threads,
                    max_attempts,
                )?;
                if outcome.is_recovered() {
                    keys_recovered += 1;
                }
                outputs.push(job_output(index, job, &outcome, winner));
            }

            let report = OutputReport {
                summary: SummaryOutput {
                    total_jobs: jobs.len(),
                    keys_recovered,
                },
                jobs: outputs,
            };
            println!("{}", format_report(&report, cli.json)?);
            Ok(keys_recovered == jobs.len())
        }
        Command::Demo {
            bit_length,
            r,
            s,
            ratio,
            exposure,
            m,
            t,
            seed,
        } => {
            let kind: ExposureKind = exposure.parse()?;
            let config = RsaConfig {
                bit_length,
                r,
                s,
                e: Integer::from(65537),
            };
            let key = rsa::generate(&config, seed)?;
            let (exposure, hidden) = Exposure::simulate(&key.d, ratio, kind)?;
            let target = AttackTarget {
                n: key.n.clone(),
                e: key.e.clone(),
                modulus: key.phi.clone(),
                exposure,
            };

            let (preset_m, preset_t) = recommended_parameters(bit_length);
            let outcome =
                CoppersmithAttack::new(m.unwrap_or(preset_m), t.unwrap_or(preset_t)).run(&target)?;
            let report = demo_output(&key.n, &key.d, &hidden, &target, &outcome);
            println!("{}", format_demo(&report, cli.json)?);
            Ok(report.status == "recovered" && report.matches_true_key == Some(true))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_job(
    job: &AttackTarget,
    method: &str,
    m: u32,
    t: u32,
    delta: &Rational,
    max_steps: Option<u64>,
    sweep_grid: Option<&str>,
    threads: usize,
    max_attempts: Option<u64>,
) -> Result<(AttackOutcome, Option<(u32, u32)>)> {
    match method {
        "lattice" => {
            if let Some(grid) = sweep_grid {
                let grid = parse_grid(grid)?;
                let report = sweep(job, &grid, delta, max_steps, threads)?;
                Ok((report.outcome, report.winner))
            } else {
                let attack = CoppersmithAttack::new(m, t)
                    .with_delta(delta.clone())
                    .with_max_steps(max_steps);
                Ok((attack.run(job)?, None))
            }
        }
        "brute-force" => {
            if sweep_grid.is_some() {
                bail!("--sweep only applies to the lattice method");
            }
            let attack = BruteForceAttack::new(threads).with_max_attempts(max_attempts);
            Ok((attack.run(job)?, None))
        }
        _ => bail!("Unknown attack method: {}", method),
    }
}

fn parse_delta(delta: f64) -> Result<Rational> {
    Rational::from_f64(delta).with_context(|| format!("delta {} is not a finite number", delta))
}

fn parse_grid(grid: &str) -> Result<Vec<(u32, u32)>> {
    let mut pairs = Vec::new();
    for part in grid.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (m, t) = part
            .split_once(',')
            .with_context(|| format!("Sweep entry '{}' is not of the form m,t", part))?;
        let m: u32 = m.trim().parse().context("Invalid m in sweep grid")?;
        let t: u32 = t.trim().parse().context("Invalid t in sweep grid")?;
        pairs.push((m, t));
    }
    if pairs.is_empty() {
        bail!("Sweep grid is empty");
    }
    Ok(pairs)
}

#[derive(Serialize)]
struct OutputReport {
    jobs: Vec<JobOutput>,
    summary: SummaryOutput,
}

#[derive(Serialize)]
struct JobOutput {
    index: usize,
    exposure: String,
    status: String,
    hidden_block: Option<String>,
    private_exponent_decimal: Option<String>,
    private_exponent_hex: Option<String>,
    congruence_check: Option<bool>,
    reason: Option<String>,
    sweep_winner: Option<String>,
}

#[derive(Serialize)]
struct SummaryOutput {
    total_jobs: usize,
    keys_recovered: usize,
}

fn job_output(
    index: usize,
    job: &AttackTarget,
    outcome: &AttackOutcome,
    winner: Option<(u32, u32)>,
) -> JobOutput {
    match outcome {
        AttackOutcome::Recovered { x, d } => JobOutput {
            index,
            exposure: job.exposure.kind.to_string(),
            status: "recovered".to_string(),
            hidden_block: Some(x.to_string()),
            private_exponent_decimal: Some(d.to_string()),
            private_exponent_hex: Some(integer_to_hex(d)),
            congruence_check: Some(verify::key_consistent(&job.e, d, &job.modulus)),
            reason: None,
            sweep_winner: winner.map(|(m, t)| format!("m={} t={}", m, t)),
        },
        AttackOutcome::Failed(reason) => JobOutput {
            index,
            exposure: job.exposure.kind.to_string(),
            status: "failed".to_string(),
            hidden_block: None,
            private_exponent_decimal: None,
            private_exponent_hex: None,
            congruence_check: None,
            reason: Some(reason.to_string()),
            sweep_winner: None,
        },
    }
}

fn format_report(report: &OutputReport, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Loaded {} attack jobs\n\n",
        report.summary.total_jobs
    ));
    for job in &report.jobs {
        output.push_str(&format!("Job #{}\n", job.index + 1));
        output.push_str(&format!("  Exposure: {}\n", job.exposure));
        output.push_str(&format!("  Status: {}\n", job.status));
        if let Some(winner) = &job.sweep_winner {
            output.push_str(&format!("  Sweep winner: {}\n", winner));
        }
        if let Some(x) = &job.hidden_block {
            output.push_str(&format!("  Hidden block x: {}\n", x));
        }
        if let Some(d) = &job.private_exponent_decimal {
            output.push_str(&format!("  Private exponent (decimal): {}\n", d));
        }
        if let Some(d) = &job.private_exponent_hex {
            output.push_str(&format!("  Private exponent (hex): {}\n", d));
        }
        if let Some(ok) = job.congruence_check {
            output.push_str(&format!(
                "  Congruence check: {}\n",
                if ok { "ok" } else { "FAILED" }
            ));
        }
        if let Some(reason) = &job.reason {
            output.push_str(&format!("  Reason: {}\n", reason));
        }
        output.push('\n');
    }
    output.push_str(&format!(
        "Recovered {} of {} keys\n",
        report.summary.keys_recovered, report.summary.total_jobs
    ));
    Ok(output)
}

#[derive(Serialize)]
struct DemoOutput {
    n: String,
    exposure: String,
    expected_hidden_block: String,
    status: String,
    recovered_exponent: Option<String>,
    matches_true_key: Option<bool>,
    encryption_roundtrip: Option<bool>,
    reason: Option<String>,
}

fn demo_output(
    n: &Integer,
    true_d: &Integer,
    hidden: &Integer,
    target: &AttackTarget,
    outcome: &AttackOutcome,
) -> DemoOutput {
    match outcome {
        AttackOutcome::Recovered { x: _, d } => {
            let message = Integer::from(42) % n;
            DemoOutput {
                n: n.to_string(),
                exposure: target.exposure.kind.to_string(),
                expected_hidden_block: hidden.to_string(),
                status: "recovered".to_string(),
                recovered_exponent: Some(d.to_string()),
                matches_true_key: Some(d == true_d),
                encryption_roundtrip: Some(verify::encryption_roundtrip(
                    n, &target.e, d, &message,
                )),
                reason: None,
            }
        }
        AttackOutcome::Failed(reason) => DemoOutput {
            n: n.to_string(),
            exposure: target.exposure.kind.to_string(),
            expected_hidden_block: hidden.to_string(),
            status: "failed".to_string(),
            recovered_exponent: None,
            matches_true_key: None,
            encryption_roundtrip: None,
            reason: Some(reason.to_string()),
        },
    }
}

fn format_demo(report: &DemoOutput, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut output = String::new();
    output.push_str(&format!("Modulus n: {}\n", report.n));
    output.push_str(&format!("Exposure: {}\n", report.exposure));
    output.push_str(&format!(
        "Expected hidden block: {}\n",
        report.expected_hidden_block
    ));
    output.push_str(&format!("Status: {}\n", report.status));
    if let Some(d) = &report.recovered_exponent {
        output.push_str(&format!("Recovered exponent: {}\n", d));
    }
    if let Some(matches) = report.matches_true_key {
        output.push_str(&format!(
            "Matches true key: {}\n",
            if matches { "yes" } else { "NO" }
        ));
    }
    if let Some(ok) = report.encryption_roundtrip {
        output.push_str(&format!(
            "Encryption round trip: {}\n",
            if ok { "ok" } else { "FAILED" }
        ));
    }
    if let Some(reason) = &report.reason {
        output.push_str(&format!("Reason: {}\n", reason));
    }
    Ok(output)
}

fn integer_to_hex(n: &Integer) -> String {
    let digits = n.to_digits::<u8>(Order::Msf);
    if digits.is_empty() {
        return "00".to_string();
    }
    hex::encode(digits)
}
