use anyhow::Context;
use clap::{Parser, Subcommand};
use lims_core::{
    evaluate_acceptance, evaluate_submission,
    fixtures::{demo_checklist, demo_result_set, demo_sample},
    sample::Sample,
    ReferenceRange, ResultSet, ResultSetDocument, VerificationChecklist,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lims")]
#[command(about = "LIMS result flagging and submission gate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one value against a reference range
    Classify {
        /// Measured value
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Lower bound of the reference range
        #[arg(allow_negative_numbers = true)]
        low: f64,
        /// Upper bound of the reference range
        #[arg(allow_negative_numbers = true)]
        high: f64,
    },
    /// Flag every parameter in a result-set file (YAML or JSON) and run the submission gate
    Evaluate {
        /// Path to the result-set file
        path: PathBuf,
    },
    /// Show the demo result set with flags and its gate decision, then the demo reception
    /// sample with its verification checklist
    Demo,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Commands::Classify { value, low, high }) => classify_report(value, low, high),
        Some(Commands::Evaluate { path }) => {
            load_result_set(&path).map(|set| evaluation_report(&set))
        }
        Some(Commands::Demo) => demo_report(),
        None => {
            println!("Use 'lims --help' for commands");
            return ExitCode::SUCCESS;
        }
    };

    match outcome {
        Ok(report) => {
            print!("{}", report.text);
            if report.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Printed output and whether it represents a passing result.
struct Report {
    text: String,
    allowed: bool,
}

fn classify_report(value: f64, low: f64, high: f64) -> anyhow::Result<Report> {
    if !value.is_finite() {
        anyhow::bail!("value must be a finite number");
    }
    let range = ReferenceRange::new(low, high)?;
    let flag = range.classify(value);
    let (critical_low, critical_high) = range.critical_bounds();
    Ok(Report {
        text: format!(
            "{value} in {range}: {flag}\ncritical below {critical_low} or above {critical_high}\n"
        ),
        allowed: true,
    })
}

fn load_result_set(path: &Path) -> anyhow::Result<ResultSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ResultSetDocument::parse(&text)?)
}

fn evaluation_report(set: &ResultSet) -> Report {
    let mut text = format!("Sample {}  {}\n", set.sample_id(), set.test_type());

    for group in set.groups() {
        text.push_str(&format!("\n{}\n", group.name));
        for parameter in &group.parameters {
            let flag = parameter
                .flag()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".into());
            let result = if parameter.raw_value.trim().is_empty() {
                "(blank)"
            } else {
                parameter.raw_value.as_str()
            };
            text.push_str(&format!(
                "  {:<28} {:>10} {:<10} {:<16} {}\n",
                parameter.name.as_str(),
                result,
                parameter.unit,
                parameter.range.to_string(),
                flag
            ));
        }
    }

    let summary = set.flag_summary();
    text.push_str(&format!(
        "\n{} parameters: {} normal, {} low, {} high, {} critical, {} missing\n",
        summary.total(),
        summary.normal,
        summary.low,
        summary.high,
        summary.critical(),
        summary.missing
    ));

    let decision = evaluate_submission(set);
    text.push_str(&format!("Submission: {decision}\n"));

    Report {
        text,
        allowed: decision.allowed,
    }
}

fn reception_report(sample: &Sample, checklist: &VerificationChecklist) -> String {
    let mut text = format!(
        "Sample {}  order {}  {:?} priority  status {}\n",
        sample.sample_id,
        sample.order_id,
        sample.priority,
        sample.status()
    );
    text.push_str(&format!(
        "Patient {} ({}), {} y, {}\n",
        sample.patient.name,
        sample.patient.pid,
        sample.patient.age,
        sample.patient.ward_room.as_deref().unwrap_or("no ward recorded")
    ));
    for check in checklist.checks() {
        text.push_str(&format!(
            "  [{}] {}{}\n",
            if check.checked { "x" } else { " " },
            check.label,
            if check.required { "" } else { " (optional)" }
        ));
    }
    let decision = evaluate_acceptance(checklist);
    match decision.outstanding {
        Some(label) => text.push_str(&format!("Acceptance: blocked, {label} outstanding\n")),
        None => text.push_str("Acceptance: allowed\n"),
    }
    text
}

fn demo_report() -> anyhow::Result<Report> {
    let mut report = evaluation_report(&demo_result_set()?);
    report.text.push('\n');
    report
        .text
        .push_str(&reception_report(&demo_sample()?, &demo_checklist()?));
    Ok(report)
}
