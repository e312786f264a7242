use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pasteparse::report::render_stages;
use pasteparse::sources::{default_rules_path, load_rules, read_input};
use pasteparse::{OutputFormat, Report, RuleSet, RunOutcome};

#[derive(Parser)]
#[command(name = "pasteparse")]
#[command(about = "Parse pasted text into canonical fields with cross-reference rules")]
struct Args {
    /// Text file to parse (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Rule set file, YAML or JSON
    /// Defaults to <config dir>/pasteparse/rules.yaml, then the built-in rule set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Print every intermediate pipeline stage instead of the result
    #[arg(long)]
    dump_stages: bool,

    /// Lint the rule set and exit
    #[arg(long)]
    check: bool,

    /// Enable debug logging of the pipeline stages
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "pasteparse_core=debug,pasteparse=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &Args) -> Result<ExitCode> {
    let default_path = default_rules_path();
    let rules = load_rules(args.config.as_deref(), default_path.as_deref())?;

    if args.check {
        return Ok(check_rules(&rules));
    }

    let processor = rules.compile()?;
    let text = read_input(args.input.as_deref())?;

    if args.dump_stages {
        eprintln!("🔬 Pipeline stage dump");
        return match processor.run_capture_stages(&text) {
            Some(stages) => {
                println!("{}", render_stages(&stages)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("⚠️  pasted_text_pattern did not match the input");
                warn!("no match; nothing to dump");
                Ok(ExitCode::from(2))
            }
        };
    }

    let outcome = processor.run(&text);
    let matched = outcome.is_match();
    if let RunOutcome::Parsed(parsed) = &outcome {
        eprintln!("✅ Parsed {} fields", parsed.fields.len());
        debug!("{} rule failures", parsed.failures.len());
        for failure in &parsed.failures {
            eprintln!("⚠️  {failure}");
        }
    } else {
        eprintln!("⚠️  pasted_text_pattern did not match the input");
        warn!("pasted_text_pattern did not match the input");
    }

    let report = Report::new(outcome, &rules)?;
    println!("{}", report.render(args.format, &processor)?);

    Ok(if matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn check_rules(rules: &RuleSet) -> ExitCode {
    if let Err(e) = rules.compile() {
        eprintln!("❌ {e}");
        return ExitCode::from(1);
    }

    let warnings = rules.validate();
    if warnings.is_empty() {
        eprintln!("✅ Rule set OK ({} xrefs)", rules.xrefs.len());
    } else {
        for warning in &warnings {
            eprintln!("⚠️  {warning}");
        }
        eprintln!("📊 {} warning(s)", warnings.len());
    }
    ExitCode::SUCCESS
}
