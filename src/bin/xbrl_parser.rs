use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use edgar_facts::core::FactsConfig;
use edgar_facts::edgar::parsing::table;
use edgar_facts::{process_filing, DocumentFormat, FilingKind, FilingMetadata};
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "xbrl-facts",
    about = "Extract XBRL facts from an EDGAR filing and stamp its fiscal period"
)]
struct Opt {
    /// Filing document to parse (inline XBRL HTML or an XBRL instance)
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Company identifier (ticker or CIK)
    #[structopt(short, long)]
    identifier: String,

    /// Form type such as 10-K or 10-Q, or annual/quarterly
    #[structopt(short, long)]
    form: FilingKind,

    /// Period end date of the filing (YYYY-MM-DD)
    #[structopt(short, long)]
    period_end: NaiveDate,

    /// JSON file with fiscal calendar entries, overrides FISCAL_CALENDARS
    #[structopt(long, parse(from_os_str))]
    calendars: Option<PathBuf>,

    /// html or xml; guessed from the content when omitted
    #[structopt(long)]
    format: Option<DocumentFormat>,

    /// Print one line per fact instead of JSON
    #[structopt(long)]
    compact: bool,

    /// Also write the fact table as CSV to this file
    #[structopt(long, parse(from_os_str))]
    csv: Option<PathBuf>,

    /// Acceptable share of facts with unresolved contexts, overrides ORPHAN_TOLERANCE
    #[structopt(long)]
    tolerance: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = FactsConfig::from_env()?;
    if let Some(calendars) = opt.calendars.clone() {
        config.calendars_path = Some(calendars);
    }
    if let Some(tolerance) = opt.tolerance {
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(anyhow!("--tolerance must be between 0 and 1, got {}", tolerance));
        }
        config.orphan_tolerance = tolerance;
    }

    let content = fs::read_to_string(&opt.input)
        .with_context(|| format!("Failed to read {}", opt.input.display()))?;
    let format = opt
        .format
        .unwrap_or_else(|| DocumentFormat::sniff(&content));

    let document_name = opt
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| opt.input.display().to_string());
    let metadata = FilingMetadata::new(&opt.identifier, opt.form, opt.period_end, &document_name);

    let registry = config.load_registry()?;
    let processed = process_filing(&registry, &content, &metadata, format)?;

    if opt.compact {
        println!("{}", processed.fiscal_period);
        print!("{}", table::to_compact_text(&processed.extraction.store));
    } else {
        println!("{}", serde_json::to_string_pretty(&processed)?);
    }

    if let Some(csv_path) = &opt.csv {
        let csv_path = if csv_path.is_relative() && csv_path.parent() == Some(std::path::Path::new("")) {
            fs::create_dir_all(&config.data_dir)?;
            config.data_dir.join(csv_path)
        } else {
            csv_path.clone()
        };
        let file = fs::File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        table::write_csv(&table::facts_to_table(&processed.extraction.store), file)?;
        log::info!("Wrote fact table to {}", csv_path.display());
    }

    if !processed.is_acceptable(config.orphan_tolerance) {
        eprintln!(
            "{}: {:.1}% of facts reference undeclared contexts (tolerance {:.1}%)",
            document_name,
            processed.orphan_ratio() * 100.0,
            config.orphan_tolerance * 100.0
        );
        std::process::exit(2);
    }

    Ok(())
}
