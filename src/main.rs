use std::{
    fs,
    io::{self, BufWriter},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{bail, Context, Result};
use bbrc_miner::{
    loader::parse_gspan,
    output::{OutputFormat, RecordWriter},
    Bound, FragmentRecord, Level, Session, Settings,
};
use clap::Parser;
use csv::ReaderBuilder;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Compounds: `.smi` (`id<TAB>smiles` per line) or `.gsp` (gSpan blocks).
    graphs: PathBuf,

    /// Activities: `id<TAB>endpoint<TAB>value` per line. Without them,
    /// plain frequent fragments are mined.
    activities: Option<PathBuf>,

    /// Weights: `id<TAB>weight` per line.
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Minimum weighted support.
    #[arg(short = 'f', long, default_value_t = 2.0)]
    min_frequency: f64,

    #[arg(short, long, value_enum, default_value_t = Level::Trees)]
    level: Level,

    /// Confidence level of the significance test.
    #[arg(short = 'p', long, default_value_t = 0.95)]
    significance: f64,

    /// Refine fragments occurring in a single compound (sets -f 1).
    #[arg(short = 's', long)]
    refine_singles: bool,

    #[arg(short = 'a', long)]
    no_aromaticity: bool,

    /// Disable upper bound pruning.
    #[arg(short = 'u', long)]
    no_pruning: bool,

    /// Disable the dynamic upper bound.
    #[arg(short = 'd', long)]
    no_dynamic_bound: bool,

    /// Report every significant fragment instead of one per backbone class.
    #[arg(short = 'b', long)]
    no_backbone: bool,

    /// Separate backbone refinement classes in the output.
    #[arg(short = 'r', long)]
    bbrc_sep: bool,

    /// Treat activities as continuous (KS test).
    #[arg(short = 'g', long)]
    regression: bool,

    /// Mine without printing fragments.
    #[arg(short = 'o', long)]
    no_output: bool,

    /// Number the output lines.
    #[arg(short = 'n', long)]
    line_numbers: bool,

    /// Largest number of bonds in a fragment.
    #[arg(long)]
    max_hops: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Mine roots one after another instead of in parallel.
    #[arg(long)]
    serial: bool,
}

fn tab_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))
}

fn field<'a>(record: &'a csv::StringRecord, i: usize, path: &Path) -> Result<&'a str> {
    let line = record.position().map_or(0, |p| p.line());
    record
        .get(i)
        .map(str::trim)
        .with_context(|| format!("{}:{line}: missing field {}", path.display(), i + 1))
}

fn load_compounds(session: &mut Session, path: &Path) -> Result<()> {
    if path.extension().is_some_and(|ext| ext == "gsp") {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let graphs =
            parse_gspan(&text).with_context(|| format!("cannot parse {}", path.display()))?;
        for (id, molecule) in graphs {
            if let Err(err) = session.add_molecule(molecule, id) {
                warn!(%err, "skipping compound");
            }
        }
        return Ok(());
    }

    for record in tab_reader(path)?.records() {
        let record = record.with_context(|| format!("cannot read {}", path.display()))?;
        let id: u64 = field(&record, 0, path)?
            .parse()
            .with_context(|| format!("{}: compound ids must be integers", path.display()))?;
        let smiles = field(&record, 1, path)?;
        if let Err(err) = session.add_compound(smiles, id) {
            warn!(%err, "skipping compound");
        }
    }
    Ok(())
}

fn load_activities(session: &mut Session, path: &Path) -> Result<()> {
    let mut endpoint: Option<String> = None;
    for record in tab_reader(path)?.records() {
        let record = record.with_context(|| format!("cannot read {}", path.display()))?;
        let id: u64 = field(&record, 0, path)?
            .parse()
            .with_context(|| format!("{}: compound ids must be integers", path.display()))?;
        let name = field(&record, 1, path)?;
        match &endpoint {
            None => endpoint = Some(name.to_string()),
            Some(first) if first != name => {
                warn!(endpoint = name, "only the first endpoint is mined, skipping");
                continue;
            }
            Some(_) => {}
        }
        let value: f64 = field(&record, 2, path)?
            .parse()
            .with_context(|| format!("{}: activity of {id} is not a number", path.display()))?;
        if let Err(err) = session.add_activity(value, id) {
            warn!(%err, "skipping activity");
        }
    }
    Ok(())
}

fn load_weights(session: &mut Session, path: &Path) -> Result<()> {
    for record in tab_reader(path)?.records() {
        let record = record.with_context(|| format!("cannot read {}", path.display()))?;
        let id: u64 = field(&record, 0, path)?
            .parse()
            .with_context(|| format!("{}: compound ids must be integers", path.display()))?;
        let value: f64 = field(&record, 1, path)?
            .parse()
            .with_context(|| format!("{}: weight of {id} is not a number", path.display()))?;
        session.add_weight(value, id)?;
    }
    Ok(())
}

fn settings(cli: &Cli) -> Settings {
    let mut bounds = Vec::new();
    if !cli.no_pruning {
        bounds.push(Bound::Significance);
        if !cli.no_dynamic_bound {
            bounds.push(Bound::Dynamic);
        }
    }
    Settings {
        min_frequency: if cli.refine_singles { 1.0 } else { cli.min_frequency },
        level: cli.level,
        significance: if cli.activities.is_some() { cli.significance } else { 0.0 },
        refine_singles: cli.refine_singles,
        regression: cli.regression,
        backbone: !cli.no_backbone,
        bounds,
        max_hops: cli.max_hops,
        aromatic: !cli.no_aromaticity,
        console_out: false,
        output: cli.format,
        bbrc_sep: cli.bbrc_sep,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut session = Session::with_settings(settings(&cli))?;

    load_compounds(&mut session, &cli.graphs)?;
    if session.compound_count() == 0 {
        bail!("no compounds read from {}", cli.graphs.display());
    }
    match &cli.activities {
        Some(path) => load_activities(&mut session, path)?,
        None => {
            info!("no activities given, mining frequent fragments");
            let ids: Vec<u64> = session.store().iter().map(|c| c.id()).collect();
            for id in ids {
                session.add_activity(0.0, id)?;
            }
        }
    }
    if let Some(path) = &cli.weights {
        load_weights(&mut session, path)?;
    }
    info!(
        compounds = session.compound_count(),
        roots = session.root_count(),
        "data loaded"
    );

    let start = Instant::now();
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(BufWriter::new(stdout.lock()), cli.format)
        .line_numbers(cli.line_numbers)
        .bbrc_sep(cli.bbrc_sep);
    let mut mined = 0usize;
    let mut emit = |records: &[FragmentRecord]| -> Result<()> {
        mined += records.len();
        if !cli.no_output {
            writer.write_root(records)?;
        }
        Ok(())
    };

    if cli.serial {
        for root in 0..session.root_count() {
            match session.mine_root(root) {
                Ok(records) => emit(&records)?,
                Err(err) => warn!(root, %err, "root aborted"),
            }
        }
    } else {
        for (root, result) in session.mine_all()?.into_iter().enumerate() {
            match result {
                Ok(records) => emit(&records)?,
                Err(err) => warn!(root, %err, "root aborted"),
            }
        }
    }
    writer.flush()?;
    info!(fragments = mined, elapsed = ?start.elapsed(), "mining finished");
    Ok(())
}
