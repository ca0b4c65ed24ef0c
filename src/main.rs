//! checseq: ChEC-seq analysis helpers
//!
//! Usage: checseq <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use checseq_tools::commands::{BamToBedCommand, BedpeToBedCommand, DyadCommand, SortCommand, Sorter};
use checseq_tools::config::{validate_dyad_index, validate_threads, MissingSignal};
use checseq_tools::error::{ChecseqError, Result};
use checseq_tools::signal::open_track;

#[derive(Parser)]
#[command(name = "checseq")]
#[command(version)]
#[command(about = "ChEC-seq helpers: nucleosome dyad lookup and paired-end BAM to BED conversion", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write log messages to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the next nucleosome of each gene from a signal track
    Dyad {
        /// Gene table (tab-separated, strand in column 4, dyad in column 7)
        #[arg(short, long, default_value = "genes.txt")]
        genes: PathBuf,

        /// Signal track (.bw/.bigwig for bigWig, anything else as bedGraph)
        #[arg(short, long, default_value = "signal.bw")]
        signal: PathBuf,

        /// Column holding the dyad position (only 2 is supported)
        #[arg(short, long, default_value = "2", allow_hyphen_values = true)]
        dyad: i64,

        /// Output gene table
        #[arg(short, long, default_value = "genes-out.txt")]
        output: PathBuf,

        /// Policy for genes without signal in their window
        #[arg(long, value_enum, default_value_t = MissingSignal::Sentinel)]
        missing: MissingSignal,
    },

    /// Convert paired-end BAM files to merged, sorted BED files
    BamToBed {
        /// Samples list, one sample per line; the first line is ignored
        #[arg(short, long, default_value = "samples.txt")]
        samples: PathBuf,

        /// Number of threads used to process data
        #[arg(short, long, default_value = "1")]
        threads: usize,

        /// Directory holding the sample BAM files
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Tool used to sort the merged intervals
        #[arg(long, value_enum, default_value_t = Sorter::Bedtools)]
        sorter: Sorter,

        /// Stop at the first failed sample
        #[arg(long)]
        fail_fast: bool,

        /// Leave pairs with an unmapped mate out of the merged BED
        #[arg(long)]
        skip_unmapped: bool,
    },

    /// Merge the mates of each BEDPE record into one BED interval
    BedpeToBed {
        /// Input BEDPE file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output BED file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sort the merged intervals by chromosome, start and end
        #[arg(long)]
        sort: bool,

        /// Leave pairs with an unmapped mate out of the output
        #[arg(long)]
        skip_unmapped: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_ref()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Dyad {
            genes,
            signal,
            dyad,
            output,
            missing,
        } => run_dyad(genes, signal, dyad, output, missing),

        Commands::BamToBed {
            samples,
            threads,
            dir,
            sorter,
            fail_fast,
            skip_unmapped,
        } => run_bam_to_bed(samples, threads, dir, sorter, fail_fast, skip_unmapped),

        Commands::BedpeToBed {
            input,
            output,
            sort,
            skip_unmapped,
        } => run_bedpe_to_bed(input, output, sort, skip_unmapped),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_default_env();
    // RUST_LOG wins over -v when set.
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    builder.format_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .format_timestamp_secs()
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.format_timestamp(None);
        }
    }

    builder
        .try_init()
        .map_err(|e| ChecseqError::Config(format!("cannot initialize logging: {}", e)))
}

fn run_dyad(
    genes: PathBuf,
    signal: PathBuf,
    dyad: i64,
    output: PathBuf,
    missing: MissingSignal,
) -> Result<()> {
    // Configuration is checked before any file is touched.
    validate_dyad_index(dyad)?;

    let mut track = open_track(&signal)?;
    let stats = DyadCommand::new()
        .with_missing(missing)
        .run(&genes, track.as_mut(), &output)?;
    log::info!("Dyad finished: {}", stats);
    Ok(())
}

fn run_bam_to_bed(
    samples: PathBuf,
    threads: usize,
    dir: PathBuf,
    sorter: Sorter,
    fail_fast: bool,
    skip_unmapped: bool,
) -> Result<()> {
    validate_threads(threads)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| ChecseqError::Config(format!("cannot initialize thread pool: {}", e)))?;

    BamToBedCommand::new()
        .with_threads(threads)
        .with_dir(dir)
        .with_sorter(sorter)
        .with_fail_fast(fail_fast)
        .with_skip_unmapped(skip_unmapped)
        .run(&samples)?
        .check()?;
    Ok(())
}

fn run_bedpe_to_bed(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    sort: bool,
    skip_unmapped: bool,
) -> Result<()> {
    let cmd = BedpeToBedCommand::new().with_skip_unmapped(skip_unmapped);
    let input = input.filter(|p| p.to_string_lossy() != "-");

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    // Sorting needs the whole merged set, so merge into memory first.
    let mut merged = Vec::new();
    let mut target: &mut dyn Write = if sort { &mut merged } else { &mut out };

    let stats = match &input {
        Some(path) => cmd.run(path, &mut target)?,
        None => cmd.run_stdin(&mut target)?,
    };
    log::info!("BEDPE merge: {}", stats);

    if sort {
        SortCommand::new().sort_reader(merged.as_slice(), &mut out)?;
    }
    out.flush()?;
    Ok(())
}
