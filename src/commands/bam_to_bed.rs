//! Batch conversion of paired-end BAM files to merged, sorted BED files.
//!
//! For each sample `S` of the samples list, resolved against the working
//! directory:
//!
//! 1. `samtools sort -n --threads (t-1) -o S.bam.sort S.bam`
//! 2. `bedtools bamtobed -bedpe -mate1 -i S.bam.sort > S.bedpe`, then
//!    `S.bam.sort` is removed
//! 3. mate pairs of `S.bedpe` are merged into `S.bedpe-merge.bed`
//! 4. `bedtools sort -i S.bedpe-merge.bed > S-raw.bed` (or the in-process
//!    sort), then `S.bedpe-merge.bed` is removed
//!
//! Every step checks that its output file exists before the next one runs.

use crate::commands::bedpe_to_bed::{BedpeToBedCommand, MergeStats};
use crate::commands::sort::SortCommand;
use crate::error::{ChecseqError, Result};
use crate::external::{require_output, run_checked, SystemRunner, ToolInvocation, ToolRunner};
use crate::samples::read_samples;
use clap::ValueEnum;
use log::{debug, error, info};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How the merged intervals are put in genomic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Sorter {
    /// `bedtools sort`
    #[default]
    Bedtools,
    /// Built-in stable sort, no external process
    Internal,
}

/// File names used while converting one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePaths {
    pub bam: PathBuf,
    pub name_sorted: PathBuf,
    pub bedpe: PathBuf,
    pub merged: PathBuf,
    pub raw_bed: PathBuf,
}

impl SamplePaths {
    pub fn new(dir: &Path, sample: &str) -> Self {
        Self {
            bam: dir.join(format!("{}.bam", sample)),
            name_sorted: dir.join(format!("{}.bam.sort", sample)),
            bedpe: dir.join(format!("{}.bedpe", sample)),
            merged: dir.join(format!("{}.bedpe-merge.bed", sample)),
            raw_bed: dir.join(format!("{}-raw.bed", sample)),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    /// Samples listed.
    pub samples: usize,
    /// Samples converted successfully.
    pub converted: usize,
    /// Mate pairs merged across all converted samples.
    pub pairs: usize,
    /// Names of the samples that failed, in list order.
    pub failed: Vec<String>,
}

impl BatchStats {
    /// Turn a run with failed samples into an error.
    pub fn check(self) -> Result<Self> {
        if self.failed.is_empty() {
            return Ok(self);
        }
        Err(ChecseqError::SamplesFailed {
            failed: self.failed.len(),
            total: self.samples,
            samples: self.failed.join(", "),
        })
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={} converted={} failed={} pairs={}",
            self.samples,
            self.converted,
            self.failed.len(),
            self.pairs
        )
    }
}

/// BAM to BED batch command.
#[derive(Debug, Clone)]
pub struct BamToBedCommand<R: ToolRunner = SystemRunner> {
    /// Total threads; samtools gets `threads - 1` extra workers.
    pub threads: usize,
    /// Directory the sample files live in.
    pub dir: PathBuf,
    pub sorter: Sorter,
    /// Stop at the first failed sample instead of moving on.
    pub fail_fast: bool,
    /// Leave pairs with an unmapped mate out of the merged BED.
    pub skip_unmapped: bool,
    runner: R,
}

impl Default for BamToBedCommand<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl BamToBedCommand<SystemRunner> {
    pub fn new() -> Self {
        Self {
            threads: 1,
            dir: PathBuf::from("."),
            sorter: Sorter::default(),
            fail_fast: false,
            skip_unmapped: false,
            runner: SystemRunner,
        }
    }
}

impl<R: ToolRunner> BamToBedCommand<R> {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_sorter(mut self, sorter: Sorter) -> Self {
        self.sorter = sorter;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_skip_unmapped(mut self, skip_unmapped: bool) -> Self {
        self.skip_unmapped = skip_unmapped;
        self
    }

    /// Replace the tool runner.
    pub fn with_runner<T: ToolRunner>(self, runner: T) -> BamToBedCommand<T> {
        BamToBedCommand {
            threads: self.threads,
            dir: self.dir,
            sorter: self.sorter,
            fail_fast: self.fail_fast,
            skip_unmapped: self.skip_unmapped,
            runner,
        }
    }

    /// Convert every sample named in the samples list.
    pub fn run<P: AsRef<Path>>(&self, samples: P) -> Result<BatchStats> {
        let samples = read_samples(samples)?;
        self.run_samples(&samples)
    }

    /// Convert the given samples in order.
    pub fn run_samples(&self, samples: &[String]) -> Result<BatchStats> {
        let mut stats = BatchStats {
            samples: samples.len(),
            ..Default::default()
        };

        for sample in samples {
            info!("Convert BAM to BED for sample {}", sample);
            match self.convert_sample(sample) {
                Ok(merge) => {
                    info!("Sample {} done: {}", sample, merge);
                    stats.converted += 1;
                    stats.pairs += merge.records;
                }
                Err(e) if self.fail_fast => return Err(e),
                Err(e) => {
                    error!("Sample {} failed: {}", sample, e);
                    stats.failed.push(sample.clone());
                }
            }
        }

        info!("BAM to BED stats: {}", stats);
        Ok(stats)
    }

    /// Run the whole pipeline for one sample.
    pub fn convert_sample(&self, sample: &str) -> Result<MergeStats> {
        let paths = SamplePaths::new(&self.dir, sample);
        self.bam_to_bedpe(&paths)?;
        self.bedpe_to_bed(&paths)
    }

    fn bam_to_bedpe(&self, paths: &SamplePaths) -> Result<()> {
        let sort = ToolInvocation::new("samtools")
            .args(["sort", "-n", "--threads"])
            .arg(self.threads.saturating_sub(1).to_string())
            .arg("-o")
            .arg(&paths.name_sorted)
            .arg(&paths.bam);
        run_checked(&self.runner, &sort)?;
        require_output("samtools", &paths.name_sorted)?;

        let bamtobed = ToolInvocation::new("bedtools")
            .args(["bamtobed", "-bedpe", "-mate1", "-i"])
            .arg(&paths.name_sorted)
            .stdout_to(&paths.bedpe);
        run_checked(&self.runner, &bamtobed)?;
        require_output("bedtools", &paths.bedpe)?;

        remove_intermediate(&paths.name_sorted)
    }

    fn bedpe_to_bed(&self, paths: &SamplePaths) -> Result<MergeStats> {
        let merge = BedpeToBedCommand::new()
            .with_skip_unmapped(self.skip_unmapped)
            .run_to_file(&paths.bedpe, &paths.merged)?;

        match self.sorter {
            Sorter::Bedtools => {
                let sort = ToolInvocation::new("bedtools")
                    .args(["sort", "-i"])
                    .arg(&paths.merged)
                    .stdout_to(&paths.raw_bed);
                run_checked(&self.runner, &sort)?;
                require_output("bedtools", &paths.raw_bed)?;
            }
            Sorter::Internal => {
                SortCommand::new().run(&paths.merged, &paths.raw_bed)?;
            }
        }

        remove_intermediate(&paths.merged)?;
        Ok(merge)
    }
}

fn remove_intermediate(path: &Path) -> Result<()> {
    debug!("Removing {}", path.display());
    fs::remove_file(path)?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use tempfile::TempDir;

    const BEDPE: &str = "chr2\t50\t100\tchr2\t80\t130\tr1\t60\t+\t-\n\
                         chr1\t300\t350\tchr1\t200\t260\tr2\t60\t+\t-\n\
                         chr1\t10\t60\tchr1\t40\t90\tr3\t60\t-\t+\n";

    const RAW_BED: &str = "chr1\t10\t90\tr3\t60\t-\t+\n\
                           chr1\t200\t350\tr2\t60\t+\t-\n\
                           chr2\t50\t130\tr1\t60\t+\t-\n";

    /// Records invocations and fakes the files the real tools would write.
    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<Vec<ToolInvocation>>,
        /// Exit non-zero for invocations mentioning this text.
        fail_on: Option<String>,
        /// Exit zero without writing anything.
        no_output: bool,
    }

    impl FakeRunner {
        fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.to_string()).collect()
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(&self, invocation: &ToolInvocation) -> Result<ExitStatus> {
            self.calls.borrow_mut().push(invocation.clone());
            if let Some(pattern) = &self.fail_on {
                if invocation.to_string().contains(pattern.as_str()) {
                    return Ok(ExitStatus::from_raw(1 << 8));
                }
            }
            if self.no_output {
                return Ok(ExitStatus::from_raw(0));
            }

            let subcommand = invocation.args[0].to_string_lossy().into_owned();
            match (invocation.program.as_str(), subcommand.as_str()) {
                ("samtools", "sort") => {
                    let out = invocation.arg_value("-o").unwrap();
                    fs::write(out, "name-sorted bam").unwrap();
                }
                ("bedtools", "bamtobed") => {
                    fs::write(invocation.stdout.as_ref().unwrap(), BEDPE).unwrap();
                }
                ("bedtools", "sort") => {
                    let input = invocation.arg_value("-i").unwrap();
                    SortCommand::new()
                        .with_parallel(false)
                        .run(input, invocation.stdout.as_ref().unwrap())
                        .unwrap();
                }
                other => panic!("unexpected tool call: {other:?}"),
            }
            Ok(ExitStatus::from_raw(0))
        }
    }

    fn setup(samples: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut list = String::from("Sample\n");
        for sample in samples {
            list.push_str(sample);
            list.push('\n');
            fs::write(dir.path().join(format!("{}.bam", sample)), "bam").unwrap();
        }
        fs::write(dir.path().join("samples.txt"), list).unwrap();
        dir
    }

    #[test]
    fn test_sorter_names() {
        assert_eq!(Sorter::from_str("bedtools", false), Ok(Sorter::Bedtools));
        assert_eq!(Sorter::from_str("internal", false), Ok(Sorter::Internal));
        assert!(Sorter::from_str("gnu", false).is_err());
    }

    #[test]
    fn test_pipeline_with_bedtools_sort() {
        let dir = setup(&["s1"]);
        let runner = FakeRunner::default();
        let stats = BamToBedCommand::new()
            .with_threads(3)
            .with_dir(dir.path())
            .with_runner(&runner)
            .run(dir.path().join("samples.txt"))
            .unwrap();

        assert_eq!(stats.converted, 1);
        assert_eq!(stats.pairs, 3);
        assert!(stats.failed.is_empty());

        let d = dir.path().display();
        assert_eq!(
            runner.commands(),
            vec![
                format!("samtools sort -n --threads 2 -o {d}/s1.bam.sort {d}/s1.bam"),
                format!("bedtools bamtobed -bedpe -mate1 -i {d}/s1.bam.sort > {d}/s1.bedpe"),
                format!("bedtools sort -i {d}/s1.bedpe-merge.bed > {d}/s1-raw.bed"),
            ]
        );

        let paths = SamplePaths::new(dir.path(), "s1");
        assert_eq!(fs::read_to_string(&paths.raw_bed).unwrap(), RAW_BED);
        assert!(paths.bedpe.exists());
        assert!(!paths.name_sorted.exists());
        assert!(!paths.merged.exists());
    }

    #[test]
    fn test_single_thread_passes_zero_extra() {
        let dir = setup(&["s1"]);
        let runner = FakeRunner::default();
        BamToBedCommand::new()
            .with_dir(dir.path())
            .with_runner(&runner)
            .convert_sample("s1")
            .unwrap();
        assert!(runner.commands()[0].starts_with("samtools sort -n --threads 0 -o"));
    }

    #[test]
    fn test_pipeline_with_internal_sort() {
        let dir = setup(&["s1"]);
        let runner = FakeRunner::default();
        BamToBedCommand::new()
            .with_dir(dir.path())
            .with_sorter(Sorter::Internal)
            .with_runner(&runner)
            .run(dir.path().join("samples.txt"))
            .unwrap()
            .check()
            .unwrap();

        assert_eq!(runner.commands().len(), 2);
        let paths = SamplePaths::new(dir.path(), "s1");
        assert_eq!(fs::read_to_string(&paths.raw_bed).unwrap(), RAW_BED);
        assert!(!paths.merged.exists());
    }

    #[test]
    fn test_failed_sample_does_not_stop_batch() {
        let dir = setup(&["s1", "bad", "s2"]);
        let runner = FakeRunner {
            fail_on: Some("bad.bam".to_string()),
            ..Default::default()
        };
        let stats = BamToBedCommand::new()
            .with_dir(dir.path())
            .with_runner(&runner)
            .run(dir.path().join("samples.txt"))
            .unwrap();

        assert_eq!(stats.samples, 3);
        assert_eq!(stats.converted, 2);
        assert_eq!(stats.failed, vec!["bad".to_string()]);
        assert!(dir.path().join("s2-raw.bed").exists());

        let err = stats.check().unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 samples failed: bad");
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let dir = setup(&["bad", "s2"]);
        let runner = FakeRunner {
            fail_on: Some("bad.bam".to_string()),
            ..Default::default()
        };
        let err = BamToBedCommand::new()
            .with_dir(dir.path())
            .with_fail_fast(true)
            .with_runner(&runner)
            .run(dir.path().join("samples.txt"))
            .unwrap_err();

        match err {
            ChecseqError::ExternalTool { tool, message } => {
                assert_eq!(tool, "samtools");
                assert!(message.contains("exited with"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.commands().len(), 1);
        assert!(!dir.path().join("s2-raw.bed").exists());
    }

    #[test]
    fn test_missing_tool_output_is_an_error() {
        let dir = setup(&["s1"]);
        let runner = FakeRunner {
            no_output: true,
            ..Default::default()
        };
        let err = BamToBedCommand::new()
            .with_dir(dir.path())
            .with_runner(&runner)
            .convert_sample("s1")
            .unwrap_err();
        assert!(err.to_string().contains("s1.bam.sort was not created"));
    }
}
