use crate::error::{ErrorKind, Result};
use crate::packages;
use clap::Parser;
use debsnap_cache::transport::HttpTransport;
use debsnap_cache::{RetryPolicy, TransportHandle};
use debsnap_config::Config;
use debsnap_pipeline::{Pipeline, RunSummary, writer};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Rebuild package, version and checksum history from Debian snapshot
/// archives.
///
/// Package names are read one per line from PACKAGES_FILE or, if no file
/// is given, from standard input when it is redirected. Without a list,
/// every package is processed (time consuming).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File listing the packages to follow
    pub packages: Option<PathBuf>,

    /// First day to include (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date, default_value = "2005-03-12")]
    pub since: Date,

    /// Last day to include (YYYY-MM-DD), defaults to today
    #[arg(short, long, value_parser = parse_date)]
    pub until: Option<Date>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (defaults to debsnap.toml in the user configuration directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of workers (0 = one per CPU)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// CSV output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for per-package policy manifests
    #[arg(short, long)]
    pub manifests: Option<PathBuf>,

    /// Directory holding downloaded index files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Only process the first N snapshots found
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_date(value: &str) -> std::result::Result<Date, String> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|err| err.to_string())
}

impl Cli {
    pub fn run(self) -> Result<RunSummary> {
        let config = self.config()?;
        let packages = packages::read(self.packages.as_deref()).or_raise(|| ErrorKind::Packages)?;
        if packages.is_empty() {
            tracing::info!("No package list given; processing all packages (time consuming)");
        } else {
            tracing::info!(packages = packages.len(), "Following packages");
        }
        bootstrap(&config)?;

        let transport: TransportHandle = Arc::new(HttpTransport::new(&config.http).or_raise(|| ErrorKind::Config)?);
        let policy = RetryPolicy::from(&config.retry);
        let until = self.until.unwrap_or_else(|| OffsetDateTime::now_utc().date());
        tracing::info!(since = %self.since, %until, "Crawling range");
        let mut snapshots = debsnap_crawl::discover(transport.as_ref(), &policy, &config.archive, self.since, until)
            .or_raise(|| ErrorKind::Discovery)?;
        if let Some(limit) = self.limit {
            snapshots.truncate(limit);
        }
        if snapshots.is_empty() {
            tracing::warn!("No snapshots to process");
        }

        let pipeline = Pipeline::from_config(&config, transport, packages).or_raise(|| ErrorKind::Pipeline)?;
        let run = pipeline.run(&snapshots).or_raise(|| ErrorKind::Pipeline)?;
        writer::write_csv(&run.entries, &config.output.csv).or_raise(|| ErrorKind::Output)?;
        if let Some(root) = &config.output.manifests {
            writer::write_manifests(&run.entries, root, config.output.threshold).or_raise(|| ErrorKind::Output)?;
        }
        Ok(run.summary)
    }

    /// Loaded configuration with command-line overrides applied.
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).or_raise(|| ErrorKind::Config)?;
        self.apply(&mut config);
        config.validate().or_raise(|| ErrorKind::Config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.pipeline.concurrency = concurrency;
        }
        if let Some(output) = &self.output {
            config.output.csv = output.clone();
        }
        if let Some(manifests) = &self.manifests {
            config.output.manifests = Some(manifests.clone());
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache.dir = cache_dir.clone();
        }
    }
}

/// Create the cache directory, the manifest root and the CSV's parent.
fn bootstrap(config: &Config) -> Result<()> {
    let csv_parent = config.output.csv.parent().filter(|parent| !parent.as_os_str().is_empty());
    let directories = [Some(config.cache.dir.as_path()), config.output.manifests.as_deref(), csv_parent];
    for directory in directories.into_iter().flatten() {
        create_dir(directory)?;
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).or_raise(|| ErrorKind::Bootstrap(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), "Directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;
    use time::macros::date;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["debsnap"]).unwrap();
        assert_eq!(cli.since, date!(2005 - 03 - 12));
        assert_eq!(cli.until, None);
        assert!(!cli.verbose);
        assert_eq!(cli.packages, None);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::try_parse_from([
            "debsnap", "-s", "2017-01-01", "-u", "2017-02-01", "-v", "-j", "4", "-o", "out.csv", "-m", "policies",
            "--cache-dir", "cache", "--limit", "1", "packages.txt",
        ])
        .unwrap();
        assert_eq!(cli.since, date!(2017 - 01 - 01));
        assert_eq!(cli.until, Some(date!(2017 - 02 - 01)));
        assert!(cli.verbose);
        assert_eq!(cli.limit, Some(1));
        assert_eq!(cli.packages, Some(PathBuf::from("packages.txt")));

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.output.csv, PathBuf::from("out.csv"));
        assert_eq!(config.output.manifests, Some(PathBuf::from("policies")));
        assert_eq!(config.cache.dir, PathBuf::from("cache"));
    }

    #[rstest]
    #[case("2017-1-1")]
    #[case("20170101")]
    #[case("2017-02-30")]
    fn invalid_dates(#[case] value: &str) {
        assert!(Cli::try_parse_from(["debsnap", "--since", value]).is_err());
    }

    #[test]
    fn bootstrap_creates_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.dir = dir.path().join("cache/snapshots");
        config.output.manifests = Some(dir.path().join("policies"));
        config.output.csv = dir.path().join("out/snapshots.csv");
        bootstrap(&config).unwrap();
        assert!(config.cache.dir.is_dir());
        assert!(dir.path().join("policies").is_dir());
        assert!(dir.path().join("out").is_dir());
    }
}
