//! Implementation of the build command.
//!
//! Turns parsed flags into [`BuildOptions`], runs the build on a Tokio runtime
//! with Ctrl-C wired to cancellation, and renders progress and the final report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use pbuild_lib::artifact::Compression;
use pbuild_lib::config::{BUILD_MODE_AUTO, BuildConfig, BuildStrategy, FeatureLevels};
use pbuild_lib::consts::DEFAULT_OUTPUT_DIR;
use pbuild_lib::execute::{BuildEvent, BuildObserver, BuildOptions, BuildReport, BuildStatus, default_parallelism, run};
use pbuild_lib::toolchain::GoToolchain;
use pbuild_lib::toolchain::go::DEFAULT_PROGRAM;

use crate::output::{Table, print_error, print_info, print_stat, print_success, print_warning, side_by_side, symbols};

#[derive(Debug, Clone, Args, Serialize)]
pub struct BuildArgs {
  /// Directory of the project to build
  #[arg(default_value = ".")]
  pub target_dir: PathBuf,

  /// Build the full default target matrix instead of the host platform
  #[arg(long)]
  pub all: bool,

  /// Artifact base name (default: inferred from go.mod or the directory name)
  #[arg(long)]
  pub name: Option<String>,

  /// Output directory, relative to the project root unless absolute
  #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
  pub output_dir: PathBuf,

  /// Version tag override, used verbatim
  #[arg(long)]
  pub version: Option<String>,

  /// Build strategy: flexible, purego or traditional
  #[arg(long, default_value = "purego")]
  pub strategy: String,

  /// GOAMD64 level
  #[arg(long, default_value = "v2")]
  pub amd64_level: String,

  /// GOARM64 level
  #[arg(long, default_value = "v8.0")]
  pub arm64_level: String,

  /// GOARM level
  #[arg(long, default_value = "7")]
  pub arm_level: String,

  /// GOMIPS level
  #[arg(long, default_value = "hardfloat")]
  pub mips_level: String,

  /// GOPPC64 level
  #[arg(long, default_value = "power8")]
  pub ppc64_level: String,

  /// GORISCV64 level
  #[arg(long, default_value = "rva20u64")]
  pub riscv_level: String,

  /// Build mode: auto, exe, pie, ...
  #[arg(long, default_value = BUILD_MODE_AUTO)]
  pub buildmode: String,

  /// Extra comma-separated build tags
  #[arg(long, default_value = "")]
  pub tags: String,

  /// Link flags (default: -s -w -X main.appVersion=<version>)
  #[arg(long, default_value = "", allow_hyphen_values = true)]
  pub ldflags: String,

  /// Extra compiler flags (default: -trimpath)
  #[arg(long, default_value = "", allow_hyphen_values = true)]
  pub build_flags: String,

  /// Enable verbose output
  #[arg(short, long)]
  pub verbose: bool,

  /// Keep previous artifacts of the same version
  #[arg(long)]
  pub skip_cleanup: bool,

  /// Do not start new targets after the first failure
  #[arg(long)]
  pub stop_on_error: bool,

  /// Number of parallel workers (default: number of CPUs, 0 means 1)
  #[arg(long)]
  pub parallel: Option<usize>,

  /// Clean the toolchain build cache before building
  #[arg(long)]
  pub clean_cache: bool,

  /// Compress artifacts: gzip or zstd
  #[arg(long)]
  pub compress: Option<String>,

  /// Write SHA-256/SHA-512 checksum files
  #[arg(
    long,
    default_value_t = true,
    action = ArgAction::Set,
    num_args = 0..=1,
    default_missing_value = "true"
  )]
  pub checksums: bool,

  /// Toolchain executable
  #[arg(long, env = "PBUILD_TOOLCHAIN", default_value = DEFAULT_PROGRAM)]
  pub toolchain: String,
}

impl BuildArgs {
  pub fn workers(&self) -> usize {
    self.parallel.unwrap_or_else(default_parallelism).max(1)
  }

  /// Compression method; unknown names are reported and ignored.
  pub fn compression(&self) -> Option<Compression> {
    let name = self.compress.as_deref().filter(|c| !c.trim().is_empty())?;
    let method = Compression::parse(name);
    if method.is_none() {
      print_warning(&format!("Unknown compression method '{}', artifacts will not be compressed", name));
    }
    method
  }

  pub fn build_config(&self) -> BuildConfig {
    BuildConfig {
      strategy: BuildStrategy::parse(&self.strategy),
      levels: FeatureLevels {
        amd64: self.amd64_level.clone(),
        arm64: self.arm64_level.clone(),
        arm: self.arm_level.clone(),
        mips: self.mips_level.clone(),
        ppc64: self.ppc64_level.clone(),
        riscv64: self.riscv_level.clone(),
      },
      build_mode: self.buildmode.clone(),
      tags: self.tags.clone(),
      ldflags: self.ldflags.clone(),
      build_flags: self.build_flags.clone(),
      verbose: self.verbose,
      clean_cache: self.clean_cache,
      ..BuildConfig::default()
    }
  }

  /// Raw flag snapshot for the metadata document.
  pub fn snapshot(&self) -> Result<serde_json::Value> {
    let mut flags = serde_json::to_value(self).context("Failed to serialize flags")?;
    if let Some(map) = flags.as_object_mut() {
      let parallel = self.parallel.unwrap_or_else(default_parallelism);
      map.insert("parallel".to_string(), parallel.into());
    }
    Ok(flags)
  }

  pub fn to_options(&self) -> Result<BuildOptions> {
    Ok(BuildOptions {
      target_dir: self.target_dir.clone(),
      all: self.all,
      targets: None,
      name: self.name.clone(),
      output_dir: self.output_dir.clone(),
      version_override: self.version.clone(),
      config: self.build_config(),
      skip_cleanup: self.skip_cleanup,
      stop_on_error: self.stop_on_error,
      parallelism: self.workers(),
      compression: self.compression(),
      checksums: self.checksums,
      flags: self.snapshot()?,
    })
  }
}

/// Execute the build command.
///
/// Target failures are reported in the summary table and do not change the
/// exit status; only setup failures are returned as errors.
pub fn cmd_build(args: &BuildArgs) -> Result<()> {
  let options = args.to_options()?;
  let toolchain = Arc::new(GoToolchain::new(args.toolchain.clone()));
  let observer = Arc::new(ConsoleObserver { args: args.clone() });

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(async {
      let cancel = CancellationToken::new();
      let on_signal = cancel.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupt received, cancelling build");
          on_signal.cancel();
        }
      });
      run(&options, toolchain, observer, cancel).await
    })
    .context("Build failed")?;

  print_report(&report);
  Ok(())
}

/// Prints progress as workers pick up and finish targets.
struct ConsoleObserver {
  args: BuildArgs,
}

impl ConsoleObserver {
  fn prefix(&self, worker: usize) -> String {
    if self.args.verbose && worker > 0 {
      format!("[Worker {}] ", worker)
    } else {
      String::new()
    }
  }

  fn print_config(&self, config: &BuildConfig, workers: usize) {
    let mut build = Table::new(["Build Config", "Value"]);
    build
      .row(["Strategy", config.strategy.as_str()])
      .row(["Build Mode", self.args.buildmode.as_str()]);
    for (label, value) in [
      ("Custom Tags", &self.args.tags),
      ("Custom LDFlags", &self.args.ldflags),
      ("Custom Build Flags", &self.args.build_flags),
    ] {
      if !value.is_empty() {
        build.row([label, value.as_str()]);
      }
    }
    if let Some(compress) = &self.args.compress {
      build.row(["Compression", compress.as_str()]);
    }

    let mut cpu = Table::new(["CPU Levels", "Value"]);
    let levels = &config.levels;
    cpu
      .row(["AMD64", levels.amd64.as_str()])
      .row(["ARM64", levels.arm64.as_str()])
      .row(["ARM", levels.arm.as_str()])
      .row(["MIPS", levels.mips.as_str()])
      .row(["PPC64", levels.ppc64.as_str()])
      .row(["RISC-V", levels.riscv64.as_str()]);

    let mut behavior = Table::new(["Behavior", "Value"]);
    behavior
      .row(["Parallel Workers".to_string(), workers.to_string()])
      .row(["Clean Cache".to_string(), config.clean_cache.to_string()])
      .row(["Skip Cleanup".to_string(), self.args.skip_cleanup.to_string()])
      .row(["Stop on Error".to_string(), self.args.stop_on_error.to_string()])
      .row(["Verbose".to_string(), self.args.verbose.to_string()])
      .row(["Generate Checksums".to_string(), self.args.checksums.to_string()]);

    for line in side_by_side(&[build, cpu, behavior]) {
      println!("{}", line);
    }
    println!();
  }
}

impl BuildObserver for ConsoleObserver {
  fn notify(&self, event: &BuildEvent) {
    match event {
      BuildEvent::Prepared {
        version,
        config,
        workers,
        ..
      } => {
        println!("Building version {}\n", version);
        self.print_config(config, *workers);
      }
      BuildEvent::StrategyEscalated { from, to } => {
        if self.args.verbose {
          print_warning(&format!(
            "PIE build mode requires native interop, switching from {} to {} strategy",
            from, to
          ));
        }
      }
      BuildEvent::TargetStarted {
        worker,
        target,
        output,
        command,
      } => {
        let mut line = format!(
          "{}Building for: {} {} {}",
          self.prefix(*worker),
          target,
          symbols::ARROW,
          output.display()
        );
        if self.args.verbose {
          line.push_str(&format!(
            "\n{}  {}",
            self.prefix(*worker),
            command.if_supports_color(Stream::Stdout, |s| s.dimmed())
          ));
        }
        println!("{}", line);
      }
      BuildEvent::TargetFinished { worker, result } => {
        let prefix = self.prefix(*worker);
        match result.status {
          BuildStatus::Success => println!(
            "{}  {} {} {}\n",
            prefix,
            symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
            result.target,
            result.file_name
          ),
          BuildStatus::Failed => println!(
            "{}  {} {} FAILED\n  {}\n",
            prefix,
            symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
            result.target,
            result.error.as_deref().unwrap_or_default()
          ),
          BuildStatus::Skipped => {
            if self.args.verbose {
              println!("{}  {} {} skipped", prefix, symbols::INFO, result.target);
            }
          }
        }
      }
    }
  }
}

fn status_symbol(status: BuildStatus) -> &'static str {
  match status {
    BuildStatus::Success => symbols::SUCCESS,
    BuildStatus::Failed => symbols::ERROR,
    BuildStatus::Skipped => symbols::INFO,
  }
}

fn print_report(report: &BuildReport) {
  println!(
    "\nArtifacts for {}, version {}\nstored in {}\n",
    report.project_name,
    report.version,
    report.version_dir.display()
  );

  let mut table = Table::new(["File", "Target", "Size", "SHA256", "Status"]);
  for result in &report.results {
    table.row([
      result.file_name.clone(),
      result.target.label(),
      result.size_display(),
      result.sha256_display().to_string(),
      status_symbol(result.status).to_string(),
    ]);
  }
  let lines = table.render_with(|column, cell| {
    if column != 4 {
      return cell.to_string();
    }
    match cell.trim_end() {
      symbols::SUCCESS => cell.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      symbols::ERROR => cell.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
      _ => cell.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    }
  });
  for line in lines {
    println!("{}", line);
  }

  println!();
  println!(
    "Build summary: Total: {}  Success: {}  Failed: {}\n",
    report.total(),
    report.success_count(),
    report.fail_count()
  );

  if report.is_success() {
    print_success(&format!("All {} target(s) built", report.total()));
  } else {
    print_error(&format!("{} of {} target(s) failed", report.fail_count(), report.total()));
  }
  print_stat("Duration", &humantime::format_duration(report.duration).to_string());

  match &report.metadata_path {
    Some(path) => print_info(&format!("Build metadata written to: {}", path.display())),
    None => print_warning("Build metadata was not written"),
  }
}
