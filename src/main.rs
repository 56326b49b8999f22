use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use ipecmd_wrapper::{
    IpeVersion, Ipecmd, Locator, MemoryRegion, Outcome, ProgrammingRequest, Tool, Voltage,
};

#[derive(clap::Parser)]
#[command(
    name = "ipecmd-wrapper",
    version,
    about = "IPECMD wrapper for PIC programming",
    long_about = "Programs PIC microcontrollers through Microchip's IPECMD, \
                  shipped with MPLAB X IDE."
)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to find IPECMD
#[derive(clap::Args, Debug, Clone)]
struct IpecmdArgs {
    /// Full path to ipecmd (overrides --ipecmd-version)
    #[arg(long, env = "IPECMD_PATH")]
    ipecmd_path: Option<PathBuf>,

    /// MPLAB IPE version to use, latest installed if omitted
    #[arg(long, env = "IPECMD_VERSION")]
    ipecmd_version: Option<IpeVersion>,

    /// Give up on IPECMD after this many seconds
    #[arg(long, env = "IPECMD_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

/// Part and programmer selection
#[derive(clap::Args, Debug, Clone)]
struct TargetArgs {
    /// Part selection, e.g. PIC16F876A
    #[arg(short = 'P', long)]
    part: String,

    /// Tool selection
    #[arg(short = 'T', long, env = "IPECMD_TOOL", ignore_case = true)]
    tool: Tool,

    /// Power target from tool (VDD voltage)
    #[arg(short = 'W', long, env = "IPECMD_POWER")]
    power: Voltage,

    /// VDD first (default: VPP first)
    #[arg(long)]
    vdd_first: bool,

    /// Release from reset when done
    #[arg(long)]
    logout: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Program a HEX file into the part
    Program {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        ipecmd: IpecmdArgs,

        /// HEX file selection
        #[arg(short = 'F', long)]
        file: PathBuf,

        /// Program device memory region, whole device if omitted
        #[arg(short = 'M', long)]
        memory: Option<MemoryRegion>,

        /// Verify device memory region
        #[arg(short = 'Y', long)]
        verify: Option<MemoryRegion>,

        /// Erase flash device before programming
        #[arg(short = 'E', long)]
        erase: bool,

        /// Test programmer detection before programming
        #[arg(long)]
        test_programmer: bool,
    },
    /// Check that the programmer sees the part, writes nothing
    Detect {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        ipecmd: IpecmdArgs,
    },
    /// Run IPECMD with raw arguments, e.g. `raw -- -TPPK4 -P16F876A -OK`
    Raw {
        #[command(flatten)]
        ipecmd: IpecmdArgs,

        #[arg(last = true, required = true)]
        args: Vec<String>,
    },
    /// List supported MPLAB IPE versions and which are installed
    Versions,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => simplelog::LevelFilter::Warn,
        (false, 0) => simplelog::LevelFilter::Info,
        (false, 1) => simplelog::LevelFilter::Debug,
        (false, _) => simplelog::LevelFilter::Trace,
    };
    let _ = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let locator = Locator::default();

    let outcome = match cli.command {
        Commands::Program {
            target,
            ipecmd,
            file,
            memory,
            verify,
            erase,
            test_programmer,
        } => {
            log::info!("=== IPECMD WRAPPER ===");
            let Some(version) = pick_version(&locator, &ipecmd) else {
                return Ok(ExitCode::from(exit_code(&Outcome::ToolNotFound(vec![]))));
            };
            let mut request = target_request(&target, &ipecmd, version).with_file(&file);
            request.memory = memory;
            request.verify = verify;
            request.erase = erase;

            let wrapper = Ipecmd::new()?
                .with_locator(locator)
                .with_timeout(Duration::from_secs(ipecmd.timeout));

            match ipecmd_wrapper::format::summarize(&file) {
                Ok(summary) => log::info!(
                    "HEX file {}: {} bytes in {} records{}",
                    file.display(),
                    summary.data_bytes,
                    summary.records,
                    summary
                        .address_range
                        .map(|r| format!(" at {:#06x}..{:#06x}", r.start, r.end))
                        .unwrap_or_default()
                ),
                Err(e) => log::warn!("Could not parse {}: {}", file.display(), e),
            }

            log::info!("Make sure that:");
            log::info!("  - {} is connected via USB", request.tool.description());
            log::info!("  - {} is in the socket", request.part);
            log::info!(
                "  - the circuit will be powered by {} ({}V)",
                request.tool,
                request.voltage
            );

            let detected = if test_programmer {
                log::warn!("Testing programmer detection...");
                let outcome = with_spinner("Detecting programmer", || wrapper.detect(&request))?;
                if outcome.is_success() {
                    log::info!("Programmer detection successful");
                }
                outcome
            } else {
                Outcome::Success
            };

            let outcome = if detected.is_success() {
                log::warn!("Programming in progress...");
                with_spinner("Programming", || wrapper.program(&request))?
            } else {
                detected
            };
            if outcome.is_success() {
                log::info!("SUCCESS! {} programmed!", request.part);
            }
            report(&outcome, request.version);
            outcome
        }
        Commands::Detect { target, ipecmd } => {
            let Some(version) = pick_version(&locator, &ipecmd) else {
                return Ok(ExitCode::from(exit_code(&Outcome::ToolNotFound(vec![]))));
            };
            let request = target_request(&target, &ipecmd, version);
            let wrapper = Ipecmd::new()?
                .with_locator(locator)
                .with_timeout(Duration::from_secs(ipecmd.timeout));
            let outcome = with_spinner("Detecting programmer", || wrapper.detect(&request))?;
            report(&outcome, request.version);
            outcome
        }
        Commands::Raw { ipecmd, args } => {
            let Some(version) = pick_version(&locator, &ipecmd) else {
                return Ok(ExitCode::from(exit_code(&Outcome::ToolNotFound(vec![]))));
            };
            let wrapper = Ipecmd::new()?
                .with_locator(locator)
                .with_timeout(Duration::from_secs(ipecmd.timeout));
            let outcome = with_spinner("Running IPECMD", || {
                wrapper.run_raw(ipecmd.ipecmd_path.as_deref(), version, args)
            })?;
            report(&outcome, version);
            outcome
        }
        Commands::Versions => {
            let installed = locator.installed_versions();
            for version in IpeVersion::ALL {
                let mark = if installed.contains(&version) { "*" } else { " " };
                let path = locator
                    .find(version)
                    .or_else(|| locator.version_path(version))
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("{} {}  {}", mark, version, path);
            }
            Outcome::Success
        }
    };

    Ok(ExitCode::from(exit_code(&outcome)))
}

/// Version to resolve with. An explicit path takes none, its release is
/// unknown; otherwise the requested version, or the latest installed one.
fn pick_version(locator: &Locator, args: &IpecmdArgs) -> Option<Option<IpeVersion>> {
    if args.ipecmd_path.is_some() {
        if let Some(version) = args.ipecmd_version {
            log::debug!("Ignoring MPLAB IPE v{}, an explicit path was given", version);
        }
        return Some(None);
    }
    if let Some(version) = args.ipecmd_version {
        return Some(Some(version));
    }
    log::info!("Auto-detecting MPLAB X IDE version...");
    match locator.detect_latest() {
        Some(version) => {
            log::info!("Auto-detected MPLAB X v{}", version);
            Some(Some(version))
        }
        None => {
            log::error!("No MPLAB X IDE installation found");
            log::warn!("Install MPLAB X IDE or specify a custom path with --ipecmd-path");
            None
        }
    }
}

fn target_request(
    target: &TargetArgs,
    ipecmd: &IpecmdArgs,
    version: Option<IpeVersion>,
) -> ProgrammingRequest {
    let mut request = ProgrammingRequest::new(&target.part, target.tool, target.power)
        .with_vdd_first(target.vdd_first)
        .with_logout(target.logout);
    request.tool_path = ipecmd.ipecmd_path.clone();
    request.version = version;
    request
}

fn with_spinner<F: FnOnce() -> Outcome>(message: &'static str, f: F) -> Result<Outcome> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let outcome = f();
    spinner.finish_and_clear();
    Ok(outcome)
}

fn report(outcome: &Outcome, version: Option<IpeVersion>) {
    match outcome {
        Outcome::Success => log::info!("IPECMD finished successfully"),
        Outcome::ProgrammerNotFound => {
            log::error!("Programmer detection failed!");
            log::warn!("Check programmer connection and try again");
        }
        Outcome::ToolNotFound(_) => {
            log::error!("{}", outcome);
            match version {
                Some(v) => log::warn!(
                    "Install MPLAB X IDE v{} or use --ipecmd-path to specify a custom location",
                    v
                ),
                None => log::warn!("Check the provided --ipecmd-path"),
            }
        }
        Outcome::ProgrammingFailed(_) | Outcome::VerificationFailed(_) => {
            log::error!("{}", outcome);
            log::warn!("Check connections and power supply");
            for suggestion in version.map(|v| v.suggestions()).unwrap_or_default() {
                log::info!("You can also try with --ipecmd-version {}", suggestion);
            }
        }
        Outcome::TimeoutExceeded { output, .. } => {
            log::error!("{}", outcome);
            if !output.is_empty() {
                log::info!("Output so far:\n{}", output);
            }
        }
        Outcome::FileInvalid(_) | Outcome::InvalidRequest(_) => log::error!("{}", outcome),
    }
}

fn exit_code(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Success => 0,
        Outcome::InvalidRequest(_) => 2,
        Outcome::FileInvalid(_) => 3,
        Outcome::ToolNotFound(_) => 4,
        Outcome::ProgrammingFailed(_) => 5,
        Outcome::VerificationFailed(_) => 6,
        Outcome::ProgrammerNotFound => 7,
        Outcome::TimeoutExceeded { .. } => 8,
    }
}
