//! Program and detect flows on top of IPECMD.

use std::{path::Path, time::Duration};

use crate::{
    command::{self, CommandLine, Mode},
    constants::DEFAULT_TIMEOUT,
    error::{Error, FileInvalidReason, Result},
    format,
    locate::{Locator, ResolvedToolPath},
    outcome::{MarkerTable, Outcome},
    request::ProgrammingRequest,
    runner::{ProcessRunner, Runner},
    tool::IpeVersion,
};

/// Entry point for callers. Holds no per-call state; every call validates,
/// resolves and runs from scratch.
pub struct Ipecmd<R: Runner = ProcessRunner> {
    runner: R,
    locator: Locator,
    markers: MarkerTable,
    timeout: Duration,
}

impl Ipecmd<ProcessRunner> {
    pub fn new() -> Result<Self> {
        Self::with_runner(ProcessRunner)
    }
}

impl<R: Runner> Ipecmd<R> {
    pub fn with_runner(runner: R) -> Result<Self> {
        Ok(Ipecmd {
            runner,
            locator: Locator::default(),
            markers: MarkerTable::load()?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate the image, resolve IPECMD, then program the part.
    pub fn program(&self, request: &ProgrammingRequest) -> Outcome {
        self.try_program(request).unwrap_or_else(Outcome::from)
    }

    /// Check the programmer can see the part. Never needs or passes a file.
    pub fn detect(&self, request: &ProgrammingRequest) -> Outcome {
        self.try_detect(request).unwrap_or_else(Outcome::from)
    }

    /// Run IPECMD with caller-supplied arguments, classified like a
    /// program run.
    pub fn run_raw(
        &self,
        tool_path: Option<&Path>,
        version: Option<IpeVersion>,
        args: Vec<String>,
    ) -> Outcome {
        self.try_run_raw(tool_path, version, args)
            .unwrap_or_else(Outcome::from)
    }

    /// Where IPECMD would be taken from for this request.
    pub fn resolve(&self, request: &ProgrammingRequest) -> Result<ResolvedToolPath> {
        self.locator
            .resolve(request.tool_path.as_deref(), request.version)
    }

    fn try_program(&self, request: &ProgrammingRequest) -> Result<Outcome> {
        request.validate()?;
        let file = request.file.as_deref().ok_or_else(|| Error::FileInvalid {
            path: Default::default(),
            reason: FileInvalidReason::NotGiven,
        })?;
        // IPECMD gets the path as text, it must not be altered on the way
        if file.to_str().is_none() {
            return Err(Error::InvalidRequest(format!(
                "HEX file path {} is not valid UTF-8",
                file.display()
            )));
        }
        format::validate_hex_file(file)?;

        let tool = self.resolve(request)?;
        log::debug!("Using IPECMD {} ({})", tool.path.display(), tool.origin);
        let cmd = command::build(request, &tool, Mode::Program);
        self.execute(&cmd, Mode::Program, tool.origin.version())
    }

    fn try_detect(&self, request: &ProgrammingRequest) -> Result<Outcome> {
        request.validate()?;
        let tool = self.resolve(request)?;
        let cmd = command::build(request, &tool, Mode::DetectOnly);
        self.execute(&cmd, Mode::DetectOnly, tool.origin.version())
    }

    fn try_run_raw(
        &self,
        tool_path: Option<&Path>,
        version: Option<IpeVersion>,
        args: Vec<String>,
    ) -> Result<Outcome> {
        let tool = self.locator.resolve(tool_path, version)?;
        let cmd = CommandLine::new(tool.path, args);
        self.execute(&cmd, Mode::Program, tool.origin.version())
    }

    /// `version` is only known when IPECMD was resolved from it; an explicit
    /// path is classified with every marker.
    fn execute(&self, cmd: &CommandLine, mode: Mode, version: Option<IpeVersion>) -> Result<Outcome> {
        let result = self.runner.run(cmd, self.timeout)?;
        let outcome = self.markers.for_version(version).interpret(&result, mode);
        log::debug!("{:?} outcome: {:?}", mode, outcome);
        Ok(outcome)
    }
}
