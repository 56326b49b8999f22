//! Classifying IPECMD runs.
use std::{fmt, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
    command::Mode,
    constants::FAILURE_TAIL_LINES,
    error::{Error, Result},
    runner::InvocationResult,
    tool::IpeVersion,
};

/// Terminal result of a program/detect call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// IPECMD failed, carries the tail of its output
    ProgrammingFailed(String),
    /// Carries the line that reported the failure
    VerificationFailed(String),
    ProgrammerNotFound,
    /// Locations that were checked
    ToolNotFound(Vec<PathBuf>),
    FileInvalid(String),
    TimeoutExceeded { after: Duration, output: String },
    InvalidRequest(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::ProgrammingFailed(reason) => write!(f, "programming failed: {}", reason),
            Outcome::VerificationFailed(reason) => write!(f, "verification failed: {}", reason),
            Outcome::ProgrammerNotFound => write!(f, "programmer not found"),
            Outcome::ToolNotFound(searched) if searched.is_empty() => {
                write!(f, "IPECMD not found: neither a path nor a version was given")
            }
            Outcome::ToolNotFound(searched) => {
                write!(f, "IPECMD not found at ")?;
                for (i, path) in searched.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Outcome::FileInvalid(reason) => write!(f, "invalid HEX file: {}", reason),
            Outcome::TimeoutExceeded { after, .. } => {
                write!(f, "IPECMD timed out after {:?}", after)
            }
            Outcome::InvalidRequest(reason) => write!(f, "invalid request: {}", reason),
        }
    }
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        match err {
            Error::FileInvalid { path, reason } if path.as_os_str().is_empty() => {
                Outcome::FileInvalid(reason.to_string())
            }
            Error::FileInvalid { path, reason } => {
                Outcome::FileInvalid(format!("{}: {}", path.display(), reason))
            }
            Error::ToolNotFound { searched } => Outcome::ToolNotFound(searched),
            Error::TimeoutExceeded {
                after,
                stdout,
                stderr,
            } => Outcome::TimeoutExceeded {
                after,
                output: join_output(&stdout, &stderr),
            },
            Error::InvalidRequest(reason) => Outcome::InvalidRequest(reason),
            Error::MarkerTable(_) | Error::Io(_) => Outcome::ProgrammingFailed(err.to_string()),
        }
    }
}

/// What a marker phrase indicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    ProgrammerNotFound,
    VerificationFailed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub pattern: String,
    /// Empty means every version
    #[serde(default, deserialize_with = "parse_versions")]
    pub versions: Vec<IpeVersion>,
}

impl Marker {
    fn applies_to(&self, version: Option<IpeVersion>) -> bool {
        match version {
            Some(v) if !self.versions.is_empty() => self.versions.contains(&v),
            _ => true,
        }
    }
}

/// Substring patterns that classify IPECMD output.
///
/// IPECMD's wording changes between releases, so the phrases live in
/// `markers/ipecmd.yaml` instead of in code.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    markers: Vec<Marker>,
}

#[derive(Deserialize)]
struct MarkerFile {
    markers: Vec<Marker>,
}

impl MarkerTable {
    /// The table shipped with the crate.
    pub fn load() -> Result<Self> {
        Self::from_yaml(include_str!("../markers/ipecmd.yaml"))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: MarkerFile = serde_yaml::from_str(yaml)?;
        let markers = file
            .markers
            .into_iter()
            .map(|mut m| {
                m.pattern = m.pattern.to_lowercase();
                m
            })
            .filter(|m| !m.pattern.is_empty())
            .collect();
        Ok(MarkerTable { markers })
    }

    /// Only the entries that apply to `version`; unknown version keeps all.
    pub fn for_version(&self, version: Option<IpeVersion>) -> MarkerTable {
        MarkerTable {
            markers: self
                .markers
                .iter()
                .filter(|m| m.applies_to(version))
                .cloned()
                .collect(),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Classify a finished run. First match wins:
    ///
    /// 1. non-zero exit and a programmer-not-found phrase
    /// 2. non-zero exit and a verification-failed phrase
    /// 3. any other non-zero exit
    /// 4. zero exit is success, whatever warnings were printed
    pub fn interpret(&self, result: &InvocationResult, mode: Mode) -> Outcome {
        if result.success() {
            log::debug!("{:?} succeeded in {:?}", mode, result.duration);
            return Outcome::Success;
        }

        let output = join_output(&result.stdout, &result.stderr);
        let haystack = output.to_lowercase();

        if let Some(m) = self.find(MarkerKind::ProgrammerNotFound, &haystack) {
            log::debug!("Matched {:?} marker {:?}", m.kind, m.pattern);
            return Outcome::ProgrammerNotFound;
        }
        if let Some(m) = self.find(MarkerKind::VerificationFailed, &haystack) {
            log::debug!("Matched {:?} marker {:?}", m.kind, m.pattern);
            let context = output
                .lines()
                .find(|line| line.to_lowercase().contains(&m.pattern))
                .map(|line| line.trim().to_string())
                .unwrap_or_else(|| m.pattern.clone());
            return Outcome::VerificationFailed(context);
        }

        let what = match mode {
            Mode::Program => "IPECMD",
            Mode::DetectOnly => "programmer detection",
        };
        let source = if result.stderr.trim().is_empty() {
            &result.stdout
        } else {
            &result.stderr
        };
        let tail = tail_lines(source, FAILURE_TAIL_LINES);
        if tail.is_empty() {
            Outcome::ProgrammingFailed(format!("{} exited with code {}", what, result.exit_code))
        } else {
            Outcome::ProgrammingFailed(format!(
                "{} exited with code {}: {}",
                what, result.exit_code, tail
            ))
        }
    }

    fn find(&self, kind: MarkerKind, haystack: &str) -> Option<&Marker> {
        self.markers
            .iter()
            .filter(|m| m.kind == kind)
            .find(|m| haystack.contains(&m.pattern))
    }
}

fn join_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        (true, _) => stderr.trim_end().to_string(),
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

fn parse_versions<'de, D>(deserializer: D) -> std::result::Result<Vec<IpeVersion>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = serde::Deserialize::deserialize(deserializer)?;
    raw.iter()
        .map(|v| v.parse::<IpeVersion>().map_err(serde::de::Error::custom))
        .collect()
}
