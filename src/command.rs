//! IPECMD argument vectors.

use std::{ffi::OsStr, fmt, path::PathBuf};

use crate::{constants::flags, locate::ResolvedToolPath, request::ProgrammingRequest};

/// What an invocation is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Erase/program/verify with a firmware image
    Program,
    /// Only check that the tool sees the part, writes nothing
    DetectOnly,
}

/// Executable plus discrete argument tokens, never joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        CommandLine {
            program: program.into(),
            args,
        }
    }

    pub fn args_os(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsStr::new)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Build the IPECMD invocation for a validated request.
///
/// Token order: part, tool, file, memory, power, erase, verify, VDD-first,
/// logout, detect. Boolean options are only emitted when set; IPECMD has
/// no "off" form. Overlapping memory and verify regions are both passed.
pub fn build(request: &ProgrammingRequest, tool: &ResolvedToolPath, mode: Mode) -> CommandLine {
    let mut args = Vec::with_capacity(10);

    args.push(format!("{}{}", flags::PART, request.ipecmd_part()));
    args.push(format!("{}{}", flags::TOOL, request.tool.name()));

    if mode == Mode::Program {
        if let Some(file) = &request.file {
            args.push(format!("{}{}", flags::FILE, file.display()));
        }
        // bare -M programs the entire device
        match request.memory {
            Some(region) => args.push(format!("{}{}", flags::MEMORY, region.code())),
            None => args.push(flags::MEMORY.to_string()),
        }
    }

    args.push(format!("{}{}", flags::POWER, request.voltage));

    if mode == Mode::Program {
        if request.erase {
            args.push(flags::ERASE.to_string());
        }
        if let Some(region) = request.verify {
            args.push(format!("{}{}", flags::VERIFY, region.code()));
        }
    }

    if request.vdd_first {
        args.push(flags::VDD_FIRST.to_string());
    }
    if request.logout {
        args.push(flags::LOGOUT.to_string());
    }

    if mode == Mode::DetectOnly {
        args.push(flags::DETECT_ONLY.to_string());
    }

    let cmd = CommandLine::new(&tool.path, args);
    log::debug!("IPECMD command ({:?}): {}", mode, cmd);
    cmd
}
