//! Wrapper around Microchip's IPECMD for programming PIC MCUs.

pub mod command;
pub mod constants;
pub mod error;
pub mod format;
pub mod ipecmd;
pub mod locate;
pub mod outcome;
pub mod request;
pub mod runner;
pub mod tool;

pub use self::command::{CommandLine, Mode};
pub use self::error::{Error, FileInvalidReason};
pub use self::ipecmd::Ipecmd;
pub use self::locate::{Locator, ResolvedToolPath, ToolOrigin};
pub use self::outcome::{MarkerTable, Outcome};
pub use self::request::ProgrammingRequest;
pub use self::runner::{InvocationResult, ProcessRunner, Runner};
pub use self::tool::{IpeVersion, MemoryRegion, Tool, Voltage};
