//! The immutable configuration of one IPECMD invocation.
use std::path::PathBuf;

use crate::{
    error::{Error, Result},
    tool::{IpeVersion, MemoryRegion, Tool, Voltage},
};

/// Everything needed to program or detect a part.
///
/// When both `tool_path` and `version` are set, `tool_path` wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgrammingRequest {
    /// Target part, e.g. `PIC16F876A`
    pub part: String,
    pub tool: Tool,
    /// Firmware image, optional for detection
    pub file: Option<PathBuf>,
    pub voltage: Voltage,
    /// `None` programs the whole device
    pub memory: Option<MemoryRegion>,
    pub verify: Option<MemoryRegion>,
    pub erase: bool,
    /// Apply VDD before VPP
    pub vdd_first: bool,
    /// Release the part from reset when done
    pub logout: bool,
    pub tool_path: Option<PathBuf>,
    pub version: Option<IpeVersion>,
}

impl ProgrammingRequest {
    pub fn new(part: impl Into<String>, tool: Tool, voltage: Voltage) -> Self {
        ProgrammingRequest {
            part: part.into(),
            tool,
            file: None,
            voltage,
            memory: None,
            verify: None,
            erase: false,
            vdd_first: false,
            logout: false,
            tool_path: None,
            version: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_memory(mut self, region: MemoryRegion) -> Self {
        self.memory = Some(region);
        self
    }

    pub fn with_verify(mut self, region: MemoryRegion) -> Self {
        self.verify = Some(region);
        self
    }

    pub fn with_erase(mut self, erase: bool) -> Self {
        self.erase = erase;
        self
    }

    pub fn with_vdd_first(mut self, vdd_first: bool) -> Self {
        self.vdd_first = vdd_first;
        self
    }

    pub fn with_logout(mut self, logout: bool) -> Self {
        self.logout = logout;
        self
    }

    pub fn with_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(path.into());
        self
    }

    pub fn with_version(mut self, version: IpeVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Part name as IPECMD expects it, without the `PIC` prefix.
    pub fn ipecmd_part(&self) -> &str {
        let part = self.part.trim();
        match part.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("PIC") && part.len() > 3 => &part[3..],
            _ => part,
        }
    }

    /// Checks what the type system can't: the part name.
    pub fn validate(&self) -> Result<()> {
        let part = self.part.trim();
        if part.is_empty() {
            return Err(Error::InvalidRequest("part must not be empty".into()));
        }
        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::InvalidRequest(format!(
                "part {:?} contains invalid characters",
                part
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn request(part: &str) -> ProgrammingRequest {
        ProgrammingRequest::new(part, Tool::Pk3, Voltage::new(5.0).unwrap())
    }

    #[test_case("PIC16F876A", "16F876A")]
    #[test_case("pic18f4550", "18f4550")]
    #[test_case("dsPIC33FJ128GP802", "dsPIC33FJ128GP802")]
    #[test_case("16F877A", "16F877A")]
    #[test_case("PIC", "PIC")]
    fn part_prefix_is_stripped(part: &str, expected: &str) {
        assert_eq!(request(part).ipecmd_part(), expected);
    }

    #[test]
    fn validate_part() {
        assert!(request("PIC16F876A").validate().is_ok());
        assert!(request("  ").validate().is_err());
        assert!(request("PIC16F876A; rm -rf /").validate().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let req = request("PIC18F4550")
            .with_file("fw.hex")
            .with_memory(MemoryRegion::Program)
            .with_verify(MemoryRegion::Eeprom)
            .with_erase(true)
            .with_vdd_first(true)
            .with_logout(true)
            .with_version(IpeVersion::V6_20);
        assert_eq!(req.file, Some(PathBuf::from("fw.hex")));
        assert_eq!(req.memory, Some(MemoryRegion::Program));
        assert_eq!(req.verify, Some(MemoryRegion::Eeprom));
        assert!(req.erase && req.vdd_first && req.logout);
        assert_eq!(req.version, Some(IpeVersion::V6_20));
        assert_eq!(req.tool_path, None);
    }
}
