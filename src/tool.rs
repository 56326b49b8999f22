//! Closed sets accepted by IPECMD: programmer tools, MPLAB IPE versions,
//! memory regions and target voltage.
use std::{fmt, str::FromStr};

use clap::{ValueEnum, builder::PossibleValue};

use crate::error::Error;

/// Hardware programmer/debugger model
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    Pk3,
    Pk4,
    Pk5,
    Icd3,
    Icd4,
    Icd5,
    Ice4,
    Rice,
    Snap,
    Pm3,
    Pkob,
    Pkob4,
    J32,
}

impl Tool {
    pub const ALL: [Tool; 13] = [
        Tool::Pk3,
        Tool::Pk4,
        Tool::Pk5,
        Tool::Icd3,
        Tool::Icd4,
        Tool::Icd5,
        Tool::Ice4,
        Tool::Rice,
        Tool::Snap,
        Tool::Pm3,
        Tool::Pkob,
        Tool::Pkob4,
        Tool::J32,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Tool::Pk3 => "PK3",
            Tool::Pk4 => "PK4",
            Tool::Pk5 => "PK5",
            Tool::Icd3 => "ICD3",
            Tool::Icd4 => "ICD4",
            Tool::Icd5 => "ICD5",
            Tool::Ice4 => "ICE4",
            Tool::Rice => "RICE",
            Tool::Snap => "SNAP",
            Tool::Pm3 => "PM3",
            Tool::Pkob => "PKOB",
            Tool::Pkob4 => "PKOB4",
            Tool::J32 => "J32",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Tool::Pk3 => "PICkit 3",
            Tool::Pk4 => "PICkit 4",
            Tool::Pk5 => "PICkit 5",
            Tool::Icd3 => "MPLAB ICD 3",
            Tool::Icd4 => "MPLAB ICD 4",
            Tool::Icd5 => "MPLAB ICD 5",
            Tool::Ice4 => "MPLAB ICE 4",
            Tool::Rice => "MPLAB REAL ICE",
            Tool::Snap => "MPLAB Snap",
            Tool::Pm3 => "MPLAB PM3",
            Tool::Pkob => "PICkit On Board",
            Tool::Pkob4 => "PICkit 4 On Board",
            Tool::J32 => "Segger J-Link",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::InvalidRequest(format!("unknown tool {:?}", s)))
    }
}

impl ValueEnum for Tool {
    fn value_variants<'a>() -> &'a [Self] {
        &Tool::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.name()).help(self.description()))
    }
}

/// MPLAB X IDE / IPE release
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpeVersion {
    V5_50,
    V6_00,
    V6_05,
    V6_10,
    V6_15,
    V6_20,
    V6_25,
}

impl IpeVersion {
    /// Known releases, oldest first.
    pub const ALL: [IpeVersion; 7] = [
        IpeVersion::V5_50,
        IpeVersion::V6_00,
        IpeVersion::V6_05,
        IpeVersion::V6_10,
        IpeVersion::V6_15,
        IpeVersion::V6_20,
        IpeVersion::V6_25,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            IpeVersion::V5_50 => "5.50",
            IpeVersion::V6_00 => "6.00",
            IpeVersion::V6_05 => "6.05",
            IpeVersion::V6_10 => "6.10",
            IpeVersion::V6_15 => "6.15",
            IpeVersion::V6_20 => "6.20",
            IpeVersion::V6_25 => "6.25",
        }
    }

    pub fn latest() -> IpeVersion {
        IpeVersion::ALL[IpeVersion::ALL.len() - 1]
    }

    /// Install directory name, `v6.20`
    pub fn dir_name(&self) -> String {
        format!("v{}", self.as_str())
    }

    /// Other releases worth trying when this one fails: the latest, then
    /// the neighbours. At most two.
    pub fn suggestions(&self) -> Vec<IpeVersion> {
        let all = &IpeVersion::ALL;
        let idx = all.iter().position(|v| v == self).unwrap_or_default();

        let mut out = vec![];
        let latest = IpeVersion::latest();
        if *self != latest {
            out.push(latest);
        }
        if idx > 0 && !out.contains(&all[idx - 1]) {
            out.push(all[idx - 1]);
        }
        if idx + 1 < all.len() && !out.contains(&all[idx + 1]) {
            out.push(all[idx + 1]);
        }
        out.truncate(2);
        out
    }
}

impl fmt::Display for IpeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IpeVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
        IpeVersion::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| Error::InvalidRequest(format!("unsupported MPLAB IPE version {:?}", s)))
    }
}

impl ValueEnum for IpeVersion {
    fn value_variants<'a>() -> &'a [Self] {
        &IpeVersion::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        let alias = match self {
            IpeVersion::V5_50 => "v5.50",
            IpeVersion::V6_00 => "v6.00",
            IpeVersion::V6_05 => "v6.05",
            IpeVersion::V6_10 => "v6.10",
            IpeVersion::V6_15 => "v6.15",
            IpeVersion::V6_20 => "v6.20",
            IpeVersion::V6_25 => "v6.25",
        };
        Some(PossibleValue::new(self.as_str()).alias(alias))
    }
}

/// Device memory area selected by `-M` and `-Y`
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryRegion {
    Program,
    Eeprom,
    Id,
    Configuration,
    Boot,
    Auxiliary,
}

impl MemoryRegion {
    pub const ALL: [MemoryRegion; 6] = [
        MemoryRegion::Program,
        MemoryRegion::Eeprom,
        MemoryRegion::Id,
        MemoryRegion::Configuration,
        MemoryRegion::Boot,
        MemoryRegion::Auxiliary,
    ];

    pub const fn code(&self) -> char {
        match self {
            MemoryRegion::Program => 'P',
            MemoryRegion::Eeprom => 'E',
            MemoryRegion::Id => 'I',
            MemoryRegion::Configuration => 'C',
            MemoryRegion::Boot => 'B',
            MemoryRegion::Auxiliary => 'A',
        }
    }

    const fn description(&self) -> &'static str {
        match self {
            MemoryRegion::Program => "Program memory",
            MemoryRegion::Eeprom => "EEPROM",
            MemoryRegion::Id => "ID memory",
            MemoryRegion::Configuration => "Configuration memory",
            MemoryRegion::Boot => "Boot flash",
            MemoryRegion::Auxiliary => "Auxiliary memory",
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for MemoryRegion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => MemoryRegion::ALL
                .iter()
                .find(|r| r.code() == c.to_ascii_uppercase())
                .copied()
                .ok_or_else(|| Error::InvalidRequest(format!("unknown memory region {:?}", s))),
            _ => Err(Error::InvalidRequest(format!(
                "memory region must be a single letter, got {:?}",
                s
            ))),
        }
    }
}

impl ValueEnum for MemoryRegion {
    fn value_variants<'a>() -> &'a [Self] {
        &MemoryRegion::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        let (code, lower) = match self {
            MemoryRegion::Program => ("P", "p"),
            MemoryRegion::Eeprom => ("E", "e"),
            MemoryRegion::Id => ("I", "i"),
            MemoryRegion::Configuration => ("C", "c"),
            MemoryRegion::Boot => ("B", "b"),
            MemoryRegion::Auxiliary => ("A", "a"),
        };
        Some(
            PossibleValue::new(code)
                .alias(lower)
                .help(self.description()),
        )
    }
}

/// Target VDD supplied by the tool, in volts
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Voltage(f64);

impl Voltage {
    pub const MAX: f64 = 5.5;

    pub fn new(volts: f64) -> Result<Self, Error> {
        if !volts.is_finite() || volts <= 0.0 || volts > Self::MAX {
            return Err(Error::InvalidRequest(format!(
                "voltage {} out of range (0, {}]",
                volts,
                Self::MAX
            )));
        }
        Ok(Voltage(volts))
    }

    pub fn volts(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPECMD wants a decimal point: 5.0, not 5
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Voltage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix(['V', 'v']).unwrap_or(s);
        let volts: f64 = s
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("invalid voltage {:?}", s)))?;
        Voltage::new(volts)
    }
}
