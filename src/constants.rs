use std::time::Duration;

/// Device erase/program cycles are slow, some parts take over a minute.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the runner polls a child for exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long pipe readers may lag behind the exited child.
pub const PIPE_GRACE: Duration = Duration::from_secs(1);

/// Number of output lines kept in a failure reason.
pub const FAILURE_TAIL_LINES: usize = 10;

#[cfg(windows)]
pub const EXECUTABLE_NAME: &str = "ipecmd.exe";
#[cfg(not(windows))]
pub const EXECUTABLE_NAME: &str = "ipecmd";

/// MPLAB X install roots, the first one is used for version paths.
#[cfg(windows)]
pub const INSTALL_ROOTS: &[&str] = &[
    "C:/Program Files/Microchip/MPLABX",
    "C:/Program Files (x86)/Microchip/MPLABX",
];
#[cfg(target_os = "macos")]
pub const INSTALL_ROOTS: &[&str] = &["/Applications/microchip/mplabx"];
#[cfg(not(any(windows, target_os = "macos")))]
pub const INSTALL_ROOTS: &[&str] = &["/opt/microchip/mplabx"];

/// Relative location of the executable inside a `v<version>` directory.
pub const IPE_SUBDIR: [&str; 2] = ["mplab_platform", "mplab_ipe"];

/// IPECMD command line flags
pub mod flags {
    pub const PART: &str = "-P";
    pub const TOOL: &str = "-TP";
    pub const FILE: &str = "-F";
    pub const MEMORY: &str = "-M";
    pub const POWER: &str = "-W";
    pub const ERASE: &str = "-E";
    pub const VERIFY: &str = "-Y";
    pub const VDD_FIRST: &str = "-OD";
    pub const LOGOUT: &str = "-OL";
    pub const DETECT_ONLY: &str = "-OK";
}

/// Intel HEX record layout
pub mod hex {
    pub const RECORD_MARK: char = ':';
    /// `:LLAAAATTCC`, an empty record.
    pub const MIN_RECORD_LEN: usize = 11;
}
