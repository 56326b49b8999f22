//! Program/detect flows driven through the public API with a scripted runner.

use std::{
    cell::{Cell, RefCell},
    fs,
    path::PathBuf,
    time::Duration,
};

use ipecmd_wrapper::{
    CommandLine, InvocationResult, IpeVersion, Ipecmd, Locator, MemoryRegion, Outcome,
    ProgrammingRequest, Runner, Tool, Voltage,
};
use pretty_assertions::assert_eq;

const GOOD_HEX: &str = "\
:020000040000FA
:100000000C2886010030860003138316003085001B
:00000001FF
";

/// Answers every run with a fixed exit code and output, and counts calls.
struct Scripted {
    exit_code: i32,
    stdout: &'static str,
    stderr: &'static str,
    calls: Cell<usize>,
    last_args: RefCell<Vec<String>>,
}

impl Scripted {
    fn new(exit_code: i32, stdout: &'static str, stderr: &'static str) -> Self {
        Scripted {
            exit_code,
            stdout,
            stderr,
            calls: Cell::new(0),
            last_args: Default::default(),
        }
    }
}

impl Runner for Scripted {
    fn run(
        &self,
        cmd: &CommandLine,
        _timeout: Duration,
    ) -> ipecmd_wrapper::error::Result<InvocationResult> {
        self.calls.set(self.calls.get() + 1);
        *self.last_args.borrow_mut() = cmd.args.clone();
        Ok(InvocationResult {
            exit_code: self.exit_code,
            stdout: self.stdout.to_string(),
            stderr: self.stderr.to_string(),
            duration: Duration::from_millis(1),
        })
    }
}

struct Bench {
    dir: tempfile::TempDir,
    ipecmd: PathBuf,
}

impl Bench {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ipecmd = dir.path().join("ipecmd");
        fs::write(&ipecmd, b"#!/bin/sh\n").unwrap();
        fs::write(dir.path().join("good.hex"), GOOD_HEX).unwrap();
        Bench { dir, ipecmd }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn request(&self, file: &str) -> ProgrammingRequest {
        ProgrammingRequest::new("PIC16F876A", Tool::Pk3, Voltage::new(5.0).unwrap())
            .with_file(self.path(file))
            .with_erase(true)
            .with_verify(MemoryRegion::Program)
            .with_tool_path(&self.ipecmd)
    }
}

fn wrapper(runner: &Scripted) -> Ipecmd<&Scripted> {
    Ipecmd::with_runner(runner).unwrap()
}

#[test]
fn scenario_a_program_success() {
    let bench = Bench::new();
    let runner = Scripted::new(0, "Programming...\nProgram Succeeded.\n", "");
    let outcome = wrapper(&runner).program(&bench.request("good.hex"));

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(runner.calls.get(), 1);
    assert_eq!(
        *runner.last_args.borrow(),
        vec![
            "-P16F876A".to_string(),
            "-TPPK3".to_string(),
            format!("-F{}", bench.path("good.hex").display()),
            "-M".to_string(),
            "-W5.0".to_string(),
            "-E".to_string(),
            "-YP".to_string(),
        ]
    );
}

#[test]
fn scenario_b_verification_failed() {
    let bench = Bench::new();
    let runner = Scripted::new(1, "Programming...\n", "Verification failed\n");
    let outcome = wrapper(&runner).program(&bench.request("good.hex"));

    assert!(
        matches!(outcome, Outcome::VerificationFailed(ref reason) if reason == "Verification failed"),
        "{:?}",
        outcome
    );
    assert_eq!(runner.calls.get(), 1);
}

#[test]
fn scenario_c_missing_file_never_spawns() {
    let bench = Bench::new();
    let runner = Scripted::new(0, "", "");
    let outcome = wrapper(&runner).program(&bench.request("missing.hex"));

    assert!(matches!(outcome, Outcome::FileInvalid(_)), "{:?}", outcome);
    assert_eq!(runner.calls.get(), 0);
}

#[test]
fn scenario_d_missing_tool_never_spawns() {
    let bench = Bench::new();
    let runner = Scripted::new(0, "", "");
    let missing = bench.path("no-such-dir").join("ipecmd");
    let request = bench
        .request("good.hex")
        .with_tool_path(&missing)
        .with_version(IpeVersion::V6_20);
    let outcome = wrapper(&runner).program(&request);

    assert_eq!(outcome, Outcome::ToolNotFound(vec![missing]));
    assert_eq!(runner.calls.get(), 0);
}

#[test]
fn zero_byte_hex_never_spawns() {
    let bench = Bench::new();
    fs::write(bench.path("empty.hex"), b"").unwrap();
    let runner = Scripted::new(0, "", "");
    let outcome = wrapper(&runner).program(&bench.request("empty.hex"));

    assert!(matches!(outcome, Outcome::FileInvalid(_)), "{:?}", outcome);
    assert_eq!(runner.calls.get(), 0);
}

#[test]
fn programmer_not_found_wins_over_verify() {
    let bench = Bench::new();
    let runner = Scripted::new(1, "Verification failed", "Programmer not found");
    let outcome = wrapper(&runner).program(&bench.request("good.hex"));
    assert_eq!(outcome, Outcome::ProgrammerNotFound);
}

#[test]
fn detect_needs_no_file() {
    let bench = Bench::new();
    let runner = Scripted::new(0, "", "");
    let outcome = wrapper(&runner).detect(&bench.request("missing.hex"));

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(
        *runner.last_args.borrow(),
        vec!["-P16F876A", "-TPPK3", "-W5.0", "-OK"]
    );
}

#[test]
fn version_without_install_is_tool_not_found() {
    let bench = Bench::new();
    let roots = bench.path("mplabx");
    let runner = Scripted::new(0, "", "");
    let wrapper = wrapper(&runner).with_locator(Locator::with_roots([&roots]));

    let mut request = bench.request("good.hex");
    request.tool_path = None;
    request.version = Some(IpeVersion::V6_25);

    let expected = wrapper.locator().version_path(IpeVersion::V6_25).unwrap();
    assert!(expected.starts_with(&roots));
    assert_eq!(wrapper.program(&request), Outcome::ToolNotFound(vec![expected]));
    assert_eq!(runner.calls.get(), 0);
}

#[cfg(unix)]
#[test]
fn real_process_exit_codes_are_classified() {
    // /bin/sh stands in for IPECMD
    let wrapper = Ipecmd::new().unwrap();
    let sh = std::path::Path::new("/bin/sh");

    let ok = wrapper.run_raw(Some(sh), None, vec!["-c".into(), "echo Program Succeeded".into()]);
    assert_eq!(ok, Outcome::Success);

    let verify = wrapper.run_raw(
        Some(sh),
        None,
        vec!["-c".into(), "echo 'Verify failed at 0x10' >&2; exit 1".into()],
    );
    assert_eq!(verify, Outcome::VerificationFailed("Verify failed at 0x10".into()));

    let other = wrapper.run_raw(Some(sh), None, vec!["-c".into(), "exit 9".into()]);
    assert_eq!(
        other,
        Outcome::ProgrammingFailed("IPECMD exited with code 9".into())
    );
}
