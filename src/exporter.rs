//! Exporter invocation
//!
//! Runs `tsci export` as a blocking subprocess to turn a tscircuit project into
//! a circuit document. Process spawning sits behind [`CommandRunner`] so the
//! pipelines can be exercised without the real tool installed.

use crate::circuit::CircuitDocument;
use crate::error::{FabError, Result, ResultExt};
use crate::temp::TempArtifact;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Exit status of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn failure(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Runs a program to completion with inherited stdout/stderr
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandStatus>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandStatus> {
        // "npx tsci" style overrides carry their own leading arguments
        let mut parts = program.split_whitespace();
        let executable = parts.next().unwrap_or(program);

        let status = Command::new(executable)
            .args(parts)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

/// Intermediate formats `tsci export` can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    CircuitJson,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::CircuitJson => "circuit-json",
        }
    }
}

/// Prefix and extension of the temp file the exporter writes into
const TEMP_PREFIX: &str = "temp";
const TEMP_EXT: &str = "circuit.json";

/// Wrapper around the external export tool
pub struct Exporter<R: CommandRunner> {
    runner: R,
    program: String,
}

impl Exporter<SystemCommandRunner> {
    pub fn system(program: impl Into<String>) -> Self {
        Self::new(SystemCommandRunner, program)
    }
}

impl<R: CommandRunner> Exporter<R> {
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Export `project` into `output`.
    ///
    /// The project must exist; any non-zero exit is [`FabError::ExportFailed`].
    pub fn run_export(&self, project: &Path, format: ExportFormat, output: &Path) -> Result<()> {
        ensure_project(project)?;
        self.spawn_export(project, format, output)
    }

    fn spawn_export(&self, project: &Path, format: ExportFormat, output: &Path) -> Result<()> {
        let args: Vec<OsString> = vec![
            "export".into(),
            project.as_os_str().to_owned(),
            "-f".into(),
            format.as_str().into(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ];

        info!(
            "Running {} export {} -f {} -o {}",
            self.program,
            project.display(),
            format.as_str(),
            output.display()
        );

        let status = self
            .runner
            .run(&self.program, &args)
            .map_err(|e| FabError::ExportFailed {
                project: project.display().to_string(),
                reason: format!("could not launch '{}': {}", self.program, e),
            })?;

        if !status.is_success() {
            return Err(FabError::ExportFailed {
                project: project.display().to_string(),
                reason: format!("'{}' finished with {}", self.program, status),
            }
            .into());
        }

        Ok(())
    }

    /// Export `project` through a temp file in `work_dir` and parse the result.
    ///
    /// The temp file is gone when this returns, whatever the outcome. A missing
    /// project fails before the temp file is created.
    pub fn load_circuit_document(&self, project: &Path, work_dir: &Path) -> Result<CircuitDocument> {
        ensure_project(project)?;
        println!("Processing tscircuit file: {}", project.display());

        let temp = TempArtifact::acquire(work_dir, TEMP_PREFIX, TEMP_EXT)?;
        self.spawn_export(project, ExportFormat::CircuitJson, temp.path())?;

        let document = CircuitDocument::from_file(temp.path())
            .with_path_context("read exported circuit JSON", temp.path())?;

        if let Err(e) = temp.release() {
            warn!("Failed to remove temp file: {}", e);
        }

        Ok(document)
    }
}

fn ensure_project(project: &Path) -> Result<()> {
    if project.is_file() {
        Ok(())
    } else {
        Err(FabError::NotFound {
            path: project.display().to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records invocations and optionally writes a document to the `-o` path
    struct RecordingRunner {
        calls: RefCell<Vec<(String, Vec<OsString>)>>,
        exit_code: i32,
        document: Option<&'static str>,
    }

    impl RecordingRunner {
        fn new(exit_code: i32, document: Option<&'static str>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                exit_code,
                document,
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandStatus> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));
            if let Some(document) = self.document {
                std::fs::write(args.last().unwrap(), document)?;
            }
            Ok(CommandStatus {
                code: Some(self.exit_code),
            })
        }
    }

    fn project(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("index.tsx");
        std::fs::write(&path, "export default () => <board />").unwrap();
        path
    }

    #[test]
    fn test_export_arguments() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir);
        let output = dir.path().join("out.json");
        let exporter = Exporter::new(RecordingRunner::new(0, None), "tsci");

        exporter
            .run_export(&project, ExportFormat::CircuitJson, &output)
            .unwrap();

        let calls = exporter.runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "tsci");
        let args: Vec<String> = calls[0]
            .1
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "export");
        assert_eq!(args[2..5], ["-f", "circuit-json", "-o"]);
        assert_eq!(args[1], project.display().to_string());
    }

    #[test]
    fn test_missing_project_is_not_found() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(RecordingRunner::new(0, None), "tsci");

        let err = exporter
            .run_export(
                &dir.path().join("missing.tsx"),
                ExportFormat::CircuitJson,
                &dir.path().join("out.json"),
            )
            .unwrap_err();

        assert!(matches!(classify(&err), Some(FabError::NotFound { .. })));
        assert!(exporter.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_load_missing_project_creates_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(RecordingRunner::new(0, None), "tsci");

        let err = exporter
            .load_circuit_document(&dir.path().join("missing.tsx"), dir.path())
            .unwrap_err();

        assert!(matches!(classify(&err), Some(FabError::NotFound { .. })));
        assert!(exporter.runner.calls.borrow().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_non_zero_exit_is_export_failed() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir);
        let exporter = Exporter::new(RecordingRunner::new(2, None), "tsci");

        let err = exporter
            .run_export(&project, ExportFormat::CircuitJson, &dir.path().join("o.json"))
            .unwrap_err();

        assert!(matches!(classify(&err), Some(FabError::ExportFailed { .. })));
        assert!(err.to_string().contains("exit status 2"));
    }

    #[test]
    fn test_load_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir);
        let exporter = Exporter::new(
            RecordingRunner::new(0, Some(r#"[{"type":"pcb_board","width":10,"height":10}]"#)),
            "tsci",
        );

        let document = exporter.load_circuit_document(&project, dir.path()).unwrap();
        assert_eq!(document.elements_of("pcb_board").count(), 1);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_load_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir);
        let exporter = Exporter::new(RecordingRunner::new(1, None), "tsci");

        assert!(exporter.load_circuit_document(&project, dir.path()).is_err());

        let temp_path = exporter.runner.calls.borrow()[0].1.last().unwrap().clone();
        assert!(!Path::new(&temp_path).exists());
    }

    #[test]
    fn test_launch_failure_is_export_failed() {
        let dir = TempDir::new().unwrap();
        let project = project(&dir);
        let exporter = Exporter::system("definitely-not-a-real-exporter-binary");

        let err = exporter
            .run_export(&project, ExportFormat::CircuitJson, &dir.path().join("o.json"))
            .unwrap_err();
        assert!(matches!(classify(&err), Some(FabError::ExportFailed { .. })));
    }
}
