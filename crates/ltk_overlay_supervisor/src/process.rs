//! Spawning and signalling the overlay process.

use std::ffi::OsStr;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A chunk of raw output, usually one line including its terminator.
#[derive(Debug, Clone)]
pub(crate) struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
}

/// Program, arguments and working directory of the overlay process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayCommand {
    pub program: Utf8PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
}

impl OverlayCommand {
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Builds a tokio command without a console window on Windows.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(self.program.as_std_path());
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd.as_std_path());
        }
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);
        command
    }
}

impl std::fmt::Display for OverlayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub(crate) struct SpawnedProcess {
    pub child: Child,
    pub pid: Option<u32>,
    pub output: mpsc::Receiver<OutputChunk>,
}

/// Spawns `command` with piped output and one reader task per pipe.
///
/// The child is killed if its handle is dropped.
pub(crate) fn spawn(command: &OverlayCommand) -> std::io::Result<SpawnedProcess> {
    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let pid = child.id();
    let (tx, output) = mpsc::channel(256);

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_output(stdout, OutputStream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_output(stderr, OutputStream::Stderr, tx));
    }

    Ok(SpawnedProcess { child, pid, output })
}

async fn read_output<R>(reader: R, stream: OutputStream, tx: mpsc::Sender<OutputChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(OutputChunk { stream, text }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(?stream, error = %e, "Overlay output stream failed");
                break;
            }
        }
    }
}

/// Asks `pid` to terminate cooperatively.
///
/// Returns `false` when the platform has no such signal or the process is
/// already gone; the caller should fall back to a forced kill.
pub(crate) fn request_terminate(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    system
        .process(pid)
        .and_then(|process| process.kill_with(Signal::Term))
        .unwrap_or(false)
}

/// Checks whether a process is still alive.
pub trait LivenessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// [`LivenessProbe`] backed by the OS process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl LivenessProbe for SysinfoProbe {
    fn is_alive(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        match system.process(pid) {
            Some(process) => {
                !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
            }
            None => false,
        }
    }
}

/// Kills every process whose executable is named like `program`, except `keep`.
///
/// Used before launching the overlay so a leftover instance from a previous
/// run cannot hold the game's files. Returns how many processes were killed.
pub fn kill_orphans(program: &Utf8Path, keep: &[u32]) -> usize {
    let Some(name) = program.file_name() else {
        return 0;
    };

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = 0;
    for process in system.processes_by_exact_name(OsStr::new(name)) {
        let pid = process.pid().as_u32();
        if keep.contains(&pid) {
            continue;
        }
        if process.kill() {
            tracing::warn!(pid, name, "Killed orphaned overlay tool process");
            killed += 1;
        }
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let command = OverlayCommand::new("tools/mod-tools")
            .arg("runoverlay")
            .args(["profiles/Default", "configless"]);
        assert_eq!(command.to_string(), "tools/mod-tools runoverlay profiles/Default configless");
    }

    #[test]
    fn test_probe_sees_current_process() {
        assert!(SysinfoProbe.is_alive(std::process::id()));
    }

    #[test]
    fn test_kill_orphans_ignores_unknown_names() {
        assert_eq!(kill_orphans(Utf8Path::new("definitely-not-running-overlay-tool"), &[]), 0);
    }
}
