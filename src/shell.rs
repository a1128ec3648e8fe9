//! Shell process management
//!
//! Spawns bash in a PTY and reads its output on a background thread. The
//! PTY advertises a very wide terminal so bash never soft-wraps long
//! command lines; the buffer owns line layout, not the terminal driver.
//!
//! The shell is configured through a generated rcfile that makes the
//! prompts announce themselves with in-band markers: `PS0` fires when
//! command output is about to start, `PS1` reports the exit status and
//! working directory and then renders the visible prompt, and `PS2` marks
//! continuation lines.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Wide enough that bash never wraps a command line.
const PTY_COLS: u16 = 32767;
const PTY_ROWS: u16 = 100;
const READ_BUF_SIZE: usize = 4096;

/// A connection to a running shell.
///
/// Implementations never block: `receive` hands back whatever bytes have
/// already arrived, and `send` reports delivery failure instead of
/// erroring.
pub trait ShellProcess {
    /// Write `text` to the shell's input. Returns false once the shell is
    /// gone.
    fn send(&mut self, text: &str) -> bool;

    /// True when `receive` would return something.
    fn poll_ready(&mut self) -> bool;

    /// Next chunk of output, if any. An empty chunk means the shell has
    /// disconnected and no more output will arrive.
    fn receive(&mut self) -> Option<Vec<u8>>;
}

/// Bash running in a PTY, with prompt markers wired in via an rcfile.
pub struct PtyShell {
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    rx: Receiver<Vec<u8>>,
    /// Chunk pulled off the channel by `poll_ready` but not yet consumed.
    pending: Option<Vec<u8>>,
    disconnected: bool,
    reader_thread: Option<JoinHandle<()>>,
    /// Keeps the rcfile on disk for the lifetime of the shell.
    _profile: NamedTempFile,
}

/// The rcfile sourced by bash instead of `~/.bashrc`. Prompt expansion
/// turns each `\e` into ESC when the prompt is printed, so the markers
/// arrive in the output stream exactly like terminal control sequences.
const PROFILE: &str = r#"if [ -r ~/.bashrc ]; then . ~/.bashrc; fi
PROMPT_COMMAND=
PS0='\e[0!p'
PS1='\e[1p$?@\w\e[~\e[5p\w\$ \e[~'
PS2='\e[2!p'
"#;

impl PtyShell {
    /// Spawn bash in `cwd`.
    pub fn spawn(cwd: &Path) -> anyhow::Result<Self> {
        let mut profile = NamedTempFile::new().context("creating shell profile")?;
        profile
            .write_all(PROFILE.as_bytes())
            .context("writing shell profile")?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| anyhow::anyhow!("opening pty: {}", e))?;

        let mut cmd = CommandBuilder::new("/bin/bash");
        cmd.arg("--rcfile");
        cmd.arg(profile.path());
        cmd.cwd(cwd);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| anyhow::anyhow!("spawning shell: {}", e))?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| anyhow::anyhow!("cloning pty reader: {}", e))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| anyhow::anyhow!("taking pty writer: {}", e))?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "pty read ended");
                        break;
                    }
                }
            }
        });

        debug!(cwd = %cwd.display(), "spawned shell");
        Ok(Self {
            writer,
            child,
            rx,
            pending: None,
            disconnected: false,
            reader_thread: Some(reader_thread),
            _profile: profile,
        })
    }

    /// Exit code of the shell, if it has terminated.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "checking shell status");
                None
            }
        }
    }
}

impl ShellProcess for PtyShell {
    fn send(&mut self, text: &str) -> bool {
        if self.disconnected {
            return false;
        }
        if let Err(e) = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            warn!(error = %e, "writing to shell");
            return false;
        }
        true
    }

    fn poll_ready(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(chunk) => {
                self.pending = Some(chunk);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                if !self.disconnected {
                    self.disconnected = true;
                    self.pending = Some(Vec::new());
                    return true;
                }
                false
            }
        }
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        if self.poll_ready() {
            self.pending.take()
        } else {
            None
        }
    }
}

impl Drop for PtyShell {
    fn drop(&mut self) {
        // Unblocks the reader thread; it is detached rather than joined
        // because read() may not return promptly on every platform.
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "killing shell on drop");
        }
        self.reader_thread.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_for(shell: &mut PtyShell, window: Duration) -> Vec<u8> {
        let mut out = Vec::new();
        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            match shell.receive() {
                Some(chunk) if chunk.is_empty() => break,
                Some(chunk) => out.extend_from_slice(&chunk),
                None => thread::sleep(Duration::from_millis(10)),
            }
        }
        out
    }

    #[test]
    #[ignore = "requires a working PTY and /bin/bash"]
    fn test_prompt_markers_arrive() {
        let mut shell = PtyShell::spawn(Path::new("/tmp")).unwrap();
        let output = drain_for(&mut shell, Duration::from_secs(2));
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("\x1b[1p"), "no prompt info marker in {:?}", text);
        assert!(text.contains("\x1b[5p"), "no prompt text marker in {:?}", text);
    }

    #[test]
    #[ignore = "requires a working PTY and /bin/bash"]
    fn test_command_output_bracketed() {
        let mut shell = PtyShell::spawn(Path::new("/tmp")).unwrap();
        drain_for(&mut shell, Duration::from_secs(1));
        assert!(shell.send("echo marker-test\n"));
        let output = drain_for(&mut shell, Duration::from_secs(2));
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("\x1b[0!p"), "no output-start marker in {:?}", text);
        assert!(text.contains("marker-test"), "no command output in {:?}", text);
        assert!(text.contains("0@"), "no exit status report in {:?}", text);
    }
}
