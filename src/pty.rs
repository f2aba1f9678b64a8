// src/pty.rs

//! PTY allocation and child attachment.
//!
//! Children run with a pseudo-terminal as their controlling tty so that
//! interactive programs line-buffer and colorize as usual, and so that a
//! Ctrl-C written to the master side reaches the whole foreground job.

use std::fmt;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::process::Stdio;

use nix::pty::openpty;
use tokio::process::{Child, Command};

/// The master side of a PTY pair, kept after the child is spawned.
pub struct PtyMaster {
    fd: OwnedFd,
}

impl fmt::Debug for PtyMaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtyMaster").finish()
    }
}

impl PtyMaster {
    /// Write raw bytes to the master side (e.g. 0x03 for Ctrl-C).
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        nix::unistd::write(&self.fd, buf).map_err(io::Error::from)
    }

    /// Duplicate the master for blocking reads from a scraper thread.
    pub fn reader(&self) -> io::Result<File> {
        Ok(File::from(self.fd.try_clone()?))
    }

    /// Copy the window size of our stdout onto the PTY.
    pub fn inherit_winsize(&self) -> io::Result<()> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) } < 0 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::ioctl(self.fd.as_raw_fd(), libc::TIOCSWINSZ, &ws) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Spawn `argv` attached to a fresh PTY.
///
/// The child becomes the leader of a new session whose controlling terminal
/// is the PTY slave, so `kill(-pid)` reaches the whole process group.
pub fn spawn(argv: &[String]) -> io::Result<(Child, PtyMaster)> {
    let pty = openpty(None, None).map_err(io::Error::from)?;
    let master = pty.master;
    let slave = pty.slave;

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd.stdin(Stdio::from(slave.try_clone()?));
    cmd.stdout(Stdio::from(slave.try_clone()?));
    cmd.stderr(Stdio::from(slave));
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() < 0 {
                return Err(io::Error::last_os_error());
            }
            // fd 0 is the slave side after the Stdio wiring above.
            if libc::ioctl(0, libc::TIOCSCTTY, 0) < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn()?;
    Ok((child, PtyMaster { fd: master }))
}
