use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::process::Stdio;

const ROWS: u16 = 24;
const COLUMNS: u16 = 120;

/// A pseudo-terminal pair. The child gets the slave side as its stdio so the
/// tool renders its carriage-return progress lines; we read the master.
pub struct Pty {
    master: OwnedFd,
    slave: OwnedFd,
}

impl Pty {
    #[allow(unsafe_code)]
    pub fn open() -> io::Result<Self> {
        let mut master: libc::c_int = -1;
        let mut slave: libc::c_int = -1;
        let mut size = libc::winsize {
            ws_row: ROWS,
            ws_col: COLUMNS,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: all pointers are valid for the duration of the call; a null
        // name and termios are permitted by openpty(3).
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut::<libc::termios>(),
                &mut size,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: openpty succeeded, so both descriptors are open and owned
        // by nothing else in this process.
        let (master, slave) = unsafe { (OwnedFd::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) };
        set_cloexec(&master)?;
        Ok(Self { master, slave })
    }

    /// A fresh handle on the slave side for one of the child's streams.
    pub fn slave_stdio(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.slave.try_clone()?))
    }

    /// Drop our slave descriptor and hand back the readable master.
    ///
    /// Must be called after the child is spawned: the master only reports
    /// end-of-stream once no process holds the slave open.
    pub fn into_master(self) -> File {
        drop(self.slave);
        File::from(self.master)
    }
}

#[allow(unsafe_code)]
fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own; F_SETFD takes an int flag.
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn slave_output_is_readable_from_master() {
        let pty = Pty::open().unwrap();
        let mut slave = File::from(pty.slave.try_clone().unwrap());
        slave.write_all(b"hello\n").unwrap();
        drop(slave);
        let mut master = pty.into_master();
        let mut buf = [0u8; 64];
        let n = master.read(&mut buf).unwrap();
        // The line discipline turns \n into \r\n.
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("hello"));
    }
}
