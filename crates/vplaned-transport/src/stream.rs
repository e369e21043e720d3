use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::error::Result;

/// Connected byte stream to a controller or dataplane socket.
///
/// Returned by [`crate::connect`]. Unix sockets are used for `ipc://`
/// endpoints, TCP for `tcp://` ones; callers never need to care which.
pub struct IpcStream {
    socket: Socket,
}

enum Socket {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

/// Run the same expression against whichever socket type is inside.
macro_rules! on_socket {
    ($socket:expr, $s:ident => $body:expr) => {
        match $socket {
            #[cfg(unix)]
            Socket::Unix($s) => $body,
            Socket::Tcp($s) => $body,
        }
    };
}

impl IpcStream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self {
            socket: Socket::Unix(stream),
        }
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            socket: Socket::Tcp(stream),
        }
    }

    /// `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(on_socket!(&self.socket, s => s.set_read_timeout(timeout))?)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(on_socket!(&self.socket, s => s.set_write_timeout(timeout))?)
    }

    /// Second handle on the same socket, typically one per direction.
    pub fn try_clone(&self) -> Result<Self> {
        let socket = match &self.socket {
            #[cfg(unix)]
            Socket::Unix(s) => Socket::Unix(s.try_clone()?),
            Socket::Tcp(s) => Socket::Tcp(s.try_clone()?),
        };
        Ok(Self { socket })
    }

    /// Shut the socket down in both directions.
    ///
    /// A clone blocked in `read` returns EOF. A socket whose peer is already
    /// gone shuts down without error.
    pub fn shutdown(&self) -> Result<()> {
        match on_socket!(&self.socket, s => s.shutdown(Shutdown::Both)) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            res => Ok(res?),
        }
    }

    /// `SO_LINGER`; `Some(Duration::ZERO)` drops unsent bytes on close.
    #[cfg(unix)]
    pub fn set_linger(&self, linger: Option<Duration>) -> Result<()> {
        use std::os::fd::AsRawFd;

        let fd = on_socket!(&self.socket, s => s.as_raw_fd());
        let secs = linger.map_or(0, |d| d.as_secs().min(libc::c_int::MAX as u64));
        let value = libc::linger {
            l_onoff: libc::c_int::from(linger.is_some()),
            l_linger: secs as libc::c_int,
        };

        // SAFETY: `fd` is an open socket owned by `self`, and the pointer and
        // length describe `value` exactly.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_LINGER,
                std::ptr::addr_of!(value).cast(),
                std::mem::size_of::<libc::linger>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn set_linger(&self, _linger: Option<Duration>) -> Result<()> {
        Ok(())
    }

    pub fn transport_name(&self) -> &'static str {
        match self.socket {
            #[cfg(unix)]
            Socket::Unix(_) => "unix-domain-socket",
            Socket::Tcp(_) => "tcp",
        }
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        on_socket!(&mut self.socket, s => s.read(buf))
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        on_socket!(&mut self.socket, s => s.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        on_socket!(&mut self.socket, s => s.flush())
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IpcStream")
            .field(&self.transport_name())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn pair() -> (IpcStream, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        (IpcStream::from_unix(ours), theirs)
    }

    #[test]
    fn shutdown_unblocks_reader_on_clone() {
        let (stream, _peer) = pair();
        let mut reader = stream.try_clone().unwrap();

        let blocked = std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader.read(&mut buf).unwrap()
        });

        std::thread::sleep(Duration::from_millis(20));
        stream.shutdown().unwrap();
        assert_eq!(blocked.join().unwrap(), 0);
    }

    #[test]
    fn repeated_shutdown_is_harmless() {
        let (stream, _peer) = pair();
        stream.shutdown().unwrap();
        stream.shutdown().unwrap();
    }

    #[test]
    fn bytes_flow_both_ways() {
        let (mut stream, mut peer) = pair();
        stream.write_all(b"GETVPCONFIG").unwrap();
        let mut buf = [0u8; 11];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"GETVPCONFIG");

        peer.write_all(b"OK").unwrap();
        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"OK");
    }

    #[test]
    fn linger_can_be_set_and_cleared() {
        let (stream, _peer) = pair();
        stream.set_linger(Some(Duration::ZERO)).unwrap();
        stream.set_linger(None).unwrap();
        assert_eq!(stream.transport_name(), "unix-domain-socket");
    }
}
