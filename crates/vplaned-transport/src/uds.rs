//! Listening side of an `ipc://` endpoint.
//!
//! The controller and the dataplanes own every real listening socket. A
//! [`LocalListener`] is for local responders such as mock controllers in
//! tests and diagnostic stand-ins.

use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::endpoint::{Endpoint, MAX_PATH_LEN};
use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Mode applied to socket files created by [`LocalListener::bind`].
pub const SOCKET_MODE: u32 = 0o600;

/// A bound Unix socket that hands out [`IpcStream`]s.
///
/// The socket file is unlinked on drop, unless something else has replaced
/// it at the same path in the meantime.
pub struct LocalListener {
    inner: UnixListener,
    path: PathBuf,
    identity: (u64, u64),
}

impl LocalListener {
    /// Bind `path`, replacing a leftover socket file from an earlier run.
    ///
    /// Any other kind of file at `path` is left alone and the bind fails.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let len = path.as_os_str().len();
        if len >= MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: MAX_PATH_LEN,
            });
        }

        let bind_err = |source: io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_socket() => {
                debug!(?path, "replacing leftover socket");
                fs::remove_file(&path).map_err(bind_err)?;
            }
            Ok(_) => {
                return Err(bind_err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "path exists and is not a socket",
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_err(e)),
        }

        let inner = UnixListener::bind(&path).map_err(bind_err)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(SOCKET_MODE)).map_err(bind_err)?;
        let meta = fs::symlink_metadata(&path).map_err(bind_err)?;

        debug!(?path, "listening");
        Ok(Self {
            inner,
            identity: (meta.dev(), meta.ino()),
            path,
        })
    }

    /// Block until a peer connects.
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _) = self.inner.accept().map_err(TransportError::Accept)?;
        Ok(IpcStream::from_unix(stream))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The endpoint a client passes to [`crate::connect`] to reach this socket.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Ipc(self.path.clone())
    }

    fn still_owns_path(&self) -> bool {
        fs::symlink_metadata(&self.path)
            .map(|meta| meta.file_type().is_socket() && (meta.dev(), meta.ino()) == self.identity)
            .unwrap_or(false)
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        if self.still_owns_path() {
            let _ = fs::remove_file(&self.path);
        }
    }
}
