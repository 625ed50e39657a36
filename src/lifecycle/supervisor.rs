//! Readiness notification to a supervising parent process.
//!
//! # Responsibilities
//! - Tell the supervisor the service is reachable, once per process lifetime
//!
//! # Design Decisions
//! - Default transport is the service-manager notify socket: a `READY=1`
//!   datagram sent to `$NOTIFY_SOCKET`
//! - Failures are reported, never fatal: the service is already serving

use std::io;
use std::path::PathBuf;

/// Sends the "ready" signal to whatever supervises this process.
pub trait ReadinessNotifier: Send + Sync + 'static {
    fn notify_ready(&self) -> io::Result<()>;
}

/// Notify-socket readiness (`READY=1` datagram).
#[derive(Debug, Clone)]
pub struct NotifySocket {
    path: PathBuf,
}

impl NotifySocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the socket path from `$NOTIFY_SOCKET`. `None` when not supervised.
    pub fn from_env() -> Option<Self> {
        std::env::var_os("NOTIFY_SOCKET")
            .filter(|path| !path.is_empty())
            .map(Self::new)
    }
}

#[cfg(unix)]
impl ReadinessNotifier for NotifySocket {
    fn notify_ready(&self) -> io::Result<()> {
        use std::os::unix::net::UnixDatagram;

        let socket = UnixDatagram::unbound()?;

        #[cfg(target_os = "linux")]
        {
            use std::os::linux::net::SocketAddrExt;
            use std::os::unix::ffi::OsStrExt;
            use std::os::unix::net::SocketAddr;

            let raw = self.path.as_os_str().as_bytes();
            if let Some(name) = raw.strip_prefix(b"@") {
                let addr = SocketAddr::from_abstract_name(name)?;
                socket.send_to_addr(b"READY=1", &addr)?;
                return Ok(());
            }
        }

        socket.send_to(b"READY=1", &self.path)?;
        Ok(())
    }
}

#[cfg(not(unix))]
impl ReadinessNotifier for NotifySocket {
    fn notify_ready(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "notify socket requires a unix platform",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::net::UnixDatagram;

    #[test]
    fn sends_ready_datagram() {
        let dir = std::env::temp_dir().join(format!("notify-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notify.sock");
        let receiver = UnixDatagram::bind(&path).unwrap();

        NotifySocket::new(&path).notify_ready().unwrap();

        let mut buf = [0u8; 16];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
