//! Client-side connection establishment.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use gateway_config::SocketEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use super::{ConnectError, ConnectionStream};

/// Upper bound for establishing a connection. Round trips carry no timeout of
/// their own beyond what the socket enforces.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to a control-channel endpoint.
///
/// # Errors
///
/// Returns a [`ConnectError`] naming the endpoint when resolution or the
/// connection attempt fails.
pub fn connect(endpoint: &SocketEndpoint) -> Result<ConnectionStream, ConnectError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address =
                resolve_tcp_address(host, *port).map_err(|source| ConnectError::Resolve {
                    endpoint: endpoint.to_string(),
                    source,
                })?;

            TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
                .map(ConnectionStream::Tcp)
                .map_err(|source| ConnectError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
        }
        SocketEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str()).map_err(|source| ConnectError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(ConnectError::UnsupportedUnix {
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }
}

pub(super) fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<ConnectionStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream: UnixStream = socket.into();
    Ok(ConnectionStream::Unix(stream))
}
