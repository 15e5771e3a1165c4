//! Socket creation and raw link-layer IO.
//!
//! Two listening/sending paths exist: a raw `AF_PACKET` socket used while
//! the client has no usable address (broadcast frames, hand-built IP/UDP
//! headers), and an ordinary bound UDP socket for unicast exchanges with a
//! known server.

use std::io;
use std::net::UdpSocket as StdUdpSocket;
use thiserror::Error;
use tokio::net::UdpSocket as TokioUdpSocket;

/// Defines all possible errors for socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Failed to create a new socket")]
    CreateSocket(#[source] io::Error),

    #[error("Failed to enable broadcast on socket")]
    SetBroadcast(#[source] io::Error),

    #[error("Failed to set SO_BINDTODEVICE on interface '{interface}'")]
    BindToDevice {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind socket to address")]
    BindSocket(#[source] io::Error),

    #[error("Failed to set SO_REUSEADDR on socket")]
    SetReuseAddress(#[source] io::Error),

    #[error("Failed to set socket to non-blocking mode")]
    SetNonBlocking(#[source] io::Error),

    #[error("Failed to convert socket to TokioUdpSocket")]
    ConvertToTokio(#[source] io::Error),

    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Failed to register raw socket with the runtime")]
    RegisterRawSocket(#[source] io::Error),

    #[allow(dead_code)]
    #[error("Raw packet sockets are not implemented on this platform")]
    NotImplemented,
}

/// Creates a new `tokio::net::UdpSocket` bound to a specific network device
/// and port, with broadcast enabled.
///
/// # Arguments
/// * `interface` - The name of the network interface (e.g., "eth0").
/// * `port` - The port number to bind the socket to.
#[cfg(target_os = "linux")]
pub fn new_bound_udp_socket(interface: &str, port: u16) -> Result<TokioUdpSocket, SocketError> {
    use socket2::{Domain, Socket, Type};
    use std::os::fd::AsRawFd;

    // Create a socket2 socket, which allows setting options before binding.
    let socket2 =
        Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(SocketError::CreateSocket)?;

    // Set `SO_BROADCAST`. This is required for sending broadcast messages.
    socket2
        .set_broadcast(true)
        .map_err(SocketError::SetBroadcast)?;

    // Set `SO_REUSEADDR`. Allows binding to an address that is already in use.
    socket2
        .set_reuse_address(true)
        .map_err(SocketError::SetReuseAddress)?;

    // Set `SO_BINDTODEVICE`. This is an unsafe raw syscall.
    // It is safe here because we use a valid file descriptor and correct parameters.
    let ret = unsafe {
        libc::setsockopt(
            socket2.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            interface.as_ptr() as *const libc::c_void,
            interface.len() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(SocketError::BindToDevice {
            interface: interface.to_string(),
            source: io::Error::last_os_error(),
        });
    }

    // Bind the socket to the address and port.
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", port).parse().unwrap();
    socket2.bind(&addr.into()).map_err(SocketError::BindSocket)?;

    // Convert to a standard socket, then into a Tokio socket.
    let std_socket: StdUdpSocket = socket2.into();
    std_socket
        .set_nonblocking(true)
        .map_err(SocketError::SetNonBlocking)?;
    TokioUdpSocket::from_std(std_socket).map_err(SocketError::ConvertToTokio)
}

/// Fallback for non-Linux systems where `SO_BINDTODEVICE` is not available.
#[cfg(not(target_os = "linux"))]
pub fn new_bound_udp_socket(_interface: &str, _port: u16) -> Result<TokioUdpSocket, SocketError> {
    Err(SocketError::NotImplemented)
}

pub use raw::RawSocket;

/// Fallback for non-Linux systems, where `AF_PACKET` is not available.
#[cfg(not(target_os = "linux"))]
mod raw {
    use super::SocketError;
    use std::io;

    pub struct RawSocket {
        _private: (),
    }

    impl RawSocket {
        pub fn open(_interface: &str) -> Result<Self, SocketError> {
            Err(SocketError::NotImplemented)
        }

        pub async fn recv(&self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }

        pub async fn send_to(&self, _buf: &[u8], _dest_mac: &[u8; 6]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }
}

#[cfg(target_os = "linux")]
mod raw {
    use super::SocketError;
    use std::ffi::CString;
    use std::io;
    use std::mem;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use tokio::io::unix::AsyncFd;

    /// A nonblocking `AF_PACKET` datagram socket bound to one interface,
    /// carrying whole IPv4 packets. The kernel supplies the Ethernet
    /// framing; we see and build everything from the IP header up.
    pub struct RawSocket {
        inner: AsyncFd<OwnedFd>,
        ifindex: u32,
    }

    impl RawSocket {
        /// Opens and binds the raw socket on `interface`.
        pub fn open(interface: &str) -> Result<Self, SocketError> {
            let ifindex = interface_index(interface)?;
            let protocol = (libc::ETH_P_IP as u16).to_be() as libc::c_int;

            // SOCK_NONBLOCK from the start; the fd is owned immediately so
            // it cannot leak on a later failure.
            let fd = unsafe {
                libc::socket(
                    libc::AF_PACKET,
                    libc::SOCK_DGRAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                    protocol,
                )
            };
            if fd < 0 {
                return Err(SocketError::CreateSocket(io::Error::last_os_error()));
            }
            let owned = unsafe { OwnedFd::from_raw_fd(fd) };

            let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
            addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
            addr.sll_protocol = (libc::ETH_P_IP as u16).to_be();
            addr.sll_ifindex = ifindex as libc::c_int;
            let ret = unsafe {
                libc::bind(
                    owned.as_raw_fd(),
                    &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                return Err(SocketError::BindSocket(io::Error::last_os_error()));
            }

            let inner = AsyncFd::new(owned).map_err(SocketError::RegisterRawSocket)?;
            Ok(Self { inner, ifindex })
        }

        /// Receives one packet (IP header onward) into `buf`.
        pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            loop {
                let mut guard = self.inner.readable().await?;
                let result = guard.try_io(|fd| {
                    let n = unsafe {
                        libc::recv(
                            fd.as_raw_fd(),
                            buf.as_mut_ptr() as *mut libc::c_void,
                            buf.len(),
                            0,
                        )
                    };
                    if n < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(n as usize)
                    }
                });
                match result {
                    Ok(res) => return res,
                    Err(_would_block) => continue,
                }
            }
        }

        /// Sends a complete IP packet to `dest_mac` on the bound interface.
        pub async fn send_to(&self, buf: &[u8], dest_mac: &[u8; 6]) -> io::Result<usize> {
            let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
            addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
            addr.sll_protocol = (libc::ETH_P_IP as u16).to_be();
            addr.sll_ifindex = self.ifindex as libc::c_int;
            addr.sll_halen = dest_mac.len() as u8;
            addr.sll_addr[..dest_mac.len()].copy_from_slice(dest_mac);

            loop {
                let mut guard = self.inner.writable().await?;
                let result = guard.try_io(|fd| {
                    let n = unsafe {
                        libc::sendto(
                            fd.as_raw_fd(),
                            buf.as_ptr() as *const libc::c_void,
                            buf.len(),
                            0,
                            &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                        )
                    };
                    if n < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(n as usize)
                    }
                });
                match result {
                    Ok(res) => return res,
                    Err(_would_block) => continue,
                }
            }
        }
    }

    fn interface_index(interface: &str) -> Result<u32, SocketError> {
        let name = CString::new(interface)
            .map_err(|_| SocketError::InterfaceNotFound(interface.to_string()))?;
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return Err(SocketError::InterfaceNotFound(interface.to_string()));
        }
        Ok(index)
    }
}
