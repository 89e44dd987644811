//! Port-owner lookup: map a listening TCP port to the PIDs bound to it.

#[cfg(target_os = "linux")]
mod linux_impl {
    use anyhow::{Context, Result};
    use procfs::net::TcpState;
    use procfs::process::FDTarget;
    use relaunch_core::ProcessId;
    use std::collections::HashSet;
    use tracing::debug;

    /// Resolve the PIDs listening on `port`.
    ///
    /// Collects the socket inodes of LISTEN-state TCP/TCP6 entries on the
    /// port, then joins them against process fd tables. Processes whose fd
    /// tables cannot be read (other users) are skipped, so the result may
    /// undercount without sufficient privileges.
    pub fn owners_of_port(port: u16) -> Result<Vec<ProcessId>> {
        let inodes = listening_inodes(port);
        if inodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners = Vec::new();
        let mut seen = HashSet::new();
        let processes =
            procfs::process::all_processes().context("failed to enumerate processes")?;
        for process in processes.flatten() {
            let Ok(fds) = process.fd() else { continue };
            for fd in fds.flatten() {
                if let FDTarget::Socket(inode) = fd.target {
                    if inodes.contains(&inode) && seen.insert(process.pid()) {
                        owners.push(ProcessId(process.pid() as u32));
                    }
                }
            }
        }

        debug!("port {} is owned by {:?}", port, owners);
        Ok(owners)
    }

    /// Socket inodes of LISTEN-state entries on `port`, across v4 and v6.
    fn listening_inodes(port: u16) -> HashSet<u64> {
        let mut inodes = HashSet::new();

        if let Ok(entries) = procfs::net::tcp() {
            for e in entries {
                if matches!(e.state, TcpState::Listen) && e.local_address.port() == port {
                    inodes.insert(e.inode);
                }
            }
        }

        if let Ok(entries) = procfs::net::tcp6() {
            for e in entries {
                if matches!(e.state, TcpState::Listen) && e.local_address.port() == port {
                    inodes.insert(e.inode);
                }
            }
        }

        inodes
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::owners_of_port;

// Other platforms report an empty owner set; the restart sequence treats
// that the same way it treats an unbound port.
#[cfg(not(target_os = "linux"))]
pub fn owners_of_port(port: u16) -> anyhow::Result<Vec<relaunch_core::ProcessId>> {
    tracing::warn!(
        "port-owner lookup is not supported on this platform, treating port {} as free",
        port
    );
    Ok(Vec::new())
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use relaunch_core::ProcessId;
    use std::net::TcpListener;

    #[test]
    fn test_finds_own_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let owners = owners_of_port(port).unwrap();
        assert!(
            owners.contains(&ProcessId(std::process::id())),
            "expected own PID in {owners:?}"
        );
    }

    #[test]
    fn test_unbound_port_returns_empty_set() {
        // Bind to get a port the kernel considers free, then release it.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let owners = owners_of_port(port).unwrap();
        assert!(owners.is_empty(), "expected no owners, got {owners:?}");
    }

    #[test]
    fn test_each_owner_appears_at_most_once() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let owners = owners_of_port(port).unwrap();
        let mut deduped = owners.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(owners.len(), deduped.len());
    }
}
