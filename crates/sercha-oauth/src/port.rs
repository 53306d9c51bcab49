//! Callback port selection
//!
//! The preferred port is a fixed, well-known value so the redirect URI can
//! be registered with the provider. When it is taken the next free port in
//! the configured range is used, then any OS-assigned port. Every fallback
//! is reported so the user knows the redirect URI changed.

use std::fmt;
use std::net::TcpListener;
use std::ops::RangeInclusive;
use tracing::{info, warn};

use crate::error::OAuthError;

/// Check if a port is available for binding on loopback.
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// First bindable port in `range`. Each probe socket is released at once.
pub fn find_available_port(range: RangeInclusive<u16>) -> Option<u16> {
    range.into_iter().find(|port| *port != 0 && is_port_available(*port))
}

/// Let the OS pick a free port.
pub fn allocate_dynamic_port() -> Result<u16, OAuthError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| OAuthError::CallbackServerStart(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| OAuthError::CallbackServerStart(e.to_string()))?
        .port();
    drop(listener);
    Ok(port)
}

/// Why the chosen port differs from the preferred one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortFallback {
    /// Another port from the configured range
    Range { preferred: u16, chosen: u16 },
    /// The whole range was taken
    Ephemeral { preferred: u16, chosen: u16 },
}

impl fmt::Display for PortFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { preferred, chosen } => write!(
                f,
                "port {} is in use, using callback port {} instead",
                preferred, chosen
            ),
            Self::Ephemeral { preferred, chosen } => write!(
                f,
                "port {} and its fallback range are in use, using random callback port {}; \
                 make sure the provider allows this redirect URI",
                preferred, chosen
            ),
        }
    }
}

/// Port picked for one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSelection {
    pub port: u16,
    pub fallback: Option<PortFallback>,
}

/// Pick the callback port for a new flow.
pub fn select_callback_port(preferred: u16, range_end: u16) -> Result<PortSelection, OAuthError> {
    if preferred != 0 && is_port_available(preferred) {
        return Ok(PortSelection {
            port: preferred,
            fallback: None,
        });
    }

    let scan_start = preferred.saturating_add(1);
    if scan_start <= range_end {
        if let Some(chosen) = find_available_port(scan_start..=range_end) {
            warn!(
                "[OAuth] Callback port {} unavailable, falling back to {}",
                preferred, chosen
            );
            return Ok(PortSelection {
                port: chosen,
                fallback: Some(PortFallback::Range { preferred, chosen }),
            });
        }
    }

    let chosen = allocate_dynamic_port()?;
    info!("[OAuth] Allocated dynamic callback port {}", chosen);
    Ok(PortSelection {
        port: chosen,
        fallback: Some(PortFallback::Ephemeral { preferred, chosen }),
    })
}
