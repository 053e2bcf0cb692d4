//! config-rs/lib.rs
//! Shared configuration helpers for InkWell services
//! Resolves bind addresses and ports from the environment

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "SOPHY")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// The port number to use for the service
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    match env::var(&var_name) {
        Ok(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// `<SERVICE>_SERVICE_ADDR` wins when it holds `host:port` (optionally with an
/// `http://` or `https://` scheme). Otherwise the service binds every
/// interface on `<SERVICE>_SERVICE_PORT` or `default_port`.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let trimmed = addr_str.trim();
        let without_scheme = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .unwrap_or(trimmed);

        match without_scheme.trim_end_matches('/').parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Get service name for logging
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "SOPHY")
///
/// # Returns
/// A formatted service name suitable for logging
pub fn get_formatted_service_name(service_name: &str) -> String {
    format!("{}-service", service_name.to_lowercase().replace('_', "-"))
}
