use crate::error::{PveoffError, PveoffResult};

/// Node name derived from a hostname: everything before the first `.`
pub fn node_name_from_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

/// Full hostname of the local machine
pub fn local_hostname() -> PveoffResult<String> {
    let hostname = nix::unistd::gethostname()
        .map_err(|e| PveoffError::NodeResolution(format!("gethostname failed: {}", e)))?;

    hostname
        .into_string()
        .map_err(|raw| PveoffError::NodeResolution(format!("hostname {:?} is not valid UTF-8", raw)))
}

/// Name of the Proxmox VE node this process runs on
pub fn current_node_name() -> PveoffResult<String> {
    let hostname = local_hostname()?;
    let node = node_name_from_hostname(&hostname);
    if node.is_empty() {
        return Err(PveoffError::NodeResolution(format!(
            "hostname '{}' yields an empty node name",
            hostname
        )));
    }
    Ok(node.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pve1", "pve1")]
    #[test_case("pve1.example.com", "pve1")]
    #[test_case("pve1.", "pve1")]
    #[test_case(".local", "")]
    fn truncates_at_first_dot(hostname: &str, expected: &str) {
        assert_eq!(node_name_from_hostname(hostname), expected);
    }
}
