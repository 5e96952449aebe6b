//! ICP file loading.
//!
//! A missing or unparsable profile is a configuration error: the run stops
//! before any company is processed.

use std::path::Path;

use tracing::info;

use leadscout_shared::{Icp, LeadScoutError, Result};

/// Load the ICP from a JSON file.
pub fn load_icp(path: &Path) -> Result<Icp> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        LeadScoutError::config(format!("cannot read ICP file {}: {e}", path.display()))
    })?;
    let icp = parse_icp(&content).map_err(|e| match e {
        LeadScoutError::Config { message } => {
            LeadScoutError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    info!(
        path = %path.display(),
        industries = icp.industries.len(),
        stages = icp.stages.len(),
        geographies = icp.geographies.len(),
        tech_hints = icp.tech_hints.len(),
        "loaded ICP"
    );
    Ok(icp)
}

/// Parse an ICP from JSON text; absent keys mean "criterion disabled".
pub fn parse_icp(json: &str) -> Result<Icp> {
    let mut icp: Icp = serde_json::from_str(json)
        .map_err(|e| LeadScoutError::config(format!("invalid ICP JSON: {e}")))?;

    for list in [
        &mut icp.industries,
        &mut icp.stages,
        &mut icp.geographies,
        &mut icp.tech_hints,
    ] {
        list.retain(|s| !s.trim().is_empty());
    }
    Ok(icp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_profile() {
        let icp = parse_icp(
            r#"{"industry":["FinTech","SaaS"],"stage":["Seed"],"geo":["USA"],
                "tech_hints":["AI"],"size":{"min_employees":10,"max_employees":200,
                "funding_min":"$1M","funding_max":"$20M"}}"#,
        )
        .unwrap();
        assert_eq!(icp.industries.len(), 2);
        assert_eq!(icp.size.min_employees, 10);
        assert_eq!(icp.size.funding_min, "$1M");
    }

    #[test]
    fn missing_keys_disable_criteria() {
        let icp = parse_icp(r#"{"industry":["FinTech"]}"#).unwrap();
        assert!(icp.stages.is_empty());
        assert_eq!(icp.size.max_employees, 0);
        assert!(icp.size.funding_min.is_empty());
    }

    #[test]
    fn blank_entries_are_dropped() {
        let icp = parse_icp(r#"{"industry":["", "  ", "FinTech"],"geo":[""]}"#).unwrap();
        assert_eq!(icp.industries, vec!["FinTech"]);
        assert!(icp.geographies.is_empty());
    }

    #[test]
    fn malformed_json_is_fatal_config_error() {
        let err = parse_icp("{not json").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_file_is_fatal_config_error() {
        let path = std::env::temp_dir().join("leadscout-missing-icp.json");
        let err = load_icp(&path).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("cannot read ICP file"));
    }
}
