use crate::error::Result;
use crate::spec::Spec;
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a document to pretty-printed JSON.
pub fn to_json(spec: &Spec) -> Result<String> {
    Ok(serde_json::to_string_pretty(spec)?)
}

/// Serializes a document to YAML.
pub fn to_yaml(spec: &Spec) -> Result<String> {
    Ok(serde_yaml::to_string(spec)?)
}

/// Writes a document to disk, picking the format from the file extension
/// (`.yaml`/`.yml` for YAML, JSON otherwise).
pub fn write_spec_file(path: &Path, spec: &Spec) -> Result<()> {
    let output = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => to_yaml(spec)?,
        _ => to_json(spec)?,
    };
    debug!("Writing document to {}", path.display());
    fs::write(path, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Config;
    use tempfile::TempDir;

    fn sample() -> Spec {
        Spec::new(Config::new("Demo API", "1.2.3").info())
    }

    #[test]
    fn test_json_output_is_valid_and_pretty() {
        let json = to_json(&sample()).unwrap();
        assert!(json.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.1.0");
        assert_eq!(parsed["info"]["title"], "Demo API");
    }

    #[test]
    fn test_yaml_output_round_trips() {
        let yaml = to_yaml(&sample()).unwrap();
        let parsed: Spec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_write_spec_file_picks_format_by_extension() {
        let temp_dir = TempDir::new().unwrap();

        let json_path = temp_dir.path().join("openapi.json");
        write_spec_file(&json_path, &sample()).unwrap();
        let json = fs::read_to_string(&json_path).unwrap();
        assert!(json.trim_start().starts_with('{'));

        let yaml_path = temp_dir.path().join("openapi.yaml");
        write_spec_file(&yaml_path, &sample()).unwrap();
        let yaml = fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.starts_with("openapi:"));
    }
}
