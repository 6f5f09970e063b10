//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Terraform output parsing and error messages."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use stratus_technique::Outputs;

const MISSING_REGION_ERROR: &str =
    "The argument \"region\" is required, but no definition was found";

#[derive(Debug, Deserialize)]
struct OutputMeta {
    value: Value,
}

/// Convert `terraform output -json` into a flat string map.
///
/// Strings lose their JSON quoting, other scalars keep their literal text and
/// lists or objects are rendered as compact JSON.
pub fn parse_outputs(raw: &str) -> serde_json::Result<Outputs> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Outputs::new());
    }
    let parsed: BTreeMap<String, OutputMeta> = serde_json::from_str(trimmed)?;
    Ok(parsed
        .into_iter()
        .map(|(name, meta)| {
            let value = match meta.value {
                Value::String(value) => value,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

/// Add an authentication hint to errors caused by a missing cloud region.
pub fn friendly_error_message(error: &str) -> String {
    if error.contains(MISSING_REGION_ERROR) {
        return format!(
            "unable to create attack technique prerequisites. Ensure you are authenticated against AWS \
             and have the right permissions to run Stratus Red Team.\n\
             Stratus Red Team will display below the error that Terraform returned:\n{error}"
        );
    }
    error.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_unquoted() {
        let outputs = parse_outputs(
            r#"{
                "bucket_name": {"sensitive": false, "type": "string", "value": "stratus-bucket"},
                "display": {"sensitive": false, "type": "string", "value": "Trail \"stratus\" ready"}
            }"#,
        )
        .unwrap();
        assert_eq!(outputs["bucket_name"], "stratus-bucket");
        assert_eq!(outputs["display"], "Trail \"stratus\" ready");
    }

    #[test]
    fn non_strings_keep_their_json_text() {
        let outputs = parse_outputs(
            r#"{
                "count": {"value": 3},
                "enabled": {"value": true},
                "ids": {"value": ["i-1", "i-2"]},
                "tags": {"value": {"env": "sim"}}
            }"#,
        )
        .unwrap();
        assert_eq!(outputs["count"], "3");
        assert_eq!(outputs["enabled"], "true");
        assert_eq!(outputs["ids"], r#"["i-1","i-2"]"#);
        assert_eq!(outputs["tags"], r#"{"env":"sim"}"#);
    }

    #[test]
    fn empty_output_is_empty_map() {
        assert!(parse_outputs("").unwrap().is_empty());
        assert!(parse_outputs("{}\n").unwrap().is_empty());
        assert!(parse_outputs("not json").is_err());
    }

    #[test]
    fn missing_region_gets_a_hint() {
        let raw = "Error: Missing required argument\n\nThe argument \"region\" is required, but no definition was found.";
        let message = friendly_error_message(raw);
        assert!(message.starts_with("unable to create attack technique prerequisites"));
        assert!(message.ends_with(raw));
        assert_eq!(friendly_error_message("boom"), "boom");
    }
}
