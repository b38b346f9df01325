use schemars::schema_for;

use crate::config::FileConfig;

/// Print the JSON Schema for `.ralph.toml` to stdout.
pub fn run_schema() -> anyhow::Result<()> {
    println!("{}", schema_json()?);
    Ok(())
}

fn schema_json() -> anyhow::Result<String> {
    let schema = schema_for!(FileConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_config_keys() {
        let json: serde_json::Value = serde_json::from_str(&schema_json().unwrap()).unwrap();
        let props = json["properties"].as_object().unwrap();
        assert!(props.contains_key("agent_cmd"));
        assert!(props.contains_key("model"));
        assert!(props.contains_key("iterations"));
        assert_eq!(json["additionalProperties"], false);
    }
}
