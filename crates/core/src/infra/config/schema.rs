use serde_json::Value;

const CONFIG_SCHEMA: &str = include_str!(
  "../../../res/schemas/config.schema.json"
);

/// Checks a parsed config document against
/// the bundled schema, reporting up to five
/// violations.
pub(crate) fn validate_config(
  value: &Value,
  name: &str
) -> Result<(), String> {
  let schema_json: Value =
    serde_json::from_str(CONFIG_SCHEMA)
      .map_err(|e| {
        format!("schema parse error: {e}")
      })?;

  let compiled =
    jsonschema::validator_for(
      &schema_json
    )
    .map_err(|e| {
      format!("schema compile error: {e}")
    })?;

  let mut errors =
    compiled.iter_errors(value);

  if let Some(err) = errors.next() {
    let mut messages =
      vec![err.to_string()];

    for e in errors.take(4) {
      messages.push(e.to_string());
    }

    return Err(format!(
      "schema validation failed for \
       {name}: {}",
      messages.join("; ")
    ));
  }

  Ok(())
}
