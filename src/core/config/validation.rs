use serde_json::{Map, Value};

use crate::core::errors::EngineError;

pub fn validate_config(config: &Value) -> Result<(), EngineError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.rrf_k", "rrf_k", 0, 10_000)?;
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.semantic_top_k",
            "semantic_top_k",
            1,
            1_000,
        )?;
        validate_u64_field(retrieval, "retrieval.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_string_array_field(
            retrieval,
            "retrieval.semantic_collections",
            "semantic_collections",
        )?;
        validate_f64_field(
            retrieval,
            "retrieval.lexical_weight",
            "lexical_weight",
            0.0,
            100.0,
        )?;
        validate_f64_field(
            retrieval,
            "retrieval.semantic_weight",
            "semantic_weight",
            0.0,
            100.0,
        )?;
    }

    if let Some(lexical) = expect_optional_object(root, "lexical")? {
        validate_f64_field(lexical, "lexical.k1", "k1", 0.0, 10.0)?;
        validate_f64_field(lexical, "lexical.b", "b", 0.0, 1.0)?;
        validate_f64_field(lexical, "lexical.epsilon", "epsilon", 0.0, 1.0)?;
    }

    if let Some(enhancer) = expect_optional_object(root, "enhancer")? {
        validate_bool_field(enhancer, "enhancer.enabled", "enabled")?;
        validate_u64_field(enhancer, "enhancer.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_optional_string_field(enhancer, "enhancer.schema_hint", "schema_hint")?;
    }

    if let Some(sql) = expect_optional_object(root, "sql")? {
        validate_u64_field(sql, "sql.row_cap", "row_cap", 1, 1_000_000)?;
        validate_string_array_field(sql, "sql.blacklist", "blacklist")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, EngineError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), EngineError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), EngineError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(EngineError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), EngineError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !number.is_finite() || number < min || number > max {
        return Err(EngineError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), EngineError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), EngineError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(EngineError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> EngineError {
    EngineError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_partial_config() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "retrieval": { "rrf_k": 60, "top_k": 5, "lexical_weight": 0.5 },
            "sql": { "row_cap": 100, "blacklist": ["drop"] }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_non_object_root_and_sections() {
        assert!(matches!(
            validate_config(&json!([1, 2])),
            Err(EngineError::BadRequest(_))
        ));
        let err = validate_config(&json!({ "sql": "nope" })).unwrap_err();
        assert!(err.to_string().contains("'sql'"));
    }

    #[test]
    fn rejects_out_of_range_values_with_path() {
        let err = validate_config(&json!({ "retrieval": { "top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));

        let err = validate_config(&json!({ "lexical": { "b": 1.5 } })).unwrap_err();
        assert!(err.to_string().contains("lexical.b"));

        let err = validate_config(&json!({ "sql": { "row_cap": "many" } })).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn rejects_blank_blacklist_entries() {
        let err = validate_config(&json!({ "sql": { "blacklist": ["drop", " "] } })).unwrap_err();
        assert!(err.to_string().contains("sql.blacklist[1]"));
    }
}
