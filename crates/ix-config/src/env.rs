//! Environment variable helpers: read a single variable, falling back to a
//! default and logging the decision either way.

use std::{
    env,
    fmt::Debug,
    str::FromStr,
};

pub fn env_config<T: Debug + FromStr>(name: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    let var = match env::var(name) {
        Ok(s) => s,
        Err(env::VarError::NotPresent) => return default,
        Err(env::VarError::NotUnicode(_)) => {
            tracing::warn!("invalid value for {name}, falling back to {default:?}");
            return default;
        },
    };
    match T::from_str(&var) {
        Ok(v) => {
            tracing::info!("overriding {name} to {v:?} from environment");
            v
        },
        Err(e) => {
            tracing::warn!("invalid value {var:?} for {name}, falling back to {default:?}: {e:?}");
            default
        },
    }
}

/// The prefix every indexpilot environment variable override carries.
pub const ENV_PREFIX: &str = "INDEXPILOT_";

/// Overlays environment variables shaped `INDEXPILOT_SECTION__FIELD=value`
/// onto a parsed config document, before it is deserialized into
/// [`crate::Config`]. This is how every per-field knob gets an environment
/// override without hand-writing one per leaf field: the nesting is
/// expressed with a double underscore, matching common 12-factor container
/// conventions (e.g. `INDEXPILOT_SAFETY__RATE_LIMIT_TOKENS=50`).
pub fn apply_env_overrides(doc: &mut serde_json::Value) {
    for (key, value) in env::vars() {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = rest.to_lowercase().split("__").map(str::to_owned).collect();
        if path.is_empty() {
            continue;
        }
        set_path(doc, &path, parse_scalar(&value));
    }
}

fn parse_scalar(raw: &str) -> serde_json::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return serde_json::Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return serde_json::Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
    {
        return serde_json::Value::Number(n);
    }
    serde_json::Value::String(raw.to_owned())
}

fn set_path(doc: &mut serde_json::Value, path: &[String], value: serde_json::Value) {
    if !doc.is_object() {
        *doc = serde_json::Value::Object(Default::default());
    }
    let obj = doc.as_object_mut().expect("just ensured object");
    match path {
        [last] => {
            obj.insert(last.clone(), value);
        },
        [head, tail @ ..] => {
            let child = obj
                .entry(head.clone())
                .or_insert_with(|| serde_json::Value::Object(Default::default()));
            set_path(child, tail, value);
        },
        [] => unreachable!("checked non-empty above"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_override_sets_leaf() {
        let mut doc = json!({ "safety": { "rate_limit_tokens": 10 } });
        set_path(
            &mut doc,
            &["safety".to_string(), "rate_limit_tokens".to_string()],
            json!(50),
        );
        assert_eq!(doc["safety"]["rate_limit_tokens"], json!(50));
    }

    #[test]
    fn scalar_parsing_prefers_bool_then_int_then_float_then_string() {
        assert_eq!(parse_scalar("true"), json!(true));
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar("3.5"), json!(3.5));
        assert_eq!(parse_scalar("prefer"), json!("prefer"));
    }
}
