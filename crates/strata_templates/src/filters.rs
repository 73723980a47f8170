//! Built-in filters and global functions.
//!
//! The callable surface available to templates is a fixed table built at
//! engine construction: encoding and digest filters, plus the helper
//! globals project files rely on (passwords, environment lookups, secret
//! lookup, raw file includes).

use std::collections::HashMap;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_yaml::Value;
use sha2::{Digest, Sha256};

use strata_core::{Config, SecretsConfig};

use crate::engine::{type_name, FilterFn, GlobalFn};
use crate::error::{TemplateError, TemplateResult};

/// The fixed filter table.
pub fn filter_registry() -> HashMap<&'static str, FilterFn> {
    let mut filters: HashMap<&'static str, FilterFn> = HashMap::new();
    filters.insert("b64encode", b64encode as FilterFn);
    filters.insert("b64decode", b64decode as FilterFn);
    filters.insert("hash", hash as FilterFn);
    filters.insert("bool", to_bool as FilterFn);
    filters
}

/// The fixed global-function table for one engine construction.
///
/// `file_search` is the layered `files/` lookup path, most specific
/// first.
pub fn global_registry(config: &Config, file_search: Vec<PathBuf>) -> HashMap<&'static str, GlobalFn> {
    let mut globals: HashMap<&'static str, GlobalFn> = HashMap::new();

    globals.insert("random_password", Box::new(random_password) as GlobalFn);
    globals.insert("env", Box::new(env_var) as GlobalFn);

    let secrets = config.secrets.clone();
    globals.insert(
        "get_secret",
        Box::new(move |args: &[Value]| get_secret(&secrets, args)) as GlobalFn,
    );

    globals.insert(
        "include_file",
        Box::new(move |args: &[Value]| include_file(&file_search, args)) as GlobalFn,
    );

    globals
}

fn filter_err(name: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::Filter {
        name: name.to_string(),
        message: message.into(),
    }
}

fn function_err(name: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::Function {
        name: name.to_string(),
        message: message.into(),
    }
}

fn string_input(value: &Value, filter: &str) -> TemplateResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(filter_err(
            filter,
            format!("expected a scalar, got {}", type_name(other)),
        )),
    }
}

fn b64encode(value: &Value, _args: &[Value]) -> TemplateResult<Value> {
    let input = string_input(value, "b64encode")?;
    Ok(Value::String(BASE64.encode(input.as_bytes())))
}

fn b64decode(value: &Value, _args: &[Value]) -> TemplateResult<Value> {
    let input = string_input(value, "b64decode")?;
    let bytes = BASE64
        .decode(input.as_bytes())
        .map_err(|e| filter_err("b64decode", e.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| filter_err("b64decode", "decoded content is not valid UTF-8"))?;
    Ok(Value::String(text))
}

fn hash(value: &Value, _args: &[Value]) -> TemplateResult<Value> {
    let input = string_input(value, "hash")?;
    let digest = Sha256::digest(input.as_bytes());
    Ok(Value::String(hex::encode(digest)))
}

fn to_bool(value: &Value, _args: &[Value]) -> TemplateResult<Value> {
    let result = match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" | "" => false,
            other => {
                return Err(filter_err(
                    "bool",
                    format!("cannot interpret '{}' as a boolean", other),
                ));
            }
        },
        other => {
            return Err(filter_err(
                "bool",
                format!("expected a scalar, got {}", type_name(other)),
            ));
        }
    };
    Ok(Value::Bool(result))
}

fn random_password(args: &[Value]) -> TemplateResult<Value> {
    let length = match args {
        [Value::Number(n)] => n.as_u64().unwrap_or(0) as usize,
        _ => {
            return Err(function_err(
                "random_password",
                "expected a single integer length",
            ));
        }
    };
    if length == 0 {
        return Err(function_err("random_password", "length must be positive"));
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Ok(Value::String(password))
}

fn env_var(args: &[Value]) -> TemplateResult<Value> {
    match args {
        [Value::String(name)] => std::env::var(name)
            .map(Value::String)
            .map_err(|_| {
                function_err("env", format!("environment variable '{}' is not set", name))
            }),
        [Value::String(name), Value::String(default)] => Ok(Value::String(
            std::env::var(name).unwrap_or_else(|_| default.clone()),
        )),
        _ => Err(function_err("env", "expected env(name) or env(name, default)")),
    }
}

fn get_secret(secrets: &SecretsConfig, args: &[Value]) -> TemplateResult<Value> {
    let key = match args {
        [Value::String(key)] => key,
        _ => return Err(function_err("get_secret", "expected a single key")),
    };

    match secrets.provider.as_str() {
        "env" => {
            let variable = match &secrets.prefix {
                Some(prefix) => format!("{}{}", prefix, key),
                None => key.clone(),
            };
            std::env::var(&variable).map(Value::String).map_err(|_| {
                function_err(
                    "get_secret",
                    format!("secret '{}' not found in environment", variable),
                )
            })
        }
        other => Err(function_err(
            "get_secret",
            format!("unknown secret provider '{}'", other),
        )),
    }
}

fn include_file(search: &[PathBuf], args: &[Value]) -> TemplateResult<Value> {
    let name = match args {
        [Value::String(name)] => name,
        _ => return Err(function_err("include_file", "expected a single file name")),
    };

    for dir in search {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(Value::String(std::fs::read_to_string(candidate)?));
        }
    }
    Err(TemplateError::FileNotFound(name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        let encoded = b64encode(&Value::String("sw0rdfish".into()), &[]).unwrap();
        assert_eq!(encoded, Value::String("c3cwcmRmaXNo".into()));

        let decoded = b64decode(&encoded, &[]).unwrap();
        assert_eq!(decoded, Value::String("sw0rdfish".into()));
    }

    #[test]
    fn b64decode_rejects_garbage() {
        let err = b64decode(&Value::String("!!!".into()), &[]).unwrap_err();
        assert!(matches!(err, TemplateError::Filter { .. }));
    }

    #[test]
    fn hash_is_sha256_hex() {
        let digest = hash(&Value::String("".into()), &[]).unwrap();
        assert_eq!(
            digest,
            Value::String(
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into()
            )
        );
    }

    #[test]
    fn bool_filter_parses_common_spellings() {
        for truthy in ["true", "Yes", "on", "1"] {
            assert_eq!(
                to_bool(&Value::String(truthy.into()), &[]).unwrap(),
                Value::Bool(true)
            );
        }
        for falsy in ["false", "No", "off", "0", ""] {
            assert_eq!(
                to_bool(&Value::String(falsy.into()), &[]).unwrap(),
                Value::Bool(false)
            );
        }
        assert!(to_bool(&Value::String("maybe".into()), &[]).is_err());
    }

    #[test]
    fn random_password_has_requested_length() {
        let password = random_password(&[Value::Number(16.into())]).unwrap();
        match password {
            Value::String(s) => {
                assert_eq!(s.len(), 16);
                assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
            }
            other => panic!("expected string, got {:?}", other),
        }

        assert!(random_password(&[]).is_err());
        assert!(random_password(&[Value::Number(0.into())]).is_err());
    }

    #[test]
    fn env_global_reads_and_defaults() {
        std::env::set_var("STRATA_FILTER_TEST", "present");
        assert_eq!(
            env_var(&[Value::String("STRATA_FILTER_TEST".into())]).unwrap(),
            Value::String("present".into())
        );
        assert_eq!(
            env_var(&[
                Value::String("STRATA_FILTER_TEST_MISSING".into()),
                Value::String("fallback".into())
            ])
            .unwrap(),
            Value::String("fallback".into())
        );
        assert!(env_var(&[Value::String("STRATA_FILTER_TEST_MISSING".into())]).is_err());
    }

    #[test]
    fn get_secret_honors_prefix() {
        std::env::set_var("PFX_TOKEN", "hunter2");
        let secrets = SecretsConfig {
            provider: "env".to_string(),
            prefix: Some("PFX_".to_string()),
        };
        assert_eq!(
            get_secret(&secrets, &[Value::String("TOKEN".into())]).unwrap(),
            Value::String("hunter2".into())
        );

        let unknown = SecretsConfig {
            provider: "vault".to_string(),
            prefix: None,
        };
        assert!(get_secret(&unknown, &[Value::String("TOKEN".into())]).is_err());
    }

    #[test]
    fn include_file_prefers_specific_layers() {
        let temp = tempfile::tempdir().unwrap();
        let general = temp.path().join("files");
        let specific = temp.path().join("clusters/alpha/files");
        std::fs::create_dir_all(&general).unwrap();
        std::fs::create_dir_all(&specific).unwrap();
        std::fs::write(general.join("motd.txt"), "general").unwrap();
        std::fs::write(specific.join("motd.txt"), "specific").unwrap();

        let search = vec![specific, general];
        assert_eq!(
            include_file(&search, &[Value::String("motd.txt".into())]).unwrap(),
            Value::String("specific".into())
        );
        assert!(matches!(
            include_file(&search, &[Value::String("absent.txt".into())]),
            Err(TemplateError::FileNotFound(_))
        ));
    }
}
