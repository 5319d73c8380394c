//! # Loader options.
//!
//! Options arrive from the host as JSON bags in two layers: global options
//! (shared by every resource) and per-loader options. [`LoaderOptions::resolve`]
//! merges `defaults ⊕ global ⊕ loader`, later layers overriding earlier ones
//! key by key, then deserializes the result.
//!
//! ## Recognized keys
//! | key            | type             | default            |
//! |----------------|------------------|--------------------|
//! | `cache`        | truthy value     | `false`            |
//! | `forceWatch`   | truthy value     | `false`            |
//! | `optimize`     | truthy value     | `false`            |
//! | `files`        | array of paths   | `[resource path]`  |
//! | `cwd`          | path             | none               |
//! | `maxInstances` | positive integer | scheduler default  |
//!
//! Flags follow JavaScript truthiness: `null`, `false`, `0` and `""` are off,
//! anything else is on. `maxInstances` accepts integral floats (`2.0`).
//!
//! Unknown keys are kept and forwarded to the compiler. `files`, `forceWatch`
//! and `maxInstances` are consumed by the loader and never reach it.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Free-form option bag.
pub type OptionBag = Map<String, Value>;

/// Options after layering, with known keys extracted.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Host may cache the compiled output.
    #[serde(default, deserialize_with = "truthy")]
    pub cache: bool,
    /// Treat the host as watching even if its arguments say otherwise.
    #[serde(default, deserialize_with = "truthy")]
    pub force_watch: bool,
    /// Ask the compiler for an optimized build.
    #[serde(default, deserialize_with = "truthy")]
    pub optimize: bool,
    /// Raw `files` value, validated by [`LoaderOptions::files_for`].
    #[serde(default)]
    pub files: Option<Value>,
    /// Project directory holding `nim.json`.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Per-request concurrency limit.
    #[serde(default, deserialize_with = "positive_count")]
    pub max_instances: Option<usize>,
    /// Keys the loader does not interpret.
    #[serde(flatten)]
    pub extra: OptionBag,
}

/// The option bag handed to a [`Compiler`](crate::Compiler).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilerOptions {
    /// Host may cache the compiled output.
    pub cache: bool,
    /// Ask the compiler for an optimized build.
    pub optimize: bool,
    /// Working directory for the compiler.
    pub cwd: Option<PathBuf>,
    /// Keys the loader does not interpret.
    pub extra: OptionBag,
}

impl LoaderOptions {
    /// Layers `global` then `loader` over the defaults.
    ///
    /// `None` or `null` layers are skipped; any other non-object layer is rejected.
    pub fn resolve(global: Option<&Value>, loader: Option<&Value>) -> Result<Self, ConfigError> {
        let mut merged = OptionBag::new();
        for layer in [global, loader].into_iter().flatten() {
            match layer {
                Value::Null => {}
                Value::Object(map) => {
                    for (k, v) in map {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                _ => {
                    return Err(ConfigError::InvalidOption {
                        name: "options",
                        expected: "an object",
                    });
                }
            }
        }
        Self::from_bag(merged)
    }

    /// Extracts known keys from a single bag.
    pub fn from_bag(bag: OptionBag) -> Result<Self, ConfigError> {
        serde_json::from_value(Value::Object(bag)).map_err(|e| ConfigError::Malformed {
            message: e.to_string(),
        })
    }

    /// Returns the input files for `resource`.
    ///
    /// Without a `files` option the resource itself is the only input.
    pub fn files_for(&self, resource: &str) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(files) = &self.files else {
            return Ok(vec![PathBuf::from(resource)]);
        };
        let Value::Array(items) = files else {
            return Err(ConfigError::FilesNotArray);
        };
        if items.is_empty() {
            return Err(ConfigError::FilesEmpty);
        }
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(PathBuf::from)
                    .ok_or(ConfigError::InvalidOption {
                        name: "files",
                        expected: "an array of path strings",
                    })
            })
            .collect()
    }

    /// Builds the bag forwarded to the compiler.
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            cache: self.cache,
            optimize: self.optimize,
            cwd: self.cwd.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Value::deserialize(d).map(|v| is_truthy(&v))
}

fn positive_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(d)?;
    if value.is_null() {
        return Ok(None);
    }
    let count = match value.as_u64() {
        Some(n) => Some(n),
        None => value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64),
    };
    match count {
        Some(n) if n > 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        _ => Err(D::Error::custom(format!(
            "maxInstances must be a positive integer, got {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_when_no_layers() {
        let opts = LoaderOptions::resolve(None, None).unwrap();
        assert_eq!(opts, LoaderOptions::default());
        assert_eq!(
            opts.files_for("src/main.nim").unwrap(),
            vec![PathBuf::from("src/main.nim")]
        );
    }

    #[test]
    fn loader_layer_overrides_global() {
        let global = json!({ "optimize": true, "cache": true, "backend": "js" });
        let loader = json!({ "cache": false, "maxInstances": 3, "cwd": "/proj" });
        let opts = LoaderOptions::resolve(Some(&global), Some(&loader)).unwrap();

        assert!(opts.optimize);
        assert!(!opts.cache);
        assert_eq!(opts.max_instances, Some(3));
        assert_eq!(opts.cwd, Some(PathBuf::from("/proj")));
        assert_eq!(opts.extra.get("backend"), Some(&json!("js")));
    }

    #[test]
    fn files_must_be_a_non_empty_array() {
        let opts = LoaderOptions::resolve(None, Some(&json!({ "files": [] }))).unwrap();
        assert_eq!(opts.files_for("a.nim"), Err(ConfigError::FilesEmpty));

        let opts =
            LoaderOptions::resolve(None, Some(&json!({ "files": "not-an-array" }))).unwrap();
        assert_eq!(opts.files_for("a.nim"), Err(ConfigError::FilesNotArray));

        let opts = LoaderOptions::resolve(None, Some(&json!({ "files": ["a.nim", "b.nim"] })))
            .unwrap();
        assert_eq!(
            opts.files_for("x.nim").unwrap(),
            vec![PathBuf::from("a.nim"), PathBuf::from("b.nim")]
        );
    }

    #[test]
    fn loader_keys_never_reach_the_compiler() {
        let loader = json!({
            "files": ["a.nim"],
            "forceWatch": true,
            "maxInstances": 2,
            "optimize": true,
            "define": ["ssl"],
        });
        let opts = LoaderOptions::resolve(None, Some(&loader)).unwrap();
        let compiler = opts.compiler_options();

        assert!(compiler.optimize);
        assert_eq!(compiler.extra.len(), 1);
        assert!(compiler.extra.contains_key("define"));
    }

    #[test]
    fn flags_follow_js_truthiness() {
        let opts = LoaderOptions::resolve(
            None,
            Some(&json!({ "cache": 1, "forceWatch": "true", "optimize": "false" })),
        )
        .unwrap();
        assert!(opts.cache);
        assert!(opts.force_watch);
        assert!(opts.optimize);

        let opts = LoaderOptions::resolve(
            Some(&json!({ "cache": true, "optimize": true })),
            Some(&json!({ "cache": 0, "forceWatch": "", "optimize": null })),
        )
        .unwrap();
        assert!(!opts.cache);
        assert!(!opts.force_watch);
        assert!(!opts.optimize);

        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(0.0)));
    }

    #[test]
    fn max_instances_accepts_integral_numbers() {
        let opts = LoaderOptions::resolve(None, Some(&json!({ "maxInstances": 2.0 }))).unwrap();
        assert_eq!(opts.max_instances, Some(2));

        let opts = LoaderOptions::resolve(None, Some(&json!({ "maxInstances": null }))).unwrap();
        assert_eq!(opts.max_instances, None);

        for bad in [json!(0), json!(2.5), json!(-1), json!("3")] {
            let err = LoaderOptions::resolve(None, Some(&json!({ "maxInstances": bad })))
                .unwrap_err();
            assert_eq!(err.as_label(), "config_malformed");
        }
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(matches!(
            LoaderOptions::resolve(None, Some(&json!({ "cwd": 7 }))),
            Err(ConfigError::Malformed { .. })
        ));
        assert_eq!(
            LoaderOptions::resolve(Some(&json!([1, 2])), None),
            Err(ConfigError::InvalidOption {
                name: "options",
                expected: "an object"
            })
        );
        let opts = LoaderOptions::resolve(None, Some(&json!({ "files": ["a.nim", 3] }))).unwrap();
        assert!(matches!(
            opts.files_for("a.nim"),
            Err(ConfigError::InvalidOption { name: "files", .. })
        ));
    }

    #[test]
    fn null_files_means_the_resource() {
        let opts = LoaderOptions::resolve(None, Some(&json!({ "files": null }))).unwrap();
        assert_eq!(opts.files, None);
        assert_eq!(opts.files_for("a.nim").unwrap(), vec![PathBuf::from("a.nim")]);
    }
}
