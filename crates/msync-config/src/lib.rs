use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts with
/// CONFIG_SECRET_DETECTED. API keys belong in env vars; config names the
/// variable, never the value.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "AIza",       // Google API key
];

/// Layered config as loaded: merged JSON value, its canonical string form,
/// and the SHA-256 hash of the canonical form (logged at run start).
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge YAML docs in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

/// Spreadsheet source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSettings {
    pub spreadsheet_id: String,
    /// Range-qualified fetch, e.g. "Menu!A1:K200".
    pub range: String,
    /// Name of the env var holding the API key. The key itself must never
    /// appear in config files.
    pub api_key_env: String,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8899".to_string()
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Fully typed view over the merged config. Extracted with
/// [`SyncSettings::from_config`] after layering + secret checks pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub sheet: SheetSettings,
    pub catalog: CatalogSettings,
    pub images: ImageSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub daemon: DaemonSettings,
}

impl SyncSettings {
    pub fn from_config(cfg: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(cfg.config_json.clone())
            .context("config does not match the expected sync settings shape")
    }

    /// Resolve the sheet API key from the env var named in config.
    pub fn sheet_api_key(&self) -> Result<String> {
        std::env::var(&self.sheet.api_key_env).with_context(|| {
            format!(
                "sheet api key env var '{}' is not set",
                self.sheet.api_key_env
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Merge / canonicalize / hash
// ---------------------------------------------------------------------------

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // Compact serialization; merge order is deterministic given
    // deterministic input ordering, so the hash is stable per layering.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

// ---------------------------------------------------------------------------
// Secret-literal guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
sheet:
  spreadsheet_id: "sheet-123"
  range: "Menu!A1:K200"
  api_key_env: "SHEETS_API_KEY"
catalog:
  base_url: "https://catalog.example"
images:
  base_url: "https://img.example"
"#;

    #[test]
    fn later_docs_override_earlier() {
        let over = "catalog:\n  base_url: \"https://staging.example\"\n";
        let cfg = load_layered_yaml_from_strings(&[BASE, over]).unwrap();
        let s = SyncSettings::from_config(&cfg).unwrap();
        assert_eq!(s.catalog.base_url, "https://staging.example");
        // Non-overridden keys survive the merge.
        assert_eq!(s.sheet.spreadsheet_id, "sheet-123");
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let s = SyncSettings::from_config(&cfg).unwrap();
        assert_eq!(s.scheduler.interval_secs, 300);
        assert_eq!(s.daemon.bind_addr, "127.0.0.1:8899");
        assert_eq!(s.sheet.base_url, "https://sheets.googleapis.com");
    }

    #[test]
    fn secret_literal_in_config_rejected() {
        let bad = "sheet:\n  api_key_env: \"AIzaSyD-this-is-a-literal-key\"\n";
        let err = load_layered_yaml_from_strings(&[BASE, bad]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
        assert!(
            !err.to_string().contains("AIzaSyD"),
            "error must not echo the secret value"
        );
    }

    #[test]
    fn hash_is_stable_for_identical_layering() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.canonical_json, b.canonical_json);
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let over = "scheduler:\n  interval_secs: 60\n";
        let b = load_layered_yaml_from_strings(&[BASE, over]).unwrap();
        assert_ne!(a.config_hash, b.config_hash);
    }

    #[test]
    fn missing_required_section_is_an_error() {
        let cfg = load_layered_yaml_from_strings(&["images:\n  base_url: \"x\"\n"]).unwrap();
        assert!(SyncSettings::from_config(&cfg).is_err());
    }
}
