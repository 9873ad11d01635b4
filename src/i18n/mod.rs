//! Internationalization (i18n) support
//!
//! Interface strings and month names ship embedded for `pt-BR` and `en`.
//! A site can override any key with `languages/<lang>.yml`.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    ("pt-BR", include_str!("languages/pt-BR.yml")),
    ("en", include_str!("languages/en.yml")),
];

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a handler with the embedded languages loaded
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, source) in BUILTIN {
            match serde_yaml::from_str(source) {
                Ok(data) => {
                    translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::error!("Embedded language {} is invalid: {}", lang, e),
            }
        }
        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Load override files from a directory, merged over the embedded keys
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let lang = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("en")
                .to_string();
            let content = fs::read_to_string(&path)?;

            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    let target = self.translations.entry(lang).or_default();
                    for (key, value) in data {
                        merge_value(target.entry(key).or_insert(serde_yaml::Value::Null), value);
                    }
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key. Key can be nested like "post.next"
    pub fn get(&self, key: &str) -> String {
        self.lookup(key)
            .map(yaml_value_to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Abbreviated month name, `month` in 1..=12
    pub fn month_short(&self, month: u32) -> String {
        let name = self
            .lookup("date.months")
            .and_then(|v| v.as_sequence())
            .and_then(|months| months.get(month.saturating_sub(1) as usize))
            .and_then(|v| v.as_str());
        match name {
            Some(name) => name.to_string(),
            None => format!("{:02}", month),
        }
    }

    /// All translations for the current language as a flat map with
    /// dot-notation keys, English filling the gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();

        if let Some(lang_data) = self.translations.get(&self.language) {
            flatten_translations(lang_data, "", &mut result);
        }

        if self.language != "en" {
            if let Some(en_data) = self.translations.get("en") {
                let mut en_result = HashMap::new();
                flatten_translations(en_data, "", &mut en_result);
                for (k, v) in en_result {
                    result.entry(k).or_insert(v);
                }
            }
        }

        result
    }

    fn lookup(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.translations
            .get(&self.language)
            .and_then(|data| get_nested_value(data, key))
            .or_else(|| {
                self.translations
                    .get("en")
                    .and_then(|data| get_nested_value(data, key))
            })
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

/// Get a nested value from a YAML map using dot notation
fn get_nested_value<'a>(
    data: &'a HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Option<&'a serde_yaml::Value> {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current: Option<&serde_yaml::Value> = data.get(parts[0]);

    for part in &parts[1..] {
        match current {
            Some(serde_yaml::Value::Mapping(map)) => {
                current = map.get(serde_yaml::Value::String(part.to_string()));
            }
            _ => return None,
        }
    }

    current.filter(|v| !v.is_null())
}

/// Deep-merge `value` into `target`, mappings key by key
fn merge_value(target: &mut serde_yaml::Value, value: serde_yaml::Value) {
    match (target, value) {
        (serde_yaml::Value::Mapping(existing), serde_yaml::Value::Mapping(incoming)) => {
            for (k, v) in incoming {
                if let Some(slot) = existing.get_mut(&k) {
                    merge_value(slot, v);
                    continue;
                }
                existing.insert(k, v);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(s) => {
                result.insert(full_key, s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(full_key, n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(full_key, b.to_string());
            }
            serde_yaml::Value::Mapping(map) => {
                let mut nested = HashMap::new();
                for (k, v) in map {
                    if let serde_yaml::Value::String(key_str) = k {
                        nested.insert(key_str.clone(), v.clone());
                    }
                }
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}
