//! Analyzer settings and the provider seam.
//!
//! Settings arrive from the editor through
//! `workspace/didChangeConfiguration`; anything missing or malformed
//! falls back to the defaults, so a bad configuration can degrade the
//! analysis but never break the server.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Default debounce window between a content change and reanalysis.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Effective configuration for invoking the external analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerSettings {
    /// Path to the analyzer executable. `None` means discover it on
    /// `PATH`.
    pub executable: Option<String>,
    /// Extra arguments passed to every invocation.
    pub arguments: Vec<String>,
    /// Debounce delay for content changes, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            executable: None,
            arguments: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl AnalyzerSettings {
    /// Decode settings from a configuration payload, falling back to
    /// defaults when the payload is missing or malformed.
    pub fn from_json(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("malformed analyzer settings, using defaults: {err}");
                Self::default()
            }
        }
    }
}

/// Source of effective settings for a given configuration scope.
///
/// The pipeline fetches settings at the start of every analysis, so a
/// configuration change takes effect on the next run without any
/// plumbing through the scheduling layer.
pub trait SettingsProvider: Send + Sync {
    /// Effective settings for the given scope (document uri).
    fn settings(&self, scope: &str) -> AnalyzerSettings;
}

/// Settings shared between the server (writer) and the pipeline
/// (reader).
#[derive(Debug, Default)]
pub struct SharedSettings {
    current: RwLock<AnalyzerSettings>,
}

impl SharedSettings {
    /// Create shared settings initialized to the defaults.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the current settings.
    pub fn update(&self, settings: AnalyzerSettings) {
        // A poisoned lock means a writer panicked; the settings value
        // itself is still a plain struct, so keep serving it.
        match self.current.write() {
            Ok(mut guard) => *guard = settings,
            Err(mut poisoned) => **poisoned.get_mut() = settings,
        }
    }
}

impl SettingsProvider for SharedSettings {
    fn settings(&self, _scope: &str) -> AnalyzerSettings {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = AnalyzerSettings::default();
        assert_eq!(settings.executable, None);
        assert!(settings.arguments.is_empty());
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn decodes_camel_case_payload() {
        let settings = AnalyzerSettings::from_json(serde_json::json!({
            "executable": "/usr/local/bin/swipl",
            "arguments": ["--quiet"],
            "debounceMs": 150
        }));
        assert_eq!(settings.executable.as_deref(), Some("/usr/local/bin/swipl"));
        assert_eq!(settings.arguments, vec!["--quiet".to_string()]);
        assert_eq!(settings.debounce_ms, 150);
    }

    #[test]
    fn partial_payload_fills_defaults() {
        let settings =
            AnalyzerSettings::from_json(serde_json::json!({ "executable": "swipl-devel" }));
        assert_eq!(settings.executable.as_deref(), Some("swipl-devel"));
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn malformed_payload_falls_back_to_defaults() {
        let settings = AnalyzerSettings::from_json(serde_json::json!({ "debounceMs": "soon" }));
        assert_eq!(settings, AnalyzerSettings::default());
    }

    #[test]
    fn poisoned_lock_still_serves_last_settings() {
        let shared = SharedSettings::new();
        shared.update(AnalyzerSettings {
            debounce_ms: 77,
            ..Default::default()
        });

        let writer = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.current.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        // Reads and writes both keep working after the poison.
        assert_eq!(shared.settings("file:///a.pl").debounce_ms, 77);
        shared.update(AnalyzerSettings::default());
        assert_eq!(
            shared.settings("file:///a.pl").debounce_ms,
            DEFAULT_DEBOUNCE_MS
        );
    }

    #[test]
    fn shared_settings_update_is_visible_to_provider() {
        let shared = SharedSettings::new();
        assert_eq!(shared.settings("file:///a.pl").debounce_ms, DEFAULT_DEBOUNCE_MS);

        shared.update(AnalyzerSettings {
            debounce_ms: 50,
            ..Default::default()
        });
        assert_eq!(shared.settings("file:///a.pl").debounce_ms, 50);
    }
}
