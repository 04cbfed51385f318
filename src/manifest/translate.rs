// src/manifest/translate.rs

//! Manifest translation between Chrome and Firefox
//!
//! Translation never fails. Whatever has no equivalent in the target
//! browser is dropped or reshaped, and each such change is reported as a
//! [`TranslationWarning`] so the caller can review it before publishing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use super::permissions::{map_permission, PermissionMapping};
use super::ManifestDocument;
use crate::package::ContainerKind;

/// Top-level keys only Chrome understands
const CHROME_ONLY_KEYS: &[&str] = &[
    "key",
    "update_url",
    "minimum_chrome_version",
    "offline_enabled",
    "externally_connectable",
    "oauth2",
    "import",
    "export",
    "nacl_modules",
    "file_browser_handlers",
    "tts_engine",
    "storage",
    "event_rules",
    "differential_fingerprint",
    "current_locale",
];

/// Top-level keys only Firefox understands (`sidebar_action` is translated separately)
const FIREFOX_ONLY_KEYS: &[&str] = &[
    "protocol_handlers",
    "theme_experiment",
    "user_scripts",
    "developer",
    "dictionaries",
    "l10n_resources",
];

/// Keys holding browser-specific Gecko settings
const GECKO_SETTINGS_KEYS: &[&str] = &["browser_specific_settings", "applications"];

/// Keys holding permission lists
const PERMISSION_KEYS: &[&str] = &["permissions", "optional_permissions"];

/// Namespace for synthesized Gecko ids
const GECKO_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1f, 0x3e, 0x52, 0x9a, 0x0c, 0x4d, 0x8e, 0xb2, 0x61, 0x0f, 0x7d, 0x93, 0x2a, 0xc4, 0x15,
]);

/// Category of a translation warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `manifest_version` lowered for the target
    ManifestDowngraded,
    /// Target accepts the manifest version but is phasing it out
    ManifestVersionDeprecated,
    /// A field was reshaped into the target's equivalent API
    ApiShapeChanged,
    /// A permission has no equivalent in the target
    PermissionDropped,
    /// A field has no equivalent in the target
    FieldDropped,
    /// The source package was signed and the output is not
    SignatureInvalidated,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManifestDowngraded => "manifest_downgraded",
            Self::ManifestVersionDeprecated => "manifest_version_deprecated",
            Self::ApiShapeChanged => "api_shape_changed",
            Self::PermissionDropped => "permission_dropped",
            Self::FieldDropped => "field_dropped",
            Self::SignatureInvalidated => "signature_invalidated",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal loss or change during conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationWarning {
    pub kind: WarningKind,
    /// Affected manifest field or permission
    pub subject: String,
    pub message: String,
}

impl TranslationWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TranslationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// Translated manifest plus what was lost on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub manifest: ManifestDocument,
    pub warnings: Vec<TranslationWarning>,
}

impl Translation {
    /// Warnings of one kind
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &TranslationWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// Target browser profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorOptions {
    /// Firefox accepts Manifest V3; when false MV3 sources are downgraded
    pub firefox_manifest_v3: bool,
    /// `browser_specific_settings.gecko.strict_min_version` for Firefox output
    pub strict_min_version: Option<String>,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            firefox_manifest_v3: true,
            strict_min_version: None,
        }
    }
}

/// Deterministic Gecko add-on id for an extension name
pub fn synthesize_gecko_id(name: &str) -> String {
    format!("{{{}}}", Uuid::new_v5(&GECKO_ID_NAMESPACE, name.as_bytes()))
}

/// Rewrites manifests between Chrome and Firefox conventions
#[derive(Debug, Clone, Default)]
pub struct ManifestTranslator {
    options: TranslatorOptions,
}

impl ManifestTranslator {
    pub fn new(options: TranslatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translate a manifest from one browser's conventions to another's
    pub fn translate(
        &self,
        manifest: ManifestDocument,
        from: ContainerKind,
        to: ContainerKind,
    ) -> Translation {
        let mut pass = Pass {
            manifest,
            warnings: Vec::new(),
        };

        match (from, to) {
            (ContainerKind::Chrome, ContainerKind::Firefox) => self.chrome_to_firefox(&mut pass),
            (ContainerKind::Firefox, ContainerKind::Chrome) => self.firefox_to_chrome(&mut pass),
            _ => {}
        }

        debug!(
            "Translated manifest {} -> {} with {} warning(s)",
            from,
            to,
            pass.warnings.len()
        );
        Translation {
            manifest: pass.manifest,
            warnings: pass.warnings,
        }
    }

    fn chrome_to_firefox(&self, pass: &mut Pass) {
        pass.drop_keys(CHROME_ONLY_KEYS, "not supported by Firefox");

        let mut worker_note = None;
        if let Some(Value::Object(background)) = pass.manifest.get_mut("background") {
            worker_note = match background.shift_remove("service_worker") {
                Some(Value::String(script)) if background.contains_key("scripts") => Some((
                    WarningKind::FieldDropped,
                    format!(
                        "service worker '{}' dropped in favour of the existing background scripts",
                        script
                    ),
                )),
                Some(Value::String(script)) => {
                    let message = format!(
                        "service worker '{}' now runs as a background script with a DOM",
                        script
                    );
                    background.insert("scripts".to_string(), json!([script]));
                    Some((WarningKind::ApiShapeChanged, message))
                }
                Some(_) => Some((
                    WarningKind::FieldDropped,
                    "service worker entry is not a script path".to_string(),
                )),
                None => None,
            };
        }
        if let Some((kind, message)) = worker_note {
            pass.warn(kind, "background.service_worker", message);
        }

        if let Some(panel) = pass.manifest.remove("side_panel") {
            match panel.get("default_path").and_then(Value::as_str) {
                Some(_) if pass.manifest.contains_key("sidebar_action") => pass.warn(
                    WarningKind::FieldDropped,
                    "side_panel",
                    "side panel dropped in favour of the existing sidebar_action",
                ),
                Some(path) => {
                    pass.manifest
                        .insert("sidebar_action", json!({ "default_panel": path }));
                    pass.warn(
                        WarningKind::ApiShapeChanged,
                        "side_panel",
                        "side panel converted to sidebar_action; chrome.sidePanel calls need porting",
                    );
                }
                None => pass.warn(
                    WarningKind::FieldDropped,
                    "side_panel",
                    "side panel without a default_path cannot become a sidebar",
                ),
            }
        }

        pass.map_permissions(ContainerKind::Firefox);

        if pass.manifest.manifest_version() == Some(3) && !self.options.firefox_manifest_v3 {
            downgrade_to_v2(pass);
        }

        self.ensure_gecko_settings(pass);
    }

    fn ensure_gecko_settings(&self, pass: &mut Pass) {
        let existing = pass
            .manifest
            .remove("browser_specific_settings")
            .or_else(|| pass.manifest.remove("applications"));
        let mut settings = match existing {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        if !matches!(settings.get("gecko"), Some(Value::Object(_))) {
            settings.insert("gecko".to_string(), Value::Object(Map::new()));
        }
        if let Some(Value::Object(gecko)) = settings.get_mut("gecko") {
            if !gecko.contains_key("id") {
                let id = synthesize_gecko_id(pass.manifest.name().unwrap_or("extension"));
                info!("Assigned Gecko add-on id {}", id);
                gecko.insert("id".to_string(), Value::String(id));
            }
            if let Some(min) = &self.options.strict_min_version {
                if !gecko.contains_key("strict_min_version") {
                    gecko.insert("strict_min_version".to_string(), Value::String(min.clone()));
                }
            }
        }

        pass.manifest
            .insert("browser_specific_settings", Value::Object(settings));
    }

    fn firefox_to_chrome(&self, pass: &mut Pass) {
        pass.drop_keys(GECKO_SETTINGS_KEYS, "Gecko-specific settings have no Chrome equivalent");
        pass.drop_keys(FIREFOX_ONLY_KEYS, "not supported by Chrome");

        let manifest_version = pass.manifest.manifest_version();

        if manifest_version == Some(3) {
            let mut notes = Vec::new();
            let mut dropped = Vec::new();
            if let Some(Value::Object(background)) = pass.manifest.get_mut("background") {
                if let Some(scripts) = background.shift_remove("scripts") {
                    let scripts: Vec<String> = scripts
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();

                    if background.contains_key("service_worker") {
                        if !scripts.is_empty() {
                            dropped.push((
                                "background.scripts",
                                format!(
                                    "{} dropped in favour of the existing service worker",
                                    scripts.join(", ")
                                ),
                            ));
                        }
                    } else if let Some((first, rest)) = scripts.split_first() {
                        background
                            .insert("service_worker".to_string(), Value::String(first.clone()));
                        let message = if rest.is_empty() {
                            format!("'{}' now runs as a service worker without DOM access", first)
                        } else {
                            format!(
                                "'{}' now runs as a service worker; load {} with importScripts()",
                                first,
                                rest.join(", ")
                            )
                        };
                        notes.push(("background.scripts", message));
                    }
                }

                if background.shift_remove("page").is_some() {
                    notes.push((
                        "background.page",
                        "background pages are not supported in Chrome MV3 and were removed"
                            .to_string(),
                    ));
                }
                background.shift_remove("persistent");
            }
            for (subject, message) in notes {
                pass.warn(WarningKind::ApiShapeChanged, subject, message);
            }
            for (subject, message) in dropped {
                pass.warn(WarningKind::FieldDropped, subject, message);
            }
        }

        if let Some(sidebar) = pass.manifest.remove("sidebar_action") {
            match sidebar.get("default_panel").and_then(Value::as_str) {
                Some(_) if pass.manifest.contains_key("side_panel") => pass.warn(
                    WarningKind::FieldDropped,
                    "sidebar_action",
                    "sidebar dropped in favour of the existing side_panel",
                ),
                Some(path) => {
                    pass.manifest
                        .insert("side_panel", json!({ "default_path": path }));
                    pass.add_permission("sidePanel");
                    pass.warn(
                        WarningKind::ApiShapeChanged,
                        "sidebar_action",
                        "sidebar converted to side_panel; browser.sidebarAction calls need porting",
                    );
                }
                None => pass.warn(
                    WarningKind::FieldDropped,
                    "sidebar_action",
                    "sidebar without a default_panel cannot become a side panel",
                ),
            }
        }

        pass.map_permissions(ContainerKind::Chrome);

        if manifest_version == Some(2) {
            pass.warn(
                WarningKind::ManifestVersionDeprecated,
                "manifest_version",
                "Chrome no longer loads Manifest V2 extensions from the Web Store; migrate to V3",
            );
        }
    }
}

/// Working state of one translation
struct Pass {
    manifest: ManifestDocument,
    warnings: Vec<TranslationWarning>,
}

impl Pass {
    fn warn(&mut self, kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(TranslationWarning::new(kind, subject, message));
    }

    fn drop_keys(&mut self, keys: &[&str], reason: &str) {
        for key in keys {
            if self.manifest.remove(key).is_some() {
                self.warn(WarningKind::FieldDropped, *key, reason);
            }
        }
    }

    /// Map both permission lists, dropping duplicates created by renames
    fn map_permissions(&mut self, target: ContainerKind) {
        for key in PERMISSION_KEYS {
            let items = match self.manifest.get_mut(key) {
                Some(Value::Array(items)) => std::mem::take(items),
                _ => continue,
            };

            let mut mapped: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let Some(name) = item.as_str() else {
                    mapped.push(item);
                    continue;
                };
                let value = match map_permission(name, target) {
                    PermissionMapping::Keep => name.to_string(),
                    PermissionMapping::Rename(renamed) => renamed.to_string(),
                    PermissionMapping::Drop => {
                        self.warn(
                            WarningKind::PermissionDropped,
                            name,
                            format!("'{}' is not available in {}", name, target),
                        );
                        continue;
                    }
                };
                if !mapped.iter().any(|v| v.as_str() == Some(value.as_str())) {
                    mapped.push(Value::String(value));
                }
            }

            // Existing keys keep their position on insert
            self.manifest.insert(*key, Value::Array(mapped));
        }
    }

    fn add_permission(&mut self, permission: &str) {
        self.append_unique("permissions", permission.to_string());
    }

    fn append_unique(&mut self, key: &str, value: String) {
        match self.manifest.get_mut(key) {
            Some(Value::Array(items)) => {
                if !items.iter().any(|v| v.as_str() == Some(value.as_str())) {
                    items.push(Value::String(value));
                }
            }
            _ => {
                self.manifest.insert(key, json!([value]));
            }
        }
    }
}

/// Lower a Manifest V3 manifest to V2 for Firefox profiles without MV3
fn downgrade_to_v2(pass: &mut Pass) {
    pass.manifest.insert("manifest_version", json!(2));

    if let Some(action) = pass.manifest.remove("action") {
        if !pass.manifest.contains_key("browser_action") {
            pass.manifest.insert("browser_action", action);
        }
    }

    for (from, into) in [
        ("host_permissions", "permissions"),
        ("optional_host_permissions", "optional_permissions"),
    ] {
        let hosts = pass.manifest.string_list(from);
        if pass.manifest.remove(from).is_none() {
            continue;
        }
        for host in hosts {
            pass.append_unique(into, host);
        }
    }

    if let Some(Value::Array(items)) = pass.manifest.get("web_accessible_resources") {
        if items.iter().any(Value::is_object) {
            let mut flat: Vec<Value> = Vec::new();
            for item in items {
                let resources = match item {
                    Value::Object(entry) => entry
                        .get("resources")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default(),
                    Value::String(_) => vec![item.clone()],
                    _ => Vec::new(),
                };
                for resource in resources {
                    if !flat.contains(&resource) {
                        flat.push(resource);
                    }
                }
            }
            pass.manifest
                .insert("web_accessible_resources", Value::Array(flat));
        }
    }

    if let Some(Value::Object(csp)) = pass.manifest.get("content_security_policy") {
        let policy = csp.get("extension_pages").cloned();
        match policy {
            Some(policy @ Value::String(_)) => {
                pass.manifest.insert("content_security_policy", policy);
            }
            _ => {
                pass.manifest.remove("content_security_policy");
            }
        }
    }

    pass.warn(
        WarningKind::ManifestDowngraded,
        "manifest_version",
        "Manifest V3 lowered to V2 for the configured Firefox profile",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> ManifestDocument {
        ManifestDocument::from_value(value).unwrap()
    }

    fn to_firefox(value: Value) -> Translation {
        ManifestTranslator::default().translate(doc(value), ContainerKind::Chrome, ContainerKind::Firefox)
    }

    fn to_chrome(value: Value) -> Translation {
        ManifestTranslator::default().translate(doc(value), ContainerKind::Firefox, ContainerKind::Chrome)
    }

    #[test]
    fn test_same_kind_is_identity() {
        let source = doc(json!({"manifest_version": 3, "name": "X", "key": "abc"}));
        let out = ManifestTranslator::default().translate(
            source.clone(),
            ContainerKind::Chrome,
            ContainerKind::Chrome,
        );
        assert_eq!(out.manifest, source);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_service_worker_becomes_background_script() {
        let out = to_firefox(json!({
            "manifest_version": 3,
            "name": "Demo",
            "version": "1.0",
            "background": {"service_worker": "sw.js", "type": "module"}
        }));
        let background = out.manifest.get("background").unwrap();
        assert_eq!(background["scripts"], json!(["sw.js"]));
        assert_eq!(background["type"], json!("module"));
        assert!(background.get("service_worker").is_none());
        assert_eq!(out.warnings_of(WarningKind::ApiShapeChanged).count(), 1);
        assert_eq!(out.manifest.manifest_version(), Some(3));
    }

    #[test]
    fn test_gecko_id_synthesized_and_deterministic() {
        let a = to_firefox(json!({"manifest_version": 3, "name": "Demo"}));
        let b = to_firefox(json!({"manifest_version": 3, "name": "Demo"}));
        let id = &a.manifest.get("browser_specific_settings").unwrap()["gecko"]["id"];
        assert_eq!(id, &b.manifest.get("browser_specific_settings").unwrap()["gecko"]["id"]);

        let id = id.as_str().unwrap();
        assert!(id.starts_with('{') && id.ends_with('}'));
        assert_eq!(id, synthesize_gecko_id("Demo"));
        assert_ne!(synthesize_gecko_id("Demo"), synthesize_gecko_id("Other"));
    }

    #[test]
    fn test_existing_gecko_id_and_legacy_applications_kept() {
        let out = to_firefox(json!({
            "name": "Demo",
            "applications": {"gecko": {"id": "demo@example.com"}}
        }));
        assert!(!out.manifest.contains_key("applications"));
        assert_eq!(
            out.manifest.get("browser_specific_settings").unwrap()["gecko"]["id"],
            json!("demo@example.com")
        );
    }

    #[test]
    fn test_strict_min_version_from_options() {
        let translator = ManifestTranslator::new(TranslatorOptions {
            firefox_manifest_v3: true,
            strict_min_version: Some("115.0".to_string()),
        });
        let out = translator.translate(
            doc(json!({"name": "Demo"})),
            ContainerKind::Chrome,
            ContainerKind::Firefox,
        );
        assert_eq!(
            out.manifest.get("browser_specific_settings").unwrap()["gecko"]["strict_min_version"],
            json!("115.0")
        );
    }

    #[test]
    fn test_chrome_only_keys_and_permissions_dropped() {
        let out = to_firefox(json!({
            "manifest_version": 3,
            "name": "Demo",
            "key": "MIIB...",
            "update_url": "https://clients2.google.com/service/update2/crx",
            "permissions": ["tabs", "sidePanel", "storage", "<all_urls>", "tabs"],
            "optional_permissions": ["enterprise.platformKeys", "cookies"]
        }));
        assert!(!out.manifest.contains_key("key"));
        assert!(!out.manifest.contains_key("update_url"));
        assert_eq!(out.warnings_of(WarningKind::FieldDropped).count(), 2);

        assert_eq!(
            out.manifest.get("permissions").unwrap(),
            &json!(["tabs", "storage", "<all_urls>"])
        );
        assert_eq!(out.manifest.get("optional_permissions").unwrap(), &json!(["cookies"]));

        let dropped: Vec<&str> = out
            .warnings_of(WarningKind::PermissionDropped)
            .map(|w| w.subject.as_str())
            .collect();
        assert_eq!(dropped, vec!["sidePanel", "enterprise.platformKeys"]);
    }

    #[test]
    fn test_side_panel_becomes_sidebar() {
        let out = to_firefox(json!({
            "name": "Demo",
            "side_panel": {"default_path": "panel.html"}
        }));
        assert_eq!(
            out.manifest.get("sidebar_action").unwrap(),
            &json!({"default_panel": "panel.html"})
        );
        assert!(!out.manifest.contains_key("side_panel"));
    }

    #[test]
    fn test_side_panel_messages_follow_cause() {
        let out = to_firefox(json!({
            "name": "Demo",
            "side_panel": {"default_path": "panel.html"},
            "sidebar_action": {"default_panel": "own.html"}
        }));
        assert_eq!(
            out.manifest.get("sidebar_action").unwrap(),
            &json!({"default_panel": "own.html"})
        );
        let dropped: Vec<&TranslationWarning> = out
            .warnings_of(WarningKind::FieldDropped)
            .filter(|w| w.subject == "side_panel")
            .collect();
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].message.contains("existing sidebar_action"));

        let out = to_firefox(json!({"name": "Demo", "side_panel": {}}));
        assert!(!out.manifest.contains_key("sidebar_action"));
        let dropped = out
            .warnings_of(WarningKind::FieldDropped)
            .find(|w| w.subject == "side_panel")
            .unwrap();
        assert!(dropped.message.contains("without a default_path"));
    }

    #[test]
    fn test_service_worker_dropped_when_scripts_exist() {
        let out = to_firefox(json!({
            "manifest_version": 3,
            "name": "Demo",
            "background": {"service_worker": "sw.js", "scripts": ["bg.js"]}
        }));
        assert_eq!(
            out.manifest.get("background").unwrap(),
            &json!({"scripts": ["bg.js"]})
        );
        let warning = out
            .warnings
            .iter()
            .find(|w| w.subject == "background.service_worker")
            .unwrap();
        assert_eq!(warning.kind, WarningKind::FieldDropped);
        assert!(warning.message.contains("existing background scripts"));
        assert!(!warning.message.contains("now runs"));
    }

    #[test]
    fn test_sidebar_dropped_when_side_panel_exists() {
        let out = to_chrome(json!({
            "manifest_version": 3,
            "name": "Demo",
            "background": {"service_worker": "sw.js", "scripts": ["bg.js"]},
            "side_panel": {"default_path": "own.html"},
            "sidebar_action": {"default_panel": "side.html"}
        }));
        assert_eq!(
            out.manifest.get("side_panel").unwrap(),
            &json!({"default_path": "own.html"})
        );
        assert_eq!(
            out.manifest.get("background").unwrap(),
            &json!({"service_worker": "sw.js"})
        );
        let messages: Vec<(&str, &str)> = out
            .warnings_of(WarningKind::FieldDropped)
            .map(|w| (w.subject.as_str(), w.message.as_str()))
            .collect();
        assert!(messages.contains(&(
            "sidebar_action",
            "sidebar dropped in favour of the existing side_panel"
        )));
        assert!(messages.contains(&(
            "background.scripts",
            "bg.js dropped in favour of the existing service worker"
        )));
        assert_eq!(out.warnings_of(WarningKind::ApiShapeChanged).count(), 0);
    }

    #[test]
    fn test_downgrade_when_firefox_profile_lacks_mv3() {
        let translator = ManifestTranslator::new(TranslatorOptions {
            firefox_manifest_v3: false,
            strict_min_version: None,
        });
        let out = translator.translate(
            doc(json!({
                "manifest_version": 3,
                "name": "Demo",
                "action": {"default_popup": "popup.html"},
                "permissions": ["tabs"],
                "host_permissions": ["*://*.example.com/*"],
                "web_accessible_resources": [
                    {"resources": ["a.png", "b.png"], "matches": ["<all_urls>"]},
                    {"resources": ["a.png"], "matches": ["*://x.test/*"]}
                ],
                "content_security_policy": {"extension_pages": "script-src 'self'"}
            })),
            ContainerKind::Chrome,
            ContainerKind::Firefox,
        );

        let m = &out.manifest;
        assert_eq!(m.manifest_version(), Some(2));
        assert!(m.contains_key("browser_action"));
        assert!(!m.contains_key("action"));
        assert!(!m.contains_key("host_permissions"));
        assert_eq!(m.get("permissions").unwrap(), &json!(["tabs", "*://*.example.com/*"]));
        assert_eq!(m.host_patterns(), vec!["*://*.example.com/*".to_string()]);
        assert_eq!(m.get("web_accessible_resources").unwrap(), &json!(["a.png", "b.png"]));
        assert_eq!(m.get("content_security_policy").unwrap(), &json!("script-src 'self'"));
        assert_eq!(out.warnings_of(WarningKind::ManifestDowngraded).count(), 1);
    }

    #[test]
    fn test_firefox_background_scripts_become_service_worker() {
        let out = to_chrome(json!({
            "manifest_version": 3,
            "name": "Demo",
            "background": {"scripts": ["bg.js", "lib.js"], "page": "bg.html"},
            "browser_specific_settings": {"gecko": {"id": "demo@example.com"}}
        }));
        let background = out.manifest.get("background").unwrap();
        assert_eq!(background, &json!({"service_worker": "bg.js"}));
        assert!(!out.manifest.contains_key("browser_specific_settings"));

        let shape: Vec<&TranslationWarning> = out.warnings_of(WarningKind::ApiShapeChanged).collect();
        assert_eq!(shape.len(), 2);
        assert!(shape[0].message.contains("lib.js"));
        assert_eq!(shape[1].subject, "background.page");
    }

    #[test]
    fn test_sidebar_becomes_side_panel_with_permission() {
        let out = to_chrome(json!({
            "manifest_version": 3,
            "name": "Demo",
            "sidebar_action": {"default_panel": "side.html", "default_title": "Side"},
            "permissions": ["menus", "contextMenus", "dns"]
        }));
        assert_eq!(
            out.manifest.get("side_panel").unwrap(),
            &json!({"default_path": "side.html"})
        );
        assert_eq!(
            out.manifest.get("permissions").unwrap(),
            &json!(["contextMenus", "sidePanel"])
        );
        assert_eq!(out.warnings_of(WarningKind::PermissionDropped).count(), 1);
    }

    #[test]
    fn test_mv2_for_chrome_is_deprecated_not_rejected() {
        let out = to_chrome(json!({
            "manifest_version": 2,
            "name": "Old",
            "background": {"scripts": ["bg.js"], "persistent": false}
        }));
        assert_eq!(out.manifest.manifest_version(), Some(2));
        assert_eq!(out.manifest.get("background").unwrap()["scripts"], json!(["bg.js"]));
        assert_eq!(out.warnings_of(WarningKind::ManifestVersionDeprecated).count(), 1);
    }

    #[test]
    fn test_round_trip_keeps_background_worker() {
        let original = json!({
            "manifest_version": 3,
            "name": "Demo",
            "version": "1.0",
            "background": {"service_worker": "sw.js"},
            "permissions": ["tabs", "storage"]
        });
        let firefox = to_firefox(original.clone());
        let chrome = ManifestTranslator::default().translate(
            firefox.manifest,
            ContainerKind::Firefox,
            ContainerKind::Chrome,
        );
        assert_eq!(chrome.manifest, doc(original));
    }

    #[test]
    fn test_warning_display() {
        let warning = TranslationWarning::new(WarningKind::PermissionDropped, "dns", "gone");
        assert_eq!(warning.to_string(), "[permission_dropped] dns: gone");
    }
}
