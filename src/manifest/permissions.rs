// src/manifest/permissions.rs

//! Permission correspondence between Chrome and Firefox
//!
//! Names both browsers understand map to themselves. Browser-exclusive
//! permissions have no counterpart and are dropped. Anything not listed
//! here (including host match patterns) passes through unchanged.

use crate::package::ContainerKind;

/// Permissions only Chrome implements
pub const CHROME_ONLY: &[&str] = &[
    "background",
    "certificateProvider",
    "contentSettings",
    "debugger",
    "declarativeContent",
    "desktopCapture",
    "documentScan",
    "fileBrowserHandler",
    "fileSystemProvider",
    "fontSettings",
    "gcm",
    "loginState",
    "offscreen",
    "platformKeys",
    "printerProvider",
    "printing",
    "printingMetrics",
    "processes",
    "readingList",
    "sidePanel",
    "system.cpu",
    "system.display",
    "system.memory",
    "system.storage",
    "tabCapture",
    "tabGroups",
    "transientBackground",
    "ttsEngine",
    "vpnProvider",
    "wallpaper",
    "webAuthenticationProxy",
];

/// Permission namespaces only Chrome implements
const CHROME_ONLY_PREFIXES: &[&str] = &["enterprise."];

/// Permissions only Firefox implements
pub const FIREFOX_ONLY: &[&str] = &[
    "activeTab.all",
    "browserSettings",
    "captivePortal",
    "contextualIdentities",
    "dns",
    "find",
    "geckoProfiler",
    "menus.overrideContext",
    "mozillaAddons",
    "network.interfaces",
    "nativeMessaging.all",
    "normandyAddonStudy",
    "pkcs11",
    "telemetry",
    "theme",
    "webRequestFilterResponse",
    "webRequestFilterResponse.serviceWorkerScript",
];

/// Firefox names with a differently named Chrome equivalent
const FIREFOX_TO_CHROME: &[(&str, &str)] = &[("menus", "contextMenus")];

/// Result of mapping one permission to a target browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionMapping {
    /// Same name is valid in the target browser
    Keep,
    /// Target browser uses a different name
    Rename(&'static str),
    /// No equivalent in the target browser
    Drop,
}

/// Whether a permission string is a host match pattern
pub fn is_host_pattern(permission: &str) -> bool {
    permission == "<all_urls>" || permission.contains("://")
}

/// Map a permission from the other browser into `target`
pub fn map_permission(permission: &str, target: ContainerKind) -> PermissionMapping {
    if is_host_pattern(permission) {
        return PermissionMapping::Keep;
    }

    match target {
        ContainerKind::Firefox => {
            if CHROME_ONLY.contains(&permission)
                || CHROME_ONLY_PREFIXES.iter().any(|p| permission.starts_with(p))
            {
                PermissionMapping::Drop
            } else {
                PermissionMapping::Keep
            }
        }
        ContainerKind::Chrome => {
            if let Some((_, chrome)) = FIREFOX_TO_CHROME.iter().find(|(ff, _)| *ff == permission) {
                PermissionMapping::Rename(*chrome)
            } else if FIREFOX_ONLY.contains(&permission) {
                PermissionMapping::Drop
            } else {
                PermissionMapping::Keep
            }
        }
    }
}
