//! Effective settings for the current page
//!
//! Override keys come in two shapes:
//! - `hostname/pathFragment`: matches when the page hostname contains the
//!   hostname part and the URL contains `/pathFragment`
//! - `hostname`: matches the exact hostname or any subdomain of it
//!
//! The first matching override in map order is merged over the global
//! settings. Nothing is cached: in-page navigation can change the answer.

use tracing::{debug, trace};
use url::Url;

use crate::settings::{DomainOverride, DomainOverrides, EffectiveSettings, GlobalSettings};

/// Merge the first override matching `current_url` over `global`
pub fn resolve(
    global: &GlobalSettings,
    overrides: &DomainOverrides,
    current_url: &str,
) -> EffectiveSettings {
    match matching_override(overrides, current_url) {
        Some((key, over)) => {
            trace!(key = %key, url = %current_url, "Applying site override");
            over.merged_over(global)
        }
        None => global.clone(),
    }
}

/// First `(key, override)` in map order that applies to `current_url`
pub fn matching_override<'a>(
    overrides: &'a DomainOverrides,
    current_url: &str,
) -> Option<(&'a str, &'a DomainOverride)> {
    if overrides.is_empty() {
        return None;
    }
    let hostname = match Url::parse(current_url) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return None,
        },
        Err(e) => {
            debug!(url = %current_url, error = %e, "Cannot parse page URL, no override applies");
            return None;
        }
    };

    overrides
        .iter()
        .find(|(key, _)| key_matches(key, &hostname, current_url))
        .map(|(key, over)| (key.as_str(), over))
}

fn key_matches(key: &str, hostname: &str, current_url: &str) -> bool {
    let key = key.trim().to_ascii_lowercase();
    if key.is_empty() {
        return false;
    }
    match key.split_once('/') {
        Some((host_part, path_fragment)) => {
            hostname.contains(host_part) && current_url.contains(&format!("/{path_fragment}"))
        }
        None => hostname == key || hostname.ends_with(&format!(".{key}")),
    }
}
