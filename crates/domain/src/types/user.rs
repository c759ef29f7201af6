//! Identity types
//!
//! The signed-in user as reported by the current-user endpoint, plus the
//! permission codes that gate UI features.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::{PERMISSION_NAMESPACE_SEPARATOR, PERMISSION_WILDCARD};

/// Identity attached to an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub sub: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Map a current-user response into session identity.
    ///
    /// Returns `None` when the id, display name or email is blank.
    pub fn from_profile(profile: &CurrentUserProfile) -> Option<Self> {
        let sub = profile.id.trim();
        let display_name = profile.display_name.trim();
        let email = profile.email.trim();
        if sub.is_empty() || display_name.is_empty() || email.is_empty() {
            return None;
        }

        let avatar_url = profile
            .avatar_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned);

        Some(Self {
            sub: sub.to_owned(),
            display_name: display_name.to_owned(),
            email: email.to_owned(),
            avatar_url,
            permissions: profile.permissions.clone(),
        })
    }

    pub fn permission_set(&self) -> PermissionSet {
        PermissionSet::new(&self.permissions)
    }
}

/// Response body of the current-user endpoint.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Normalised set of permission codes.
///
/// Codes look like `namespace:action`. `*` grants everything and
/// `namespace:*` grants every action in one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: BTreeSet<String>,
}

impl PermissionSet {
    /// Build a set, trimming codes and dropping blanks.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let permissions = codes
            .into_iter()
            .map(|code| code.as_ref().trim().to_owned())
            .filter(|code| !code.is_empty())
            .collect();
        Self { permissions }
    }

    /// Whether `code` is granted. Blank codes are never granted.
    pub fn can(&self, code: &str) -> bool {
        let target = code.trim();
        if target.is_empty() {
            return false;
        }

        if self.permissions.contains(PERMISSION_WILDCARD) || self.permissions.contains(target) {
            return true;
        }

        match target.find(PERMISSION_NAMESPACE_SEPARATOR) {
            Some(idx) if idx > 0 => {
                let wildcard = format!(
                    "{}{}{}",
                    &target[..idx],
                    PERMISSION_NAMESPACE_SEPARATOR,
                    PERMISSION_WILDCARD
                );
                self.permissions.contains(&wildcard)
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}
