//! The authenticated principal and its derived admin view.

use serde::{Deserialize, Serialize};

use crate::types::GroupName;

/// Profile payload returned by the provider's user-info endpoint.
///
/// Unknown fields (`id`, ...) are ignored. Group claims arrive as raw
/// distinguished names and are normalized by [`Principal::from_user_info`];
/// a `null` or absent `memberOf` means no groups.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub login: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "memberOf")]
    pub member_of: Option<Vec<String>>,
}

/// The logged-in user as stored in the session.
///
/// There is deliberately no admin flag here; see [`CurrentUser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub login: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "memberOf")]
    pub member_of: Vec<GroupName>,
}

impl Principal {
    /// Build a principal from a provider profile, normalizing every group claim.
    pub fn from_user_info(info: UserInfo) -> Self {
        Self {
            login: info.login,
            display_name: info.display_name.filter(|n| !n.is_empty()),
            name: info.name.filter(|n| !n.is_empty()),
            email: info.email.filter(|e| !e.is_empty()),
            member_of: info
                .member_of
                .unwrap_or_default()
                .iter()
                .map(|raw| normalize_group(raw))
                .collect(),
        }
    }

    /// Human-readable name: `displayName`, then `name`, then the login.
    pub fn display(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.login)
    }

    /// Exact, case-sensitive membership test against the normalized groups.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.member_of.iter().any(|g| g.as_str() == group)
    }
}

/// Reduce a raw group claim to its identifier.
///
/// `CN=ADMIN,OU=ORGA,DC=example` becomes `ADMIN`: keep the first
/// comma-separated component, then drop a leading `CN=`.
pub fn normalize_group(raw: &str) -> GroupName {
    let first = raw.split(',').next().unwrap_or_default();
    GroupName::new(first.strip_prefix("CN=").unwrap_or(first))
}

/// A principal together with its role, as derived on this read.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl CurrentUser {
    /// Derive the role from the given admin group.
    pub fn derive(principal: Principal, admin_group: &GroupName) -> Self {
        let is_admin = principal.is_member_of(admin_group.as_str());
        Self {
            principal,
            is_admin,
        }
    }
}
