//! 权限门：动作名 -> 是否允许；缺省拒绝

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 权限表：未出现的动作视为不允许
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(HashMap<String, bool>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), true);
        self
    }

    pub fn deny(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), false);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, allowed: bool) {
        self.0.insert(name.into(), allowed);
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

impl FromIterator<(String, bool)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, bool); N]> for PermissionMap {
    fn from(entries: [(&str, bool); N]) -> Self {
        entries
            .into_iter()
            .map(|(name, allowed)| (name.to_string(), allowed))
            .collect()
    }
}

/// 执行前的权限检查
pub fn is_permitted(name: &str, permissions: &PermissionMap) -> bool {
    permissions.is_allowed(name)
}
