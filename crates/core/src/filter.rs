// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Label filter sent with each dequeue request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Label key every agent advertises.
pub const PLATFORM_LABEL: &str = "platform";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid filter label '{0}': expected key=value")]
    InvalidLabel(String),
}

/// Label predicate the queue uses to hand out only compatible jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Filter {
    pub fn for_platform(platform: impl Into<String>) -> Self {
        Self::default().with_label(PLATFORM_LABEL, platform)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Merge comma separated `key=value` pairs into the filter.
    ///
    /// Blank entries are ignored; later keys override earlier ones.
    pub fn with_labels_str(mut self, spec: &str) -> Result<Self, FilterError> {
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| FilterError::InvalidLabel(entry.to_string()))?;
            self.labels
                .insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(self)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
