//! Capability categories and the aggregated listing.
//!
//! The category set is closed: tools, prompts and resources. Each category
//! knows its listing method and the result key holding its items, which is
//! the whole dispatch table for listing.

use std::fmt;

use serde::Deserialize;

use crate::error::CapabilityListingError;

/// Placeholder shown for capabilities without a description.
pub const NO_DESCRIPTION: &str = "No description";

/// One of the three kinds of server-advertised functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityCategory {
    /// Invocable actions.
    Tools,
    /// Predefined prompt templates.
    Prompts,
    /// Addressable data resources.
    Resources,
}

impl CapabilityCategory {
    /// All categories, in listing order.
    pub const ALL: [Self; 3] = [Self::Tools, Self::Prompts, Self::Resources];

    /// Lower-case category name, also the key of the items in a list result.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Prompts => "prompts",
            Self::Resources => "resources",
        }
    }

    /// JSON-RPC method listing this category.
    #[must_use]
    pub const fn list_method(self) -> &'static str {
        match self {
            Self::Tools => "tools/list",
            Self::Prompts => "prompts/list",
            Self::Resources => "resources/list",
        }
    }
}

impl fmt::Display for CapabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single advertised capability.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapabilityDescriptor {
    /// Capability name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl CapabilityDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }

    /// Replaces a missing or blank description with [`NO_DESCRIPTION`].
    #[must_use]
    pub fn with_default_description(mut self) -> Self {
        let blank = self
            .description
            .as_deref()
            .map_or(true, |d| d.trim().is_empty());
        if blank {
            self.description = Some(NO_DESCRIPTION.to_string());
        }
        self
    }

    /// Returns the description, or [`NO_DESCRIPTION`].
    #[must_use]
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }
}

/// The outcome of listing one category.
pub type CategoryResult = Result<Vec<CapabilityDescriptor>, CapabilityListingError>;

/// Per-category results of a capability listing.
///
/// Every slot is filled: a failed category holds its own error while the
/// others keep their items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityListing {
    tools: CategoryResult,
    prompts: CategoryResult,
    resources: CategoryResult,
}

impl Default for CapabilityListing {
    fn default() -> Self {
        Self {
            tools: Ok(Vec::new()),
            prompts: Ok(Vec::new()),
            resources: Ok(Vec::new()),
        }
    }
}

impl CapabilityListing {
    /// Returns the result for `category`.
    #[must_use]
    pub const fn get(&self, category: CapabilityCategory) -> &CategoryResult {
        match category {
            CapabilityCategory::Tools => &self.tools,
            CapabilityCategory::Prompts => &self.prompts,
            CapabilityCategory::Resources => &self.resources,
        }
    }

    /// Stores the result for `category`, replacing any previous one.
    pub fn set(&mut self, category: CapabilityCategory, result: CategoryResult) {
        let slot = match category {
            CapabilityCategory::Tools => &mut self.tools,
            CapabilityCategory::Prompts => &mut self.prompts,
            CapabilityCategory::Resources => &mut self.resources,
        };
        *slot = result;
    }

    /// Iterates over all categories in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityCategory, &CategoryResult)> {
        CapabilityCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    /// Returns `true` if every category failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.iter().all(|(_, result)| result.is_err())
    }
}
