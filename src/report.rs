//! Plain-text rendering of a capability listing.

use crate::mcp::capability::CategoryResult;
use crate::mcp::{CapabilityCategory, CapabilityListing};

const RULE_WIDTH: usize = 50;
const SECTION_RULE_WIDTH: usize = 30;

/// Renders the "MCP Server Members" report printed by `--members`.
#[must_use]
pub fn members_report(listing: &CapabilityListing) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("MCP Server Members\n{rule}\n");

    for (category, result) in listing.iter() {
        out.push('\n');
        out.push_str(&category_section(category, result));
    }

    out.push_str(&format!("\n{rule}\n"));
    out
}

/// Renders one category block of the report, without the leading blank line.
#[must_use]
pub fn category_section(category: CapabilityCategory, result: &CategoryResult) -> String {
    let heading = category.name().to_uppercase();

    match result {
        Ok(items) if items.is_empty() => format!("{heading}: None available\n"),
        Ok(items) => {
            let mut out = format!(
                "{heading} ({}):\n{}\n",
                items.len(),
                "-".repeat(SECTION_RULE_WIDTH)
            );
            for item in items {
                out.push_str(&format!(" > {} - {}\n", item.name, item.description_or_default()));
            }
            out
        }
        Err(e) => format!("{heading}: Error - {}\n", e.reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityListingError;
    use crate::mcp::CapabilityDescriptor;

    #[test]
    fn renders_each_section_kind() {
        let mut listing = CapabilityListing::default();
        listing.set(
            CapabilityCategory::Tools,
            Ok(vec![
                CapabilityDescriptor::new("add", Some("adds two numbers")),
                CapabilityDescriptor::new("echo", None),
            ]),
        );
        listing.set(
            CapabilityCategory::Resources,
            Err(CapabilityListingError {
                category: "resources",
                reason: "request 'resources/list' timed out after 30s".to_string(),
            }),
        );

        let report = members_report(&listing);
        let expected = "\
MCP Server Members
==================================================

TOOLS (2):
------------------------------
 > add - adds two numbers
 > echo - No description

PROMPTS: None available

RESOURCES: Error - request 'resources/list' timed out after 30s

==================================================
";
        assert_eq!(report, expected);
    }
}
