//! Extraction of identity fields from manifest XML.
//!
//! Elements are matched by local name, so the foundation namespace and any
//! prefixed extension namespaces are accepted alike.

use roxmltree::{Document, Node};
use tracing::warn;

use super::{DependencyRequirement, ManifestFields};
use crate::types::Architecture;

/// Fields and declared dependencies of an application manifest.
#[derive(Debug)]
pub(crate) struct ManifestDocument {
    pub fields: ManifestFields,
    pub dependencies: Vec<DependencyRequirement>,
}

/// Why a manifest is not a usable application manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NotAnApplication(pub String);

pub(crate) fn parse_document(text: &str) -> Result<ManifestDocument, NotAnApplication> {
    let doc = Document::parse(text)
        .map_err(|e| NotAnApplication(format!("malformed manifest XML: {}", e)))?;
    let root = doc.root_element();

    let identity =
        child(root, "Identity").ok_or_else(|| NotAnApplication("missing Identity".into()))?;

    let package_name = required_attribute(identity, "Name")?;
    let publisher = required_attribute(identity, "Publisher")?;
    let version = required_attribute(identity, "Version")?;

    // Framework packages declare no Application; one without an Id is broken.
    let app_id = match child(root, "Applications").and_then(|apps| child(apps, "Application")) {
        Some(app) => app
            .attribute("Id")
            .map(str::to_string)
            .ok_or_else(|| NotAnApplication("missing Application Id".into()))?,
        None => String::new(),
    };

    let cpu_architecture = match identity.attribute("ProcessorArchitecture") {
        Some(raw) => raw
            .parse::<Architecture>()
            .map_err(|e| NotAnApplication(e.to_string()))?,
        None => Architecture::default(),
    };
    let resource_id = identity.attribute("ResourceId").unwrap_or_default().to_string();

    let is_framework = child(root, "Properties")
        .and_then(|props| child(props, "Framework"))
        .and_then(|framework| framework.text())
        .is_some_and(|text| text.trim().eq_ignore_ascii_case("true"));

    Ok(ManifestDocument {
        fields: ManifestFields {
            package_name,
            publisher,
            version,
            app_id,
            cpu_architecture,
            resource_id,
            is_framework,
        },
        dependencies: declared_dependencies(root),
    })
}

fn declared_dependencies(root: Node<'_, '_>) -> Vec<DependencyRequirement> {
    let Some(dependencies) = child(root, "Dependencies") else {
        return Vec::new();
    };

    dependencies
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "PackageDependency")
        .filter_map(|node| {
            let Some(name) = node.attribute("Name") else {
                warn!("Ignoring PackageDependency without a Name");
                return None;
            };
            Some(DependencyRequirement {
                name: name.to_string(),
                min_version: node.attribute("MinVersion").and_then(|v| v.parse().ok()),
            })
        })
        .collect()
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn required_attribute(node: Node<'_, '_>, name: &str) -> Result<String, NotAnApplication> {
    node.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| NotAnApplication(format!("missing Identity attribute '{}'", name)))
}
