//! Integration tests for identity resolution and installed-package matching.

mod support;

use std::sync::Arc;

use sideload_core::identity::{
    DeterministicEncoder, IdentityError, IdentityFields, IdentityResolver,
};
use sideload_core::manifest::ManifestParser;
use sideload_core::matcher::{find_exact, find_loose};
use sideload_core::types::Architecture;
use tempfile::TempDir;

use support::{PUBLISHER, installed, manifest_xml, write_package};

fn fields(architecture: Architecture) -> IdentityFields {
    IdentityFields::new("Contoso.App", "App", PUBLISHER, "1.0.0.0").with_architecture(architecture)
}

#[test]
fn identity_from_manifest_without_encoder_is_incomplete() {
    let temp = TempDir::new().unwrap();
    let package = write_package(
        temp.path(),
        "main.appx",
        &manifest_xml("Contoso.App", "1.0.0.0", "x64", &[]),
    );
    let manifest = ManifestParser::new().parse(&package).unwrap();

    let identity = IdentityResolver::default().resolve(&manifest).unwrap();

    assert_eq!(identity.package_name, "Contoso.App");
    assert_eq!(identity.cpu_architecture, Architecture::X64);
    assert!(identity.package_full_name.is_empty());
    assert!(identity.launch_id.is_empty());
    assert!(!identity.complete_identity);
}

#[test]
fn identity_with_encoder_is_complete() {
    let resolver = IdentityResolver::new(Arc::new(DeterministicEncoder));

    let identity = resolver.resolve_fields(fields(Architecture::X64)).unwrap();

    assert!(identity.complete_identity);
    assert!(identity.package_full_name.starts_with("Contoso.App_1.0.0.0_x64__"));
    assert_eq!(
        identity.launch_id,
        format!("{}!App", identity.package_family_name)
    );
}

#[test]
fn blank_fields_are_rejected_in_order() {
    let resolver = IdentityResolver::default();

    let err = resolver
        .resolve_fields(IdentityFields::new(" ", "", "", ""))
        .unwrap_err();
    assert_eq!(err, IdentityError::BlankField("PackageName"));

    let err = resolver
        .resolve_fields(IdentityFields::new("Contoso.App", "App", PUBLISHER, ""))
        .unwrap_err();
    assert_eq!(err.to_string(), "Version is invalid");
}

#[test]
fn exact_match_disambiguates_by_architecture() {
    let target = IdentityResolver::default()
        .resolve_fields(fields(Architecture::Arm))
        .unwrap();
    let packages = vec![
        installed(
            "Contoso.App",
            "1.0.0.0",
            "Contoso.App_1.0.0.0_x64__hash",
            "Contoso.App_hash!App",
        ),
        installed(
            "Contoso.App",
            "1.0.0.0",
            "Contoso.App_1.0.0.0_arm__hash",
            "Contoso.App_hash!App",
        ),
    ];

    let found = find_exact(&target, &packages, 0).unwrap();

    assert_eq!(found.full_name, "Contoso.App_1.0.0.0_arm__hash");
}

#[test]
fn exact_match_with_single_candidate_ignores_full_name_shape() {
    let target = IdentityResolver::default()
        .resolve_fields(fields(Architecture::X64))
        .unwrap();
    let packages = vec![installed(
        "Contoso.App",
        "1.0.0.0",
        "Contoso.App_1.0.0.0_x64_hash",
        "Contoso.App_hash!App",
    )];

    assert!(find_exact(&target, &packages, 0).is_some());
}

#[test]
fn malformed_full_names_never_disambiguate() {
    let target = IdentityResolver::default()
        .resolve_fields(fields(Architecture::X64))
        .unwrap();
    let packages = vec![
        installed("Contoso.App", "1.0.0.0", "Contoso.App_1.0.0.0_x64_hash", "Contoso.App_hash!App"),
        installed("Contoso.App", "1.0.0.0", "Contoso.App_1.0.0.0_x64", "Contoso.App_hash!App"),
    ];

    assert!(find_exact(&target, &packages, 2).is_none());
}

#[test]
fn exact_match_requires_version_and_app_id() {
    let target = IdentityResolver::default()
        .resolve_fields(fields(Architecture::X64))
        .unwrap();
    let packages = vec![
        installed("Contoso.App", "2.0.0.0", "Contoso.App_2.0.0.0_x64__hash", "Contoso.App_hash!App"),
        installed("Contoso.App", "1.0.0.0", "Contoso.App_1.0.0.0_x64__hash", "Contoso.App_hash!Other"),
    ];

    assert!(find_exact(&target, &packages, 0).is_none());
}

#[test]
fn loose_match_ignores_version() {
    let target = IdentityResolver::default()
        .resolve_fields(fields(Architecture::X64))
        .unwrap();
    let mut other_publisher = installed("Contoso.App", "1.0.0.0", "x", "y");
    other_publisher.publisher = "CN=Fabrikam".to_string();
    let packages = vec![
        installed("Contoso.App", "0.9.0.0", "Contoso.App_0.9.0.0_x64__hash", "Contoso.App_hash!App"),
        installed("Contoso.Other", "1.0.0.0", "Contoso.Other_1.0.0.0_x64__hash", "Contoso.Other_hash!App"),
        other_publisher,
    ];

    let found = find_loose(&target, &packages);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].version, "0.9.0.0");
}
