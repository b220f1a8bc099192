//! Integration tests for the install operation.

mod support;

use std::sync::Arc;

use sideload_core::deploy::{
    DeployError, DeploymentOrchestrator, InstallRequest, Operation, OperationState,
};
use sideload_core::host::{HostError, InstallProgress};
use sideload_core::identity::{DeterministicEncoder, IdentityFields, IdentityResolver};
use sideload_core::types::Architecture;
use tempfile::TempDir;

use support::{Call, StubHost, fast_config, installed, manifest_xml, write_package};

fn main_package(temp: &TempDir) -> std::path::PathBuf {
    write_package(
        temp.path(),
        "main.appx",
        &manifest_xml("Contoso.App", "1.0.0.0", "x64", &[]),
    )
}

#[test]
fn missing_artifact_fails_without_host_calls() {
    let temp = TempDir::new().unwrap();
    let orchestrator = DeploymentOrchestrator::new(StubHost::new(), fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(temp.path().join("missing.appx")))
        .unwrap_err();

    assert_eq!(err.operation, Operation::Install);
    assert!(matches!(err.source, DeployError::ArtifactNotFound(_)));
    assert!(orchestrator.host().calls().is_empty());
    assert_eq!(orchestrator.state(), OperationState::Failed(Operation::Install));
}

#[test]
fn missing_certificate_fails_without_host_calls() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let orchestrator = DeploymentOrchestrator::new(StubHost::new(), fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package).with_certificate(temp.path().join("app.cer")))
        .unwrap_err();

    assert!(matches!(err.source, DeployError::CertificateNotFound(_)));
    assert!(orchestrator.host().calls().is_empty());
}

#[test]
fn invalid_manifest_fails_without_host_calls() {
    let temp = TempDir::new().unwrap();
    let package = write_package(
        temp.path(),
        "framework.appx",
        r#"<Package><Identity Name="Contoso.Framework" Publisher="CN=Contoso" Version="1.0.0.0" /></Package>"#,
    );
    let orchestrator = DeploymentOrchestrator::new(StubHost::new(), fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package))
        .unwrap_err();

    assert!(matches!(err.source, DeployError::InvalidManifest(_)));
    assert!(orchestrator.host().calls().is_empty());
}

#[test]
fn install_replaces_previous_versions() {
    let temp = TempDir::new().unwrap();
    let runtime = write_package(
        &temp.path().join("Dependencies"),
        "runtime.appx",
        &manifest_xml("Contoso.Runtime", "1.0.0.0", "x64", &[]),
    );
    let package = write_package(
        temp.path(),
        "main.appx",
        &manifest_xml("Contoso.App", "1.0.0.0", "x64", &["Contoso.Runtime"]),
    );
    let certificate = temp.path().join("app.cer");
    std::fs::write(&certificate, b"cert").unwrap();
    let host = StubHost::new().with_installed(vec![
        installed(
            "Contoso.App",
            "0.9.0.0",
            "Contoso.App_0.9.0.0_x64__hash",
            "Contoso.App_hash!App",
        ),
        installed(
            "Contoso.Other",
            "1.0.0.0",
            "Contoso.Other_1.0.0.0_x64__hash",
            "Contoso.Other_hash!App",
        ),
    ]);
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(1, 1)).unwrap();

    let report = orchestrator
        .install(&InstallRequest::new(&package).with_certificate(&certificate))
        .unwrap();

    assert_eq!(report.removed, vec!["Contoso.App_0.9.0.0_x64__hash"]);
    assert_eq!(report.identity.package_name, "Contoso.App");
    assert!(report.launched.is_none());

    let calls = orchestrator.host().calls();
    assert_eq!(calls[0], Call::List);
    assert_eq!(
        calls[1],
        Call::Uninstall("Contoso.App_0.9.0.0_x64__hash".to_string())
    );
    assert_eq!(calls.len(), 3);

    let requests = orchestrator.host().install_requests();
    let request = &requests[0];
    assert_eq!(request.artifact, std::path::absolute(&package).unwrap());
    assert_eq!(request.dependencies, vec![runtime]);
    assert_eq!(request.certificate, Some(std::path::absolute(&certificate).unwrap()));
    assert_eq!(request.timeout_ms, 500);
    assert_eq!(request.retry_count, 1);
    assert!(!request.move_only);
    assert!(request.destination.is_none());

    assert_eq!(
        orchestrator.state(),
        OperationState::Succeeded(Operation::Install)
    );
}

#[test]
fn failed_cleanup_aborts_before_install() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new()
        .with_installed(vec![installed(
            "Contoso.App",
            "0.9.0.0",
            "Contoso.App_0.9.0.0_x64__hash",
            "Contoso.App_hash!App",
        )])
        .failing_uninstall(HostError::new("package in use"));
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package))
        .unwrap_err();

    match &err.source {
        DeployError::Uninstall { full_name, source } => {
            assert_eq!(full_name, "Contoso.App_0.9.0.0_x64__hash");
            assert_eq!(source.message, "package in use");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(orchestrator.host().install_requests().is_empty());
    assert_eq!(orchestrator.state(), OperationState::Failed(Operation::Install));
}

#[test]
fn unreachable_host_fails_cleanup() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new().queue_list(Err(HostError::new("connection refused")));
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package))
        .unwrap_err();

    assert!(matches!(err.source, DeployError::HostUnavailable(_)));
    assert!(orchestrator.host().install_requests().is_empty());
}

#[test]
fn install_failure_reports_last_status_and_causes() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new()
        .with_progress(vec![
            InstallProgress::new("Uploading", "main.appx"),
            InstallProgress::new("Deploying", "Registering package"),
        ])
        .failing_install(
            HostError::new("deployment failed")
                .with_cause("0x80073CF3 package failed updates")
                .with_request("/api/app/packagemanager/package", "Bad Request", Some(400)),
        );
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(1, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package))
        .unwrap_err();

    assert!(matches!(err.source, DeployError::Install(_)));
    assert_eq!(
        err.last_status,
        Some(InstallProgress::new("Deploying", "Registering package"))
    );
    assert_eq!(err.causes.len(), 2);

    let report = err.report();
    assert!(report.contains("last status: Registering package"));
    assert!(report.contains("0x80073CF3"));
    assert!(report.contains("Bad Request"));
}

#[test]
fn install_and_launch_recovers_names_from_device() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new()
        .queue_list(Ok(Vec::new()))
        .with_installed(vec![installed(
            "Contoso.App",
            "1.0.0.0",
            "Contoso.App_1.0.0.0_x64__8wekyb3d8bbwe",
            "Contoso.App_8wekyb3d8bbwe!App",
        )]);
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(4, 1)).unwrap();

    let report = orchestrator
        .install(&InstallRequest::new(&package).with_launch(true))
        .unwrap();

    let launched = report.launched.unwrap();
    assert_eq!(launched.package_full_name, "Contoso.App_1.0.0.0_x64__8wekyb3d8bbwe");
    assert_eq!(launched.launch_id, "Contoso.App_8wekyb3d8bbwe!App");
    assert_eq!(
        orchestrator.host().calls().last(),
        Some(&Call::Launch {
            launch_id: "Contoso.App_8wekyb3d8bbwe!App".to_string(),
            full_name: "Contoso.App_1.0.0.0_x64__8wekyb3d8bbwe".to_string(),
        })
    );
    assert_eq!(
        orchestrator.state(),
        OperationState::Succeeded(Operation::Install)
    );
}

#[test]
fn install_and_launch_with_complete_identity_waits_for_registration() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let resolver = IdentityResolver::new(Arc::new(DeterministicEncoder));
    let expected = resolver
        .resolve_fields(
            IdentityFields::new("Contoso.App", "App", support::PUBLISHER, "1.0.0.0")
                .with_architecture(Architecture::X64),
        )
        .unwrap();
    let host = StubHost::new()
        .queue_list(Ok(Vec::new()))
        .queue_list(Ok(Vec::new()))
        .with_installed(vec![installed(
            "Contoso.App",
            "1.0.0.0",
            &expected.package_full_name,
            &expected.launch_id,
        )]);
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(1, 5))
        .unwrap()
        .with_resolver(resolver);

    let report = orchestrator
        .install(&InstallRequest::new(&package).with_launch(true))
        .unwrap();

    assert!(report.identity.complete_identity);
    let launched = report.launched.unwrap();
    assert_eq!(launched.package_full_name, expected.package_full_name);
    assert_eq!(launched.launch_id, expected.launch_id);
    // One cleanup query, then registration polls until the package shows up.
    assert_eq!(orchestrator.host().list_calls(), 3);
}

#[test]
fn launch_failure_after_install_fails_operation() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new()
        .queue_list(Ok(Vec::new()))
        .with_installed(vec![installed(
            "Contoso.App",
            "1.0.0.0",
            "Contoso.App_1.0.0.0_x64__hash",
            "Contoso.App_hash!App",
        )])
        .failing_launch(HostError::new("app crashed on start"));
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(2, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package).with_launch(true))
        .unwrap_err();

    assert_eq!(err.operation, Operation::Install);
    assert!(matches!(err.source, DeployError::Launch { .. }));
    assert_eq!(orchestrator.host().install_requests().len(), 1);
}

#[test]
fn launch_failure_after_install_omits_install_status() {
    let temp = TempDir::new().unwrap();
    let package = main_package(&temp);
    let host = StubHost::new()
        .queue_list(Ok(Vec::new()))
        .with_installed(vec![installed(
            "Contoso.App",
            "1.0.0.0",
            "Contoso.App_1.0.0.0_x64__hash",
            "Contoso.App_hash!App",
        )])
        .with_progress(vec![InstallProgress::new("Deploying", "Registering package")])
        .failing_launch(HostError::new("app crashed on start"));
    let orchestrator = DeploymentOrchestrator::new(host, fast_config(2, 1)).unwrap();

    let err = orchestrator
        .install(&InstallRequest::new(&package).with_launch(true))
        .unwrap_err();

    assert!(matches!(err.source, DeployError::Launch { .. }));
    assert_eq!(err.last_status, None);
    let report = err.report();
    assert!(report.contains("app crashed on start"));
    assert!(!report.contains("Installation failed in phase"));
}
