#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use sideload_core::config::{DeployConfig, PollPolicy};
use sideload_core::host::{
    HostError, HostInstallRequest, InstallProgress, InstalledPackage, PackageHost,
};

pub const PUBLISHER: &str = "CN=Contoso";

/// Manifest XML for an application package.
pub fn manifest_xml(name: &str, version: &str, architecture: &str, dependencies: &[&str]) -> String {
    let dependencies: String = dependencies
        .iter()
        .map(|dep| format!("    <PackageDependency Name=\"{}\" MinVersion=\"1.0.0.0\" />\n", dep))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Package xmlns="http://schemas.microsoft.com/appx/manifest/foundation/windows10">
  <Identity Name="{name}" Publisher="{PUBLISHER}" Version="{version}" ProcessorArchitecture="{architecture}" />
  <Properties>
    <DisplayName>{name}</DisplayName>
  </Properties>
  <Dependencies>
    <TargetDeviceFamily Name="Windows.Universal" MinVersion="10.0.0.0" />
{dependencies}  </Dependencies>
  <Applications>
    <Application Id="App" Executable="app.exe" />
  </Applications>
</Package>
"#
    )
}

/// Manifest XML for a framework package, which declares no Application.
pub fn framework_xml(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Package xmlns="http://schemas.microsoft.com/appx/manifest/foundation/windows10">
  <Identity Name="{name}" Publisher="{PUBLISHER}" Version="14.0.30704.0" ProcessorArchitecture="x64" />
  <Properties>
    <DisplayName>{name}</DisplayName>
    <Framework>true</Framework>
  </Properties>
</Package>
"#
    )
}

/// Write a package archive holding `manifest` at `dir/file_name`.
pub fn write_package(dir: &Path, file_name: &str, manifest: &str) -> PathBuf {
    std::fs::create_dir_all(dir).expect("Failed to create package dir");
    let path = dir.join(file_name);
    let file = std::fs::File::create(&path).expect("Failed to create package");

    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    zip.start_file("AppxManifest.xml", options)
        .expect("Failed to start AppxManifest.xml");
    zip.write_all(manifest.as_bytes())
        .expect("Failed to write AppxManifest.xml");
    zip.start_file("app.exe", options)
        .expect("Failed to start app.exe");
    zip.write_all(b"MZ").expect("Failed to write app.exe");
    zip.finish().expect("Failed to finish zip");

    path
}

/// Config with no delays between device polls.
pub fn fast_config(identity_attempts: u32, registration_attempts: u32) -> DeployConfig {
    let mut config = DeployConfig::new();
    config.identity_resolution = PollPolicy::new(identity_attempts, 0);
    config.registration = PollPolicy::new(registration_attempts, 0);
    config
}

pub fn installed(name: &str, version: &str, full_name: &str, launch_id: &str) -> InstalledPackage {
    InstalledPackage {
        name: name.to_string(),
        publisher: PUBLISHER.to_string(),
        version: version.to_string(),
        full_name: full_name.to_string(),
        launch_id: launch_id.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Install(HostInstallRequest),
    Uninstall(String),
    Launch { launch_id: String, full_name: String },
}

/// Scripted package host recording every call it receives.
#[derive(Debug, Default)]
pub struct StubHost {
    queued_lists: Mutex<VecDeque<Result<Vec<InstalledPackage>, HostError>>>,
    installed: Vec<InstalledPackage>,
    calls: Mutex<Vec<Call>>,
    progress: Vec<InstallProgress>,
    install_error: Option<HostError>,
    uninstall_error: Option<HostError>,
    launch_error: Option<HostError>,
}

impl StubHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages reported once the queued list responses are used up.
    pub fn with_installed(mut self, packages: Vec<InstalledPackage>) -> Self {
        self.installed = packages;
        self
    }

    pub fn queue_list(self, response: Result<Vec<InstalledPackage>, HostError>) -> Self {
        self.queued_lists
            .lock()
            .expect("queue lock")
            .push_back(response);
        self
    }

    pub fn with_progress(mut self, progress: Vec<InstallProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn failing_install(mut self, error: HostError) -> Self {
        self.install_error = Some(error);
        self
    }

    pub fn failing_uninstall(mut self, error: HostError) -> Self {
        self.uninstall_error = Some(error);
        self
    }

    pub fn failing_launch(mut self, error: HostError) -> Self {
        self.launch_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls().iter().filter(|call| **call == Call::List).count()
    }

    pub fn install_requests(&self) -> Vec<HostInstallRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Install(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl PackageHost for StubHost {
    async fn list_installed(&self) -> Result<Vec<InstalledPackage>, HostError> {
        self.record(Call::List);
        let queued = self.queued_lists.lock().expect("queue lock").pop_front();
        queued.unwrap_or_else(|| Ok(self.installed.clone()))
    }

    async fn install(
        &self,
        request: &HostInstallRequest,
        progress: Sender<InstallProgress>,
    ) -> Result<(), HostError> {
        self.record(Call::Install(request.clone()));
        for update in &self.progress {
            let _ = progress.send(update.clone());
        }
        match &self.install_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn uninstall(&self, full_name: &str) -> Result<(), HostError> {
        self.record(Call::Uninstall(full_name.to_string()));
        match &self.uninstall_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn launch(&self, launch_id: &str, full_name: &str) -> Result<(), HostError> {
        self.record(Call::Launch {
            launch_id: launch_id.to_string(),
            full_name: full_name.to_string(),
        });
        match &self.launch_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
