//! Foreground window probes.
//!
//! A probe is best effort: any platform failure is logged and reported as
//! `None`, never as an error.

mod macos;
mod x11;

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

pub use macos::AppleScriptProbe;
pub use x11::X11Probe;

/// Upper bound for one external probe command.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub process_name: String,
    pub window_title: String,
    pub url: Option<String>,
}

pub trait WindowProbe: Send + Sync {
    fn current_window(&self) -> impl Future<Output = Option<WindowSnapshot>> + Send;
}

impl<T: WindowProbe> WindowProbe for Arc<T> {
    fn current_window(&self) -> impl Future<Output = Option<WindowSnapshot>> + Send {
        self.as_ref().current_window()
    }
}

/// Probe selected for the running platform.
pub enum PlatformProbe {
    AppleScript(AppleScriptProbe),
    X11(X11Probe),
    Unsupported,
}

pub fn default_probe() -> PlatformProbe {
    if cfg!(target_os = "macos") {
        PlatformProbe::AppleScript(AppleScriptProbe::new())
    } else if cfg!(target_os = "linux") {
        PlatformProbe::X11(X11Probe::new())
    } else {
        log::warn!("No window probe for this platform; tracking will record nothing");
        PlatformProbe::Unsupported
    }
}

impl WindowProbe for PlatformProbe {
    async fn current_window(&self) -> Option<WindowSnapshot> {
        match self {
            PlatformProbe::AppleScript(probe) => probe.current_window().await,
            PlatformProbe::X11(probe) => probe.current_window().await,
            PlatformProbe::Unsupported => None,
        }
    }
}

/// Run an external command with the probe timeout and return trimmed stdout.
pub(crate) async fn run_probe_command(program: &str, args: &[&str]) -> Option<String> {
    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output(),
    )
    .await;

    match output {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(Ok(output)) => {
            log::debug!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Ok(Err(err)) => {
            log::debug!("failed to run {program}: {err}");
            None
        }
        Err(_) => {
            log::warn!("{program} timed out after {}s", PROBE_TIMEOUT.as_secs());
            None
        }
    }
}
