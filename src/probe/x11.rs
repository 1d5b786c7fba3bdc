use sysinfo::{Pid, ProcessesToUpdate, System};

use super::{run_probe_command, WindowProbe, WindowSnapshot};

/// Active X11 window via `xdotool`, process name via `sysinfo`.
///
/// X11 exposes no browser tab url, so `url` is always `None`.
#[derive(Default)]
pub struct X11Probe;

impl X11Probe {
    pub fn new() -> Self {
        Self
    }
}

fn process_name(pid: u32) -> Option<String> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    system
        .process(pid)
        .map(|process| process.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

impl WindowProbe for X11Probe {
    async fn current_window(&self) -> Option<WindowSnapshot> {
        let pid: u32 = run_probe_command("xdotool", &["getactivewindow", "getwindowpid"])
            .await?
            .parse()
            .ok()?;
        let window_title = run_probe_command("xdotool", &["getactivewindow", "getwindowname"])
            .await
            .unwrap_or_default();

        let process_name = tokio::task::spawn_blocking(move || process_name(pid))
            .await
            .ok()
            .flatten()?;

        Some(WindowSnapshot {
            process_name,
            window_title,
            url: None,
        })
    }
}
