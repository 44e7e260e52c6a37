use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use log::{info, warn};
use nix::sys::signal::{signal, SigHandler, Signal};
use crate::error::{LauncherError, Result};
use crate::model::{Catalog, CatalogEntry};
use crate::overlay::{OverlayController, OverlayHost};
use crate::search::SearchController;

/// Starts a program and forgets about it.
pub trait ProcessLauncher {
    fn spawn_detached(&self, argv: &[String]) -> Result<()>;
}

/// Spawns in its own process group with stdio on /dev/null. The launcher
/// ignores SIGCHLD so these children are reaped by the kernel; the child gets
/// the default disposition back before exec. std already clears the signal
/// mask the event loop set up for its control signals.
pub struct SystemLauncher;

impl SystemLauncher {
    /// Must run once at startup, before the first spawn.
    pub fn install_child_reaper() -> Result<()> {
        // SAFETY: SigIgn installs no handler code.
        unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
            .map_err(|e| LauncherError::Io(e.into()))?;
        Ok(())
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, argv: &[String]) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Err(LauncherError::InvalidCommand(String::new()));
        };

        let mut command = Command::new(program);
        command.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        // SAFETY: signal() is async-signal-safe and SigDfl installs no handler.
        unsafe {
            command.pre_exec(|| {
                signal(Signal::SIGCHLD, SigHandler::SigDfl).map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        command.spawn().map_err(|source| LauncherError::Spawn {
            command: argv.join(" "),
            source,
        })?;
        Ok(())
    }
}

pub struct LaunchDispatcher {
    launcher: Box<dyn ProcessLauncher>,
    terminal: Option<Vec<String>>,
}

impl LaunchDispatcher {
    pub fn new(launcher: Box<dyn ProcessLauncher>, terminal: Option<String>) -> Self {
        let terminal = terminal.and_then(|cmd| match shlex::split(&cmd) {
            Some(argv) if !argv.is_empty() => Some(argv),
            _ => {
                warn!("Ignoring unusable terminal command {:?}", cmd);
                None
            }
        });
        Self { launcher, terminal }
    }

    /// Tell observers, clear the search, close the popup, then spawn.
    /// Failures are logged and returned but never retried.
    pub fn launch<H: OverlayHost + ?Sized>(
        &self,
        entry: &CatalogEntry,
        catalog: &Catalog,
        search: &mut SearchController,
        overlay: &mut OverlayController,
        host: &mut H,
    ) -> Result<()> {
        overlay.notify_launch_requested(entry);
        search.clear(catalog);
        overlay.close(host);

        let argv = match build_argv(entry, self.terminal.as_deref()) {
            Ok(argv) => argv,
            Err(e) => {
                warn!("Not launching '{}': {}", entry.name, e);
                return Err(e);
            }
        };

        info!("Launching '{}': {:?}", entry.name, argv);
        if let Err(e) = self.launcher.spawn_detached(&argv) {
            warn!("Launch of '{}' failed: {}", entry.name, e);
            return Err(e);
        }
        Ok(())
    }
}

/// The entry's argv, behind the terminal prefix for terminal apps.
pub fn build_argv(entry: &CatalogEntry, terminal: Option<&[String]>) -> Result<Vec<String>> {
    if entry.argv.is_empty() {
        return Err(LauncherError::InvalidCommand(entry.name.clone()));
    }

    let mut argv: Vec<String> = Vec::new();
    if entry.terminal {
        if let Some(prefix) = terminal {
            argv.extend_from_slice(prefix);
        } else {
            warn!("'{}' wants a terminal but none is configured", entry.name);
        }
    }
    argv.extend_from_slice(&entry.argv);
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PopupConfig;
    use crate::fixtures::{app, sample_root, FakeHost, HostCall, RecordingLauncher, ScriptedSource};
    use crate::loader::CatalogLoader;
    use crate::overlay::OverlayState;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        overlay: OverlayController,
        host: FakeHost,
        loader: CatalogLoader,
        search: SearchController,
        recorder: RecordingLauncher,
    }

    fn harness(fail: bool) -> Harness {
        let mut overlay = OverlayController::new(&PopupConfig::default());
        let mut host = FakeHost::default();
        let mut loader = CatalogLoader::new(Box::new(ScriptedSource::new(vec![Ok(sample_root())])));
        overlay.open(&mut host, &mut loader);
        Harness {
            overlay,
            host,
            loader,
            search: SearchController::new(),
            recorder: RecordingLauncher { fail, ..Default::default() },
        }
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_build_argv_keeps_words_intact() {
        let entry = CatalogEntry::new("x", "Notes", argv(&["editor", "/home/u/My Notes/todo.md"]));
        assert_eq!(build_argv(&entry, None).unwrap(), vec!["editor", "/home/u/My Notes/todo.md"]);
    }

    #[test]
    fn test_build_argv_terminal_prefix() {
        let mut entry = CatalogEntry::new("x", "Htop", argv(&["htop", "-d", "5"]));
        entry.terminal = true;
        let foot = argv(&["foot", "-e"]);
        assert_eq!(
            build_argv(&entry, Some(foot.as_slice())).unwrap(),
            vec!["foot", "-e", "htop", "-d", "5"]
        );
        assert_eq!(build_argv(&entry, None).unwrap(), vec!["htop", "-d", "5"]);
    }

    #[test]
    fn test_build_argv_rejects_empty() {
        let mut entry = CatalogEntry::new("x", "Blank", Vec::new());
        assert!(matches!(build_argv(&entry, None), Err(LauncherError::InvalidCommand(_))));
        entry.terminal = true;
        assert!(build_argv(&entry, Some(argv(&["foot", "-e"]).as_slice())).is_err());
    }

    #[test]
    fn test_dispatcher_splits_quoted_terminal() {
        let recorder = RecordingLauncher::default();
        let dispatcher = LaunchDispatcher::new(
            Box::new(recorder.clone()),
            Some("kitty --title 'Panel Launcher' -e".to_string()),
        );
        let mut entry = CatalogEntry::new("x", "Htop", argv(&["htop"]));
        entry.terminal = true;

        let mut h = harness(false);
        let catalog = h.loader.current();
        dispatcher
            .launch(&entry, &catalog, &mut h.search, &mut h.overlay, &mut h.host)
            .unwrap();
        assert_eq!(
            *recorder.spawned.borrow(),
            vec![argv(&["kitty", "--title", "Panel Launcher", "-e", "htop"])]
        );

        let unbalanced = LaunchDispatcher::new(Box::new(recorder.clone()), Some("foot \"-e".to_string()));
        assert!(unbalanced.terminal.is_none());
    }

    #[test]
    fn test_launch_order_clear_close_spawn() {
        let mut h = harness(false);
        let catalog = h.loader.current();
        h.search.on_text_changed("files", &catalog);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        h.overlay.on_launch_requested(move |e| o.borrow_mut().push(format!("requested {}", e.name)));
        let o = order.clone();
        h.overlay.on_closed(move || o.borrow_mut().push("closed".to_string()));

        let dispatcher = LaunchDispatcher::new(Box::new(h.recorder.clone()), None);
        dispatcher
            .launch(&app("Files"), &catalog, &mut h.search, &mut h.overlay, &mut h.host)
            .unwrap();

        assert_eq!(*order.borrow(), vec!["requested Files", "closed"]);
        assert_eq!(h.search.text(), "");
        assert_eq!(h.overlay.state(), OverlayState::Hidden);
        assert_eq!(h.host.count(&HostCall::Release), 1);
        assert_eq!(*h.recorder.spawned.borrow(), vec![vec!["files".to_string()]]);
    }

    #[test]
    fn test_spawn_failure_still_closes() {
        let mut h = harness(true);
        let catalog = h.loader.current();
        let dispatcher = LaunchDispatcher::new(Box::new(h.recorder.clone()), None);

        let result = dispatcher.launch(&app("Terminal"), &catalog, &mut h.search, &mut h.overlay, &mut h.host);
        assert!(matches!(result, Err(LauncherError::Spawn { .. })));
        assert_eq!(h.overlay.state(), OverlayState::Hidden);
        assert_eq!(h.recorder.spawned.borrow().len(), 1);
    }

    #[test]
    fn test_invalid_command_not_spawned() {
        let mut h = harness(false);
        let catalog = h.loader.current();
        let dispatcher = LaunchDispatcher::new(Box::new(h.recorder.clone()), None);
        let broken = CatalogEntry::new("broken", "Broken", Vec::new());

        assert!(dispatcher.launch(&broken, &catalog, &mut h.search, &mut h.overlay, &mut h.host).is_err());
        assert!(h.recorder.spawned.borrow().is_empty());
        assert!(!h.overlay.is_shown());
    }

    #[test]
    fn test_system_launcher_rejects_empty_argv() {
        assert!(matches!(
            SystemLauncher.spawn_detached(&[]),
            Err(LauncherError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_system_launcher_child_leads_own_group() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("ids");
        let script = format!(
            "echo $$ $(cut -d' ' -f5 /proc/$$/stat) > {0}.tmp && mv {0}.tmp {0}",
            out.display()
        );
        SystemLauncher
            .spawn_detached(&argv(&["sh", "-c", &script]))
            .unwrap();

        let mut ids = String::new();
        for _ in 0..100 {
            if let Ok(content) = std::fs::read_to_string(&out) {
                ids = content;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        let ids: Vec<&str> = ids.split_whitespace().collect();
        assert_eq!(ids.len(), 2, "child never reported its ids");
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[1], std::process::id().to_string());
    }

    #[test]
    fn test_system_launcher_reports_missing_program() {
        let argv = vec!["/nonexistent/panel-launcher-test-binary".to_string()];
        assert!(matches!(
            SystemLauncher.spawn_detached(&argv),
            Err(LauncherError::Spawn { .. })
        ));
    }
}
