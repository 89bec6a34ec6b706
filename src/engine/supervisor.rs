//! Engine process lifecycle.
//!
//! `Starting → Ready → Stopping → Stopped`, with `Failed` reachable from
//! `Starting` and `Ready`. One supervisor owns at most one child process,
//! which leads its own process group.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{ToolError, ToolResult};
use crate::process::{isolate_group, kill_group};

use super::client::EngineClient;

/// Directory holding the engine package, relative to a search root
pub const ENGINE_DIR: &str = "python";

/// Python module that serves the engine API
pub const ENGINE_MODULE: &str = "ai_sidecar";

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Starting,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

/// Supervises the analysis engine process.
pub struct EngineSupervisor {
    config: EngineConfig,
    client: EngineClient,
    child: Option<Child>,
    /// Group led by the spawned engine; outlives the leader being reaped.
    pgid: Option<u32>,
    state: EngineState,
    search_dirs: Vec<PathBuf>,
}

impl EngineSupervisor {
    pub fn new(config: EngineConfig) -> ToolResult<Self> {
        let client = EngineClient::new(config.port, config.request_timeout())?;
        let mut search_dirs = config.search_dirs.clone();
        search_dirs.extend(default_search_dirs());
        Ok(Self {
            config,
            client,
            child: None,
            pgid: None,
            state: EngineState::Stopped,
            search_dirs,
        })
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Pid of the spawned engine, if this supervisor spawned one.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Make sure an engine answers on the configured port.
    ///
    /// An engine that is already healthy is adopted without spawning.
    pub async fn start(&mut self) -> ToolResult<()> {
        if self.client.health().await.is_ok() {
            info!("✅ Engine already running on port {}", self.config.port);
            self.state = EngineState::Ready;
            return Ok(());
        }

        self.state = EngineState::Starting;

        let Some(engine_dir) = locate_engine(&self.search_dirs) else {
            self.state = EngineState::Failed;
            return Err(ToolError::EngineUnavailable(format!(
                "could not find the {} module",
                ENGINE_MODULE
            )));
        };

        let Some(python) = find_python().await else {
            self.state = EngineState::Failed;
            return Err(ToolError::EngineUnavailable(
                "python3 is not installed or not in PATH".to_string(),
            ));
        };

        let args = vec![
            "-m".to_string(),
            ENGINE_MODULE.to_string(),
            "--port".to_string(),
            self.config.port.to_string(),
        ];
        self.launch(&python, &args, &engine_dir).await
    }

    /// Spawn the engine and wait for it to become healthy. On failure the
    /// child is stopped and the supervisor ends in `Failed`.
    async fn launch(&mut self, program: &str, args: &[String], cwd: &Path) -> ToolResult<()> {
        self.state = EngineState::Starting;
        info!("🚀 Starting engine: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            // stdout belongs to the MCP transport.
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::inherit());
        isolate_group(&mut command);

        match command.spawn() {
            Ok(child) => {
                debug!("Engine pid {:?}", child.id());
                self.track(child);
            }
            Err(e) => {
                self.state = EngineState::Failed;
                return Err(ToolError::EngineUnavailable(format!(
                    "failed to start engine: {}",
                    e
                )));
            }
        }

        match self.wait_for_ready(self.config.startup_timeout()).await {
            Ok(()) => {
                info!("✅ Engine ready on port {}", self.config.port);
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("Engine failed to start: {}", e);
                self.stop().await;
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    fn track(&mut self, child: Child) {
        self.pgid = child.id();
        self.child = Some(child);
    }

    async fn wait_for_ready(&mut self, limit: Duration) -> ToolResult<()> {
        let client = self.client.clone();
        let child = &mut self.child;

        let poll = async {
            let mut ticker = interval(HEALTH_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Some(status) = child.as_mut().and_then(|c| c.try_wait().ok().flatten()) {
                    return Err(ToolError::EngineUnavailable(format!(
                        "engine exited during startup ({})",
                        status
                    )));
                }
                if client.health().await.is_ok() {
                    return Ok(());
                }
            }
        };

        timeout(limit, poll)
            .await
            .unwrap_or(Err(ToolError::StartupTimeout(limit)))
    }

    /// Stop the engine: graceful `/shutdown` and wait, bounded by the
    /// shutdown timeout, then SIGKILL to the whole group. Never hangs.
    pub async fn stop(&mut self) {
        let alive = self.is_running();
        let pgid = self.pgid.take();
        let Some(mut child) = self.child.take() else {
            if let Some(pgid) = pgid {
                kill_group(pgid);
            }
            if self.state != EngineState::Failed {
                self.state = EngineState::Stopped;
            }
            return;
        };

        self.state = EngineState::Stopping;
        let limit = self.config.shutdown_timeout();
        let client = &self.client;

        let graceful = async {
            if alive {
                if let Err(e) = client.shutdown().await {
                    debug!("Shutdown request failed: {}", e);
                }
            }
            child.wait().await
        };

        match timeout(limit, graceful).await {
            Ok(Ok(status)) => info!("Engine exited ({})", status),
            Ok(Err(e)) => warn!("Failed to wait for engine: {}", e),
            Err(_) => warn!("Engine did not exit within {:?}; killing", limit),
        }

        // Workers forked by the engine outlive it, even once it is reaped.
        if let Some(pgid) = pgid {
            kill_group(pgid);
        }
        if let Err(e) = child.wait().await {
            warn!("Failed to reap engine process: {}", e);
        }

        self.state = EngineState::Stopped;
        info!("🛑 Engine stopped");
    }

    /// OS-level liveness of the spawned child, independent of health.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | Some(Err(_)) | None => false,
        }
    }

    /// Wait for the spawned engine to exit on its own. Never resolves for an
    /// adopted engine.
    pub async fn wait(&mut self) -> ToolResult<ExitStatus> {
        let Some(child) = self.child.as_mut() else {
            return std::future::pending().await;
        };
        let status = child.wait().await?;
        warn!("Engine exited unexpectedly ({})", status);
        self.state = EngineState::Failed;
        Ok(status)
    }
}

impl Drop for EngineSupervisor {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

fn default_search_dirs() -> Vec<PathBuf> {
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };
    vec![exe_dir.clone(), exe_dir.join(".."), exe_dir.join("../..")]
}

/// First `<dir>/python` holding the engine package.
pub fn locate_engine(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| dir.join(ENGINE_DIR))
        .find(|candidate| {
            let package = candidate.join(ENGINE_MODULE);
            package.join("__init__.py").is_file() || package.join("main.py").is_file()
        })
}

async fn find_python() -> Option<String> {
    for candidate in ["python3", "python"] {
        let ok = Command::new(candidate)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        if ok {
            return Some(candidate.to_string());
        }
    }
    None
}
