//! Application under test - optional spawning and health checking
//!
//! Most runs point at an app that is already up. When a start command is
//! configured the runner owns the process for the duration of the suite.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::info;

use crate::api::BackendClient;
use crate::config::AppConfig;
use crate::error::{E2eError, E2eResult};

const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Handle to a spawned application process
pub struct AppServer {
    child: Child,
    pub base_url: String,
    stopped: bool,
}

impl AppServer {
    /// Run `app.command` through the shell and wait until `base_url` is
    /// healthy. A `{port}` placeholder in the command is replaced with a
    /// free port, which then also decides the base URL.
    pub async fn spawn(app: &AppConfig, base_url: &str) -> E2eResult<Self> {
        let command = app
            .command
            .as_deref()
            .ok_or_else(|| E2eError::ServerStartup("no start command configured".into()))?;

        let (command, base_url) = if command.contains("{port}") {
            let port = find_free_port()?;
            (
                command.replace("{port}", &port.to_string()),
                format!("http://127.0.0.1:{}", port),
            )
        } else {
            (command.to_string(), base_url.to_string())
        };

        info!("Starting application: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        // Own process group, so stopping reaches whatever the shell forks
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn '{}': {}", command, e))
        })?;

        let mut server = AppServer {
            child,
            base_url,
            stopped: false,
        };

        let client = BackendClient::new(&server.base_url, app)?;
        if let Err(e) = client
            .wait_until_ready(Duration::from_millis(app.startup_timeout_ms))
            .await
        {
            server.shutdown().await;
            return Err(e);
        }

        Ok(server)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the application: SIGTERM to the process group, a grace
    /// period, then SIGKILL.
    pub fn stop(&mut self) -> E2eResult<()> {
        if self.terminate() {
            std::thread::sleep(GRACE_PERIOD);
        }
        self.force_kill();
        Ok(())
    }

    /// Same as [`AppServer::stop`], without blocking the runtime
    pub async fn shutdown(&mut self) {
        if self.terminate() {
            tokio::time::sleep(GRACE_PERIOD).await;
        }
        self.force_kill();
    }

    /// Ask the group to exit. False when already stopped or not delivered.
    fn terminate(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.stopped = true;
        info!("Stopping application (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            self.signal_group(nix::sys::signal::Signal::SIGTERM)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    fn force_kill(&mut self) {
        #[cfg(unix)]
        self.signal_group(nix::sys::signal::Signal::SIGKILL);

        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) -> bool {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        // The shell leads its own group, so its pid is the group id
        killpg(Pid::from_raw(self.child.id() as i32), signal).is_ok()
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Find a free port to use
pub fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port().unwrap();
        let port2 = find_free_port().unwrap();

        // Ports should be in valid range
        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[tokio::test]
    async fn test_spawn_without_command_fails() {
        let app = AppConfig::default();
        let err = AppServer::spawn(&app, "http://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(_)));
    }

    /// Serves the health path so the spawned command only has to fork
    async fn health_endpoint() -> String {
        let app = axum::Router::new().route("/", axum::routing::get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[cfg(unix)]
    fn process_gone(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), None).is_err() {
            return true;
        }
        // Killed but not yet reaped by init
        std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .map(|stat| {
                stat.rsplit(')')
                    .next()
                    .map_or(false, |rest| rest.trim_start().starts_with('Z'))
            })
            .unwrap_or(false)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_forked_app_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("app.pid");
        let app = AppConfig {
            command: Some(format!(
                "sleep 30 & echo $! > {}; wait",
                pid_file.display()
            )),
            startup_timeout_ms: 5_000,
            ..Default::default()
        };

        let mut server = AppServer::spawn(&app, &health_endpoint().await).await.unwrap();

        let mut pid = None;
        for _ in 0..50 {
            if let Ok(text) = std::fs::read_to_string(&pid_file) {
                if let Ok(parsed) = text.trim().parse::<i32>() {
                    pid = Some(parsed);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let pid = pid.expect("forked process wrote its pid");
        assert!(!process_gone(pid));

        server.shutdown().await;

        let mut gone = false;
        for _ in 0..50 {
            if process_gone(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(gone, "forked process {} survived stop", pid);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let app = AppConfig {
            command: Some("sleep 30".to_string()),
            startup_timeout_ms: 5_000,
            ..Default::default()
        };
        let mut server = AppServer::spawn(&app, &health_endpoint().await).await.unwrap();
        server.shutdown().await;
        server.stop().unwrap();
        assert!(server.stopped);
    }

    #[tokio::test]
    async fn test_spawn_gives_up_when_app_never_listens() {
        let app = AppConfig {
            command: Some("sleep 5 # {port}".to_string()),
            startup_timeout_ms: 300,
            ..Default::default()
        };
        let err = AppServer::spawn(&app, "unused").await.err().unwrap();
        assert!(matches!(err, E2eError::ServerHealthCheck(_)));
    }
}
