//! TestServer: boots `waymark serve` for full-stack tests.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server failed to start: {0}")]
    StartupFailed(String),

    #[error("waymark binary not found at {0}")]
    BinaryNotFound(String),
}

/// A running `waymark serve` process.
pub struct TestServer {
    child: Child,
    port: u16,
    client: reqwest::Client,
    /// Holds manifests written by [`TestServer::from_yaml`].
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Serve the manifest at `path`.
    pub async fn from_manifest(path: impl AsRef<Path>) -> Result<Self, TestError> {
        Self::start(path.as_ref(), None).await
    }

    /// Serve a manifest given inline.
    pub async fn from_yaml(yaml: &str) -> Result<Self, TestError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("routes.yaml");
        std::fs::write(&path, yaml)?;
        Self::start(&path, Some(temp_dir)).await
    }

    async fn start(manifest: &Path, temp_dir: Option<TempDir>) -> Result<Self, TestError> {
        let binary_path = find_waymark_binary()?;
        let port = find_available_port()?;

        let child = Command::new(&binary_path)
            .arg("serve")
            .arg("--routes")
            .arg(manifest)
            .arg("--listen")
            .arg(format!("127.0.0.1:{port}"))
            .arg("--log-level")
            .arg("warn")
            .env_remove("RUST_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let mut server = TestServer {
            child,
            port,
            client: reqwest::Client::new(),
            _temp_dir: temp_dir,
        };
        server.wait_for_ready().await?;
        Ok(server)
    }

    /// Poll the health endpoint until the server answers.
    async fn wait_for_ready(&mut self) -> Result<(), TestError> {
        let health_url = format!("{}/__waymark/health", self.base_url());
        let delay = Duration::from_millis(100);

        for _ in 0..50 {
            if let Ok(resp) = self.client.get(&health_url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(TestError::StartupFailed(format!(
                    "server exited with status: {status}"
                )));
            }

            tokio::time::sleep(delay).await;
        }

        Err(TestError::StartupFailed(
            "server did not become ready in time".to_string(),
        ))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response, TestError> {
        self.request(reqwest::Method::GET, path).await
    }

    /// Send a request with any method and no body.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.request(method, &url).send().await?)
    }

    /// Send a request with an explicit `Host` header.
    pub async fn get_with_host(&self, path: &str, host: &str) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .get(&url)
            .header(reqwest::header::HOST, host)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Find the `waymark` binary in the target directory.
fn find_waymark_binary() -> Result<PathBuf, TestError> {
    if let Ok(path) = std::env::var("WAYMARK_BIN") {
        return Ok(PathBuf::from(path));
    }

    // CARGO_MANIFEST_DIR = .../crates/waymark-test
    let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace.join("target"));

    for profile in ["debug", "release"] {
        let candidate = target.join(profile).join(format!("waymark{}", std::env::consts::EXE_SUFFIX));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(TestError::BinaryNotFound(target.join("{debug,release}/waymark").display().to_string()))
}

/// Ask the OS for a free port.
fn find_available_port() -> Result<u16, TestError> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
