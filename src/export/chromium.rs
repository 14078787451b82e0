use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ExportError, PdfEngine};
use crate::config::ExportConfig;

const SOURCE_FILE: &str = "biodata.html";
const OUTPUT_FILE: &str = "biodata.pdf";

/// Headless Chromium driven through `--print-to-pdf`.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    binary: String,
    timeout: Duration,
    asset_wait: Duration,
}

impl ChromiumEngine {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            binary: config.chromium_path.clone(),
            timeout: config.timeout,
            asset_wait: config.asset_wait,
        }
    }

    /// Start-up check so a missing binary shows in the logs before the first
    /// approval fails.
    pub async fn check_version(&self) -> Result<String, ExportError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(10), cmd.output())
            .await
            .map_err(|_| ExportError::Timeout(10))?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ExportError::EngineUnavailable(format!(
                "{} --version exited with {}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn spawn_error(&self, err: std::io::Error) -> ExportError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ExportError::EngineUnavailable(format!("{} not found", self.binary))
        } else {
            ExportError::EngineUnavailable(format!("failed to start {}: {err}", self.binary))
        }
    }
}

#[async_trait]
impl PdfEngine for ChromiumEngine {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, ExportError> {
        let temp_dir = tempfile::tempdir()?;
        let source = temp_dir.path().join(SOURCE_FILE);
        let output = temp_dir.path().join(OUTPUT_FILE);
        tokio::fs::write(&source, html).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg(format!("--virtual-time-budget={}", self.asset_wait.as_millis()))
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(format!("file://{}", source.display()))
            .current_dir(temp_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the child on timeout kills the process.
        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ExportError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| self.spawn_error(e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            return Err(ExportError::EngineFailed(format!(
                "exit status {}: {tail}",
                result.status
            )));
        }

        let pdf = tokio::fs::read(&output).await.map_err(|e| {
            ExportError::EngineFailed(format!("no PDF produced: {e}"))
        })?;
        if pdf.is_empty() {
            return Err(ExportError::EngineFailed("empty PDF produced".to_string()));
        }
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_reported_as_unavailable() {
        let engine = ChromiumEngine::new(&ExportConfig {
            chromium_path: "/nonexistent/chromium-binary".to_string(),
            timeout: Duration::from_secs(5),
            asset_wait: Duration::from_millis(10),
        });
        let err = engine.render_pdf("<html></html>").await.unwrap_err();
        assert!(matches!(err, ExportError::EngineUnavailable(_)), "{err}");
        assert!(matches!(engine.check_version().await, Err(ExportError::EngineUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_engine_is_stopped_at_the_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = ChromiumEngine::new(&ExportConfig {
            chromium_path: script.display().to_string(),
            timeout: Duration::from_secs(1),
            asset_wait: Duration::from_millis(10),
        });
        let started = std::time::Instant::now();
        let err = engine.render_pdf("<html></html>").await.unwrap_err();
        assert!(matches!(err, ExportError::Timeout(1)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
