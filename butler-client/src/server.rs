//! Server administration: shutdown modes and the script console.

use crate::client::Client;
use crate::error::Result;

impl Client {
    /// Stop scheduling new builds; running builds continue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is not an admin.
    pub async fn quiet_down(&self) -> Result<()> {
        self.admin("quietDown").await
    }

    /// Leave quiet-down mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is not an admin.
    pub async fn cancel_quiet_down(&self) -> Result<()> {
        self.admin("cancelQuietDown").await
    }

    /// Restart immediately, aborting running builds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is not an admin.
    pub async fn restart(&self) -> Result<()> {
        self.admin("restart").await
    }

    /// Restart once running builds have finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is not an admin.
    pub async fn safe_restart(&self) -> Result<()> {
        self.admin("safeRestart").await
    }

    /// Run a Groovy script on the controller and return its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is not an admin.
    pub async fn run_script(&self, script: &str) -> Result<String> {
        let response = self
            .post_form(&self.url("scriptText"), &[("script", script)])
            .await?;
        Ok(response.body_string())
    }

    /// Check a declarative pipeline definition and return the server's verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; syntax errors are reported in
    /// the returned text, not as an error.
    pub async fn validate_pipeline(&self, jenkinsfile: &str) -> Result<String> {
        let url = self.url("pipeline-model-converter/validate");
        let response = self.post_form(&url, &[("jenkinsfile", jenkinsfile)]).await?;
        Ok(response.body_string())
    }

    async fn admin(&self, action: &str) -> Result<()> {
        self.post(&self.url(action), &[]).await?;
        tracing::info!(action = %action, "Server admin action sent");
        Ok(())
    }
}
