//! HTTP object API transport
//!
//! Wire protocol (all requests `POST {base_url}?action=...` with a bearer
//! token):
//!
//! - `upload` - multipart form with the file content and optional
//!   `parent_id`; response `{"id": "..."}`
//! - `mkdir` - JSON `{"name", "parent_id"}`; response `{"id": "..."}`
//! - `delete` - JSON `{"id", "type", "permanent": false}`; a 404 means the
//!   object is already gone and counts as success
//!
//! Every request carries a hard timeout so an unreachable endpoint fails a
//! single operation instead of stalling a whole reconciliation cycle.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use fanout_core::domain::newtypes::{RemoteRef, TransportName};
use fanout_core::ports::ITransport;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body for `upload` and `mkdir`.
#[derive(Debug, Deserialize)]
struct ObjectResponse {
    id: String,
}

// ============================================================================
// HttpApiTransport
// ============================================================================

/// Transport backed by the action-dispatching HTTP object API
///
/// Folder-capable: the server models folders as objects with their own IDs,
/// and children reference their parent by `parent_id`.
pub struct HttpApiTransport {
    name: TransportName,
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpApiTransport {
    /// Creates a transport for the given endpoint
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(name: TransportName, base_url: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            name,
            client,
            base_url,
            token,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}?action={action}", self.base_url)
    }

    async fn parse_object_response(response: reqwest::Response) -> Result<RemoteRef> {
        let body: ObjectResponse = response
            .error_for_status()
            .context("Server rejected request")?
            .json()
            .await
            .context("Malformed response body")?;
        Ok(RemoteRef::new(body.id)?)
    }
}

#[async_trait::async_trait]
impl ITransport for HttpApiTransport {
    fn name(&self) -> &TransportName {
        &self.name
    }

    fn supports_folders(&self) -> bool {
        true
    }

    #[instrument(skip(self, parent), fields(transport = %self.name))]
    async fn mkdir(&self, name: &str, parent: Option<&RemoteRef>) -> Result<RemoteRef> {
        let response = self
            .client
            .post(self.action_url("mkdir"))
            .bearer_auth(&self.token)
            .json(&json!({
                "name": name,
                "parent_id": parent.map(RemoteRef::as_str),
            }))
            .send()
            .await
            .with_context(|| format!("mkdir request for '{name}' failed"))?;

        let reference = Self::parse_object_response(response).await?;
        debug!(%reference, "Folder created");
        Ok(reference)
    }

    #[instrument(skip(self, local_path, parent), fields(transport = %self.name))]
    async fn upload(
        &self,
        local_path: &Path,
        name: &str,
        parent: Option<&RemoteRef>,
    ) -> Result<RemoteRef> {
        // Stream the file so memory stays flat regardless of size.
        let file = tokio::fs::File::open(local_path)
            .await
            .with_context(|| format!("opening {} for upload", local_path.display()))?;
        let length = file
            .metadata()
            .await
            .with_context(|| format!("reading metadata of {}", local_path.display()))?
            .len();
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));

        let mut form = Form::new().part(
            "file",
            Part::stream_with_length(body, length).file_name(name.to_string()),
        );
        if let Some(parent) = parent {
            form = form.text("parent_id", parent.as_str().to_string());
        }

        let response = self
            .client
            .post(self.action_url("upload"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("upload request for '{name}' failed"))?;

        let reference = Self::parse_object_response(response).await?;
        debug!(%reference, "File uploaded");
        Ok(reference)
    }

    #[instrument(skip(self), fields(transport = %self.name))]
    async fn delete(&self, reference: &RemoteRef, is_folder: bool) -> Result<()> {
        let response = self
            .client
            .post(self.action_url("delete"))
            .bearer_auth(&self.token)
            .json(&json!({
                "id": reference.as_str(),
                "type": if is_folder { "folder" } else { "file" },
                "permanent": false,
            }))
            .send()
            .await
            .with_context(|| format!("delete request for '{reference}' failed"))?;

        // Already gone on the server means the goal state is reached.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%reference, "Object already absent");
            return Ok(());
        }

        response
            .error_for_status()
            .context("Server rejected delete")?;
        debug!(%reference, "Object deleted");
        Ok(())
    }
}
