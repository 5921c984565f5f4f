//! Credential stores.
//!
//! Only the default (`_`) domain is addressed. The API never returns secret
//! values; creating or updating a credential takes its full XML document.

use crate::client::{Client, join};
use crate::error::Result;
use crate::types::{CredentialInfo, CredentialListJson};

/// Where a credential is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStore {
    /// The server-wide store.
    System,
    /// The store attached to a folder, by full name.
    Folder(String),
}

impl CredentialStore {
    fn url(&self, client: &Client) -> String {
        match self {
            Self::System => client.url("credentials/store/system/domain/_/"),
            Self::Folder(folder) => {
                join(&client.job_url(folder), "credentials/store/folder/domain/_/")
            }
        }
    }
}

impl Client {
    fn credential_url(&self, store: &CredentialStore, id: &str) -> String {
        join(
            &store.url(self),
            &format!("credential/{}/", urlencoding::encode(id)),
        )
    }

    /// List the credentials in a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or is not readable.
    pub async fn list_credentials(&self, store: &CredentialStore) -> Result<Vec<CredentialInfo>> {
        let list: CredentialListJson = self
            .api_json(&store.url(self), &[("depth", "1")])
            .await?;
        Ok(list.credentials)
    }

    /// Look up a credential by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub async fn get_credential(
        &self,
        store: &CredentialStore,
        id: &str,
    ) -> Result<Option<CredentialInfo>> {
        Ok(self
            .list_credentials(store)
            .await?
            .into_iter()
            .find(|credential| credential.id == id))
    }

    /// Create a credential from its XML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken or the document is rejected.
    pub async fn create_credential(&self, store: &CredentialStore, xml: &str) -> Result<()> {
        self.post_xml(&join(&store.url(self), "createCredentials"), &[], xml)
            .await?;
        tracing::info!(store = ?store, "Credential created");
        Ok(())
    }

    /// Delete a credential.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the credential does not exist.
    pub async fn delete_credential(&self, store: &CredentialStore, id: &str) -> Result<()> {
        self.post(&join(&self.credential_url(store, id), "doDelete"), &[])
            .await?;
        tracing::info!(store = ?store, id = %id, "Credential deleted");
        Ok(())
    }

    /// Read a credential's XML document, with secrets redacted by the server.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the credential does not exist.
    pub async fn credential_config(&self, store: &CredentialStore, id: &str) -> Result<String> {
        self.get_text(&join(&self.credential_url(store, id), "config.xml"))
            .await
    }

    /// Replace a credential's XML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the document.
    pub async fn set_credential_config(
        &self,
        store: &CredentialStore,
        id: &str,
        xml: &str,
    ) -> Result<()> {
        self.post_xml(&join(&self.credential_url(store, id), "config.xml"), &[], xml)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::testing::{MockTransport, exact};
    use butler_core::transport::Method;
    use serde_json::json;
    use std::sync::Arc;

    const SYSTEM: &str = "http://h/credentials/store/system/domain/_/";

    fn client_with(mock: &Arc<MockTransport>) -> Client {
        Client::new("http://h").unwrap().with_transport(mock.clone())
    }

    fn no_crumb() -> MockTransport {
        MockTransport::new()
            .on_get(&exact("http://h/crumbIssuer/api/json"))
            .respond_error(404, "Not Found")
    }

    #[test]
    fn test_store_urls() {
        let client = Client::new("http://h").unwrap();
        assert_eq!(CredentialStore::System.url(&client), SYSTEM);
        assert_eq!(
            CredentialStore::Folder("team/api".to_string()).url(&client),
            "http://h/job/team/job/api/credentials/store/folder/domain/_/"
        );
        assert_eq!(
            client.credential_url(&CredentialStore::System, "deploy key"),
            format!("{}credential/deploy%20key/", SYSTEM)
        );
    }

    #[tokio::test]
    async fn test_list_and_get_credentials() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact(&format!("{}api/json?depth=1", SYSTEM)))
                .respond_json(
                    200,
                    json!({
                        "_class": "com.cloudbees.plugins.credentials.CredentialsStoreAction$DomainWrapper",
                        "credentials": [
                            {"id": "deploy", "typeName": "Username with password", "displayName": "bot/******", "fullName": "system/_/deploy", "description": "release bot"},
                            {"id": "gh-token", "typeName": "Secret text", "displayName": "GitHub", "fullName": "system/_/gh-token"}
                        ]
                    }),
                ),
        );
        let client = client_with(&mock);

        let all = client.list_credentials(&CredentialStore::System).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].type_name, "Secret text");

        let found = client
            .get_credential(&CredentialStore::System, "deploy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.description.as_deref(), Some("release bot"));
        assert!(
            client
                .get_credential(&CredentialStore::System, "missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_create_update_and_delete() {
        let xml = "<com.cloudbees.plugins.credentials.impl.UsernamePasswordCredentialsImpl/>";
        let mock = Arc::new(
            no_crumb()
                .on_post(&exact(&format!("{}createCredentials", SYSTEM)))
                .respond_text(200, "")
                .on_post(&exact(&format!("{}credential/deploy/config.xml", SYSTEM)))
                .respond_text(200, "")
                .on_post(&exact(&format!("{}credential/deploy/doDelete", SYSTEM)))
                .respond_text(302, ""),
        );
        let client = client_with(&mock);
        let store = CredentialStore::System;

        client.create_credential(&store, xml).await.unwrap();
        client.set_credential_config(&store, "deploy", xml).await.unwrap();
        client.delete_credential(&store, "deploy").await.unwrap();

        let posts: Vec<_> = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .collect();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].body, xml.as_bytes());
        assert_eq!(posts[0].headers["Content-Type"], "application/xml");
        assert!(posts[2].body.is_empty());
    }

    #[tokio::test]
    async fn test_folder_credential_config() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact(
                    "http://h/job/team/credentials/store/folder/domain/_/credential/npm/config.xml",
                ))
                .respond_text(200, "<secret>****</secret>"),
        );
        let xml = client_with(&mock)
            .credential_config(&CredentialStore::Folder("team".to_string()), "npm")
            .await
            .unwrap();
        assert!(xml.contains("****"));
    }
}
