//! Two-phase tag publication
//!
//! A release tag is created as an annotated tag object followed by the
//! `refs/tags/...` ref pointing at it. The ref is only requested once the tag
//! object exists. If the ref request then fails, the tag object stays behind
//! unreferenced; it is not cleaned up.

use serde::Deserialize;
use serde_json::json;
use shipmate_core::{EndpointKind, RepoRecord};

use crate::client::HostClient;
use crate::commits::CommitResolver;
use crate::error::{HostError, Result};

#[derive(Debug, Deserialize)]
struct CreatedTag {
    sha: String,
}

/// A tag that now exists on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTag {
    pub repo: String,
    pub tag: String,
    pub commit: String,
    /// Sha of the annotated tag object
    pub object_sha: String,
}

/// Publishes tags through the host API
pub struct TagPublisher<'a> {
    client: &'a HostClient,
    message: String,
}

impl<'a> TagPublisher<'a> {
    pub fn new(client: &'a HostClient, message: impl Into<String>) -> Self {
        Self {
            client,
            message: message.into(),
        }
    }

    /// Publish the record's generated tag at its resolved commit
    pub async fn publish(&self, record: &RepoRecord) -> Result<PublishedTag> {
        self.publish_with_message(record, &self.message).await
    }

    /// Publish with an explicit tag message
    ///
    /// Preconditions are checked in order and each one stops the publish:
    /// a well formed token, a resolved commit, a generated tag, and a commit
    /// the host knows about.
    pub async fn publish_with_message(
        &self,
        record: &RepoRecord,
        message: &str,
    ) -> Result<PublishedTag> {
        match self.client.token() {
            None => {
                return Err(HostError::MissingToken {
                    action: "publish tags".to_string(),
                });
            }
            Some(token) if !token.looks_valid() => return Err(HostError::InvalidToken),
            Some(_) => {}
        }

        let commit = record
            .commit()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| HostError::MissingCommit {
                repo: record.name.clone(),
            })?;
        let tag = record.tag().ok_or_else(|| HostError::MissingTag {
            repo: record.name.clone(),
        })?;

        if !CommitResolver::new(self.client)
            .verify_commit(&record.name, commit)
            .await?
        {
            return Err(HostError::CommitNotFound {
                repo: record.name.clone(),
                commit: commit.to_string(),
            });
        }

        let object_sha = self.create_tag_object(record, tag, commit, message).await?;
        self.create_ref(record, tag, &object_sha).await?;

        tracing::info!(repo = %record.name, %tag, %commit, "published tag");
        Ok(PublishedTag {
            repo: record.name.clone(),
            tag: tag.to_string(),
            commit: commit.to_string(),
            object_sha,
        })
    }

    async fn create_tag_object(
        &self,
        record: &RepoRecord,
        tag: &str,
        commit: &str,
        message: &str,
    ) -> Result<String> {
        let url = format!("{}/git/tags", self.client.repo_url(&record.name));
        let body = json!({
            "owner": self.client.organization(),
            "repo": record.name,
            "tag": tag,
            "message": message,
            "object": commit,
            "type": "commit",
        });

        let reply = self
            .client
            .post_json(&url, &body, EndpointKind::CreateTagObject)
            .await?;
        if !reply.is_success() {
            return Err(HostError::status(
                EndpointKind::CreateTagObject,
                &url,
                reply.status,
            ));
        }
        let created: CreatedTag = reply.json()?;
        Ok(created.sha)
    }

    async fn create_ref(&self, record: &RepoRecord, tag: &str, object_sha: &str) -> Result<()> {
        let url = format!("{}/git/refs", self.client.repo_url(&record.name));
        let body = json!({
            "ref": format!("refs/tags/{}", tag),
            "sha": object_sha,
        });

        let reply = self
            .client
            .post_json(&url, &body, EndpointKind::CreateRef)
            .await?;
        if !reply.is_success() {
            tracing::warn!(
                repo = %record.name,
                %tag,
                %object_sha,
                "tag object created but ref creation failed"
            );
            return Err(HostError::status(EndpointKind::CreateRef, &url, reply.status));
        }
        Ok(())
    }
}

/// Message stored in tag objects created by a retag
pub fn retag_message(old_tag: &str, new_tag: &str) -> String {
    format!("Retagging from {} to {}", old_tag, new_tag)
}
