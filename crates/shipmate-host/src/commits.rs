//! Commit resolution
//!
//! Branch-sourced records get the head commit of their branch, commit-sourced
//! records get their commit after the host confirms it exists, and retag
//! records get the commit an existing tag points to.

use serde::Deserialize;
use shipmate_core::{EndpointKind, RepoRecord, Reporter, ResponseClass, SourceRef};

use crate::client::HostClient;
use crate::error::{HostError, Result};

#[derive(Debug, Deserialize)]
struct BranchDetail {
    commit: CommitPointer,
}

#[derive(Debug, Deserialize)]
struct CommitPointer {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    name: String,
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
}

/// A tag ref lookup answers with one ref, or with every ref sharing the prefix
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefLookup {
    One(GitRef),
    Many(Vec<GitRef>),
}

#[derive(Debug, Deserialize)]
struct TagObject {
    object: GitObject,
}

/// Resolves records to commits through the host API
pub struct CommitResolver<'a> {
    client: &'a HostClient,
}

impl<'a> CommitResolver<'a> {
    pub fn new(client: &'a HostClient) -> Self {
        Self { client }
    }

    /// Resolve a record from its configured source
    pub async fn resolve(&self, record: &mut RepoRecord) -> Result<()> {
        match record.source.clone() {
            SourceRef::Branch(_) => self.resolve_branch(record).await,
            SourceRef::Commit(sha) => {
                if !self.verify_commit(&record.name, &sha).await? {
                    return Err(HostError::CommitNotFound {
                        repo: record.name.clone(),
                        commit: sha,
                    });
                }
                record.set_commit(sha)?;
                Ok(())
            }
        }
    }

    /// Set the record's commit to the head of its branch
    ///
    /// A missing branch fails without touching the record.
    pub async fn resolve_branch(&self, record: &mut RepoRecord) -> Result<()> {
        let Some(branch) = record.branch().map(str::to_string) else {
            return Err(HostError::MissingCommit {
                repo: record.name.clone(),
            });
        };

        let url = format!("{}/branches/{}", self.client.repo_url(&record.name), branch);
        let reply = self.client.get(&url, EndpointKind::BranchDetail).await?;
        match reply.class {
            ResponseClass::Success => {
                let detail: BranchDetail = reply.json()?;
                tracing::debug!(repo = %record.name, %branch, sha = %detail.commit.sha, "resolved branch");
                record.set_commit(detail.commit.sha)?;
                Ok(())
            }
            ResponseClass::NotFound => Err(HostError::BranchNotFound {
                repo: record.name.clone(),
                branch,
            }),
            _ => Err(HostError::status(
                EndpointKind::BranchDetail,
                &url,
                reply.status,
            )),
        }
    }

    /// Whether `sha` exists in repository `repo`
    pub async fn verify_commit(&self, repo: &str, sha: &str) -> Result<bool> {
        let url = format!("{}/commits/{}", self.client.repo_url(repo), sha);
        let reply = self.client.get(&url, EndpointKind::CommitDetail).await?;
        match reply.class {
            ResponseClass::Success => Ok(true),
            ResponseClass::NotFound | ResponseClass::Invalid => Ok(false),
            ResponseClass::TransientFatal => Err(HostError::status(
                EndpointKind::CommitDetail,
                &url,
                reply.status,
            )),
        }
    }

    /// Set the record's commit to the one its `old_tag` points to
    ///
    /// Annotated tags are followed through their tag object; lightweight
    /// tags point at the commit directly.
    pub async fn resolve_tag(&self, record: &mut RepoRecord) -> Result<()> {
        let old_tag = record
            .old_tag
            .clone()
            .ok_or_else(|| HostError::MissingOldTag {
                repo: record.name.clone(),
            })?;

        let url = format!("{}/git/refs/tags/{}", self.client.repo_url(&record.name), old_tag);
        let reply = self.client.get(&url, EndpointKind::TagRef).await?;
        let not_found = || HostError::TagNotFound {
            repo: record.name.clone(),
            tag: old_tag.clone(),
        };
        match reply.class {
            ResponseClass::Success => {}
            ResponseClass::NotFound => return Err(not_found()),
            _ => return Err(HostError::status(EndpointKind::TagRef, &url, reply.status)),
        }

        let wanted = format!("refs/tags/{}", old_tag);
        let git_ref = match reply.json::<RefLookup>()? {
            RefLookup::One(r) if r.name == wanted => r,
            RefLookup::Many(refs) => refs
                .into_iter()
                .find(|r| r.name == wanted)
                .ok_or_else(not_found)?,
            RefLookup::One(_) => return Err(not_found()),
        };

        let sha = match git_ref.object.kind.as_str() {
            "commit" => git_ref.object.sha,
            "tag" => {
                let object_url = git_ref
                    .object
                    .url
                    .ok_or_else(|| HostError::malformed(&url, "tag ref without object url"))?;
                self.tag_object_commit(&object_url).await?
            }
            other => {
                return Err(HostError::malformed(
                    &url,
                    format!("tag points to a {} object", other),
                ));
            }
        };

        tracing::debug!(repo = %record.name, tag = %old_tag, %sha, "resolved tag");
        record.set_commit(sha)?;
        Ok(())
    }

    async fn tag_object_commit(&self, url: &str) -> Result<String> {
        let reply = self.client.get(url, EndpointKind::TagObject).await?;
        if !reply.is_success() {
            return Err(HostError::status(EndpointKind::TagObject, url, reply.status));
        }
        let tag: TagObject = reply.json()?;
        Ok(tag.object.sha)
    }

    /// Resolve every record in order, stopping at the first failure
    pub async fn check_repos(
        &self,
        records: &mut [RepoRecord],
        reporter: &dyn Reporter,
    ) -> Result<()> {
        let total = records.len();
        for (i, record) in records.iter_mut().enumerate() {
            reporter.progress(i, total, &format!("resolving {}", record.name));
            if let Err(e) = self.resolve(record).await {
                reporter.progress(total, total, "failed");
                reporter.error(&format!(
                    "Can't resolve {} for {}: {}",
                    record.source.describe(),
                    record.name,
                    e
                ));
                return Err(e);
            }
        }
        reporter.progress(total, total, "resolved");
        Ok(())
    }

    /// Resolve every retag record from its old tag, stopping at the first failure
    pub async fn check_tags(
        &self,
        records: &mut [RepoRecord],
        reporter: &dyn Reporter,
    ) -> Result<()> {
        let total = records.len();
        for (i, record) in records.iter_mut().enumerate() {
            reporter.progress(i, total, &format!("looking up {}", record.name));
            if let Err(e) = self.resolve_tag(record).await {
                reporter.progress(total, total, "failed");
                reporter.error(&format!("Can't find old tag for {}: {}", record.name, e));
                return Err(e);
            }
        }
        reporter.progress(total, total, "resolved");
        Ok(())
    }
}
