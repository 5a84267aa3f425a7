//! Container image existence checks
//!
//! Registry lookups are unauthenticated and only tell present (200) from
//! absent (anything else).

use shipmate_core::{
    ContainerImage, ContainerRegistry, EndpointKind, RepoRecord, Reporter, ResponseClass,
    Settings, classify,
};
use std::time::Duration;

use crate::error::{HostError, Result};

/// Checks that tagged images exist in their registries
#[derive(Debug, Clone)]
pub struct ContainerVerifier {
    http: reqwest::Client,
    dockerhub_url: String,
    harbor_url: String,
    harbor_project: String,
}

impl ContainerVerifier {
    pub fn new(
        dockerhub_url: impl Into<String>,
        harbor_url: impl Into<String>,
        harbor_project: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            dockerhub_url: dockerhub_url.into().trim_end_matches('/').to_string(),
            harbor_url: harbor_url.into().trim_end_matches('/').to_string(),
            harbor_project: harbor_project.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.dockerhub_url,
            &settings.harbor_url,
            &settings.harbor_project,
        )
    }

    /// Lookup url for `image` tagged `tag`
    pub fn image_url(&self, image: &ContainerImage, tag: &str) -> String {
        match image.registry {
            ContainerRegistry::DockerHub => format!(
                "{}/v2/repositories/{}/tags/{}",
                self.dockerhub_url, image.repo, tag
            ),
            ContainerRegistry::Harbor => {
                let prefix = format!("{}/", self.harbor_project);
                let repo = image.repo.strip_prefix(&prefix).unwrap_or(&image.repo);
                format!(
                    "{}/{}/{}/tags/{}",
                    self.harbor_url, self.harbor_project, repo, tag
                )
            }
        }
    }

    /// Whether `image` tagged `tag` exists
    pub async fn exists(&self, image: &ContainerImage, tag: &str) -> Result<bool> {
        let url = self.image_url(image, tag);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        tracing::debug!(%url, status, "registry lookup");
        Ok(classify(EndpointKind::ContainerTag, status) == ResponseClass::Success)
    }

    /// Check one record's image; records without an image pass
    pub async fn verify(&self, record: &RepoRecord, tag: &str) -> Result<()> {
        let Some(image) = &record.container else {
            return Ok(());
        };
        if self.exists(image, tag).await? {
            return Ok(());
        }
        Err(HostError::ContainerNotFound {
            repo: record.name.clone(),
            tag: tag.to_string(),
            registry: image.registry.to_string(),
            url: self.image_url(image, tag),
        })
    }

    /// Check every record with an image, stopping at the first missing one
    ///
    /// Returns how many images were checked.
    pub async fn verify_all(
        &self,
        records: &[RepoRecord],
        tag: &str,
        reporter: &dyn Reporter,
    ) -> Result<usize> {
        let with_images: Vec<_> = records.iter().filter(|r| r.container.is_some()).collect();
        let total = with_images.len();
        for (i, record) in with_images.into_iter().enumerate() {
            reporter.progress(i, total, &format!("checking {}", record.name));
            if let Err(e) = self.verify(record, tag).await {
                reporter.progress(total, total, "failed");
                reporter.error(&e.to_string());
                return Err(e);
            }
        }
        reporter.progress(total, total, "checked");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> ContainerVerifier {
        ContainerVerifier::from_settings(&Settings::default()).unwrap()
    }

    #[test]
    fn test_dockerhub_url() {
        let image = ContainerImage {
            repo: "sslhep/servicex_app".to_string(),
            registry: ContainerRegistry::DockerHub,
        };
        assert_eq!(
            verifier().image_url(&image, "1.2.4rc2-release1"),
            "https://hub.docker.com/v2/repositories/sslhep/servicex_app/tags/1.2.4rc2-release1"
        );
    }

    #[test]
    fn test_harbor_url() {
        let bare = ContainerImage {
            repo: "servicex_app".to_string(),
            registry: ContainerRegistry::Harbor,
        };
        let prefixed = ContainerImage {
            repo: "sslhep/servicex_app".to_string(),
            registry: ContainerRegistry::Harbor,
        };
        let expected = "https://hub.opensciencegrid.org/sslhep/servicex_app/tags/develop1";
        assert_eq!(verifier().image_url(&bare, "develop1"), expected);
        assert_eq!(verifier().image_url(&prefixed, "develop1"), expected);
    }
}
