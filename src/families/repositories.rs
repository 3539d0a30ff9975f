use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::DegradedRunPolicy;
use crate::collect::Family;
use crate::config::ApiVersion;
use crate::error::Result;
use crate::metrics::{MetricDesc, Sample, ValueKind};
use crate::upstream::{fetch_all_json, Upstream};

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub name: String,
}

/// Repository as listed by either API generation. v1 reports `star_count`
/// and `tags_count`; v2 replaced both with `artifact_count`.
#[derive(Debug, Deserialize)]
struct Repository {
    id: i64,
    name: String,
    #[serde(default)]
    pull_count: f64,
    #[serde(default)]
    star_count: f64,
    #[serde(default)]
    tags_count: f64,
    #[serde(default)]
    artifact_count: f64,
}

/// Pull and artifact counts for every repository of every project.
/// Fans out one paginated repository listing per project.
pub struct Repositories {
    upstream: Arc<dyn Upstream>,
    api: ApiVersion,
    up: MetricDesc,
    pulls: MetricDesc,
    stars: MetricDesc,
    tags: MetricDesc,
}

impl Repositories {
    pub fn new(upstream: Arc<dyn Upstream>, instance: &str) -> Self {
        Self {
            upstream,
            api: ApiVersion::V2,
            up: MetricDesc::gauge(
                instance,
                "repositories_up",
                "Was the last query of harbor repositories successful.",
            ),
            pulls: MetricDesc::new(
                instance,
                "repositories_pull_total",
                "Pull count of the repository.",
                ValueKind::Counter,
                &["repo_name", "repo_id"],
            ),
            stars: MetricDesc::new(
                instance,
                "repositories_star_total",
                "Star count of the repository.",
                ValueKind::Gauge,
                &["repo_name", "repo_id"],
            ),
            tags: MetricDesc::new(
                instance,
                "repositories_tags_total",
                "Tag (v1) or artifact (v2) count of the repository.",
                ValueKind::Gauge,
                &["repo_name", "repo_id"],
            ),
        }
    }

    /// Select the endpoint layout; defaults to v2.
    pub fn api_version(mut self, api: ApiVersion) -> Self {
        self.api = api;
        self
    }

    fn repositories_path(&self, project: &Project) -> String {
        match self.api {
            ApiVersion::V1 => format!("/repositories?project_id={}", project.project_id),
            ApiVersion::V2 => format!("/projects/{}/repositories", project.name),
        }
    }
}

#[async_trait]
impl Family for Repositories {
    type Item = Project;

    fn name(&self) -> &str {
        "repositories"
    }

    fn up_desc(&self) -> &MetricDesc {
        &self.up
    }

    fn degraded_policy(&self) -> DegradedRunPolicy {
        DegradedRunPolicy::Cache
    }

    async fn list(&self) -> Result<Vec<Project>> {
        fetch_all_json(self.upstream.as_ref(), "/projects").await
    }

    async fn process(&self, project: Project) -> Result<Vec<Sample>> {
        let path = self.repositories_path(&project);
        let repos: Vec<Repository> = fetch_all_json(self.upstream.as_ref(), &path).await?;

        let mut out = Vec::with_capacity(repos.len() * 3);
        for repo in &repos {
            let repo_id = repo.id.to_string();
            let labels = [repo.name.as_str(), repo_id.as_str()];
            out.push(self.pulls.sample(repo.pull_count, &labels));
            match self.api {
                ApiVersion::V1 => {
                    out.push(self.stars.sample(repo.star_count, &labels));
                    out.push(self.tags.sample(repo.tags_count, &labels));
                }
                ApiVersion::V2 => out.push(self.tags.sample(repo.artifact_count, &labels)),
            }
        }
        Ok(out)
    }

    fn describe(&self, project: &Project) -> String {
        format!("project {} ({})", project.project_id, project.name)
    }
}
