use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::config::GovernanceSettings;
use crate::github::types::{Branch, Milestone};
use crate::github::{collect_all, GitHubError, VersionControlHost};

use super::versions::resolve_milestone_for_branch;

/// Role a branch plays in the repository, derived from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchCategory {
    Mainline,
    MilestoneBranch,
    Pages,
    Deployment,
    Other,
}

impl fmt::Display for BranchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchCategory::Mainline => "mainline",
            BranchCategory::MilestoneBranch => "milestone-branch",
            BranchCategory::Pages => "pages",
            BranchCategory::Deployment => "deployment",
            BranchCategory::Other => "other",
        };
        f.write_str(name)
    }
}

fn milestone_branch_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+\.\d+\.x$").ok())
        .as_ref()
}

/// Configured names match exactly; an entry ending in `*` matches by prefix.
fn matches_configured(name: &str, configured: &[String]) -> bool {
    configured.iter().any(|entry| match entry.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == entry,
    })
}

#[derive(Debug, Clone)]
pub struct BranchClassifier {
    settings: Arc<GovernanceSettings>,
}

impl BranchClassifier {
    pub fn new(settings: Arc<GovernanceSettings>) -> Self {
        Self { settings }
    }

    /// Categorize a branch name. First match wins: mainline, milestone branch,
    /// pages, deployment, other.
    pub fn classify(&self, name: &str) -> BranchCategory {
        if name.eq_ignore_ascii_case(&self.settings.mainline_branch) {
            BranchCategory::Mainline
        } else if milestone_branch_pattern().is_some_and(|p| p.is_match(name)) {
            BranchCategory::MilestoneBranch
        } else if matches_configured(name, &self.settings.pages_branches) {
            BranchCategory::Pages
        } else if matches_configured(name, &self.settings.deployment_branches) {
            BranchCategory::Deployment
        } else {
            BranchCategory::Other
        }
    }

    /// Whether a branch takes part in governance given the open milestones.
    pub fn is_governed(&self, branch: &Branch, milestones: &[Milestone]) -> bool {
        match self.classify(&branch.name) {
            BranchCategory::Mainline | BranchCategory::Other => true,
            BranchCategory::MilestoneBranch => {
                resolve_milestone_for_branch(&branch.name, milestones).is_some()
            }
            BranchCategory::Pages | BranchCategory::Deployment => false,
        }
    }

    /// Every branch eligible for governance. Milestone branches are kept only while an
    /// open milestone exists for their version line; pages and deployment branches never.
    /// A failed milestone listing is treated as no open milestones.
    pub async fn list_active_branches(
        &self,
        host: &dyn VersionControlHost,
    ) -> Result<Vec<Branch>, GitHubError> {
        let branches = collect_all(|page| host.get_branches(page)).await?;
        let milestones = match collect_all(|page| host.get_milestones(page)).await {
            Ok(milestones) => milestones,
            Err(e) => {
                warn!(error = %e, "Could not list milestones; milestone branches are skipped");
                Vec::new()
            }
        };

        let total = branches.len();
        let active: Vec<Branch> = branches
            .into_iter()
            .filter(|branch| {
                let governed = self.is_governed(branch, &milestones);
                debug!(
                    branch = %branch.name,
                    category = %self.classify(&branch.name),
                    governed,
                    "Classified branch"
                );
                governed
            })
            .collect();

        info!(
            repository = %host.full_name(),
            total,
            active = active.len(),
            "Resolved active branches"
        );
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::InMemoryHost;

    fn classifier() -> BranchClassifier {
        let settings = GovernanceSettings {
            deployment_branches: vec!["heroku".to_string(), "deploy-*".to_string()],
            ..GovernanceSettings::default()
        };
        BranchClassifier::new(Arc::new(settings))
    }

    #[test]
    fn test_classify_each_category() {
        let classifier = classifier();
        assert_eq!(classifier.classify("master"), BranchCategory::Mainline);
        assert_eq!(classifier.classify("MASTER"), BranchCategory::Mainline);
        assert_eq!(classifier.classify("6.5.x"), BranchCategory::MilestoneBranch);
        assert_eq!(classifier.classify("gh-pages"), BranchCategory::Pages);
        assert_eq!(classifier.classify("heroku"), BranchCategory::Deployment);
        assert_eq!(classifier.classify("deploy-staging"), BranchCategory::Deployment);
        assert_eq!(classifier.classify("feature/login"), BranchCategory::Other);
        assert_eq!(classifier.classify("6.5.1"), BranchCategory::Other);
    }

    #[tokio::test]
    async fn test_active_branches_drop_unmatched_milestone_branches() {
        let host = InMemoryHost::default().with_page_size(2);
        for name in ["master", "6.5.x", "6.4.x", "gh-pages", "heroku", "feature"] {
            host.add_branch(name, &format!("{name}-sha"));
        }
        host.add_milestone(Milestone::open(1, "6.5.2"));

        let active = classifier().list_active_branches(&host).await.unwrap();
        let names: Vec<&str> = active.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["master", "6.5.x", "feature"]);
    }
}
