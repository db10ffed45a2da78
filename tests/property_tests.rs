// Property-based tests for branch classification, version resolution and run deduplication

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use repo_warden::config::GovernanceSettings;
use repo_warden::github::types::{Milestone, WorkflowRun, WorkflowRunEvent, WorkflowRunStatus};
use repo_warden::governance::runs::duplicate_runs;
use repo_warden::governance::{resolve_milestone_for_branch, BranchCategory, BranchClassifier, Version};

fn classifier() -> BranchClassifier {
    BranchClassifier::new(Arc::new(GovernanceSettings::default()))
}

// Re-case "master" letter by letter
fn mainline_spelling() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), 6).prop_map(|upper| {
        "master"
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn pre_release() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("SNAPSHOT".to_string())),
        "RC[1-9]".prop_map(Some),
    ]
}

fn queued_run(id: u64, branch: &str, workflow: &str, run_number: u64) -> WorkflowRun {
    WorkflowRun::new(
        id,
        workflow,
        branch,
        run_number,
        WorkflowRunEvent::Push,
        WorkflowRunStatus::Queued,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    )
}

proptest! {
    #[test]
    fn prop_mainline_matches_in_any_case(name in mainline_spelling()) {
        prop_assert_eq!(classifier().classify(&name), BranchCategory::Mainline);
    }

    #[test]
    fn prop_maintenance_branch_resolves_its_minor_line(
        major in 0u64..50,
        minor in 0u64..50,
        patch in 0u64..50,
    ) {
        let branch = format!("{major}.{minor}.x");
        prop_assert_eq!(classifier().classify(&branch), BranchCategory::MilestoneBranch);

        let same_line = vec![Milestone::open(1, &format!("{major}.{minor}.{patch}"))];
        prop_assert!(resolve_milestone_for_branch(&branch, &same_line).is_some());

        let next_line = vec![Milestone::open(2, &format!("{major}.{}.0", minor + 1))];
        prop_assert!(resolve_milestone_for_branch(&branch, &next_line).is_none());
    }

    #[test]
    fn prop_version_display_parses_back(
        major in 0u64..1000,
        minor in 0u64..1000,
        patch in 0u64..1000,
        pre in pre_release(),
    ) {
        let version = Version { major, minor, patch, pre_release: pre };
        let reparsed: Version = version.to_string().parse().unwrap();
        prop_assert_eq!(&reparsed, &version);
        prop_assert!(version.release() >= version);
    }

    #[test]
    fn prop_dedup_keeps_highest_run_number_per_group(
        runs in prop::collection::vec((0usize..3, 0usize..2, 1u64..500), 0..40)
    ) {
        let branches = ["master", "7.0.x", "feature"];
        let workflows = ["build", "tests"];
        let runs: Vec<WorkflowRun> = runs
            .iter()
            .enumerate()
            .map(|(i, (b, w, n))| queued_run(i as u64 + 1, branches[*b], workflows[*w], *n))
            .collect();

        let losers: Vec<u64> = duplicate_runs(&runs).iter().map(|r| r.id).collect();
        let survivors: Vec<&WorkflowRun> = runs.iter().filter(|r| !losers.contains(&r.id)).collect();

        let mut per_group: HashMap<(String, String), Vec<u64>> = HashMap::new();
        for run in &runs {
            per_group
                .entry((run.head_branch.clone(), run.name.clone()))
                .or_default()
                .push(run.run_number);
        }

        // one survivor per group, carrying the group's highest run number
        prop_assert_eq!(survivors.len(), per_group.len());
        for survivor in survivors {
            let numbers = &per_group[&(survivor.head_branch.clone(), survivor.name.clone())];
            prop_assert_eq!(Some(&survivor.run_number), numbers.iter().max());
        }
    }
}
