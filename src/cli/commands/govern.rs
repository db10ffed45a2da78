use anyhow::Result;
use tracing::Instrument;

use super::Command;
use repo_warden::governance::{MonitoredRepository, PassReport};
use repo_warden::observability::{create_pass_span, OperationTimer};
use repo_warden::telemetry::generate_correlation_id;

/// Which policies a scheduled pass applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Full,
    PurgeOnly,
}

impl PassKind {
    fn name(&self) -> &'static str {
        match self {
            PassKind::Full => "govern",
            PassKind::PurgeOnly => "purge",
        }
    }
}

pub struct GovernCommand {
    repository: MonitoredRepository,
    kind: PassKind,
}

impl GovernCommand {
    pub fn new(repository: MonitoredRepository, kind: PassKind) -> Self {
        Self { repository, kind }
    }
}

impl Command for GovernCommand {
    async fn execute(&self) -> Result<()> {
        let correlation_id = generate_correlation_id();
        let span = create_pass_span(
            self.kind.name(),
            &self.repository.full_name(),
            &correlation_id,
        );
        let timer = OperationTimer::new(self.kind.name());

        let governor = self.repository.governor();
        let report = async {
            match self.kind {
                PassKind::Full => governor.run_pass().await,
                PassKind::PurgeOnly => governor.purge().await,
            }
        }
        .instrument(span)
        .await;
        timer.finish();

        print_report(&self.repository.full_name(), &report);
        Ok(())
    }
}

fn print_report(repository: &str, report: &PassReport) {
    println!("🧹 {repository}");
    println!("   Cancelled runs: {}", report.cancelled.len());
    println!("   Removed runs:   {}", report.removed.len());
    if report.failures > 0 {
        println!("   ⚠️  Failed actions: {} (see logs)", report.failures);
    }
    if report.is_noop() {
        println!("   Nothing to do");
    }
}
