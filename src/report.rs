use std::collections::BTreeSet;
use std::fmt;

use crate::dispatch::DispatchOutcome;
use crate::model::EntityId;
use crate::notify::{Notification, Severity};

/// Display-ready summary of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub lines: Vec<Notification>,
    pub rollup: Notification,
    /// Entities with at least one successful request, ascending.
    pub succeeded_ids: Vec<EntityId>,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        self.lines.iter().any(|l| l.severity == Severity::Error)
    }

    /// Every line followed by the rollup, in presentation order.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.lines.iter().chain(std::iter::once(&self.rollup))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.notifications() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn report(outcomes: &[DispatchOutcome]) -> Report {
    let mut lines = Vec::new();
    let (mut attempted, mut succeeded, mut failed, mut unintegrated) = (0, 0, 0, 0);
    let mut succeeded_ids = BTreeSet::new();

    for o in outcomes {
        attempted += o.attempted;
        succeeded += o.succeeded;
        failed += o.failed;
        unintegrated += o.unintegrated_ids.len();
        succeeded_ids.extend(o.succeeded_ids.iter().copied());

        if o.succeeded > 0 {
            let verb = if o.confirmed { "delivered" } else { "sent" };
            lines.push(Notification::new(
                format!("{} Success", o.platform),
                format!(
                    "{} {} {}: {}",
                    o.succeeded,
                    plural(o.succeeded, "item", "items"),
                    verb,
                    id_list(&o.succeeded_ids)
                ),
                Severity::Success,
            ));
        }
        if o.failed > 0 {
            lines.push(Notification::new(
                format!("{} Errors", o.platform),
                format!(
                    "{} {} failed: {}. Check the logs for details.",
                    o.failed,
                    plural(o.failed, "item", "items"),
                    id_list(&o.failed_ids)
                ),
                Severity::Error,
            ));
        }
        if o.is_unintegrated() {
            lines.push(Notification::new(
                format!("{} Pending", o.platform),
                format!(
                    "{} {} will be handled separately; {} has no automation yet: {}",
                    o.unintegrated_ids.len(),
                    plural(o.unintegrated_ids.len(), "item", "items"),
                    o.platform,
                    id_list(&o.unintegrated_ids)
                ),
                Severity::Info,
            ));
        }
    }

    let mut summary = format!("{attempted} attempted, {succeeded} succeeded, {failed} failed");
    if unintegrated > 0 {
        summary.push_str(&format!(", {unintegrated} handled separately"));
    }
    let severity = if failed > 0 { Severity::Warning } else { Severity::Info };
    Report {
        lines,
        rollup: Notification::new("Dispatch Complete", summary, severity),
        succeeded_ids: succeeded_ids.into_iter().collect(),
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

fn id_list(ids: &[EntityId]) -> String {
    ids.iter().map(|id| format!("#{id}")).collect::<Vec<_>>().join(", ")
}
