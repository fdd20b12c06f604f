/*!
Bayesian risk-limiting audits for elections with several contests spread over
several collections of paper ballots.

The main entry points are [`Election`] (or [`builder::ElectionBuilder`]) to
assemble and check the election data, and [`Audit`] to run the staged audit.
See the [manual] for the file formats of the `multiaudit` program.
*/
mod config;
mod outcomes;
mod reported;
mod risk;
mod sample;
mod structure;

pub mod audit;
pub mod builder;
pub mod manual;

use log::info;

pub use crate::audit::{Audit, AuditResult, AuditTermination, Measurement, StageSnapshot};
pub use crate::config::*;
pub use crate::outcomes::{compute_outcome, same_outcome};
pub use crate::reported::ReportedResults;
pub use crate::risk::{derive_seed, measurement_rng, RiskEstimator};
pub use crate::sample::{ActualVotes, SampleStore, SampleTally};
pub use crate::structure::{
    Collection, CollectionIdx, Contest, ContestIdx, ElectionStructure,
};

/// An election with its reported results and its audited ballots, checked
/// for consistency.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    pub structure: ElectionStructure,
    pub reported: ReportedResults,
    pub actual: ActualVotes,
    /// The issues found in the data. There are at most `max_warnings` of them.
    pub warnings: Warnings,
}

impl Election {
    /// Checks and assembles the election data.
    ///
    /// Arguments:
    /// * `name` the name of the election
    /// * `data` the contests, collections, reported and audited votes
    /// * `max_warnings` the number of warnings tolerated in the data
    pub fn new(name: &str, data: &ElectionData, max_warnings: usize) -> Result<Election, AuditErrors> {
        let mut warnings = Warnings::new();
        let mut structure =
            ElectionStructure::new(name, &data.contests, &data.collections, &mut warnings)?;
        let reported = ReportedResults::new(
            &mut structure,
            &data.reported_votes,
            &data.reported_tallies,
            &data.declared_outcomes,
            &mut warnings,
        )?;
        let actual = ActualVotes::new(&mut structure, &data.actual_votes, &mut warnings)?;
        info!(
            "Election `{}` checked: {} warnings",
            name,
            warnings.len()
        );
        warnings.check(max_warnings)?;
        Ok(Election {
            structure,
            reported,
            actual,
            warnings,
        })
    }
}
