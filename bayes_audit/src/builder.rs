pub use crate::config::*;
use crate::Election;

/// A builder for assembling an election piece by piece.
///
/// Nothing is checked until the election is built.
///
/// ```
/// use bayes_audit::builder::ElectionBuilder;
/// use bayes_audit::{AuditErrors, ContestSpec, CvrType};
///
/// let mut builder = ElectionBuilder::new("county");
/// builder.add_contest(ContestSpec::plurality("mayor", &["Anna", "Bob"]));
/// builder.add_collection("precinct-1", CvrType::Cvr, &["mayor"], 2);
///
/// builder.add_ballot_simple("precinct-1", "precinct-1-1", "mayor", &["Anna"], &["Anna"]);
/// builder.add_ballot_simple("precinct-1", "precinct-1-2", "mayor", &["Bob"], &["Anna"]);
///
/// let election = builder.build(0)?;
///
/// # Ok::<(), AuditErrors>(())
/// ```
pub struct ElectionBuilder {
    pub(crate) _name: String,
    pub(crate) _data: ElectionData,
}

impl ElectionBuilder {
    pub fn new(name: &str) -> ElectionBuilder {
        ElectionBuilder {
            _name: name.to_string(),
            _data: ElectionData::default(),
        }
    }

    pub fn add_contest(&mut self, contest: ContestSpec) {
        self._data.contests.push(contest);
    }

    /// Adds a collection whose manifest lists the ballots `{collection_id}-1`
    /// to `{collection_id}-{n_ballots}`.
    pub fn add_collection(
        &mut self,
        collection_id: &str,
        cvr_type: CvrType,
        contests: &[&str],
        n_ballots: usize,
    ) {
        self.add_collection_2(CollectionSpec {
            collection_id: collection_id.to_string(),
            manager: String::new(),
            cvr_type,
            contests: contests.iter().map(|s| s.to_string()).collect(),
            ballot_ids: (1..=n_ballots)
                .map(|i| format!("{}-{}", collection_id, i))
                .collect(),
            reported_ballots: None,
        })
    }

    pub fn add_collection_2(&mut self, collection: CollectionSpec) {
        self._data.collections.push(collection);
    }

    /// Adds the vote of a ballot as reported by the scanners.
    pub fn add_reported_vote(
        &mut self,
        collection_id: &str,
        ballot_id: &str,
        contest_id: &str,
        selections: &[&str],
    ) {
        self._data
            .reported_votes
            .push(ballot_vote(collection_id, ballot_id, contest_id, selections));
    }

    /// Adds the reported count of a vote in a collection without cast vote records.
    pub fn add_reported_tally(
        &mut self,
        collection_id: &str,
        contest_id: &str,
        selections: &[&str],
        count: u64,
    ) {
        self._data.reported_tallies.push(ReportedTally {
            collection_id: collection_id.to_string(),
            contest_id: contest_id.to_string(),
            vote: Vote::new(selections),
            count,
        });
    }

    /// Adds the vote of a ballot as read by the auditors.
    pub fn add_actual_vote(
        &mut self,
        collection_id: &str,
        ballot_id: &str,
        contest_id: &str,
        selections: &[&str],
    ) {
        self._data
            .actual_votes
            .push(ballot_vote(collection_id, ballot_id, contest_id, selections));
    }

    /// Adds both the reported and the actual vote of a ballot.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_ballot_simple(
        &mut self,
        collection_id: &str,
        ballot_id: &str,
        contest_id: &str,
        reported: &[&str],
        actual: &[&str],
    ) {
        self.add_reported_vote(collection_id, ballot_id, contest_id, reported);
        self.add_actual_vote(collection_id, ballot_id, contest_id, actual);
    }

    pub fn add_declared_outcome(&mut self, contest_id: &str, winners: &[&str]) {
        self._data.declared_outcomes.push(DeclaredOutcome {
            contest_id: contest_id.to_string(),
            winners: winners.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Checks all the data and assembles the election.
    ///
    /// Fails if the data has more than `max_warnings` warnings.
    pub fn build(self, max_warnings: usize) -> Result<Election, AuditErrors> {
        Election::new(&self._name, &self._data, max_warnings)
    }
}

fn ballot_vote(collection_id: &str, ballot_id: &str, contest_id: &str, selections: &[&str]) -> BallotVote {
    BallotVote {
        collection_id: collection_id.to_string(),
        ballot_id: ballot_id.to_string(),
        contest_id: contest_id.to_string(),
        vote: Vote::new(selections),
    }
}
