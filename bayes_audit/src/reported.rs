use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::outcomes::{compute_outcome, same_outcome};
use crate::structure::{CollectionIdx, ContestIdx, ElectionStructure};

/// The reported results of the election: the votes from the original scan,
/// their tallies and the reported winners.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportedResults {
    // Reported vote of every ballot of a relevant collection, by manifest position.
    ballot_votes: BTreeMap<(ContestIdx, CollectionIdx), Vec<Vote>>,
    // The tallies of the ballot-level votes.
    tallies: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>>,
    // Aggregate tallies of the collections without cast vote records.
    aggregates: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>>,
    contest_tallies: Vec<BTreeMap<Vote, VoteCount>>,
    totals: Vec<VoteCount>,
    outcomes: Vec<Option<Vec<String>>>,
}

impl ReportedResults {
    /// Builds the reported results from the raw reported votes.
    ///
    /// Arguments:
    /// * `structure` the election structure. The contests will learn about the
    /// write-in and error selections present in the votes.
    /// * `ballot_votes` the reported votes of the ballots in collections with cast vote records.
    /// Ballots without a vote for a relevant contest are reported as `-NoSuchContest`.
    /// * `aggregate_tallies` the reported counts of the collections without cast vote records.
    /// * `declared_outcomes` the winners as announced, checked against the computed ones.
    pub fn new(
        structure: &mut ElectionStructure,
        ballot_votes: &[BallotVote],
        aggregate_tallies: &[ReportedTally],
        declared_outcomes: &[DeclaredOutcome],
        warnings: &mut Warnings,
    ) -> Result<ReportedResults, AuditErrors> {
        info!(
            "Processing {} reported ballot votes and {} aggregate tallies",
            ballot_votes.len(),
            aggregate_tallies.len()
        );

        let mut raw: BTreeMap<(ContestIdx, CollectionIdx), Vec<Option<Vote>>> = BTreeMap::new();
        for (cidx, _) in structure.contests() {
            for pidx in structure.relevant_collections(cidx) {
                raw.insert((cidx, pidx), vec![None; structure.collection(pidx).n_ballots()]);
            }
        }

        for bv in ballot_votes.iter() {
            let cidx = structure.contest_idx(&bv.contest_id)?;
            let pidx = structure.collection_idx(&bv.collection_id)?;
            structure.check_relevant(cidx, pidx)?;
            let collection = structure.collection(pidx);
            if collection.cvr_type != CvrType::Cvr {
                return Err(AuditErrors::CvrTypeMismatch {
                    collection: collection.id.clone(),
                    cvr_type: collection.cvr_type,
                });
            }
            let pos = collection
                .position(&bv.ballot_id)
                .ok_or_else(|| AuditErrors::UnknownBallot {
                    collection: bv.collection_id.clone(),
                    ballot: bv.ballot_id.clone(),
                })?;
            let slot = raw
                .get_mut(&(cidx, pidx))
                .and_then(|votes| votes.get_mut(pos))
                .ok_or_else(|| AuditErrors::NotRelevant {
                    contest: bv.contest_id.clone(),
                    collection: bv.collection_id.clone(),
                })?;
            if slot.is_some() {
                return Err(AuditErrors::DuplicateVote {
                    contest: bv.contest_id.clone(),
                    collection: bv.collection_id.clone(),
                    ballot: bv.ballot_id.clone(),
                });
            }
            *slot = Some(bv.vote.clone());
        }

        let mut filled: BTreeMap<(ContestIdx, CollectionIdx), Vec<Vote>> = BTreeMap::new();
        let mut tallies: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>> =
            BTreeMap::new();
        for ((cidx, pidx), votes) in raw.into_iter() {
            let default_vote = match structure.collection(pidx).cvr_type {
                CvrType::Cvr => Vote::single(NO_SUCH_CONTEST),
                CvrType::NoCvr => Vote::single(NO_CVR),
            };
            let votes: Vec<Vote> = votes
                .into_iter()
                .map(|v| v.unwrap_or_else(|| default_vote.clone()))
                .collect();
            let mut tally: BTreeMap<Vote, VoteCount> = BTreeMap::new();
            for v in votes.iter() {
                *tally.entry(v.clone()).or_insert(VoteCount::EMPTY) += VoteCount(1);
            }
            for v in tally.keys() {
                structure.register_vote(cidx, v, warnings)?;
            }
            debug!(
                "ReportedResults: contest {} collection {}: tally {:?}",
                structure.contest(cidx).id,
                structure.collection(pidx).id,
                tally
            );
            tallies.insert((cidx, pidx), tally);
            filled.insert((cidx, pidx), votes);
        }

        let aggregates = read_aggregates(structure, aggregate_tallies, warnings)?;

        let mut contest_tallies: Vec<BTreeMap<Vote, VoteCount>> = Vec::new();
        let mut totals: Vec<VoteCount> = Vec::new();
        let mut outcomes: Vec<Option<Vec<String>>> = Vec::new();
        for (cidx, contest) in structure.contests() {
            let mut contest_tally: BTreeMap<Vote, VoteCount> = BTreeMap::new();
            // The tally used for the outcome, where the aggregate counts stand in
            // for the ballots without cast vote records.
            let mut outcome_tally: BTreeMap<Vote, VoteCount> = BTreeMap::new();
            for pidx in structure.relevant_collections(cidx) {
                if let Some(tally) = tallies.get(&(cidx, pidx)) {
                    for (v, vc) in tally.iter() {
                        *contest_tally.entry(v.clone()).or_insert(VoteCount::EMPTY) += *vc;
                    }
                }
                let source = aggregates
                    .get(&(cidx, pidx))
                    .or_else(|| tallies.get(&(cidx, pidx)));
                if let Some(tally) = source {
                    for (v, vc) in tally.iter() {
                        *outcome_tally.entry(v.clone()).or_insert(VoteCount::EMPTY) += *vc;
                    }
                }
                if structure.collection(pidx).cvr_type == CvrType::NoCvr
                    && !aggregates.contains_key(&(cidx, pidx))
                {
                    warnings.add(format!(
                        "no reported tally for contest `{}` in collection `{}`",
                        contest.id,
                        structure.collection(pidx).id
                    ));
                }
            }
            totals.push(contest_tally.values().cloned().sum());

            let outcome = match contest.contest_type {
                ContestType::Plurality => Some(compute_outcome(contest, &outcome_tally)?),
                ContestType::Irv => {
                    info!(
                        "Contest {}: outcome of IRV contests is not computed",
                        contest.id
                    );
                    None
                }
            };
            info!(
                "Contest {}: {} reported votes, reported outcome {:?}",
                contest.id,
                totals[cidx.0].0,
                outcome
            );
            contest_tallies.push(contest_tally);
            outcomes.push(outcome);
        }

        for declared in declared_outcomes.iter() {
            let cidx = structure.contest_idx(&declared.contest_id)?;
            match &outcomes[cidx.0] {
                Some(computed) if !same_outcome(computed, &declared.winners) => {
                    warnings.add(format!(
                        "contest `{}`: declared winners {:?} differ from the reported tally winners {:?}",
                        declared.contest_id, declared.winners, computed
                    ));
                }
                Some(_) => {}
                None => {
                    outcomes[cidx.0] = Some(declared.winners.clone());
                }
            }
        }

        Ok(ReportedResults {
            ballot_votes: filled,
            tallies,
            aggregates,
            contest_tallies,
            totals,
            outcomes,
        })
    }

    /// The reported votes of a collection for a contest, in manifest order.
    pub fn ballot_votes(&self, cidx: ContestIdx, pidx: CollectionIdx) -> Option<&[Vote]> {
        self.ballot_votes.get(&(cidx, pidx)).map(|v| v.as_slice())
    }

    /// The reported tally of a contest in a collection.
    pub fn tally(
        &self,
        cidx: ContestIdx,
        pidx: CollectionIdx,
    ) -> Option<&BTreeMap<Vote, VoteCount>> {
        self.tallies.get(&(cidx, pidx))
    }

    /// The number of ballots of the collection reported with the given vote.
    pub fn reported_count(&self, cidx: ContestIdx, pidx: CollectionIdx, vote: &Vote) -> VoteCount {
        self.tallies
            .get(&(cidx, pidx))
            .and_then(|t| t.get(vote))
            .cloned()
            .unwrap_or(VoteCount::EMPTY)
    }

    /// The aggregate tally of a collection without cast vote records, if any was reported.
    pub fn aggregate_tally(
        &self,
        cidx: ContestIdx,
        pidx: CollectionIdx,
    ) -> Option<&BTreeMap<Vote, VoteCount>> {
        self.aggregates.get(&(cidx, pidx))
    }

    /// The reported count of every vote of the contest, over all its collections.
    pub fn contest_tally(&self, cidx: ContestIdx) -> &BTreeMap<Vote, VoteCount> {
        &self.contest_tallies[cidx.0]
    }

    /// All the distinct votes reported for the contest.
    pub fn reported_votes(&self, cidx: ContestIdx) -> BTreeSet<Vote> {
        self.contest_tallies[cidx.0].keys().cloned().collect()
    }

    pub fn total(&self, cidx: ContestIdx) -> VoteCount {
        self.totals[cidx.0]
    }

    /// The reported winners of the contest.
    pub fn outcome(&self, cidx: ContestIdx) -> Option<&[String]> {
        self.outcomes[cidx.0].as_deref()
    }
}

fn read_aggregates(
    structure: &mut ElectionStructure,
    aggregate_tallies: &[ReportedTally],
    warnings: &mut Warnings,
) -> Result<BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>>, AuditErrors> {
    let mut aggregates: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>> =
        BTreeMap::new();
    for rt in aggregate_tallies.iter() {
        let cidx = structure.contest_idx(&rt.contest_id)?;
        let pidx = structure.collection_idx(&rt.collection_id)?;
        structure.check_relevant(cidx, pidx)?;
        let collection = structure.collection(pidx);
        if collection.cvr_type != CvrType::NoCvr {
            return Err(AuditErrors::CvrTypeMismatch {
                collection: collection.id.clone(),
                cvr_type: collection.cvr_type,
            });
        }
        let n_ballots = collection.n_ballots() as u64;
        if rt.count > n_ballots {
            return Err(AuditErrors::TallyOutOfRange {
                contest: rt.contest_id.clone(),
                collection: rt.collection_id.clone(),
                count: rt.count,
                max: n_ballots,
            });
        }
        structure.register_vote(cidx, &rt.vote, warnings)?;
        let e = aggregates
            .entry((cidx, pidx))
            .or_insert_with(BTreeMap::new)
            .entry(rt.vote.clone())
            .or_insert(VoteCount::EMPTY);
        *e += VoteCount(rt.count);
    }

    // Every ballot of the collection must be accounted for.
    for ((cidx, pidx), tally) in aggregates.iter() {
        let expected = structure.collection(*pidx).n_ballots() as u64;
        let actual: VoteCount = tally.values().cloned().sum();
        if actual.0 != expected {
            return Err(AuditErrors::TallyMismatch {
                contest: structure.contest(*cidx).id.clone(),
                collection: structure.collection(*pidx).id.clone(),
                expected,
                actual: actual.0,
            });
        }
    }
    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(pbcid: &str, cvr_type: CvrType, contests: &[&str], n: usize) -> CollectionSpec {
        CollectionSpec {
            collection_id: pbcid.to_string(),
            manager: "m".to_string(),
            cvr_type,
            contests: contests.iter().map(|s| s.to_string()).collect(),
            ballot_ids: (1..=n).map(|i| format!("b{}", i)).collect(),
            reported_ballots: None,
        }
    }

    fn bv(pbcid: &str, bid: &str, cid: &str, selids: &[&str]) -> BallotVote {
        BallotVote {
            collection_id: pbcid.to_string(),
            ballot_id: bid.to_string(),
            contest_id: cid.to_string(),
            vote: Vote::new(selids),
        }
    }

    fn structure(w: &mut Warnings) -> ElectionStructure {
        ElectionStructure::new(
            "test",
            &[
                ContestSpec::plurality("c1", &["A", "B"]),
                ContestSpec::plurality("c2", &["Yes", "No"]),
            ],
            &[
                collection("p1", CvrType::Cvr, &["c1", "c2"], 4),
                collection("p2", CvrType::NoCvr, &["c1"], 5),
            ],
            w,
        )
        .unwrap()
    }

    fn aggregate(pbcid: &str, cid: &str, selids: &[&str], count: u64) -> ReportedTally {
        ReportedTally {
            collection_id: pbcid.to_string(),
            contest_id: cid.to_string(),
            vote: Vote::new(selids),
            count,
        }
    }

    #[test]
    fn tallies_totals_and_outcomes() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let votes = vec![
            bv("p1", "b1", "c1", &["A"]),
            bv("p1", "b2", "c1", &["A"]),
            bv("p1", "b3", "c1", &["B"]),
            bv("p1", "b4", "c1", &["+Zed"]),
            bv("p1", "b1", "c2", &["Yes"]),
            bv("p1", "b2", "c2", &["No"]),
            bv("p1", "b3", "c2", &["No"]),
        ];
        let aggregates = vec![
            aggregate("p2", "c1", &["B"], 3),
            aggregate("p2", "c1", &["A"], 2),
        ];
        let r = ReportedResults::new(&mut s, &votes, &aggregates, &[], &mut w).unwrap();
        // The write-in on ballot b4.
        assert_eq!(w.len(), 1);

        let c1 = s.contest_idx("c1").unwrap();
        let c2 = s.contest_idx("c2").unwrap();
        let p1 = s.collection_idx("p1").unwrap();
        let p2 = s.collection_idx("p2").unwrap();

        assert_eq!(r.reported_count(c1, p1, &Vote::new(&["A"])), VoteCount(2));
        assert_eq!(
            r.reported_count(c2, p1, &Vote::single(NO_SUCH_CONTEST)),
            VoteCount(1)
        );
        assert_eq!(r.reported_count(c1, p2, &Vote::single(NO_CVR)), VoteCount(5));
        assert_eq!(r.tally(c2, p2), None);
        // Ballot-level totals: 4 ballots in p1 and 5 in p2.
        assert_eq!(r.total(c1), VoteCount(9));
        assert_eq!(r.total(c2), VoteCount(4));
        // A: 2 + 2, B: 1 + 3. The tie goes to A.
        assert_eq!(r.outcome(c1), Some(&["A".to_string()][..]));
        assert_eq!(r.outcome(c2), Some(&["No".to_string()][..]));
        assert!(r.reported_votes(c1).contains(&Vote::new(&["+Zed"])));
        assert!(s.contest(c2).has_selection(NO_SUCH_CONTEST));
        assert_eq!(r.ballot_votes(c1, p1).map(|v| v.len()), Some(4));
    }

    #[test]
    fn vote_for_irrelevant_collection_is_fatal() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let votes = vec![bv("p2", "b1", "c2", &["Yes"])];
        let res = ReportedResults::new(&mut s, &votes, &[], &[], &mut w);
        assert_eq!(
            res,
            Err(AuditErrors::NotRelevant {
                contest: "c2".to_string(),
                collection: "p2".to_string()
            })
        );
    }

    #[test]
    fn unknown_references_are_fatal() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let res = ReportedResults::new(&mut s, &[bv("p1", "b9", "c1", &["A"])], &[], &[], &mut w);
        assert_eq!(
            res,
            Err(AuditErrors::UnknownBallot {
                collection: "p1".to_string(),
                ballot: "b9".to_string()
            })
        );
        let res = ReportedResults::new(&mut s, &[bv("p7", "b1", "c1", &["A"])], &[], &[], &mut w);
        assert_eq!(res, Err(AuditErrors::UnknownCollection("p7".to_string())));
        let res = ReportedResults::new(&mut s, &[bv("p1", "b1", "c1", &["Q"])], &[], &[], &mut w);
        assert!(matches!(res, Err(AuditErrors::UnknownSelection { .. })));
    }

    #[test]
    fn duplicate_ballot_vote_is_fatal() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let votes = vec![bv("p1", "b1", "c1", &["A"]), bv("p1", "b1", "c1", &["B"])];
        let res = ReportedResults::new(&mut s, &votes, &[], &[], &mut w);
        assert!(matches!(res, Err(AuditErrors::DuplicateVote { .. })));
    }

    #[test]
    fn aggregate_tallies_are_checked() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let res = ReportedResults::new(&mut s, &[], &[aggregate("p2", "c1", &["A"], 6)], &[], &mut w);
        assert_eq!(
            res,
            Err(AuditErrors::TallyOutOfRange {
                contest: "c1".to_string(),
                collection: "p2".to_string(),
                count: 6,
                max: 5
            })
        );
        let res = ReportedResults::new(&mut s, &[], &[aggregate("p2", "c1", &["A"], 4)], &[], &mut w);
        assert_eq!(
            res,
            Err(AuditErrors::TallyMismatch {
                contest: "c1".to_string(),
                collection: "p2".to_string(),
                expected: 5,
                actual: 4
            })
        );
        let res = ReportedResults::new(&mut s, &[], &[aggregate("p1", "c1", &["A"], 4)], &[], &mut w);
        assert_eq!(
            res,
            Err(AuditErrors::CvrTypeMismatch {
                collection: "p1".to_string(),
                cvr_type: CvrType::Cvr
            })
        );
    }

    #[test]
    fn declared_outcome_mismatch_is_a_warning() {
        let mut w = Warnings::new();
        let mut s = structure(&mut w);
        let votes = vec![
            bv("p1", "b1", "c1", &["A"]),
            bv("p1", "b2", "c1", &["A"]),
            bv("p1", "b1", "c2", &["Yes"]),
        ];
        let declared = vec![DeclaredOutcome {
            contest_id: "c2".to_string(),
            winners: vec!["No".to_string()],
        }];
        let aggregates = vec![aggregate("p2", "c1", &["B"], 5)];
        let r = ReportedResults::new(&mut s, &votes, &aggregates, &declared, &mut w).unwrap();
        assert_eq!(w.len(), 1);
        let c2 = s.contest_idx("c2").unwrap();
        assert_eq!(r.outcome(c2), Some(&["Yes".to_string()][..]));
        // B wins c1 thanks to the aggregate tally of p2.
        let c1 = s.contest_idx("c1").unwrap();
        assert_eq!(r.outcome(c1), Some(&["B".to_string()][..]));
    }
}
