use log::{debug, info};

use std::collections::BTreeMap;

use crate::config::*;
use crate::structure::{CollectionIdx, ContestIdx, ElectionStructure};
use crate::Election;

/// The votes found by hand on the examined ballots.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ActualVotes {
    // For each collection, whether each ballot of the manifest has been examined.
    examined: Vec<Vec<bool>>,
    votes: BTreeMap<(ContestIdx, CollectionIdx), Vec<Option<Vote>>>,
}

impl ActualVotes {
    /// Reads the audited votes.
    ///
    /// A ballot is examined as soon as it has one record. An examined ballot
    /// without a record for one of the contests of its collection did not carry
    /// that contest.
    pub fn new(
        structure: &mut ElectionStructure,
        records: &[BallotVote],
        warnings: &mut Warnings,
    ) -> Result<ActualVotes, AuditErrors> {
        let mut examined: Vec<Vec<bool>> = structure
            .collections()
            .map(|(_, p)| vec![false; p.n_ballots()])
            .collect();
        let mut votes: BTreeMap<(ContestIdx, CollectionIdx), Vec<Option<Vote>>> = BTreeMap::new();
        for (cidx, _) in structure.contests() {
            for pidx in structure.relevant_collections(cidx) {
                votes.insert((cidx, pidx), vec![None; structure.collection(pidx).n_ballots()]);
            }
        }

        for rec in records.iter() {
            let cidx = structure.contest_idx(&rec.contest_id)?;
            let pidx = structure.collection_idx(&rec.collection_id)?;
            structure.check_relevant(cidx, pidx)?;
            let pos = structure
                .collection(pidx)
                .position(&rec.ballot_id)
                .ok_or_else(|| AuditErrors::UnknownBallot {
                    collection: rec.collection_id.clone(),
                    ballot: rec.ballot_id.clone(),
                })?;
            let slot = votes
                .get_mut(&(cidx, pidx))
                .and_then(|v| v.get_mut(pos))
                .ok_or_else(|| AuditErrors::NotRelevant {
                    contest: rec.contest_id.clone(),
                    collection: rec.collection_id.clone(),
                })?;
            if slot.is_some() {
                return Err(AuditErrors::DuplicateVote {
                    contest: rec.contest_id.clone(),
                    collection: rec.collection_id.clone(),
                    ballot: rec.ballot_id.clone(),
                });
            }
            structure.register_vote(cidx, &rec.vote, warnings)?;
            *slot = Some(rec.vote.clone());
            examined[pidx.0][pos] = true;
        }

        let missing = Vote::single(NO_SUCH_CONTEST);
        for ((cidx, pidx), ballot_votes) in votes.iter_mut() {
            let mut filled = 0;
            for (pos, slot) in ballot_votes.iter_mut().enumerate() {
                if slot.is_none() && examined[pidx.0][pos] {
                    *slot = Some(missing.clone());
                    filled += 1;
                }
            }
            if filled > 0 {
                structure.register_vote(*cidx, &missing, warnings)?;
            }
        }

        info!(
            "Read {} audited votes, {} ballots examined",
            records.len(),
            examined.iter().flatten().filter(|b| **b).count()
        );
        Ok(ActualVotes { examined, votes })
    }

    pub fn is_examined(&self, pidx: CollectionIdx, position: usize) -> bool {
        self.examined
            .get(pidx.0)
            .and_then(|e| e.get(position))
            .cloned()
            .unwrap_or(false)
    }

    /// The actual vote of the ballot at the given manifest position, if it was examined.
    pub fn vote(&self, cidx: ContestIdx, pidx: CollectionIdx, position: usize) -> Option<&Vote> {
        self.votes
            .get(&(cidx, pidx))
            .and_then(|v| v.get(position))
            .and_then(|v| v.as_ref())
    }

    /// Number of examined ballots in a collection.
    pub fn n_examined(&self, pidx: CollectionIdx) -> usize {
        self.examined
            .get(pidx.0)
            .map(|e| e.iter().filter(|b| **b).count())
            .unwrap_or(0)
    }
}

/// Cross tabulation of reported votes against actual votes.
pub type SampleTally = BTreeMap<(Vote, Vote), VoteCount>;

/// The ballots drawn so far in every collection, and what they show.
///
/// Each collection has a fixed sampling order. The sample of a collection is
/// always a prefix of its order, and only grows.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SampleStore {
    orders: Vec<Vec<usize>>,
    sizes: Vec<usize>,
    tallies: BTreeMap<(ContestIdx, CollectionIdx), SampleTally>,
    // Sampled ballots by reported vote, summed over the actual votes.
    reported_counts: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>>,
    contest_ids: Vec<String>,
    collection_ids: Vec<String>,
}

impl SampleStore {
    /// An empty sample.
    ///
    /// `orders` holds, for each collection, a permutation of the positions of
    /// its manifest.
    pub fn new(election: &Election, orders: Vec<Vec<usize>>) -> Result<SampleStore, AuditErrors> {
        let structure = &election.structure;
        if orders.len() != structure.n_collections() {
            return Err(AuditErrors::InvalidParameter(format!(
                "{} sampling orders for {} collections",
                orders.len(),
                structure.n_collections()
            )));
        }
        for ((_, p), order) in structure.collections().zip(orders.iter()) {
            let mut seen = vec![false; p.n_ballots()];
            for pos in order.iter() {
                match seen.get_mut(*pos) {
                    Some(s) if !*s => *s = true,
                    _ => {
                        return Err(AuditErrors::InvalidParameter(format!(
                            "the sampling order of collection `{}` is not a permutation of its manifest",
                            p.id
                        )))
                    }
                }
            }
            if order.len() != p.n_ballots() {
                return Err(AuditErrors::InvalidParameter(format!(
                    "the sampling order of collection `{}` has {} ballots instead of {}",
                    p.id,
                    order.len(),
                    p.n_ballots()
                )));
            }
        }

        let mut tallies: BTreeMap<(ContestIdx, CollectionIdx), SampleTally> = BTreeMap::new();
        let mut reported_counts: BTreeMap<(ContestIdx, CollectionIdx), BTreeMap<Vote, VoteCount>> =
            BTreeMap::new();
        for (cidx, _) in structure.contests() {
            for pidx in structure.relevant_collections(cidx) {
                tallies.insert((cidx, pidx), BTreeMap::new());
                reported_counts.insert((cidx, pidx), BTreeMap::new());
            }
        }
        Ok(SampleStore {
            sizes: vec![0; orders.len()],
            orders,
            tallies,
            reported_counts,
            contest_ids: structure.contests().map(|(_, c)| c.id.clone()).collect(),
            collection_ids: structure.collections().map(|(_, p)| p.id.clone()).collect(),
        })
    }

    /// Extends the sample of a collection to the first `size` ballots of its order.
    ///
    /// The tallies of the collection are computed again over the whole prefix.
    /// On error, the sample is left unchanged.
    pub fn record_sample(
        &mut self,
        election: &Election,
        pidx: CollectionIdx,
        size: usize,
    ) -> Result<(), AuditErrors> {
        let order = &self.orders[pidx.0];
        let collection = election.structure.collection(pidx);
        let current = self.sizes[pidx.0];
        if size < current {
            return Err(AuditErrors::SampleShrink {
                collection: collection.id.clone(),
                current,
                requested: size,
            });
        }
        if size > order.len() {
            return Err(AuditErrors::SampleOverflow {
                collection: collection.id.clone(),
                requested: size,
                total: order.len(),
            });
        }
        let prefix = &order[..size];
        if let Some(pos) = prefix
            .iter()
            .find(|pos| !election.actual.is_examined(pidx, **pos))
        {
            return Err(AuditErrors::MissingActualVote {
                collection: collection.id.clone(),
                ballot: collection.ballot_ids()[*pos].clone(),
            });
        }

        let mut updates: Vec<(ContestIdx, SampleTally, BTreeMap<Vote, VoteCount>)> = Vec::new();
        for cidx in election.structure.relevant_contests(pidx) {
            let reported = election.reported.ballot_votes(cidx, pidx).unwrap_or(&[]);
            let mut tally: SampleTally = BTreeMap::new();
            for pos in prefix.iter() {
                let (rv, av) = match (reported.get(*pos), election.actual.vote(cidx, pidx, *pos)) {
                    (Some(rv), Some(av)) => (rv, av),
                    _ => {
                        return Err(AuditErrors::MissingActualVote {
                            collection: collection.id.clone(),
                            ballot: collection.ballot_ids()[*pos].clone(),
                        })
                    }
                };
                *tally
                    .entry((rv.clone(), av.clone()))
                    .or_insert(VoteCount::EMPTY) += VoteCount(1);
            }
            let mut by_reported: BTreeMap<Vote, VoteCount> = BTreeMap::new();
            for ((rv, _), vc) in tally.iter() {
                *by_reported.entry(rv.clone()).or_insert(VoteCount::EMPTY) += *vc;
            }
            debug!(
                "record_sample: contest {} collection {}: {} ballots, tally {:?}",
                self.contest_ids[cidx.0], collection.id, size, tally
            );
            updates.push((cidx, tally, by_reported));
        }
        for (cidx, tally, by_reported) in updates.into_iter() {
            self.tallies.insert((cidx, pidx), tally);
            self.reported_counts.insert((cidx, pidx), by_reported);
        }
        self.sizes[pidx.0] = size;
        Ok(())
    }

    /// The cross tabulation of the sample of a collection for a contest.
    pub fn tally_for(
        &self,
        cidx: ContestIdx,
        pidx: CollectionIdx,
    ) -> Result<&SampleTally, AuditErrors> {
        self.tallies
            .get(&(cidx, pidx))
            .ok_or_else(|| AuditErrors::NotRelevant {
                contest: self.contest_ids[cidx.0].clone(),
                collection: self.collection_ids[pidx.0].clone(),
            })
    }

    pub fn sample_size(&self, pidx: CollectionIdx) -> usize {
        self.sizes[pidx.0]
    }

    /// The number of sampled ballots reported with the given vote.
    pub fn sampled_with_reported(
        &self,
        cidx: ContestIdx,
        pidx: CollectionIdx,
        reported: &Vote,
    ) -> VoteCount {
        self.reported_counts
            .get(&(cidx, pidx))
            .and_then(|counts| counts.get(reported))
            .copied()
            .unwrap_or(VoteCount::EMPTY)
    }

    /// The ids of the sampled ballots of a collection, in drawing order.
    pub fn sampled_ballots<'a>(&self, election: &'a Election, pidx: CollectionIdx) -> Vec<&'a str> {
        let ids = election.structure.collection(pidx).ballot_ids();
        self.orders[pidx.0][..self.sizes[pidx.0]]
            .iter()
            .map(|pos| ids[*pos].as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ElectionBuilder;

    // One CVR collection of 6 ballots with two contests, a second noCVR collection
    // of 3 ballots for the first contest only. Every ballot of p1 and the first two
    // of p2 are audited.
    fn election() -> Election {
        let mut b = ElectionBuilder::new("test");
        b.add_contest(ContestSpec::plurality("c1", &["A", "B"]));
        b.add_contest(ContestSpec::plurality("c2", &["Yes", "No"]));
        b.add_collection("p1", CvrType::Cvr, &["c1", "c2"], 6);
        b.add_collection("p2", CvrType::NoCvr, &["c1"], 3);
        let c1 = ["A", "A", "B", "A", "B", "A"];
        let c1_actual = ["A", "B", "B", "A", "B", "A"];
        for i in 0..6 {
            b.add_ballot_simple("p1", &format!("p1-{}", i + 1), "c1", &[c1[i]], &[c1_actual[i]]);
        }
        b.add_reported_vote("p1", "p1-1", "c2", &["Yes"]);
        b.add_reported_vote("p1", "p1-2", "c2", &["No"]);
        b.add_actual_vote("p1", "p1-1", "c2", &["Yes"]);
        b.add_actual_vote("p1", "p1-2", "c2", &["Yes"]);
        b.add_reported_tally("p2", "c1", &["B"], 2);
        b.add_reported_tally("p2", "c1", &["A"], 1);
        b.add_actual_vote("p2", "p2-1", "c1", &["B"]);
        b.add_actual_vote("p2", "p2-2", "c1", &["B"]);
        b.build(0).unwrap()
    }

    fn identity_orders(e: &Election) -> Vec<Vec<usize>> {
        e.structure
            .collections()
            .map(|(_, p)| (0..p.n_ballots()).collect())
            .collect()
    }

    #[test]
    fn cross_tab_of_the_prefix() {
        let e = election();
        let mut s = SampleStore::new(&e, identity_orders(&e)).unwrap();
        let c1 = e.structure.contest_idx("c1").unwrap();
        let c2 = e.structure.contest_idx("c2").unwrap();
        let p1 = e.structure.collection_idx("p1").unwrap();
        let p2 = e.structure.collection_idx("p2").unwrap();

        assert!(s.tally_for(c1, p1).unwrap().is_empty());
        s.record_sample(&e, p1, 3).unwrap();
        let t = s.tally_for(c1, p1).unwrap();
        assert_eq!(t.get(&(Vote::new(&["A"]), Vote::new(&["A"]))), Some(&VoteCount(1)));
        assert_eq!(t.get(&(Vote::new(&["A"]), Vote::new(&["B"]))), Some(&VoteCount(1)));
        assert_eq!(t.get(&(Vote::new(&["B"]), Vote::new(&["B"]))), Some(&VoteCount(1)));
        assert_eq!(
            s.sampled_with_reported(c1, p1, &Vote::new(&["A"])),
            VoteCount(2)
        );
        // Ballot p1-3 carries no record for c2 on either side.
        let nsc = Vote::single(NO_SUCH_CONTEST);
        assert_eq!(
            s.tally_for(c2, p1).unwrap().get(&(nsc.clone(), nsc)),
            Some(&VoteCount(1))
        );

        s.record_sample(&e, p2, 2).unwrap();
        assert_eq!(
            s.sampled_with_reported(c1, p2, &Vote::single(NO_CVR)),
            VoteCount(2)
        );
        assert_eq!(s.sampled_ballots(&e, p2), vec!["p2-1", "p2-2"]);
        assert_eq!(
            s.tally_for(c2, p2),
            Err(AuditErrors::NotRelevant {
                contest: "c2".to_string(),
                collection: "p2".to_string()
            })
        );
    }

    #[test]
    fn growing_equals_sampling_at_once() {
        let e = election();
        let p1 = e.structure.collection_idx("p1").unwrap();
        let mut s1 = SampleStore::new(&e, identity_orders(&e)).unwrap();
        s1.record_sample(&e, p1, 2).unwrap();
        s1.record_sample(&e, p1, 2).unwrap();
        s1.record_sample(&e, p1, 5).unwrap();
        let mut s2 = SampleStore::new(&e, identity_orders(&e)).unwrap();
        s2.record_sample(&e, p1, 5).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(s1.sample_size(p1), 5);
    }

    #[test]
    fn reported_counts_follow_the_cross_tab() {
        let e = election();
        let c1 = e.structure.contest_idx("c1").unwrap();
        let p1 = e.structure.collection_idx("p1").unwrap();
        let mut s = SampleStore::new(&e, identity_orders(&e)).unwrap();
        let (a, b) = (Vote::new(&["A"]), Vote::new(&["B"]));
        assert_eq!(s.sampled_with_reported(c1, p1, &a), VoteCount::EMPTY);
        for size in [2, 4, 6] {
            s.record_sample(&e, p1, size).unwrap();
            for rv in [&a, &b] {
                let from_tally: VoteCount = s
                    .tally_for(c1, p1)
                    .unwrap()
                    .iter()
                    .filter(|((r, _), _)| r == rv)
                    .map(|(_, vc)| *vc)
                    .sum();
                assert_eq!(s.sampled_with_reported(c1, p1, rv), from_tally);
            }
        }
        assert_eq!(s.sampled_with_reported(c1, p1, &a), VoteCount(4));
        assert_eq!(s.sampled_with_reported(c1, p1, &b), VoteCount(2));
        assert_eq!(
            s.sampled_with_reported(c1, p1, &Vote::undervote()),
            VoteCount::EMPTY
        );
    }

    #[test]
    fn sample_only_grows_within_bounds() {
        let e = election();
        let p1 = e.structure.collection_idx("p1").unwrap();
        let p2 = e.structure.collection_idx("p2").unwrap();
        let mut s = SampleStore::new(&e, identity_orders(&e)).unwrap();
        s.record_sample(&e, p1, 4).unwrap();
        assert_eq!(
            s.record_sample(&e, p1, 3),
            Err(AuditErrors::SampleShrink {
                collection: "p1".to_string(),
                current: 4,
                requested: 3
            })
        );
        assert_eq!(
            s.record_sample(&e, p1, 7),
            Err(AuditErrors::SampleOverflow {
                collection: "p1".to_string(),
                requested: 7,
                total: 6
            })
        );
        assert_eq!(
            s.record_sample(&e, p2, 3),
            Err(AuditErrors::MissingActualVote {
                collection: "p2".to_string(),
                ballot: "p2-3".to_string()
            })
        );
        assert_eq!(s.sample_size(p1), 4);
        assert_eq!(s.sample_size(p2), 0);
    }

    #[test]
    fn orders_must_be_permutations() {
        let e = election();
        let res = SampleStore::new(&e, vec![vec![0, 1, 2, 3, 4, 4], vec![0, 1, 2]]);
        assert!(matches!(res, Err(AuditErrors::InvalidParameter(_))));
        let res = SampleStore::new(&e, vec![vec![5, 4, 3, 2, 1, 0]]);
        assert!(matches!(res, Err(AuditErrors::InvalidParameter(_))));
        let mut s = SampleStore::new(&e, vec![vec![5, 4, 3, 2, 1, 0], vec![1, 0, 2]]).unwrap();
        let p1 = e.structure.collection_idx("p1").unwrap();
        s.record_sample(&e, p1, 1).unwrap();
        assert_eq!(s.sampled_ballots(&e, p1), vec!["p1-6"]);
    }
}
