use log::{debug, info};

use std::collections::{BTreeSet, HashMap};

use crate::config::*;

/// Index of a contest in the election structure.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct ContestIdx(pub(crate) usize);

/// Index of a paper ballot collection in the election structure.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CollectionIdx(pub(crate) usize);

impl ContestIdx {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl CollectionIdx {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Contest {
    pub id: String,
    pub contest_type: ContestType,
    pub winners: u32,
    pub write_ins: WriteIns,
    // Declared selections first, then write-ins and errors in the order they were seen.
    selections: Vec<String>,
    // All the distinct votes seen for this contest, reported or actual.
    votes: BTreeSet<Vote>,
}

impl Contest {
    pub fn selections(&self) -> &[String] {
        &self.selections
    }

    pub fn has_selection(&self, selid: &str) -> bool {
        self.selections.iter().any(|s| s == selid)
    }

    /// The domain of the tallies of this contest.
    pub fn votes(&self) -> &BTreeSet<Vote> {
        &self.votes
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub manager: String,
    pub cvr_type: CvrType,
    ballot_ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Collection {
    /// The ballot ids, in manifest order.
    pub fn ballot_ids(&self) -> &[String] {
        &self.ballot_ids
    }

    pub fn n_ballots(&self) -> usize {
        self.ballot_ids.len()
    }

    /// The position of a ballot in the manifest.
    pub fn position(&self, ballot_id: &str) -> Option<usize> {
        self.positions.get(ballot_id).cloned()
    }
}

/// The static description of an election: contests, collections and which
/// collections may hold ballots for which contests.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionStructure {
    pub name: String,
    contests: Vec<Contest>,
    collections: Vec<Collection>,
    relevance: BTreeSet<(ContestIdx, CollectionIdx)>,
    contest_ids: HashMap<String, ContestIdx>,
    collection_ids: HashMap<String, CollectionIdx>,
}

impl ElectionStructure {
    pub fn new(
        name: &str,
        contest_specs: &[ContestSpec],
        collection_specs: &[CollectionSpec],
        warnings: &mut Warnings,
    ) -> Result<ElectionStructure, AuditErrors> {
        if contest_specs.is_empty() || collection_specs.is_empty() {
            return Err(AuditErrors::EmptyElection);
        }

        let mut contests: Vec<Contest> = Vec::new();
        let mut contest_ids: HashMap<String, ContestIdx> = HashMap::new();
        for cs in contest_specs.iter() {
            check_id(&cs.contest_id, warnings);
            if contest_ids.contains_key(&cs.contest_id) {
                return Err(AuditErrors::DuplicateId {
                    kind: "contest",
                    id: cs.contest_id.clone(),
                });
            }
            if cs.winners == 0 {
                return Err(AuditErrors::InvalidParameter(format!(
                    "contest `{}` has no winner",
                    cs.contest_id
                )));
            }
            let mut selections: Vec<String> = Vec::new();
            for selid in cs.selections.iter() {
                check_id(selid, warnings);
                if selections.contains(selid) {
                    return Err(AuditErrors::DuplicateId {
                        kind: "selection",
                        id: selid.clone(),
                    });
                }
                selections.push(selid.clone());
            }
            if (cs.winners as usize) > selections.len() {
                warnings.add(format!(
                    "contest `{}` has {} winners but only {} declared selections",
                    cs.contest_id,
                    cs.winners,
                    selections.len()
                ));
            }
            contest_ids.insert(cs.contest_id.clone(), ContestIdx(contests.len()));
            contests.push(Contest {
                id: cs.contest_id.clone(),
                contest_type: cs.contest_type,
                winners: cs.winners,
                write_ins: cs.write_ins,
                selections,
                votes: BTreeSet::new(),
            });
        }

        let mut collections: Vec<Collection> = Vec::new();
        let mut collection_ids: HashMap<String, CollectionIdx> = HashMap::new();
        let mut relevance: BTreeSet<(ContestIdx, CollectionIdx)> = BTreeSet::new();
        for ps in collection_specs.iter() {
            check_id(&ps.collection_id, warnings);
            if collection_ids.contains_key(&ps.collection_id) {
                return Err(AuditErrors::DuplicateId {
                    kind: "collection",
                    id: ps.collection_id.clone(),
                });
            }
            let pidx = CollectionIdx(collections.len());

            if let Some(declared) = ps.reported_ballots {
                if declared != ps.ballot_ids.len() as u64 {
                    return Err(AuditErrors::BallotCountMismatch {
                        collection: ps.collection_id.clone(),
                        declared,
                        manifest: ps.ballot_ids.len() as u64,
                    });
                }
            }
            let mut positions: HashMap<String, usize> = HashMap::new();
            for (pos, bid) in ps.ballot_ids.iter().enumerate() {
                if positions.insert(bid.clone(), pos).is_some() {
                    return Err(AuditErrors::DuplicateId {
                        kind: "ballot",
                        id: format!("{}/{}", ps.collection_id, bid),
                    });
                }
            }
            if ps.ballot_ids.is_empty() {
                warnings.add(format!(
                    "collection `{}` has an empty ballot manifest",
                    ps.collection_id
                ));
            }

            for cid in ps.contests.iter() {
                let cidx = *contest_ids
                    .get(cid)
                    .ok_or_else(|| AuditErrors::UnknownContest(cid.clone()))?;
                relevance.insert((cidx, pidx));
            }

            collection_ids.insert(ps.collection_id.clone(), pidx);
            collections.push(Collection {
                id: ps.collection_id.clone(),
                manager: ps.manager.clone(),
                cvr_type: ps.cvr_type,
                ballot_ids: ps.ballot_ids.clone(),
                positions,
            });
        }

        for (idx, c) in contests.iter().enumerate() {
            let cidx = ContestIdx(idx);
            if !relevance.iter().any(|(c2, _)| *c2 == cidx) {
                warnings.add(format!("contest `{}` is relevant to no collection", c.id));
            }
        }

        info!(
            "Election structure `{}`: {} contests, {} collections, {} relevant pairs",
            name,
            contests.len(),
            collections.len(),
            relevance.len()
        );

        Ok(ElectionStructure {
            name: name.to_string(),
            contests,
            collections,
            relevance,
            contest_ids,
            collection_ids,
        })
    }

    pub fn contest_idx(&self, contest_id: &str) -> Result<ContestIdx, AuditErrors> {
        self.contest_ids
            .get(contest_id)
            .cloned()
            .ok_or_else(|| AuditErrors::UnknownContest(contest_id.to_string()))
    }

    pub fn collection_idx(&self, collection_id: &str) -> Result<CollectionIdx, AuditErrors> {
        self.collection_ids
            .get(collection_id)
            .cloned()
            .ok_or_else(|| AuditErrors::UnknownCollection(collection_id.to_string()))
    }

    pub fn contest(&self, cidx: ContestIdx) -> &Contest {
        &self.contests[cidx.0]
    }

    pub fn collection(&self, pidx: CollectionIdx) -> &Collection {
        &self.collections[pidx.0]
    }

    pub fn contests(&self) -> impl Iterator<Item = (ContestIdx, &Contest)> {
        self.contests
            .iter()
            .enumerate()
            .map(|(idx, c)| (ContestIdx(idx), c))
    }

    pub fn collections(&self) -> impl Iterator<Item = (CollectionIdx, &Collection)> {
        self.collections
            .iter()
            .enumerate()
            .map(|(idx, p)| (CollectionIdx(idx), p))
    }

    pub fn n_collections(&self) -> usize {
        self.collections.len()
    }

    pub fn is_relevant(&self, cidx: ContestIdx, pidx: CollectionIdx) -> bool {
        self.relevance.contains(&(cidx, pidx))
    }

    /// Fails with a named error if the contest may not appear in the collection.
    pub fn check_relevant(&self, cidx: ContestIdx, pidx: CollectionIdx) -> Result<(), AuditErrors> {
        if self.is_relevant(cidx, pidx) {
            Ok(())
        } else {
            Err(AuditErrors::NotRelevant {
                contest: self.contest(cidx).id.clone(),
                collection: self.collection(pidx).id.clone(),
            })
        }
    }

    /// The collections relevant to a contest, in collection order.
    pub fn relevant_collections(&self, cidx: ContestIdx) -> Vec<CollectionIdx> {
        self.relevance
            .iter()
            .filter(|(c, _)| *c == cidx)
            .map(|(_, p)| *p)
            .collect()
    }

    /// The contests relevant to a collection, in contest order.
    pub fn relevant_contests(&self, pidx: CollectionIdx) -> Vec<ContestIdx> {
        self.relevance
            .iter()
            .filter(|(_, p)| *p == pidx)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Adds a vote to the domain of a contest.
    ///
    /// Write-in and error selections are admitted as new selections of the contest.
    /// Any other selection must have been declared.
    pub fn register_vote(
        &mut self,
        cidx: ContestIdx,
        vote: &Vote,
        warnings: &mut Warnings,
    ) -> Result<(), AuditErrors> {
        let contest = &mut self.contests[cidx.0];
        if contest.votes.contains(vote) {
            return Ok(());
        }
        for selid in vote.selections() {
            if contest.selections.contains(selid) {
                continue;
            }
            if is_writein(selid) {
                if contest.write_ins == WriteIns::No {
                    warnings.add(format!(
                        "write-in `{}` in contest `{}` which does not allow write-ins",
                        selid, contest.id
                    ));
                }
            } else if !is_error_selid(selid) {
                return Err(AuditErrors::UnknownSelection {
                    contest: contest.id.clone(),
                    selection: selid.clone(),
                });
            }
            debug!(
                "register_vote: contest {}: admitting selection {:?}",
                contest.id, selid
            );
            contest.selections.push(selid.clone());
        }
        contest.votes.insert(vote.clone());
        Ok(())
    }
}

// Ids should be printable and without surrounding whitespace.
fn check_id(id: &str, warnings: &mut Warnings) {
    if id.is_empty() {
        warnings.add("empty id".to_string());
    } else if id.chars().any(|c| c.is_control()) {
        warnings.add(format!("id {:?} is not printable", id));
    } else if id.trim() != id {
        warnings.add(format!("id {:?} has surrounding whitespace", id));
    }
}
