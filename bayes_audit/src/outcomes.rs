use log::debug;

use std::collections::{BTreeMap, HashSet};

use crate::config::*;
use crate::structure::Contest;

/// Plurality scoring over a fixed domain of votes.
///
/// A vote is credited to each of its selections if it names between 1 and
/// `winners` distinct selections, none of them an error selection. Undervotes,
/// overvotes and error votes are credited to nobody.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct PluralityRule {
    winners: usize,
    // For each vote of the domain, the indices of the selections it counts for.
    credits: Vec<Vec<usize>>,
    // For each selection of the contest, whether it may win.
    eligible: Vec<bool>,
}

impl PluralityRule {
    pub(crate) fn new(contest: &Contest, domain: &[Vote]) -> Result<PluralityRule, AuditErrors> {
        if contest.contest_type != ContestType::Plurality {
            return Err(AuditErrors::UnsupportedContestType {
                contest: contest.id.clone(),
                contest_type: contest.contest_type,
            });
        }
        let selections = contest.selections();
        let winners = contest.winners as usize;
        let credits = domain
            .iter()
            .map(|vote| {
                let mut seen: Vec<usize> = Vec::new();
                for selid in vote.selections() {
                    if is_error_selid(selid) {
                        return Vec::new();
                    }
                    match selections.iter().position(|s| s == selid) {
                        Some(idx) if !seen.contains(&idx) => seen.push(idx),
                        Some(_) => {}
                        None => {
                            debug!(
                                "PluralityRule: contest {}: selection {:?} not registered",
                                contest.id, selid
                            );
                            return Vec::new();
                        }
                    }
                }
                if seen.len() > winners {
                    // Overvote
                    Vec::new()
                } else {
                    seen
                }
            })
            .collect();
        let eligible = selections.iter().map(|s| !is_error_selid(s)).collect();
        Ok(PluralityRule {
            winners,
            credits,
            eligible,
        })
    }

    /// The score of each selection, given a tally over the domain.
    pub(crate) fn scores(&self, tally: &[f64]) -> Vec<f64> {
        let mut scores = vec![0.0; self.eligible.len()];
        for (count, credit) in tally.iter().zip(self.credits.iter()) {
            for idx in credit.iter() {
                scores[*idx] += *count;
            }
        }
        scores
    }

    /// The indices of the winning selections, in increasing order.
    ///
    /// Ties go to the selection that comes first in the contest order.
    pub(crate) fn winners(&self, tally: &[f64]) -> Vec<usize> {
        let scores = self.scores(tally);
        let mut chosen: Vec<usize> = Vec::with_capacity(self.winners);
        for _ in 0..self.winners {
            let mut best: Option<usize> = None;
            for (idx, score) in scores.iter().enumerate() {
                if !self.eligible[idx] || chosen.contains(&idx) {
                    continue;
                }
                match best {
                    Some(b) if scores[b] >= *score => {}
                    _ => best = Some(idx),
                }
            }
            match best {
                Some(b) => chosen.push(b),
                None => break,
            }
        }
        chosen.sort_unstable();
        chosen
    }

    pub(crate) fn has_valid_votes(&self, tally: &[f64]) -> bool {
        self.scores(tally)
            .iter()
            .zip(self.eligible.iter())
            .any(|(score, eligible)| *eligible && *score > 0.0)
    }
}

/// Computes the winners of a contest for the given tally, with the social
/// choice rule of the contest.
///
/// The winners are returned in the order of the contest selections.
pub fn compute_outcome(
    contest: &Contest,
    tally: &BTreeMap<Vote, VoteCount>,
) -> Result<Vec<String>, AuditErrors> {
    let domain: Vec<Vote> = tally.keys().cloned().collect();
    let counts: Vec<f64> = tally.values().map(|vc| vc.0 as f64).collect();
    let rule = PluralityRule::new(contest, &domain)?;
    if !rule.has_valid_votes(&counts) {
        return Err(AuditErrors::NoValidVotes(contest.id.clone()));
    }
    let winners = rule.winners(&counts);
    debug!(
        "compute_outcome: contest {}: scores {:?} winners {:?}",
        contest.id,
        rule.scores(&counts),
        winners
    );
    Ok(winners
        .iter()
        .map(|idx| contest.selections()[*idx].clone())
        .collect())
}

/// Whether two outcomes name the same winners, regardless of their order.
pub fn same_outcome(o1: &[String], o2: &[String]) -> bool {
    let s1: HashSet<&String> = o1.iter().collect();
    let s2: HashSet<&String> = o2.iter().collect();
    s1 == s2
}
