use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};

use std::collections::BTreeMap;

use crate::config::*;
use crate::outcomes::PluralityRule;
use crate::sample::SampleStore;
use crate::structure::ContestIdx;
use crate::Election;

/// Derives a generator seed from the audit seed and a label.
///
/// The first 64 bits of the SHA-256 digest of `seed:label`.
pub fn derive_seed(seed: u64, label: &str) -> Result<u64, AuditErrors> {
    let digest = sha256::digest(format!("{}:{}", seed, label));
    // 16 hexadecimal characters make 64 bits.
    digest
        .get(..16)
        .and_then(|prefix| u64::from_str_radix(prefix, 16).ok())
        .ok_or_else(|| {
            AuditErrors::InvalidParameter(format!(
                "cannot derive a seed for `{}` from digest `{}`",
                label, digest
            ))
        })
}

/// The generator used for the risk of one measurement at one stage.
pub fn measurement_rng(seed: u64, stage: u32, measurement_id: &str) -> Result<StdRng, AuditErrors> {
    let label = format!("{}:{}", stage, measurement_id);
    Ok(StdRng::seed_from_u64(derive_seed(seed, &label)?))
}

// The unsampled ballots of one collection reported with one vote.
struct Stratum {
    remainder: f64,
    // One posterior for each vote of the domain.
    posteriors: Vec<Gamma<f64>>,
}

/// Bayesian estimate of the probability that the reported winners of a
/// contest are wrong.
///
/// The unsampled ballots of every collection are split by reported vote.
/// For each group, the distribution of actual votes is drawn from a Dirichlet
/// posterior built from the sample and a prior that favours the reported vote.
/// The weight of that prior is `pseudocount_match / (1 + n)` for a group with
/// `n` audited ballots: an unsampled group relies on the prior alone, while a
/// sampled group is driven by what the auditors actually read.
/// The risk is the fraction of the simulated elections in which the winners
/// differ from the reported winners.
#[derive(PartialEq, Debug, Clone)]
pub struct RiskEstimator {
    seed: u64,
    n_trials: u32,
    pseudocount_base: f64,
    pseudocount_match: f64,
}

impl RiskEstimator {
    pub fn new(params: &AuditParams) -> Result<RiskEstimator, AuditErrors> {
        if params.n_trials == 0 {
            return Err(AuditErrors::InvalidParameter(
                "the number of trials must be positive".to_string(),
            ));
        }
        if !(params.pseudocount_base > 0.0 && params.pseudocount_match > 0.0) {
            return Err(AuditErrors::InvalidParameter(format!(
                "pseudocounts must be positive, got {} and {}",
                params.pseudocount_base, params.pseudocount_match
            )));
        }
        Ok(RiskEstimator {
            seed: params.seed,
            n_trials: params.n_trials,
            pseudocount_base: params.pseudocount_base,
            pseudocount_match: params.pseudocount_match,
        })
    }

    // The prior weight of "actual vote equals reported vote" in a group with
    // `sampled` audited ballots. It shrinks as the group's own sample grows,
    // and never goes below the weight of any other vote.
    fn match_prior(&self, sampled: VoteCount) -> f64 {
        (self.pseudocount_match / (1.0 + sampled.0 as f64)).max(self.pseudocount_base)
    }

    /// The risk of the reported outcome of a contest, in `[0, 1]`.
    ///
    /// The same election, sample, stage and measurement always give the same risk.
    pub fn contest_risk(
        &self,
        election: &Election,
        sample: &SampleStore,
        cidx: ContestIdx,
        stage: u32,
        measurement_id: &str,
    ) -> Result<f64, AuditErrors> {
        let structure = &election.structure;
        let contest = structure.contest(cidx);
        let reported_outcome =
            election
                .reported
                .outcome(cidx)
                .ok_or_else(|| AuditErrors::UnsupportedContestType {
                    contest: contest.id.clone(),
                    contest_type: contest.contest_type,
                })?;

        let domain: Vec<Vote> = contest.votes().iter().cloned().collect();
        let positions: BTreeMap<&Vote, usize> =
            domain.iter().enumerate().map(|(i, v)| (v, i)).collect();
        let rule = PluralityRule::new(contest, &domain)?;
        let mut reported_winners: Vec<usize> = reported_outcome
            .iter()
            .filter_map(|selid| contest.selections().iter().position(|s| s == selid))
            .collect();
        reported_winners.sort_unstable();

        let mut base = vec![0.0; domain.len()];
        let mut strata: Vec<Stratum> = Vec::new();
        for pidx in structure.relevant_collections(cidx) {
            let sample_tally = sample.tally_for(cidx, pidx)?;
            for ((_, av), vc) in sample_tally.iter() {
                if let Some(idx) = positions.get(av) {
                    base[*idx] += vc.0 as f64;
                }
            }
            let reported_tally = match election.reported.tally(cidx, pidx) {
                Some(t) => t,
                None => continue,
            };
            for (rv, rc) in reported_tally.iter() {
                let sampled = sample.sampled_with_reported(cidx, pidx, rv);
                let remainder = rc.0.saturating_sub(sampled.0);
                if remainder == 0 {
                    continue;
                }
                let mut posteriors: Vec<Gamma<f64>> = Vec::with_capacity(domain.len());
                for av in domain.iter() {
                    let n = sample_tally
                        .get(&(rv.clone(), av.clone()))
                        .map(|vc| vc.0 as f64)
                        .unwrap_or(0.0);
                    let prior = if av == rv {
                        self.match_prior(sampled)
                    } else {
                        self.pseudocount_base
                    };
                    let gamma = Gamma::new(n + prior, 1.0).map_err(|e| {
                        AuditErrors::InvalidParameter(format!(
                            "contest `{}`: cannot build the posterior of {}: {}",
                            contest.id, rv, e
                        ))
                    })?;
                    posteriors.push(gamma);
                }
                strata.push(Stratum {
                    remainder: remainder as f64,
                    posteriors,
                });
            }
        }

        if strata.is_empty() {
            // Everything was sampled: the tally is known.
            let winners = rule.winners(&base);
            let risk = if winners == reported_winners { 0.0 } else { 1.0 };
            debug!(
                "contest_risk: contest {} fully sampled, winners {:?}, risk {}",
                contest.id, winners, risk
            );
            return Ok(risk);
        }

        let mut rng = measurement_rng(self.seed, stage, measurement_id)?;
        let mut draws = vec![0.0; domain.len()];
        let mut tally = vec![0.0; domain.len()];
        let mut upsets: u32 = 0;
        for _ in 0..self.n_trials {
            tally.copy_from_slice(&base);
            for stratum in strata.iter() {
                let mut total = 0.0;
                for (draw, posterior) in draws.iter_mut().zip(stratum.posteriors.iter()) {
                    *draw = posterior.sample(&mut rng);
                    total += *draw;
                }
                if total <= 0.0 {
                    continue;
                }
                let scale = stratum.remainder / total;
                for (count, draw) in tally.iter_mut().zip(draws.iter()) {
                    *count += draw * scale;
                }
            }
            if rule.winners(&tally) != reported_winners {
                upsets += 1;
            }
        }
        let risk = upsets as f64 / self.n_trials as f64;
        debug!(
            "contest_risk: contest {} stage {} measurement {}: {} strata, {} upsets in {} trials, risk {}",
            contest.id,
            stage,
            measurement_id,
            strata.len(),
            upsets,
            self.n_trials,
            risk
        );
        Ok(risk)
    }
}
