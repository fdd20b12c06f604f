use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use std::collections::{BTreeSet, HashSet};

use crate::config::*;
use crate::risk::{derive_seed, RiskEstimator};
use crate::sample::SampleStore;
use crate::structure::{CollectionIdx, ContestIdx, ElectionStructure};
use crate::Election;

/// A risk measurement on one contest, and where it stands.
#[derive(PartialEq, Debug, Clone)]
pub struct Measurement {
    pub id: String,
    pub contest: ContestIdx,
    pub risk_limit: f64,
    pub risk_upset: f64,
    pub sampling_mode: SamplingMode,
    pub status: MeasurementStatus,
    /// The last computed risk. None before the first computation.
    pub risk: Option<f64>,
}

/// The state of the audit at the end of a stage.
#[derive(PartialEq, Debug, Clone)]
pub struct StageSnapshot {
    pub stage: u32,
    /// For each collection, the number of ballots sampled so far.
    pub sample_sizes: Vec<(String, usize)>,
    /// For each collection, the sample size requested for the next stage.
    pub plan: Vec<(String, usize)>,
    pub risks: Vec<(String, Option<f64>)>,
    pub statuses: Vec<(String, MeasurementStatus)>,
    /// The distinct statuses of all the measurements.
    pub election_status: BTreeSet<MeasurementStatus>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum AuditTermination {
    /// Every measurement reached a final status.
    Complete,
    /// The last allowed stage ran and some measurements are still open.
    MaxStagesReached,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AuditResult {
    pub stages: Vec<StageSnapshot>,
    pub termination: AuditTermination,
    pub sample_sizes: Vec<(String, usize)>,
    pub statuses: Vec<(String, MeasurementStatus)>,
}

/// The status of an open measurement after a new risk estimate.
///
/// A measurement passes as soon as its risk falls below the limit, and is
/// upset when the risk exceeds the upset threshold. Otherwise it is exhausted
/// if all its ballots have been sampled.
pub fn next_status(risk: f64, risk_limit: f64, risk_upset: f64, exhausted: bool) -> MeasurementStatus {
    if risk < risk_limit {
        MeasurementStatus::Passed
    } else if risk > risk_upset {
        MeasurementStatus::Upset
    } else if exhausted {
        MeasurementStatus::Exhausted
    } else {
        MeasurementStatus::Open
    }
}

/// The sample size of each collection for the next stage.
///
/// A collection grows by its audit rate as long as an active open measurement
/// needs it, up to its number of ballots.
pub fn compute_plan(
    structure: &ElectionStructure,
    measurements: &[Measurement],
    sample_sizes: &[usize],
    audit_rates: &[usize],
) -> Vec<usize> {
    let mut needed: HashSet<CollectionIdx> = HashSet::new();
    for m in measurements.iter() {
        if m.status == MeasurementStatus::Open && m.sampling_mode == SamplingMode::Active {
            needed.extend(structure.relevant_collections(m.contest));
        }
    }
    structure
        .collections()
        .map(|(pidx, p)| {
            let current = sample_sizes[pidx.0];
            if needed.contains(&pidx) {
                (current + audit_rates[pidx.0]).min(p.n_ballots())
            } else {
                current
            }
        })
        .collect()
}

/// The order in which the ballots of each collection are drawn, as manifest positions.
///
/// Each collection is shuffled with its own generator, derived from the audit
/// seed and the collection id.
pub fn sampling_order(
    structure: &ElectionStructure,
    params: &AuditParams,
) -> Result<Vec<Vec<usize>>, AuditErrors> {
    structure
        .collections()
        .map(|(_, p)| {
            let mut order: Vec<usize> = (0..p.n_ballots()).collect();
            if params.shuffle_ballots {
                let seed = derive_seed(params.seed, &format!("collection:{}", p.id))?;
                let mut rng = StdRng::seed_from_u64(seed);
                order.shuffle(&mut rng);
            }
            Ok(order)
        })
        .collect()
}

/// A staged audit of an election.
///
/// Each stage draws the ballots planned at the previous stage, updates the
/// risk of every open measurement, and plans the next sample.
#[derive(Debug, Clone)]
pub struct Audit {
    election: Election,
    params: AuditParams,
    estimator: RiskEstimator,
    measurements: Vec<Measurement>,
    audit_rates: Vec<usize>,
    sample: SampleStore,
    plan: Vec<usize>,
    stage: u32,
    snapshots: Vec<StageSnapshot>,
}

impl Audit {
    /// Sets up the audit at stage 0: nothing sampled yet, and a first plan.
    ///
    /// Arguments:
    /// * `audit_rates` the number of ballots added to the sample of a collection at
    /// each stage. Every collection needs one.
    pub fn new(
        election: Election,
        measurement_specs: &[MeasurementSpec],
        audit_rates: &[(String, usize)],
        params: AuditParams,
    ) -> Result<Audit, AuditErrors> {
        let estimator = RiskEstimator::new(&params)?;
        if params.max_stages == 0 {
            return Err(AuditErrors::InvalidParameter(
                "the number of stages must be positive".to_string(),
            ));
        }
        let measurements = check_measurements(&election.structure, measurement_specs)?;

        let structure = &election.structure;
        let mut rates: Vec<Option<usize>> = vec![None; structure.n_collections()];
        for (pbcid, rate) in audit_rates.iter() {
            let pidx = structure.collection_idx(pbcid)?;
            if rates[pidx.0].is_some() {
                return Err(AuditErrors::DuplicateId {
                    kind: "audit rate",
                    id: pbcid.clone(),
                });
            }
            if *rate == 0 {
                return Err(AuditErrors::InvalidParameter(format!(
                    "the audit rate of collection `{}` must be positive",
                    pbcid
                )));
            }
            rates[pidx.0] = Some(*rate);
        }
        let audit_rates: Vec<usize> = structure
            .collections()
            .map(|(pidx, p)| {
                rates[pidx.0].ok_or_else(|| {
                    AuditErrors::InvalidParameter(format!(
                        "no audit rate for collection `{}`",
                        p.id
                    ))
                })
            })
            .collect::<Result<Vec<usize>, AuditErrors>>()?;

        let orders = sampling_order(structure, &params)?;
        let sample = SampleStore::new(&election, orders)?;
        let sizes = vec![0; structure.n_collections()];
        let plan = compute_plan(structure, &measurements, &sizes, &audit_rates);

        let mut audit = Audit {
            election,
            params,
            estimator,
            measurements,
            audit_rates,
            sample,
            plan,
            stage: 0,
            snapshots: Vec::new(),
        };
        let snapshot = audit.snapshot();
        info!(
            "Audit of `{}`: {} measurements, first plan {:?}",
            audit.election.structure.name,
            audit.measurements.len(),
            snapshot.plan
        );
        audit.snapshots.push(snapshot);
        Ok(audit)
    }

    /// Runs one stage of the audit.
    ///
    /// Fails if a planned ballot has no audited vote.
    pub fn run_stage(&mut self) -> Result<&StageSnapshot, AuditErrors> {
        let stage = self.stage + 1;
        info!("Stage {}: drawing sample {:?}", stage, self.plan);
        for (pidx, _) in self.election.structure.collections() {
            let size = self.plan[pidx.0];
            if size != self.sample.sample_size(pidx) {
                self.sample.record_sample(&self.election, pidx, size)?;
            }
        }

        for m in self.measurements.iter_mut() {
            if m.status != MeasurementStatus::Open {
                continue;
            }
            let risk = self.estimator.contest_risk(
                &self.election,
                &self.sample,
                m.contest,
                stage,
                &m.id,
            )?;
            let structure = &self.election.structure;
            let exhausted = structure
                .relevant_collections(m.contest)
                .iter()
                .all(|pidx| self.sample.sample_size(*pidx) == structure.collection(*pidx).n_ballots());
            let status = next_status(risk, m.risk_limit, m.risk_upset, exhausted);
            info!(
                "Stage {}: measurement {} (contest {}): risk {:.4}, status {}",
                stage,
                m.id,
                structure.contest(m.contest).id,
                risk,
                status
            );
            m.risk = Some(risk);
            m.status = status;
        }

        let sizes: Vec<usize> = self
            .election
            .structure
            .collections()
            .map(|(pidx, _)| self.sample.sample_size(pidx))
            .collect();
        self.plan = compute_plan(
            &self.election.structure,
            &self.measurements,
            &sizes,
            &self.audit_rates,
        );
        debug!("run_stage: stage {}: next plan {:?}", stage, self.plan);
        self.stage = stage;
        let snapshot = self.snapshot();
        self.snapshots.push(snapshot);
        Ok(&self.snapshots[self.snapshots.len() - 1])
    }

    /// True when no measurement is open anymore.
    pub fn is_complete(&self) -> bool {
        !self
            .measurements
            .iter()
            .any(|m| m.status == MeasurementStatus::Open)
    }

    /// Runs stages until every measurement is decided or the stage limit is reached.
    pub fn run(mut self) -> Result<AuditResult, AuditErrors> {
        let termination = loop {
            if self.is_complete() {
                break AuditTermination::Complete;
            }
            if self.stage >= self.params.max_stages {
                break AuditTermination::MaxStagesReached;
            }
            self.run_stage()?;
        };
        info!(
            "Audit of `{}` stopped after stage {}: {:?}",
            self.election.structure.name, self.stage, termination
        );
        let last = self.snapshot();
        Ok(AuditResult {
            stages: self.snapshots,
            termination,
            sample_sizes: last.sample_sizes,
            statuses: last.statuses,
        })
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn sample(&self) -> &SampleStore {
        &self.sample
    }

    pub fn snapshots(&self) -> &[StageSnapshot] {
        &self.snapshots
    }

    fn snapshot(&self) -> StageSnapshot {
        let structure = &self.election.structure;
        StageSnapshot {
            stage: self.stage,
            sample_sizes: structure
                .collections()
                .map(|(pidx, p)| (p.id.clone(), self.sample.sample_size(pidx)))
                .collect(),
            plan: structure
                .collections()
                .map(|(pidx, p)| (p.id.clone(), self.plan[pidx.0]))
                .collect(),
            risks: self
                .measurements
                .iter()
                .map(|m| (m.id.clone(), m.risk))
                .collect(),
            statuses: self
                .measurements
                .iter()
                .map(|m| (m.id.clone(), m.status))
                .collect(),
            election_status: self.measurements.iter().map(|m| m.status).collect(),
        }
    }
}

fn check_measurements(
    structure: &ElectionStructure,
    specs: &[MeasurementSpec],
) -> Result<Vec<Measurement>, AuditErrors> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut res: Vec<Measurement> = Vec::new();
    for ms in specs.iter() {
        if !seen.insert(ms.measurement_id.as_str()) {
            return Err(AuditErrors::DuplicateId {
                kind: "measurement",
                id: ms.measurement_id.clone(),
            });
        }
        let cidx = structure.contest_idx(&ms.contest_id)?;
        let contest = structure.contest(cidx);
        if contest.contest_type != ContestType::Plurality {
            return Err(AuditErrors::UnsupportedContestType {
                contest: contest.id.clone(),
                contest_type: contest.contest_type,
            });
        }
        if !(0.0 <= ms.risk_limit && ms.risk_limit <= ms.risk_upset && ms.risk_upset <= 1.0) {
            return Err(AuditErrors::InvalidParameter(format!(
                "measurement `{}`: risk limit {} and upset threshold {} must satisfy 0 <= limit <= upset <= 1",
                ms.measurement_id, ms.risk_limit, ms.risk_upset
            )));
        }
        res.push(Measurement {
            id: ms.measurement_id.clone(),
            contest: cidx,
            risk_limit: ms.risk_limit,
            risk_upset: ms.risk_upset,
            sampling_mode: ms.sampling_mode,
            status: ms.initial_status,
            risk: None,
        });
    }
    if res.is_empty() {
        return Err(AuditErrors::InvalidParameter(
            "no measurement to audit".to_string(),
        ));
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ElectionBuilder;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn params(n_trials: u32, pseudocount_match: f64, shuffle_ballots: bool) -> AuditParams {
        AuditParams {
            n_trials,
            pseudocount_match,
            shuffle_ballots,
            ..AuditParams::DEFAULT_PARAMS
        }
    }

    // A single contest in one collection of 200 ballots, 120 reported for A
    // (3 out of every 5 ballots) and 80 for B.
    fn two_candidates(flip_a: bool) -> Election {
        let mut b = ElectionBuilder::new("two-candidates");
        b.add_contest(ContestSpec::plurality("mayor", &["A", "B"]));
        b.add_collection("p1", CvrType::Cvr, &["mayor"], 200);
        for i in 0..200 {
            let reported = if i % 5 < 3 { "A" } else { "B" };
            let actual = if flip_a { "B" } else { reported };
            b.add_ballot_simple("p1", &format!("p1-{}", i + 1), "mayor", &[reported], &[actual]);
        }
        b.build(0).unwrap()
    }

    // The contest spans a small and a large collection.
    fn small_and_large() -> Election {
        let mut b = ElectionBuilder::new("small-and-large");
        b.add_contest(ContestSpec::plurality("mayor", &["A", "B"]));
        b.add_contest(ContestSpec::plurality("prop", &["Yes", "No"]));
        b.add_collection("small", CvrType::Cvr, &["mayor"], 10);
        b.add_collection("large", CvrType::Cvr, &["mayor", "prop"], 100);
        for i in 0..10 {
            b.add_ballot_simple("small", &format!("small-{}", i + 1), "mayor", &["A"], &["A"]);
        }
        for i in 0..100 {
            let bid = format!("large-{}", i + 1);
            let v = if i % 3 == 0 { "B" } else { "A" };
            b.add_ballot_simple("large", &bid, "mayor", &[v], &[v]);
            b.add_ballot_simple("large", &bid, "prop", &["Yes"], &["Yes"]);
        }
        b.build(0).unwrap()
    }

    // Contest c1 in p1 (100 ballots, 60 reported A and 40 B) and p2 (50
    // ballots, 30 A and 20 B). In manifest order, 3 out of every 5 ballots are
    // reported A. With `flipped`, every actual vote is the other candidate.
    fn two_collections(flipped: bool) -> Election {
        let mut b = ElectionBuilder::new("two-collections");
        b.add_contest(ContestSpec::plurality("c1", &["A", "B"]));
        for (pbcid, n) in [("p1", 100), ("p2", 50)] {
            b.add_collection(pbcid, CvrType::Cvr, &["c1"], n);
            for i in 0..n {
                let (reported, other) = if i % 5 < 3 { ("A", "B") } else { ("B", "A") };
                let actual = if flipped { other } else { reported };
                let bid = format!("{}-{}", pbcid, i + 1);
                b.add_ballot_simple(pbcid, &bid, "c1", &[reported], &[actual]);
            }
        }
        b.build(0).unwrap()
    }

    fn rates(rates: &[(&str, usize)]) -> Vec<(String, usize)> {
        rates.iter().map(|(p, r)| (p.to_string(), *r)).collect()
    }

    #[test]
    fn matching_sample_passes() {
        init();
        let e = two_candidates(false);
        let audit = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "mayor", 0.05, 0.99)],
            &rates(&[("p1", 20)]),
            params(500, 50.0, true),
        )
        .unwrap();
        let res = audit.run().unwrap();
        assert_eq!(res.termination, AuditTermination::Complete);
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Passed)]
        );
        assert!(res.sample_sizes[0].1 < 200);
        // Stage 0 has no risk.
        assert_eq!(res.stages[0].risks, vec![("m1".to_string(), None)]);
        assert_eq!(res.stages[0].plan, vec![("p1".to_string(), 20)]);
        assert!(res.stages[1].risks[0].1.is_some());
    }

    #[test]
    fn flipped_sample_is_upset() {
        init();
        let e = two_candidates(true);
        let audit = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "mayor", 0.05, 0.9)],
            &rates(&[("p1", 20)]),
            params(500, 50.0, false),
        )
        .unwrap();
        let res = audit.run().unwrap();
        assert_eq!(res.termination, AuditTermination::Complete);
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Upset)]
        );
        assert!(res
            .stages
            .iter()
            .all(|s| !s.election_status.contains(&MeasurementStatus::Passed)));
    }

    #[test]
    fn matching_samples_pass_in_both_collections() {
        init();
        let audit = Audit::new(
            two_collections(false),
            &[MeasurementSpec::new("m1", "c1", 0.1, 0.95)],
            &rates(&[("p1", 10), ("p2", 10)]),
            params(2000, AuditParams::DEFAULT_PARAMS.pseudocount_match, false),
        )
        .unwrap();
        let res = audit.run().unwrap();
        assert_eq!(res.termination, AuditTermination::Complete);
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Passed)]
        );
        assert_eq!(res.stages.len(), 2);
        assert_eq!(
            res.sample_sizes,
            vec![("p1".to_string(), 10), ("p2".to_string(), 10)]
        );
    }

    #[test]
    fn flipped_samples_raise_the_risk_until_upset() {
        init();
        let audit = Audit::new(
            two_collections(true),
            &[MeasurementSpec::new("m1", "c1", 0.1, 0.95)],
            &rates(&[("p1", 10), ("p2", 10)]),
            params(2000, AuditParams::DEFAULT_PARAMS.pseudocount_match, false),
        )
        .unwrap();
        let res = audit.run().unwrap();
        assert_eq!(res.termination, AuditTermination::Complete);
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Upset)]
        );
        let risks: Vec<f64> = res.stages[1..]
            .iter()
            .filter_map(|s| s.risks[0].1)
            .collect();
        assert_eq!(risks.len(), res.stages.len() - 1);
        assert!(risks[0] > 0.1, "first risk {}", risks[0]);
        for w in risks.windows(2) {
            assert!(w[1] >= w[0], "risks {:?}", risks);
        }
        assert!(res
            .stages
            .iter()
            .all(|s| !s.election_status.contains(&MeasurementStatus::Passed)));
    }

    #[test]
    fn fully_sampled_collection_stops_growing() {
        init();
        let e = small_and_large();
        // Neither passes nor gets upset: the audit goes on until everything is sampled.
        let audit = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "mayor", 0.0, 1.0)],
            &rates(&[("small", 8), ("large", 8)]),
            params(50, 50.0, true),
        )
        .unwrap();
        let res = audit.run().unwrap();
        for s in res.stages.iter() {
            assert!(s.sample_sizes[0].1 <= 10);
            assert!(s.plan[0].1 <= 10);
        }
        assert_eq!(res.stages[1].plan[0], ("small".to_string(), 10));
        assert_eq!(res.stages[2].sample_sizes[0], ("small".to_string(), 10));
        assert_eq!(res.stages[2].plan[0], ("small".to_string(), 10));
        assert_eq!(
            res.sample_sizes,
            vec![("small".to_string(), 10), ("large".to_string(), 100)]
        );
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Exhausted)]
        );
        // 8 ballots per stage: 13 stages to draw the 100 ballots.
        assert_eq!(res.stages.len(), 14);
        assert_eq!(res.termination, AuditTermination::Complete);
    }

    #[test]
    fn stage_limit_is_a_termination() {
        init();
        let e = small_and_large();
        let mut p = params(50, 50.0, true);
        p.max_stages = 2;
        let audit = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "mayor", 0.0, 1.0)],
            &rates(&[("small", 1), ("large", 1)]),
            p,
        )
        .unwrap();
        let res = audit.run().unwrap();
        assert_eq!(res.termination, AuditTermination::MaxStagesReached);
        assert_eq!(res.stages.len(), 3);
        assert_eq!(
            res.statuses,
            vec![("m1".to_string(), MeasurementStatus::Open)]
        );
    }

    #[test]
    fn opportunistic_and_off_measurements_do_not_drive_the_sample() {
        init();
        let e = small_and_large();
        let mut prop = MeasurementSpec::new("m2", "prop", 0.0, 1.0);
        prop.sampling_mode = SamplingMode::Opportunistic;
        let mut off = MeasurementSpec::new("m3", "mayor", 0.05, 1.0);
        off.initial_status = MeasurementStatus::Off;
        let mut p = params(50, 50.0, true);
        p.max_stages = 3;
        let mut audit = Audit::new(
            e,
            &[prop, off],
            &rates(&[("small", 5), ("large", 5)]),
            p,
        )
        .unwrap();
        assert_eq!(audit.snapshots()[0].plan[1], ("large".to_string(), 0));
        let snapshot = audit.run_stage().unwrap();
        assert_eq!(snapshot.sample_sizes[1], ("large".to_string(), 0));
        assert_eq!(snapshot.risks[1], ("m3".to_string(), None));
        assert_eq!(snapshot.statuses[1], ("m3".to_string(), MeasurementStatus::Off));
        assert!(snapshot.risks[0].1.is_some());
    }

    #[test]
    fn missing_audited_ballot_is_fatal() {
        let mut b = ElectionBuilder::new("partial");
        b.add_contest(ContestSpec::plurality("mayor", &["A", "B"]));
        b.add_collection("p1", CvrType::Cvr, &["mayor"], 4);
        b.add_ballot_simple("p1", "p1-1", "mayor", &["A"], &["A"]);
        b.add_reported_vote("p1", "p1-2", "mayor", &["A"]);
        b.add_reported_vote("p1", "p1-3", "mayor", &["B"]);
        b.add_reported_vote("p1", "p1-4", "mayor", &["A"]);
        let e = b.build(0).unwrap();
        let mut audit = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "mayor", 0.0, 1.0)],
            &rates(&[("p1", 2)]),
            params(10, 50.0, false),
        )
        .unwrap();
        assert_eq!(
            audit.run_stage(),
            Err(AuditErrors::MissingActualVote {
                collection: "p1".to_string(),
                ballot: "p1-2".to_string()
            })
        );
    }

    #[test]
    fn status_is_monotone_in_the_limit() {
        let limits = [0.0, 0.01, 0.05, 0.1, 0.5, 0.9];
        for risk in [0.0, 0.02, 0.07, 0.3, 0.95] {
            let mut passed = false;
            for limit in limits.iter() {
                let s = next_status(risk, *limit, 0.95, false);
                if passed {
                    assert_eq!(s, MeasurementStatus::Passed);
                }
                passed = s == MeasurementStatus::Passed;
            }
        }
        assert_eq!(next_status(0.5, 0.05, 0.4, true), MeasurementStatus::Upset);
        assert_eq!(next_status(0.01, 0.05, 0.4, true), MeasurementStatus::Passed);
        assert_eq!(next_status(0.2, 0.05, 0.4, true), MeasurementStatus::Exhausted);
        assert_eq!(next_status(0.2, 0.05, 0.4, false), MeasurementStatus::Open);
    }

    #[test]
    fn invalid_audits() {
        let ms = MeasurementSpec::new("m1", "mayor", 0.05, 0.9);
        let r = rates(&[("small", 5), ("large", 5)]);
        let p = params(10, 50.0, true);

        let res = Audit::new(small_and_large(), &[ms.clone(), ms.clone()], &r, p.clone());
        assert_eq!(
            res.map(|_| ()),
            Err(AuditErrors::DuplicateId {
                kind: "measurement",
                id: "m1".to_string()
            })
        );

        let bad = MeasurementSpec::new("m1", "mayor", 0.5, 0.1);
        let res = Audit::new(small_and_large(), &[bad], &r, p.clone());
        assert!(matches!(res, Err(AuditErrors::InvalidParameter(_))));

        let res = Audit::new(small_and_large(), &[ms.clone()], &rates(&[("small", 5)]), p.clone());
        assert!(matches!(res, Err(AuditErrors::InvalidParameter(_))));

        let unknown = MeasurementSpec::new("m1", "sheriff", 0.05, 0.9);
        let res = Audit::new(small_and_large(), &[unknown], &r, p.clone());
        assert_eq!(
            res.map(|_| ()),
            Err(AuditErrors::UnknownContest("sheriff".to_string()))
        );

        let mut b = ElectionBuilder::new("irv");
        let mut irv = ContestSpec::plurality("rcv", &["A", "B"]);
        irv.contest_type = ContestType::Irv;
        b.add_contest(irv);
        b.add_collection("p1", CvrType::Cvr, &["rcv"], 1);
        b.add_ballot_simple("p1", "p1-1", "rcv", &["A", "B"], &["A", "B"]);
        b.add_declared_outcome("rcv", &["A"]);
        let e = b.build(0).unwrap();
        let res = Audit::new(
            e,
            &[MeasurementSpec::new("m1", "rcv", 0.05, 0.9)],
            &rates(&[("p1", 1)]),
            p,
        );
        assert_eq!(
            res.map(|_| ()),
            Err(AuditErrors::UnsupportedContestType {
                contest: "rcv".to_string(),
                contest_type: ContestType::Irv
            })
        );
    }
}
