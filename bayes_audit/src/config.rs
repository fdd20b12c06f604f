// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::ops::{Add, AddAssign};

/// Prefix marking a write-in selection, for example `+Lizard People`.
pub const WRITE_IN_PREFIX: char = '+';
/// Prefix marking an error or exception pseudo-selection, for example `-Invalid`.
pub const ERROR_PREFIX: char = '-';

/// Reported selection for every ballot of a collection without cast-vote records.
pub const NO_CVR: &str = "-noCVR";
/// The ballot does not carry the contest.
pub const NO_SUCH_CONTEST: &str = "-NoSuchContest";
/// An unreadable or otherwise invalid mark.
pub const INVALID: &str = "-Invalid";

pub fn is_writein(selid: &str) -> bool {
    selid.starts_with(WRITE_IN_PREFIX)
}

pub fn is_error_selid(selid: &str) -> bool {
    selid.starts_with(ERROR_PREFIX)
}

/// The selections marked on one ballot for one contest.
///
/// A vote is an ordered tuple: the order is kept from the input and two votes
/// are equal only if they list the same selections in the same order.
/// An empty vote is an undervote. For single-winner plurality contests, a vote
/// with more than one selection is an overvote.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Default)]
pub struct Vote(pub Vec<String>);

impl Vote {
    pub fn new(selids: &[&str]) -> Vote {
        Vote(selids.iter().map(|s| s.to_string()).collect())
    }

    /// A vote made of a single (pseudo-)selection.
    pub fn single(selid: &str) -> Vote {
        Vote(vec![selid.to_string()])
    }

    pub fn undervote() -> Vote {
        Vote(Vec::new())
    }

    pub fn selections(&self) -> &[String] {
        &self.0
    }

    pub fn is_undervote(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Vote {
    fn from(selids: Vec<String>) -> Vote {
        Vote(selids)
    }
}

impl Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// A number of ballots.
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash, Default)]
pub struct VoteCount(pub u64);

impl VoteCount {
    pub const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ContestType {
    Plurality,
    /// Instant-runoff voting. Contests of this type can be described but not audited.
    Irv,
}

/// The policy of a contest with respect to write-in selections.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum WriteIns {
    No,
    Qualified,
    Arbitrary,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ContestSpec {
    pub contest_id: String,
    pub contest_type: ContestType,
    pub winners: u32,
    pub write_ins: WriteIns,
    /// The declared selections, in ballot order.
    pub selections: Vec<String>,
}

impl ContestSpec {
    /// A single-winner plurality contest without write-ins.
    pub fn plurality(contest_id: &str, selections: &[&str]) -> ContestSpec {
        ContestSpec {
            contest_id: contest_id.to_string(),
            contest_type: ContestType::Plurality,
            winners: 1,
            write_ins: WriteIns::No,
            selections: selections.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Whether a collection has ballot-level cast vote records or only aggregate tallies.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CvrType {
    Cvr,
    NoCvr,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CollectionSpec {
    pub collection_id: String,
    pub manager: String,
    pub cvr_type: CvrType,
    /// The contests that may appear on ballots of this collection.
    pub contests: Vec<String>,
    /// The ballot manifest, in its authoritative order.
    pub ballot_ids: Vec<String>,
    /// The number of ballots reported cast. If provided, it must match the manifest.
    pub reported_ballots: Option<u64>,
}

/// The reported vote of one ballot (collections with cast vote records),
/// or the actual vote found by hand on one ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotVote {
    pub collection_id: String,
    pub ballot_id: String,
    pub contest_id: String,
    pub vote: Vote,
}

/// An aggregate reported count, for collections without cast vote records.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportedTally {
    pub collection_id: String,
    pub contest_id: String,
    pub vote: Vote,
    pub count: u64,
}

/// A reported outcome as declared by the election officials.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DeclaredOutcome {
    pub contest_id: String,
    pub winners: Vec<String>,
}

/// All the raw data describing an election and its audited ballots.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionData {
    pub contests: Vec<ContestSpec>,
    pub collections: Vec<CollectionSpec>,
    /// Ballot-level reported votes, for collections with cast vote records.
    pub reported_votes: Vec<BallotVote>,
    /// Aggregate reported tallies, for collections without cast vote records.
    pub reported_tallies: Vec<ReportedTally>,
    pub declared_outcomes: Vec<DeclaredOutcome>,
    /// The votes read by hand on the examined ballots.
    pub actual_votes: Vec<BallotVote>,
}

// ******** Audit parameters *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RiskMethod {
    Bayes,
}

/// Active measurements drive the sample plan. Opportunistic measurements
/// only get their risk updated from the ballots drawn for other measurements.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SamplingMode {
    Active,
    Opportunistic,
}

/// The status of one measurement at a given stage.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum MeasurementStatus {
    Open,
    Passed,
    Upset,
    Exhausted,
    /// Declared but not audited.
    Off,
}

impl MeasurementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MeasurementStatus::Open)
    }
}

impl Display for MeasurementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MeasurementStatus::Open => "Open",
            MeasurementStatus::Passed => "Passed",
            MeasurementStatus::Upset => "Upset",
            MeasurementStatus::Exhausted => "Exhausted",
            MeasurementStatus::Off => "Off",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MeasurementSpec {
    pub measurement_id: String,
    pub contest_id: String,
    pub risk_method: RiskMethod,
    /// The audit of this measurement stops once the risk falls below this value.
    pub risk_limit: f64,
    /// A full hand count is called for once the risk exceeds this value.
    pub risk_upset: f64,
    pub sampling_mode: SamplingMode,
    pub initial_status: MeasurementStatus,
}

impl MeasurementSpec {
    pub fn new(measurement_id: &str, contest_id: &str, risk_limit: f64, risk_upset: f64) -> Self {
        MeasurementSpec {
            measurement_id: measurement_id.to_string(),
            contest_id: contest_id.to_string(),
            risk_method: RiskMethod::Bayes,
            risk_limit,
            risk_upset,
            sampling_mode: SamplingMode::Active,
            initial_status: MeasurementStatus::Open,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AuditParams {
    /// Seed for all the pseudo-random draws of the audit.
    pub seed: u64,
    /// Number of Monte Carlo trials for each risk estimate.
    pub n_trials: u32,
    /// Prior pseudocount for each (reported vote, actual vote) pair.
    /// 0.5 corresponds to the Jeffreys prior.
    pub pseudocount_base: f64,
    /// Prior pseudocount when the actual vote equals the reported vote.
    /// The larger value encodes that scanners are expected to be accurate.
    pub pseudocount_match: f64,
    pub max_stages: u32,
    /// Number of warnings tolerated in the input data before refusing to audit.
    pub max_warnings: usize,
    /// Draw the ballots in a seeded random order rather than in manifest order.
    pub shuffle_ballots: bool,
}

impl AuditParams {
    pub const DEFAULT_PARAMS: AuditParams = AuditParams {
        seed: 1,
        n_trials: 100000,
        pseudocount_base: 0.5,
        pseudocount_match: 50.0,
        max_stages: 20,
        max_warnings: 0,
        shuffle_ballots: true,
    };
}

// ******** Errors *********

/// Errors that prevent an audit from starting or from completing a stage.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AuditErrors {
    EmptyElection,
    DuplicateId {
        kind: &'static str,
        id: String,
    },
    UnknownContest(String),
    UnknownCollection(String),
    UnknownBallot {
        collection: String,
        ballot: String,
    },
    UnknownSelection {
        contest: String,
        selection: String,
    },
    UnknownMeasurement(String),
    NotRelevant {
        contest: String,
        collection: String,
    },
    DuplicateVote {
        contest: String,
        collection: String,
        ballot: String,
    },
    BallotCountMismatch {
        collection: String,
        declared: u64,
        manifest: u64,
    },
    TallyOutOfRange {
        contest: String,
        collection: String,
        count: u64,
        max: u64,
    },
    TallyMismatch {
        contest: String,
        collection: String,
        expected: u64,
        actual: u64,
    },
    CvrTypeMismatch {
        collection: String,
        cvr_type: CvrType,
    },
    NoValidVotes(String),
    UnsupportedContestType {
        contest: String,
        contest_type: ContestType,
    },
    InvalidParameter(String),
    SampleShrink {
        collection: String,
        current: usize,
        requested: usize,
    },
    SampleOverflow {
        collection: String,
        requested: usize,
        total: usize,
    },
    MissingActualVote {
        collection: String,
        ballot: String,
    },
    TooManyWarnings {
        count: usize,
        max: usize,
    },
}

impl Error for AuditErrors {}

impl Display for AuditErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditErrors::EmptyElection => write!(f, "the election has no contest or no collection"),
            AuditErrors::DuplicateId { kind, id } => write!(f, "duplicate {} id `{}`", kind, id),
            AuditErrors::UnknownContest(cid) => write!(f, "unknown contest `{}`", cid),
            AuditErrors::UnknownCollection(pbcid) => write!(f, "unknown collection `{}`", pbcid),
            AuditErrors::UnknownBallot { collection, ballot } => write!(
                f,
                "ballot `{}` is not in the manifest of collection `{}`",
                ballot, collection
            ),
            AuditErrors::UnknownSelection { contest, selection } => write!(
                f,
                "selection `{}` is neither declared for contest `{}` nor a write-in or an error",
                selection, contest
            ),
            AuditErrors::UnknownMeasurement(mid) => write!(f, "unknown measurement `{}`", mid),
            AuditErrors::NotRelevant {
                contest,
                collection,
            } => write!(
                f,
                "contest `{}` is not relevant to collection `{}`",
                contest, collection
            ),
            AuditErrors::DuplicateVote {
                contest,
                collection,
                ballot,
            } => write!(
                f,
                "ballot `{}` of collection `{}` has several votes for contest `{}`",
                ballot, collection, contest
            ),
            AuditErrors::BallotCountMismatch {
                collection,
                declared,
                manifest,
            } => write!(
                f,
                "collection `{}` declares {} ballots but its manifest lists {}",
                collection, declared, manifest
            ),
            AuditErrors::TallyOutOfRange {
                contest,
                collection,
                count,
                max,
            } => write!(
                f,
                "reported tally {} for contest `{}` in collection `{}` is out of range 0:{}",
                count, contest, collection, max
            ),
            AuditErrors::TallyMismatch {
                contest,
                collection,
                expected,
                actual,
            } => write!(
                f,
                "reported tallies for contest `{}` in collection `{}` sum to {} instead of {}",
                contest, collection, actual, expected
            ),
            AuditErrors::CvrTypeMismatch {
                collection,
                cvr_type,
            } => match cvr_type {
                CvrType::Cvr => write!(
                    f,
                    "collection `{}` has cast vote records and cannot take aggregate tallies",
                    collection
                ),
                CvrType::NoCvr => write!(
                    f,
                    "collection `{}` has no cast vote records and cannot take ballot-level votes",
                    collection
                ),
            },
            AuditErrors::NoValidVotes(cid) => write!(f, "contest `{}` has no valid vote", cid),
            AuditErrors::UnsupportedContestType {
                contest,
                contest_type,
            } => write!(
                f,
                "contest `{}` has type {:?}, which cannot be tallied",
                contest, contest_type
            ),
            AuditErrors::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            AuditErrors::SampleShrink {
                collection,
                current,
                requested,
            } => write!(
                f,
                "cannot shrink the sample of collection `{}` from {} to {} ballots",
                collection, current, requested
            ),
            AuditErrors::SampleOverflow {
                collection,
                requested,
                total,
            } => write!(
                f,
                "cannot sample {} ballots from collection `{}` of {} ballots",
                requested, collection, total
            ),
            AuditErrors::MissingActualVote { collection, ballot } => write!(
                f,
                "ballot `{}` of collection `{}` was drawn but has not been audited",
                ballot, collection
            ),
            AuditErrors::TooManyWarnings { count, max } => write!(
                f,
                "{} warnings in the election data (at most {} allowed); refusing to audit",
                count, max
            ),
        }
    }
}

/// Non-fatal issues found in the election data.
///
/// Warnings are collected while the election is assembled. Past a threshold,
/// the data is considered untrustworthy and the audit refuses to run.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub fn new() -> Warnings {
        Warnings::default()
    }

    pub fn add(&mut self, message: String) {
        log::warn!("{}", message);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Fails if more than `max` warnings were recorded.
    pub fn check(&self, max: usize) -> Result<(), AuditErrors> {
        if self.messages.len() > max {
            Err(AuditErrors::TooManyWarnings {
                count: self.messages.len(),
                max,
            })
        } else {
            Ok(())
        }
    }
}
