use crate::multi::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StructureFiles {
    #[serde(rename = "contestsFile")]
    pub contests_file: String,
    #[serde(rename = "collectionsFile")]
    pub collections_file: String,
}

/// The parameters of the audit. All of them are optional and default to
/// the values of `AuditParams::DEFAULT_PARAMS`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditSettings {
    pub seed: Option<u64>,
    #[serde(rename = "nTrials")]
    pub n_trials: Option<u32>,
    #[serde(rename = "pseudocountBase")]
    pub pseudocount_base: Option<f64>,
    #[serde(rename = "pseudocountMatch")]
    pub pseudocount_match: Option<f64>,
    #[serde(rename = "maxStages")]
    pub max_stages: Option<u32>,
    #[serde(rename = "maxWarnings")]
    pub max_warnings: Option<usize>,
    #[serde(rename = "shuffleBallots")]
    pub shuffle_ballots: Option<bool>,
}

impl AuditSettings {
    pub fn params(&self, overrides: &AuditOverrides) -> AuditParams {
        let d = AuditParams::DEFAULT_PARAMS;
        AuditParams {
            seed: overrides.seed.or(self.seed).unwrap_or(d.seed),
            n_trials: overrides.n_trials.or(self.n_trials).unwrap_or(d.n_trials),
            pseudocount_base: self.pseudocount_base.unwrap_or(d.pseudocount_base),
            pseudocount_match: self.pseudocount_match.unwrap_or(d.pseudocount_match),
            max_stages: self.max_stages.unwrap_or(d.max_stages),
            max_warnings: self.max_warnings.unwrap_or(d.max_warnings),
            shuffle_ballots: self.shuffle_ballots.unwrap_or(d.shuffle_ballots),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    #[serde(rename = "measurementId")]
    pub measurement_id: String,
    #[serde(rename = "contestId")]
    pub contest_id: String,
    #[serde(rename = "riskMethod")]
    pub risk_method: Option<String>,
    #[serde(rename = "riskLimit")]
    pub risk_limit: f64,
    #[serde(rename = "riskUpset")]
    pub risk_upset: f64,
    #[serde(rename = "samplingMode")]
    pub sampling_mode: Option<String>,
    #[serde(rename = "initialStatus")]
    pub initial_status: Option<String>,
}

impl MeasurementConfig {
    pub fn measurement_spec(&self) -> MultiResult<MeasurementSpec> {
        let mut ms = MeasurementSpec::new(
            &self.measurement_id,
            &self.contest_id,
            self.risk_limit,
            self.risk_upset,
        );
        ms.risk_method = match self.risk_method.as_deref() {
            None | Some("Bayes") | Some("bayes") => RiskMethod::Bayes,
            Some(x) => whatever!(
                "measurement {}: unknown risk method {:?}",
                self.measurement_id,
                x
            ),
        };
        ms.sampling_mode = match self.sampling_mode.as_deref() {
            None | Some("Active") | Some("active") => SamplingMode::Active,
            Some("Opportunistic") | Some("opportunistic") => SamplingMode::Opportunistic,
            Some(x) => whatever!(
                "measurement {}: unknown sampling mode {:?}",
                self.measurement_id,
                x
            ),
        };
        ms.initial_status = match self.initial_status.as_deref() {
            None | Some("Open") | Some("open") => MeasurementStatus::Open,
            Some("Off") | Some("off") => MeasurementStatus::Off,
            Some(x) => whatever!(
                "measurement {}: a measurement may only start Open or Off, not {:?}",
                self.measurement_id,
                x
            ),
        };
        Ok(ms)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuditRate {
    #[serde(rename = "collectionId")]
    pub collection_id: String,
    pub rate: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(rename = "electionName")]
    pub election_name: String,
    #[serde(rename = "electionDate")]
    pub election_date: Option<String>,
    #[serde(rename = "electionUrl")]
    pub election_url: Option<String>,
    pub structure: StructureFiles,
    #[serde(rename = "manifestFiles")]
    pub manifest_files: Vec<String>,
    #[serde(rename = "reportedVotesFiles")]
    pub reported_votes_files: Vec<String>,
    #[serde(rename = "reportedOutcomesFile")]
    pub reported_outcomes_file: Option<String>,
    #[serde(rename = "auditedVotesFiles")]
    pub audited_votes_files: Vec<String>,
    #[serde(default)]
    pub audit: AuditSettings,
    pub measurements: Vec<MeasurementConfig>,
    #[serde(rename = "auditRates")]
    pub audit_rates: Vec<AuditRate>,
}

pub fn read_config(path: &str) -> MultiResult<AuditConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: AuditConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> MultiResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {} stages", js["stages"].as_array().map(|a| a.len()).unwrap_or(0));
    Ok(js)
}
