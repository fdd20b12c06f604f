use log::{debug, info, warn};

use bayes_audit::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

mod config_reader;
mod io_common;
mod io_csv;

use crate::multi::config_reader::*;
use crate::multi::io_common::data_path;
use crate::multi::io_csv::*;

#[derive(Debug, Snafu)]
pub enum MultiError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Line {lineno} of {path} has too few columns"))]
    CsvLineTooShort { path: String, lineno: usize },
    #[snafu(display("Missing column {column} in {path}"))]
    CsvMissingColumn { path: String, column: String },

    #[snafu(display("Audit error: {source}"))]
    Audit { source: AuditErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MultiResult<T> = Result<T, MultiError>;

/// Command-line values that take precedence over the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AuditOverrides {
    pub seed: Option<u64>,
    pub n_trials: Option<u32>,
}

// Reads all the data files listed in the configuration.
fn read_election_data(root: &Path, config: &AuditConfig) -> MultiResult<ElectionData> {
    let contests = read_contests(&data_path(root, &config.structure.contests_file))?;
    let mut collections =
        read_collections(&data_path(root, &config.structure.collections_file))?;

    let mut manifests: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file_path in config.manifest_files.iter() {
        for (pbcid, bid) in read_manifest(&data_path(root, file_path))? {
            manifests.entry(pbcid).or_insert_with(Vec::new).push(bid);
        }
    }
    for pbcid in manifests.keys() {
        if !collections.iter().any(|p| p.collection_id == *pbcid) {
            whatever!("The ballot manifest lists unknown collection {}", pbcid);
        }
    }
    for p in collections.iter_mut() {
        if let Some(bids) = manifests.remove(&p.collection_id) {
            p.ballot_ids = bids;
        }
    }

    let mut reported_votes: Vec<BallotVote> = Vec::new();
    let mut reported_tallies: Vec<ReportedTally> = Vec::new();
    for file_path in config.reported_votes_files.iter() {
        match read_reported_votes(&data_path(root, file_path))? {
            ReportedFile::Ballots(mut votes) => reported_votes.append(&mut votes),
            ReportedFile::Tallies(mut tallies) => reported_tallies.append(&mut tallies),
        }
    }

    let declared_outcomes = match &config.reported_outcomes_file {
        Some(file_path) => read_outcomes(&data_path(root, file_path))?,
        None => Vec::new(),
    };

    let mut actual_votes: Vec<BallotVote> = Vec::new();
    for file_path in config.audited_votes_files.iter() {
        actual_votes.append(&mut read_audited_votes(&data_path(root, file_path))?);
    }

    Ok(ElectionData {
        contests,
        collections,
        reported_votes,
        reported_tallies,
        declared_outcomes,
        actual_votes,
    })
}

fn named_sizes_to_json(sizes: &[(String, usize)]) -> JSMap<String, JSValue> {
    sizes
        .iter()
        .map(|(id, size)| (id.clone(), json!(size)))
        .collect()
}

fn statuses_to_json(statuses: &[(String, MeasurementStatus)]) -> JSMap<String, JSValue> {
    statuses
        .iter()
        .map(|(mid, status)| (mid.clone(), json!(status.to_string())))
        .collect()
}

fn stages_to_json(stages: &[StageSnapshot]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for snapshot in stages.iter() {
        let risks: JSMap<String, JSValue> = snapshot
            .risks
            .iter()
            .map(|(mid, risk)| (mid.clone(), json!(risk)))
            .collect();
        let election_status: Vec<String> = snapshot
            .election_status
            .iter()
            .map(|s| s.to_string())
            .collect();
        l.push(json!({
            "stage": snapshot.stage,
            "sampleSizes": named_sizes_to_json(&snapshot.sample_sizes),
            "plan": named_sizes_to_json(&snapshot.plan),
            "risks": risks,
            "statuses": statuses_to_json(&snapshot.statuses),
            "electionStatus": election_status,
        }));
    }
    l
}

fn build_summary_js(config: &AuditConfig, params: &AuditParams, result: &AuditResult) -> JSValue {
    let termination = match result.termination {
        AuditTermination::Complete => "Complete",
        AuditTermination::MaxStagesReached => "MaxStagesReached",
    };
    json!({
        "config": {
            "election": config.election_name,
            "date": config.election_date,
            "url": config.election_url,
            "seed": params.seed,
            "nTrials": params.n_trials,
        },
        "stages": stages_to_json(&result.stages),
        "result": {
            "termination": termination,
            "sampleSizes": named_sizes_to_json(&result.sample_sizes),
            "statuses": statuses_to_json(&result.statuses),
        }
    })
}

/// Runs the audit described by a configuration file and returns its summary.
///
/// Arguments:
/// * `out` where to write the summary: a file path or `stdout`
/// * `reference` a reference summary. The run fails if the produced summary differs from it.
pub fn run_audit(
    config_path: &str,
    out: Option<&str>,
    reference: Option<&str>,
    overrides: &AuditOverrides,
) -> MultiResult<JSValue> {
    let config = read_config(config_path)?;
    info!("config: {:?}", config);
    let root = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;

    let params = config.audit.params(overrides);
    let measurements: Vec<MeasurementSpec> = config
        .measurements
        .iter()
        .map(|m| m.measurement_spec())
        .collect::<MultiResult<Vec<MeasurementSpec>>>()?;
    let audit_rates: Vec<(String, usize)> = config
        .audit_rates
        .iter()
        .map(|r| (r.collection_id.clone(), r.rate))
        .collect();

    let data = read_election_data(root, &config)?;
    let election =
        Election::new(&config.election_name, &data, params.max_warnings).context(AuditSnafu {})?;
    for w in election.warnings.messages() {
        warn!("Warning in the election data: {}", w);
    }

    let audit = Audit::new(election, &measurements, &audit_rates, params.clone())
        .context(AuditSnafu {})?;
    let result = audit.run().context(AuditSnafu {})?;
    info!(
        "Audit finished: {:?}, statuses {:?}",
        result.termination, result.statuses
    );

    // Assemble the final json
    let result_js = build_summary_js(&config, &params, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match out {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingOutputSnafu { path })?;
            info!("Summary written to {}", path);
        }
        None => {
            debug!("run_audit: summary: {}", pretty_js_stats);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(result_js)
}

fn run_audit_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> MultiResult<JSValue> {
    let test_dir = option_env!("AUDIT_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let res = run_audit(
        &format!("{}/{}/{}", test_dir, test_name, config_lpath),
        None,
        Some(&format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        &AuditOverrides::default(),
    );
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    res
}

pub fn test_wrapper(test_name: &str) -> MultiResult<JSValue> {
    run_audit_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ex1_path(name: &str) -> String {
        format!("{}/tests/data/ex1/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn ex1() {
        init();
        let js = test_wrapper("ex1").unwrap();
        assert_eq!(js["result"]["termination"], json!("Complete"));
        assert_eq!(js["stages"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        init();
        let mut summary = read_summary(&ex1_path("ex1_expected_summary.json")).unwrap();
        summary["result"]["termination"] = json!("MaxStagesReached");
        let ref_path = std::env::temp_dir().join("multiaudit_ex1_wrong_summary.json");
        fs::write(&ref_path, serde_json::to_string_pretty(&summary).unwrap()).unwrap();
        let res = run_audit(
            &ex1_path("ex1_config.json"),
            None,
            ref_path.to_str(),
            &AuditOverrides::default(),
        );
        assert!(matches!(res, Err(MultiError::Whatever { .. })));
    }

    #[test]
    fn overrides_take_precedence() {
        init();
        let overrides = AuditOverrides {
            seed: Some(7),
            n_trials: Some(10),
        };
        let out_path = std::env::temp_dir().join("multiaudit_ex1_summary.json");
        let js = run_audit(
            &ex1_path("ex1_config.json"),
            out_path.to_str(),
            None,
            &overrides,
        )
        .unwrap();
        assert_eq!(js["config"]["seed"], json!(7));
        assert_eq!(js["config"]["nTrials"], json!(10));
        let written = read_summary(out_path.to_str().unwrap()).unwrap();
        assert_eq!(written, js);
    }

    #[test]
    fn unknown_sampling_mode_is_an_error() {
        let m = MeasurementConfig {
            measurement_id: "M1".to_string(),
            contest_id: "mayor".to_string(),
            risk_method: None,
            risk_limit: 0.05,
            risk_upset: 0.98,
            sampling_mode: Some("sometimes".to_string()),
            initial_status: None,
        };
        assert!(m.measurement_spec().is_err());
    }

    #[test]
    fn audit_errors_are_reported() {
        init();
        let overrides = AuditOverrides {
            seed: None,
            n_trials: Some(0),
        };
        let res = run_audit(&ex1_path("ex1_config.json"), None, None, &overrides);
        assert!(matches!(
            res,
            Err(MultiError::Audit {
                source: AuditErrors::InvalidParameter(_)
            })
        ));
    }
}
