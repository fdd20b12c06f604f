// Readers for the CSV files describing an election.
//
// All the files start with a header row. In the files with a variable number
// of columns, the last header names the column that collects all the remaining
// cells of each row.

use csv::{ReaderBuilder, Trim};

use crate::multi::io_common::{assemble_selections, simplify_file_name};
use crate::multi::*;

/// A CSV file, read in memory.
pub struct CsvTable {
    pub path: String,
    pub header: Vec<String>,
    /// The non-empty rows with their line numbers (the header is line 1).
    pub rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    /// The index of the column with the given name, compared case-insensitively.
    fn column(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    fn required_column(&self, name: &str) -> MultiResult<usize> {
        self.column(name).context(CsvMissingColumnSnafu {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }

    /// The fixed cells of a row of a variable-length file, and the remaining cells.
    fn split_row<'a>(
        &self,
        lineno: usize,
        row: &'a [String],
    ) -> MultiResult<(&'a [String], Vec<String>)> {
        let n_fixed = self.header.len().saturating_sub(1);
        ensure!(
            row.len() >= n_fixed,
            CsvLineTooShortSnafu {
                path: self.path.clone(),
                lineno
            }
        );
        Ok((&row[..n_fixed], assemble_selections(&row[n_fixed..])))
    }

    fn cell<'a>(&self, lineno: usize, row: &'a [String], idx: usize) -> MultiResult<&'a str> {
        row.get(idx)
            .map(|s| s.as_str())
            .context(CsvLineTooShortSnafu {
                path: self.path.clone(),
                lineno,
            })
    }
}

pub fn read_table(path: &str) -> MultiResult<CsvTable> {
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if header.is_none() {
            header = Some(cells);
            continue;
        }
        if cells.iter().all(|s| s.is_empty()) {
            continue;
        }
        rows.push((lineno, cells));
    }
    let header = match header {
        Some(h) => h,
        None => whatever!("{}: missing header row", path),
    };
    debug!(
        "read_table: {}: header {:?}, {} rows",
        simplify_file_name(path),
        header,
        rows.len()
    );
    Ok(CsvTable {
        path: path.to_string(),
        header,
        rows,
    })
}

fn parse_number<T: std::str::FromStr>(
    table: &CsvTable,
    lineno: usize,
    column: &str,
    s: &str,
) -> MultiResult<T> {
    match s.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => whatever!(
            "{}: line {}: could not read {:?} as a number in column {}",
            table.path,
            lineno,
            s,
            column
        ),
    }
}

/// Contests file: `Contest id, Contest type, Winners, Write-ins, Selections...`
pub fn read_contests(path: &str) -> MultiResult<Vec<ContestSpec>> {
    let table = read_table(path)?;
    let mut res: Vec<ContestSpec> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let (fixed, selections) = table.split_row(*lineno, row)?;
        if fixed.len() < 4 {
            return CsvLineTooShortSnafu {
                path: table.path.clone(),
                lineno: *lineno,
            }
            .fail();
        }
        let contest_type = match fixed[1].to_lowercase().as_str() {
            "plurality" => ContestType::Plurality,
            "irv" => ContestType::Irv,
            x => whatever!("{}: line {}: unknown contest type {:?}", path, lineno, x),
        };
        let write_ins = match fixed[3].to_lowercase().as_str() {
            "no" | "" => WriteIns::No,
            "qualified" => WriteIns::Qualified,
            "arbitrary" => WriteIns::Arbitrary,
            x => whatever!("{}: line {}: unknown write-in policy {:?}", path, lineno, x),
        };
        res.push(ContestSpec {
            contest_id: fixed[0].clone(),
            contest_type,
            winners: parse_number(&table, *lineno, "Winners", &fixed[2])?,
            write_ins,
            selections,
        });
    }
    info!("Read {} contests from {}", res.len(), path);
    Ok(res)
}

/// Collections file: `Collection id, Manager, CVR type, Contests...`
///
/// The manifests are read separately: the returned collections have no ballot.
pub fn read_collections(path: &str) -> MultiResult<Vec<CollectionSpec>> {
    let table = read_table(path)?;
    let mut res: Vec<CollectionSpec> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let (fixed, contests) = table.split_row(*lineno, row)?;
        if fixed.len() < 3 {
            return CsvLineTooShortSnafu {
                path: table.path.clone(),
                lineno: *lineno,
            }
            .fail();
        }
        let cvr_type = match fixed[2].to_lowercase().as_str() {
            "cvr" => CvrType::Cvr,
            "nocvr" => CvrType::NoCvr,
            x => whatever!("{}: line {}: unknown CVR type {:?}", path, lineno, x),
        };
        res.push(CollectionSpec {
            collection_id: fixed[0].clone(),
            manager: fixed[1].clone(),
            cvr_type,
            contests,
            ballot_ids: Vec::new(),
            reported_ballots: None,
        });
    }
    info!("Read {} collections from {}", res.len(), path);
    Ok(res)
}

/// Ballot manifest: `Collection id, Original index, Ballot id, Location`, and
/// optionally `Number of ballots`.
///
/// A row with a number of ballots `n` stands for the ballots `{ballot id}-1`
/// to `{ballot id}-{n}`.
pub fn read_manifest(path: &str) -> MultiResult<Vec<(String, String)>> {
    let table = read_table(path)?;
    let collection_idx = table.required_column("Collection id")?;
    let ballot_idx = table.required_column("Ballot id")?;
    let number_idx = table.column("Number of ballots");
    let mut res: Vec<(String, String)> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let pbcid = table.cell(*lineno, row, collection_idx)?;
        let bid = table.cell(*lineno, row, ballot_idx)?;
        let number = number_idx
            .and_then(|idx| row.get(idx))
            .filter(|s| !s.is_empty());
        match number {
            Some(s) => {
                let n: usize = parse_number(&table, *lineno, "Number of ballots", s)?;
                for i in 1..=n {
                    res.push((pbcid.to_string(), format!("{}-{}", bid, i)));
                }
            }
            None => res.push((pbcid.to_string(), bid.to_string())),
        }
    }
    info!("Read {} ballots from manifest {}", res.len(), path);
    Ok(res)
}

/// The content of a file of reported votes.
pub enum ReportedFile {
    Ballots(Vec<BallotVote>),
    Tallies(Vec<ReportedTally>),
}

fn read_ballot_votes(table: &CsvTable) -> MultiResult<Vec<BallotVote>> {
    let mut res: Vec<BallotVote> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let (fixed, selections) = table.split_row(*lineno, row)?;
        if fixed.len() < 4 {
            return CsvLineTooShortSnafu {
                path: table.path.clone(),
                lineno: *lineno,
            }
            .fail();
        }
        res.push(BallotVote {
            collection_id: fixed[0].clone(),
            ballot_id: fixed[2].clone(),
            contest_id: fixed[3].clone(),
            vote: Vote::from(selections),
        });
    }
    Ok(res)
}

/// Reported votes: `Collection id, Source, Ballot id, Contest, Selections...` for
/// collections with cast vote records, or `Collection id, Source, Tally, Contest, Selections...`
/// for aggregate tallies.
pub fn read_reported_votes(path: &str) -> MultiResult<ReportedFile> {
    let table = read_table(path)?;
    let is_tally = table
        .header
        .get(2)
        .map(|h| h.eq_ignore_ascii_case("Tally"))
        .unwrap_or(false);
    if !is_tally {
        let votes = read_ballot_votes(&table)?;
        info!("Read {} reported votes from {}", votes.len(), path);
        return Ok(ReportedFile::Ballots(votes));
    }
    let mut res: Vec<ReportedTally> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let (fixed, selections) = table.split_row(*lineno, row)?;
        if fixed.len() < 4 {
            return CsvLineTooShortSnafu {
                path: table.path.clone(),
                lineno: *lineno,
            }
            .fail();
        }
        res.push(ReportedTally {
            collection_id: fixed[0].clone(),
            contest_id: fixed[3].clone(),
            vote: Vote::from(selections),
            count: parse_number(&table, *lineno, "Tally", &fixed[2])?,
        });
    }
    info!("Read {} reported tallies from {}", res.len(), path);
    Ok(ReportedFile::Tallies(res))
}

/// Audited votes, in the same format as the reported votes of ballots.
pub fn read_audited_votes(path: &str) -> MultiResult<Vec<BallotVote>> {
    let table = read_table(path)?;
    let votes = read_ballot_votes(&table)?;
    info!("Read {} audited votes from {}", votes.len(), path);
    Ok(votes)
}

/// Reported outcomes: `Contest id, Winner(s)...`
pub fn read_outcomes(path: &str) -> MultiResult<Vec<DeclaredOutcome>> {
    let table = read_table(path)?;
    let mut res: Vec<DeclaredOutcome> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let (fixed, winners) = table.split_row(*lineno, row)?;
        if fixed.is_empty() {
            return CsvLineTooShortSnafu {
                path: table.path.clone(),
                lineno: *lineno,
            }
            .fail();
        }
        res.push(DeclaredOutcome {
            contest_id: fixed[0].clone(),
            winners,
        });
    }
    Ok(res)
}
