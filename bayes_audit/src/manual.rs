/*!

This is the long-form manual for `bayes_audit` and `multiaudit`.

## Concepts

An election has several *contests*, and its paper ballots are kept in several
*collections*, each one managed independently. A collection either has a cast
vote record for every ballot (`CVR`) or only aggregate tallies (`noCVR`).

The audit draws ballots from every collection, in a fixed random order, and
compares what the auditors read on each ballot with what was reported. After
each *stage*, the risk of every *measurement* (a contest with a risk limit and
an upset threshold) is estimated:

- if the risk is below the limit, the measurement has `Passed`
- if the risk is above the upset threshold, the measurement is `Upset` and a
  full hand count is called for
- if all the ballots of the contest have been drawn, the measurement is `Exhausted`
- otherwise it stays `Open`, and its collections grow by their audit rate.

The risk is the probability, under a Bayesian model of the unsampled ballots,
that the reported winners are not the actual winners.

## Selections and votes

A vote is the list of selections marked on one ballot for one contest. An
empty list is an undervote. In a plurality contest with `w` winners, a vote
with more than `w` distinct selections is an overvote and counts for nobody.

Selections starting with `+` are write-ins. Selections starting with `-` are
pseudo-selections used for errors and special cases:
- `-noCVR` is the reported vote of every ballot of a `noCVR` collection
- `-NoSuchContest` is the vote of a ballot that does not carry the contest
- `-Invalid` can be used for unreadable marks.

## Input formats

All the files are CSV files with a header row. Cells are trimmed. In the
files marked as *variable length*, the last column collects all the
remaining cells of the row; trailing empty cells are dropped.

### Contests (variable length)

```text
Contest id,Contest type,Winners,Write-ins,Selections
mayor,plurality,1,arbitrary,Alice,Bob,Carol
prop-1,plurality,1,no,Yes,No
```

The contest type is `plurality` or `irv`. IRV contests can be described but
not audited. The write-in policy is `no`, `qualified` or `arbitrary`. A write-in
in a contest with the `no` policy is reported as a warning.

### Collections (variable length)

```text
Collection id,Manager,CVR type,Contests
p1,Clerk of precinct 1,CVR,mayor,prop-1
p2,Clerk of precinct 2,noCVR,mayor
```

### Ballot manifests

```text
Collection id,Original index,Ballot id,Location,Number of ballots
p1,1,p1-b,box 1,10
p2,1,p2-1,box 2,
```

The `Number of ballots` column is optional. When it is filled, the row stands
for that many ballots, numbered `p1-b-1`, `p1-b-2`, and so on.

### Reported votes (variable length)

For collections with cast vote records, one row per ballot and contest:

```text
Collection id,Source,Ballot id,Contest,Selections
p1,L,p1-b-1,mayor,Alice
```

A ballot without a row for one of the contests of its collection is reported
as `-NoSuchContest`.

For collections without cast vote records, the third column is `Tally`:

```text
Collection id,Source,Tally,Contest,Selections
p2,L,4,mayor,Alice
p2,L,1,mayor,
```

The tallies of a contest must add up to the number of ballots of the collection.

### Reported outcomes (variable length)

```text
Contest id,Winner(s)
mayor,Alice
```

The winners are computed from the reported votes. A declared outcome that
differs from the computed one is reported as a warning.

### Audited votes (variable length)

Same format as the reported votes of collections with cast vote records. A
ballot is examined as soon as it has one row.

## Configuration

`multiaudit` reads a configuration file in JSON. The paths are relative to the
directory of the configuration file.

```text
{
  "electionName": "Example 1",
  "electionDate": "2017-11-07",
  "structure": { "contestsFile": "contests.csv", "collectionsFile": "collections.csv" },
  "manifestFiles": ["manifest.csv"],
  "reportedVotesFiles": ["reported-cvrs-p1.csv", "reported-nocvr-p2.csv"],
  "reportedOutcomesFile": "reported-outcomes.csv",
  "auditedVotesFiles": ["audited-votes.csv"],
  "audit": { "seed": 1234567890, "nTrials": 1000 },
  "measurements": [
    { "measurementId": "M1", "contestId": "mayor", "riskLimit": 0.05, "riskUpset": 0.98 }
  ],
  "auditRates": [ { "collectionId": "p1", "rate": 10 }, { "collectionId": "p2", "rate": 6 } ]
}
```

Options of `audit` (all optional):
- `seed` (default 1): the seed of all the random draws. The same seed and data always give the same audit.
- `nTrials` (default 100000): the number of simulated elections for each risk estimate.
- `pseudocountBase` (default 0.5): prior weight of a mismatch between reported and actual vote.
- `pseudocountMatch` (default 50): prior weight of a match between reported and actual vote,
  for ballots whose reported vote has not been sampled yet. Once `n` ballots with that
  reported vote have been audited, the weight is `pseudocountMatch / (1 + n)`, and never
  less than `pseudocountBase`.
- `maxStages` (default 20)
- `maxWarnings` (default 0): the number of warnings tolerated in the data.
- `shuffleBallots` (default true): draw the ballots in random order rather than manifest order.

Options of a measurement:
- `riskMethod` (optional): only `Bayes` is supported.
- `samplingMode` (optional): `Active` (default) or `Opportunistic`. Opportunistic
  measurements do not ask for more ballots.
- `initialStatus` (optional): `Open` (default) or `Off`.

## Output

The summary lists every stage (sample sizes, plan for the next stage, risk and
status of every measurement) and the final result. The `--reference` option
compares the summary with a previous one and prints the differences.

 */
