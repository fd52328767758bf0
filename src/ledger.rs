// src/ledger.rs

//! Result ledger
//!
//! One line per adjudicated experiment, three tab-separated fields and a
//! trailing newline:
//!
//! ```text
//! 4.0.1	3.1.4	PASS
//! 4.0.1	4.0.1	FAIL
//! ```
//!
//! The ledger is append-only. Re-running a sweep against the same file skips
//! every (host, container) pair already recorded, see [`prune`].

use crate::error::{Error, Result};
use crate::experiment::Experiment;
use fs2::FileExt;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome token stored in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }

    /// Parse a ledger token; case-sensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PASS" => Some(Self::Pass),
            "FAIL" => Some(Self::Fail),
            _ => None,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded experiment result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub host_version: String,
    pub container_version: String,
    pub verdict: Verdict,
}

impl ResultRecord {
    pub fn new(
        host_version: impl Into<String>,
        container_version: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            host_version: host_version.into(),
            container_version: container_version.into(),
            verdict,
        }
    }

    /// Record for an experiment with the given verdict
    pub fn for_experiment(experiment: &Experiment, verdict: Verdict) -> Self {
        Self::new(&experiment.host_version, &experiment.container_version, verdict)
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.host_version, &self.container_version)
    }

    /// Ledger line, including the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\n",
            self.host_version, self.container_version, self.verdict
        )
    }

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(format!("expected 3 tab-separated fields, found {}", fields.len()));
        }
        let verdict = Verdict::parse(fields[2])
            .ok_or_else(|| format!("result must be PASS or FAIL, found {:?}", fields[2]))?;
        Ok(Self::new(fields[0], fields[1], verdict))
    }
}

/// The ordered records of one ledger file
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    records: Vec<ResultRecord>,
}

impl Ledger {
    /// Load a ledger; a missing file is an empty ledger
    ///
    /// Any malformed line fails the whole load.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
                String::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = ResultRecord::parse_line(line).map_err(|reason| Error::LedgerParse {
                path: path.clone(),
                line: idx + 1,
                reason,
            })?;
            records.push(record);
        }

        debug!("Loaded {} results from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a (host, container) pair has a recorded result
    pub fn contains(&self, host_version: &str, container_version: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.key() == (host_version, container_version))
    }

    /// Append a record to the file and to the in-memory list
    ///
    /// The write holds an exclusive lock on the ledger file so that separate
    /// processes sharing an output file do not interleave lines.
    pub fn append(&mut self, record: ResultRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive().map_err(|e| {
            Error::IoError(format!("Failed to lock ledger {}: {}", self.path.display(), e))
        })?;

        let written = file
            .write_all(record.to_line().as_bytes())
            .and_then(|()| file.flush());
        let _ = file.unlock();
        written?;

        info!(
            "Recorded {}\t{}\t{} in {}",
            record.host_version,
            record.container_version,
            record.verdict,
            self.path.display()
        );
        self.records.push(record);
        Ok(())
    }
}

/// Experiments whose (host, container) pair has no recorded result, in input order
pub fn prune(experiments: &[Experiment], records: &[ResultRecord]) -> Vec<Experiment> {
    experiments
        .iter()
        .filter(|e| !records.iter().any(|r| r.key() == e.key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ImplementationId;

    fn experiment(host: &str, container: &str) -> Experiment {
        Experiment::new(
            ImplementationId::OpenMpi,
            host,
            format!("https://example.org/openmpi-{}.tar.bz2", host),
            container,
            format!("https://example.org/openmpi-{}.tar.bz2", container),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("results.txt")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_append_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(ResultRecord::new("4.0.1", "4.0.1", Verdict::Pass)).unwrap();
        ledger.append(ResultRecord::new("4.0.1", "3.1.4", Verdict::Fail)).unwrap();
        ledger.append(ResultRecord::new("3.1.4", "4.0.1", Verdict::Pass)).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "4.0.1\t4.0.1\tPASS\n4.0.1\t3.1.4\tFAIL\n3.1.4\t4.0.1\tPASS\n"
        );

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.records(), ledger.records());
        assert!(reloaded.contains("4.0.1", "3.1.4"));
        assert!(!reloaded.contains("3.1.4", "3.1.4"));
    }

    #[test]
    fn test_load_rejects_short_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "4.0.1\t4.0.1\tPASS\n4.0.1\t3.1.4\n").unwrap();

        match Ledger::load(&path) {
            Err(Error::LedgerParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_unknown_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "4.0.1\t4.0.1\tpass\n").unwrap();
        assert!(matches!(Ledger::load(&path), Err(Error::LedgerParse { line: 1, .. })));
    }

    #[test]
    fn test_load_skips_blank_lines_and_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "\n4.0.1\t4.0.1\tPASS\tnote\n\n").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.records(), &[ResultRecord::new("4.0.1", "4.0.1", Verdict::Pass)]);
    }

    #[test]
    fn test_prune_is_stable() {
        let experiments = vec![
            experiment("4.0.1", "4.0.1"),
            experiment("4.0.1", "3.1.4"),
            experiment("3.1.4", "4.0.1"),
            experiment("3.1.4", "3.1.4"),
        ];
        let records = vec![
            ResultRecord::new("3.1.4", "4.0.1", Verdict::Fail),
            ResultRecord::new("4.0.1", "4.0.1", Verdict::Pass),
        ];

        let remaining = prune(&experiments, &records);
        assert_eq!(remaining, vec![experiments[1].clone(), experiments[3].clone()]);
        assert_eq!(prune(&experiments, &[]), experiments);
    }

    #[test]
    fn test_verdict_tokens() {
        assert_eq!(Verdict::parse("PASS"), Some(Verdict::Pass));
        assert_eq!(Verdict::parse("FAIL"), Some(Verdict::Fail));
        assert_eq!(Verdict::parse("Fail"), None);
        assert_eq!(Verdict::Pass.to_string(), "PASS");
    }
}
