//! darshan-util backed trace library.
//!
//! Logs are decoded by the darshan-util command line tools:
//! `darshan-parser` dumps the job header and every aggregate module as
//! tab-separated counter lines, `darshan-dxt-parser` dumps the DXT
//! segment traces. Opening a log runs `darshan-parser` once and parses
//! only the header; module bodies stay as raw lines until loaded.

use super::library::{Loader, TraceLibrary, TraceReport};
use super::schema::{CounterRecord, CounterTable, DxtRecord, JobMetadata, ModuleRecords, Segment};
use crate::utils::config::FLOAT_COUNTER_MARKER;
use crate::utils::error::ReadError;
use log::debug;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Raw data line with its 1-based position in the tool output
pub type BodyLine = (usize, String);

/// Trace library driving the darshan-util tools
#[derive(Debug, Clone)]
pub struct DarshanUtil {
    parser: String,
    dxt_parser: String,
}

impl DarshanUtil {
    pub fn new(parser: impl Into<String>, dxt_parser: impl Into<String>) -> Self {
        Self {
            parser: parser.into(),
            dxt_parser: dxt_parser.into(),
        }
    }
}

impl TraceLibrary for DarshanUtil {
    type Report = DarshanUtilReport;

    fn open(&self, path: &Path) -> Result<DarshanUtilReport, ReadError> {
        let output = run_tool(&self.parser, path)?;
        let dump = parse_parser_output(&output)?;

        debug!(
            "{} decoded header of {}: {} modules",
            self.parser,
            path.display(),
            dump.modules.len()
        );

        Ok(DarshanUtilReport {
            path: path.to_path_buf(),
            dxt_parser: self.dxt_parser.clone(),
            metadata: dump.metadata,
            modules: dump.modules,
            body: dump.body,
            records: HashMap::new(),
        })
    }
}

/// A log opened through darshan-util
#[derive(Debug)]
pub struct DarshanUtilReport {
    path: PathBuf,
    dxt_parser: String,
    metadata: JobMetadata,
    modules: Vec<String>,
    body: HashMap<String, Vec<BodyLine>>,
    records: HashMap<String, ModuleRecords>,
}

impl TraceReport for DarshanUtilReport {
    fn metadata(&self) -> &JobMetadata {
        &self.metadata
    }

    fn modules(&self) -> &[String] {
        &self.modules
    }

    fn load(&mut self, module: &str, loader: Loader) -> Result<(), ReadError> {
        if self.records.contains_key(module) {
            return Ok(());
        }

        if !self.modules.iter().any(|m| m == module) {
            return Err(ReadError::ModuleNotFound(module.to_string()));
        }

        let records = match loader {
            Loader::Counters | Loader::Lustre => {
                let lines = self.body.remove(module).unwrap_or_default();
                ModuleRecords::Counters(parse_counter_lines(module, &lines, loader)?)
            }
            Loader::Dxt => {
                let output = run_tool(&self.dxt_parser, &self.path)?;
                ModuleRecords::Dxt(parse_dxt_output(&output, module)?)
            }
        };

        debug!("Loaded {} {} records", records.len(), module);
        self.records.insert(module.to_string(), records);

        Ok(())
    }

    fn records(&self, module: &str) -> Option<&ModuleRecords> {
        self.records.get(module)
    }
}

/// Run a darshan-util tool on one log and capture its stdout
///
/// **Private** - internal helper for open/load
fn run_tool(tool: &str, path: &Path) -> Result<String, ReadError> {
    debug!("Running {} {}", tool, path.display());

    let output = Command::new(tool)
        .arg(path)
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ReadError::ToolNotFound(tool.to_string()),
            _ => ReadError::Spawn {
                tool: tool.to_string(),
                source: e,
            },
        })?;

    if !output.status.success() {
        return Err(ReadError::ToolFailed {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Header and raw module bodies of a `darshan-parser` dump
#[derive(Debug, Clone, Default)]
pub struct ParserDump {
    pub metadata: JobMetadata,

    /// Modules listed in the "log file regions" section, in log order
    pub modules: Vec<String>,

    body: HashMap<String, Vec<BodyLine>>,
}

/// Parse the text output of `darshan-parser`
///
/// **Public** - exposed so dumps produced elsewhere can be decoded
///
/// # Errors
/// * `ReadError::Malformed` - a header value does not parse
/// * `ReadError::MissingField` - `uid` or `jobid` is absent
pub fn parse_parser_output(text: &str) -> Result<ParserDump, ReadError> {
    let mut dump = ParserDump::default();
    let mut seen_uid = false;
    let mut seen_jobid = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let Some((key, value)) = comment.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            let job = &mut dump.metadata.job;

            match key {
                "darshan log version" => job.log_ver = value.to_string(),
                "exe" => dump.metadata.exe = value.to_string(),
                "uid" => {
                    job.uid = parse_int(value, line_no)?;
                    seen_uid = true;
                }
                "jobid" => {
                    job.jobid = parse_int(value, line_no)?;
                    seen_jobid = true;
                }
                "start_time" => {
                    (job.start_time_sec, job.start_time_nsec) = parse_timestamp(value, line_no)?
                }
                "end_time" => {
                    (job.end_time_sec, job.end_time_nsec) = parse_timestamp(value, line_no)?
                }
                "start_time_sec" => job.start_time_sec = parse_int(value, line_no)?,
                "start_time_nsec" => job.start_time_nsec = parse_int(value, line_no)?,
                "end_time_sec" => job.end_time_sec = parse_int(value, line_no)?,
                "end_time_nsec" => job.end_time_nsec = parse_int(value, line_no)?,
                "nprocs" => job.nprocs = parse_int(value, line_no)?,
                "run time" => job.run_time = parse_float(value, line_no)?,
                "metadata" => {
                    let (k, v) = value.split_once('=').unwrap_or((value, ""));
                    job.metadata.insert(k.trim().to_string(), v.trim().to_string());
                }
                _ => {
                    if let Some(module) = key.strip_suffix(" module") {
                        if !module.is_empty() && !dump.modules.iter().any(|m| m == module) {
                            dump.modules.push(module.to_string());
                        }
                    }
                }
            }
            continue;
        }

        let module = split_fields(line)[0].to_string();
        dump.body
            .entry(module)
            .or_default()
            .push((line_no, line.to_string()));
    }

    if !seen_uid {
        return Err(ReadError::MissingField("uid"));
    }
    if !seen_jobid {
        return Err(ReadError::MissingField("jobid"));
    }

    Ok(dump)
}

/// Parse counter lines of one module into per-(rank, id) records
///
/// Lines look like `POSIX\t<rank>\t<record id>\t<counter>\t<value>\t<file>\t<mnt>\t<fs>`.
/// With `Loader::Counters` counters named `<MODULE>_F_*` go to the float
/// table; `Loader::Lustre` treats every counter as an integer.
pub fn parse_counter_lines(
    module: &str,
    lines: &[BodyLine],
    loader: Loader,
) -> Result<Vec<CounterRecord>, ReadError> {
    let with_floats = loader == Loader::Counters;
    let mut order: Vec<(i64, u64)> = Vec::new();
    let mut by_key: HashMap<(i64, u64), CounterRecord> = HashMap::new();

    for (line_no, line) in lines {
        let line_no = *line_no;
        let fields = split_fields(line);

        if fields.len() < 5 {
            return Err(ReadError::Malformed {
                line: line_no,
                reason: format!("expected at least 5 fields for {} counter", module),
            });
        }

        let rank: i64 = parse_int(fields[1], line_no)?;
        let id: u64 = fields[2].parse().map_err(|_| ReadError::Malformed {
            line: line_no,
            reason: format!("invalid record id '{}'", fields[2]),
        })?;
        let (name, value) = (fields[3], fields[4]);

        let record = by_key.entry((rank, id)).or_insert_with(|| {
            order.push((rank, id));
            CounterRecord {
                rank,
                id,
                counters: CounterTable::new(),
                fcounters: with_floats.then(CounterTable::new),
            }
        });

        match record.fcounters.as_mut() {
            Some(fcounters) if name.contains(FLOAT_COUNTER_MARKER) => {
                fcounters.push(name, parse_float(value, line_no)?);
            }
            _ => record.counters.push(name, parse_int(value, line_no)?),
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect())
}

/// Parse the text output of `darshan-dxt-parser`, keeping records of `module`
///
/// Each record starts with a `# DXT, file_id: ...` block followed by one
/// line per traced operation:
/// ` X_POSIX  <rank>  write|read  <segment>  <offset>  <length>  <start>  <end>`
/// Lines without the offset column get offset 0.
pub fn parse_dxt_output(text: &str, module: &str) -> Result<Vec<DxtRecord>, ReadError> {
    let mut records = Vec::new();
    let mut section: Option<String> = None;
    let mut current: Option<DxtRecord> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();

            if let Some(name) = comment.strip_suffix(" module data") {
                records.extend(current.take());
                section = Some(name.trim().to_string());
                continue;
            }

            let Some(pairs) = comment.strip_prefix("DXT,") else {
                continue;
            };
            let in_module = section.as_deref().map_or(true, |s| s == module);

            for (key, value) in dxt_pairs(pairs) {
                match key {
                    "file_id" => {
                        records.extend(current.take());
                        if in_module {
                            current = Some(DxtRecord {
                                id: value.parse().map_err(|_| ReadError::Malformed {
                                    line: line_no,
                                    reason: format!("invalid file_id '{}'", value),
                                })?,
                                rank: 0,
                                hostname: String::new(),
                                write_count: 0,
                                read_count: 0,
                                read_segments: Vec::new(),
                                write_segments: Vec::new(),
                            });
                        }
                    }
                    "rank" => {
                        if let Some(rec) = current.as_mut() {
                            rec.rank = parse_int(value, line_no)?;
                        }
                    }
                    "hostname" => {
                        if let Some(rec) = current.as_mut() {
                            rec.hostname = value.to_string();
                        }
                    }
                    "write_count" => {
                        if let Some(rec) = current.as_mut() {
                            rec.write_count = parse_int(value, line_no)?;
                        }
                    }
                    "read_count" => {
                        if let Some(rec) = current.as_mut() {
                            rec.read_count = parse_int(value, line_no)?;
                        }
                    }
                    _ => {}
                }
            }
            continue;
        }

        // Segment lines of other modules are skipped along with their records
        let Some(rec) = current.as_mut() else {
            if section.as_deref().map_or(true, |s| s == module) {
                return Err(ReadError::Malformed {
                    line: line_no,
                    reason: "segment line outside of a DXT record".to_string(),
                });
            }
            continue;
        };

        let fields: Vec<&str> = line.split_whitespace().collect();

        // MPIIO dumps may omit the Offset column
        let segment = match fields.len() {
            7 => Segment {
                offset: 0,
                length: parse_int(fields[4], line_no)?,
                start_time: parse_float(fields[5], line_no)?,
                end_time: parse_float(fields[6], line_no)?,
            },
            n if n >= 8 => Segment {
                offset: parse_int(fields[4], line_no)?,
                length: parse_int(fields[5], line_no)?,
                start_time: parse_float(fields[6], line_no)?,
                end_time: parse_float(fields[7], line_no)?,
            },
            _ => {
                return Err(ReadError::Malformed {
                    line: line_no,
                    reason: "expected 7 or 8 fields for a DXT segment".to_string(),
                })
            }
        };

        match fields[2] {
            "read" => rec.read_segments.push(segment),
            "write" => rec.write_segments.push(segment),
            other => {
                return Err(ReadError::Malformed {
                    line: line_no,
                    reason: format!("unknown operation '{}'", other),
                })
            }
        }
    }

    records.extend(current.take());
    Ok(records)
}

/// Split `key: value, key: value` pairs of a DXT header line
///
/// **Private** - internal helper for parse_dxt_output
fn dxt_pairs(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split(", ")
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
}

/// Split a data line on tabs, falling back to whitespace for hand-edited dumps
///
/// **Private** - file names may contain spaces, so tabs win when present
fn split_fields(line: &str) -> Vec<&str> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() >= 5 {
        fields
    } else {
        line.split_whitespace().collect()
    }
}

fn parse_int(value: &str, line: usize) -> Result<i64, ReadError> {
    value.trim().parse().map_err(|_| ReadError::Malformed {
        line,
        reason: format!("invalid integer '{}'", value),
    })
}

fn parse_float(value: &str, line: usize) -> Result<f64, ReadError> {
    value.trim().parse().map_err(|_| ReadError::Malformed {
        line,
        reason: format!("invalid number '{}'", value),
    })
}

/// Split `1620000000.25` into seconds and nanoseconds
///
/// **Private** - internal helper for header parsing
fn parse_timestamp(value: &str, line: usize) -> Result<(i64, i64), ReadError> {
    let (secs, frac) = value.trim().split_once('.').unwrap_or((value.trim(), ""));
    let sec = parse_int(secs, line)?;

    if frac.is_empty() {
        return Ok((sec, 0));
    }

    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReadError::Malformed {
            line,
            reason: format!("invalid timestamp '{}'", value),
        });
    }

    let digits: String = frac.chars().take(9).collect();
    let nsec = parse_int(&format!("{:0<9}", digits), line)?;

    Ok((sec, nsec))
}
