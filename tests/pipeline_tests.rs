use darshan_agg::aggregator::ModuleCollection;
use darshan_agg::commands::{aggregate_with, AggregateArgs};
use darshan_agg::reader::schema::{CounterRecord, DxtRecord, JobInfo, Segment};
use darshan_agg::reader::{
    read_log, DarshanUtil, JobMetadata, Loader, MemoryLibrary, MemoryReport, ModuleRecords,
    ReadOptions,
};
use darshan_agg::utils::error::{AggregateError, OutputError, ReadError, ScanError};
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::path::Path;

fn metadata(uid: i64, jobid: i64) -> JobMetadata {
    JobMetadata {
        job: JobInfo {
            uid,
            jobid,
            nprocs: 2,
            run_time: 3.5,
            log_ver: "3.41".to_string(),
            ..Default::default()
        },
        exe: "/apps/ior -w".to_string(),
    }
}

fn counter_record(rank: i64, id: u64, with_floats: bool) -> CounterRecord {
    CounterRecord {
        rank,
        id,
        counters: [("OPENS", 1), ("READS", 4)].into_iter().collect(),
        fcounters: with_floats.then(|| [("F_READ_TIME", 0.5)].into_iter().collect()),
    }
}

fn dxt_record(id: u64, rank: i64) -> DxtRecord {
    DxtRecord {
        id,
        rank,
        hostname: "nid0001".to_string(),
        write_count: 1,
        read_count: 0,
        read_segments: vec![],
        write_segments: vec![Segment {
            offset: 0,
            length: 4096,
            start_time: 0.01,
            end_time: 0.02,
        }],
    }
}

fn posix_lustre_report(uid: i64, jobid: i64) -> MemoryReport {
    MemoryReport::new(metadata(uid, jobid))
        .with_module(
            "POSIX",
            ModuleRecords::Counters(vec![counter_record(0, 7, true)]),
        )
        .with_module(
            "LUSTRE",
            ModuleRecords::Counters(vec![counter_record(0, 7, false)]),
        )
}

/// Create an (empty) log file on disk and register its report
fn add_log(library: &mut MemoryLibrary, dir: &Path, name: &str, report: MemoryReport) {
    let path = dir.join(name);
    File::create(&path).unwrap();
    library.insert(path, report);
}

fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn args(input: &Path, output: &Path) -> AggregateArgs {
    AggregateArgs {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_posix_and_lustre() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("parquet");

    let mut library = MemoryLibrary::new();
    add_log(&mut library, input.path(), "job.darshan", posix_lustre_report(1001, 42));
    File::create(input.path().join("job2.darshan_partial")).unwrap();
    File::create(input.path().join("notes.txt")).unwrap();

    let summary = aggregate_with(&library, &args(input.path(), &out_dir)).unwrap();

    assert_eq!(summary.metadata_path, out_dir.join("metadata.parquet"));
    assert_eq!(summary.record_files.len(), 3);
    assert_eq!(
        sorted_file_names(&out_dir),
        vec![
            "LUSTRE_1001_42_0_7_counters.parquet",
            "POSIX_1001_42_0_7_counters.parquet",
            "POSIX_1001_42_0_7_fcounters.parquet",
            "metadata.parquet",
        ]
    );
}

#[test]
fn test_end_to_end_with_dxt() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let report = posix_lustre_report(5, 9).with_module(
        "DXT_POSIX",
        ModuleRecords::Dxt(vec![dxt_record(77, 0), dxt_record(78, 1)]),
    );
    let mut library = MemoryLibrary::new();
    add_log(&mut library, input.path(), "job.darshan", report);

    let summary = aggregate_with(&library, &args(input.path(), output.path())).unwrap();

    // 3 counter files + 2 records x (read, write)
    assert_eq!(summary.record_files.len(), 7);
    assert!(output
        .path()
        .join("DXTPOSIX_5_9_78_1_nid0001_write_segments.parquet")
        .exists());
}

#[test]
fn test_skip_dxt() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let report = posix_lustre_report(5, 9)
        .with_module("DXT_POSIX", ModuleRecords::Dxt(vec![dxt_record(77, 0)]));
    let mut library = MemoryLibrary::new();
    add_log(&mut library, input.path(), "job.darshan", report);

    let mut args = args(input.path(), output.path());
    args.skip_dxt = true;
    let summary = aggregate_with(&library, &args).unwrap();

    assert_eq!(summary.record_files.len(), 3);
    assert!(!library.load_calls().iter().any(|(m, _)| m == "DXT_POSIX"));
}

#[test]
fn test_duplicate_job_names_fail() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("never");

    let mut library = MemoryLibrary::new();
    add_log(&mut library, input.path(), "a.darshan", posix_lustre_report(1, 2));
    add_log(&mut library, input.path(), "b.darshan", posix_lustre_report(1, 2));

    let err = aggregate_with(&library, &args(input.path(), &out_dir)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AggregateError>(),
        Some(AggregateError::DuplicateKey(name)) if name == "1_2"
    ));
    // Nothing is written before the whole batch has been read
    assert!(!out_dir.exists());
}

#[test]
fn test_output_path_is_file() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::NamedTempFile::new().unwrap();

    let mut library = MemoryLibrary::new();
    add_log(&mut library, input.path(), "job.darshan", posix_lustre_report(1, 2));

    let err = aggregate_with(&library, &args(input.path(), output.path())).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<OutputError>(),
        Some(OutputError::InvalidDirectory { .. })
    ));
}

#[test]
fn test_missing_input_directory() {
    let input = tempfile::tempdir().unwrap();
    let library = MemoryLibrary::new();

    let err =
        aggregate_with(&library, &args(&input.path().join("nope"), input.path())).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ScanError>(),
        Some(ScanError::InvalidDirectory { .. })
    ));
}

#[test]
fn test_read_log_invalid_paths() {
    let dir = tempfile::tempdir().unwrap();
    let library = MemoryLibrary::new();

    let missing = read_log(&library, dir.path().join("gone.darshan"), ReadOptions::default());
    assert!(matches!(missing, Err(ReadError::InvalidPath { .. })));

    let directory = read_log(&library, dir.path(), ReadOptions::default());
    assert!(matches!(directory, Err(ReadError::InvalidPath { .. })));
}

#[test]
fn test_read_log_module_handling() {
    let dir = tempfile::tempdir().unwrap();
    let report = MemoryReport::new(metadata(3, 4))
        .with_module(
            "STDIO",
            ModuleRecords::Counters(vec![counter_record(0, 1, true)]),
        )
        .with_module(
            "HEATMAP",
            ModuleRecords::Counters(vec![counter_record(0, 2, false)]),
        )
        .with_module(
            "MPI-IO",
            ModuleRecords::Counters(vec![counter_record(0, 3, true)]),
        )
        .with_module(
            "HDF5",
            ModuleRecords::Counters(vec![counter_record(0, 4, false)]),
        );
    let mut library = MemoryLibrary::new();
    add_log(&mut library, dir.path(), "job.darshan", report);

    let record = read_log(&library, dir.path().join("job.darshan"), ReadOptions::default()).unwrap();

    assert_eq!(record.modules(), &["STDIO", "HEATMAP", "MPI-IO", "HDF5"]);
    assert_eq!(record.loaded_modules(), vec!["STDIO"]);
    assert_eq!(record.generate_name(), "3_4");
    assert_eq!(
        library.load_calls(),
        vec![
            ("STDIO".to_string(), Loader::Counters),
            ("MPI-IO".to_string(), Loader::Counters),
        ]
    );

    match record.collection("STDIO") {
        Some(ModuleCollection::Counters(c)) => assert!(c.has_fcounters()),
        other => panic!("unexpected collection: {:?}", other),
    }
}

#[test]
fn test_read_log_lustre_uses_its_own_loader() {
    let dir = tempfile::tempdir().unwrap();
    let mut library = MemoryLibrary::new();
    add_log(&mut library, dir.path(), "job.darshan", posix_lustre_report(1, 1));

    read_log(&library, dir.path().join("job.darshan"), ReadOptions::default()).unwrap();

    assert_eq!(
        library.load_calls(),
        vec![
            ("POSIX".to_string(), Loader::Counters),
            ("LUSTRE".to_string(), Loader::Lustre),
        ]
    );
}

#[test]
fn test_read_log_duplicate_dxt_id() {
    let dir = tempfile::tempdir().unwrap();
    let report = MemoryReport::new(metadata(1, 1)).with_module(
        "DXT_POSIX",
        ModuleRecords::Dxt(vec![dxt_record(5, 0), dxt_record(5, 1)]),
    );
    let mut library = MemoryLibrary::new();
    add_log(&mut library, dir.path(), "job.darshan", report);

    let result = read_log(&library, dir.path().join("job.darshan"), ReadOptions::default());

    assert!(matches!(
        result,
        Err(ReadError::Aggregate(AggregateError::DuplicateIdentity { id: 5, .. }))
    ));
}

#[test]
fn test_read_log_inspects_dxt_mpiio() {
    let dir = tempfile::tempdir().unwrap();
    let report = MemoryReport::new(metadata(1, 1))
        .with_module(
            "POSIX",
            ModuleRecords::Counters(vec![counter_record(0, 7, true)]),
        )
        .with_module("DXT_MPIIO", ModuleRecords::Dxt(vec![dxt_record(9, 0)]));
    let mut library = MemoryLibrary::new();
    add_log(&mut library, dir.path(), "job.darshan", report);

    let record = read_log(&library, dir.path().join("job.darshan"), ReadOptions::default()).unwrap();

    assert_eq!(record.loaded_modules(), vec!["POSIX"]);
    assert_eq!(
        library.load_calls(),
        vec![
            ("POSIX".to_string(), Loader::Counters),
            ("DXT_MPIIO".to_string(), Loader::Dxt),
        ]
    );
}

const MPIIO_LOG: &str = "\
# darshan log version: 3.41
# exe: /apps/ior
# uid: 7
# jobid: 99
# nprocs: 1
# POSIX module: 10 bytes (compressed), ver=4
# MPI-IO module: 10 bytes (compressed), ver=3
# DXT_MPIIO module: 10 bytes (compressed), ver=1

# POSIX module data
POSIX\t0\t11\tPOSIX_OPENS\t1\t/f\t/\text4
POSIX\t0\t11\tPOSIX_F_READ_TIME\t0.5\t/f\t/\text4

# MPI-IO module data
MPI-IO\t0\tnot-an-id\tMPIIO_INDEP_OPENS\t1\t/f\t/\text4

# DXT_MPIIO module data
# DXT, file_id: 11, file_name: /f
# DXT, rank: 0, hostname: nid0001
# DXT, write_count: 1, read_count: 0
# Module    Rank  Wt/Rd  Segment          Length    Start(s)      End(s)
 X_MPIIO       0  write        0       262144      0.0020      0.0040
";

/// `cat` plays both darshan-util tools over a log holding both dumps
#[cfg(unix)]
#[test]
fn test_read_log_survives_broken_mpiio() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.darshan");
    fs::write(&path, MPIIO_LOG).unwrap();

    let library = DarshanUtil::new("cat", "cat");
    let record = read_log(&library, &path, ReadOptions::default()).unwrap();

    assert_eq!(record.modules(), &["POSIX", "MPI-IO", "DXT_MPIIO"]);
    assert_eq!(record.loaded_modules(), vec!["POSIX"]);
    assert_eq!(record.generate_name(), "7_99");
}
