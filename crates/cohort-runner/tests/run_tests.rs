//! Full runs over a temporary claims directory.

use std::fs;
use std::path::Path;

use cohort_runner::{run, Args, RunError};

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn fixture(dir: &Path) {
    write(
        dir,
        "claims_entries.csv",
        "claim_entry_id,member_id_hash,date_of_service,claim_type\n\
         CE1,M1,2023-01-01,medical\n\
         CE2,M1,2023-02-15,medical\n\
         CE3,M2,2023-01-01,medical\n\
         CE4,M2,2023-03-01,medical\n",
    );
    write(
        dir,
        "claims_diagnoses.csv",
        "claim_entry_id,icd_code\nCE1,E28.2\nCE2,E28.2\nCE3,I10\nCE4,I10\n",
    );
    write(dir, "claims_procedures.csv", "claim_entry_id,proc_code\n");
    write(dir, "claims_drugs.csv", "claim_entry_id,product_service_name\n");
    write(dir, "members.csv", "member_id_hash,gender\nM1,F\nM2,M\n");
    write(
        dir,
        "cohorts.yaml",
        r#"
cohorts:
  PCOS:
    inclusion:
      icd_codes: ["E28.2"]
  HTN_Conservative:
    inclusion:
      icd_codes: ["I10.*"]
      min_claims: 2
      min_days_between_claims: 30
  IBS:
    inclusion:
      icd_codes: ["K58.*"]
"#,
    );
}

fn args(dir: &Path, cohorts: &[&str], keep_going: bool) -> Args {
    Args {
        data_dir: dir.to_path_buf(),
        criteria: dir.join("cohorts.yaml"),
        cohorts: cohorts.iter().map(|c| c.to_string()).collect(),
        output_dir: Some(dir.join("out")),
        combined_only: false,
        keep_going,
        delimiter: ',',
        reference_date: None,
        sequential_load: true,
    }
}

#[test]
fn test_run_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    let summary = run(&args(dir.path(), &["PCOS", "HTN_Conservative"], false)).unwrap();
    assert_eq!(summary.built, vec!["PCOS", "HTN_Conservative"]);
    assert_eq!(summary.combined_rows, 2);

    let out = dir.path().join("out");
    assert!(out.join("PCOS.csv").exists());
    assert!(out.join("HTN_Conservative_metadata.json").exists());
    let combined = fs::read_to_string(out.join("combined_cohorts.csv")).unwrap();
    assert_eq!(
        combined,
        "member_id,index_date,gender,cohort\n\
         M1,2023-02-15,F,PCOS\n\
         M2,2023-03-01,M,HTN_Conservative\n"
    );
}

#[test]
fn test_failed_cohort_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    // IBS routes to the generic strategy, which needs min_claims
    let err = run(&args(dir.path(), &[], false)).unwrap_err();
    assert!(matches!(err, RunError::Engine(_)));
    assert!(err.to_string().contains("IBS"));
}

#[test]
fn test_keep_going_skips_failed_cohort() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    let summary = run(&args(dir.path(), &[], true)).unwrap();
    assert_eq!(summary.built, vec!["PCOS", "HTN_Conservative"]);
    assert_eq!(summary.failed, vec!["IBS"]);
    assert!(!dir.path().join("out").join("IBS.csv").exists());
}

#[test]
fn test_missing_table_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());
    fs::remove_file(dir.path().join("members.csv")).unwrap();

    let err = run(&args(dir.path(), &["PCOS"], false)).unwrap_err();
    assert!(err.to_string().contains("members"));
}
