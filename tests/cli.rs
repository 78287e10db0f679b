use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CSV: &str = "\
Data Captação,Cod Assessor,Cod Cliente,Tipo,Aux,Valor,Data Atualização,Tipo Pessoa
15/03/2024,A001,C500,APORTE,X,1000.50,16/03/2024,PF
15/03/2024,A001,C501,RESGATE,X,-250.00,16/03/2024,PJ
";

fn capta(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("capta").unwrap();
    // settings live under $HOME/.config/capta
    cmd.env("HOME", home);
    cmd
}

fn setup(home: &Path) {
    let data_dir = home.join("capta-data");
    capta(home)
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized database"));
}

#[test]
fn ingest_then_reingest_is_idempotent() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("captacoes.csv");
    std::fs::write(&csv_path, CSV).unwrap();

    capta(home.path())
        .args(["ingest", "--yes"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted:           2"))
        .stdout(predicate::str::contains("Duplicates ignored: 0"));

    capta(home.path())
        .args(["ingest", "--yes"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted:           0"))
        .stdout(predicate::str::contains("Duplicates ignored: 2"));
}

#[test]
fn dry_run_writes_nothing() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("captacoes.csv");
    std::fs::write(&csv_path, CSV).unwrap();

    capta(home.path())
        .args(["ingest", "--dry-run", "--yes"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));

    // a real run still inserts both rows afterwards
    capta(home.path())
        .args(["ingest", "--yes"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted:           2"));
}

#[test]
fn mapping_preview_reports_unmapped_required_fields() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("partial.csv");
    std::fs::write(&csv_path, "Data Captação,Valor\n15/03/2024,10\n").unwrap();

    capta(home.path())
        .arg("mapping")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("data_captacao"))
        .stdout(predicate::str::contains("Unmapped required fields"));
}

#[test]
fn ingest_fails_on_incomplete_mapping() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("partial.csv");
    std::fs::write(&csv_path, "Data Captação,Valor\n15/03/2024,10\n").unwrap();

    capta(home.path())
        .args(["ingest", "--yes"])
        .arg(&csv_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Required fields without a mapped column"));
}

#[test]
fn manual_map_flag_completes_the_mapping() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("renamed.csv");
    std::fs::write(
        &csv_path,
        "Quando,Cod Assessor,Cod Cliente,Tipo,Aux,Valor,Data Atualização,Tipo Pessoa\n\
         15/03/2024,A001,C500,APORTE,X,1000.50,16/03/2024,PF\n",
    )
    .unwrap();

    capta(home.path())
        .args(["ingest", "--yes", "--map", "Quando=data_captacao"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted:           1"));
}

#[test]
fn status_reports_row_count() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("captacoes.csv");
    std::fs::write(&csv_path, CSV).unwrap();
    capta(home.path()).args(["ingest", "--yes"]).arg(&csv_path).assert().success();

    capta(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Captações:  2"));
}

#[test]
fn empty_workbook_is_a_blocking_error() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv_path = home.path().join("empty.csv");
    std::fs::write(&csv_path, "Data Captação,Valor\n").unwrap();

    capta(home.path())
        .args(["ingest", "--yes"])
        .arg(&csv_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data rows"));
}
