use std::fs::File;
use std::io::Write;

use rstest::rstest;
use spinloop_config::{ProfileRow, load_reference_csv};
use tempfile::tempdir;

fn write_csv(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_valid_profile() {
    let (_dir, path) = write_csv("t_ms,rpm\n0,500\n2000, 1500\n5000,-800\n");
    let rows = load_reference_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            ProfileRow { t_ms: 0, rpm: 500 },
            ProfileRow {
                t_ms: 2000,
                rpm: 1500
            },
            ProfileRow {
                t_ms: 5000,
                rpm: -800
            },
        ]
    );
}

#[rstest]
#[case("time,rpm\n0,1\n", "headers 't_ms,rpm'")]
#[case("t_ms,rpm\n0,1\n0,2\n", "strictly increasing")]
#[case("t_ms,rpm\n10,1\n5,2\n", "strictly increasing")]
#[case("t_ms,rpm\n0,fast\n", "invalid CSV row 2")]
#[case("t_ms,rpm\n", "no rows")]
fn rejects_bad_profiles(#[case] body: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(body);
    let err = load_reference_csv(&path).unwrap_err();
    assert!(format!("{err}").contains(needle), "{err}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_reference_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{err}").contains("open reference CSV"));
}
