use super::*;
use chrono::TimeZone;

fn sample() -> Table {
    let mut table = Table::new(["Repository", "Owner"]);
    table.push_row(["widgets", "alice"]);
    table.push_row(["gadgets"]);
    table
}

#[test]
fn test_push_row_pads_and_truncates() {
    let mut table = sample();
    table.push_row(["a", "b", "c"]);

    assert_eq!(table.rows()[1], vec!["gadgets", ""]);
    assert_eq!(table.rows()[2], vec!["a", "b"]);
}

#[test]
fn test_column_lookup_ignores_case() {
    let table = sample();

    assert_eq!(table.column_index(" repository "), Some(0));
    assert_eq!(table.column("OWNER"), Some(vec!["alice", ""]));
    assert!(table.column("missing").is_none());
    assert!(matches!(
        table.require_column("missing", "sample.csv"),
        Err(Error::MissingColumn { .. })
    ));
}

#[test]
fn test_insert_column_fills_missing_values() {
    let mut table = sample();
    table.insert_column(1, "GitHub App", vec!["App1".to_string()]);

    assert_eq!(table.headers(), &["Repository", "GitHub App", "Owner"]);
    assert_eq!(table.rows()[0], vec!["widgets", "App1", "alice"]);
    assert_eq!(table.rows()[1], vec!["gadgets", "", ""]);
}

#[test]
fn test_csv_round_trip_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.csv");
    let table = sample();

    table.write_csv(&path).unwrap();
    let read = Table::read_csv(&path).unwrap();

    assert_eq!(read, table);
}

#[test]
fn test_read_csv_strips_byte_order_mark() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.csv");
    std::fs::write(&path, "\u{feff}Repository\nwidgets\n").unwrap();

    let table = Table::read_csv(&path).unwrap();

    assert_eq!(table.headers(), &["Repository"]);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_workbook_round_trip_in_natural_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut workbook = Workbook::new();
    for n in [1, 2, 10] {
        let mut table = Table::new(["name"]);
        table.push_row([format!("repo{n}")]);
        workbook.add_sheet(&format!("Batch_{n}"), table);
    }

    workbook.write_dir(dir.path()).unwrap();
    let read = Workbook::read_dir(dir.path()).unwrap();

    let names: Vec<&str> = read.sheets().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Batch_1", "Batch_2", "Batch_10"]);
    assert_eq!(read.sheet("batch_10").unwrap().rows()[0], vec!["repo10"]);
}

#[test]
fn test_read_dir_without_sheets_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Workbook::read_dir(dir.path()),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_sheet_name_sanitises_and_truncates() {
    assert_eq!(sheet_name("acme/deploy bot"), "acme_deploy_bot");
    assert_eq!(sheet_name(""), "Sheet");
    assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME_LEN);
}

#[test]
fn test_add_sheet_replaces_same_name() {
    let mut workbook = Workbook::new();
    workbook.add_sheet("Repos", Table::new(["a"]));
    workbook.add_sheet("Repos", Table::new(["b"]));

    assert_eq!(workbook.len(), 1);
    assert_eq!(workbook.sheet("Repos").unwrap().headers(), &["b"]);
}

#[test]
fn test_add_unique_sheet_suffixes_collisions() {
    let mut workbook = Workbook::new();
    let long = "averyveryverylongorganization-";

    assert_eq!(workbook.add_unique_sheet(long, sample()), long);
    let second = workbook.add_unique_sheet(long, Table::new(["Other"]));
    let third = workbook.add_unique_sheet(&long.to_uppercase(), Table::new(["Third"]));

    assert_eq!(second, "averyveryverylongorganization_2");
    assert_eq!(third, "AVERYVERYVERYLONGORGANIZATION_3");
    assert!(second.len() <= MAX_SHEET_NAME_LEN);
    assert_eq!(workbook.len(), 3);
    assert_eq!(workbook.sheet(long), Some(&sample()));
}

#[test]
fn test_natural_cmp() {
    assert_eq!(natural_cmp("Batch_2", "Batch_10"), Ordering::Less);
    assert_eq!(natural_cmp("Batch_010", "Batch_10"), Ordering::Equal);
    assert_eq!(natural_cmp("alpha", "Beta"), Ordering::Less);
}

#[test]
fn test_timestamped_name() {
    let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
    assert_eq!(
        timestamped_name("inactive_repos", "csv", now),
        "inactive_repos_20240305_070809.csv"
    );
    assert_eq!(format_timestamp(Some(now)), "2024-03-05 07:08:09");
    assert_eq!(format_timestamp(None), "");
}
