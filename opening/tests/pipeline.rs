use std::fs;
use std::path::Path;
use opening::{
    classify_pending, flat_match_rows, ingest_file, replay_files, Catalog, Error, OpeningFlags, Report, Store,
    Victory, CLASSIFIER_VERSION,
};
use serde_json::json;

fn write_replay(dir: &Path, name: &str, first_militia: bool) {
    let mut operations = vec![
        json!({"type": "action", "action": "unit_queued", "fields": {"player_id": 1, "unit_id": 83}}),
        json!({"type": "action", "action": "unit_queued", "fields": {"player_id": 2, "unit_id": 83}}),
    ];
    if first_militia {
        operations.push(json!({"type": "action", "action": "building_constructed", "fields": {"player_id": 1, "building_id": 12}}));
        operations.push(json!({"type": "action", "action": "unit_queued", "fields": {"player_id": 1, "unit_id": 74}}));
    }
    operations.push(json!({"type": "sync", "delta_ms": 500_000}));
    operations.push(json!({"type": "action", "action": "tech_researched", "fields": {"player_id": 2, "technology_id": 101}}));
    operations.push(json!({"type": "sync", "delta_ms": 100_000}));
    operations.push(json!({"type": "action", "action": "player_resigned", "fields": {"player_id": 2}}));

    let replay = json!({
        "header": {"map_id": 29, "map_name": "Arabia", "save_version": 37.0, "players": [
            {"player_id": 1, "name": "one", "civ_id": 1, "color_id": 0, "team_id": 1},
            {"player_id": 2, "name": "two", "civ_id": 2, "color_id": 1, "team_id": 2}
        ]},
        "operations": operations,
    });
    fs::write(dir.join(name), replay.to_string()).unwrap();
}

#[test]
fn ingest_classify_report_and_export() {
    let dir = tempfile::tempdir().unwrap();
    write_replay(dir.path(), "1000_11_vs_22-1500(3).json", true);
    write_replay(dir.path(), "1001_11_vs_33-1600(3).json", false);
    fs::write(dir.path().join("1002_11_vs_44-1600(3).json"), "{not json").unwrap();

    let store = Store::open(&dir.path().join("db")).unwrap();
    let catalog = Catalog::default();
    let files = replay_files(dir.path()).unwrap();
    assert_eq!(files.len(), 3);

    let mut stored = 0;
    let mut failed = 0;
    for path in &files {
        match ingest_file(&store, &catalog, path, 104954) {
            Ok(true) => stored += 1,
            Ok(false) => {}
            Err(Error::Decode { .. }) => failed += 1,
            Err(err) => panic!("Unexpected error: {err}"),
        }
    }
    assert_eq!((stored, failed), (2, 1));
    assert!(!ingest_file(&store, &catalog, &files[0], 104954).unwrap());
    assert!(!store.contains_match(1002).unwrap());

    let summary = classify_pending(&store, &catalog, CLASSIFIER_VERSION).unwrap();
    assert_eq!(summary.classified, 4);

    let drusher = store.match_player(1000, 11).unwrap().unwrap();
    assert_eq!(drusher.opening_flags(), Some(OpeningFlags::PREMILL_DRUSH));
    assert_eq!(drusher.victory, Victory::Won);
    let idle = store.match_player(1001, 11).unwrap().unwrap();
    assert_eq!(idle.opening_flags(), Some(OpeningFlags::DID_NOTHING));

    let report = Report::from_store(&store, &catalog, CLASSIFIER_VERSION).unwrap();
    assert_eq!(report.total_concluded, 2);
    let drush_vs_nothing = report.matchups.iter()
        .find(|m| m.first == "PremillDrush" && m.second == "DidNothing")
        .unwrap();
    assert_eq!((drush_vs_nothing.total, drush_vs_nothing.first_wins), (1, 1));
    let feudal = report.age_ups.iter().find(|a| a.age == "Feudal Age").unwrap();
    assert_eq!((feudal.count, feudal.median_ms), (2, 500_000));

    let rows = flat_match_rows(&store, CLASSIFIER_VERSION).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.winner.player_id == 11));
}
