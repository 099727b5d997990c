//! End-to-end import runs against on-disk profiles and asset stores.

use itemforge::{
    validate_field, AssetStore, FieldSchema, FieldType, FileAssetStore, ForgeError, ForgeResult,
    ImportOptions, Importer, ItemIdentity, ItemRecord, PipelineContext, PipelineSettings, Profile,
    ProfileRegistry, RelationshipConstraint, RelationshipOperator, SkipReason, ValidationMode,
    Value,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes the food and weapon profiles and returns settings rooted in `dir`.
fn setup(dir: &Path, validation: ValidationMode) -> ForgeResult<PipelineSettings> {
    let mut settings = PipelineSettings::for_testing(dir);
    settings.validation = validation;

    let mut food = Profile::new("survival_food", "Survival Food", "Food");
    food.add_field(FieldSchema::new("hungerRestore", FieldType::Integer).with_range(0.0, 100.0))?;
    food.add_field(FieldSchema::new("weight", FieldType::Float))?;
    food.save(&settings.profiles_dir.join("survival_food.json"))?;

    let mut weapons = Profile::new("melee", "Melee Weapons", "Weapon");
    weapons.add_field(FieldSchema::new("minDamage", FieldType::Integer).with_range(0.0, 500.0))?;
    weapons.add_field(
        FieldSchema::new("maxDamage", FieldType::Integer).with_relationship(
            RelationshipConstraint::new(RelationshipOperator::GreaterOrEqual, "minDamage"),
        ),
    )?;
    weapons.save(&settings.profiles_dir.join("melee.json"))?;

    Ok(settings)
}

fn write_input(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn asset_files(root: &Path, item_type: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join(item_type))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_two_food_items_are_imported() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let input = write_input(
        &dir,
        "food.json",
        r#"[{"id":"food_1","displayName":"Apple","hungerRestore":"10"},{"id":"food_2","displayName":"Bread","hungerRestore":"20"}]"#,
    );

    let mut ctx = PipelineContext::from_settings(settings)?;
    let report = ctx.import_from_json(&input, "survival_food", "Food")?;

    assert_eq!(report.imported_count(), 2);
    assert_eq!(report.imported_ids, vec!["food_1", "food_2"]);
    assert_eq!(
        asset_files(&ctx.settings.output_root, "Food"),
        vec!["food_1.json", "food_2.json"]
    );

    let records = ctx.store.records("Food")?;
    assert_eq!(records[0].get_int("hungerRestore", 0), 10);
    assert_eq!(records[1].get_int("hungerRestore", 0), 20);

    let items = ctx.list_items("Food")?;
    assert!(matches!(items[0], ItemRecord::Food(ref f) if f.hunger_restore == 10));
    assert_eq!(items[1].display_name(), "Bread");
    Ok(())
}

#[test]
fn test_item_without_id_is_skipped() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let input = write_input(&dir, "food.json", r#"[{"displayName":"NoId"}]"#);

    let mut ctx = PipelineContext::from_settings(settings)?;
    let report = ctx.import_from_json(&input, "survival_food", "Food")?;

    assert_eq!(report.imported_count(), 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::MissingId);
    assert!(asset_files(&ctx.settings.output_root, "Food").is_empty());
    Ok(())
}

#[test]
fn test_empty_batches_import_nothing() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let mut ctx = PipelineContext::from_settings(settings)?;

    for (name, contents) in [("empty_array.json", "[]"), ("empty.json", "")] {
        let input = write_input(&dir, name, contents);
        let report = ctx.import_from_json(&input, "survival_food", "Food")?;
        assert_eq!(report.imported_count(), 0);
        assert!(report.skipped.is_empty());
    }
    Ok(())
}

#[test]
fn test_out_of_range_value_cites_the_bound() {
    let schema = FieldSchema::new("damageModifier", FieldType::Integer).with_range(-100.0, 100.0);
    let result = validate_field(&schema, Some(&Value::from("150")), &Default::default());

    assert!(!result.is_valid);
    assert!(result.error_message.contains("150"));
    assert!(result.error_message.contains("maximum of 100"));
}

#[test]
fn test_reimport_is_idempotent() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let input = write_input(
        &dir,
        "weapons.json",
        r#"[{"id":"axe","displayName":"Axe","minDamage":3,"maxDamage":7},{"id":"spear","displayName":"Spear","minDamage":4,"maxDamage":9}]"#,
    );

    let mut ctx = PipelineContext::from_settings(settings)?;
    let first = ctx.import_from_json(&input, "melee", "Weapon")?;
    let files_after_first = asset_files(&ctx.settings.output_root, "Weapon");
    let records_after_first = ctx.store.records("Weapon")?;

    let second = ctx.import_from_json(&input, "melee", "Weapon")?;
    assert_eq!(first.imported_ids, second.imported_ids);
    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(asset_files(&ctx.settings.output_root, "Weapon"), files_after_first);
    assert_eq!(ctx.store.records("Weapon")?, records_after_first);
    Ok(())
}

#[test]
fn test_malformed_item_does_not_affect_neighbours() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let input = write_input(
        &dir,
        "weapons.json",
        r#"[{"id":"axe","displayName":"Axe"},{"id":"broken","displayName":"Unterminated},{"id":"spear","displayName":"Spear"}]"#,
    );

    let mut ctx = PipelineContext::from_settings(settings)?;
    let report = ctx.import_from_json(&input, "melee", "Weapon")?;

    assert_eq!(report.imported_ids, vec!["axe", "spear"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert!(matches!(report.skipped[0].reason, SkipReason::Malformed(_)));
    Ok(())
}

#[test]
fn test_strict_mode_rejects_relationship_violation() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Strict)?;
    let input = write_input(
        &dir,
        "weapons.json",
        r#"[{"id":"bad","displayName":"Bad","minDamage":10,"maxDamage":5},{"id":"good","displayName":"Good","minDamage":1,"maxDamage":5}]"#,
    );

    let mut ctx = PipelineContext::from_settings(settings)?;
    let report = ctx.import_from_json(&input, "melee", "Weapon")?;

    assert_eq!(report.imported_ids, vec!["good"]);
    match &report.skipped[0].reason {
        SkipReason::Invalid(message) => {
            assert!(message.contains("'maxDamage' (5) must be >= 'minDamage' (10)"))
        }
        other => panic!("expected a validation skip, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_values_with_escapes_survive_import() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let input = write_input(
        &dir,
        "food.json",
        r#"[{"id":"stew","displayName":"Grandma's \"Stew\", {hot}","weight":"1.5"}]"#,
    );

    let mut ctx = PipelineContext::from_settings(settings)?;
    let report = ctx.import_from_json(&input, "survival_food", "Food")?;
    assert_eq!(report.imported_ids, vec!["stew"]);

    let items = ctx.list_items("Food")?;
    assert_eq!(items[0].display_name(), r#"Grandma's "Stew", {hot}"#);
    assert!(matches!(items[0], ItemRecord::Food(ref f) if (f.weight - 1.5).abs() < f64::EPSILON));
    Ok(())
}

#[test]
fn test_colliding_ids_count_only_persisted_records() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let profiles = ProfileRegistry::load_dir(&settings.profiles_dir)?;
    let mut store = FileAssetStore::new(&settings.output_root);

    let report = Importer::new(&profiles, &mut store, settings.import_options()).import_from_str(
        r#"[{"id":"a/b","displayName":"One"},{"id":"a_b","displayName":"Two"},{"id":" c ","displayName":"Three"},{"id":"c","displayName":"Four"}]"#,
        "melee",
        "Weapon",
    )?;

    let persisted = store.records("Weapon")?;
    assert_eq!(report.imported_count(), persisted.len());
    assert_eq!(report.imported_count(), 2);
    assert_eq!(report.skipped.len(), 2);
    assert!(report
        .skipped
        .iter()
        .all(|s| matches!(s.reason, SkipReason::DuplicateId(_))));
    assert_eq!(
        asset_files(&settings.output_root, "Weapon"),
        vec!["a_b.json", "c.json"]
    );
    assert_eq!(persisted[0].get_string("displayName", ""), "One");
    assert_eq!(persisted[1].get_string("displayName", ""), "Three");
    Ok(())
}

#[test]
fn test_missing_input_file() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Warn)?;
    let mut ctx = PipelineContext::from_settings(settings)?;

    let result = ctx.import_from_json(&dir.path().join("nope.json"), "survival_food", "Food");
    assert!(matches!(result, Err(ForgeError::FileNotFound(_))));
    Ok(())
}

#[test]
fn test_importer_with_explicit_store() -> ForgeResult<()> {
    let dir = tempfile::tempdir()?;
    let settings = setup(dir.path(), ValidationMode::Off)?;
    let profiles = ProfileRegistry::load_dir(&settings.profiles_dir)?;
    let mut store = FileAssetStore::new(dir.path().join("assets"));

    let report = Importer::new(
        &profiles,
        &mut store,
        ImportOptions {
            validation: ValidationMode::Off,
        },
    )
    .import_from_str(r#"[{"id":"Iron/Sword","displayName":"Iron Sword"}]"#, "melee", "")?;

    assert_eq!(report.item_type_name, "Weapon");
    assert!(store.asset_path("Weapon", "Iron/Sword").ends_with("Iron_Sword.json"));
    assert!(dir.path().join("assets/Weapon/Iron_Sword.json").is_file());
    Ok(())
}
