use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use opening::{FlatMatchRow, MatchRecord, PlayerMatchRecord, StoredAction};

fn schema_for<T: schemars::JsonSchema>() -> RootSchema {
    SchemaSettings::default()
        .into_generator()
        .into_root_schema_for::<T>()
}

/// Prints JSON schemas for the stored records and the flat export
fn main() -> anyhow::Result<()> {
    let schemas = serde_json::json!({
        "match": schema_for::<MatchRecord>(),
        "match_player": schema_for::<PlayerMatchRecord>(),
        "match_player_action": schema_for::<StoredAction>(),
        "flat_match_row": schema_for::<FlatMatchRow>(),
    });

    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}
