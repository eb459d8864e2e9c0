use lineage_mod_protocol::ModProfile;
use schemars::schema_for;

pub fn main() {
    let schema = schema_for!(ModProfile);
    println!(
        "{}",
        serde_json::to_string_pretty(&schema).expect("failed to generate schema JSON")
    );
}
