//! `cosim schema` — print the derived shared-memory field table.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use cosim_model::ModelSpec;
use cosim_schema::Schema;

pub fn run(models_dir: &Path, model: &str, as_json: bool) -> Result<()> {
    let spec = ModelSpec::load(models_dir, model)
        .with_context(|| format!("loading model '{model}'"))?;
    let schema = Schema::from_spec(&spec);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&layout_json(&schema))?);
        return Ok(());
    }

    println!("Shared record layout for '{model}' (packed, native-endian):");
    println!("{:<16} {:>8} {:>8} {:>6}", "field", "type", "offset", "size");
    for field in schema.fields() {
        println!(
            "{:<16} {:>8} {:>8} {:>6}",
            field.name,
            field.ty.julia_name(),
            field.offset,
            field.size
        );
    }
    println!("total: {} bytes", schema.total_size());
    Ok(())
}

fn layout_json(schema: &Schema) -> serde_json::Value {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "type": f.ty.julia_name(),
                "offset": f.offset,
                "size": f.size,
            })
        })
        .collect();
    json!({
        "fields": fields,
        "total_size": schema.total_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
model_name = "demo"
[parameters]
a = 1.0
b = 2
[variables]
names = ["x"]
[solver]
dt = 0.1
[equations.ode]
f_x = "-x"
"#;

    #[test]
    fn schema_runs_on_valid_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.toml"), MODEL).unwrap();
        run(dir.path(), "demo", false).unwrap();
        run(dir.path(), "demo", true).unwrap();
    }

    #[test]
    fn json_layout_shape() {
        let spec = ModelSpec::from_toml_str(MODEL).unwrap();
        let schema = Schema::from_spec(&spec);
        let value = layout_json(&schema);
        assert_eq!(value["total_size"], 29);
        assert_eq!(value["fields"][0]["name"], "state");
        assert_eq!(value["fields"][3]["offset"], 17);
        assert_eq!(value["fields"][4]["type"], "Int32");
    }
}
