use std::{env, error::Error, fs, path::PathBuf};

#[path = "src/util/checksum.rs"]
mod checksum;

/// Embeds `schema.sql` and its checksum into the crate as `SCHEMA` and `SCHEMA_CHECKSUM`.
fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR isn't set")?);
    let schema_path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").ok_or("CARGO_MANIFEST_DIR isn't set")?)
        .join("schema.sql");

    let schema = fs::read_to_string(&schema_path)?;
    let consts = format!(
        "/// The default catalog store schema.\n\
         pub(crate) const SCHEMA: &str = {:?};\n\
         /// The default schema's BLAKE2b checksum.\n\
         pub(crate) const SCHEMA_CHECKSUM: &str = {:?};\n",
        schema,
        checksum::blake2b_string(&schema)
    );
    fs::write(out_dir.join("store_consts.rs"), consts)?;

    println!("cargo:rerun-if-changed={}", schema_path.display());
    Ok(())
}
