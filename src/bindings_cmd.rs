//! `bindings` and `districts` commands.
//!
//! `bindings` renders every logical field with its keyword patterns and the
//! column it resolved to, so a mismatched spreadsheet can be diagnosed before
//! any metric is computed. It can also write the effective configuration as
//! a YAML template for editing.

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    bindings::{BindingConfig, BindingTable, LogicalField, Resolution},
    cli::{BindingsArgs, DistrictsArgs, SourceArgs},
    session::Session,
    table,
};

pub fn execute(args: &BindingsArgs) -> Result<()> {
    let config = BindingConfig::load_or_default(args.bindings.as_deref())?;

    if let Some(path) = &args.write_template {
        config
            .save(path)
            .with_context(|| format!("Writing bindings template to {path:?}"))?;
        info!("Bindings template written to {path:?}");
    }

    let Some(input) = &args.input else {
        return Ok(());
    };
    let source = SourceArgs {
        input: input.clone(),
        sheet: args.sheet.clone(),
        delimiter: args.delimiter,
        input_encoding: args.input_encoding.clone(),
        bindings: args.bindings.clone(),
    };
    let session = Session::open(&source)?;
    let rows = binding_rows(&session.bindings);
    let headers = ["field", "patterns", "status", "column"]
        .map(String::from)
        .to_vec();
    table::print_table(&headers, &rows);
    let unresolved = session
        .bindings
        .entries()
        .iter()
        .filter(|entry| !matches!(entry.resolution, Resolution::Bound { .. }))
        .count();
    info!(
        "Resolved {} of {} logical field(s) against {:?}",
        rows.len() - unresolved,
        rows.len(),
        input
    );
    Ok(())
}

pub fn binding_rows(bindings: &BindingTable) -> Vec<Vec<String>> {
    bindings
        .entries()
        .iter()
        .map(|entry| {
            let column = match &entry.resolution {
                Resolution::Bound { column, .. } => column.clone(),
                Resolution::Ambiguous { candidates, .. } => candidates.join(", "),
                Resolution::Missing => String::new(),
            };
            vec![
                entry.field.to_string(),
                entry.patterns.join(" | "),
                entry.resolution.status().to_string(),
                column,
            ]
        })
        .collect()
}

pub fn execute_districts(args: &DistrictsArgs) -> Result<()> {
    let session = Session::open(&args.source)?;
    let district = session
        .bindings
        .column(LogicalField::District)
        .ok_or_else(|| {
            anyhow!(
                "District column not bound; run `seatboard bindings -i {}` for details",
                args.source.input.display()
            )
        })?;
    let rows = session
        .dataset
        .district_counts(&district)
        .into_iter()
        .map(|(name, count)| vec![name, count.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&[district.name.clone(), "rows".to_string()], &rows);
    info!("Listed {} district(s)", rows.len());
    Ok(())
}
