//! One loaded dataset together with its resolved bindings.
//!
//! A [`Session`] is owned by the command that opened it and is read-only
//! afterwards; every view is computed from it on demand.

use anyhow::{Context, Result};
use log::info;

use crate::{
    bindings::{BindingConfig, BindingTable, Selection},
    cli::{SourceArgs, ViewArgs},
    dataset::{Dataset, LoadOptions},
    filter::RowFilter,
    io_utils,
    view::{self, ViewModel, ViewRequest},
};

#[derive(Debug, Clone)]
pub struct Session {
    pub dataset: Dataset,
    pub bindings: BindingTable,
}

impl Session {
    pub fn new(dataset: Dataset, config: &BindingConfig) -> Self {
        let bindings = BindingTable::resolve(config, dataset.headers());
        Self { dataset, bindings }
    }

    pub fn open(args: &SourceArgs) -> Result<Self> {
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        let options = LoadOptions {
            delimiter: args.delimiter,
            encoding,
            sheet: args.sheet.clone(),
        };
        let dataset = Dataset::load(&args.input, &options)
            .with_context(|| format!("Loading dataset from {:?}", args.input))?;
        let config = BindingConfig::load_or_default(args.bindings.as_deref())?;
        info!(
            "Loaded {} row(s) across {} column(s) from {:?}",
            dataset.len(),
            dataset.headers().len(),
            args.input
        );
        Ok(Self::new(dataset, &config))
    }

    /// Builds a request from the view flags. Without explicit districts the
    /// allow-set is every district in the dataset.
    pub fn request(&self, args: &ViewArgs) -> Result<ViewRequest> {
        let selection = Selection::new(args.level, args.category);
        let districts = args
            .districts
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>();
        let filter = if districts.is_empty() {
            let columns = self.bindings.select(selection)?;
            RowFilter::all_districts(&self.dataset, &columns)
        } else {
            RowFilter::new(districts, None)
        };
        Ok(ViewRequest::new(
            selection,
            filter.with_search(args.search.as_deref()),
        ))
    }

    pub fn compute(&self, request: &ViewRequest) -> Result<ViewModel> {
        let view = view::compute(&self.dataset, &self.bindings, request)?;
        info!(
            "{} row(s) selected for {}",
            view.row_count, request.selection
        );
        Ok(view)
    }
}
