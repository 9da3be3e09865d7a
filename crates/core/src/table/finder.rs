//! TableFinder orchestrator and the pluggable pipeline stages.
//!
//! A page flows through Edge Merger -> Lattice Builder -> Cell Filter ->
//! Table Filter. The edge merger is chosen by [`EdgeStrategy`]; the lattice
//! builder can be swapped for any [`LatticeBuilder`].

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::Result;

use super::cell_filter::CellFilter;
use super::edges::{LinesEdgeMerger, TextbookEdgeMerger};
use super::grid::IntersectionLattice;
use super::settings::{EdgeSettings, EdgeStrategy, LatticeSettings, TableSettings};
use super::table_filter::filter_tables;
use super::types::{EdgeSet, Page, Table};

/// Turns the primitives of a page into canonical edges.
pub trait EdgeMerger: Send + Sync {
    fn merge(&self, page: &Page, settings: &EdgeSettings) -> EdgeSet;
}

/// Turns canonical edges into candidate tables with cells, glyphs and
/// associated rects filled in.
///
/// Candidates must be numbered `TableId(0..)` in output order.
pub trait LatticeBuilder: Send + Sync {
    fn build(&self, page: &Page, edges: &EdgeSet, settings: &LatticeSettings) -> Vec<Table>;
}

/// Main table finder.
pub struct TableFinder {
    settings: TableSettings,
    merger: Box<dyn EdgeMerger>,
    lattice: Box<dyn LatticeBuilder>,
}

impl std::fmt::Debug for TableFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableFinder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TableFinder {
    /// Validate `settings` and build a finder. Fails before any page is
    /// touched when a threshold is out of range.
    pub fn new(settings: TableSettings) -> Result<Self> {
        settings.validate()?;
        let merger: Box<dyn EdgeMerger> = match settings.edges.strategy {
            EdgeStrategy::Lines => Box::new(LinesEdgeMerger),
            EdgeStrategy::Textbook => Box::new(TextbookEdgeMerger),
        };
        Ok(Self {
            settings,
            merger,
            lattice: Box::new(IntersectionLattice),
        })
    }

    /// Replace the reference lattice builder.
    pub fn with_lattice(mut self, lattice: Box<dyn LatticeBuilder>) -> Self {
        self.lattice = lattice;
        self
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    /// Canonical edges of `page`.
    pub fn merge_edges(&self, page: &Page) -> EdgeSet {
        self.merger.merge(page, &self.settings.edges)
    }

    /// Lattice candidates before any filtering. Empty when the edges cannot
    /// form a lattice.
    pub fn build_candidates(&self, page: &Page) -> Vec<Table> {
        let edges = self.merge_edges(page);
        trace!(
            horizontal = edges.horizontal.len(),
            vertical = edges.vertical.len(),
            "canonical edges"
        );
        if !edges.can_form_lattice() {
            return Vec::new();
        }
        self.lattice.build(page, &edges, &self.settings.lattice)
    }

    /// Find the tables on one page.
    pub fn find_tables(&self, page: &Page) -> Vec<Table> {
        let mut candidates = self.build_candidates(page);
        let total = candidates.len();

        let cell_filter = CellFilter::new(page, &self.settings.cells);
        for table in &mut candidates {
            cell_filter.apply(table);
        }

        let accepted = filter_tables(candidates, page, &self.settings.tables);
        debug!(candidates = total, accepted = accepted.len(), "page done");
        accepted
    }

    /// Find tables on many pages in parallel; results keep page order.
    pub fn find_tables_in_pages(&self, pages: &[Page]) -> Vec<Vec<Table>> {
        pages.par_iter().map(|page| self.find_tables(page)).collect()
    }
}

/// Find tables on one page with the given settings.
pub fn find_tables(page: &Page, settings: &TableSettings) -> Result<Vec<Table>> {
    let finder = TableFinder::new(settings.clone())?;
    Ok(finder.find_tables(page))
}
