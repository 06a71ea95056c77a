use catalog::{Catalog, Edit, EditId, FILTERS, Filter, Stats};

/// One filter button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButton {
    pub slug: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Filter, search box and opened edit over the catalog.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    catalog: Catalog,
    filter: Filter,
    query: String,
    selected: Option<EditId>,
}

impl Gallery {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn set_filter(&mut self, slug: &str) {
        self.filter = Filter::parse(slug);
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filters(&self) -> Vec<FilterButton> {
        FILTERS
            .iter()
            .map(|&(slug, label)| FilterButton {
                slug,
                label,
                active: slug == self.filter.slug(),
            })
            .collect()
    }

    pub fn visible(&self) -> Vec<&Edit> {
        self.catalog.search(&self.filter, &self.query)
    }

    /// Opens an edit. Ids missing from the catalog leave the selection unchanged.
    pub fn select(&mut self, edit_id: EditId) -> Option<&Edit> {
        if self.catalog.contains(edit_id) {
            self.selected = Some(edit_id);
        }

        self.selected()
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Edit> {
        self.selected.and_then(|id| self.catalog.get(id))
    }

    pub fn stats(&self) -> Stats {
        self.catalog.stats()
    }
}
