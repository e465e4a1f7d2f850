//! Explicit state for a catalog screen: loaded movies, the active search,
//! filters and the current page. Every change goes through [`CatalogState::reduce`].

use crate::filter::{self, Page, PageSize, SearchFilters};
use crate::models::movie::Movie;

use super::search::SearchTicket;

#[derive(Debug, Clone)]
pub enum CatalogAction {
    Loaded(Vec<Movie>),
    /// A keystroke in the search box. An empty keyword clears the search.
    KeywordChanged {
        keyword: String,
        ticket: SearchTicket,
    },
    SearchCompleted {
        ticket: SearchTicket,
        results: Vec<Movie>,
    },
    FiltersApplied(SearchFilters),
    FiltersCleared,
    PageSizeChanged(PageSize),
    PageSelected(usize),
}

#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    movies: Vec<Movie>,
    keyword: String,
    search_results: Option<Vec<Movie>>,
    pending_search: Option<SearchTicket>,
    filters: Option<SearchFilters>,
    page_size: PageSize,
    current_page: usize,
}

impl CatalogState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            current_page: 1,
            ..Default::default()
        }
    }

    pub fn reduce(mut self, action: CatalogAction) -> Self {
        match action {
            CatalogAction::Loaded(movies) => {
                self.movies = movies;
                self.current_page = 1;
            }
            CatalogAction::KeywordChanged { keyword, ticket } => {
                if keyword.trim().is_empty() {
                    self.search_results = None;
                    self.pending_search = None;
                } else {
                    self.pending_search = Some(ticket);
                }
                self.keyword = keyword;
                self.current_page = 1;
            }
            CatalogAction::SearchCompleted { ticket, results } => {
                if self.pending_search == Some(ticket) {
                    self.search_results = Some(results);
                    self.pending_search = None;
                    self.current_page = 1;
                }
            }
            CatalogAction::FiltersApplied(filters) => {
                self.filters = (!filters.is_empty()).then_some(filters);
                self.current_page = 1;
            }
            CatalogAction::FiltersCleared => {
                self.filters = None;
                self.current_page = 1;
            }
            CatalogAction::PageSizeChanged(size) => {
                self.page_size = size;
                self.current_page = self.current_page.min(self.total_pages());
            }
            CatalogAction::PageSelected(page) => {
                self.current_page = page.clamp(1, self.total_pages());
            }
        }
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_searching(&self) -> bool {
        self.pending_search.is_some()
    }

    pub fn current_page(&self) -> usize {
        self.current_page.max(1)
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Search results replace the loaded set as the base while a search is active.
    fn base(&self) -> &[Movie] {
        self.search_results.as_deref().unwrap_or(&self.movies)
    }

    pub fn visible(&self) -> Vec<&Movie> {
        filter::filter_movies(self.base(), self.filters.as_ref())
    }

    pub fn total_pages(&self) -> usize {
        filter::total_pages(self.visible().len(), self.page_size)
    }

    pub fn page(&self) -> Page<Movie> {
        let visible: Vec<Movie> = self.visible().into_iter().cloned().collect();
        filter::paginate(&visible, self.page_size, self.current_page())
    }
}
