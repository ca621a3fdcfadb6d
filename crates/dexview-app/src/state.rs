// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::projector::ViewQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Browsing,
    Searching,
}

/// Page, search, and category state of the catalog view.
///
/// Entering a search remembers the page being browsed and jumps to the first
/// page; clearing the search returns to the remembered page. Picking a
/// category always jumps to the first page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub search_query: String,
    pub selected_category: Option<String>,
    pub current_page: usize,
    pub previous_page_before_search: usize,
    pub phase: SearchPhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    SetSearch(String),
    SetCategory(Option<String>),
    SetPage(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    SearchChanged(String),
    SearchStarted { resume_page: usize },
    SearchEnded,
    CategoryChanged(Option<String>),
    PageChanged(usize),
}

impl ViewState {
    pub const fn is_searching(&self) -> bool {
        matches!(self.phase, SearchPhase::Searching)
    }

    pub fn query(&self) -> ViewQuery<'_> {
        ViewQuery {
            search: &self.search_query,
            category: self.selected_category.as_deref(),
            page: self.current_page,
        }
    }

    pub fn dispatch(&mut self, command: NavCommand) -> Vec<NavEvent> {
        match command {
            NavCommand::SetSearch(query) => self.search_changed(query),
            NavCommand::SetCategory(category) => {
                self.selected_category = category.clone();
                let mut events = vec![NavEvent::CategoryChanged(category)];
                events.extend(self.set_page(0));
                events
            }
            NavCommand::SetPage(page) => self.set_page(page).into_iter().collect(),
        }
    }

    fn search_changed(&mut self, query: String) -> Vec<NavEvent> {
        let mut events = Vec::new();
        match (self.phase, query.is_empty()) {
            (SearchPhase::Browsing, false) => {
                self.previous_page_before_search = self.current_page;
                self.phase = SearchPhase::Searching;
                events.push(NavEvent::SearchStarted {
                    resume_page: self.previous_page_before_search,
                });
                events.extend(self.set_page(0));
            }
            (SearchPhase::Searching, true) => {
                self.phase = SearchPhase::Browsing;
                events.push(NavEvent::SearchEnded);
                events.extend(self.set_page(self.previous_page_before_search));
            }
            (SearchPhase::Searching, false) | (SearchPhase::Browsing, true) => {}
        }

        if self.search_query != query {
            events.insert(0, NavEvent::SearchChanged(query.clone()));
        }
        self.search_query = query;
        events
    }

    fn set_page(&mut self, page: usize) -> Option<NavEvent> {
        if self.current_page == page {
            return None;
        }
        self.current_page = page;
        Some(NavEvent::PageChanged(page))
    }
}
