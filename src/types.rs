use serde::Deserialize;

// GitHub search API response structures; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<RepoItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoItem {
    pub owner: RepoOwner,
    pub name: String,
    pub full_name: String,
    pub stargazers_count: u32,
    pub clone_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

impl RepoItem {
    pub fn owner_login(&self) -> &str {
        &self.owner.login
    }
}

/// Half-open star range `[lower, upper)` bounding one search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub lower_stars: u32,
    pub upper_stars: u32,
}

impl QueryWindow {
    pub fn new(lower_stars: u32, upper_stars: u32) -> Self {
        Self { lower_stars, upper_stars }
    }

    pub fn is_open(&self) -> bool {
        self.lower_stars < self.upper_stars
    }

    /// GitHub ranges are inclusive on both ends, so the upper bound is pulled in by one.
    pub fn stars_qualifier(&self) -> String {
        format!("stars:{}..{}", self.lower_stars, self.upper_stars.saturating_sub(1))
    }
}
