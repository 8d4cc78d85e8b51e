//! `threadvault search` command implementation.

use crate::cli::{format_local_time, open_store, truncate};
use crate::config::Config;
use crate::core::search::{SearchCriteria, SearchHit, search};
use crate::error::Result;

const TITLE_WIDTH: usize = 40;

/// Run the search command.
///
/// Prints matching threads; with a query, ranked by relevance.
///
/// # Errors
///
/// Returns an error if the storage backend fails.
pub fn run(
    config: &Config,
    query: Option<String>,
    tags: Vec<String>,
    source_app: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let store = open_store(config)?;
    let criteria = SearchCriteria {
        query,
        source_app,
        tags: (!tags.is_empty()).then_some(tags),
        limit: Some(limit.unwrap_or(config.defaults.search_limit)),
        ..SearchCriteria::default()
    };

    let hits = search(store.as_ref(), &criteria, true)?;
    if hits.is_empty() {
        println!("No matching conversations.");
        return Ok(());
    }

    print!("{}", render(&hits));
    Ok(())
}

fn render(hits: &[SearchHit]) -> String {
    let mut out = format!(
        "{:>5} {:<38} {:<17} {:>5} Title\n{}\n",
        "Score",
        "ID",
        "Saved",
        "Msgs",
        "─".repeat(100)
    );
    for hit in hits {
        let score = hit
            .relevance
            .as_ref()
            .map_or_else(|| "-".to_string(), |r| r.score.to_string());
        out.push_str(&format!(
            "{:>5} {:<38} {:<17} {:>5} {}\n",
            score,
            hit.descriptor.id,
            format_local_time(hit.descriptor.saved_at),
            hit.thread.messages.len(),
            truncate(hit.thread.title(), TITLE_WIDTH)
        ));
        if let Some(matched) = hit.relevance.as_ref().filter(|r| !r.matched_fields.is_empty()) {
            out.push_str(&format!("{:>5} matched: {}\n", "", matched.matched_fields.join(", ")));
        }
    }
    out.push_str(&format!("{} result(s)\n", hits.len()));
    out
}
