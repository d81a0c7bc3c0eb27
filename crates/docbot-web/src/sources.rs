//! Answer formatting with a numbered source list

use std::collections::BTreeSet;

use docbot_core::QueryResult;

/// Number each unique source URL once, in sorted order
///
/// Returns an empty string when there are no sources, otherwise
/// `"sources:\n1. <url>\n2. <url>\n"`.
pub fn create_sources_string<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let unique: BTreeSet<&str> = sources.into_iter().collect();
    if unique.is_empty() {
        return String::new();
    }

    let mut out = String::from("sources:\n");
    for (i, source) in unique.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, source));
    }
    out
}

/// Answer text followed by its source list, as shown in the chat
pub fn format_answer(result: &QueryResult) -> String {
    format!(
        "{} \n\n {}",
        result.result,
        create_sources_string(result.sources())
    )
}
