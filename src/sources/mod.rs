//! Per-source layouts and reshapes.
//!
//! Each module owns its file names, layout descriptors and output tables. The
//! functions here take bytes or grids so they can be tested without touching the
//! filesystem; the commands in `cli::command` do the IO.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod airfares;
pub mod climate;
pub mod disasters;
pub mod electricity;
pub mod events;
pub mod flood;
pub mod maritime;
pub mod tides;
pub mod tourism;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// `"Zone (MW) load"` becomes `ZONE_MW_LOAD`.
pub fn upper_snake(name: &str) -> String {
    name.trim()
        .replace(' ', "_")
        .replace(['(', ')'], "")
        .to_uppercase()
}

/// Lower-cased, punctuation and whitespace folded into single underscores.
pub fn snake_case(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let folded = NON_WORD.replace_all(&lower, "_");
    let folded = WHITESPACE.replace_all(&folded, "_");
    let folded = UNDERSCORES.replace_all(&folded, "_");
    folded.trim_matches('_').to_string()
}

// -- Tests -------------------------------------------------------------------
