//! Page classification: decides the minimal sufficient check tier from
//! fetched markup.
//!
//! Client-rendered applications ship an empty shell that only a browser
//! can evaluate; server-rendered pages with real content justify the
//! standard probe; everything else gets the cheap HTTP check.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::config::CONTENT_RICH_MIN_CHARS;
use crate::models::Tier;

// CSS selector strings
const SPA_MOUNT_SELECTOR_STR: &str = "#root, #app, [ng-app]";
const HEADING_SELECTOR_STR: &str = "h1";
const TEXT_BLOCK_SELECTOR_STR: &str = "p, article";

// Regex patterns
const FRAMEWORK_MARKER_PATTERN: &str = r"(?i)react|vue";
const EMPTY_SHELL_PATTERN: &str = r"(?is)<div[^>]*>\s*</div>\s*<script";

static SPA_MOUNT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(SPA_MOUNT_SELECTOR_STR)
        .expect("Failed to parse SPA mount selector - this is a bug")
});

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(HEADING_SELECTOR_STR).expect("Failed to parse heading selector - this is a bug")
});

static TEXT_BLOCK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(TEXT_BLOCK_SELECTOR_STR)
        .expect("Failed to parse text block selector - this is a bug")
});

static FRAMEWORK_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(FRAMEWORK_MARKER_PATTERN)
        .expect("Failed to compile framework marker regex - this is a bug")
});

static EMPTY_SHELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(EMPTY_SHELL_PATTERN).expect("Failed to compile empty shell regex - this is a bug")
});

/// Decides the minimal sufficient check tier for a page.
///
/// Applied in precedence order:
/// 1. SPA markers (a root/app mount element, a framework name reference,
///    or an essentially-empty div immediately followed by a script)
///    without substantial server-rendered content: `Browser`.
/// 2. Content-rich markup (more than 3000 characters, a heading, and a
///    paragraph or article element): `Standard`.
/// 3. Everything else: `Lightweight`.
///
/// Never returns `Auto`.
pub fn classify(html: &str, url: &str) -> Tier {
    let document = Html::parse_document(html);

    let is_spa = document.select(&SPA_MOUNT_SELECTOR).next().is_some()
        || FRAMEWORK_MARKER_RE.is_match(html)
        || EMPTY_SHELL_RE.is_match(html);

    let content_rich = html.chars().count() > CONTENT_RICH_MIN_CHARS
        && document.select(&HEADING_SELECTOR).next().is_some()
        && document.select(&TEXT_BLOCK_SELECTOR).next().is_some();

    if is_spa && !content_rich {
        log::debug!("{url} classified as client-rendered, needs browser tier");
        return Tier::Browser;
    }

    if content_rich {
        log::debug!("{url} classified as server-rendered/static, using standard tier");
        return Tier::Standard;
    }

    log::debug!("{url} using lightweight tier (default)");
    Tier::Lightweight
}
