//! Server-rendered HTML for the events grid and detail pages.

use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::filters::{FilterState, SortKey, ViewMode};
use crate::format;
use crate::models::{Event, FestivalStats, StatusBadge};
use crate::session::{GridPhase, GridSnapshot};

const SITE_NAME: &str = "GameEvents";
const TOP_TYPES: usize = 4;

pub fn page(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | " (SITE_NAME) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                header class="site-header" {
                    a class="brand" href="/" { (SITE_NAME) }
                    span class="tagline" { "Festivals, showcases and awards for indie games" }
                }
                main { (content) }
                footer class="footer" {
                    "Data from the videogame events API. Deadlines change; always check the official page."
                }
            }
        }
    }
}

/// Home grid for one committed filter state.
pub fn home_page(snapshot: &GridSnapshot, stats: Option<&FestivalStats>) -> Markup {
    let content = html! {
        @if let Some(stats) = stats {
            (stats_bar(stats))
        }
        (filter_bar(snapshot))
        (grid(snapshot))
    };
    page("Indie Game Festivals & Events", content)
}

pub fn stats_bar(stats: &FestivalStats) -> Markup {
    html! {
        section class="stats" {
            div class="stat" {
                p class="stat-label" { "Total Events" }
                p class="stat-value" { (stats.total) }
            }
            div class="stat" {
                p class="stat-label" { "Open Submissions" }
                p class="stat-value" { (stats.open_count()) }
            }
            @for entry in stats.top_types(TOP_TYPES) {
                div class="stat" {
                    p class="stat-label" { (entry.category) }
                    p class="stat-value" { (entry.count) }
                }
            }
        }
    }
}

pub fn filter_bar(snapshot: &GridSnapshot) -> Markup {
    let filters = &snapshot.filters;
    html! {
        section class="filters" {
            nav class="views" {
                @for view in ViewMode::VARIANTS {
                    a.chip.active[filters.view == view] href=(filters.with_view(view).href()) {
                        (view.label())
                    }
                }
            }
            form class="search" method="get" action="/" {
                input type="search" name="search" placeholder="Search events..." value=(snapshot.search_input);
                (hidden_inputs(filters))
                button type="submit" { "Search" }
            }
            @if !snapshot.categories.is_empty() {
                nav class="categories" {
                    a.chip.active[filters.category.is_empty()] href=(filters.remove_category().href()) {
                        "All types"
                    }
                    @for category in &snapshot.categories {
                        a.chip.active[&filters.category == category] href=(filters.with_category(category.as_str()).href()) {
                            (category)
                        }
                    }
                }
            }
            nav class="sorts" {
                span { "Sort:" }
                @for sort in SortKey::VARIANTS {
                    a.chip.active[filters.sort == sort] href=(filters.with_sort(sort).href()) {
                        (sort.label())
                    }
                }
            }
            @if filters.active_filter_count() > 0 {
                div class="active-filters" {
                    @if !filters.search.is_empty() {
                        a class="chip removable" href=(filters.remove_search().href()) {
                            "Search: " (filters.search) " ×"
                        }
                    }
                    @if !filters.category.is_empty() {
                        a class="chip removable" href=(filters.remove_category().href()) {
                            "Type: " (filters.category) " ×"
                        }
                    }
                    a class="clear" href=(FilterState::clear().href()) { "Clear all" }
                }
            }
        }
    }
}

/// Everything but `search`, which the text input itself submits.
fn hidden_inputs(filters: &FilterState) -> Markup {
    html! {
        @if filters.view != ViewMode::default() {
            input type="hidden" name="view" value=(filters.view.as_param());
        }
        @if !filters.category.is_empty() {
            input type="hidden" name="type" value=(filters.category);
        }
        @if filters.sort != SortKey::default() {
            input type="hidden" name="sort" value=(filters.sort.as_param());
        }
    }
}

pub fn grid(snapshot: &GridSnapshot) -> Markup {
    let filters = &snapshot.filters;
    html! {
        section class="grid-section" {
            @if let Some(caption) = filters.view.caption() {
                p class="caption" { (caption) }
            }
            @match snapshot.phase() {
                GridPhase::Loading => {
                    div class="state loading" { "Loading events..." }
                }
                GridPhase::Failed(message) => {
                    div class="state error" {
                        p { (message) }
                        a class="retry" href=(snapshot.href) { "Try again" }
                    }
                }
                GridPhase::Empty => {
                    div class="state empty" {
                        p { "No events match your filters." }
                        @if !filters.is_default() {
                            a href=(FilterState::clear().href()) { "Clear filters" }
                        }
                    }
                }
                GridPhase::Results => {
                    p class="summary" {
                        "Showing " strong { (snapshot.summary.shown) } " events · "
                        (snapshot.summary.open) " open · "
                        (snapshot.summary.closing_soon) " closing soon"
                    }
                    div class="grid" {
                        @for event in &snapshot.events {
                            (event_card(event, filters, snapshot.notes_expanded(&event.id)))
                        }
                    }
                }
            }
        }
    }
}

pub fn event_card(event: &Event, filters: &FilterState, notes_expanded: bool) -> Markup {
    let badge = event.status_badge();
    let enrichment = event.enrichment.as_ref();
    html! {
        article class="card" data-id=(event.id) {
            div class="card-badges" {
                span class="type-badge" { (event.category) }
                @if let Some(badge) = badge {
                    (status_badge(badge, filters))
                }
            }
            h3 { a href=(event.path()) { (event.title()) } }
            p class="description" {
                (event.description().unwrap_or("No description available"))
            }
            @if let Some(notes) = event.comments.as_deref().filter(|c| !c.trim().is_empty()) {
                details class="notes" open[notes_expanded] {
                    summary { "Important notes" }
                    p { (notes) }
                }
            }
            dl class="facts" {
                dt { "When" } dd { (event.when.as_deref().filter(|w| !w.trim().is_empty()).unwrap_or("TBA")) }
                dt { "Price" } dd { (format::display_price(event.price.as_deref())) }
                dt { "Deadline" } dd {
                    @if event.deadline.is_some() {
                        (format::format_date(event.deadline.as_deref()))
                    } @else {
                        "No deadline"
                    }
                }
                dt { "Where" } dd {
                    (format::venue_label(event.has_steam_page.as_deref(), enrichment.and_then(|e| e.location.as_deref())))
                }
            }
            @if event.is_open() {
                @if let (Some(urgency), Some(label)) = (event.urgency(), format::days_left_label(event.days_to_submit)) {
                    div class={ "urgency " (urgency.as_str()) } { (label) }
                }
            }
            (external_links(event))
        }
    }
}

fn status_badge(badge: StatusBadge, filters: &FilterState) -> Markup {
    let pulse = matches!(badge, StatusBadge::ClosingSoon { pulse: true });
    html! {
        @match badge.view() {
            Some(view) => {
                a.status-badge.pulse[pulse] href=(filters.with_view(view).href()) { (badge.label()) }
            }
            None => {
                span class="status-badge closed" { (badge.label()) }
            }
        }
    }
}

fn external_links(event: &Event) -> Markup {
    html! {
        div class="links" {
            @if let Some(url) = event.submission_form.as_deref().filter(|u| is_link(u)) {
                a class="primary" href=(url) rel="noopener" target="_blank" { "Submit" }
            }
            @if let Some(url) = event.event_official_page.as_deref().filter(|u| is_link(u)) {
                a href=(url) rel="noopener" target="_blank" { "Website" }
            }
        }
    }
}

fn is_link(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

pub fn detail_page(event: &Event, now: DateTime<Utc>) -> Markup {
    let enrichment = event.enrichment.as_ref();
    let deadline = format::format_deadline(event.deadline.as_deref(), now);
    let filters = FilterState::default();

    let content = html! {
        article class="detail" {
            a class="back" href="/" { "← All events" }
            @if let Some(image) = enrichment.and_then(|e| e.image_url.as_deref()).filter(|u| is_link(u)) {
                img class="hero" src=(image) alt=(event.title());
            }
            div class="card-badges" {
                span class="type-badge" { (event.category) }
                @if let Some(badge) = event.status_badge() {
                    (status_badge(badge, &filters))
                }
            }
            h1 { (event.title()) }
            p class="description" {
                (event.description().unwrap_or("No description available"))
            }
            dl class="facts" {
                dt { "When" } dd { (event.when.as_deref().unwrap_or("TBA")) }
                dt { "Deadline" } dd {
                    (format::format_date(event.deadline.as_deref()))
                    @if !deadline.is_empty() {
                        " (" (deadline) ")"
                    }
                }
                dt { "Price" } dd { (format::display_price(event.price.as_deref())) }
                @if let Some(frequency) = event.frequency.as_deref() {
                    dt { "Frequency" } dd { (frequency) }
                }
                @if let Some(worth) = event.worth_it.as_deref() {
                    dt { "Worth it" } dd { (worth) }
                }
                dt { "Where" } dd {
                    (format::venue_label(event.has_steam_page.as_deref(), enrichment.and_then(|e| e.location.as_deref())))
                }
                @if let Some(organizer) = enrichment.and_then(|e| e.organizer.as_deref()) {
                    dt { "Organizer" } dd { (organizer) }
                }
            }
            @if let Some(notes) = event.comments.as_deref().filter(|c| !c.trim().is_empty()) {
                section class="notes" {
                    h2 { "Important notes" }
                    p { (notes) }
                }
            }
            (external_links(event))
            @if let Some(steam) = event.latest_steam_page.as_deref().filter(|u| is_link(u)) {
                p { a href=(steam) rel="noopener" target="_blank" { "Latest Steam page" } }
            }
        }
    };
    page(event.title(), content)
}

pub fn not_found_page() -> Markup {
    page(
        "Event Not Found",
        html! {
            section class="state empty" {
                h1 { "Event not found" }
                p { "It may have been removed or its link changed." }
                a href="/" { "Browse all events" }
            }
        },
    )
}

const PAGE_CSS: &str = r#"
:root{--bg:#0b0b14;--fg:#f4f4f8;--fg2:#a1a1b5;--accent:#a855f7;--border:rgba(255,255,255,.1);--ok:#22c55e;--warn:#f97316;--bad:#ef4444}
*{box-sizing:border-box;margin:0;padding:0}
body{background:var(--bg);color:var(--fg);font-family:system-ui,-apple-system,sans-serif;line-height:1.5}
a{color:var(--accent);text-decoration:none}
main{max-width:1200px;margin:0 auto;padding:1.5rem 1rem}
.site-header{display:flex;gap:1rem;align-items:baseline;padding:1rem 1.5rem;border-bottom:1px solid var(--border)}
.brand{font-weight:800;font-size:1.25rem;color:var(--fg)}
.tagline{color:var(--fg2);font-size:.9rem}
.stats{display:grid;grid-template-columns:repeat(auto-fit,minmax(160px,1fr));gap:1rem;margin-bottom:1.5rem}
.stat{border:1px solid var(--border);border-radius:12px;padding:1rem}
.stat-label{color:var(--fg2);font-size:.85rem}
.stat-value{font-size:1.75rem;font-weight:700}
.filters{display:flex;flex-direction:column;gap:.75rem;margin-bottom:1.5rem}
.views,.categories,.sorts,.active-filters{display:flex;flex-wrap:wrap;gap:.5rem;align-items:center}
.chip{border:1px solid var(--border);border-radius:999px;padding:.25rem .75rem;font-size:.85rem;color:var(--fg2)}
.chip.active{background:var(--accent);border-color:var(--accent);color:#fff}
.search{display:flex;gap:.5rem}
.search input{flex:1;padding:.5rem .75rem;border-radius:8px;border:1px solid var(--border);background:transparent;color:var(--fg)}
.search button{padding:.5rem 1rem;border-radius:8px;border:0;background:var(--accent);color:#fff}
.caption,.summary{color:var(--fg2);font-size:.9rem;margin-bottom:1rem}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(300px,1fr));gap:1rem}
.card{border:1px solid var(--border);border-radius:16px;padding:1.25rem;display:flex;flex-direction:column;gap:.75rem}
.card h3 a{color:var(--fg)}
.card-badges{display:flex;justify-content:space-between;gap:.5rem}
.type-badge,.status-badge{font-size:.75rem;font-weight:600;border-radius:999px;padding:.2rem .6rem;background:rgba(168,85,247,.2);color:var(--fg)}
.status-badge{background:var(--ok);color:#fff}
.status-badge.pulse{background:var(--bad);animation:pulse 1.5s infinite}
.status-badge.closed{background:#4b5563}
@keyframes pulse{50%{opacity:.6}}
.description{color:var(--fg2);font-size:.9rem}
.notes summary{color:#fbbf24;font-size:.8rem;cursor:pointer}
.facts{display:grid;grid-template-columns:auto 1fr;gap:.25rem .75rem;font-size:.85rem}
.facts dt{color:var(--fg2)}
.urgency{border-radius:10px;padding:.5rem .75rem;font-weight:700;font-size:.85rem}
.urgency.critical{background:rgba(239,68,68,.2)}
.urgency.soon{background:rgba(249,115,22,.2)}
.urgency.upcoming{background:rgba(234,179,8,.2)}
.urgency.normal{background:rgba(34,197,94,.2)}
.links{display:flex;gap:.75rem;margin-top:auto}
.links .primary{font-weight:700}
.state{text-align:center;padding:3rem 1rem;color:var(--fg2)}
.state.error p{color:var(--bad);margin-bottom:1rem}
.detail{display:flex;flex-direction:column;gap:1rem;max-width:760px}
.hero{width:100%;border-radius:16px}
.footer{text-align:center;color:var(--fg2);font-size:.8rem;padding:2rem 1rem}
"#;
