//! Interaction probes shared by every record form
//!
//! Each probe encodes one of the application's widgets: the sidebar search,
//! autocomplete fields that resolve to a single record, and the filter
//! dropdowns behind a magnifier trigger.

use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::page::{ClickMode, Key, Locator, TextMatch};
use crate::selectors::{dropdown, form, search, search_input};
use crate::session::Session;
use crate::wait::poll_until;

/// Type a query into the sidebar search and submit it
pub async fn sidebar_search(session: &Session, query: &str) -> E2eResult<()> {
    let page = session.page();
    let input = search_input();
    session.wait_visible(&input, session.timeouts().element()).await?;
    page.fill(&input, "").await?;
    page.fill(&input, query).await?;
    page.press(&input, Key::Enter).await?;
    debug!("Searched for {:?}", query);
    Ok(())
}

/// Wait up to `window` for the first search result to match `pattern`
///
/// Only the first result is considered. A timeout means "no such record".
pub async fn await_search_result(
    session: &Session,
    pattern: &TextMatch,
    window: Duration,
) -> E2eResult<Locator> {
    let first = Locator::css(search::FIRST_RESULT).with_text(pattern.clone());
    let page = session.page();
    let probe = &first;
    poll_until(
        window,
        session.timeouts().poll_interval(),
        &format!("search result {}", pattern),
        move || async move { Ok(page.is_visible(probe).await?.then_some(())) },
    )
    .await?;
    Ok(first)
}

pub async fn select_search_result(session: &Session, result: &Locator) -> E2eResult<()> {
    session.page().click(result, ClickMode::Normal).await?;
    session.settle().await;
    Ok(())
}

/// Type into an autocomplete field and wait for it to settle on one record
///
/// The field carries the resolved record's text once exactly one record
/// matches; it is checked against `expected`, or the typed text when absent.
/// No match and several matches look the same from here.
pub async fn resolve_autocomplete(
    session: &Session,
    field: &Locator,
    text: &str,
    expected: Option<&TextMatch>,
) -> E2eResult<()> {
    let page = session.page();
    session.wait_visible(field, session.timeouts().element()).await?;
    page.fill(field, "").await?;
    page.type_keys(field, text).await?;

    let fallback = TextMatch::exact(text);
    let expected = expected.unwrap_or(&fallback);
    let result = poll_until(
        session.timeouts().autocomplete(),
        session.timeouts().poll_interval(),
        &format!("{} to resolve to {}", field, expected),
        move || async move {
            let resolved = page.attribute(field, form::RESOLVED_ATTR).await?;
            Ok(resolved.filter(|v| expected.is_match(v)).map(|_| ()))
        },
    )
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_timeout() => Err(E2eError::UnresolvedField {
            field: field.to_string(),
            text: text.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Open the filter dropdown of the widget whose id starts with `id_prefix`
pub async fn open_filter_dropdown(session: &Session, id_prefix: &str) -> E2eResult<()> {
    let trigger = Locator::id_prefix(id_prefix, Some(dropdown::TRIGGER));
    session.wait_visible(&trigger, session.timeouts().element()).await?;
    session.page().click(&trigger, ClickMode::Normal).await?;
    session
        .wait_visible(&Locator::css(dropdown::PANEL), session.timeouts().dropdown())
        .await?;
    session.settle().await;
    Ok(())
}

/// Click the first visible dropdown entry matching `filter`
///
/// The overlay reports itself unstable while it animates, so the click is
/// forced.
pub async fn select_first_filtered_item(session: &Session, filter: &TextMatch) -> E2eResult<()> {
    let item = Locator::css(dropdown::ITEM).with_text(filter.clone());
    session.wait_visible(&item, session.timeouts().dropdown()).await?;
    session.page().click(&item, ClickMode::Force).await
}

/// Open a filter dropdown, filter it by `text` and pick the first entry
///
/// The dropdown only renders its filtered list after a trailing space.
pub async fn pick_from_dropdown(session: &Session, id_prefix: &str, text: &str) -> E2eResult<()> {
    open_filter_dropdown(session, id_prefix).await?;
    let filter = Locator::css(dropdown::FILTER_INPUT);
    session.page().type_keys(&filter, &format!("{} ", text)).await?;
    let wanted = TextMatch::ContainsIgnoreCase(text.to_string());
    match select_first_filtered_item(session, &wanted).await {
        Err(e) if e.is_timeout() => Err(E2eError::UnresolvedField {
            field: id_prefix.to_string(),
            text: text.to_string(),
        }),
        other => other,
    }
}

/// Enter each tag as its own chip
pub async fn enter_tags(session: &Session, field: &Locator, tags: &[String]) -> E2eResult<()> {
    let page = session.page();
    for tag in tags {
        page.type_keys(field, tag).await?;
        page.press(field, Key::Enter).await?;
    }
    Ok(())
}
