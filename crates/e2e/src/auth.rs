//! Login and logout

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{ClickMode, Locator, TextMatch};
use crate::selectors::{login, toast};
use crate::session::Session;
use crate::wait::{poll_until, wait_url};

/// What the application shows after the credentials are submitted
#[derive(Debug, Clone, PartialEq, Eq)]
enum AfterSubmit {
    LocationPrompt,
    Home,
    Rejected(String),
}

fn is_root(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| u.path() == "/" || u.path().is_empty())
        .unwrap_or(false)
}

async fn detect_fields(session: &Session) -> E2eResult<login::LoginFields> {
    let page = session.page();
    poll_until(
        session.timeouts().navigation(),
        session.timeouts().poll_interval(),
        "login form",
        move || async move {
            for fields in login::FIELD_SETS {
                if page.is_visible(&Locator::css(fields.email)).await? {
                    return Ok(Some(fields));
                }
            }
            Ok(None)
        },
    )
    .await
}

async fn after_submit(session: &Session) -> E2eResult<Option<AfterSubmit>> {
    let page = session.page();
    let heading = Locator::css(login::LOCATION_HEADING)
        .with_text(TextMatch::ContainsIgnoreCase(login::LOCATION_HEADING_TEXT.to_string()));
    let error = Locator::css(toast::ERROR);
    let (heading, error) = (&heading, &error);
    let seen = poll_until(
        session.timeouts().location_prompt(),
        session.timeouts().poll_interval(),
        "location prompt or home page",
        move || async move {
            if page.is_visible(error).await? {
                let message = page.text(error).await?.unwrap_or_default();
                return Ok(Some(AfterSubmit::Rejected(message.trim().to_string())));
            }
            if page.is_visible(heading).await? {
                return Ok(Some(AfterSubmit::LocationPrompt));
            }
            if is_root(&page.current_url().await?) {
                return Ok(Some(AfterSubmit::Home));
            }
            Ok(None)
        },
    )
    .await;
    match seen {
        Ok(state) => Ok(Some(state)),
        Err(e) if e.is_timeout() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Log in once with the configured credentials and location
pub async fn login(session: &Session) -> E2eResult<()> {
    let config = &session.config;
    let page = session.page();

    session.goto_path(&config.app.login_path).await?;
    let fields = detect_fields(session).await?;
    debug!("Login form uses {}", fields.email);

    page.fill(&Locator::css(fields.email), &config.credentials.email).await?;
    page.fill(&Locator::css(fields.password), &config.credentials.password).await?;
    page.click(&Locator::css(login::SUBMIT), ClickMode::Normal).await?;

    match after_submit(session).await? {
        Some(AfterSubmit::Rejected(message)) => {
            return Err(E2eError::AssertionFailed(format!("login rejected: {}", message)))
        }
        Some(AfterSubmit::Home) => {
            info!("Logged in as {}", config.credentials.email);
            return Ok(());
        }
        Some(AfterSubmit::LocationPrompt) => {
            let option = Locator::css(login::LOCATION_OPTION)
                .with_text(TextMatch::contains(config.location.clone()));
            session.wait_visible(&option, session.timeouts().element()).await?;
            page.click(&option, ClickMode::Normal).await?;
            debug!("Selected location {}", config.location);
        }
        None => debug!("No location prompt"),
    }

    wait_url(
        page,
        session.timeouts().navigation(),
        session.timeouts().poll_interval(),
        "redirect to home page",
        is_root,
    )
    .await?;
    info!("Logged in as {} at {}", config.credentials.email, config.location);
    Ok(())
}

/// Log in, re-running the whole sequence on failure with a fixed delay
pub async fn login_with_retry(session: &Session) -> E2eResult<()> {
    let retry = &session.config.retry;
    let attempts = retry.login_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match login(session).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!("Login attempt {}/{} failed: {}", attempt, attempts, e);
                last_error = e.to_string();
                if attempt < attempts {
                    sleep(retry.login_delay()).await;
                }
            }
        }
    }

    Err(E2eError::Login {
        attempts,
        last_error,
    })
}

/// Log out and wait for the login page with `sso=0`
pub async fn logout(session: &Session) -> E2eResult<()> {
    let page = session.page();
    let menu = Locator::css(login::USER_MENU);
    session.wait_visible(&menu, session.timeouts().element()).await?;
    page.click(&menu, ClickMode::Normal).await?;

    let item = Locator::css(login::LOGOUT);
    session.wait_visible(&item, session.timeouts().element()).await?;
    page.click(&item, ClickMode::Normal).await?;

    let login_path = session.config.app.login_path.clone();
    wait_url(
        page,
        session.timeouts().navigation(),
        session.timeouts().poll_interval(),
        "redirect to login page",
        move |url| url.contains(&login_path) && url.contains(login::LOGOUT_QUERY),
    )
    .await?;
    info!("Logged out");
    Ok(())
}
