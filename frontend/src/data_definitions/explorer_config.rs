//! Explorer settings read from the environment.

use std::time::Duration;

use anyhow::Context;
use common::{
    explorer_const::{FILTER_INPUT_DEBOUNCE_MS, MAX_CONCURRENT_REQUESTS, PAGE_SIZE},
    explorer_result::InitializeArgs,
};

use crate::data_definitions::url_param::UrlParam;

pub const DEFAULT_DATA_SETS_URL: &str = "http://localhost:5000/data-sets";

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub page_size: u64,
    pub max_concurrent_requests: usize,
    pub filter_debounce: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DATA_SETS_URL.to_string(),
            page_size: PAGE_SIZE,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            filter_debounce: Duration::from_millis(FILTER_INPUT_DEBOUNCE_MS),
        }
    }
}

impl ExplorerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let page_size = parse_var(&lookup, "EXPLORER_PAGE_SIZE")?.unwrap_or(defaults.page_size);
        if page_size == 0 {
            anyhow::bail!("EXPLORER_PAGE_SIZE must be at least 1");
        }
        let max_concurrent_requests =
            parse_var(&lookup, "EXPLORER_MAX_CONCURRENT_REQUESTS")?.unwrap_or(defaults.max_concurrent_requests);
        if max_concurrent_requests == 0 {
            anyhow::bail!("EXPLORER_MAX_CONCURRENT_REQUESTS must be at least 1");
        }
        let filter_debounce = parse_var::<u64>(&lookup, "EXPLORER_FILTER_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.filter_debounce);
        Ok(Self {
            base_url: lookup("DATA_SETS_URL").unwrap_or(defaults.base_url),
            page_size,
            max_concurrent_requests,
            filter_debounce,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => {
            let value = raw.trim().parse::<T>().with_context(|| format!("invalid {name}: {raw:?}"))?;
            Ok(Some(value))
        }
    }
}

/// The page to open: a share link in `EXPLORER_INIT_ARGS`, else `DATA_SET_ID` with an optional `QUERY_ID`.
pub fn init_args_from_env() -> anyhow::Result<InitializeArgs> {
    init_args_from_lookup(|name| std::env::var(name).ok())
}

pub fn init_args_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<InitializeArgs> {
    if let Some(link) = lookup("EXPLORER_INIT_ARGS") {
        let args: UrlParam<InitializeArgs> = link.parse().context("invalid EXPLORER_INIT_ARGS")?;
        return Ok(args.into_inner());
    }
    let Some(data_set_id) = lookup("DATA_SET_ID").filter(|id| !id.trim().is_empty()) else {
        anyhow::bail!("set DATA_SET_ID or EXPLORER_INIT_ARGS to pick a data set");
    };
    Ok(InitializeArgs {
        data_set_id,
        query_id: lookup("QUERY_ID").filter(|id| !id.trim().is_empty()),
        query: None,
    })
}
