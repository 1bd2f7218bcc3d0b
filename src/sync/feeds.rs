//! Declarative feed descriptors: the four built-in exports plus any
//! configured additional feeds, all processed through one code path.

use crate::config::Config;

/// One logical table to sync: where to fetch it and which key candidates the
/// source is known to use.
#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
    pub primary_key: Vec<String>,
    pub fallback_key: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Build the feed list for a run. Built-ins without a configured URL are
/// skipped; additional feeds carry whatever key the configuration declares
/// and have no fallback.
pub fn feeds_from_config(config: &Config) -> Vec<FeedSpec> {
    let mut feeds = Vec::new();

    if let Some(url) = &config.orders_url {
        feeds.push(FeedSpec {
            name: "orders".to_string(),
            url: url.clone(),
            primary_key: keys(&["code", "itemCode", "itemName"]),
            fallback_key: keys(&["code", "orderItemCode", "orderItemName"]),
        });
    }
    if let Some(url) = &config.products_url {
        feeds.push(FeedSpec {
            name: "products".to_string(),
            url: url.clone(),
            primary_key: keys(&["code"]),
            fallback_key: Vec::new(),
        });
    }
    if let Some(url) = &config.customers_url {
        feeds.push(FeedSpec {
            name: "customers".to_string(),
            url: url.clone(),
            primary_key: keys(&["accountGuid"]),
            fallback_key: Vec::new(),
        });
    }
    if let Some(url) = &config.stock_url {
        feeds.push(FeedSpec {
            name: "stocks".to_string(),
            url: url.clone(),
            primary_key: keys(&["itemCode"]),
            fallback_key: Vec::new(),
        });
    }

    for extra in &config.additional_data {
        feeds.push(FeedSpec {
            name: extra.name.clone(),
            url: extra.url.clone(),
            primary_key: extra.primary_key.clone(),
            fallback_key: Vec::new(),
        });
    }

    feeds
}
