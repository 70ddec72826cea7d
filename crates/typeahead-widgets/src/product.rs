//! Product search variant (storefront)
//!
//! Delegates to the engine's product specialisation (which pins the
//! `product` provider and attaches cart and recent-view metadata) and
//! renders rows with image, price, and stock. An empty result set falls
//! back to a configured popular-products list so the popup is never a
//! dead end on a storefront.

use async_trait::async_trait;
use typeahead_core::{CompletionEngine, CompletionItem, RequestOptions, Result};

use crate::base::WidgetVariant;
use crate::options::WidgetOptions;
use crate::render::{highlight_ranges, ResultRow};

/// Product search variant
#[derive(Default)]
pub struct ProductSearchVariant {
    popular: Vec<CompletionItem>,
}

impl ProductSearchVariant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the popular-products fallback shown on empty results
    pub fn with_popular(mut self, popular: Vec<CompletionItem>) -> Self {
        self.popular = popular;
        self
    }

    fn price_label(details: &typeahead_core::ProductDetails) -> Option<String> {
        match (details.price, details.sale_price) {
            (Some(price), Some(sale)) if sale < price => {
                Some(format!("${sale:.2} (was ${price:.2})"))
            }
            (Some(price), _) => Some(format!("${price:.2}")),
            (None, Some(sale)) => Some(format!("${sale:.2}")),
            (None, None) => None,
        }
    }

    fn stock_badge(details: &typeahead_core::ProductDetails) -> Option<String> {
        details.stock.map(|stock| {
            if stock > 0 {
                "in stock".to_string()
            } else {
                "out of stock".to_string()
            }
        })
    }
}

#[async_trait]
impl WidgetVariant for ProductSearchVariant {
    fn kind(&self) -> &'static str {
        "product-search"
    }

    fn provider_types(&self) -> Option<Vec<String>> {
        Some(vec!["product".to_string()])
    }

    fn render_row(&self, item: &CompletionItem, query: &str, options: &WidgetOptions) -> ResultRow {
        let details = item.product_details();

        ResultRow {
            primary: item.text.clone(),
            secondary: if options.show_descriptions {
                details
                    .as_ref()
                    .and_then(|d| d.category.clone())
                    .or_else(|| item.description.clone())
            } else {
                None
            },
            image_url: if options.show_images {
                details.as_ref().and_then(|d| d.image.clone())
            } else {
                None
            },
            price_label: details.as_ref().and_then(Self::price_label),
            badge: details.as_ref().and_then(Self::stock_badge),
            highlight: if options.highlight_matches {
                highlight_ranges(&item.text, query)
            } else {
                Vec::new()
            },
            css_class: format!("{}-product", options.class_prefix),
        }
    }

    async fn perform_search(
        &self,
        query: &str,
        engine: &CompletionEngine,
        options: &WidgetOptions,
    ) -> Result<Vec<CompletionItem>> {
        let request = RequestOptions::default().with_max_results(options.max_results);
        let response = engine.request_product_completions(query, &request).await?;

        if response.completions.is_empty() && !self.popular.is_empty() {
            let mut fallback = self.popular.clone();
            fallback.truncate(options.max_results);
            return Ok(fallback);
        }

        Ok(response.completions)
    }
}
