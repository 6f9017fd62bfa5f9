use std::future::Future;

use log::{debug, warn};

use crate::api::Result;
use crate::config::PageLimits;

pub const FIRST_PAGE_NUMBER: u32 = 1;

/// Hands out page numbers until the page cap is reached.
#[derive(Debug)]
struct Paginator {
    page_no: u32,
    limits: PageLimits,
}

impl Paginator {
    fn new(limits: PageLimits) -> Self {
        Paginator {
            page_no: FIRST_PAGE_NUMBER,
            limits,
        }
    }

    fn next_page(&mut self) -> Option<u32> {
        if self.page_no >= FIRST_PAGE_NUMBER + self.limits.max_pages {
            return None;
        }
        let page_no = self.page_no;
        self.page_no += 1;
        Some(page_no)
    }

    fn capped(&self) -> bool {
        self.page_no >= FIRST_PAGE_NUMBER + self.limits.max_pages
    }
}

/// Fetches pages sequentially and concatenates their items.
///
/// Stops on the first failed or empty page, on a page shorter than `limits.per_page`, and on the
/// page cap. Hitting the cap truncates the listing, which is only logged.
pub async fn collect_pages<T, F, Fut>(label: &str, limits: PageLimits, fetch_page: F) -> Vec<T>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    collect_filtered_pages(label, limits, None, fetch_page, |_| true).await
}

/// Like [`collect_pages`], but keeps only items passing `keep`.
///
/// Page length checks use the unfiltered page, `max_items` bounds the kept items.
pub async fn collect_filtered_pages<T, F, Fut, K>(
    label: &str,
    limits: PageLimits,
    max_items: Option<usize>,
    mut fetch_page: F,
    mut keep: K,
) -> Vec<T>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
    K: FnMut(&T) -> bool,
{
    let mut paginator = Paginator::new(limits);
    let mut items = Vec::new();
    while let Some(page_no) = paginator.next_page() {
        let page = match fetch_page(page_no, limits.per_page).await {
            Ok(page) => page,
            Err(err) => {
                warn!("Failed to get page {} of {}: {}", page_no, label, err);
                break;
            }
        };
        let page_len = page.len();
        debug!("Page {} of {}: {} items", page_no, label, page_len);
        if page_len == 0 {
            break;
        }
        items.extend(page.into_iter().filter(|item| keep(item)));
        if let Some(max_items) = max_items {
            if items.len() >= max_items {
                debug!("Collected {} of {}, limit reached", max_items, label);
                items.truncate(max_items);
                break;
            }
        }
        if page_len < limits.per_page as usize {
            break;
        }
        if paginator.capped() {
            warn!(
                "Reached the limit of {} pages for {}, remaining items are skipped",
                limits.max_pages, label
            );
        }
    }
    items
}
