use sea_orm::{ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageQuery {
    pub fn resolve(&self, config: &AppConfig) -> Result<PageRequest, AppError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::invalid_page());
        }
        let page_size = self
            .page_size
            .filter(|s| *s > 0)
            .unwrap_or(config.page_size)
            .min(config.max_page_size);
        Ok(PageRequest { page, page_size })
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub total_pages: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            total_pages: self.total_pages,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Fetches one page of `select`. Links are relative to `path`.
pub async fn fetch_page<'db, C, E>(
    db: &'db C,
    select: Select<E>,
    req: PageRequest,
    path: &str,
) -> Result<Page<E::Model>, AppError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync + 'db,
{
    let paginator = select.paginate(db, req.page_size);
    let totals = paginator.num_items_and_pages().await?;
    check_in_range(req.page, totals.number_of_items, totals.number_of_pages)?;
    let results = paginator.fetch_page(req.page - 1).await?;

    Ok(Page {
        count: totals.number_of_items,
        total_pages: totals.number_of_pages,
        next: (req.page < totals.number_of_pages).then(|| page_link(path, req.page + 1, req.page_size)),
        previous: (req.page > 1).then(|| page_link(path, req.page - 1, req.page_size)),
        results,
    })
}

/// The first page always exists, even when empty.
fn check_in_range(page: u64, items: u64, pages: u64) -> Result<(), AppError> {
    if page == 1 || (items > 0 && page <= pages) {
        Ok(())
    } else {
        Err(AppError::invalid_page())
    }
}

fn page_link(path: &str, page: u64, page_size: u64) -> String {
    format!("{}?page={}&page_size={}", path, page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps_page_size() {
        let config = AppConfig::for_tests();
        let req = PageQuery::default().resolve(&config).unwrap();
        assert_eq!(req, PageRequest { page: 1, page_size: 10 });

        let req = PageQuery { page: Some(3), page_size: Some(1000) }.resolve(&config).unwrap();
        assert_eq!(req, PageRequest { page: 3, page_size: 100 });

        assert!(PageQuery { page: Some(0), page_size: None }.resolve(&config).is_err());
    }

    #[test]
    fn range_check() {
        assert!(check_in_range(1, 0, 0).is_ok());
        assert!(check_in_range(2, 15, 2).is_ok());
        assert!(check_in_range(3, 15, 2).is_err());
        assert!(check_in_range(2, 0, 0).is_err());
    }

    #[test]
    fn map_keeps_links() {
        let page = Page {
            count: 1,
            total_pages: 1,
            next: None,
            previous: Some(page_link("/api/v1/movie/movies_list/", 1, 10)),
            results: vec![2],
        };
        let mapped = page.map(|v| v * 10);
        assert_eq!(mapped.results, vec![20]);
        assert_eq!(
            mapped.previous.as_deref(),
            Some("/api/v1/movie/movies_list/?page=1&page_size=10")
        );
    }
}
