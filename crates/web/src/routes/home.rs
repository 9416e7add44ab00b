//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::Page;
use crate::state::AppState;
use crate::supabase::{BackendError, EQUIPMENT_LISTINGS, LAND_LISTINGS, PRODUCE_LISTINGS, PROFILES};

/// One headline figure on the landing page.
#[derive(Clone)]
pub struct StatView {
    pub label: &'static str,
    pub value: String,
}

impl StatView {
    fn new(label: &'static str, count: Result<u64, BackendError>) -> Self {
        let value = match count {
            Ok(n) => n.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, stat = label, "Failed to load landing page count");
                "-".to_string()
            }
        };
        Self { label, value }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub stats: Vec<StatView>,
}

/// Display the landing page with live marketplace counts.
///
/// A failed count shows as `-`; the page still renders.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: Page) -> impl IntoResponse {
    let backend = state.backend();
    let (produce, profiles, plots, equipment) = tokio::join!(
        backend.count(PRODUCE_LISTINGS),
        backend.count(PROFILES),
        backend.count(LAND_LISTINGS),
        backend.count(EQUIPMENT_LISTINGS),
    );

    HomeTemplate {
        page,
        stats: vec![
            StatView::new("Fresh produce listings", produce),
            StatView::new("Community members", profiles),
            StatView::new("Land plots", plots),
            StatView::new("Equipment items", equipment),
        ],
    }
}
