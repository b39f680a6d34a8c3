use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{SwarmError, SwarmResult};
use crate::{ActionResult, RequestFailure};

pub const SEARCH_TERMS: [&str; 6] = ["apple", "juice", "lemon", "banana", "shirt", "sticker"];
pub const PRODUCT_ID_MIN: u32 = 1;
pub const PRODUCT_ID_MAX: u32 = 20;

/// 가상 유저가 수행하는 행동 (요청 하나 = 행동 하나)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Homepage,
    ListProducts,
    /// 고정 어휘 중 하나로 검색
    SearchProducts { terms: Vec<String> },
    /// [min_id, max_id] 범위의 상품 상세 조회
    ProductDetails { min_id: u32, max_id: u32 },
}

impl Action {
    pub fn search_products() -> Self {
        Action::SearchProducts {
            terms: SEARCH_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn product_details() -> Self {
        Action::ProductDetails {
            min_id: PRODUCT_ID_MIN,
            max_id: PRODUCT_ID_MAX,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Homepage => "homepage",
            Action::ListProducts => "list_products",
            Action::SearchProducts { .. } => "search_products",
            Action::ProductDetails { .. } => "product_details",
        }
    }

    /// Aggregation label. Parameterized paths share one label.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Homepage => "GET /",
            Action::ListProducts => "GET /rest/products",
            Action::SearchProducts { .. } => "GET /rest/products/search",
            Action::ProductDetails { .. } => "GET /rest/products/:id",
        }
    }

    pub fn validate(&self) -> SwarmResult<()> {
        match self {
            Action::Homepage | Action::ListProducts => Ok(()),
            Action::SearchProducts { terms } => {
                if terms.is_empty() {
                    return Err(SwarmError::invalid_profile(
                        "search_products needs at least one term",
                    ));
                }
                Ok(())
            }
            Action::ProductDetails { min_id, max_id } => {
                if min_id > max_id {
                    return Err(SwarmError::invalid_profile(format!(
                        "product_details id range [{}, {}] is empty",
                        min_id, max_id
                    )));
                }
                Ok(())
            }
        }
    }

    /// Draws the action's random parameters and builds the concrete request.
    pub fn request<R: Rng>(&self, rng: &mut R) -> ActionRequest {
        match self {
            Action::Homepage => ActionRequest::new(self.label(), "/"),
            Action::ListProducts => ActionRequest::new(self.label(), "/rest/products"),
            Action::SearchProducts { terms } => {
                // validate() guarantees a non-empty vocabulary
                let term = terms.choose(rng).cloned().unwrap_or_default();
                ActionRequest::new(self.label(), "/rest/products/search").with_query("q", term)
            }
            Action::ProductDetails { min_id, max_id } => {
                let id = rng.gen_range(*min_id..=*max_id);
                ActionRequest::new(self.label(), format!("/rest/products/{}", id))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub label: &'static str,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl ActionRequest {
    fn new(label: &'static str, path: impl Into<String>) -> Self {
        Self {
            label,
            path: path.into(),
            query: Vec::new(),
        }
    }

    fn with_query(mut self, key: &'static str, value: String) -> Self {
        self.query.push((key, value));
        self
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }

    /// Issues the GET and drains the body. Returns the status on 2xx.
    pub async fn send(&self, client: &reqwest::Client, base_url: &str) -> ActionResult {
        let mut builder = client.get(self.url(base_url));
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| RequestFailure::from_reqwest(&e))?;
        let status = resp.status();

        // 응답 시간에 본문 수신까지 포함
        resp.bytes()
            .await
            .map_err(|e| RequestFailure::from_reqwest(&e))?;

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            debug!("{} {} -> {}", self.label, self.path, status);
            Err(RequestFailure::Status(status.as_u16()))
        }
    }
}
