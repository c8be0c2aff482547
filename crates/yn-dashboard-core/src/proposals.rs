//! Governance proposal listing.
//!
//! Proposals are pulled newest-first in fixed-size pages until the node runs
//! out of pages, the working set reaches the cap, or the pages fall behind the
//! window below the latest proposal id. Each record is then normalized into a
//! [`Proposal`] regardless of which gov module shape it came in.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};
use yn_api_types::{NO_DESCRIPTION, Proposal, UNKNOWN_END_DATE, UNTITLED_PROPOSAL};
use yn_chain_client::{ChainClient, PageRequest, PageResponse};

use crate::error::{FetchError, Result};

pub const PAGE_SIZE: u64 = 50;
pub const MAX_PROPOSALS: usize = 100;
pub const DEFAULT_PROPOSAL_LIMIT: usize = 50;
/// Paging stops once a page reaches this far below the latest proposal id.
pub const LATEST_ID_WINDOW: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalQuery {
    pub limit: usize,
    pub page_size: u64,
    pub cap: usize,
    pub latest_id_window: Option<u64>,
}

impl Default for ProposalQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PROPOSAL_LIMIT,
            page_size: PAGE_SIZE,
            cap: MAX_PROPOSALS,
            latest_id_window: Some(LATEST_ID_WINDOW),
        }
    }
}

impl ProposalQuery {
    /// `limit` is clamped to `1..=MAX_PROPOSALS`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PROPOSALS),
            ..Self::default()
        }
    }
}

/// Shape of the proposal body.
#[derive(Debug, PartialEq)]
enum ProposalBody<'a> {
    /// v1beta1: `content.title` / `content.description`.
    Legacy {
        title: Option<&'a str>,
        description: Option<&'a str>,
    },
    /// v1: a list of messages; only the first is shown.
    Messages { first: &'a Value },
    Empty,
}

impl<'a> ProposalBody<'a> {
    fn classify(raw: &'a Value) -> Self {
        if let Some(content) = raw.get("content").filter(|content| content.is_object()) {
            return Self::Legacy {
                title: non_empty_str(content.get("title")),
                description: non_empty_str(content.get("description")),
            };
        }
        match raw.get("messages").and_then(Value::as_array).and_then(|m| m.first()) {
            Some(first) => Self::Messages { first },
            None => Self::Empty,
        }
    }

    fn title_and_description(&self) -> (String, String) {
        match self {
            Self::Legacy { title, description } => (
                title.unwrap_or(UNTITLED_PROPOSAL).to_owned(),
                description.unwrap_or(NO_DESCRIPTION).to_owned(),
            ),
            Self::Messages { first } => {
                let type_url = non_empty_str(first.get("@type")).unwrap_or("Unknown");
                (format!("Message Type: {type_url}"), format!("Details: {first}"))
            }
            Self::Empty => (UNTITLED_PROPOSAL.to_owned(), NO_DESCRIPTION.to_owned()),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `proposal_id` (v1beta1) or `id` (v1), as string or number.
fn proposal_id(raw: &Value) -> Option<String> {
    let value = raw.get("proposal_id").or_else(|| raw.get("id"))?;
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn numeric_id(raw: &Value) -> Option<u64> {
    proposal_id(raw).and_then(|id| id.parse().ok())
}

fn parse_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Voting end time and its display label. Zero-valued (pre-epoch) times
/// are what the node reports for proposals still in deposit.
fn voting_end(raw: &Value) -> (Option<DateTime<Utc>>, String) {
    match parse_time(raw.get("voting_end_time")).filter(|time| time.timestamp() > 0) {
        Some(time) => (Some(time), time.format("%Y-%m-%d %H:%M UTC").to_string()),
        None => (None, UNKNOWN_END_DATE.to_owned()),
    }
}

pub fn normalize_proposal(raw: Value) -> Result<Proposal> {
    let id = proposal_id(&raw).ok_or_else(|| FetchError::MalformedResponse("proposal has no id".to_owned()))?;
    let submit_time = parse_time(raw.get("submit_time"))
        .ok_or_else(|| FetchError::MalformedResponse(format!("proposal {id} has no valid submit_time")))?;

    let (title, description) = ProposalBody::classify(&raw).title_and_description();
    let (voting_end_time, voting_end_label) = voting_end(&raw);
    let status = raw
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    Ok(Proposal {
        id,
        title,
        description,
        status,
        voting_end_time,
        voting_end_label,
        submit_time,
        raw,
    })
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Newest first by submit time, ties broken by id.
fn newest_first(a: &Proposal, b: &Proposal) -> Ordering {
    b.submit_time
        .cmp(&a.submit_time)
        .then_with(|| compare_ids(&b.id, &a.id))
}

pub async fn fetch_proposals(client: &ChainClient, query: &ProposalQuery) -> Result<Vec<Proposal>> {
    let latest = client.gov_proposals(&PageRequest::descending(1)).await?;
    let Some(newest) = latest.proposals.first() else {
        info!("no governance proposals on {}", client.endpoint());
        return Ok(Vec::new());
    };
    let latest_id = numeric_id(newest);
    debug!("latest proposal id: {:?}", latest_id);

    let mut seen = HashSet::new();
    let mut collected = Vec::new();
    let mut next_key: Option<String> = None;

    loop {
        let request = PageRequest::descending(query.page_size).after(next_key.take());
        let page = client.gov_proposals(&request).await?;
        if page.proposals.is_empty() {
            break;
        }

        let oldest_in_page = page.proposals.iter().filter_map(numeric_id).min();
        let before = collected.len();
        for raw in page.proposals {
            let id = proposal_id(&raw)
                .ok_or_else(|| FetchError::MalformedResponse("proposal has no id".to_owned()))?;
            if seen.insert(id) {
                collected.push(raw);
            }
        }
        info!("fetched proposal page, {} collected so far", collected.len());

        if collected.len() == before {
            debug!("page added no new proposals; stopping");
            break;
        }
        if collected.len() >= query.cap {
            collected.truncate(query.cap);
            break;
        }
        if let (Some(window), Some(latest), Some(oldest)) = (query.latest_id_window, latest_id, oldest_in_page) {
            if latest >= window && oldest <= latest - window {
                break;
            }
        }
        match page.pagination.as_ref().and_then(PageResponse::next) {
            Some(key) => next_key = Some(key.to_owned()),
            None => break,
        }
    }

    let mut proposals = collected
        .into_iter()
        .map(normalize_proposal)
        .collect::<Result<Vec<_>>>()?;
    proposals.sort_by(newest_first);
    proposals.truncate(query.limit);
    Ok(proposals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use yn_api_types::ChainId;
    use yn_chain_client::{ChainQuerier, ContractRef, ProposalPage};

    fn legacy(id: u64, submitted: &str) -> Value {
        json!({
            "proposal_id": id.to_string(),
            "content": { "title": format!("Proposal {id}"), "description": "text" },
            "status": "PROPOSAL_STATUS_PASSED",
            "submit_time": submitted,
            "voting_end_time": "2024-08-01T12:30:00Z"
        })
    }

    /// Later ids were submitted later.
    fn submitted(id: u64) -> String {
        DateTime::from_timestamp(1_700_000_000 + id as i64, 0).unwrap().to_rfc3339()
    }

    /// Serves `total` proposals newest-first, `id` doubling as the page cursor.
    struct PagedQuerier {
        total: u64,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl PagedQuerier {
        fn new(total: u64) -> Self {
            Self {
                total,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainQuerier for PagedQuerier {
        async fn gov_proposals(&self, page: &PageRequest) -> yn_chain_client::Result<ProposalPage> {
            self.requests.lock().unwrap().push(page.clone());
            let start = page
                .key
                .as_deref()
                .map(|key| key.parse::<u64>().unwrap())
                .unwrap_or(self.total);
            let limit = page.limit.unwrap_or(100);
            let ids: Vec<u64> = (1..=start).rev().take(limit as usize).collect();
            let next_key = ids.last().filter(|last| **last > 1).map(|last| (last - 1).to_string());
            Ok(ProposalPage {
                proposals: ids
                    .iter()
                    .map(|id| legacy(*id, &submitted(*id)))
                    .collect(),
                pagination: Some(PageResponse { next_key, total: None }),
            })
        }

        async fn query_contract(&self, _contract: &ContractRef, _query: &Value) -> yn_chain_client::Result<Value> {
            unreachable!("not used")
        }
    }

    /// Returns the same non-empty page with a cursor forever.
    struct EndlessQuerier;

    #[async_trait]
    impl ChainQuerier for EndlessQuerier {
        async fn gov_proposals(&self, _page: &PageRequest) -> yn_chain_client::Result<ProposalPage> {
            Ok(ProposalPage {
                proposals: vec![legacy(7, "2024-01-01T00:00:00Z")],
                pagination: Some(PageResponse {
                    next_key: Some("again".to_owned()),
                    total: None,
                }),
            })
        }

        async fn query_contract(&self, _contract: &ContractRef, _query: &Value) -> yn_chain_client::Result<Value> {
            unreachable!("not used")
        }
    }

    fn client(querier: Arc<dyn ChainQuerier>) -> ChainClient {
        ChainClient::new("http://node", ChainId::secret(), querier)
    }

    #[test]
    fn legacy_fields_fall_back_individually() {
        let raw = json!({
            "proposal_id": "3",
            "content": { "title": "", "description": "Upgrade" },
            "submit_time": "2024-01-01T00:00:00Z"
        });
        let proposal = normalize_proposal(raw).unwrap();
        assert_eq!(proposal.title, UNTITLED_PROPOSAL);
        assert_eq!(proposal.description, "Upgrade");
        assert_eq!(proposal.voting_end_label, UNKNOWN_END_DATE);
    }

    #[test]
    fn message_proposals_show_first_message() {
        let raw = json!({
            "id": 12,
            "messages": [
                { "@type": "/cosmos.gov.v1.MsgExecLegacyContent", "authority": "secret10d07y" },
                { "@type": "/ignored" }
            ],
            "submit_time": "2024-05-05T10:00:00Z",
            "voting_end_time": "0001-01-01T00:00:00Z"
        });
        let proposal = normalize_proposal(raw).unwrap();
        assert_eq!(proposal.id, "12");
        assert_eq!(proposal.title, "Message Type: /cosmos.gov.v1.MsgExecLegacyContent");
        assert!(proposal.description.starts_with("Details: {"));
        assert!(proposal.description.contains("secret10d07y"));
        assert!(!proposal.description.contains("/ignored"));
        assert_eq!(proposal.voting_end_time, None);
    }

    #[test]
    fn untyped_message_is_unknown() {
        let raw = json!({ "id": "1", "messages": [{}], "submit_time": "2024-05-05T10:00:00Z" });
        assert_eq!(normalize_proposal(raw).unwrap().title, "Message Type: Unknown");
    }

    #[test]
    fn bodiless_proposal_gets_placeholders() {
        let raw = json!({ "proposal_id": "9", "messages": [], "submit_time": "2024-05-05T10:00:00Z" });
        let proposal = normalize_proposal(raw).unwrap();
        assert_eq!(proposal.title, UNTITLED_PROPOSAL);
        assert_eq!(proposal.description, NO_DESCRIPTION);
    }

    #[test]
    fn voting_end_is_labelled() {
        let proposal = normalize_proposal(legacy(1, "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(proposal.voting_end_label, "2024-08-01 12:30 UTC");
        assert!(proposal.voting_end_time.is_some());
    }

    #[test]
    fn missing_submit_time_is_malformed() {
        let raw = json!({ "proposal_id": "1", "content": {} });
        assert!(matches!(normalize_proposal(raw), Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(ProposalQuery::with_limit(0).limit, 1);
        assert_eq!(ProposalQuery::with_limit(500).limit, MAX_PROPOSALS);
        assert_eq!(ProposalQuery::with_limit(20).limit, 20);
    }

    #[tokio::test]
    async fn results_are_newest_first_and_limited() {
        let querier = Arc::new(PagedQuerier::new(30));
        let proposals = fetch_proposals(&client(querier), &ProposalQuery::with_limit(10))
            .await
            .unwrap();

        assert_eq!(proposals.len(), 10);
        assert_eq!(proposals[0].id, "30");
        assert!(proposals.windows(2).all(|w| w[0].submit_time >= w[1].submit_time));
    }

    #[tokio::test]
    async fn paging_never_exceeds_cap() {
        let querier = Arc::new(PagedQuerier::new(1_000));
        let query = ProposalQuery {
            latest_id_window: None,
            ..ProposalQuery::with_limit(MAX_PROPOSALS)
        };
        let proposals = fetch_proposals(&client(querier.clone()), &query).await.unwrap();

        assert_eq!(proposals.len(), MAX_PROPOSALS);
        let requests = querier.requests.lock().unwrap();
        assert_eq!(requests[0], PageRequest::descending(1));
        assert!(requests[1..].iter().all(|r| r.reverse && r.limit == Some(PAGE_SIZE)));
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn paging_stops_at_latest_id_window() {
        let querier = Arc::new(PagedQuerier::new(1_000));
        let query = ProposalQuery {
            page_size: 40,
            cap: 1_000,
            ..ProposalQuery::with_limit(MAX_PROPOSALS)
        };
        let proposals = fetch_proposals(&client(querier.clone()), &query).await.unwrap();

        // Pages of 40 from 1000: the third page reaches 881, below 1000 - 100.
        assert_eq!(querier.requests.lock().unwrap().len(), 4);
        assert_eq!(proposals.len(), MAX_PROPOSALS);
    }

    #[tokio::test]
    async fn endless_cursor_terminates() {
        let proposals = fetch_proposals(&client(Arc::new(EndlessQuerier)), &ProposalQuery::default())
            .await
            .unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].id, "7");
    }

    #[tokio::test]
    async fn short_history_is_returned_whole() {
        let proposals = fetch_proposals(&client(Arc::new(PagedQuerier::new(3))), &ProposalQuery::default())
            .await
            .unwrap();
        let ids: Vec<_> = proposals.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn empty_chain_yields_no_proposals() {
        let proposals = fetch_proposals(&client(Arc::new(PagedQuerier::new(0))), &ProposalQuery::default())
            .await
            .unwrap();
        assert!(proposals.is_empty());
    }
}
