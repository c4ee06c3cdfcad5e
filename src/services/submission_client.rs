use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use tracing::{info, instrument, warn};

use crate::models::{INVALID_TOKEN_DETAIL, SubmissionMap, SubmissionsEnvelope};
use crate::services::submission_state::{FetchOutcome, FetchTicket};

pub const FETCH_FAILED_MESSAGE: &str = "Error fetching submissions";
pub const LOAD_FAILED_FALLBACK: &str = "Failed to load submissions";

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub api_base_url: String,
    pub league_id: String,
    pub token: String,
    pub timeout: Duration,
    pub user_agent: String,
}

pub enum LoaderEvent {
    Finished {
        ticket: FetchTicket,
        outcome: FetchOutcome,
    },
}

/// `{api_base_url}/user/get-league-submissions/{league_id}`, with the league id
/// encoded as a single path segment.
pub fn submissions_url(api_base_url: &str, league_id: &str) -> Result<Url> {
    let mut url = Url::parse(api_base_url)
        .with_context(|| format!("invalid API base URL: {api_base_url}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("API base URL cannot carry a path: {api_base_url}"))?
        .pop_if_empty()
        .extend(["user", "get-league-submissions", league_id]);
    Ok(url)
}

/// The body is parsed whatever the HTTP status; the envelope decides the outcome.
#[instrument(skip(client, request), fields(league_id = %request.league_id))]
pub async fn fetch_league_submissions(
    client: &Client,
    request: &FetchRequest,
) -> Result<SubmissionsEnvelope> {
    let url = submissions_url(&request.api_base_url, &request.league_id)?;

    let response = client
        .get(url.clone())
        .bearer_auth(&request.token)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;

    let status = response.status();
    let envelope = response
        .json::<SubmissionsEnvelope>()
        .await
        .with_context(|| format!("GET {url} returned {status} with an unreadable body"))?;

    info!("GET {} -> {}", url, status);
    Ok(envelope)
}

pub fn interpret_envelope(envelope: SubmissionsEnvelope) -> FetchOutcome {
    if envelope.status.as_deref() == Some("success") {
        return FetchOutcome::Loaded(envelope.data.unwrap_or_else(SubmissionMap::new));
    }
    if envelope.detail.as_deref() == Some(INVALID_TOKEN_DETAIL) {
        return FetchOutcome::InvalidToken;
    }
    FetchOutcome::Failed(
        envelope
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| LOAD_FAILED_FALLBACK.to_string()),
    )
}

fn build_client(request: &FetchRequest) -> Result<Client> {
    Client::builder()
        .user_agent(request.user_agent.as_str())
        .timeout(request.timeout)
        .build()
        .context("failed to build HTTP client")
}

pub async fn load_submissions(request: &FetchRequest) -> FetchOutcome {
    let result = match build_client(request) {
        Ok(client) => fetch_league_submissions(&client, request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(envelope) => interpret_envelope(envelope),
        Err(err) => {
            warn!("Fetching submissions for league {} failed: {err:#}", request.league_id);
            FetchOutcome::Failed(FETCH_FAILED_MESSAGE.to_string())
        }
    }
}

/// Runs one fetch on a worker thread; the receiver yields a single `Finished` event.
pub fn spawn_submission_fetch(ticket: FetchTicket, request: FetchRequest) -> Receiver<LoaderEvent> {
    let (tx, rx) = mpsc::channel::<LoaderEvent>();

    thread::spawn(move || {
        info!(
            "Fetch {} started for league {}",
            ticket.value(),
            request.league_id
        );
        let outcome = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(load_submissions(&request)),
            Err(err) => {
                warn!("failed to initialize fetch runtime: {err}");
                FetchOutcome::Failed(FETCH_FAILED_MESSAGE.to_string())
            }
        };
        let _ = tx.send(LoaderEvent::Finished { ticket, outcome });
    });

    rx
}
