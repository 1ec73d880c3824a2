//! The asynchronous generation task and its pluggable token counter.

use std::sync::{Arc, Mutex, OnceLock};

use tiktoken_rs::CoreBPE;

use super::events::{GeneratedContext, StatusMessage, UserEvent};
use super::helpers::{notify_state, send_status};
use super::host::HostServices;
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::{
    ContextOptions, ContextRequest, ContextSerializer, CoreError, SelectionSet, TreeEntry,
};

/// Counts tokens of a generated document.
pub trait Tokenizer: Send + Sync + 'static {
    /// `None` when the count is unavailable.
    fn count_tokens(&self, text: &str) -> Option<usize>;
}

/// Counts with the `cl100k_base` encoding.
pub struct RealTokenizer;

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

impl Tokenizer for RealTokenizer {
    fn count_tokens(&self, text: &str) -> Option<usize> {
        let bpe = CL100K.get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                tracing::warn!("Token counting unavailable: {}", e);
                None
            }
        });
        bpe.as_ref()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
    }
}

/// Everything a generation needs, captured from the state when it starts.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub session: u64,
    pub root_dir: String,
    pub tree: Vec<TreeEntry>,
    pub selection: SelectionSet,
    pub summary: String,
    pub options: ContextOptions,
    pub paths: Vec<String>,
    pub count_tokens: bool,
    pub copy_on_generate: bool,
}

impl GenerationRequest {
    /// Validates the state and snapshots it. No host call happens before this succeeds.
    pub fn capture(state: &AppState) -> Result<Self, CoreError> {
        let root =
            ContextSerializer::validate(state.root_dir.as_deref(), &state.selection)?.to_string();
        let options = state.config.context.clone();
        Ok(Self {
            session: state.session,
            root_dir: root,
            paths: ContextSerializer::paths_to_fetch(&state.tree, &state.selection, &options),
            tree: state.tree.clone(),
            selection: state.selection.clone(),
            summary: state.summary.clone(),
            options,
            count_tokens: state.config.count_tokens,
            copy_on_generate: state.config.copy_on_generate,
        })
    }
}

/// Fetches the selected contents and publishes the assembled document.
///
/// Results that arrive after the session or root directory changed are dropped.
pub async fn generation_task<H, P, T>(
    host: Arc<H>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
    request: GenerationRequest,
    tokenizer: T,
) where
    H: HostServices + ?Sized,
    P: EventProxy,
    T: Tokenizer,
{
    tracing::info!(
        "Fetching {} files for session {} ({})",
        request.paths.len(),
        request.session,
        request.root_dir
    );
    let fetched = host
        .fetch_file_contents(&request.root_dir, &request.paths)
        .await;

    let fetched = match fetched {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Content fetch failed: {:#}", e);
            fail_generation(
                &state,
                &proxy,
                &request,
                format!("Failed to read file contents: {e}"),
            );
            return;
        }
    };

    let context_request = ContextRequest {
        root_dir: Some(&request.root_dir),
        tree: &request.tree,
        selection: &request.selection,
        summary: &request.summary,
        options: &request.options,
    };
    let document = match ContextSerializer::build_context_document(&context_request, &fetched) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!("Context assembly failed: {}", e);
            fail_generation(&state, &proxy, &request, e.to_string());
            return;
        }
    };

    let token_count = if request.count_tokens {
        tokenizer.count_tokens(&document.document)
    } else {
        None
    };
    let generated = GeneratedContext {
        file_count: ContextSerializer::collect_selected_files(&request.tree, &request.selection)
            .len(),
        byte_count: document.document.len(),
        line_count: document.document.lines().count(),
        token_count,
        document: document.document,
        file_map: document.file_map,
        file_contents: document.file_contents,
    };

    {
        let mut state_guard = state
            .lock()
            .expect("Mutex was poisoned. This should not happen.");
        if !state_guard.generation_is_current(request.session, &request.root_dir) {
            tracing::warn!(
                "Discarding stale generation results for {} (session {} is no longer current)",
                request.root_dir,
                request.session
            );
            return;
        }
        state_guard.is_generating = false;
        state_guard.generation_task = None;
        state_guard.last_output = Some(generated.clone());
        notify_state(&state_guard, &proxy);
    }

    tracing::info!(
        "Generated context: {} files, {} bytes",
        generated.file_count,
        generated.byte_count
    );
    let document = generated.document.clone();
    proxy.send_event(UserEvent::ShowGeneratedContent(Box::new(generated)));

    if request.copy_on_generate {
        copy_with_status(host.as_ref(), &proxy, &document).await;
    }
}

/// Ends a failed generation: clears the generating flag and reports `message`.
///
/// A failure from a replaced session is only logged.
fn fail_generation<P: EventProxy>(
    state: &Mutex<AppState>,
    proxy: &P,
    request: &GenerationRequest,
    message: String,
) {
    let mut state_guard = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.");
    if !state_guard.generation_is_current(request.session, &request.root_dir) {
        tracing::warn!("Discarding stale generation failure for {}", request.root_dir);
        return;
    }
    state_guard.is_generating = false;
    state_guard.generation_task = None;
    notify_state(&state_guard, proxy);
    drop(state_guard);
    send_status(proxy, StatusMessage::error(message));
}

/// Copies `text` through the host and reports the outcome to the UI.
pub async fn copy_with_status<H, P>(host: &H, proxy: &P, text: &str)
where
    H: HostServices + ?Sized,
    P: EventProxy,
{
    match host.copy_to_clipboard(text).await {
        Ok(()) => {
            proxy.send_event(UserEvent::CopyComplete(true));
            send_status(proxy, StatusMessage::success("Context copied to clipboard!"));
        }
        Err(e) => {
            tracing::error!("Clipboard copy failed: {:#}", e);
            proxy.send_event(UserEvent::CopyComplete(false));
            send_status(
                proxy,
                StatusMessage::error(format!("Failed to copy to clipboard: {e}")),
            );
        }
    }
}
