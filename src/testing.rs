//! Test infrastructure: scripted generation provider and store fixtures.
//!
//! `MockGenerationProvider` replays a queue of scripted replies so tests can
//! drive the brainstorm flow through success, failure, retry, and
//! cancellation paths without touching the network. The store fixture opens
//! a real sqlite database on a temp file, so store-backed tests exercise the
//! same SQL the production path runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::brainstorm::BrainstormService;
use crate::config::BrainstormConfig;
use crate::providers::{
    GenerationProvider, GenerationReply, GenerationRequest, ProviderError, TokenUsage,
};
use crate::store::SqliteGiftStore;
use crate::types::NewGiftee;

// ---------------------------------------------------------------------------
// MockGenerationProvider
// ---------------------------------------------------------------------------

/// One recorded call to the mock provider.
#[derive(Debug, Clone)]
pub struct MockGenerationCall {
    pub model_identifier: String,
    pub system_instructions: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// What the mock should do for one `generate` call.
#[derive(Debug)]
pub enum ScriptedReply {
    Reply(GenerationReply),
    Fail(ProviderError),
    /// Never resolves; used to hold a flight open for cancellation tests.
    Pending,
}

/// Generation provider that replays scripted replies in order and logs every
/// call. Once the script runs out it falls back to a well-formed
/// three-suggestion reply.
pub struct MockGenerationProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    call_log: Mutex<Vec<MockGenerationCall>>,
}

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    pub fn with_replies(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            call_log: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MockGenerationCall> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationReply> {
        self.call_log.lock().unwrap().push(MockGenerationCall {
            model_identifier: request.model_identifier.clone(),
            system_instructions: request.system_instructions.clone(),
            user_prompt: request.user_prompt.clone(),
            max_output_tokens: request.max_output_tokens,
        });

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            None => Ok(GenerationReply {
                text: sample_reply(3),
                usage: Some(TokenUsage {
                    input_tokens: 120,
                    output_tokens: 80,
                }),
            }),
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Fail(err)) => Err(err.into()),
            Some(ScriptedReply::Pending) => {
                std::future::pending::<()>().await;
                unreachable!("pending reply never resolves")
            }
        }
    }
}

/// A successful scripted reply with the given text and fixed token usage.
pub fn text_reply(text: &str) -> ScriptedReply {
    ScriptedReply::Reply(GenerationReply {
        text: text.to_string(),
        usage: Some(TokenUsage {
            input_tokens: 120,
            output_tokens: 80,
        }),
    })
}

/// A well-formed reply with `count` suggestion blocks.
pub fn sample_reply(count: u32) -> String {
    (1..=count)
        .map(|i| {
            format!(
                "Suggestion {i}: Sample Gift {i}\n\
                 Title: Sample Gift {i}\n\
                 Why It Fits: Matches interest number {i}.\n\
                 Price Range: $15-$30\n\
                 Where to Find: Local bookshop\n\
                 Difficulty: Easy\n\
                 Customization Ideas: Add a handwritten note.\n\
                 Risk Level: Low\n\n"
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Brainstorm config tuned for tests: real retry budget, zero backoff.
pub fn test_brainstorm_config() -> BrainstormConfig {
    BrainstormConfig {
        max_output_tokens: 1000,
        max_retries: 3,
        retry_base_delay_secs: 0,
    }
}

/// Wires a [`BrainstormService`] to the given mock, returning both so tests
/// can drive the service and inspect the call log.
pub fn setup_brainstorm_service(
    provider: MockGenerationProvider,
) -> (Arc<BrainstormService>, Arc<MockGenerationProvider>) {
    let provider = Arc::new(provider);
    let service = BrainstormService::new(provider.clone(), "claude-test", test_brainstorm_config())
        .unwrap();
    (Arc::new(service), provider)
}

/// Opens a fresh store on a temp file. Keep the returned handle alive for
/// the duration of the test; dropping it removes the database.
pub async fn setup_test_store() -> (Arc<SqliteGiftStore>, tempfile::NamedTempFile) {
    let db = tempfile::NamedTempFile::new().unwrap();
    let store = SqliteGiftStore::new(db.path().to_str().unwrap())
        .await
        .unwrap();
    (Arc::new(store), db)
}

/// A valid giftee draft for the given user.
pub fn sam_draft(user_id: i64) -> NewGiftee {
    NewGiftee {
        user_id,
        name: "Sam".to_string(),
        relationship: Some("younger sibling".to_string()),
        budget: Some(80.0),
        notes: Some("Loves sourdough baking and chess".to_string()),
    }
}
