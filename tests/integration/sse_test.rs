//! SSE Encoding Tests
//!
//! Verifies the line-delimited encoding of a full composed session: every
//! data frame is an OpenAI-style chunk with the session identity, and the
//! stream ends with the unambiguous `[DONE]` frame.

use std::sync::Arc;

use crate::common::{collect, text, thinking, ScriptedProvider};
use reason_relay::{ComposeRequest, StreamComposer};
use reason_relay_llm::{GenerationParams, Message};

#[tokio::test]
async fn test_full_session_encodes_as_ordered_sse_frames() {
    let reasoner =
        ScriptedProvider::new(vec![thinking("think"), text("")]).with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("answer")]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(ComposeRequest {
        messages: vec![Message::user("q")],
        params: GenerationParams::default(),
        reasoner_model: "deepseek-reasoner".to_string(),
        summarizer_model: "gemini-2.0-flash".to_string(),
    });
    let session_id = stream.session_id().to_string();
    let created = stream.created();

    let frames: Vec<String> = collect(&mut stream)
        .await
        .iter()
        .map(|e| e.to_sse())
        .collect();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");

    // Every data frame is a parseable chunk stamped with the session
    // identity; phases land in the right delta field.
    let first: serde_json::Value =
        serde_json::from_str(frames[0].trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(first["id"], session_id.as_str());
    assert_eq!(first["created"], created);
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["model"], "deepseek-reasoner");
    assert_eq!(first["choices"][0]["delta"]["reasoning_content"], "think");
    assert_eq!(first["choices"][0]["delta"]["content"], "");

    let second: serde_json::Value =
        serde_json::from_str(frames[1].trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(second["model"], "gemini-2.0-flash");
    assert_eq!(second["choices"][0]["delta"]["content"], "answer");
    assert_eq!(second["choices"][0]["delta"]["reasoning_content"], "");
}
