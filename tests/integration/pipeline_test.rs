//! Full Pipeline Behavior Tests
//!
//! Exercises the composed reasoner→summarizer session over scripted
//! providers: ordering, phase tags, the trace handoff, degraded modes,
//! validation, token accounting, and cancellation.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use crate::common::{collect, text, thinking, usage, HangingProvider, ScriptedProvider};
use reason_relay::{ComposeRequest, Phase, PipelineEvent, PipelineOptions, StreamComposer};
use reason_relay_core::streaming::StreamEvent;
use reason_relay_llm::{GenerationParams, LlmError, Message};

fn request(messages: Vec<Message>) -> ComposeRequest {
    ComposeRequest {
        messages,
        params: GenerationParams::default(),
        reasoner_model: "deepseek-reasoner".to_string(),
        summarizer_model: "gemini-2.0-flash".to_string(),
    }
}

fn chunks_of(events: &[PipelineEvent], phase: Phase) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Chunk(c) if c.phase == phase => Some(c.text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_reference_scenario_nine_events() {
    let reasoner = ScriptedProvider::new(vec![
        thinking("Let's"),
        thinking("think"),
        thinking("step by step:"),
        thinking("2+2=4"),
        text(""),
    ])
    .with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("The"), text("answer"), text("is"), text("4.")]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("What is 2+2?")]));
    let events = collect(&mut stream).await;

    assert_eq!(events.len(), 9, "four reasoning + four answer + terminal");
    for (i, event) in events.iter().take(4).enumerate() {
        match event {
            PipelineEvent::Chunk(c) => {
                assert_eq!(c.phase, Phase::Reasoning, "event {} should be reasoning", i);
                assert_eq!(c.model, "deepseek-reasoner");
                assert_eq!(c.id, stream.session_id());
            }
            other => panic!("expected chunk at {}, got {:?}", i, other),
        }
    }
    for (i, event) in events.iter().skip(4).take(4).enumerate() {
        match event {
            PipelineEvent::Chunk(c) => {
                assert_eq!(c.phase, Phase::Content, "event {} should be content", i + 4);
                assert_eq!(c.model, "gemini-2.0-flash");
                assert_eq!(c.id, stream.session_id());
            }
            other => panic!("expected chunk at {}, got {:?}", i + 4, other),
        }
    }
    assert_eq!(events[8], PipelineEvent::Done);

    assert_eq!(
        chunks_of(&events, Phase::Reasoning),
        vec!["Let's", "think", "step by step:", "2+2=4"]
    );
    assert_eq!(
        chunks_of(&events, Phase::Content),
        vec!["The", "answer", "is", "4."]
    );
}

#[tokio::test]
async fn test_terminal_marker_exactly_once_and_stream_ends() {
    let reasoner =
        ScriptedProvider::new(vec![thinking("hm"), text("")]).with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("ok")]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("hi")]));
    let events = collect(&mut stream).await;

    let done_count = events.iter().filter(|e| e.is_done()).count();
    assert_eq!(done_count, 1);
    assert_eq!(events.last(), Some(&PipelineEvent::Done));
    // Fully drained; nothing after the terminal marker.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_reasoner_failure_falls_back_to_placeholder() {
    let reasoner = ScriptedProvider::new(vec![])
        .with_native_reasoning()
        .failing(LlmError::ServerError {
            message: "upstream exploded".to_string(),
            status: Some(502),
        });
    let summarizer = ScriptedProvider::new(vec![text("best"), text("effort")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("hard question")]));
    let events = collect(&mut stream).await;

    // No reasoning chunks, but the answer still streams and terminates.
    assert!(chunks_of(&events, Phase::Reasoning).is_empty());
    assert_eq!(chunks_of(&events, Phase::Content), vec!["best", "effort"]);
    assert_eq!(events.last(), Some(&PipelineEvent::Done));

    let seen = summarizer_seen.lock().unwrap().clone().expect("summarizer ran");
    let prompt = &seen.last().unwrap().content;
    assert!(prompt.contains("(reasoning unavailable)"));
    assert!(prompt.contains("hard question"));
}

#[tokio::test]
async fn test_last_message_not_user_fails_validation_only_for_answers() {
    let reasoner = ScriptedProvider::new(vec![thinking("partial"), thinking("thoughts")])
        .with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("never sent")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let messages = vec![Message::user("hi"), Message::assistant("hello")];
    let mut stream = composer.run(request(messages));
    let events = collect(&mut stream).await;

    // Reasoning chunks still reach the caller, no answer chunks, and the
    // summarizer never touched the network.
    assert_eq!(
        chunks_of(&events, Phase::Reasoning),
        vec!["partial", "thoughts"]
    );
    assert!(chunks_of(&events, Phase::Content).is_empty());
    assert_eq!(events.last(), Some(&PipelineEvent::Done));
    assert!(summarizer_seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_empty_message_list_terminates_with_marker_only() {
    let reasoner = ScriptedProvider::new(vec![]).with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("never sent")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![]));
    let events = collect(&mut stream).await;

    assert_eq!(events, vec![PipelineEvent::Done]);
    assert!(summarizer_seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_trace_is_concatenated_into_summarizer_prompt() {
    let reasoner = ScriptedProvider::new(vec![
        thinking("First, "),
        thinking("add the numbers. "),
        thinking("Then check."),
        text("ignored answer"),
    ])
    .with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("done")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("What is 2+2?")]));
    let events = collect(&mut stream).await;

    // The reasoner's own answer text is not relayed.
    assert_eq!(chunks_of(&events, Phase::Content), vec!["done"]);

    let seen = summarizer_seen.lock().unwrap().clone().expect("summarizer ran");
    let prompt = &seen.last().unwrap().content;
    assert!(prompt.contains("First, add the numbers. Then check."));
    assert!(prompt.contains("What is 2+2?"));
}

#[tokio::test]
async fn test_prompted_mode_rewrites_and_tags_everything_reasoning() {
    // A reasoner without native separation: the whole output is treated as
    // reasoning, and the outbound prompt asks for step-by-step thinking.
    let reasoner = ScriptedProvider::new(vec![text("I reason "), text("in plain text")]);
    let reasoner_seen = reasoner.seen_messages();
    let summarizer = ScriptedProvider::new(vec![text("summary")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("Why?")]));
    let events = collect(&mut stream).await;

    assert_eq!(
        chunks_of(&events, Phase::Reasoning),
        vec!["I reason ", "in plain text"]
    );
    assert_eq!(chunks_of(&events, Phase::Content), vec!["summary"]);

    let reasoner_prompt = reasoner_seen.lock().unwrap().clone().expect("reasoner ran");
    assert!(reasoner_prompt.last().unwrap().content.contains("step by step"));

    let summarizer_prompt = summarizer_seen.lock().unwrap().clone().expect("summarizer ran");
    assert!(summarizer_prompt
        .last()
        .unwrap()
        .content
        .contains("I reason in plain text"));
}

#[tokio::test]
async fn test_step_by_step_rewrite_can_be_disabled() {
    let reasoner = ScriptedProvider::new(vec![text("raw")]);
    let reasoner_seen = reasoner.seen_messages();
    let summarizer = ScriptedProvider::new(vec![text("s")]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer)).with_options(
        PipelineOptions {
            request_step_by_step: false,
        },
    );
    let mut stream = composer.run(request(vec![Message::user("Why?")]));
    collect(&mut stream).await;

    let prompt = reasoner_seen.lock().unwrap().clone().expect("reasoner ran");
    assert_eq!(prompt.last().unwrap().content, "Why?");
}

#[tokio::test]
async fn test_token_tallies_accumulate_per_stage() {
    let reasoner = ScriptedProvider::new(vec![
        usage(10, 5, Some(20)),
        thinking("t"),
        usage(10, 25, Some(40)),
        text(""),
    ])
    .with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("a"), usage(7, 3, None)]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("q")]));

    // Fresh session starts from zero.
    assert_eq!(stream.reasoner_tokens(), 0);
    assert_eq!(stream.summarizer_tokens(), 0);

    collect(&mut stream).await;

    assert_eq!(stream.reasoner_tokens(), 75);
    assert_eq!(stream.summarizer_tokens(), 10);
}

#[tokio::test]
async fn test_in_stream_error_event_degrades_gracefully() {
    let reasoner = ScriptedProvider::new(vec![
        thinking("so far so good"),
        StreamEvent::Error {
            message: "connection reset".to_string(),
            code: None,
        },
    ])
    .with_native_reasoning();
    let summarizer = ScriptedProvider::new(vec![text("fallback answer")]);
    let summarizer_seen = summarizer.seen_messages();

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let mut stream = composer.run(request(vec![Message::user("q")]));
    let events = collect(&mut stream).await;

    // Partial reasoning was already relayed; the failure downgrades the
    // trace to the placeholder instead of retracting anything.
    assert_eq!(chunks_of(&events, Phase::Reasoning), vec!["so far so good"]);
    assert_eq!(chunks_of(&events, Phase::Content), vec!["fallback answer"]);
    assert_eq!(events.last(), Some(&PipelineEvent::Done));

    let seen = summarizer_seen.lock().unwrap().clone().expect("summarizer ran");
    assert!(seen.last().unwrap().content.contains("(reasoning unavailable)"));
}

#[tokio::test]
async fn test_dropping_stream_cancels_in_flight_provider_call() {
    let reasoner = HangingProvider::new();
    let dropped = reasoner.dropped_flag();
    let summarizer = ScriptedProvider::new(vec![text("unused")]);

    let composer = StreamComposer::new(Arc::new(reasoner), Arc::new(summarizer));
    let stream = composer.run(request(vec![Message::user("q")]));

    // Abandon consumption immediately.
    drop(stream);

    // Give the stages a moment to observe cancellation and abort the call.
    for _ in 0..50 {
        if dropped.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(
        dropped.load(std::sync::atomic::Ordering::SeqCst),
        "in-flight provider call should be dropped on cancellation"
    );
}
