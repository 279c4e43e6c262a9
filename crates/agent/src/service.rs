//! Agent session driver.
//!
//! [`AgentService`] owns one reasoning loop per (provider, model) pair and
//! runs queries on it, either to completion or as a live frame feed.

use std::sync::Arc;

use optimus_config::AgentConfig;
use optimus_core::capability::CapabilityRegistry;
use optimus_core::error::AgentError;
use optimus_providers::ProviderFactory;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::extraction::extract_final_answer;
use crate::loop_runner::{ReasoningLoop, ToolCallingLoop};
use crate::pipeline::FramePipeline;
use crate::prompt::system_prompt;
use crate::session::{SessionCache, SessionKey};

/// Serialized `data: <json>\n\n` frames of one streamed query.
pub type FrameReceiver = mpsc::Receiver<String>;

/// Builds the reasoning loop for a session.
///
/// Construction failures (unknown provider, missing credential) are
/// configuration errors.
pub trait LoopFactory: Send + Sync {
    fn build(&self, key: &SessionKey) -> Result<Arc<dyn ReasoningLoop>, AgentError>;
}

/// Builds [`ToolCallingLoop`]s over configured providers.
pub struct ProviderLoopFactory {
    providers: ProviderFactory,
    registry: Arc<CapabilityRegistry>,
    system_prompt: String,
    temperature: f32,
    max_iterations: usize,
}

impl ProviderLoopFactory {
    pub fn new(providers: ProviderFactory, registry: Arc<CapabilityRegistry>, config: &AgentConfig) -> Self {
        Self {
            providers,
            registry,
            system_prompt: system_prompt(config),
            temperature: config.temperature,
            max_iterations: config.max_iterations,
        }
    }
}

impl LoopFactory for ProviderLoopFactory {
    fn build(&self, key: &SessionKey) -> Result<Arc<dyn ReasoningLoop>, AgentError> {
        let provider = self.providers.create(&key.provider)?;
        Ok(Arc::new(
            ToolCallingLoop::new(provider, &key.model, self.registry.clone(), &self.system_prompt)
                .with_temperature(self.temperature)
                .with_max_iterations(self.max_iterations),
        ))
    }
}

pub struct AgentService {
    factory: Arc<dyn LoopFactory>,
    sessions: SessionCache<dyn ReasoningLoop>,
    stream_buffer: usize,
}

impl AgentService {
    pub fn new(factory: Arc<dyn LoopFactory>, config: &AgentConfig) -> Self {
        Self {
            factory,
            sessions: SessionCache::new(config.session_cache_capacity),
            stream_buffer: config.stream_buffer.max(1),
        }
    }

    /// The cached session for (provider, model), constructed on first use.
    pub async fn session(&self, provider: &str, model: &str) -> Result<Arc<dyn ReasoningLoop>, AgentError> {
        let key = SessionKey::new(provider, model);
        self.sessions
            .get_or_try_init(&key, || async {
                info!(session = %key, "Constructing agent session");
                self.factory.build(&key)
            })
            .await
    }

    /// Run a query to completion and return the extracted final answer.
    pub async fn run_once(&self, query: &str, provider: &str, model: &str) -> Result<String, AgentError> {
        validate_query(query)?;
        let session = self.session(provider, model).await?;
        let message = session.run(query).await?;
        Ok(extract_final_answer(&message.content))
    }

    /// Start a query and return its frame feed.
    ///
    /// Configuration and validation errors are returned before the feed
    /// opens. A failure mid-run closes the feed without further frames. The
    /// producer stops as soon as the receiver is dropped.
    pub async fn run_streaming(&self, query: &str, provider: &str, model: &str) -> Result<FrameReceiver, AgentError> {
        validate_query(query)?;
        let session = self.session(provider, model).await?;
        let mut events = session.stream(query).await?;

        let (tx, rx) = mpsc::channel(self.stream_buffer);
        tokio::spawn(async move {
            let mut pipeline = FramePipeline::new();
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Client disconnected, stopping stream");
                        return;
                    }
                    next = events.recv() => next,
                };

                let event = match next {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        warn!(error = %e, "Reasoning loop failed mid-stream");
                        return;
                    }
                    None => break,
                };

                for frame in pipeline.push(&event) {
                    if tx.send(frame.to_sse()).await.is_err() {
                        return;
                    }
                }
            }

            if let Some(frame) = pipeline.finish() {
                let _ = tx.send(frame.to_sse()).await;
            }
        });

        Ok(rx)
    }
}

fn validate_query(query: &str) -> Result<(), AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::Validation("Query must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::loop_runner::EventReceiver;
    use crate::testing::{ScriptedProvider, text_response, tool_call, tool_call_response};
    use async_trait::async_trait;
    use optimus_core::error::ProviderError;
    use optimus_core::event::ReasoningEvent;
    use optimus_core::message::Message;
    use optimus_tools::CalculatorCapability;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Hands out one scripted provider per build and counts constructions.
    struct ScriptedFactory {
        scripts: Mutex<Vec<Vec<optimus_core::provider::ProviderResponse>>>,
        builds: AtomicUsize,
    }

    impl ScriptedFactory {
        fn new(scripts: Vec<Vec<optimus_core::provider::ProviderResponse>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts),
                builds: AtomicUsize::new(0),
            })
        }
    }

    impl LoopFactory for ScriptedFactory {
        fn build(&self, key: &SessionKey) -> Result<Arc<dyn ReasoningLoop>, AgentError> {
            if key.provider != "openai" {
                return Err(ProviderError::UnsupportedProvider(key.provider.clone()).into());
            }
            self.builds.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().remove(0);
            let mut registry = CapabilityRegistry::new();
            registry.register(Box::new(CalculatorCapability));
            Ok(Arc::new(ToolCallingLoop::new(
                Arc::new(ScriptedProvider::new(script)),
                &key.model,
                Arc::new(registry),
                "test",
            )))
        }
    }

    fn service(factory: Arc<dyn LoopFactory>) -> AgentService {
        AgentService::new(factory, &AgentConfig::default())
    }

    async fn drain(mut rx: FrameReceiver) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(sse) = rx.recv().await {
            assert!(sse.starts_with("data: ") && sse.ends_with("\n\n"));
            frames.push(serde_json::from_str(sse["data: ".len()..].trim_end()).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn run_once_extracts_final_answer() {
        let factory = ScriptedFactory::new(vec![vec![
            tool_call_response(vec![tool_call("calculator", json!({"expression": "2+2"}))], ""),
            text_response("Checked.\n<FINAL_ANSWER>\nIt is 4.\n</FINAL_ANSWER>"),
        ]]);
        let answer = service(factory).run_once("2+2?", "openai", "m").await.unwrap();
        assert_eq!(answer, "It is 4.");
    }

    #[tokio::test]
    async fn session_is_reused_across_queries() {
        let factory = ScriptedFactory::new(vec![vec![text_response("one"), text_response("two")]]);
        let service = service(factory.clone());

        assert_eq!(service.run_once("a", "openai", "m").await.unwrap(), "one");
        assert_eq!(service.run_once("b", "OpenAI", "m").await.unwrap(), "two");
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_provider_is_configuration_error() {
        let factory = ScriptedFactory::new(vec![]);
        let service = service(factory.clone());

        let err = service.run_once("hi", "mistral", "m").await.unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
        assert!(service.run_streaming("hi", "mistral", "m").await.is_err());
        assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_surfaces_before_any_run() {
        let factory = ProviderLoopFactory::new(
            ProviderFactory::from_config(&optimus_config::AppConfig::default()),
            Arc::new(CapabilityRegistry::new()),
            &AgentConfig::default(),
        );
        let service = service(Arc::new(factory));

        let err = service.run_once("hi", "openai", "gpt-4o-mini").await.unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Missing OpenAI API key");
        assert!(matches!(
            service.run_streaming("hi", "google", "gemini-2.0-flash").await,
            Err(AgentError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_construction() {
        let factory = ScriptedFactory::new(vec![]);
        let err = service(factory.clone()).run_once("  ", "openai", "m").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn streaming_emits_steps_then_answer() {
        let factory = ScriptedFactory::new(vec![vec![
            tool_call_response(vec![tool_call("calculator", json!({"expression": "6*7"}))], ""),
            text_response("Done thinking. <FINAL_ANSWER> The answer is 42."),
        ]]);
        let rx = service(factory).run_streaming("6*7?", "openai", "m").await.unwrap();
        let frames = drain(rx).await;

        let types: Vec<_> = frames.iter().map(Frame::frame_type).collect();
        assert_eq!(types[..2], ["agent_step", "agent_step"]);
        assert!(types[2..].iter().all(|t| *t == "final_answer"));
        assert_eq!(
            frames.last(),
            Some(&Frame::final_answer("The answer is 42."))
        );
        assert!(frames.iter().all(|f| match f {
            Frame::FinalAnswer { content } => !content.contains("Done thinking"),
            _ => true,
        }));
    }

    #[tokio::test]
    async fn streaming_without_delimiter_flushes_at_end() {
        let factory = ScriptedFactory::new(vec![vec![text_response("Plain answer.")]]);
        let frames = drain(service(factory).run_streaming("q", "openai", "m").await.unwrap()).await;
        assert_eq!(frames, vec![Frame::final_answer("Plain answer.")]);
    }

    #[tokio::test]
    async fn streaming_and_single_shot_agree_without_delimiter() {
        let turns = || {
            vec![
                tool_call_response(
                    vec![tool_call("calculator", json!({"expression": "2+2"}))],
                    "Let me compute that first. ",
                ),
                text_response("The answer is 4."),
            ]
        };
        let factory = ScriptedFactory::new(vec![[turns(), turns()].concat()]);
        let service = service(factory);

        let answer = service.run_once("2+2?", "openai", "m").await.unwrap();
        assert_eq!(answer, "The answer is 4.");

        let frames = drain(service.run_streaming("2+2?", "openai", "m").await.unwrap()).await;
        let answers: Vec<&str> = frames
            .iter()
            .filter_map(|f| match f {
                Frame::FinalAnswer { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(answers, vec![answer.as_str()]);
    }

    /// Emits fragments until its receiver is dropped, then signals.
    struct EndlessLoop {
        stopped: Arc<Notify>,
    }

    #[async_trait]
    impl ReasoningLoop for EndlessLoop {
        async fn run(&self, _query: &str) -> Result<Message, AgentError> {
            Ok(Message::assistant(""))
        }

        async fn stream(&self, _query: &str) -> Result<EventReceiver, AgentError> {
            let (tx, rx) = mpsc::channel(1);
            let stopped = self.stopped.clone();
            tokio::spawn(async move {
                let mut first = true;
                loop {
                    let delta = if first { "<FINAL_ANSWER>tick" } else { " tick" };
                    first = false;
                    if tx.send(Ok(ReasoningEvent::fragment(delta))).await.is_err() {
                        stopped.notify_one();
                        return;
                    }
                }
            });
            Ok(rx)
        }
    }

    struct EndlessFactory(Arc<Notify>);

    impl LoopFactory for EndlessFactory {
        fn build(&self, _key: &SessionKey) -> Result<Arc<dyn ReasoningLoop>, AgentError> {
            Ok(Arc::new(EndlessLoop { stopped: self.0.clone() }))
        }
    }

    #[tokio::test]
    async fn client_disconnect_stops_the_loop() {
        let stopped = Arc::new(Notify::new());
        let service = service(Arc::new(EndlessFactory(stopped.clone())));

        let mut rx = service.run_streaming("go", "openai", "m").await.unwrap();
        let first = rx.recv().await.unwrap();
        assert!(first.contains("final_answer"));
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), stopped.notified())
            .await
            .expect("loop kept running after disconnect");
    }

    /// Fails after one update.
    struct FailingMidStream;

    #[async_trait]
    impl ReasoningLoop for FailingMidStream {
        async fn run(&self, _query: &str) -> Result<Message, AgentError> {
            Err(AgentError::Upstream("boom".into()))
        }

        async fn stream(&self, _query: &str) -> Result<EventReceiver, AgentError> {
            let (tx, rx) = mpsc::channel(4);
            tx.send(Ok(ReasoningEvent::update("model", vec![]))).await.ok();
            tx.send(Ok(ReasoningEvent::fragment("partial"))).await.ok();
            tx.send(Err(AgentError::Upstream("connection reset".into()))).await.ok();
            Ok(rx)
        }
    }

    struct FailingFactory;

    impl LoopFactory for FailingFactory {
        fn build(&self, _key: &SessionKey) -> Result<Arc<dyn ReasoningLoop>, AgentError> {
            Ok(Arc::new(FailingMidStream))
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_closes_feed_cleanly() {
        let service = service(Arc::new(FailingFactory));
        let frames = drain(service.run_streaming("q", "openai", "m").await.unwrap()).await;
        // The thought frame arrives; the withheld text is not flushed.
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_type(), "agent_step");

        // The session survives the failed run.
        assert!(service.session("openai", "m").await.is_ok());
        assert!(matches!(
            service.run_once("q", "openai", "m").await,
            Err(AgentError::Upstream(_))
        ));
    }
}
