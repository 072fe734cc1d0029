//! Turn orchestration: capture, transcription, prompting, generation, speech
//!
//! One orchestrator owns the conversation for the lifetime of the process.
//! Each public method is one user-triggered action; actions run to completion
//! before the next trigger is serviced.


use crate::config::Config;
use crate::context::{
    ConversationContext, ContextStore, Message, Sender, add_director_note_if_needed, build_prompt,
};
use crate::generate::{Generator, TextGenerator};
use crate::voice::{
    AudioPlayback, CaptureHandle, SpeechToText, Synthesizer, TextToSpeech, Transcriber,
    samples_to_wav,
};
use crate::{Result, voice};

/// Drives one conversation session
pub struct TurnOrchestrator {
    config: Config,
    store: ContextStore,
    context: ConversationContext,
    transcriber: Box<dyn Transcriber>,
    generator: Box<dyn Generator>,
    synthesizer: Option<Box<dyn Synthesizer>>,
}

impl TurnOrchestrator {
    /// Load the conversation from `store` and wire up the HTTP backends
    ///
    /// # Errors
    ///
    /// Returns error if the context file cannot be loaded or a required
    /// API key is missing.
    pub fn new(config: Config, store: ContextStore) -> Result<Self> {
        let context = store.load()?;

        let transcriber: Box<dyn Transcriber> = Box::new(SpeechToText::new(
            config.stt.base_url.clone(),
            config.stt.api_key.clone(),
            config.stt.model.clone(),
        )?);

        let generator: Box<dyn Generator> = Box::new(TextGenerator::new(
            &config.generation.base_url,
            &config.generation.api_key,
            &config.generation.model,
            config.generation.max_tokens,
            config.generation.temperature,
        )?);

        let synthesizer: Option<Box<dyn Synthesizer>> = if config.tts.enabled {
            Some(Box::new(TextToSpeech::new(
                config.tts.base_url.clone(),
                config.tts.api_key.clone(),
                config.tts.model.clone(),
                config.tts.speed,
            )?))
        } else {
            None
        };

        tracing::info!(
            path = %store.path().display(),
            messages = context.messages.len(),
            ai_name = %context.ai_name,
            "conversation loaded"
        );

        Ok(Self {
            config,
            store,
            context,
            transcriber,
            generator,
            synthesizer,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_backends(
        config: Config,
        store: ContextStore,
        context: ConversationContext,
        transcriber: Box<dyn Transcriber>,
        generator: Box<dyn Generator>,
        synthesizer: Option<Box<dyn Synthesizer>>,
    ) -> Self {
        Self {
            config,
            store,
            context,
            transcriber,
            generator,
            synthesizer,
        }
    }

    /// Start a recording action for this conversation's audio settings
    #[must_use]
    pub fn start_capture(&self) -> CaptureHandle {
        voice::start(
            self.config.audio.recording_device,
            self.config.audio.silence_duration_ms,
        )
    }

    /// Record one utterance, transcribe it, and respond
    ///
    /// A cancelled recording or a blank transcription ends the turn with
    /// no change to the conversation. The user message is persisted before
    /// generation starts, so a failed generation never loses what was said.
    ///
    /// # Errors
    ///
    /// Returns error if persistence or generation fails. Transcription
    /// failures are logged and treated as a blank utterance.
    #[allow(clippy::future_not_send)]
    pub async fn record_and_respond(&mut self, handle: CaptureHandle) -> Result<()> {
        let Some(text) = self.transcribe_capture(handle).await? else {
            return Ok(());
        };
        self.reload()?;

        if self.config.output.print_transcription {
            println!("{}: {text}", self.context.user_name);
        }

        // Time-passage note goes in first so the gap is measured against
        // the previous turn, not the message being added now.
        if self.config.add_timestamps {
            add_director_note_if_needed(&mut self.context);
        }

        self.context.push(Message::now(Sender::User, text));
        self.store.save(&self.context)?;

        self.respond().await
    }

    /// Generate a response without recording anything first
    ///
    /// # Errors
    ///
    /// Returns error if generation or persistence fails
    #[allow(clippy::future_not_send)]
    pub async fn speak_unprompted(&mut self) -> Result<()> {
        self.reload()?;
        if self.config.add_timestamps {
            add_director_note_if_needed(&mut self.context);
        }
        self.respond().await
    }

    /// Record one utterance and store it as stage direction
    ///
    /// The instruction lands in the log as a director message and shapes
    /// future prompts, but no response is generated for it.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails
    #[allow(clippy::future_not_send)]
    pub async fn record_instruction(&mut self, handle: CaptureHandle) -> Result<()> {
        let Some(text) = self.transcribe_capture(handle).await? else {
            return Ok(());
        };
        self.reload()?;

        if self.config.output.print_transcription {
            println!("({text})");
        }

        self.context.push(Message::now(Sender::Director, text));
        self.store.save(&self.context)
    }

    /// Remove the last message from the log and persist
    ///
    /// Returns the removed text, or `None` if the log was empty.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails
    pub fn delete_last(&mut self) -> Result<Option<String>> {
        self.reload()?;
        let Some(removed) = self.context.delete_last() else {
            return Ok(None);
        };
        self.store.save(&self.context)?;
        tracing::info!(sender = ?removed.sender, "deleted last message");
        Ok(Some(removed.text))
    }

    /// Await a recording, encode it, and transcribe it
    ///
    /// `None` means the turn should be skipped: the recording was cancelled,
    /// contained no speech, or transcription came back blank or failed.
    #[allow(clippy::future_not_send)]
    async fn transcribe_capture(&self, handle: CaptureHandle) -> Result<Option<String>> {
        let token = handle.cancel_token();
        let Some(samples) = handle.join().await? else {
            tracing::info!("recording cancelled");
            return Ok(None);
        };

        if samples.is_empty() {
            tracing::debug!("recording contained no speech");
            return Ok(None);
        }

        let wav = samples_to_wav(&samples, voice::SAMPLE_RATE)?;

        match self.transcriber.transcribe(wav).await {
            // Cancellation raced the transcription request; discard the text
            _ if token.is_cancelled() => {
                tracing::info!("recording cancelled during transcription");
                Ok(None)
            }
            Ok(text) if !text.is_empty() => Ok(Some(text)),
            Ok(_) => {
                tracing::debug!("blank transcription, skipping turn");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "transcription failed, skipping turn");
                Ok(None)
            }
        }
    }

    /// Prompt the generator with the current log and persist its reply
    #[allow(clippy::future_not_send)]
    async fn respond(&mut self) -> Result<()> {
        let mut prompt = build_prompt(&self.context);
        prompt.push_str(&self.context.ai_name);
        prompt.push_str(":\n");

        if self.config.output.print_prompt {
            println!("{prompt}");
        }

        let response = self.generator.generate(&prompt).await?;

        if self.config.output.print_response {
            println!("{}: {response}", self.context.ai_name);
        }

        self.context.push(Message::now(Sender::Ai, response.clone()));
        self.store.save(&self.context)?;

        self.speak(&response).await;
        Ok(())
    }

    /// Speak `text` if synthesis is enabled; failures are logged, not fatal
    #[allow(clippy::future_not_send)]
    async fn speak(&self, text: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };
        if text.is_empty() {
            return;
        }

        let audio = match synthesizer.synthesize(text, &self.context.voice_seed).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                return;
            }
        };

        let device_index = self.config.audio.playback_device;
        let played = tokio::task::spawn_blocking(move || {
            AudioPlayback::new(device_index)?.play_mp3(&audio)
        })
        .await;

        match played {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "playback failed"),
            Err(e) => tracing::error!(error = %e, "playback task panicked"),
        }
    }

    /// Re-read the context file so edits made between actions are honored
    fn reload(&mut self) -> Result<()> {
        self.context = self.store.load()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::Error;
    use crate::voice::CancelToken;

    struct FixedTranscriber(String);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
            Err(Error::Stt("backend down".to_string()))
        }
    }

    /// Echoes the prompt it was given so tests can inspect prompt assembly
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
        reply: String,
    }

    impl EchoGenerator {
        fn new(reply: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(Error::Generation("backend down".to_string()))
        }
    }

    /// Context with one recent message, so no time-passage note fires
    fn test_context() -> ConversationContext {
        ConversationContext {
            introduction: None,
            memory: None,
            authors_note: None,
            ai_name: "Mira".to_string(),
            user_name: "Sam".to_string(),
            voice_seed: "alloy".to_string(),
            messages: vec![Message::now(Sender::Ai, "welcome back")],
        }
    }

    fn test_config() -> Config {
        let mut config = Config::load().unwrap();
        config.output.print_transcription = false;
        config.output.print_prompt = false;
        config.output.print_response = false;
        config.tts.enabled = false;
        config
    }

    fn orchestrator(
        dir: &tempfile::TempDir,
        transcriber: Box<dyn Transcriber>,
        generator: Box<dyn Generator>,
    ) -> TurnOrchestrator {
        let store = ContextStore::new(dir.path().join("context.json"));
        store.save(&test_context()).unwrap();
        TurnOrchestrator::with_backends(
            test_config(),
            store,
            test_context(),
            transcriber,
            generator,
            None,
        )
    }

    fn resolved_handle(result: Result<Option<Vec<i16>>>) -> CaptureHandle {
        let (tx, rx) = oneshot::channel();
        tx.send(result).unwrap();
        CaptureHandle::from_parts(CancelToken::new(), rx)
    }

    #[tokio::test]
    async fn full_turn_appends_user_then_ai_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello there".to_string())),
            Box::new(EchoGenerator::new("hi")),
        );

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        assert_eq!(orch.context.messages.len(), 3);
        assert_eq!(orch.context.messages[1].sender, Sender::User);
        assert_eq!(orch.context.messages[1].text, "hello there");
        assert_eq!(orch.context.messages[2].sender, Sender::Ai);
        assert_eq!(orch.context.messages[2].text, "hi");

        let reloaded = orch.store.load().unwrap();
        assert_eq!(reloaded.messages.len(), 3);
    }

    struct SharedGenerator(std::sync::Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Generator for SharedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.0.lock().unwrap().push(prompt.to_string());
            Ok("hi".to_string())
        }
    }

    #[tokio::test]
    async fn prompt_ends_with_ai_name_cue() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = std::sync::Arc::new(Mutex::new(Vec::new()));

        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(SharedGenerator(std::sync::Arc::clone(&prompts))),
        );

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("Mira:\n"));
        assert!(prompts[0].contains("Sam:\nhello"));
    }

    #[tokio::test]
    async fn cancelled_recording_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("should not be used".to_string())),
            Box::new(EchoGenerator::new("nope")),
        );

        orch.record_and_respond(resolved_handle(Ok(None)))
            .await
            .unwrap();

        assert_eq!(orch.context.messages.len(), 1);
    }

    #[tokio::test]
    async fn failed_transcription_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FailingTranscriber),
            Box::new(EchoGenerator::new("nope")),
        );

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        assert_eq!(orch.context.messages.len(), 1);
    }

    #[tokio::test]
    async fn blank_transcription_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber(String::new())),
            Box::new(EchoGenerator::new("nope")),
        );

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        assert_eq!(orch.context.messages.len(), 1);
    }

    #[tokio::test]
    async fn failed_generation_keeps_the_user_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(FailingGenerator),
        );

        let result = orch
            .record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await;
        assert!(result.is_err());

        // The user message was checkpointed before generation
        let reloaded = orch.store.load().unwrap();
        assert_eq!(reloaded.messages.len(), 2);
        assert_eq!(reloaded.messages[1].sender, Sender::User);
        assert_eq!(reloaded.messages[1].text, "hello");
    }

    #[tokio::test]
    async fn unprompted_turn_appends_only_an_ai_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("unused".to_string())),
            Box::new(EchoGenerator::new("just thinking aloud")),
        );

        orch.speak_unprompted().await.unwrap();

        assert_eq!(orch.context.messages.len(), 2);
        assert_eq!(orch.context.messages[1].sender, Sender::Ai);
        assert_eq!(orch.context.messages[1].text, "just thinking aloud");
    }

    #[tokio::test]
    async fn instruction_is_stored_as_director_without_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("she looks out the window".to_string())),
            Box::new(EchoGenerator::new("should not run")),
        );

        orch.record_instruction(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        assert_eq!(orch.context.messages.len(), 2);
        assert_eq!(orch.context.messages[1].sender, Sender::Director);
        assert_eq!(orch.context.messages[1].text, "she looks out the window");

        let reloaded = orch.store.load().unwrap();
        assert_eq!(reloaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn delete_last_removes_one_message_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(EchoGenerator::new("hi")),
        );

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        let removed = orch.delete_last().unwrap();
        assert_eq!(removed.as_deref(), Some("hi"));

        let reloaded = orch.store.load().unwrap();
        assert_eq!(reloaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn delete_last_on_empty_log_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(EchoGenerator::new("hi")),
        );
        let mut empty = test_context();
        empty.messages.clear();
        orch.store.save(&empty).unwrap();

        assert!(orch.delete_last().unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_timestamps_suppress_time_passage_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(EchoGenerator::new("hi")),
        );
        orch.config.add_timestamps = false;

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();
        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        // Back-to-back turns must not trip the elapsed-time check
        assert_eq!(orch.context.messages.len(), 5);
        assert!(
            orch.context
                .messages
                .iter()
                .all(|m| m.sender != Sender::Director)
        );
    }

    #[tokio::test]
    async fn messages_are_dated_regardless_of_timestamp_setting() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("hello".to_string())),
            Box::new(EchoGenerator::new("hi")),
        );
        orch.config.add_timestamps = false;

        orch.record_and_respond(resolved_handle(Ok(Some(vec![100; 480]))))
            .await
            .unwrap();

        assert!(orch.context.messages.iter().all(|m| m.date.is_some()));
    }

    #[tokio::test]
    async fn cancel_during_transcription_discards_the_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            &dir,
            Box::new(FixedTranscriber("too late".to_string())),
            Box::new(EchoGenerator::new("should not run")),
        );

        let (tx, rx) = oneshot::channel();
        tx.send(Ok(Some(vec![100; 480]))).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let handle = CaptureHandle::from_parts(token, rx);

        orch.record_and_respond(handle).await.unwrap();

        assert_eq!(orch.context.messages.len(), 1);
    }
}
