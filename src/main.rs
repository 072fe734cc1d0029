use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voxchat::voice::{self, AudioPlayback, CancelToken};
use voxchat::{Config, ContextStore, TurnOrchestrator};

/// voxchat - push-to-talk voice conversations with a language model
#[derive(Parser)]
#[command(name = "voxchat", version, about)]
struct Cli {
    /// Path to the conversation context JSON file
    #[arg(short, long, env = "VOXCHAT_CONTEXT")]
    context: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Record one utterance and print what was captured
    TestMic,
    /// Play a test tone through the configured output device
    TestSpeaker,
    /// List audio devices with their indices
    ListDevices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,voxchat=info",
        1 => "info,voxchat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic => test_mic(&config).await,
            Command::TestSpeaker => test_speaker(&config),
            Command::ListDevices => list_devices(),
        };
    }

    let Some(context_path) = cli.context else {
        anyhow::bail!("no conversation file specified (--context or VOXCHAT_CONTEXT)");
    };

    let store = ContextStore::new(context_path);
    let mut orchestrator = TurnOrchestrator::new(config, store)?;

    println!("voxchat ready. Commands (press Enter after each):");
    println!("  r  record an utterance and get a response");
    println!("  i  record a stage direction (no response)");
    println!("  s  let the AI speak without being prompted");
    println!("  d  delete the last message");
    println!("  c  cancel the recording in progress");
    println!("  q  quit");

    let mut lines = stdin_lines();

    while let Some(line) = lines.recv().await {
        let result = match line.trim() {
            "r" => {
                let handle = orchestrator.start_capture();
                let token = handle.cancel_token();
                println!("recording... (c + Enter to cancel)");
                let action = orchestrator.record_and_respond(handle);
                drive_capture(action, token, &mut lines).await
            }
            "i" => {
                let handle = orchestrator.start_capture();
                let token = handle.cancel_token();
                println!("recording instruction... (c + Enter to cancel)");
                let action = orchestrator.record_instruction(handle);
                drive_capture(action, token, &mut lines).await
            }
            "s" => orchestrator.speak_unprompted().await,
            "d" => match orchestrator.delete_last() {
                Ok(Some(text)) => {
                    println!("deleted: {text}");
                    Ok(())
                }
                Ok(None) => {
                    println!("nothing to delete");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            "q" => break,
            "c" | "" => Ok(()),
            other => {
                println!("unknown command: {other}");
                Ok(())
            }
        };

        // One failed action never takes the session down
        if let Err(e) = result {
            tracing::error!(error = %e, "action failed");
        }
    }

    println!("bye");
    Ok(())
}

/// Run a capture-backed action while watching stdin for a cancel command
async fn drive_capture<F>(
    action: F,
    token: CancelToken,
    lines: &mut mpsc::Receiver<String>,
) -> voxchat::Result<()>
where
    F: Future<Output = voxchat::Result<()>>,
{
    tokio::pin!(action);

    loop {
        tokio::select! {
            result = &mut action => return result,
            line = lines.recv() => {
                match line {
                    Some(line) if line.trim() == "c" => {
                        println!("cancelling...");
                        token.cancel();
                    }
                    Some(_) => {}
                    // stdin closed; just wait the capture out
                    None => return action.await,
                }
            }
        }
    }
}

/// Forward stdin lines into a channel so the async loop can select on them
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);

    std::thread::Builder::new()
        .name("voxchat-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match std::io::BufRead::read_line(&mut stdin.lock(), &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.blocking_send(line.clone()).is_err() {
                            break;
                        }
                    }
                }
            }
        })
        .ok();

    rx
}

/// Record one utterance with the configured settings and report on it
async fn test_mic(config: &Config) -> anyhow::Result<()> {
    println!("Speak into your microphone; recording ends after silence...");

    let handle = voice::start(
        config.audio.recording_device,
        config.audio.silence_duration_ms,
    );

    match handle.join().await? {
        Some(samples) => {
            #[allow(clippy::cast_precision_loss)]
            let secs = samples.len() as f64 / f64::from(voice::SAMPLE_RATE);
            println!("Captured {} samples ({secs:.1}s of speech)", samples.len());
            println!("If that matches what you said, your mic is working.");
        }
        None => println!("No utterance captured."),
    }

    Ok(())
}

/// Play a 440 Hz tone for 2 seconds
fn test_speaker(config: &Config) -> anyhow::Result<()> {
    println!("You should hear a 440Hz tone for 2 seconds...");

    let mut playback = AudioPlayback::new(config.audio.playback_device)?;

    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    playback.play(samples)?;

    println!("If you heard the tone, your speakers are working.");
    Ok(())
}

/// Print input and output devices with the indices config accepts
fn list_devices() -> anyhow::Result<()> {
    println!("Input devices:");
    for (i, name) in voice::input_device_names()?.iter().enumerate() {
        println!("  [{i}] {name}");
    }

    println!("Output devices:");
    for (i, name) in voice::output_device_names()?.iter().enumerate() {
        println!("  [{i}] {name}");
    }

    Ok(())
}
