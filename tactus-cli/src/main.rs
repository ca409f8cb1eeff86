mod args;

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tactus_core::{
    transport_cell, ChannelSink, Config, Engine, EngineFeedback, EngineHandle, SystemClock,
};
use tactus_types::{Cue, Effect, TransportSnapshot};

use args::{CliOptions, USAGE};

/// How often the simulated player publishes its position.
const TRANSPORT_PUBLISH_INTERVAL: Duration = Duration::from_millis(10);

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("tactus")
        .join("tactus.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    match File::create(&log_path) {
        Ok(file) => loggers.push(WriteLogger::new(log_level, simplelog::Config::default(), file)),
        Err(e) => eprintln!("tactus: not logging to {}: {}", log_path.display(), e),
    }

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("tactus: logger already initialized");
    }

    log::info!("tactus starting (log level: {:?})", log_level);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let verbose = argv.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let options = match CliOptions::parse(&argv) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("tactus: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let mut defaults = config.defaults();
    if let Some(bpm) = options.bpm {
        defaults.tempo.set_bpm(bpm)?;
    }
    if let Some(time_signature) = options.time_signature {
        defaults.tempo.set_time_signature(time_signature)?;
    }
    if let Some(mode) = options.mode {
        defaults.mode = mode;
    }
    if let Some(rate) = options.rate {
        defaults.rate = rate;
    }

    let (cue_tx, cue_rx) = crossbeam_channel::unbounded();
    let mut engine = Engine::with_settings(
        SystemClock::new(),
        ChannelSink::new(cue_tx),
        config.engine_settings(),
    );
    engine.apply_defaults(&defaults)?;
    if let Some(count) = options.subdivisions {
        engine.set_subdivisions(count)?;
    }
    engine.enable();

    let stop_transport = Arc::new(AtomicBool::new(false));
    let transport_thread = match options.transport_at {
        Some(from) => {
            let (writer, reader) = transport_cell(TransportSnapshot::playing_at(from, Duration::ZERO));
            engine.attach_transport(Box::new(reader));
            Some(spawn_player(writer, from, Arc::clone(&stop_transport))?)
        }
        None => None,
    };

    println!(
        "tactus: {} at {} BPM in {}, {} per beat, rate {}",
        defaults.mode.name(),
        defaults.tempo.bpm(),
        defaults.tempo.time_signature(),
        options.subdivisions.unwrap_or(defaults.tempo.subdivisions().count()),
        defaults.rate
    );

    let mut handle = EngineHandle::spawn(engine)?;
    handle.start()?;
    print_cues(&cue_rx, &mut handle, options.run_for);

    handle.stop();
    let status = handle.status()?;
    print_cues(&cue_rx, &mut handle, Duration::from_millis(50));
    println!(
        "tactus: stopped after {} effect failure(s)",
        status.effect_failures
    );

    stop_transport.store(true, Ordering::Release);
    if let Some(player) = transport_thread {
        let _ = player.join();
    }
    handle.shutdown();
    Ok(())
}

/// Simulated external player: publishes a position that advances in real
/// time from `from` until told to stop.
fn spawn_player(
    mut writer: tactus_core::TransportWriter,
    from: Duration,
    stop: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("tactus-player".to_string())
        .spawn(move || {
            let started = Instant::now();
            while !stop.load(Ordering::Acquire) {
                writer.publish(TransportSnapshot::playing_at(from + started.elapsed(), Duration::ZERO));
                thread::sleep(TRANSPORT_PUBLISH_INTERVAL);
            }
        })
}

/// Print cues as they arrive for `window`, logging engine feedback.
fn print_cues(cues: &Receiver<Cue>, handle: &mut EngineHandle, window: Duration) {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match cues.recv_timeout(remaining) {
            Ok(cue) => println!("{}", format_cue(&cue)),
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => break,
        }
        for feedback in handle.drain_feedback() {
            match feedback {
                EngineFeedback::Status(status) if !status.running => {
                    log::info!("engine stopped at {:?}", status.logical_time);
                }
                EngineFeedback::EffectFailed(message) => log::warn!("effect failed: {}", message),
                EngineFeedback::Status(_) => {}
            }
        }
    }
}

fn format_cue(cue: &Cue) -> String {
    let what = match &cue.effect {
        Effect::PlayTick { accent: true } => "TICK".to_string(),
        Effect::PlayTick { accent: false } => "tick".to_string(),
        Effect::Speak { text } => format!("say \"{}\"", text),
        Effect::CancelSpeech => "hush".to_string(),
    };
    format!("{:>9} {:>9.3}s  {}", cue.at.to_string(), cue.logical_time.as_secs_f64(), what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactus_types::ClockSnapshot;

    #[test]
    fn formats_each_effect() {
        let cue = |effect| Cue {
            at: ClockSnapshot::from_duration(Duration::from_millis(1500)),
            logical_time: Duration::from_millis(750),
            effect,
        };
        assert!(format_cue(&cue(Effect::PlayTick { accent: true })).ends_with("TICK"));
        assert!(format_cue(&cue(Effect::PlayTick { accent: false })).ends_with("tick"));
        assert!(format_cue(&cue(Effect::speak("Do Mi"))).ends_with("say \"Do Mi\""));
        let line = format_cue(&cue(Effect::CancelSpeech));
        assert!(line.contains("1.500s"));
        assert!(line.contains("0.750s"));
        assert!(line.ends_with("hush"));
    }
}
