// Quick demonstration of the project persistence system
// Run with: cargo run --bin demo_project_persistence

use haos_sequencer::project::{ArchiveProjectStore, ProjectStore};
use haos_sequencer::sequencer::{build_arrangement, params};
use haos_sequencer::{ArrangementTemplate, EngineConfig, OfflineRenderer, Sequencer, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig {
        loop_enabled: false,
        ..EngineConfig::default()
    };
    let mut sequencer = Sequencer::new(&config)?;
    let ids = build_arrangement(&mut sequencer, ArrangementTemplate::Minimal)?;
    sequencer.set_tempo(126.0)?;
    sequencer.set_mute(ids[0], true)?;
    sequencer.schedule_automation(ids[1], 4, params::PAN, -0.5)?;

    let mut state = sequencer.snapshot();
    state.name = "Demo Project".to_string();
    log::info!(
        "Created '{}': {} tracks, {} bars at {} BPM",
        state.name,
        state.tracks.len(),
        state.total_bars,
        state.tempo_bpm
    );

    let root = std::env::temp_dir().join("haos-sequencer-demo");
    let mut store = ArchiveProjectStore::new(&root);
    let id = store.save(&state)?;
    let path = store.archive_path(&id);
    log::info!(
        "Saved to {} ({} bytes)",
        path.display(),
        std::fs::metadata(&path)?.len()
    );

    let loaded = store.load(&id)?;
    if loaded != state {
        return Err("loaded project differs from the saved one".into());
    }
    let manifest = store.metadata(&id)?;
    log::info!(
        "Loaded '{}' (format {}, created {})",
        manifest.name,
        manifest.version,
        manifest.created
    );

    // The restored sequencer must make the same playback decisions
    let duration = 8.0;
    let renderer = OfflineRenderer::default();
    let original = renderer.render(&mut Transport::new(sequencer), duration);
    let restored = Sequencer::from_project(&loaded, &config)?;
    let replay = renderer.render(&mut Transport::new(restored), duration);
    if original.triggers != replay.triggers || original.parameters != replay.parameters {
        return Err("restored project renders differently".into());
    }
    log::info!(
        "Replay identical: {} triggers, {} parameter changes in {}s",
        replay.triggers.len(),
        replay.parameters.len(),
        duration
    );

    store.delete(&id)?;
    log::info!("Cleaned up {}", path.display());
    Ok(())
}
