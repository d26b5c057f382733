use haos_sequencer::sequencer::build_arrangement;
use haos_sequencer::{ArrangementTemplate, EngineConfig, OfflineRenderer, Sequencer, Transport};
use std::collections::BTreeMap;
use std::path::PathBuf;

// Usage: haos_sequencer [template] [config.ron]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let template_name = args.next().unwrap_or_else(|| "standard".to_string());
    let config_path = args.next().map(PathBuf::from);

    let template = ArrangementTemplate::from_name(&template_name).unwrap_or_else(|| {
        log::warn!("unknown template '{}', using standard", template_name);
        ArrangementTemplate::Standard
    });
    let mut config = EngineConfig::load_or_default(config_path.as_deref());
    // Render the arrangement once through
    config.loop_enabled = false;

    let mut sequencer = Sequencer::new(&config)?;
    let ids = build_arrangement(&mut sequencer, template)?;
    for summary in sequencer.summaries() {
        log::info!(
            "{} '{}' on {} vol {:.2} pan {:+.2}",
            summary.id, summary.name, summary.instrument, summary.volume, summary.pan
        );
    }

    let bar_seconds = sequencer.tempo().bar_duration_seconds(&sequencer.grid());
    let duration = bar_seconds * f64::from(sequencer.total_bars()) + 1.0;
    let mut transport = Transport::new(sequencer);
    transport.subscribe(|notice| log::debug!("{:?}", notice));

    let log_out = OfflineRenderer::default().render(&mut transport, duration);

    let mut per_bar: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for trigger in &log_out.triggers {
        per_bar.entry(trigger.position.bar).or_default().0 += 1;
    }
    for change in &log_out.parameters {
        per_bar.entry(change.bar).or_default().1 += 1;
    }
    for (bar, (triggers, changes)) in &per_bar {
        log::info!("bar {:>2}: {:>3} triggers, {:>2} parameter changes", bar + 1, triggers, changes);
    }
    log::info!(
        "{} tracks, {} triggers, {} parameter changes, transport {:?}",
        ids.len(),
        log_out.triggers.len(),
        log_out.parameters.len(),
        transport.state()
    );
    Ok(())
}
