mod cli;
mod config_file;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;

use stairled_engine::config::ConfigSource;
use stairled_engine::{
    AnimationEngine, AnimationRegistry, ChannelSensorSource, LoggingTriggerSink, PinMapper,
    SensorDispatcher, SensorSource, TriggerSink,
};
use stairled_i2c::{I2cTransport, LinuxI2cBus};
use stairled_types::Brightness;

use cli::Cli;
use config_file::TomlConfigSource;

/// How often the main thread sweeps sensor auto-clear deadlines and
/// polls for inbound readings when none are immediately available (§5).
const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let _tracing_guard = stairled_logging::init();

    let config = TomlConfigSource::new(&args.config).load()?;
    info!(path = %args.config.display(), "loaded configuration");

    let bus: Arc<dyn I2cTransport> = Arc::new(LinuxI2cBus::open(args.i2c_bus.clone()));
    let discovered = stairled_engine::discover(bus.as_ref());
    info!(chips = ?discovered, "discovered PCA9685 chips");

    let mapper = Arc::new(PinMapper::initialize(
        bus,
        &discovered,
        config.pinmapper.mapping.clone(),
        config.pinmapper.pwm_hz,
        args.oscillator_hz,
    ));

    if args.self_test {
        info!("running startup self-test ramp");
        mapper.test_ramp(Brightness::clamped(2048), Duration::from_millis(50));
    }

    let registry = Arc::new(AnimationRegistry::load_from(config.animations.clone())?);
    let engine = Arc::new(AnimationEngine::new(mapper.clone(), config.engine.tick_hz));

    let sink: Arc<dyn TriggerSink> = Arc::new(LoggingTriggerSink);
    let dispatcher = Arc::new(SensorDispatcher::new(
        config.sensors.clone(),
        config.dispatcher.sensor_name_prefix.clone(),
        engine.clone(),
        registry.clone(),
        sink,
    ));

    let epoch = Instant::now();
    let shutdown = Arc::new(AtomicBool::new(false));
    let _engine_thread = {
        let engine = engine.clone();
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("stairled-engine".to_string())
            .spawn(move || engine.run(epoch, &shutdown))?
    };

    // Sensor ingress (MQTT, etc.) is external to the core (§1 Non-goals);
    // this channel is the in-process stand-in real transports feed via
    // `try_send` from their own async task (SPEC_FULL §5).
    let (_sensor_tx, sensor_rx) = crossbeam_channel::bounded(64);
    let source = ChannelSensorSource::new(sensor_rx);

    loop {
        if let Some(reading) = source.recv() {
            dispatcher.handle_reading(&reading);
        }
        dispatcher.sweep_clears(epoch.elapsed().as_millis() as u64);
        std::thread::sleep(DISPATCH_POLL_INTERVAL);
    }
}
