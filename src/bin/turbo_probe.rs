/// Headless check of the turbine HAT: dumps the ADS112C04 registers, then
/// prints a run of raw and converted readings for every configured channel.
///
/// Takes the same config file argument (or `TURBOPLOT_CONFIG`) as the GUI.
use anyhow::{Context, Result};
use log::warn;
use std::thread;
use turboplot::config::{TurboConfig, CONFIG_ENV};
use turboplot::hat::HatContext;
use turboplot::reader::AdcReader;
use turboplot::types::{ChannelId, Turbine};

const SAMPLES: usize = 20;

fn main() -> Result<()> {
    env_logger::init();
    let path = TurboConfig::locate(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let config = TurboConfig::load_or_default(path.as_deref()).context("loading configuration")?;
    let channels = config.channels()?;

    println!("ADS112C04 probe");
    println!("  mode:      {:?}", config.mode);
    println!("  bus:       /dev/i2c-{}", config.bus);
    println!("  address:   0x{:02X}", config.address);
    println!("  reference: {:.3} V", config.reference.volts());
    println!();

    let hat = HatContext::open(&config).context("opening the HAT")?;
    let mut adc = AdcReader::new(hat, config.converter_settings()?);
    adc.init().context("resetting the ADC (is it on this address?)")?;

    let registers = adc.dump_registers().context("reading registers")?;
    for (n, value) in registers.iter().enumerate() {
        println!("  config{n}: 0x{value:02X} ({value:08b})");
    }
    println!();

    let period = config.sample_period();
    for i in 0..SAMPLES {
        let timestamp = (i as f64) * period.as_secs_f64();
        let mut line = format!("{:3} t={timestamp:6.1}s", i + 1);
        let mut values = Vec::new();
        for channel in &channels {
            match adc.read(channel, timestamp) {
                Ok(r) => {
                    line.push_str(&format!("  {}: {:6} ({:8.4} {})", channel.id.label(), r.raw, r.value, channel.unit()));
                    values.push(r);
                }
                Err(e) => {
                    warn!("{}: {e}", channel.id.label());
                    line.push_str(&format!("  {}: --", channel.id.label()));
                }
            }
        }
        for turbine in Turbine::ALL {
            let find = |id: ChannelId| values.iter().find(|r| r.channel == id).map(|r| r.value);
            if let (Some(v), Some(a)) = (find(turbine.voltage_channel()), find(turbine.current_channel())) {
                line.push_str(&format!("  {}: {:.4} W", turbine.power_label(), v * a));
            }
        }
        println!("{line}");
        thread::sleep(period);
    }

    adc.shutdown();
    println!();
    println!("Done. Constant or zero readings usually mean wiring, address or reference trouble.");
    Ok(())
}
