//! Print the entries of a torque-bridge session log.
//!
//! # Usage
//!
//! ```bash
//! dump-log sensor_data_240307_140509.log
//! dump-log --degrees sensor_data_240307_140509.log
//! ```

use clap::Parser;
use std::path::PathBuf;
use torque_bridge::Result;
use torque_bridge::core::LogPayload;
use torque_bridge::protocol::constants::RAD_PER_DEG;
use torque_bridge::recorder::{LogEntry, LogReader};

#[derive(Parser)]
#[command(name = "dump-log")]
#[command(about = "Print the entries of a torque-bridge session log")]
struct Args {
    /// Session log file
    path: PathBuf,

    /// Show steer angle and rate in degrees
    #[arg(short, long)]
    degrees: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut reader = LogReader::open(&args.path)?;
    let (mut samples, mut commands) = (0u64, 0u64);

    while let Some(entry) = reader.next_entry()? {
        match entry {
            LogEntry::Started(ts) => println!("# started {}", ts),
            LogEntry::Stopped(ts) => println!("# stopped {}", ts),
            LogEntry::Record(record) => match record.payload {
                LogPayload::Sample(s) => {
                    samples += 1;
                    let (delta, deltad) = if args.degrees {
                        (s.delta / RAD_PER_DEG, s.deltad / RAD_PER_DEG)
                    } else {
                        (s.delta, s.deltad)
                    };
                    println!(
                        "{:10.4}\tsample\t{}\t{}\t{}\t{}",
                        record.elapsed, delta, deltad, s.cadence, s.brake
                    );
                }
                LogPayload::Torque(t) => {
                    commands += 1;
                    println!("{:10.4}\ttorque\t{}", record.elapsed, t);
                }
            },
        }
    }

    eprintln!("{} samples, {} torque commands", samples, commands);
    Ok(())
}
