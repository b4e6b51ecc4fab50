use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sweepsafe::fetch::{FeedSource, MemoryFeed};
use sweepsafe::reminder::{self, AlarmSink, Reminder};
use sweepsafe::{check_spot, Config, Location, ReminderOffsets, RestrictionState, SpotStore};

#[derive(Parser)]
#[command(name = "sweepsafe", version, about = "Street-sweeping and parking-limit alerts")]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download both feeds and rebuild the snapshot
    Refresh {
        /// Read the sweeping schedule rows from a JSON export instead of the network
        #[arg(long, requires = "regulations_file")]
        schedules_file: Option<PathBuf>,
        /// Read the parking regulation rows from a JSON export instead of the network
        #[arg(long, requires = "schedules_file")]
        regulations_file: Option<PathBuf>,
    },
    /// Show the restriction state of the spot at a position
    Status {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Residential permit zone held by the driver
        #[arg(long)]
        zone: Option<String>,
        /// When the car was parked (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_instant)]
        parked_at: Option<DateTime<Utc>>,
        /// Evaluate as of this instant (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
    /// List permit zones with their spot counts
    Zones,
    /// List spots, optionally within one permit zone
    Spots {
        #[arg(long)]
        zone: Option<String>,
    },
    /// Plan cleaning reminders for the spot at a position
    Remind {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Minutes before the cleaning start; repeatable
        #[arg(long = "offset", required = true)]
        offsets: Vec<u32>,
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {}", err))
}

struct PrintAlarms;

impl AlarmSink for PrintAlarms {
    fn schedule_alarm(&self, reminder: &Reminder) {
        println!("  [{}] {}", reminder.fires_at.to_rfc3339(), reminder.summary);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let tz = config.tz()?;
    // A refresh overwrites the snapshot, so an unreadable one must not block it.
    let store = if matches!(cli.command, Command::Refresh { .. }) {
        SpotStore::open_or_empty(&config.snapshot_path)?
    } else {
        SpotStore::open(&config.snapshot_path)?
    };

    match cli.command {
        Command::Refresh {
            schedules_file,
            regulations_file,
        } => {
            let (schedules, regulations) = feed_sources(&config, schedules_file, regulations_file)?;
            let summary = sweepsafe::refresh(&*schedules, &*regulations, &config, &store)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Status {
            lat,
            lon,
            zone,
            parked_at,
            now,
        } => {
            let now = now.unwrap_or_else(Utc::now);
            let parked_at = parked_at.unwrap_or(now);
            let snapshot = store.snapshot();
            let here = Location::new(lat, lon);

            match check_spot(
                &snapshot.spots,
                &here,
                zone.as_deref(),
                parked_at,
                now,
                tz,
                config.spot_threshold_meters,
            ) {
                Some((spot, state)) => {
                    println!("Regulation {}", spot.regulation.regulation_id);
                    println!("  Street: {}", spot.street_name().unwrap_or("unknown"));
                    if let Some(side) = spot.side {
                        println!("  Side: {}", side);
                    }
                    println!("  Permit Zone: {}", spot.permit_zone().unwrap_or("none"));
                    println!("  State: {}", state.label());
                    if let RestrictionState::PendingTimed { starts_at, .. } = state {
                        println!("  Limit Starts: {}", starts_at.with_timezone(&tz));
                    }
                    if let Some(expiry) = state.expiry() {
                        println!("  Move By: {}", expiry.with_timezone(&tz));
                    }
                    match state.next_cleaning() {
                        Some(cleaning) => println!("  Next Cleaning: {}", cleaning.with_timezone(&tz)),
                        None => println!("  Next Cleaning: none scheduled"),
                    }
                }
                None => println!("No spot found"),
            }
        }
        Command::Zones => {
            for (zone, count) in store.snapshot().count_by_zone() {
                println!("{:>6}  {}", count, zone);
            }
        }
        Command::Spots { zone } => {
            let snapshot = store.snapshot();
            let spots: Vec<_> = match &zone {
                Some(zone) => snapshot.by_zone(zone),
                None => snapshot.spots.iter().collect(),
            };
            for spot in spots {
                println!(
                    "{}\t{:?}\t{}\t{}\t{} schedules",
                    spot.regulation.regulation_id,
                    spot.regulation.kind,
                    spot.permit_zone().unwrap_or("-"),
                    spot.street_name().unwrap_or("-"),
                    spot.schedules.len()
                );
            }
        }
        Command::Remind {
            lat,
            lon,
            offsets,
            now,
        } => {
            let now = now.unwrap_or_else(Utc::now);
            let offsets: ReminderOffsets = offsets.into_iter().collect();
            let snapshot = store.snapshot();
            let here = Location::new(lat, lon);

            let Some(spot) =
                sweepsafe::spot::find_matching_spot(&here, &snapshot.spots, config.spot_threshold_meters)
            else {
                println!("No spot found");
                return Ok(());
            };
            let plan = reminder::schedule(spot, &offsets, now, tz);
            match plan.next_cleaning {
                Some(cleaning) => println!("Next cleaning: {}", cleaning.with_timezone(&tz)),
                None => println!("No cleaning scheduled"),
            }
            let scheduled = plan.deliver(&PrintAlarms);
            println!("{} reminders scheduled", scheduled);
        }
    }

    Ok(())
}

type Feeds = (Box<dyn FeedSource>, Box<dyn FeedSource>);

fn feed_sources(
    config: &Config,
    schedules_file: Option<PathBuf>,
    regulations_file: Option<PathBuf>,
) -> Result<Feeds, Box<dyn std::error::Error>> {
    if let (Some(schedules), Some(regulations)) = (schedules_file, regulations_file) {
        let schedules: Box<dyn FeedSource> = Box::new(MemoryFeed::from_path("schedules", &schedules)?);
        let regulations: Box<dyn FeedSource> =
            Box::new(MemoryFeed::from_path("regulations", &regulations)?);
        return Ok((schedules, regulations));
    }

    #[cfg(feature = "fetcher")]
    {
        use sweepsafe::fetch::SocrataClient;

        let schedules: Box<dyn FeedSource> = Box::new(SocrataClient::new(
            "schedules",
            config.schedule_feed_url.clone(),
            config.app_token.clone(),
        )?);
        let regulations: Box<dyn FeedSource> = Box::new(SocrataClient::new(
            "regulations",
            config.regulation_feed_url.clone(),
            config.app_token.clone(),
        )?);
        Ok((schedules, regulations))
    }

    #[cfg(not(feature = "fetcher"))]
    {
        let _ = config;
        Err("downloading feeds requires the 'fetcher' feature; \
             pass --schedules-file and --regulations-file instead"
            .into())
    }
}
