fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "fetcher"))]
    {
        eprintln!("Error: This binary requires the 'fetcher' feature.");
        eprintln!("Build with: cargo run --release --bin refresh-snapshot --features fetcher");
        std::process::exit(1);
    }

    #[cfg(feature = "fetcher")]
    {
        use sweepsafe::fetch::SocrataClient;
        use sweepsafe::{Config, SpotStore};

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let mut config = Config::load(None)?;
        if let Some(output_path) = std::env::args().nth(1) {
            config.snapshot_path = output_path.into();
        }

        println!("Refreshing snapshot at: {}", config.snapshot_path.display());

        let schedules = SocrataClient::new(
            "schedules",
            config.schedule_feed_url.clone(),
            config.app_token.clone(),
        )?;
        let regulations = SocrataClient::new(
            "regulations",
            config.regulation_feed_url.clone(),
            config.app_token.clone(),
        )?;
        let store = SpotStore::open_or_empty(&config.snapshot_path)?;
        let summary = sweepsafe::refresh(&schedules, &regulations, &config, &store)?;

        println!(
            "Snapshot refreshed: {} spots ({} matched, {} unmatched)",
            summary.parkable, summary.matched, summary.unmatched
        );
        Ok(())
    }
}
