use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, info, warn};

mod cli;

use cli::Cli;
use ytscript::config::{Config, config_path};
use ytscript::http::HttpSettings;
use ytscript::proxy::{GenericProxyConfig, ProxyConfig, WebshareProxyConfig};
use ytscript::{FetchedTranscript, FormatOptions, TranscriptApi};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytscript.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytscript")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nConfig is read from: {}\nLogs are written to: {}",
        config_path().display(),
        log_dir().join("ytscript.log").display()
    )
}

fn proxy_config(cli: &Cli, config: &Config) -> Result<Option<Box<dyn ProxyConfig>>> {
    if let (Some(user), Some(pass)) = (&cli.webshare_proxy_username, &cli.webshare_proxy_password) {
        let locations = if cli.webshare_proxy_locations.is_empty() {
            config.webshare_proxy_locations.clone().unwrap_or_default()
        } else {
            cli.webshare_proxy_locations.clone()
        };
        return Ok(Some(Box::new(WebshareProxyConfig::new(user, pass).with_locations(locations))));
    }

    let http = cli.http_proxy.clone().or_else(|| config.http_proxy.clone());
    let https = cli.https_proxy.clone().or_else(|| config.https_proxy.clone());
    if http.is_none() && https.is_none() {
        return Ok(None);
    }
    Ok(Some(Box::new(GenericProxyConfig::new(http, https)?)))
}

fn http_settings(cli: &Cli, config: &Config) -> Result<HttpSettings> {
    let mut settings = HttpSettings::default();
    if let Some(proxy) = proxy_config(cli, config)? {
        settings = settings.with_proxy(proxy.as_ref());
    }
    if let Some(path) = cli.cookies.as_ref().or(config.cookies.as_ref()) {
        settings = settings.with_cookie_header(ytscript::cookies::load_cookie_header(path)?);
    }
    Ok(settings)
}

fn collect_videos(cli: &Cli) -> Result<Vec<String>> {
    let videos = if !cli.videos.is_empty() {
        cli.videos.clone()
    } else if !io::stdin().is_terminal() {
        io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    Ok(videos
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

async fn fetch_transcript(
    api: &TranscriptApi,
    cli: &Cli,
    video: &str,
    languages: &[String],
) -> ytscript::Result<FetchedTranscript> {
    let catalog = api.list(video).await?;

    let handle = if cli.exclude_generated {
        catalog.find_manually_created_transcript(languages)?
    } else if cli.exclude_manually_created {
        catalog.find_generated_transcript(languages)?
    } else {
        catalog.find_transcript(languages)?
    };
    debug!("Selected {} transcript for {}", handle.language_code(), handle.video_id());

    match cli.translate {
        Some(ref code) => handle.translate(code)?.fetch(cli.preserve_formatting).await,
        None => handle.fetch(cli.preserve_formatting).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file: {e}");
        Config::default()
    });

    if cli.exclude_generated && cli.exclude_manually_created {
        bail!("--exclude-generated and --exclude-manually-created together leave nothing to fetch");
    }

    let videos = collect_videos(&cli)?;
    if videos.is_empty() {
        bail!("no URL or video ID provided\n\nUsage: ytscript <URL|ID>...\n       echo <URL> | ytscript");
    }

    let languages = if cli.languages.is_empty() {
        config.languages()
    } else {
        cli.languages.clone()
    };
    let format = cli.format.or(config.format).unwrap_or_default();
    let options = FormatOptions {
        indent: cli.indent.or(config.indent),
    };
    let strategy = cli.strategy.or(config.strategy).unwrap_or_default();

    let api = TranscriptApi::new(http_settings(&cli, &config)?, strategy)?;

    if cli.verbose {
        eprintln!("Languages: {}\nStrategy: {strategy:?}", languages.join(", "));
    }

    let mut listings = Vec::new();
    let mut transcripts = Vec::new();
    let mut failures = 0usize;

    for video in &videos {
        let result = if cli.list_transcripts {
            api.list(video).await.map(|catalog| listings.push(catalog.to_string()))
        } else {
            fetch_transcript(&api, &cli, video, &languages)
                .await
                .map(|t| transcripts.push(t))
        };

        if let Err(e) = result {
            warn!("{video}: {e}");
            eprintln!("Could not retrieve a transcript for {video}: {e}");
            failures += 1;
        }
    }

    let rendered = if cli.list_transcripts {
        listings.join("\n")
    } else {
        match transcripts.as_slice() {
            [] => String::new(),
            [single] => format.render(single, &options)?,
            many => format.render_many(many, &options)?,
        }
    };

    if listings.is_empty() && transcripts.is_empty() {
        bail!("no transcripts were retrieved ({failures} of {} failed)", videos.len());
    }

    if cli.verbose {
        for t in &transcripts {
            eprintln!(
                "Video: {}\nLanguage: {} ({}){}\nSegments: {}",
                t.video_id,
                t.language,
                t.language_code,
                if t.is_generated { " [generated]" } else { "" },
                t.len(),
            );
        }
    }

    if let Some(ref path) = cli.output {
        std::fs::write(path, &rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }

    Ok(())
}
