use clap::Parser;
use std::path::PathBuf;

use ytscript::{OutputFormat, Strategy};

#[derive(Parser)]
#[command(
    name = "ytscript",
    about = "Fetch YouTube transcripts as text, JSON or SRT",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URLs or video IDs (reads from stdin if omitted)
    pub videos: Vec<String>,

    /// Preferred caption languages, most preferred first
    #[arg(short, long, num_args = 1..)]
    pub languages: Vec<String>,

    /// Output format: text (default), json, srt
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Translate the selected transcript into this language code
    #[arg(short, long)]
    pub translate: Option<String>,

    /// List available transcripts instead of fetching one
    #[arg(long)]
    pub list_transcripts: bool,

    /// Only consider manually created transcripts
    #[arg(long)]
    pub exclude_generated: bool,

    /// Only consider automatically generated transcripts
    #[arg(long)]
    pub exclude_manually_created: bool,

    /// Keep HTML formatting tags such as <i> and <b> in the text
    #[arg(long)]
    pub preserve_formatting: bool,

    /// Netscape-format cookie file to send with every request
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Proxy for plain HTTP requests
    #[arg(long)]
    pub http_proxy: Option<String>,

    /// Proxy for HTTPS requests
    #[arg(long)]
    pub https_proxy: Option<String>,

    /// Webshare proxy username (requires --webshare-proxy-password)
    #[arg(long, requires = "webshare_proxy_password")]
    pub webshare_proxy_username: Option<String>,

    /// Webshare proxy password
    #[arg(long, requires = "webshare_proxy_username")]
    pub webshare_proxy_password: Option<String>,

    /// Country codes to restrict Webshare exit IPs to, comma separated
    #[arg(long, value_delimiter = ',', requires = "webshare_proxy_username")]
    pub webshare_proxy_locations: Vec<String>,

    /// How caption tracks are discovered
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Indentation width for JSON output
    #[arg(long)]
    pub indent: Option<usize>,

    /// Show extraction details
    #[arg(short, long)]
    pub verbose: bool,
}
