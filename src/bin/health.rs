use std::env;
use std::error;

use reqwest::Url;

const DEFAULT_URL: &str = "http://127.0.0.1:8000/health";

fn main() -> Result<(), Box<dyn error::Error>> {
    let args: Vec<String> = env::args().collect();
    let url = Url::parse(args.get(1).map_or(DEFAULT_URL, String::as_str))?;

    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        panic!("Health check failed with status {}", response.status())
    }

    Ok(())
}
