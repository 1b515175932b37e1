use clap::Subcommand;
use timekeep_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration and its path
    Show,
    /// Set the remote service base URL
    SetUrl {
        /// e.g. https://timer.example.com/v1
        url: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("# {}", Config::path()?.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::SetUrl { url } => {
            let mut config = Config::load()?;
            config.api.base_url = url;
            config.save()?;
            println!("base URL updated");
        }
    }
    Ok(())
}
