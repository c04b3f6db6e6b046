pub mod password;
pub mod serve;
pub mod settings;
pub mod share_link;

use anyhow::Result;

#[derive(Debug)]
pub enum Action {
    Serve(serve::Args),
    Password(password::Args),
    ShareLink(share_link::Args),
    ShowSettings(settings::ShowArgs),
    UpdateSettings(settings::UpdateArgs),
}

impl Action {
    /// Execute the action.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying action fails.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Serve(args) => serve::execute(args).await,
            Self::Password(args) => password::execute(&args),
            Self::ShareLink(args) => share_link::execute(&args),
            Self::ShowSettings(args) => settings::show(&args),
            Self::UpdateSettings(args) => settings::update(args),
        }
    }
}
