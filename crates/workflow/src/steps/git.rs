//! Git identity and credential steps.

use crate::schema::Step;

/// Token used when the caller does not supply one.
pub const DEFAULT_GIT_TOKEN: &str = "${{ github.token }}";

const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";
const BOT_NAME: &str = "github-actions[bot]";

/// Configure the bot identity and point `origin` at an authenticated URL.
///
/// `token` is an expression such as `${{ secrets.GH_AW_GITHUB_TOKEN }}`;
/// `None` uses the job token.
#[must_use]
pub fn configure_git_credentials_steps(token: Option<&str>) -> Vec<Step> {
    let token = token.unwrap_or(DEFAULT_GIT_TOKEN);
    let script = format!(
        "git config --global user.email \"{BOT_EMAIL}\"\n\
         git config --global user.name \"{BOT_NAME}\"\n\
         # Re-authenticate git with the GitHub token\n\
         SERVER_URL_STRIPPED=\"${{SERVER_URL#https://}}\"\n\
         git remote set-url origin \"https://x-access-token:{token}@${{SERVER_URL_STRIPPED}}/${{REPO_NAME}}.git\"\n\
         echo \"Git configured with standard GitHub Actions identity\"\n"
    );
    vec![
        Step::run(script)
            .with_name("Configure Git credentials")
            .with_env("REPO_NAME", "${{ github.repository }}")
            .with_env("SERVER_URL", "${{ github.server_url }}"),
    ]
}

/// Remove the credential written by [`configure_git_credentials_steps`].
///
/// Runs after user-supplied steps so nothing the agent executes can read
/// the token from `.git/config`.
#[must_use]
pub fn clean_git_credentials_step() -> Step {
    Step::run("bash /opt/gh-aw/actions/clean_git_credentials.sh")
        .with_name("Clean git credentials")
}
