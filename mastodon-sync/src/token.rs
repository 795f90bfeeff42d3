//! Interactive OAuth token acquisition for the `get-token` subcommand.
//!
//! Walks the authorization-code flow with the out-of-band redirect URI, so
//! the instance displays the code for the user to paste instead of
//! redirecting anywhere. See <https://docs.joinmastodon.org/client/authorized/>.

use anyhow::{bail, Context, Result};
use dialoguer::Input;
use serde_json::Value;

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

pub async fn get_token() -> Result<()> {
    let server: String = Input::new()
        .with_prompt("What mastodon server do you want to connect to?")
        .default("https://mastodon.social".to_string())
        .interact_text()
        .context("reading server prompt")?;
    let server = server.trim().trim_end_matches('/').to_string();

    println!();
    println!("Visit this URL to add a new \"application\":");
    println!("{server}/settings/applications");
    println!();
    println!("Then enter the credentials from your new app here:");
    let key: String = Input::new()
        .with_prompt("Client key")
        .interact_text()
        .context("reading client key")?;
    let secret: String = Input::new()
        .with_prompt("Client secret")
        .interact_text()
        .context("reading client secret")?;

    println!();
    println!("Visit the following URL in your web browser:");
    println!(
        "{server}/oauth/authorize?client_id={}&redirect_uri={}&response_type=code",
        urlencoding::encode(key.trim()),
        urlencoding::encode(REDIRECT_URI)
    );
    println!();
    println!("Grant access, then paste the code below.");
    let code: String = Input::new()
        .with_prompt("Code")
        .interact_text()
        .context("reading authorization code")?;

    let response = reqwest::Client::new()
        .post(format!("{server}/oauth/token"))
        .form(&[
            ("client_id", key.trim()),
            ("client_secret", secret.trim()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", REDIRECT_URI),
            ("code", code.trim()),
        ])
        .send()
        .await
        .context("requesting API token")?;

    let status = response.status();
    let body = response.text().await.context("reading token response")?;
    if !status.is_success() {
        bail!("error getting API token from authorization code: HTTP {status}: {body}");
    }

    let json: Value = serde_json::from_str(&body).context("parsing token response")?;
    let token = json
        .get("access_token")
        .and_then(Value::as_str)
        .context("no access_token in token response")?;

    println!();
    println!("Success!");
    println!("Update your config to match:");
    println!();
    println!("[mastodon]");
    println!("url = \"{server}\"");
    println!("token = \"{token}\"");
    Ok(())
}
