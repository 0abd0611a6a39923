use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use wiki_gateway::api;
use wiki_gateway::auth::{AuthManager, Session, SessionEvent, SqliteCredentialStore};
use wiki_gateway::config::{
    self, ArticleCommand, Command, Config, ProfileCommand, RawRequest,
};
use wiki_gateway::endpoints;
use wiki_gateway::http_client::{ApiRequest, GatewayClient};
use wiki_gateway::models::article::{parse_article_order, ArticleQuery, CreateArticleRequest};
use wiki_gateway::models::auth::{SignInRequest, SignUpRequest};
use wiki_gateway::models::profile::{
    CreateProfileRequest, EditStatus, ProfileQuery, ProfileUpdate,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level; stdout is reserved for output
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(api = %config.api_base_url, "Wiki Gateway starting");

    // Session context backed by the credentials database
    tracing::debug!("Opening credentials: {}", config.credentials_db.display());
    let store = Arc::new(SqliteCredentialStore::open(&config.credentials_db)?);
    let session = Arc::new(Session::new(store));
    let mut events = session.subscribe();

    let auth = Arc::new(AuthManager::new(
        session,
        &config.api_base_url,
        config.refresh_timeout,
    )?);

    let gateway = GatewayClient::new(
        auth,
        &config.api_base_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let result = run(&gateway, command).await;

    report_session_events(&mut events);

    result
}

/// Execute one CLI command
async fn run(gateway: &GatewayClient, command: Command) -> Result<()> {
    match command {
        Command::Signup {
            email,
            name,
            password,
        } => {
            let email = config::value_or_prompt(email, "Email")?;
            let name = config::value_or_prompt(name, "Name")?;
            let password = config::secret_or_prompt(password, "Password", true)?;
            let request = SignUpRequest {
                email,
                name,
                password_confirmation: password.clone(),
                password,
            };

            let response = api::auth::sign_up(gateway, &request).await?;
            println!("Account created for {}", response.user.name);
            println!("Run `wiki-gateway signin` to start a session.");
        }

        Command::Signin { email, password } => {
            let request = SignInRequest {
                email: config::value_or_prompt(email, "Email")?,
                password: config::secret_or_prompt(password, "Password", false)?,
            };

            let response = api::auth::sign_in(gateway, &request).await?;
            println!("Signed in as {}", response.user.name);
        }

        Command::Signout => {
            api::auth::sign_out(gateway)?;
            println!("Signed out");
        }

        Command::Whoami => {
            if !gateway.auth().session().is_signed_in()? {
                println!("Not signed in");
                return Ok(());
            }
            print_json(&api::auth::me(gateway).await?)?;
        }

        Command::Profiles(command) => run_profiles(gateway, command).await?,

        Command::Articles(command) => run_articles(gateway, command).await?,

        Command::Request(raw) => run_raw(gateway, raw).await?,
    }

    Ok(())
}

async fn run_profiles(gateway: &GatewayClient, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::List {
            page,
            page_size,
            name,
        } => {
            let query = ProfileQuery {
                page: Some(page),
                page_size: Some(page_size),
                name,
            };
            let profiles = api::profiles::list(gateway, &query).await?;
            println!("Found {} profiles", profiles.total_count);
            print_json(&profiles.list)?;
        }

        ProfileCommand::Show { code } => {
            print_json(&api::profiles::get(gateway, &code).await?)?;
        }

        ProfileCommand::Create { question, answer } => {
            let request = CreateProfileRequest {
                security_question: question,
                security_answer: answer,
            };
            print_json(&api::profiles::create(gateway, &request).await?)?;
        }

        ProfileCommand::Status { code } => match api::profiles::edit_status(gateway, &code).await? {
            EditStatus::Available => println!("Nobody is editing {}", code),
            EditStatus::InUse(Some(lock)) => println!(
                "{} is being edited by user {} since {}",
                code,
                lock.user_id,
                lock.registered_at.to_rfc3339()
            ),
            EditStatus::InUse(None) => println!("{} is being edited", code),
        },

        ProfileCommand::Quiz { code, answer } => {
            if let EditStatus::InUse(_) = api::profiles::edit_status(gateway, &code).await? {
                println!("Someone else is editing {}, try again later", code);
                return Ok(());
            }

            let profile = api::profiles::get(gateway, &code).await?;
            if let Some(ref question) = profile.security_question {
                println!("Q: {}", question);
            }

            let answer = config::value_or_prompt(answer, "Answer")?;
            let lock = api::profiles::answer_quiz(gateway, &code, &answer).await?;
            println!(
                "Correct! Edit lock held since {}",
                lock.registered_at.to_rfc3339()
            );
        }

        ProfileCommand::Edit {
            code,
            question,
            answer,
            content,
        } => {
            let update = ProfileUpdate {
                security_question: question,
                security_answer: answer,
                content: Some(content),
                ..Default::default()
            };
            print_json(&api::profiles::update(gateway, &code, &update).await?)?;
        }
    }

    Ok(())
}

async fn run_articles(gateway: &GatewayClient, command: ArticleCommand) -> Result<()> {
    match command {
        ArticleCommand::List {
            page,
            page_size,
            order,
            keyword,
        } => {
            let query = ArticleQuery {
                page: Some(page),
                page_size: Some(page_size),
                order_by: parse_article_order(&order),
                keyword,
            };
            let articles = api::articles::list(gateway, &query).await?;
            println!("Found {} articles", articles.total_count);
            print_json(&articles.list)?;
        }

        ArticleCommand::Show { id } => {
            print_json(&api::articles::get(gateway, id).await?)?;
        }

        ArticleCommand::Create {
            title,
            content,
            image,
        } => {
            let request = CreateArticleRequest {
                image,
                content,
                title,
            };
            print_json(&api::articles::create(gateway, &request).await?)?;
        }

        ArticleCommand::Comments { id, limit, cursor } => {
            print_json(&api::articles::comments(gateway, id, limit, cursor).await?)?;
        }
    }

    Ok(())
}

async fn run_raw(gateway: &GatewayClient, raw: RawRequest) -> Result<()> {
    let method = Method::from_bytes(raw.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", raw.method))?;

    let mut request = ApiRequest::new(method, raw.path);
    tracing::debug!(
        method = %raw.method,
        path = %request.path,
        public = endpoints::is_public_str(&raw.method, &request.path),
        "Raw request"
    );

    if let Some(body) = raw.body {
        let body: serde_json::Value =
            serde_json::from_str(&body).context("Request body is not valid JSON")?;
        request.body = Some(body);
    }

    let response = gateway.send(request).await?;
    let status = response.status();
    let text = response.text().await.context("Failed to read response body")?;

    println!("{}", status);
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => print_json(&json)?,
        Err(_) if text.is_empty() => {}
        Err(_) => println!("{}", text),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Surface session events raised while the command ran
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            eprintln!();
            eprintln!("Your session has expired. Please sign in again:");
            eprintln!();
            eprintln!("    wiki-gateway signin");
            eprintln!();
        }
    }
}
