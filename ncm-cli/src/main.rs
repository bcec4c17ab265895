use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use ncm_api::{NeteaseClient, Param, Query, Session, adapter, envelope};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ncm", version, about = "Netease Cloud Music API command line")]
struct Cli {
    #[command(flatten)]
    network: NetworkArgs,
    #[command(subcommand)]
    command: Command,
}

/// Network overrides for this invocation. They are never saved.
#[derive(Args)]
struct NetworkArgs {
    /// Proxy URL, e.g. `http://127.0.0.1:8888`
    #[arg(long, global = true, value_name = "URL")]
    proxy: Option<String>,
    /// Client IP sent as `X-Real-IP`
    #[arg(long, global = true, value_name = "IP")]
    real_ip: Option<String>,
    /// Downgrade requests to plain HTTP
    #[arg(long, global = true)]
    http: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Invoke an API route and print the reply as JSON
    Call {
        /// Route, e.g. `/song/detail`
        route: String,
        /// Query parameters as `key=value`
        #[arg(value_parser = parse_pair)]
        params: Vec<(String, Param)>,
        /// Return not-logged-in replies as data instead of failing
        #[arg(long)]
        lenient: bool,
    },
    /// List available routes
    Routes,
    /// Log in with email or phone, or store a `MUSIC_U` cookie
    Login(LoginArgs),
    /// Log out and clear the saved session
    Logout,
}

#[derive(Args)]
struct LoginArgs {
    /// Email account
    #[arg(long, conflicts_with_all = ["phone", "cookie", "check"])]
    email: Option<String>,
    /// Phone number
    #[arg(long, conflicts_with_all = ["cookie", "check"])]
    phone: Option<String>,
    /// Country code for phone login
    #[arg(long, requires = "phone")]
    countrycode: Option<String>,
    /// Plain password (hashed before sending)
    #[arg(long, conflicts_with = "md5")]
    password: Option<String>,
    /// MD5 hex of the password
    #[arg(long)]
    md5: Option<String>,
    /// `MUSIC_U` cookie value
    #[arg(long, conflicts_with = "check")]
    cookie: Option<String>,
    /// Check current login status
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Session::load().context("failed to load session")?;
    apply_network(&session, &cli.network);
    let client = NeteaseClient::with_session(session)?;

    match cli.command {
        Command::Call {
            route,
            params,
            lenient,
        } => cmd_call(&client, &route, params, lenient).await,
        Command::Routes => {
            cmd_routes(&client);
            Ok(())
        }
        Command::Login(args) => cmd_login(&client, args).await,
        Command::Logout => cmd_logout(&client).await,
    }
}

fn apply_network(session: &Session, args: &NetworkArgs) {
    if args.proxy.is_some() {
        session.set_proxy(args.proxy.clone());
    }
    if args.real_ip.is_some() {
        session.set_real_ip(args.real_ip.clone());
    }
    if args.http {
        session.set_use_http(true);
    }
}

/// Parse `key=value`, typing the value loosely.
fn parse_pair(s: &str) -> std::result::Result<(String, Param), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_owned(), parse_value(value)))
}

/// `true`/`false` → Bool, integers → Int, decimals → Float, else Str.
fn parse_value(s: &str) -> Param {
    match s {
        "true" => return Param::Bool(true),
        "false" => return Param::Bool(false),
        _ => {}
    }
    if let Ok(n) = s.parse::<i64>() {
        return Param::Int(n);
    }
    let decimal = s.contains('.')
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-'));
    match s.parse::<f64>() {
        Ok(x) if decimal => Param::Float(x),
        _ => Param::Str(s.to_owned()),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── call / routes ──

async fn cmd_call(
    client: &NeteaseClient,
    route: &str,
    params: Vec<(String, Param)>,
    lenient: bool,
) -> Result<()> {
    let query: Query = params.into_iter().collect();
    let reply = client
        .invoke(route, &query, !lenient)
        .await
        .with_context(|| format!("call to `{route}` failed"))?;
    client.session().save().context("failed to save session")?;
    print_json(&reply)
}

fn cmd_routes(client: &NeteaseClient) {
    let mut routes: Vec<&str> = client
        .catalog()
        .routes()
        .chain(adapter::ROUTES)
        .collect();
    routes.sort_unstable();
    routes.dedup();
    for route in routes {
        println!("{route}");
    }
}

// ── login / logout ──

async fn cmd_login(client: &NeteaseClient, args: LoginArgs) -> Result<()> {
    if args.check {
        let reply = client.invoke(adapter::LOGIN_STATUS, &Query::new(), false).await?;
        if envelope::is_not_logged_in(&reply) {
            println!("Not logged in.");
        } else {
            let profile = &reply["profile"];
            println!(
                "Logged in as: {} (id={})",
                profile["nickname"].as_str().unwrap_or("?"),
                profile["userId"]
            );
        }
        return Ok(());
    }

    if let Some(music_u) = args.cookie {
        client.session().set_cookie("MUSIC_U", music_u);
        client.session().save()?;
        println!("Session saved.");
        return Ok(());
    }

    let mut query = Query::new();
    match (args.password, args.md5) {
        (Some(password), _) => query.insert("password", password),
        (None, Some(md5)) => query.insert("md5_password", md5),
        (None, None) => bail!("--password or --md5 is required"),
    };
    let route = if let Some(email) = args.email {
        query.insert("email", email);
        adapter::LOGIN
    } else if let Some(phone) = args.phone {
        query.insert("phone", phone);
        if let Some(cc) = args.countrycode {
            query.insert("countrycode", cc);
        }
        "/login/cellphone"
    } else {
        bail!("one of --email, --phone, --cookie or --check is required");
    };

    let reply = client.invoke(route, &query, false).await?;
    if envelope::code(&reply) == Some(envelope::CODE_OK) && client.session().is_logged_in() {
        client.session().save()?;
        println!("Logged in; session saved.");
        Ok(())
    } else {
        print_json(&reply)?;
        bail!("login failed")
    }
}

async fn cmd_logout(client: &NeteaseClient) -> Result<()> {
    if client.session().is_logged_in() {
        if let Err(e) = client.invoke("/logout", &Query::new(), false).await {
            tracing::warn!(error = %e, "remote logout failed");
        }
    }
    Session::clear_saved()?;
    println!("Session cleared.");
    Ok(())
}
